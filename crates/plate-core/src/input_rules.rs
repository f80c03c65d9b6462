use std::fmt;
use std::sync::Arc;

use regex::{Captures, Regex};

use crate::commands::{point_in_block, textblock_paths, wrap_nodes};
use crate::core::{Attrs, EditorState, Node, Point, Selection};
use crate::inline::{
    inline_text, marks_at, point_for_global_offset, point_global_offset, replace_range,
};
use crate::ops::{Op, Path, Transaction};

/// How far back from the caret a rule pattern can see.
const MAX_MATCH: usize = 500;

/// A successful pattern match, in block-level byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMatch {
    pub block_path: Path,
    /// Start of the matched text that is already in the document.
    pub from: usize,
    /// The caret; the typed text was never inserted.
    pub to: usize,
    /// Index 0 is the whole match, then each capture group.
    pub captures: Vec<Option<String>>,
}

impl InputMatch {
    pub fn group(&self, ix: usize) -> Option<&str> {
        self.captures.get(ix).and_then(|c| c.as_deref())
    }
}

pub type InputRuleFn =
    Arc<dyn Fn(&EditorState, &InputMatch) -> Option<Transaction> + Send + Sync>;

#[derive(Clone)]
pub enum InputRuleHandler {
    /// Replaces the first capture group (or the whole match) with this text.
    Text(String),
    Custom(InputRuleFn),
}

#[derive(Clone)]
pub struct InputRule {
    id: String,
    pattern: Regex,
    handler: InputRuleHandler,
}

impl fmt::Debug for InputRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRule")
            .field("id", &self.id)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

impl InputRule {
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        handler: InputRuleHandler,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            id: id.into(),
            pattern: Regex::new(pattern)?,
            handler,
        })
    }

    pub fn text(
        id: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Self::new(id, pattern, InputRuleHandler::Text(replacement.into()))
    }

    pub fn custom<F>(id: impl Into<String>, pattern: &str, f: F) -> Result<Self, regex::Error>
    where
        F: Fn(&EditorState, &InputMatch) -> Option<Transaction> + Send + Sync + 'static,
    {
        Self::new(id, pattern, InputRuleHandler::Custom(Arc::new(f)))
    }

    /// Turns the textblock into a `kind` textblock once the pattern matches at
    /// its start, deleting the matched text.
    pub fn textblock_type<A>(
        id: impl Into<String>,
        pattern: &str,
        kind: impl Into<String>,
        attrs: A,
    ) -> Result<Self, regex::Error>
    where
        A: Fn(&InputMatch) -> Attrs + Send + Sync + 'static,
    {
        let kind = kind.into();
        Self::custom(id, pattern, move |state, m| {
            let schema = state.schema();
            if !schema.is_text_block(&kind) {
                return None;
            }
            let (_, parent) = m.block_path.split_last()?;
            if !schema.accepts(state.doc().kind_at(parent), &kind) {
                return None;
            }
            let el = state.doc().element(&m.block_path)?;
            let children = replace_range(&el.children, m.from, m.to, Vec::new());
            let caret = caret_in(&m.block_path, &children, m.from);
            let tx = Transaction::new(vec![Op::ReplaceNode {
                path: m.block_path.clone(),
                node: Node::element(kind.clone(), attrs(m), children),
            }]);
            Some(tx.selection_after(Selection::collapsed(caret)))
        })
    }

    /// Wraps the textblock in `kind` (plus whatever containers it needs),
    /// deleting the matched text.
    pub fn wrapping<A>(
        id: impl Into<String>,
        pattern: &str,
        kind: impl Into<String>,
        attrs: A,
    ) -> Result<Self, regex::Error>
    where
        A: Fn(&InputMatch) -> Attrs + Send + Sync + 'static,
    {
        let kind = kind.into();
        Self::custom(id, pattern, move |state, m| {
            let doc = state.doc();
            let el = doc.element(&m.block_path)?;
            let (_, parent) = m.block_path.split_last()?;
            let children = replace_range(&el.children, m.from, m.to, Vec::new());
            let block = Node::element(el.kind.clone(), el.attrs.clone(), children);
            let wrapper = wrap_nodes(
                state.schema(),
                doc.kind_at(parent),
                vec![block],
                &kind,
                &attrs(m),
            )?;
            let ops = vec![
                Op::RemoveNode {
                    path: m.block_path.clone(),
                },
                Op::InsertNode {
                    path: m.block_path.clone(),
                    node: wrapper,
                },
            ];

            let ordinal = textblock_paths(doc)
                .iter()
                .position(|path| *path == m.block_path)?;
            let mut next = state.clone();
            next.apply(&Transaction::new(ops.clone())).ok()?;
            let block_path = textblock_paths(next.doc()).get(ordinal)?.clone();
            let caret = point_in_block(next.doc(), &block_path, m.from);
            Some(Transaction::new(ops).selection_after(Selection::collapsed(caret)))
        })
    }

    /// Replaces the match with its first capture group carrying `kind`, and
    /// keeps typing outside the mark.
    pub fn mark(
        id: impl Into<String>,
        pattern: &str,
        kind: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let kind = kind.into();
        Self::custom(id, pattern, move |state, m| {
            if !state.schema().has_mark(&kind) {
                return None;
            }
            let content = m.group(1).filter(|text| !text.is_empty())?;
            let el = state.doc().element(&m.block_path)?;
            let outer = marks_at(&el.children, m.from);
            let marked = outer.clone().with(kind.clone(), Attrs::default());
            let children = replace_range(
                &el.children,
                m.from,
                m.to,
                vec![Node::marked_text(content, marked)],
            );
            let caret = caret_in(&m.block_path, &children, m.from + content.len());
            let tx = Transaction::new(vec![Op::ReplaceNode {
                path: m.block_path.clone(),
                node: Node::element(el.kind.clone(), el.attrs.clone(), children),
            }]);
            Some(
                tx.selection_after(Selection::collapsed(caret))
                    .stored_marks(outer.without(&kind)),
            )
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn handler(&self) -> &InputRuleHandler {
        &self.handler
    }
}

fn caret_in(block_path: &[usize], children: &[Node], global: usize) -> Point {
    let (leaf_ix, offset) = point_for_global_offset(children, global);
    let mut path = block_path.to_vec();
    path.push(leaf_ix);
    Point::new(path, offset)
}

fn ceil_char_boundary(s: &str, mut ix: usize) -> usize {
    while ix < s.len() && !s.is_char_boundary(ix) {
        ix += 1;
    }
    ix.min(s.len())
}

/// Rules smart quotes use, in order: open/close double, open/close single.
pub fn smart_quotes() -> Vec<InputRule> {
    [
        (
            "open_double_quote",
            r#"(?:^|[\s{\[(<'"\x{2018}\x{201C}])(")$"#,
            "\u{201C}",
        ),
        ("close_double_quote", r#""$"#, "\u{201D}"),
        (
            "open_single_quote",
            r#"(?:^|[\s{\[(<'"\x{2018}\x{201C}])(')$"#,
            "\u{2018}",
        ),
        ("close_single_quote", r"'$", "\u{2019}"),
    ]
    .into_iter()
    .map(|(id, pattern, replacement)| {
        InputRule::text(id, pattern, replacement).expect("built-in quote pattern must be valid")
    })
    .collect()
}

pub fn ellipsis() -> InputRule {
    InputRule::text("ellipsis", r"\.\.\.$", "\u{2026}").expect("ellipsis pattern must be valid")
}

pub fn em_dash() -> InputRule {
    InputRule::text("em_dash", r"--$", "\u{2014}").expect("em dash pattern must be valid")
}

/// Smart quotes, then ellipsis, then em dash.
pub fn baseline_rules() -> Vec<InputRule> {
    let mut rules = smart_quotes();
    rules.push(ellipsis());
    rules.push(em_dash());
    rules
}

/// An ordered rule set; the first rule that produces a transaction wins.
#[derive(Debug, Clone, Default)]
pub struct InputRules {
    rules: Vec<InputRule>,
}

impl InputRules {
    pub fn new(rules: Vec<InputRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[InputRule] {
        &self.rules
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rules.iter().map(InputRule::id).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The transaction for typing `typed` at the caret, if some rule claims it.
    pub fn apply(&self, state: &EditorState, typed: &str) -> Option<Transaction> {
        let selection = state.selection();
        if !selection.is_collapsed() || self.rules.is_empty() {
            return None;
        }
        let caret = &selection.focus;
        let block_path = caret.block_path();
        let el = state.doc().element(block_path)?;
        if state.schema().node(&el.kind).is_some_and(|spec| spec.code) {
            return None;
        }

        let leaf_ix = caret.path.last().copied().unwrap_or(0);
        let caret_offset = point_global_offset(&el.children, leaf_ix, caret.offset);
        let text = inline_text(&el.children);
        let window_start = ceil_char_boundary(&text, caret_offset.saturating_sub(MAX_MATCH));
        let virtual_text = format!("{}{typed}", &text[window_start..caret_offset]);

        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(&virtual_text) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.end() != virtual_text.len() {
                continue;
            }

            let tx = match &rule.handler {
                InputRuleHandler::Text(replacement) => replace_with_text(
                    state,
                    block_path,
                    &virtual_text,
                    &caps,
                    window_start,
                    caret_offset,
                    replacement,
                ),
                InputRuleHandler::Custom(handler) => {
                    let m = InputMatch {
                        block_path: block_path.to_vec(),
                        from: (window_start + whole.start()).min(caret_offset),
                        to: caret_offset,
                        captures: caps
                            .iter()
                            .map(|c| c.map(|c| c.as_str().to_string()))
                            .collect(),
                    };
                    handler(state, &m)
                }
            };
            if let Some(tx) = tx {
                tracing::debug!(rule = rule.id.as_str(), "input rule fired");
                return Some(tx.source("input_rule"));
            }
        }
        None
    }
}

fn replace_with_text(
    state: &EditorState,
    block_path: &[usize],
    virtual_text: &str,
    caps: &Captures<'_>,
    window_start: usize,
    caret: usize,
    replacement: &str,
) -> Option<Transaction> {
    let whole = caps.get(0)?;
    let (group_start, group_end) = match caps.get(1) {
        Some(group) => (group.start(), group.end()),
        None => (whole.start(), whole.end()),
    };
    let caret_v = caret - window_start;

    // Text between the caret and the group belongs to the typed input; keep it.
    let mut insert = String::new();
    if group_start > caret_v {
        insert.push_str(&virtual_text[caret_v..group_start]);
    }
    insert.push_str(replacement);
    insert.push_str(&virtual_text[group_end..whole.end()]);
    let from = window_start + group_start.min(caret_v);

    let el = state.doc().element(block_path)?;
    let marks = state
        .stored_marks()
        .cloned()
        .unwrap_or_else(|| marks_at(&el.children, from));
    let children = replace_range(
        &el.children,
        from,
        caret,
        vec![Node::marked_text(insert.clone(), marks)],
    );
    let point = caret_in(block_path, &children, from + insert.len());
    let tx = Transaction::new(vec![Op::ReplaceNode {
        path: block_path.to_vec(),
        node: Node::element(el.kind.clone(), el.attrs.clone(), children),
    }]);
    Some(tx.selection_after(Selection::collapsed(point)))
}
