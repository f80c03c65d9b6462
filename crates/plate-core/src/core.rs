use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::{Command, replace_selection_with_text};
use crate::input_rules::InputRules;
use crate::keymap::{KeyCombo, Keymap};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::EditorBehavior;
use crate::schema::Schema;

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Void(_) | Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        match self.node(path)? {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Children of the container at `parent_path`; the empty path is the root.
    pub fn children_at(&self, parent_path: &[usize]) -> Option<&[Node]> {
        if parent_path.is_empty() {
            return Some(&self.children);
        }
        self.element(parent_path).map(|el| el.children.as_slice())
    }

    pub fn kind_at(&self, path: &[usize]) -> Option<&str> {
        self.node(path).and_then(Node::kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: impl Into<String>, attrs: Attrs, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            attrs,
            children,
        })
    }

    pub fn void(kind: impl Into<String>, attrs: Attrs) -> Self {
        Node::Void(VoidNode {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::element("paragraph", Attrs::default(), vec![Self::text(text)])
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Node::Element(el) => Some(&el.kind),
            Node::Void(v) => Some(&v.kind),
            Node::Text(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn has_markup(&self, kind: &str, attrs: Option<&Attrs>) -> bool {
        self.kind == kind && attrs.is_none_or(|attrs| *attrs == self.attrs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

/// Marks carried by a text leaf, keyed by mark kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marks(BTreeMap<String, Attrs>);

impl Marks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, kind: &str) -> bool {
        self.0.contains_key(kind)
    }

    pub fn get(&self, kind: &str) -> Option<&Attrs> {
        self.0.get(kind)
    }

    pub fn insert(&mut self, kind: impl Into<String>, attrs: Attrs) {
        self.0.insert(kind.into(), attrs);
    }

    pub fn remove(&mut self, kind: &str) -> Option<Attrs> {
        self.0.remove(kind)
    }

    pub fn with(mut self, kind: impl Into<String>, attrs: Attrs) -> Self {
        self.insert(kind, attrs);
        self
    }

    pub fn without(mut self, kind: &str) -> Self {
        self.remove(kind);
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Path of the element holding this point's text leaf.
    pub fn block_path(&self) -> &[usize] {
        self.path.split_last().map(|(_, p)| p).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(from, to)` in document order.
    pub fn ordered(&self) -> (&Point, &Point) {
        if (&self.anchor.path, self.anchor.offset) <= (&self.focus.path, self.focus.offset) {
            (&self.anchor, &self.focus)
        } else {
            (&self.focus, &self.anchor)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Document,
    selection: Selection,
    stored_marks: Option<Marks>,
}

impl EditorState {
    pub fn new(schema: Arc<Schema>, mut doc: Document, selection: Selection) -> Self {
        normalize_document(&schema, &mut doc);
        let selection = normalize_selection(&doc, &selection);
        Self {
            schema,
            doc,
            selection,
            stored_marks: None,
        }
    }

    /// State with the caret at the start of the first text leaf.
    pub fn with_doc(schema: Arc<Schema>, doc: Document) -> Self {
        Self::new(schema, doc, Selection::collapsed(Point::new(vec![0, 0], 0)))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&Marks> {
        self.stored_marks.as_ref()
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = normalize_selection(&self.doc, &selection);
        self.stored_marks = None;
    }

    /// Applies every op of `tx` or none of them.
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();
        for op in tx.ops.iter().cloned() {
            apply_op_to(&mut doc, &mut selection, op)?;
        }
        if let Some(sel) = &tx.selection_after {
            selection = sel.clone();
        }

        let touched = !tx.ops.is_empty() || tx.selection_after.is_some();
        self.doc = doc;
        self.selection = normalize_selection(&self.doc, &selection);
        if let Some(marks) = &tx.stored_marks {
            self.stored_marks = Some(marks.clone());
        } else if touched {
            self.stored_marks = None;
        }
        Ok(())
    }
}

/// The editing surface: state plus the aggregated rules, bindings and behaviors.
pub struct Editor {
    state: EditorState,
    input_rules: InputRules,
    keymaps: Vec<Keymap>,
    behaviors: Vec<Arc<dyn EditorBehavior>>,
    focused: bool,
}

impl Editor {
    pub fn new(state: EditorState) -> Self {
        Self {
            state,
            input_rules: InputRules::default(),
            keymaps: Vec::new(),
            behaviors: Vec::new(),
            focused: false,
        }
    }

    pub fn with_input_rules(mut self, input_rules: InputRules) -> Self {
        self.input_rules = input_rules;
        self
    }

    pub fn with_keymaps(mut self, keymaps: Vec<Keymap>) -> Self {
        self.keymaps = keymaps;
        self
    }

    pub fn with_behaviors(mut self, behaviors: Vec<Arc<dyn EditorBehavior>>) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        self.state.doc()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.state.set_selection(selection);
    }

    pub fn input_rules(&self) -> &InputRules {
        &self.input_rules
    }

    pub fn keymaps(&self) -> &[Keymap] {
        &self.keymaps
    }

    pub fn behaviors(&self) -> &[Arc<dyn EditorBehavior>] {
        &self.behaviors
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let tx = self.transform_transaction(tx);
        self.state.apply(&tx)
    }

    pub fn dispatch(&mut self, tx: Transaction) {
        let source = tx.meta.source.clone();
        if let Err(err) = self.apply(tx) {
            tracing::warn!(
                error = %err,
                source = source.as_deref().unwrap_or("unknown"),
                "dropping transaction that failed to apply"
            );
        }
    }

    /// Runs `command` against the current state, dispatching whatever it produces.
    pub fn run(&mut self, command: &Command) -> bool {
        let mut pending: Vec<Transaction> = Vec::new();
        let applied = {
            let sink: &mut dyn FnMut(Transaction) = &mut |tx| pending.push(tx);
            command(&self.state, Some(sink))
        };
        for tx in pending {
            self.dispatch(tx);
        }
        applied
    }

    /// Feeds typed text through the input rules; returns whether a rule fired.
    pub fn handle_text_input(&mut self, text: &str) -> bool {
        if let Some(tx) = self.input_rules.apply(&self.state, text) {
            self.dispatch(tx);
            return true;
        }
        self.insert_text(text);
        false
    }

    pub fn insert_text(&mut self, text: &str) {
        match replace_selection_with_text(&self.state, text) {
            Some(tx) => self.dispatch(tx),
            None => tracing::debug!("text input ignored outside a single textblock"),
        }
    }

    pub fn handle_key(&mut self, combo: &KeyCombo) -> bool {
        let commands: Vec<Command> = self
            .keymaps
            .iter()
            .filter_map(|keymap| keymap.lookup(combo).cloned())
            .collect();
        commands.iter().any(|command| self.run(command))
    }

    /// Inserts pasted block nodes after the focused textblock.
    pub fn paste(&mut self, nodes: Vec<Node>) {
        let nodes = self
            .behaviors
            .iter()
            .fold(nodes, |nodes, behavior| behavior.transform_pasted(&self.state, nodes));

        let block_path = self.state.selection().focus.block_path().to_vec();
        let Some((block_ix, parent_path)) = block_path.split_last() else {
            return;
        };
        let parent_kind = self.state.doc().kind_at(parent_path).map(str::to_string);

        let mut ops = Vec::new();
        let mut insert_at = block_ix + 1;
        for node in nodes {
            let accepted = match node.kind() {
                Some(kind) => self.state.schema().accepts(parent_kind.as_deref(), kind),
                None => false,
            };
            if !accepted {
                tracing::debug!(kind = ?node.kind(), "skipping pasted node the target cannot hold");
                continue;
            }
            let mut path = parent_path.to_vec();
            path.push(insert_at);
            ops.push(Op::InsertNode { path, node });
            insert_at += 1;
        }
        if !ops.is_empty() {
            self.dispatch(Transaction::new(ops).source("paste"));
        }
    }

    fn transform_transaction(&self, mut tx: Transaction) -> Transaction {
        for behavior in &self.behaviors {
            if let Some(next) = behavior.transform_transaction(&self.state, &tx) {
                tracing::trace!(behavior = behavior.id(), "transaction rewritten");
                tx = next;
            }
        }
        tx
    }
}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start < end {
                text_node.text.replace_range(start..end, "");
                transform_selection_remove_text(selection, &path, start..end);
            }
        }
        Op::InsertNode { path, node } => {
            let (parent_path, index) = split_index(&path)?;
            let children = children_mut(doc, parent_path)?;
            if index > children.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "insert index out of bounds: {index} > {}",
                    children.len()
                )));
            }
            children.insert(index, node);
            transform_selection_insert_node(selection, &path);
        }
        Op::RemoveNode { path } => {
            let (parent_path, index) = split_index(&path)?;
            let children = children_mut(doc, parent_path)?;
            if index >= children.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "remove index out of bounds: {index} >= {}",
                    children.len()
                )));
            }
            children.remove(index);
            transform_selection_remove_node(selection, &path);
        }
        Op::ReplaceNode { path, node } => {
            *node_mut(doc, &path)? = node;
        }
    }
    Ok(())
}

fn split_index(path: &[usize]) -> Result<(&[usize], usize), ApplyError> {
    path.split_last()
        .map(|(index, parent)| (parent, *index))
        .ok_or_else(|| ApplyError::InvalidPath("empty path".into()))
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, ApplyError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| ApplyError::InvalidPath("empty path".into()))?;
    let mut node = doc
        .children
        .get_mut(*first)
        .ok_or_else(|| ApplyError::InvalidPath(format!("path out of bounds at depth 0: {first}")))?;
    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => el.children.get_mut(ix).ok_or_else(|| {
                ApplyError::InvalidPath(format!("path out of bounds at depth {}: {ix}", depth + 1))
            })?,
            Node::Void(_) | Node::Text(_) => {
                return Err(ApplyError::InvalidPath(format!(
                    "non-container node at depth {depth}"
                )));
            }
        };
    }
    Ok(node)
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, ApplyError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Void(_) | Node::Text(_) => {
            Err(ApplyError::InvalidPath("parent is not a container".into()))
        }
    }
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, ApplyError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(ApplyError::InvalidPath("expected text node".into())),
    }
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path || point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() > depth && point.path.starts_with(parent_path) && point.path[depth] >= index
        {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent_path) {
            continue;
        }
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            // Point was inside the removed subtree; park it on the previous sibling.
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

fn normalize_document(schema: &Schema, doc: &mut Document) {
    fn walk(children: &mut [Node], schema: &Schema) {
        for node in children {
            let Node::Element(el) = node else {
                continue;
            };
            let text_block = match schema.node(&el.kind) {
                Some(spec) => spec.is_text_block(),
                None => el.children.iter().any(|n| matches!(n, Node::Text(_))),
            };
            if text_block {
                if !el.children.iter().any(|n| matches!(n, Node::Text(_))) {
                    el.children.push(Node::text(""));
                }
            } else {
                walk(&mut el.children, schema);
            }
        }
    }

    if doc.children.is_empty() {
        doc.children.push(Node::paragraph(""));
    }
    walk(&mut doc.children, schema);
}

pub(crate) fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback = first_text_point(doc).unwrap_or(Point {
        path: vec![0],
        offset: 0,
    });

    let anchor = normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus =
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Selection { anchor, focus }
}

pub(crate) fn first_text_point_in(children: &[Node], base: &[usize]) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point::new(path.clone(), 0);
                    path.pop();
                    return Some(point);
                }
                Node::Element(el) => {
                    if let Some(point) = walk(&el.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
                Node::Void(_) => {}
            }
            path.pop();
        }
        None
    }

    walk(children, &mut base.to_vec())
}

fn first_text_point(doc: &Document) -> Option<Point> {
    first_text_point_in(&doc.children, &[])
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
            Node::Void(_) => break,
        }
    }

    match doc.node(&resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: clamp_to_char_boundary(&t.text, point.offset),
        }),
        Node::Element(el) => first_text_point_in(&el.children, &resolved_path),
        Node::Void(_) => {
            // Prefer a text leaf next to the void inside the same parent.
            let (_, parent) = resolved_path.split_last()?;
            let siblings = doc.children_at(parent)?;
            first_text_point_in(siblings, parent)
        }
    }
}
