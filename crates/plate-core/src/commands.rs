use std::sync::Arc;

use crate::core::{Attrs, Document, EditorState, ElementNode, Marks, Node, Point, Selection};
use crate::inline::{
    inline_len, map_marks, marks_at, normalize_inline, point_for_global_offset,
    point_global_offset, range_has_mark_everywhere, replace_range,
};
use crate::ops::{Op, Path, Transaction};
use crate::schema::{ChildConstraint, NodeRole, Schema};

/// A document command. With `None` for dispatch it only reports whether it
/// would apply.
pub type Command =
    Arc<dyn Fn(&EditorState, Option<&mut dyn FnMut(Transaction)>) -> bool + Send + Sync>;

pub fn command<F>(f: F) -> Command
where
    F: Fn(&EditorState, Option<&mut dyn FnMut(Transaction)>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn emit(dispatch: Option<&mut dyn FnMut(Transaction)>, tx: Transaction) -> bool {
    if let Some(dispatch) = dispatch {
        dispatch(tx);
    }
    true
}

pub fn reborrow<'a>(
    dispatch: &'a mut Option<&mut dyn FnMut(Transaction)>,
) -> Option<&'a mut dyn FnMut(Transaction)> {
    match dispatch {
        Some(dispatch) => {
            let dispatch: &'a mut dyn FnMut(Transaction) = &mut **dispatch;
            Some(dispatch)
        }
        None => None,
    }
}

/// Tries each command in turn and stops at the first one that applies.
pub fn chain(commands: Vec<Command>) -> Command {
    command(move |state, mut dispatch| {
        commands
            .iter()
            .any(|command| command(state, reborrow(&mut dispatch)))
    })
}

// Textblock helpers.

pub(crate) fn is_textblock(el: &ElementNode) -> bool {
    el.children.iter().any(|node| matches!(node, Node::Text(_)))
}

/// Paths of every textblock in document order.
pub fn textblock_paths(doc: &Document) -> Vec<Path> {
    fn walk(children: &[Node], path: &mut Path, out: &mut Vec<Path>) {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if is_textblock(el) {
                out.push(path.clone());
            } else {
                walk(&el.children, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextblockRange {
    pub path: Path,
    pub from: usize,
    pub to: usize,
}

fn global_of(doc: &Document, point: &Point) -> usize {
    let leaf_ix = point.path.last().copied().unwrap_or(0);
    doc.element(point.block_path())
        .map(|el| point_global_offset(&el.children, leaf_ix, point.offset))
        .unwrap_or(0)
}

/// The portion of every textblock the selection touches, in document order.
pub(crate) fn selected_textblocks(state: &EditorState) -> Vec<TextblockRange> {
    let doc = state.doc();
    let (from, to) = state.selection().ordered();
    let from_block = from.block_path();
    let to_block = to.block_path();

    textblock_paths(doc)
        .into_iter()
        .filter(|path| path.as_slice() >= from_block && path.as_slice() <= to_block)
        .filter_map(|path| {
            let len = inline_len(&doc.element(&path)?.children);
            let start = if path == from_block {
                global_of(doc, from)
            } else {
                0
            };
            let end = if path == to_block { global_of(doc, to) } else { len };
            Some(TextblockRange {
                path,
                from: start,
                to: end.max(start),
            })
        })
        .collect()
}

fn is_code_block(state: &EditorState, path: &[usize]) -> bool {
    state
        .doc()
        .kind_at(path)
        .and_then(|kind| state.schema().node(kind))
        .is_some_and(|spec| spec.code)
}

/// Maps a selection across a structural edit that keeps every textblock's
/// order and flattened content.
pub fn remap_selection(old: &Document, new: &Document, selection: &Selection) -> Selection {
    let old_blocks = textblock_paths(old);
    let new_blocks = textblock_paths(new);
    let remap = |point: &Point| -> Point {
        let Some(ordinal) = old_blocks
            .iter()
            .position(|path| path.as_slice() == point.block_path())
        else {
            return point.clone();
        };
        let Some(block) = new_blocks.get(ordinal).or_else(|| new_blocks.last()) else {
            return point.clone();
        };
        point_in_block(new, block, global_of(old, point))
    };
    Selection::new(remap(&selection.anchor), remap(&selection.focus))
}

pub(crate) fn point_in_block(doc: &Document, block: &[usize], global: usize) -> Point {
    let (leaf_ix, offset) = doc
        .element(block)
        .map(|el| point_for_global_offset(&el.children, global))
        .unwrap_or((0, 0));
    let mut path = block.to_vec();
    path.push(leaf_ix);
    Point::new(path, offset)
}

/// Builds a transaction for `ops` whose selection follows the textblocks it
/// touched.
pub(crate) fn structural_tx(state: &EditorState, ops: Vec<Op>) -> Transaction {
    let mut next = state.clone();
    match next.apply(&Transaction::new(ops.clone())) {
        Ok(()) => {
            let selection = remap_selection(state.doc(), next.doc(), state.selection());
            Transaction::new(ops).selection_after(selection)
        }
        Err(err) => {
            tracing::debug!(error = %err, "structural edit did not preview cleanly");
            Transaction::new(ops)
        }
    }
}

// Marks.

/// Marks text typed at the caret would receive.
pub fn typing_marks(state: &EditorState) -> Marks {
    if let Some(marks) = state.stored_marks() {
        return marks.clone();
    }
    let focus = &state.selection().focus;
    let leaf_ix = focus.path.last().copied().unwrap_or(0);
    state
        .doc()
        .element(focus.block_path())
        .map(|el| {
            let global = point_global_offset(&el.children, leaf_ix, focus.offset);
            marks_at(&el.children, global)
        })
        .unwrap_or_default()
}

/// Whether `kind` is active: in the typing marks for an empty selection,
/// otherwise across all selected text.
pub fn mark_active(state: &EditorState, kind: &str) -> bool {
    if state.selection().is_collapsed() {
        return typing_marks(state).has(kind);
    }
    let ranges: Vec<TextblockRange> = selected_textblocks(state)
        .into_iter()
        .filter(|range| range.from < range.to)
        .collect();
    if ranges.is_empty() {
        return false;
    }
    ranges.iter().all(|range| {
        state
            .doc()
            .element(&range.path)
            .is_some_and(|el| range_has_mark_everywhere(&el.children, range.from, range.to, kind))
    })
}

pub fn toggle_mark(kind: impl Into<String>, attrs: Attrs) -> Command {
    let kind = kind.into();
    command(move |state, dispatch| {
        if !state.schema().has_mark(&kind) {
            return false;
        }

        if state.selection().is_collapsed() {
            if is_code_block(state, state.selection().focus.block_path()) {
                return false;
            }
            let marks = typing_marks(state);
            let marks = if marks.has(&kind) {
                marks.without(&kind)
            } else {
                marks.with(kind.clone(), attrs.clone())
            };
            return emit(dispatch, Transaction::default().stored_marks(marks).source("toggle_mark"));
        }

        let ranges: Vec<TextblockRange> = selected_textblocks(state)
            .into_iter()
            .filter(|range| range.from < range.to && !is_code_block(state, &range.path))
            .collect();
        if ranges.is_empty() {
            return false;
        }
        if dispatch.is_none() {
            return true;
        }

        let remove = ranges.iter().all(|range| {
            state.doc().element(&range.path).is_some_and(|el| {
                range_has_mark_everywhere(&el.children, range.from, range.to, &kind)
            })
        });
        let ops = ranges
            .iter()
            .filter_map(|range| {
                let el = state.doc().element(&range.path)?;
                let children = map_marks(&el.children, range.from, range.to, |marks| {
                    if remove {
                        marks.clone().without(&kind)
                    } else {
                        marks.clone().with(kind.clone(), attrs.clone())
                    }
                });
                Some(Op::ReplaceNode {
                    path: range.path.clone(),
                    node: Node::element(el.kind.clone(), el.attrs.clone(), children),
                })
            })
            .collect();
        emit(dispatch, structural_tx(state, ops).source("toggle_mark"))
    })
}

// Block ranges.

/// A run of sibling blocks `start..end` inside the container at `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRange {
    pub parent: Path,
    pub start: usize,
    pub end: usize,
}

pub fn block_range(state: &EditorState) -> Option<BlockRange> {
    let (from, to) = state.selection().ordered();
    let from_block = from.block_path();
    let to_block = to.block_path();
    if from_block.is_empty() || to_block.is_empty() {
        return None;
    }

    let common = from_block
        .iter()
        .zip(to_block)
        .take_while(|(a, b)| a == b)
        .count();
    if from_block == to_block {
        let (ix, parent) = from_block.split_last()?;
        return Some(BlockRange {
            parent: parent.to_vec(),
            start: *ix,
            end: ix + 1,
        });
    }
    Some(BlockRange {
        parent: from_block[..common].to_vec(),
        start: *from_block.get(common)?,
        end: to_block.get(common)? + 1,
    })
}

fn range_nodes<'a>(doc: &'a Document, range: &BlockRange) -> Option<&'a [Node]> {
    doc.children_at(&range.parent)?.get(range.start..range.end)
}

fn child_kinds_accepted(schema: &Schema, parent: &str, nodes: &[Node]) -> bool {
    nodes
        .iter()
        .all(|node| node.kind().is_some_and(|kind| schema.accepts(Some(parent), kind)))
}

fn item_kind_for(schema: &Schema, container: &str, nodes: &[Node]) -> Option<String> {
    match &schema.node(container)?.children {
        ChildConstraint::Kinds(kinds) => kinds
            .iter()
            .find(|item| child_kinds_accepted(schema, item, nodes))
            .cloned(),
        _ => None,
    }
}

/// Wraps `nodes` so they fit inside `parent_kind` via `kind`, adding the
/// outer containers `kind` needs and a single item container when `kind`
/// only holds items.
pub(crate) fn wrap_nodes(
    schema: &Schema,
    parent_kind: Option<&str>,
    nodes: Vec<Node>,
    kind: &str,
    attrs: &Attrs,
) -> Option<Node> {
    let chain = schema.find_wrapping(kind)?;
    if !schema.accepts(parent_kind, chain.first()?) {
        return None;
    }

    let inner = if child_kinds_accepted(schema, kind, &nodes) {
        Node::element(kind, attrs.clone(), nodes)
    } else {
        let item = item_kind_for(schema, kind, &nodes)?;
        Node::element(
            kind,
            attrs.clone(),
            vec![Node::element(item, Attrs::default(), nodes)],
        )
    };

    Some(
        chain
            .iter()
            .rev()
            .skip(1)
            .fold(inner, |node, outer| {
                Node::element(outer.clone(), Attrs::default(), vec![node])
            }),
    )
}

fn replace_range_ops(range: &BlockRange, replacement: Vec<Node>) -> Vec<Op> {
    let mut ops = Vec::new();
    for _ in range.start..range.end {
        let mut path = range.parent.clone();
        path.push(range.start);
        ops.push(Op::RemoveNode { path });
    }
    for (offset, node) in replacement.into_iter().enumerate() {
        let mut path = range.parent.clone();
        path.push(range.start + offset);
        ops.push(Op::InsertNode { path, node });
    }
    ops
}

pub fn wrap_in(kind: impl Into<String>, attrs: Attrs) -> Command {
    let kind = kind.into();
    command(move |state, dispatch| {
        let Some(range) = block_range(state) else {
            return false;
        };
        let Some(nodes) = range_nodes(state.doc(), &range) else {
            return false;
        };
        let parent_kind = state.doc().kind_at(&range.parent);
        let Some(wrapper) = wrap_nodes(state.schema(), parent_kind, nodes.to_vec(), &kind, &attrs)
        else {
            return false;
        };
        if dispatch.is_none() {
            return true;
        }
        let ops = replace_range_ops(&range, vec![wrapper]);
        emit(dispatch, structural_tx(state, ops).source("wrap_in"))
    })
}

/// Wraps each selected block in its own list item of a new `kind` list.
pub fn wrap_in_list(kind: impl Into<String>, attrs: Attrs) -> Command {
    let kind = kind.into();
    command(move |state, dispatch| {
        let schema = state.schema();
        let Some(range) = block_range(state) else {
            return false;
        };
        let Some(nodes) = range_nodes(state.doc(), &range) else {
            return false;
        };
        let Some(item) = item_kind_for(schema, &kind, nodes) else {
            return false;
        };
        let parent_kind = state.doc().kind_at(&range.parent);
        // Already the first block of a list item: wrapping would only nest an empty list.
        if parent_kind == Some(item.as_str()) && range.start == 0 {
            return false;
        }
        let items: Vec<Node> = nodes
            .iter()
            .map(|node| Node::element(item.clone(), Attrs::default(), vec![node.clone()]))
            .collect();
        let Some(wrapper) = wrap_nodes(schema, parent_kind, items, &kind, &attrs) else {
            return false;
        };
        if dispatch.is_none() {
            return true;
        }
        let ops = replace_range_ops(&range, vec![wrapper]);
        emit(dispatch, structural_tx(state, ops).source("wrap_in_list"))
    })
}

/// Whether the selection sits inside a single block of `kind` with `attrs`.
pub fn block_type_active(state: &EditorState, kind: &str, attrs: &Attrs) -> bool {
    let (from, to) = state.selection().ordered();
    if from.block_path() != to.block_path() {
        return false;
    }
    state
        .doc()
        .element(from.block_path())
        .is_some_and(|el| el.has_markup(kind, Some(attrs)))
}

pub fn set_block_type(kind: impl Into<String>, attrs: Attrs) -> Command {
    let kind = kind.into();
    command(move |state, dispatch| {
        let schema = state.schema();
        let Some(spec) = schema.node(&kind) else {
            return false;
        };
        if !spec.is_text_block() {
            return false;
        }
        let strip_marks = spec.code;

        let ops: Vec<Op> = selected_textblocks(state)
            .into_iter()
            .filter_map(|range| {
                let el = state.doc().element(&range.path)?;
                if el.has_markup(&kind, Some(&attrs)) {
                    return None;
                }
                let (_, parent) = range.path.split_last()?;
                if !schema.accepts(state.doc().kind_at(parent), &kind) {
                    return None;
                }
                let children = if strip_marks {
                    normalize_inline(
                        el.children
                            .iter()
                            .map(|node| match node {
                                Node::Text(t) => Node::text(t.text.clone()),
                                other => other.clone(),
                            })
                            .collect(),
                    )
                } else {
                    el.children.clone()
                };
                Some(Op::ReplaceNode {
                    path: range.path,
                    node: Node::element(kind.clone(), attrs.clone(), children),
                })
            })
            .collect();
        if ops.is_empty() {
            return false;
        }
        if dispatch.is_none() {
            return true;
        }
        emit(dispatch, structural_tx(state, ops).source("set_block_type"))
    })
}

// Lift.

type Split = (Option<Node>, Vec<Node>, Option<Node>);

fn with_children(el: &ElementNode, children: Vec<Node>) -> Option<Node> {
    if children.is_empty() {
        return None;
    }
    Some(Node::element(el.kind.clone(), el.attrs.clone(), children))
}

/// Splits `el` around `start..end` of the descendant container at `rel`.
fn split_around(el: &ElementNode, rel: &[usize], start: usize, end: usize) -> Option<Split> {
    let Some((&ix, rest)) = rel.split_first() else {
        let before = with_children(el, el.children.get(..start)?.to_vec());
        let lifted = el.children.get(start..end)?.to_vec();
        let after = with_children(el, el.children.get(end..)?.to_vec());
        return Some((before, lifted, after));
    };

    let child = el.children.get(ix)?.as_element()?;
    let (inner_before, lifted, inner_after) = split_around(child, rest, start, end)?;
    let mut before_children = el.children.get(..ix)?.to_vec();
    before_children.extend(inner_before);
    let mut after_children: Vec<Node> = inner_after.into_iter().collect();
    after_children.extend(el.children.get(ix + 1..)?.iter().cloned());
    Some((
        with_children(el, before_children),
        lifted,
        with_children(el, after_children),
    ))
}

/// Moves the selected blocks out to the nearest enclosing container that
/// accepts them, splitting the containers in between.
pub fn lift() -> Command {
    command(|state, dispatch| {
        let schema = state.schema();
        let doc = state.doc();
        let Some(range) = block_range(state) else {
            return false;
        };
        let Some(nodes) = range_nodes(doc, &range) else {
            return false;
        };

        let mut target = None;
        for depth in (0..range.parent.len()).rev() {
            let container = &range.parent[..depth];
            let container_kind = doc.kind_at(container);
            let fits = nodes
                .iter()
                .all(|node| node.kind().is_some_and(|kind| schema.accepts(container_kind, kind)));
            if fits {
                target = Some(depth);
                break;
            }
        }
        let Some(depth) = target else {
            return false;
        };

        let top_path = &range.parent[..depth + 1];
        let Some(top) = doc.element(top_path) else {
            return false;
        };
        let Some((before, lifted, after)) =
            split_around(top, &range.parent[depth + 1..], range.start, range.end)
        else {
            return false;
        };
        if dispatch.is_none() {
            return true;
        }

        let mut replacement: Vec<Node> = before.into_iter().collect();
        replacement.extend(lifted);
        replacement.extend(after);
        let Some((&top_ix, container)) = top_path.split_last() else {
            return false;
        };
        let ops = replace_range_ops(
            &BlockRange {
                parent: container.to_vec(),
                start: top_ix,
                end: top_ix + 1,
            },
            replacement,
        );
        emit(dispatch, structural_tx(state, ops).source("lift"))
    })
}

/// Joins the nearest enclosing container with a preceding sibling of the
/// same kind. Textblocks are never joined.
pub fn join_up() -> Command {
    command(|state, dispatch| {
        let doc = state.doc();
        let (from, _) = state.selection().ordered();
        let block = from.block_path();

        for depth in (1..block.len()).rev() {
            let path = &block[..depth];
            let Some((&ix, parent)) = path.split_last() else {
                continue;
            };
            if ix == 0 {
                continue;
            }
            let Some(current) = doc.element(path) else {
                continue;
            };
            let mut prev_path = parent.to_vec();
            prev_path.push(ix - 1);
            let Some(prev) = doc.element(&prev_path) else {
                continue;
            };
            if prev.kind != current.kind || is_textblock(prev) {
                continue;
            }
            if dispatch.is_none() {
                return true;
            }

            let mut children = prev.children.clone();
            children.extend(current.children.iter().cloned());
            let ops = vec![
                Op::RemoveNode {
                    path: path.to_vec(),
                },
                Op::ReplaceNode {
                    path: prev_path,
                    node: Node::element(prev.kind.clone(), prev.attrs.clone(), children),
                },
            ];
            return emit(dispatch, structural_tx(state, ops).source("join_up"));
        }
        false
    })
}

// Insertion.

/// Whether a `kind` node could be inserted at the selection head.
pub fn can_insert(state: &EditorState, kind: &str) -> bool {
    let schema = state.schema();
    let (from, _) = state.selection().ordered();
    let block = from.block_path();

    let inline = schema
        .node(kind)
        .is_some_and(|spec| spec.role == NodeRole::Inline);
    if inline {
        return state
            .doc()
            .kind_at(block)
            .and_then(|block_kind| schema.node(block_kind))
            .is_some_and(|spec| !spec.code && spec.children == ChildConstraint::InlineOnly);
    }

    (0..block.len())
        .rev()
        .any(|depth| schema.accepts(state.doc().kind_at(&block[..depth]), kind))
}

/// Inserts `node` at the selection: inline nodes replace the selected text,
/// block nodes go after the block holding the selection.
pub fn insert_node(node: Node) -> Command {
    command(move |state, dispatch| {
        let Some(kind) = node.kind() else {
            return false;
        };
        if !can_insert(state, kind) {
            return false;
        }
        if dispatch.is_none() {
            return true;
        }

        let schema = state.schema();
        let inline = schema
            .node(kind)
            .is_some_and(|spec| spec.role == NodeRole::Inline);
        if inline {
            return match replace_selection_with(state, vec![node.clone()], None) {
                Some(tx) => emit(dispatch, tx.source("insert_node")),
                None => false,
            };
        }

        let (from, _) = state.selection().ordered();
        let block = from.block_path();
        for depth in (0..block.len()).rev() {
            if !schema.accepts(state.doc().kind_at(&block[..depth]), kind) {
                continue;
            }
            let mut path = block[..depth].to_vec();
            path.push(block[depth] + 1);
            let tx = Transaction::new(vec![Op::InsertNode {
                path,
                node: node.clone(),
            }]);
            return emit(dispatch, tx.source("insert_node"));
        }
        false
    })
}

/// Replaces the selected inline range with `nodes`, leaving the caret after
/// them. Only applies when the selection stays inside one textblock.
pub(crate) fn replace_selection_with(
    state: &EditorState,
    nodes: Vec<Node>,
    stored: Option<Marks>,
) -> Option<Transaction> {
    let (from, to) = state.selection().ordered();
    let block = from.block_path();
    if block != to.block_path() {
        return None;
    }
    let el = state.doc().element(block)?;
    let start = global_of(state.doc(), from);
    let end = global_of(state.doc(), to);
    let inserted: usize = nodes.iter().map(crate::inline::leaf_len).sum();
    let children = replace_range(&el.children, start, end, nodes);
    let (leaf_ix, offset) = point_for_global_offset(&children, start + inserted);

    let mut caret = block.to_vec();
    caret.push(leaf_ix);
    let mut tx = Transaction::new(vec![Op::ReplaceNode {
        path: block.to_vec(),
        node: Node::element(el.kind.clone(), el.attrs.clone(), children),
    }])
    .selection_after(Selection::collapsed(Point::new(caret, offset)));
    if let Some(marks) = stored {
        tx = tx.stored_marks(marks);
    }
    Some(tx)
}

/// Plain typing: replaces the selection with `text` carrying the typing marks.
pub fn replace_selection_with_text(state: &EditorState, text: &str) -> Option<Transaction> {
    let marks = if is_code_block(state, state.selection().focus.block_path()) {
        Marks::default()
    } else {
        typing_marks(state)
    };
    replace_selection_with(state, vec![Node::marked_text(text, marks)], None)
        .map(|tx| tx.source("input"))
}
