//! Offset arithmetic over the inline children of a textblock.
//!
//! A textblock's inline content is addressed by a single byte offset running
//! across its text leaves. Inline voids count as one placeholder character.

use crate::core::{Marks, Node, TextNode, clamp_to_char_boundary};

pub const VOID_PLACEHOLDER: &str = "\u{FFFC}";

pub fn leaf_len(node: &Node) -> usize {
    match node {
        Node::Text(t) => t.text.len(),
        Node::Void(_) | Node::Element(_) => VOID_PLACEHOLDER.len(),
    }
}

pub fn inline_len(children: &[Node]) -> usize {
    children.iter().map(leaf_len).sum()
}

pub fn inline_text(children: &[Node]) -> String {
    let mut out = String::new();
    for node in children {
        match node {
            Node::Text(t) => out.push_str(&t.text),
            Node::Void(_) | Node::Element(_) => out.push_str(VOID_PLACEHOLDER),
        }
    }
    out
}

/// Block-level offset of `offset` inside the leaf at `leaf_ix`.
pub fn point_global_offset(children: &[Node], leaf_ix: usize, offset: usize) -> usize {
    let before: usize = children.iter().take(leaf_ix).map(leaf_len).sum();
    let within = match children.get(leaf_ix) {
        Some(Node::Text(t)) => clamp_to_char_boundary(&t.text, offset),
        Some(_) | None => 0,
    };
    before + within
}

/// `(leaf index, offset)` of the first text leaf covering `global`.
pub fn point_for_global_offset(children: &[Node], global: usize) -> (usize, usize) {
    let mut start = 0usize;
    let mut last_text: Option<(usize, usize)> = None;
    for (ix, node) in children.iter().enumerate() {
        let len = leaf_len(node);
        if let Node::Text(t) = node {
            if global >= start && global <= start + len {
                return (ix, clamp_to_char_boundary(&t.text, global - start));
            }
            if start > global {
                return (ix, 0);
            }
            last_text = Some((ix, len));
        }
        start += len;
    }
    last_text.unwrap_or((0, 0))
}

/// Marks a caret at `global` would pick up: those of the text before it, or
/// of the text after it at the very start of the block.
pub fn marks_at(children: &[Node], global: usize) -> Marks {
    let mut start = 0usize;
    let mut following: Option<&Marks> = None;
    for node in children {
        let len = leaf_len(node);
        if let Node::Text(t) = node {
            if start < global && global <= start + len {
                return t.marks.clone();
            }
            if start >= global && following.is_none() {
                following = Some(&t.marks);
            }
        }
        start += len;
    }
    if global == 0 {
        following.cloned().unwrap_or_default()
    } else {
        Marks::default()
    }
}

/// Whether every text byte in `from..to` carries `kind`. Vacuously true for
/// ranges holding no text.
pub fn range_has_mark_everywhere(children: &[Node], from: usize, to: usize, kind: &str) -> bool {
    let mut start = 0usize;
    for node in children {
        let len = leaf_len(node);
        let end = start + len;
        if let Node::Text(t) = node {
            let overlaps = start.max(from) < end.min(to);
            if overlaps && !t.marks.has(kind) {
                return false;
            }
        }
        start = end;
    }
    true
}

pub fn slice_inline(children: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for node in children {
        let len = leaf_len(node);
        let end = start + len;
        match node {
            Node::Text(t) => {
                let lo = from.max(start);
                let hi = to.min(end);
                if lo < hi {
                    let a = clamp_to_char_boundary(&t.text, lo - start);
                    let b = clamp_to_char_boundary(&t.text, hi - start);
                    out.push(Node::Text(TextNode {
                        text: t.text[a..b].to_string(),
                        marks: t.marks.clone(),
                    }));
                }
            }
            other => {
                if start >= from && end <= to {
                    out.push(other.clone());
                }
            }
        }
        start = end;
    }
    out
}

/// Merges adjacent text leaves with equal marks and drops empty ones, keeping
/// a text leaf at each edge next to a void so the caret can reach it.
pub fn normalize_inline(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for node in children {
        match node {
            Node::Text(t) if t.text.is_empty() => {}
            Node::Text(t) => {
                if let Some(Node::Text(prev)) = out.last_mut() {
                    if prev.marks == t.marks {
                        prev.text.push_str(&t.text);
                        continue;
                    }
                }
                out.push(Node::Text(t));
            }
            other => out.push(other),
        }
    }

    if !matches!(out.first(), Some(Node::Text(_))) {
        out.insert(0, Node::text(""));
    }
    if !matches!(out.last(), Some(Node::Text(_))) {
        out.push(Node::text(""));
    }
    out
}

pub fn replace_range(children: &[Node], from: usize, to: usize, insert: Vec<Node>) -> Vec<Node> {
    let len = inline_len(children);
    let mut next = slice_inline(children, 0, from);
    next.extend(insert);
    next.extend(slice_inline(children, to, len));
    normalize_inline(next)
}

/// Rewrites the marks of every text byte in `from..to`.
pub fn map_marks(
    children: &[Node],
    from: usize,
    to: usize,
    f: impl Fn(&Marks) -> Marks,
) -> Vec<Node> {
    let len = inline_len(children);
    let mut next = slice_inline(children, 0, from);
    next.extend(
        slice_inline(children, from, to)
            .into_iter()
            .map(|node| match node {
                Node::Text(t) => Node::Text(TextNode {
                    marks: f(&t.marks),
                    text: t.text,
                }),
                other => other,
            }),
    );
    next.extend(slice_inline(children, to, len));
    normalize_inline(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Marks {
        Marks::new().with("strong", Default::default())
    }

    #[test]
    fn normalize_merges_equal_marks_and_keeps_a_leaf() {
        let merged = normalize_inline(vec![
            Node::text("a"),
            Node::text(""),
            Node::text("b"),
            Node::marked_text("c", bold()),
        ]);
        assert_eq!(merged, vec![Node::text("ab"), Node::marked_text("c", bold())]);
        assert_eq!(normalize_inline(Vec::new()), vec![Node::text("")]);
    }

    #[test]
    fn global_offsets_skip_voids() {
        let children = normalize_inline(vec![
            Node::text("ab"),
            Node::void("hard_break", Default::default()),
            Node::text("cd"),
        ]);
        let after_void = 2 + VOID_PLACEHOLDER.len();
        assert_eq!(point_global_offset(&children, 2, 1), after_void + 1);
        assert_eq!(point_for_global_offset(&children, after_void + 1), (2, 1));
        assert_eq!(point_for_global_offset(&children, 2), (0, 2));
    }

    #[test]
    fn marks_at_prefers_text_before_caret() {
        let children = vec![Node::marked_text("ab", bold()), Node::text("cd")];
        assert!(marks_at(&children, 2).has("strong"));
        assert!(!marks_at(&children, 3).has("strong"));
        assert!(marks_at(&children, 0).has("strong"));
    }
}
