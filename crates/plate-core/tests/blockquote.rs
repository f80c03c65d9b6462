use std::sync::Arc;

use plate_core::{
    Attrs, Document, Editor, EditorOptions, Node, PluginRegistry, Point, RegistryConfig,
    Selection, build_editor, build_schema, join_up, lift, wrap_in, wrap_in_list,
};

fn editor_for(doc: serde_json::Value) -> Editor {
    let registry = PluginRegistry::standard();
    let config = RegistryConfig::default();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    let doc: Document = serde_json::from_value(doc).unwrap();
    build_editor(&registry, &options, doc)
}

fn p(text: &str) -> serde_json::Value {
    serde_json::json!({
        "node": "element",
        "kind": "paragraph",
        "children": [{ "node": "text", "text": text }]
    })
}

fn el(kind: &str, children: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "node": "element", "kind": kind, "children": children })
}

fn kinds(editor: &Editor) -> Vec<String> {
    editor
        .doc()
        .children
        .iter()
        .map(|node| node.kind().unwrap().to_string())
        .collect()
}

#[test]
fn wrap_selected_paragraphs_then_lift_them_back() {
    let mut editor = editor_for(serde_json::json!({ "children": [p("a"), p("b"), p("c")] }));
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![1, 0], 1),
    ));

    assert!(editor.run(&wrap_in("blockquote", Attrs::default())));
    assert_eq!(kinds(&editor), ["blockquote", "paragraph"]);
    let quote = editor.doc().element(&[0]).unwrap();
    assert_eq!(quote.children.len(), 2);
    assert_eq!(editor.selection().anchor, Point::new(vec![0, 0, 0], 0));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 1, 0], 1));

    assert!(editor.run(&lift()));
    assert_eq!(kinds(&editor), ["paragraph", "paragraph", "paragraph"]);
    assert_eq!(editor.selection().focus, Point::new(vec![1, 0], 1));
}

#[test]
fn lift_splits_the_container_around_the_block() {
    let mut editor = editor_for(serde_json::json!({
        "children": [el("blockquote", vec![p("a"), p("b"), p("c")])]
    }));
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0], 0)));

    assert!(editor.run(&lift()));
    assert_eq!(kinds(&editor), ["blockquote", "paragraph", "blockquote"]);
    assert_eq!(editor.selection().focus, Point::new(vec![1, 0], 0));
}

#[test]
fn lift_leaves_a_list_entirely() {
    let mut editor = editor_for(serde_json::json!({
        "children": [el("bullet_list", vec![
            el("list_item", vec![p("a")]),
            el("list_item", vec![p("b")]),
            el("list_item", vec![p("c")]),
        ])]
    }));
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 1)));

    assert!(editor.run(&lift()));
    assert_eq!(kinds(&editor), ["bullet_list", "paragraph", "bullet_list"]);
    assert_eq!(editor.selection().focus, Point::new(vec![1, 0], 1));
}

#[test]
fn top_level_blocks_cannot_be_lifted() {
    let editor = editor_for(serde_json::json!({ "children": [p("a")] }));
    assert!(!lift()(editor.state(), None));
}

#[test]
fn join_up_merges_matching_containers_only() {
    let mut editor = editor_for(serde_json::json!({
        "children": [
            el("blockquote", vec![p("a")]),
            el("blockquote", vec![p("b")]),
        ]
    }));
    editor.set_selection(Selection::collapsed(Point::new(vec![1, 0, 0], 1)));

    assert!(editor.run(&join_up()));
    assert_eq!(kinds(&editor), ["blockquote"]);
    assert_eq!(editor.doc().element(&[0]).unwrap().children.len(), 2);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 1, 0], 1));

    let mut flat = editor_for(serde_json::json!({ "children": [p("a"), p("b")] }));
    flat.set_selection(Selection::collapsed(Point::new(vec![1, 0], 0)));
    assert!(!flat.run(&join_up()));
}

#[test]
fn wrap_in_list_gives_each_block_an_item() {
    let mut editor = editor_for(serde_json::json!({ "children": [p("a"), p("b")] }));
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![1, 0], 0),
    ));

    assert!(editor.run(&wrap_in_list("bullet_list", Attrs::default())));
    let list = editor.doc().element(&[0]).unwrap();
    assert_eq!(list.kind, "bullet_list");
    assert_eq!(list.children.len(), 2);
    assert!(list.children.iter().all(|item| item.kind() == Some("list_item")));

    // The first block of an item is already listed.
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 0)));
    assert!(!wrap_in_list("bullet_list", Attrs::default())(editor.state(), None));
}

#[test]
fn wrapping_requires_a_fitting_parent() {
    let mut editor = editor_for(serde_json::json!({
        "children": [el("bullet_list", vec![el("list_item", vec![p("a")])])]
    }));
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0, 0, 0], 0)));
    // A list item holds blocks, so a quote fits inside it.
    assert!(editor.run(&wrap_in("blockquote", Attrs::default())));
    assert_eq!(editor.doc().kind_at(&[0, 0, 0]), Some("blockquote"));
    assert_eq!(
        editor.doc().node(&[0, 0, 0, 0]),
        Some(&Node::paragraph("a"))
    );
}
