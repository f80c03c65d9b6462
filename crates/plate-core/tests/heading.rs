use std::sync::Arc;

use plate_core::{
    Attrs, Document, Editor, EditorOptions, KeyCombo, PluginRegistry, Point, RegistryConfig,
    Selection, block_type_active, build_editor, build_schema, heading_attrs, set_block_type,
};

fn editor_for(doc: serde_json::Value) -> Editor {
    let registry = PluginRegistry::standard();
    let config = RegistryConfig::default();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    let doc: Document = serde_json::from_value(doc).unwrap();
    build_editor(&registry, &options, doc)
}

fn two_paragraphs() -> Editor {
    editor_for(serde_json::json!({
        "children": [
            { "node": "element", "kind": "paragraph", "children": [{ "node": "text", "text": "one" }] },
            { "node": "element", "kind": "paragraph", "children": [{ "node": "text", "text": "two" }] }
        ]
    }))
}

#[test]
fn set_block_type_changes_every_selected_textblock() {
    let mut editor = two_paragraphs();
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 1),
        Point::new(vec![1, 0], 1),
    ));

    assert!(editor.run(&set_block_type("heading", heading_attrs(2))));
    for ix in 0..2 {
        let block = editor.doc().element(&[ix]).unwrap();
        assert_eq!(block.kind, "heading");
        assert_eq!(block.attrs, heading_attrs(2));
    }
    assert_eq!(editor.selection().anchor, Point::new(vec![0, 0], 1));
    assert_eq!(editor.selection().focus, Point::new(vec![1, 0], 1));
}

#[test]
fn block_type_is_active_only_inside_one_matching_block() {
    let mut editor = two_paragraphs();
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 0)));
    editor.run(&set_block_type("heading", heading_attrs(1)));

    assert!(block_type_active(editor.state(), "heading", &heading_attrs(1)));
    assert!(!block_type_active(editor.state(), "heading", &heading_attrs(2)));
    assert!(!set_block_type("heading", heading_attrs(1))(editor.state(), None));
    assert!(set_block_type("paragraph", Attrs::default())(editor.state(), None));

    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![1, 0], 0),
    ));
    assert!(!block_type_active(editor.state(), "heading", &heading_attrs(1)));
}

#[test]
fn containers_are_not_block_types() {
    let editor = two_paragraphs();
    assert!(!set_block_type("blockquote", Attrs::default())(editor.state(), None));
    assert!(!set_block_type("missing", Attrs::default())(editor.state(), None));
}

#[test]
fn heading_shortcuts_pick_the_level() {
    let mut editor = two_paragraphs();
    let combo = KeyCombo::new("3").ctrl().shift();
    assert!(editor.handle_key(&combo));
    assert_eq!(editor.doc().element(&[0]).unwrap().attrs, heading_attrs(3));
    assert!(!editor.handle_key(&combo));
}
