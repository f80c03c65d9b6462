use std::sync::Arc;

use plate_core::{
    Attrs, Document, Editor, EditorOptions, KeyCombo, Node, PluginRegistry, Point,
    RegistryConfig, Selection, build_editor, build_schema, can_insert, insert_node,
};

fn editor_for(kind: &str, text: &str) -> Editor {
    let registry = PluginRegistry::standard();
    let config = RegistryConfig::default();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    let doc: Document = serde_json::from_value(serde_json::json!({
        "children": [{
            "node": "element",
            "kind": kind,
            "children": [{ "node": "text", "text": text }]
        }]
    }))
    .unwrap();
    build_editor(&registry, &options, doc)
}

fn image() -> Node {
    let mut attrs = Attrs::default();
    attrs.insert("src".into(), serde_json::json!("cat.png"));
    Node::void("image", attrs)
}

#[test]
fn image_goes_inline_at_the_caret() {
    let mut editor = editor_for("paragraph", "ab");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 1)));
    assert!(can_insert(editor.state(), "image"));

    assert!(editor.run(&insert_node(image())));
    assert_eq!(
        editor.doc().element(&[0]).unwrap().children,
        vec![Node::text("a"), image(), Node::text("b")]
    );
    assert_eq!(editor.selection().focus, Point::new(vec![0, 2], 0));
}

#[test]
fn image_replaces_selected_text() {
    let mut editor = editor_for("paragraph", "abc");
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 1),
        Point::new(vec![0, 0], 2),
    ));
    assert!(editor.run(&insert_node(image())));
    assert_eq!(
        editor.doc().element(&[0]).unwrap().children,
        vec![Node::text("a"), image(), Node::text("c")]
    );
}

#[test]
fn code_blocks_hold_no_images() {
    let editor = editor_for("code_block", "ab");
    assert!(!can_insert(editor.state(), "image"));
    assert!(!insert_node(image())(editor.state(), None));
}

#[test]
fn horizontal_rule_goes_after_the_block() {
    let mut editor = editor_for("paragraph", "ab");
    assert!(can_insert(editor.state(), "horizontal_rule"));
    assert!(editor.handle_key(&KeyCombo::new("_").ctrl()));
    assert_eq!(editor.doc().kind_at(&[1]), Some("horizontal_rule"));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 0));

    let rule = Node::void("horizontal_rule", Attrs::default());
    assert!(editor.run(&insert_node(rule)));
    assert_eq!(editor.doc().children.len(), 3);
}
