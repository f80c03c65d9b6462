use std::sync::Arc;

use plate_core::{
    Attrs, Document, Editor, EditorOptions, Marks, Node, PluginRegistry, Point, RegistryConfig,
    Selection, build_editor, build_schema, heading_attrs,
};

fn editor_with_block(kind: &str, text: &str) -> Editor {
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
    let mut editor = build_editor(&registry, &options, doc);
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], text.len())));
    editor
}

fn type_text(editor: &mut Editor, text: &str) {
    for ch in text.chars() {
        editor.handle_text_input(&ch.to_string());
    }
}

fn block_text(editor: &Editor, path: &[usize]) -> String {
    plate_core::inline_text(&editor.doc().element(path).unwrap().children)
}

#[test]
fn smart_quotes_open_and_close() {
    let mut editor = editor_with_block("paragraph", "");
    assert!(editor.handle_text_input("\""));
    type_text(&mut editor, "hi\" it's");
    assert_eq!(block_text(&editor, &[0]), "\u{201C}hi\u{201D} it\u{2019}s");

    let mut editor = editor_with_block("paragraph", "say ");
    type_text(&mut editor, "'x'");
    assert_eq!(block_text(&editor, &[0]), "say \u{2018}x\u{2019}");
}

#[test]
fn ellipsis_and_em_dash() {
    let mut editor = editor_with_block("paragraph", "wait..");
    assert!(editor.handle_text_input("."));
    assert_eq!(block_text(&editor, &[0]), "wait\u{2026}");
    assert_eq!(
        editor.selection().focus,
        Point::new(vec![0, 0], "wait\u{2026}".len())
    );

    let mut editor = editor_with_block("paragraph", "a-");
    assert!(editor.handle_text_input("-"));
    assert_eq!(block_text(&editor, &[0]), "a\u{2014}");
}

#[test]
fn plain_text_is_inserted_when_no_rule_fires() {
    let mut editor = editor_with_block("paragraph", "ab");
    assert!(!editor.handle_text_input("c"));
    assert_eq!(block_text(&editor, &[0]), "abc");
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 3));
}

#[test]
fn heading_rule_sets_level_from_hashes() {
    let mut editor = editor_with_block("paragraph", "##");
    assert!(editor.handle_text_input(" "));
    let heading = editor.doc().element(&[0]).unwrap();
    assert_eq!(heading.kind, "heading");
    assert_eq!(heading.attrs, heading_attrs(2));
    assert_eq!(block_text(&editor, &[0]), "");
}

#[test]
fn list_rules_wrap_the_block() {
    let mut editor = editor_with_block("paragraph", "-");
    assert!(editor.handle_text_input(" "));
    assert_eq!(editor.doc().kind_at(&[0]), Some("bullet_list"));
    assert_eq!(editor.doc().kind_at(&[0, 0]), Some("list_item"));
    assert_eq!(editor.doc().kind_at(&[0, 0, 0]), Some("paragraph"));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0, 0, 0], 0));

    let mut editor = editor_with_block("paragraph", "3.");
    assert!(editor.handle_text_input(" "));
    let list = editor.doc().element(&[0]).unwrap();
    assert_eq!(list.kind, "ordered_list");
    assert_eq!(list.attrs.get("order"), Some(&serde_json::json!(3)));
}

#[test]
fn blockquote_and_code_block_rules() {
    let mut editor = editor_with_block("paragraph", ">");
    assert!(editor.handle_text_input(" "));
    assert_eq!(editor.doc().kind_at(&[0]), Some("blockquote"));
    assert_eq!(block_text(&editor, &[0, 0]), "");

    let mut editor = editor_with_block("paragraph", "``");
    assert!(editor.handle_text_input("`"));
    assert_eq!(editor.doc().kind_at(&[0]), Some("code_block"));
}

#[test]
fn code_blocks_take_text_literally() {
    let mut editor = editor_with_block("code_block", "a..");
    assert!(!editor.handle_text_input("."));
    assert!(!editor.handle_text_input("\""));
    assert_eq!(block_text(&editor, &[0]), "a...\"");
}

#[test]
fn mark_rule_wraps_the_delimited_text() {
    let mut editor = editor_with_block("paragraph", "**bold*");
    assert!(editor.handle_text_input("*"));
    let strong = Marks::new().with("strong", Attrs::default());
    assert_eq!(
        editor.doc().element(&[0]).unwrap().children,
        vec![Node::marked_text("bold", strong.clone())]
    );

    editor.insert_text(" after");
    assert_eq!(
        editor.doc().element(&[0]).unwrap().children,
        vec![Node::marked_text("bold", strong), Node::text(" after")]
    );
}

#[test]
fn rules_wait_for_a_collapsed_selection() {
    let mut editor = editor_with_block("paragraph", "ab..");
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 1),
    ));
    assert!(!editor.handle_text_input("."));
    assert_eq!(block_text(&editor, &[0]), ".b..");
}
