use std::sync::Arc;

use plate_core::{
    ApplyError, Document, EditorOptions, Node, Op, PluginRegistry, Point, RegistryConfig,
    Selection, Transaction, build_editor, build_schema,
};

#[test]
fn failed_transactions_leave_the_state_untouched() {
    let registry = PluginRegistry::standard();
    let config = RegistryConfig::default();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    let mut editor = build_editor(&registry, &options, Document::new(vec![Node::paragraph("ab")]));
    let before = editor.doc().clone();

    let tx = Transaction::new(vec![
        Op::InsertText {
            path: vec![0, 0],
            offset: 2,
            text: "c".into(),
        },
        Op::RemoveNode { path: vec![4] },
    ]);
    assert!(matches!(editor.apply(tx), Err(ApplyError::InvalidPath(_))));
    assert_eq!(editor.doc(), &before);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 0));
}

#[test]
fn selection_is_clamped_into_the_document() {
    let registry = PluginRegistry::standard();
    let config = RegistryConfig::default();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    let mut editor = build_editor(&registry, &options, Document::new(vec![Node::paragraph("ab")]));

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 10)));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 2));
}

#[test]
fn focus_is_tracked() {
    let registry = PluginRegistry::standard();
    let config = RegistryConfig::default();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    let mut editor = build_editor(&registry, &options, Document::new(vec![Node::paragraph("")]));
    assert!(!editor.has_focus());
    editor.focus();
    assert!(editor.has_focus());
    editor.blur();
    assert!(!editor.has_focus());
}
