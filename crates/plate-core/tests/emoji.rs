use std::sync::Arc;

use plate_core::{
    Attrs, Document, Editor, EditorOptions, Node, PluginRegistry, RegistryConfig, build_editor,
    build_schema,
};

fn editor_with(config: RegistryConfig) -> Editor {
    let registry = PluginRegistry::standard();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    let doc = Document::new(vec![Node::paragraph("first"), Node::paragraph("last")]);
    build_editor(&registry, &options, doc)
}

fn pasted_doc() -> Vec<Node> {
    vec![Node::element(
        "doc",
        Attrs::default(),
        vec![Node::paragraph("one"), Node::paragraph("two")],
    )]
}

#[test]
fn pasted_document_is_unwrapped_into_blocks() {
    let mut editor = editor_with(RegistryConfig::default());
    assert_eq!(editor.behaviors().len(), 1);

    editor.paste(pasted_doc());
    assert_eq!(
        editor.doc().children,
        vec![
            Node::paragraph("first"),
            Node::paragraph("one"),
            Node::paragraph("two"),
            Node::paragraph("last"),
        ]
    );
}

#[test]
fn without_emoji_the_document_node_is_pasted_as_is() {
    let mut editor = editor_with(RegistryConfig::default().exclude(["emoji"]));
    assert!(editor.behaviors().is_empty());

    editor.paste(pasted_doc());
    assert_eq!(editor.doc().children.len(), 3);
    assert_eq!(editor.doc().kind_at(&[1]), Some("doc"));
}

#[test]
fn pasted_inline_nodes_are_skipped_between_blocks() {
    let mut editor = editor_with(RegistryConfig::default());
    editor.paste(vec![
        Node::void("emoji", Attrs::default()),
        Node::paragraph("kept"),
    ]);
    assert_eq!(editor.doc().children.len(), 3);
    assert_eq!(editor.doc().node(&[1]), Some(&Node::paragraph("kept")));
}
