use std::sync::Arc;

use plate_core::{
    Attrs, Document, Editor, EditorOptions, Marks, Node, PluginRegistry, Point, RegistryConfig,
    Selection, build_editor, build_schema, command,
};
use plate_menu::{
    MenuItemOptions, PromptError, PromptValues, cmd_item, insert_image_item, link_item,
    mark_item, normalize_link_href,
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

fn select(editor: &mut Editor, from: usize, to: usize) {
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], from),
        Point::new(vec![0, 0], to),
    ));
}

#[test]
fn cmd_item_derives_predicates_from_the_command() {
    let editor = editor_for("paragraph", "a");
    let never = command(|_, _| false);

    // Nothing given: an inapplicable command is not shown at all.
    let item = cmd_item(never.clone(), MenuItemOptions::new().title("Never"));
    assert_eq!(item.label(), "Never");
    assert!(!item.is_visible(editor.state()));
    assert!(!item.is_enabled(editor.state()));
    assert!(!item.render_state(editor.state()).visible);

    let always = cmd_item(command(|_, _| true), MenuItemOptions::new().title("Always"));
    assert!(always.is_visible(editor.state()));
    assert!(always.is_enabled(editor.state()));

    // Forced on: the command decides visibility alone.
    let item = cmd_item(never.clone(), MenuItemOptions::new().enable_always());
    assert!(!item.is_visible(editor.state()));

    // An explicit select still leaves enable to the command.
    let item = cmd_item(never.clone(), MenuItemOptions::new().select_when(|_| true));
    assert!(item.is_visible(editor.state()));
    assert!(!item.is_enabled(editor.state()));

    let item = cmd_item(never, MenuItemOptions::new().enable_when(|_| true).label("Own"));
    assert_eq!(item.label(), "Own");
    assert!(item.is_enabled(editor.state()));
}

#[test]
fn mark_item_tracks_and_toggles_the_mark() {
    let mut editor = editor_for("paragraph", "hello");
    let item = mark_item("strong", MenuItemOptions::new().title("Toggle strong style"));
    select(&mut editor, 0, 5);

    assert!(item.is_enabled(editor.state()));
    assert!(!item.is_active(editor.state()));
    assert!(item.run(&mut editor).applied());
    assert!(item.is_active(editor.state()));
    assert_eq!(
        editor.doc().element(&[0]).unwrap().children,
        vec![Node::marked_text(
            "hello",
            Marks::new().with("strong", Attrs::default())
        )]
    );

    let mut code = editor_for("code_block", "x");
    assert!(!item.is_visible(code.state()));
    assert!(!item.run(&mut code).applied());
}

#[test]
fn link_targets_get_a_scheme() {
    assert_eq!(normalize_link_href("example.com"), "http://example.com");
    assert_eq!(normalize_link_href("https://example.com"), "https://example.com");
    assert_eq!(normalize_link_href("HTTP://Example.com"), "HTTP://Example.com");
    assert_eq!(normalize_link_href("ftp://host"), "http://ftp://host");
}

#[test]
fn link_item_prompts_then_applies_and_removes() {
    let mut editor = editor_for("paragraph", "hello world");
    let item = link_item("link");
    assert!(!item.is_enabled(editor.state()));

    select(&mut editor, 0, 5);
    assert!(item.is_enabled(editor.state()));
    let pending = item.run(&mut editor).into_prompt().unwrap();
    assert_eq!(pending.prompt().title(), "Create a link");
    assert_eq!(editor.doc().element(&[0]).unwrap().children.len(), 1);

    let input = PromptValues::from_iter([("href", "example.com")]);
    assert!(pending.confirm(&mut editor, &input).unwrap());
    let mut attrs = Attrs::default();
    attrs.insert("href".into(), serde_json::json!("http://example.com"));
    assert_eq!(
        editor.doc().element(&[0]).unwrap().children,
        vec![
            Node::marked_text("hello", Marks::new().with("link", attrs)),
            Node::text(" world"),
        ]
    );
    assert!(editor.has_focus());
    assert!(item.is_active(editor.state()));

    assert!(item.run(&mut editor).applied());
    assert_eq!(
        editor.doc().element(&[0]).unwrap().children,
        vec![Node::text("hello world")]
    );
}

#[test]
fn link_prompt_requires_a_target() {
    let mut editor = editor_for("paragraph", "hello");
    select(&mut editor, 0, 5);
    let before = editor.doc().clone();

    let pending = link_item("link").run(&mut editor).into_prompt().unwrap();
    let rejected = pending
        .confirm(&mut editor, &PromptValues::from_iter([("title", "Home")]))
        .unwrap_err();
    assert_eq!(
        rejected.error,
        PromptError::MissingField {
            field: "href".into()
        }
    );
    assert_eq!(editor.doc(), &before);

    let blank = PromptValues::from_iter([("href", "   ")]);
    let rejected = rejected.pending.confirm(&mut editor, &blank).unwrap_err();
    assert_eq!(rejected.error.field(), "href");
    assert_eq!(editor.doc(), &before);

    // The prompt stays open after a rejection.
    let input = PromptValues::from_iter([("href", "https://a.dev"), ("title", "Home")]);
    assert!(rejected.pending.confirm(&mut editor, &input).unwrap());
    let leaf = editor.doc().element(&[0]).unwrap().children[0].clone();
    let Node::Text(leaf) = leaf else {
        panic!("Expected text leaf");
    };
    let link = leaf.marks.get("link").unwrap();
    assert_eq!(link.get("title"), Some(&serde_json::json!("Home")));
}

#[test]
fn image_prompt_defaults_alt_to_the_selected_text() {
    let mut editor = editor_for("paragraph", "a cat");
    select(&mut editor, 2, 5);
    let item = insert_image_item("image");
    assert!(item.is_enabled(editor.state()));

    let pending = item.run(&mut editor).into_prompt().unwrap();
    let alt = &pending.prompt().fields()[2].1;
    assert_eq!(alt.default(), Some("cat"));

    let input = PromptValues::from_iter([("src", "cat.png")]);
    assert!(pending.confirm(&mut editor, &input).unwrap());
    let children = &editor.doc().element(&[0]).unwrap().children;
    let Node::Void(image) = &children[1] else {
        panic!("Expected image void");
    };
    assert_eq!(image.attrs.get("src"), Some(&serde_json::json!("cat.png")));
    assert_eq!(image.attrs.get("alt"), Some(&serde_json::json!("cat")));
    assert!(image.attrs.get("title").is_none());

    let code = editor_for("code_block", "x");
    assert!(!item.is_enabled(code.state()));
}
