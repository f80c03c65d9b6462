use std::sync::Arc;

use plate_core::{
    Document, Editor, EditorOptions, Node, PluginRegistry, RegistryConfig, build_editor,
    build_schema,
};
use plate_menu::{
    MAX_TABLE_SIZE, MenuEntry, MenuItem, PromptError, PromptValues, build_menu_items, table_menu,
};

fn editor() -> Editor {
    let registry = PluginRegistry::standard();
    let config = RegistryConfig::default();
    let schema = build_schema(&registry, &config).unwrap();
    let options = EditorOptions::new(Arc::new(schema)).config(config);
    build_editor(&registry, &options, Document::new(vec![Node::paragraph("cell")]))
}

fn create_table_item(editor: &Editor) -> MenuItem {
    build_menu_items(editor.state().schema())
        .get(MenuEntry::InsertTable)
        .cloned()
        .unwrap()
}

fn cell_kinds(editor: &Editor) -> Vec<Vec<String>> {
    let table = editor.doc().element(&[0]).unwrap();
    assert_eq!(table.kind, "table");
    table
        .children
        .iter()
        .map(|row| {
            row.as_element()
                .unwrap()
                .children
                .iter()
                .map(|cell| cell.kind().unwrap().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn three_by_two_table_has_one_header_row() {
    let mut editor = editor();
    let item = create_table_item(&editor);
    assert!(item.is_visible(editor.state()));
    assert!(item.is_enabled(editor.state()));

    let pending = item.run(&mut editor).into_prompt().unwrap();
    assert_eq!(pending.prompt().title(), "Insert table");
    let input = PromptValues::from_iter([("rows", "3"), ("columns", "2")]);
    assert!(pending.confirm(&mut editor, &input).unwrap());

    let header = vec!["table_header".to_string(); 2];
    let plain = vec!["table_cell".to_string(); 2];
    assert_eq!(cell_kinds(&editor), vec![header, plain.clone(), plain]);
    assert!(editor.has_focus());
}

#[test]
fn defaults_make_a_single_header_cell() {
    let mut editor = editor();
    let pending = create_table_item(&editor).run(&mut editor).into_prompt().unwrap();
    assert!(pending.confirm(&mut editor, &PromptValues::new()).unwrap());
    assert_eq!(cell_kinds(&editor), vec![vec!["table_header".to_string()]]);
}

#[test]
fn bad_counts_are_rejected_without_edits() {
    let mut editor = editor();
    let before = editor.doc().clone();
    let pending = create_table_item(&editor).run(&mut editor).into_prompt().unwrap();

    let input = PromptValues::from_iter([("rows", "2"), ("columns", "0")]);
    let rejected = pending.confirm(&mut editor, &input).unwrap_err();
    assert!(matches!(
        rejected.error,
        PromptError::InvalidField { ref field, .. } if field == "columns"
    ));
    assert_eq!(editor.doc(), &before);

    let input = PromptValues::from_iter([("rows", "")]);
    let rejected = rejected.pending.confirm(&mut editor, &input).unwrap_err();
    assert_eq!(rejected.error.field(), "rows");
    assert_eq!(editor.doc(), &before);
}

#[test]
fn oversized_tables_are_rejected() {
    let mut editor = editor();
    let before = editor.doc().clone();
    let pending = create_table_item(&editor).run(&mut editor).into_prompt().unwrap();

    let too_many = (MAX_TABLE_SIZE + 1).to_string();
    let input = PromptValues::from_iter([("rows", too_many.as_str()), ("columns", "2")]);
    let rejected = pending.confirm(&mut editor, &input).unwrap_err();
    assert!(matches!(
        rejected.error,
        PromptError::InvalidField { ref field, .. } if field == "rows"
    ));
    assert_eq!(editor.doc(), &before);

    let input = PromptValues::from_iter([("rows", "1"), ("columns", "1000000000")]);
    let rejected = rejected.pending.confirm(&mut editor, &input).unwrap_err();
    assert_eq!(rejected.error.field(), "columns");
    assert_eq!(editor.doc(), &before);

    let limit = MAX_TABLE_SIZE.to_string();
    let input = PromptValues::from_iter([("rows", "2"), ("columns", limit.as_str())]);
    assert!(rejected.pending.confirm(&mut editor, &input).unwrap());
    let kinds = cell_kinds(&editor);
    assert_eq!(kinds.len(), 2);
    assert!(kinds.iter().all(|row| row.len() == MAX_TABLE_SIZE));
}

#[test]
fn cancelling_leaves_the_document_alone() {
    let mut editor = editor();
    let before = editor.doc().clone();
    let pending = create_table_item(&editor).run(&mut editor).into_prompt().unwrap();
    pending.cancel();
    assert_eq!(editor.doc(), &before);
}

#[test]
fn table_menu_items_show_only_inside_a_table() {
    let mut editor = editor();
    let items = table_menu();
    assert!(items.iter().all(|item| !item.is_visible(editor.state())));

    let pending = create_table_item(&editor).run(&mut editor).into_prompt().unwrap();
    pending.confirm(&mut editor, &PromptValues::new()).unwrap();
    let visible: Vec<&str> = items
        .iter()
        .filter(|item| item.is_visible(editor.state()))
        .map(MenuItem::label)
        .collect();
    assert_eq!(
        visible,
        [
            "Insert column before",
            "Insert column after",
            "Insert row before",
            "Insert row after",
            "Delete table",
        ]
    );

    let insert_row = items.iter().find(|item| item.label() == "Insert row after").unwrap();
    assert!(insert_row.run(&mut editor).applied());
    assert_eq!(cell_kinds(&editor).len(), 2);
}
