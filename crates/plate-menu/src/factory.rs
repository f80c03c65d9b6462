use std::sync::Arc;

use plate_core::{
    Attrs, Command, Editor, EditorState, Node, Schema, TABLE_HEADER, add_column_after,
    add_column_before, add_row_after, add_row_before, block_type_active, can_insert, command,
    delete_column, delete_row, delete_table, inline_text, insert_node, join_up, lift,
    mark_active, point_global_offset, set_block_type, slice_inline, toggle_header_row,
    toggle_mark, wrap_in, wrap_in_list,
};
use serde_json::Value;

use crate::icons::MenuIcon;
use crate::item::{
    Dropdown, DropdownOptions, Enable, MenuElement, MenuItem, MenuItemOptions, RunFn,
    RunOutcome, command_predicate, predicate, run_command,
};
use crate::prompt::{PendingPrompt, Prompt, PromptValues, TextField};

/// Wraps a document command as a menu item.
///
/// The label defaults to the title and `run` to the command. With neither
/// `enable` nor `select` given, the item is shown and enabled only when the
/// command applies. An explicit `select` leaves `enable` to the command, and
/// `enable` forced on leaves `select` to it.
pub fn cmd_item(command: Command, mut options: MenuItemOptions) -> MenuItem {
    if options.label.is_none() {
        options.label = options.title.clone();
    }
    if options.run.is_none() {
        options.run = Some(run_command(command.clone()));
    }
    let forced_on = matches!(options.enable, Some(Enable::Always));
    match (options.enable.is_some(), options.select.is_some()) {
        (false, false) => {
            options.enable = Some(Enable::When(command_predicate(command.clone())));
            options.select = Some(command_predicate(command));
        }
        (false, true) => options.enable = Some(Enable::When(command_predicate(command))),
        (true, false) if forced_on => options.select = Some(command_predicate(command)),
        (true, _) => {}
    }
    MenuItem::new(options)
}

/// A toggle for an inline mark; active when the mark covers the selection.
pub fn mark_item(kind: &str, mut options: MenuItemOptions) -> MenuItem {
    if options.active.is_none() {
        let kind = kind.to_string();
        options.active = Some(predicate(move |state| mark_active(state, &kind)));
    }
    if options.enable.is_none() {
        options.enable = Some(Enable::Always);
    }
    let command = toggle_mark(kind, options.attrs.clone());
    cmd_item(command, options)
}

/// Prefixes `http://` unless the target already names http or https.
pub fn normalize_link_href(href: &str) -> String {
    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        href.get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    });
    if has_scheme {
        href.to_string()
    } else {
        format!("http://{href}")
    }
}

fn link_prompt() -> Prompt {
    Prompt::new("Create a link")
        .field(
            "href",
            TextField::new("Link target")
                .required()
                .clean(|href| normalize_link_href(&href)),
        )
        .field("title", TextField::new("Title"))
}

fn attrs_from(values: &PromptValues, names: &[&str]) -> Attrs {
    names
        .iter()
        .filter_map(|name| {
            let value = values.non_empty(name)?;
            Some((name.to_string(), Value::String(value.to_string())))
        })
        .collect()
}

/// Removes the link under the selection, or asks for a target and adds one.
pub fn link_item(kind: &str) -> MenuItem {
    let active_kind = kind.to_string();
    let kind = kind.to_string();
    MenuItem::new(
        MenuItemOptions::new()
            .title("Add or remove link")
            .icon(MenuIcon::Link)
            .active_when(move |state| mark_active(state, &active_kind))
            .enable_when(|state| !state.selection().is_collapsed())
            .run(move |editor| {
                if mark_active(editor.state(), &kind) {
                    let removed = editor.run(&toggle_mark(kind.clone(), Attrs::default()));
                    return RunOutcome::Done(removed);
                }
                let kind = kind.clone();
                RunOutcome::Prompt(PendingPrompt::new(link_prompt(), move |editor, values| {
                    let attrs = attrs_from(values, &["href", "title"]);
                    let applied = editor.run(&toggle_mark(kind, attrs));
                    editor.focus();
                    applied
                }))
            }),
    )
}

pub fn wrap_list_item(kind: &str, options: MenuItemOptions) -> MenuItem {
    let command = wrap_in_list(kind, options.attrs.clone());
    cmd_item(command, options)
}

/// Wraps the selection in `kind`; hidden when that is not possible.
pub fn wrap_item(kind: &str, mut options: MenuItemOptions) -> MenuItem {
    let command = wrap_in(kind, options.attrs.clone());
    options
        .run
        .get_or_insert_with(|| run_command(command.clone()));
    options
        .select
        .get_or_insert_with(|| command_predicate(command));
    MenuItem::new(options)
}

/// Turns the selected textblocks into `kind` with the options' attrs.
pub fn block_type_item(kind: &str, mut options: MenuItemOptions) -> MenuItem {
    let command = set_block_type(kind, options.attrs.clone());
    if options.active.is_none() {
        let kind = kind.to_string();
        let attrs = options.attrs.clone();
        options.active = Some(predicate(move |state| {
            block_type_active(state, &kind, &attrs)
        }));
    }
    options
        .run
        .get_or_insert_with(|| run_command(command.clone()));
    options
        .enable
        .get_or_insert_with(|| Enable::When(command_predicate(command)));
    MenuItem::new(options)
}

fn select_command_item(command: Command, options: MenuItemOptions) -> MenuItem {
    let mut options = options;
    options.run = Some(run_command(command.clone()));
    options.select = Some(command_predicate(command));
    MenuItem::new(options)
}

pub fn join_up_item() -> MenuItem {
    select_command_item(
        join_up(),
        MenuItemOptions::new()
            .title("Join with above block")
            .icon(MenuIcon::JoinUp),
    )
}

pub fn lift_item() -> MenuItem {
    select_command_item(
        lift(),
        MenuItemOptions::new()
            .title("Lift out of enclosing block")
            .icon(MenuIcon::Lift),
    )
}

/// Text of a selection that stays inside one textblock.
fn selected_text(state: &EditorState) -> Option<String> {
    let (from, to) = state.selection().ordered();
    let block = from.block_path();
    if from == to || block != to.block_path() {
        return None;
    }
    let children = &state.doc().element(block)?.children;
    let start = point_global_offset(children, *from.path.last()?, from.offset);
    let end = point_global_offset(children, *to.path.last()?, to.offset);
    Some(inline_text(&slice_inline(children, start, end)))
}

pub fn insert_image_item(kind: &str) -> MenuItem {
    let enable_kind = kind.to_string();
    let kind = kind.to_string();
    MenuItem::new(
        MenuItemOptions::new()
            .title("Insert image")
            .label("Image")
            .icon(MenuIcon::Image)
            .enable_when(move |state| can_insert(state, &enable_kind))
            .run(move |editor| {
                let mut alt = TextField::new("Description");
                if let Some(text) = selected_text(editor.state()) {
                    alt = alt.default_value(text);
                }
                let prompt = Prompt::new("Insert image")
                    .field("src", TextField::new("Location").required())
                    .field("title", TextField::new("Title"))
                    .field("alt", alt);
                let kind = kind.clone();
                RunOutcome::Prompt(PendingPrompt::new(prompt, move |editor, values| {
                    let attrs = attrs_from(values, &["src", "title", "alt"]);
                    let applied = editor.run(&insert_node(Node::void(kind, attrs)));
                    editor.focus();
                    applied
                }))
            }),
    )
}

pub fn insert_rule_item(kind: &str) -> MenuItem {
    let enable_kind = kind.to_string();
    let rule = insert_node(Node::void(kind, Attrs::default()));
    MenuItem::new(
        MenuItemOptions::new()
            .title("Insert horizontal rule")
            .label("Horizontal rule")
            .icon(MenuIcon::Minus)
            .enable_when(move |state| can_insert(state, &enable_kind))
            .run(move |editor| RunOutcome::Done(editor.run(&rule))),
    )
}

/// Largest row or column count the table prompt accepts.
pub const MAX_TABLE_SIZE: usize = 100;

fn table_count(value: &str) -> Option<String> {
    match value.trim().parse::<usize>() {
        Ok(count) if (1..=MAX_TABLE_SIZE).contains(&count) => None,
        Ok(count) if count > MAX_TABLE_SIZE => Some(format!("At most {MAX_TABLE_SIZE} allowed")),
        _ => Some("Expected a positive whole number".to_string()),
    }
}

fn read_count(values: &PromptValues, name: &str) -> usize {
    values
        .get(name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(1)
}

fn table_prompt() -> Prompt {
    Prompt::new("Insert table")
        .field(
            "rows",
            TextField::new("Rows")
                .required()
                .default_value("1")
                .validate(table_count),
        )
        .field(
            "columns",
            TextField::new("Columns")
                .default_value("1")
                .validate(table_count),
        )
}

/// Grows a one-cell header table around the selection to `rows` x `columns`.
/// Each step is its own transaction and sees the table the previous one left.
fn build_table(editor: &mut Editor, wrap: &Command, rows: usize, columns: usize) -> bool {
    if !editor.run(wrap) {
        return false;
    }
    for _ in 1..columns {
        editor.run(&add_column_after());
    }
    // The header kind of the first column spreads with the new columns; two
    // toggles settle the whole first row as headers.
    editor.run(&toggle_header_row());
    editor.run(&toggle_header_row());
    for _ in 1..rows {
        editor.run(&add_row_after());
    }
    editor.focus();
    true
}

/// Asks for a size, then builds a table at the selection.
pub fn wrap_table_item(schema: &Schema, mut options: MenuItemOptions) -> MenuItem {
    let wrap: Command = match schema.node(TABLE_HEADER) {
        Some(spec) => wrap_in(spec.kind.clone(), Attrs::default()),
        None => command(|_, _| false),
    };

    if options.run.is_none() {
        let wrap = wrap.clone();
        let run: RunFn = Arc::new(move |_editor: &mut Editor| {
            let wrap = wrap.clone();
            RunOutcome::Prompt(PendingPrompt::new(table_prompt(), move |editor, values| {
                let rows = read_count(values, "rows");
                let columns = read_count(values, "columns");
                build_table(editor, &wrap, rows, columns)
            }))
        });
        options.run = Some(run);
    }
    options
        .enable
        .get_or_insert_with(|| Enable::When(command_predicate(wrap.clone())));
    options
        .select
        .get_or_insert_with(|| command_predicate(wrap));
    MenuItem::new(options)
}

/// Row and column editing, each shown only where it applies.
pub fn table_menu() -> Vec<MenuItem> {
    let item = |label: &str, command: Command| {
        select_command_item(command, MenuItemOptions::new().label(label))
    };
    vec![
        item("Insert column before", add_column_before()),
        item("Insert column after", add_column_after()),
        item("Delete column", delete_column()),
        item("Insert row before", add_row_before()),
        item("Insert row after", add_row_after()),
        item("Delete row", delete_row()),
        item("Delete table", delete_table()),
    ]
}

pub fn table_dropdown() -> Option<Dropdown> {
    Dropdown::new(
        table_menu()
            .into_iter()
            .map(|item| Some(MenuElement::Item(item))),
        DropdownOptions::new().icon(MenuIcon::Table),
    )
}
