use std::collections::BTreeMap;
use std::fmt;

use plate_core::{EditorOptions, MAX_HEADING_LEVEL, Schema, heading_attrs};

use crate::factory::{
    block_type_item, insert_image_item, insert_rule_item, join_up_item, lift_item, link_item,
    mark_item, table_dropdown, wrap_item, wrap_list_item, wrap_table_item,
};
use crate::icons::MenuIcon;
use crate::item::{
    Dropdown, DropdownOptions, DropdownSubmenu, MenuElement, MenuItem, MenuItemOptions, Toolbar,
};

/// Well-known menu entries, one per schema type (one per level for headings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MenuEntry {
    InsertImage,
    WrapBulletList,
    WrapOrderedList,
    InsertTable,
    WrapBlockQuote,
    MakeParagraph,
    MakeCodeBlock,
    MakeHeading(u8),
    InsertHorizontalRule,
    ToggleStrong,
    ToggleEm,
    ToggleCode,
    ToggleLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Node,
    Mark,
}

pub type EntryBuilder = fn(&Schema, &str) -> Vec<(MenuEntry, MenuItem)>;

#[derive(Clone)]
struct CatalogEntry {
    type_name: String,
    kind: TypeKind,
    build: EntryBuilder,
}

/// Maps schema type names to the builders of their menu entries.
#[derive(Clone, Default)]
pub struct MenuCatalog {
    entries: Vec<CatalogEntry>,
}

impl fmt::Debug for MenuCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.type_name))
            .finish()
    }
}

impl MenuCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the builder for `type_name`.
    pub fn with(mut self, type_name: impl Into<String>, kind: TypeKind, build: EntryBuilder) -> Self {
        let type_name = type_name.into();
        let entry = CatalogEntry {
            type_name: type_name.clone(),
            kind,
            build,
        };
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.type_name == type_name)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn standard() -> Self {
        Self::new()
            .with("image", TypeKind::Node, image_entries)
            .with("bullet_list", TypeKind::Node, bullet_list_entries)
            .with("ordered_list", TypeKind::Node, ordered_list_entries)
            .with("table", TypeKind::Node, table_entries)
            .with("blockquote", TypeKind::Node, blockquote_entries)
            .with("paragraph", TypeKind::Node, paragraph_entries)
            .with("code_block", TypeKind::Node, code_block_entries)
            .with("heading", TypeKind::Node, heading_entries)
            .with("horizontal_rule", TypeKind::Node, horizontal_rule_entries)
            .with("strong", TypeKind::Mark, strong_entries)
            .with("em", TypeKind::Mark, em_entries)
            .with("code", TypeKind::Mark, code_entries)
            .with("link", TypeKind::Mark, link_entries)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.type_name.as_str())
    }

    /// The entries for one type, or none when the schema lacks it.
    pub fn entries_for_type(&self, schema: &Schema, type_name: &str) -> Vec<(MenuEntry, MenuItem)> {
        let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.type_name == type_name)
        else {
            return Vec::new();
        };
        let present = match entry.kind {
            TypeKind::Node => schema.has_node(type_name),
            TypeKind::Mark => schema.has_mark(type_name),
        };
        if !present {
            tracing::trace!(type_name, "schema lacks type; menu entry omitted");
            return Vec::new();
        }
        (entry.build)(schema, type_name)
    }

    pub fn build(&self, schema: &Schema) -> BTreeMap<MenuEntry, MenuItem> {
        self.type_names()
            .flat_map(|type_name| self.entries_for_type(schema, type_name))
            .collect()
    }
}

fn image_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    vec![(MenuEntry::InsertImage, insert_image_item(name))]
}

fn bullet_list_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Wrap in bullet list")
        .icon(MenuIcon::List);
    vec![(MenuEntry::WrapBulletList, wrap_list_item(name, options))]
}

fn ordered_list_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Wrap in ordered list")
        .icon(MenuIcon::ListOrdered);
    vec![(MenuEntry::WrapOrderedList, wrap_list_item(name, options))]
}

fn table_entries(schema: &Schema, _name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Create table")
        .icon(MenuIcon::Table);
    vec![(MenuEntry::InsertTable, wrap_table_item(schema, options))]
}

fn blockquote_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Wrap in block quote")
        .icon(MenuIcon::Blockquote);
    vec![(MenuEntry::WrapBlockQuote, wrap_item(name, options))]
}

fn paragraph_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Change to paragraph")
        .label("Paragraph");
    vec![(MenuEntry::MakeParagraph, block_type_item(name, options))]
}

fn code_block_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Change to code block")
        .label("Code");
    vec![(MenuEntry::MakeCodeBlock, block_type_item(name, options))]
}

fn heading_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    (1..=MAX_HEADING_LEVEL)
        .map(|level| {
            let options = MenuItemOptions::new()
                .title(format!("Change to heading {level}"))
                .label(format!("H{level} ({})", "#".repeat(level.into())))
                .attrs(heading_attrs(level));
            (MenuEntry::MakeHeading(level), block_type_item(name, options))
        })
        .collect()
}

fn horizontal_rule_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    vec![(MenuEntry::InsertHorizontalRule, insert_rule_item(name))]
}

fn strong_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Toggle strong style")
        .icon(MenuIcon::Bold);
    vec![(MenuEntry::ToggleStrong, mark_item(name, options))]
}

fn em_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Toggle emphasis")
        .icon(MenuIcon::Italic);
    vec![(MenuEntry::ToggleEm, mark_item(name, options))]
}

fn code_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    let options = MenuItemOptions::new()
        .title("Toggle code font")
        .icon(MenuIcon::CodeXml);
    vec![(MenuEntry::ToggleCode, mark_item(name, options))]
}

fn link_entries(_schema: &Schema, name: &str) -> Vec<(MenuEntry, MenuItem)> {
    vec![(MenuEntry::ToggleLink, link_item(name))]
}

/// Everything the assembler produced for one schema.
#[derive(Debug, Clone, Default)]
pub struct MenuItems {
    pub items: BTreeMap<MenuEntry, MenuItem>,
    pub table_dropdown: Option<Dropdown>,
    pub insert_menu: Option<Dropdown>,
    pub type_menu: Option<Dropdown>,
    pub inline_menu: Vec<MenuElement>,
    pub block_menu: Vec<MenuElement>,
    pub full_menu: Toolbar,
}

impl MenuItems {
    pub fn get(&self, entry: MenuEntry) -> Option<&MenuItem> {
        self.items.get(&entry)
    }

    fn element(&self, entry: MenuEntry) -> Option<MenuElement> {
        self.get(entry).cloned().map(MenuElement::Item)
    }
}

pub fn build_menu_items(schema: &Schema) -> MenuItems {
    build_menu_items_with(&MenuCatalog::standard(), schema)
}

pub fn build_menu_items_with(catalog: &MenuCatalog, schema: &Schema) -> MenuItems {
    let mut menu = MenuItems {
        items: catalog.build(schema),
        ..MenuItems::default()
    };

    if menu.items.contains_key(&MenuEntry::InsertTable) {
        menu.table_dropdown = table_dropdown();
    }

    menu.insert_menu = Dropdown::new(
        [
            menu.element(MenuEntry::InsertImage),
            menu.element(MenuEntry::InsertHorizontalRule),
        ],
        DropdownOptions::new().label("Insert").icon(MenuIcon::Image),
    );

    let headings = DropdownSubmenu::new(
        (1..=MAX_HEADING_LEVEL).map(|level| menu.element(MenuEntry::MakeHeading(level))),
        DropdownOptions::new().label("Heading"),
    );
    menu.type_menu = Dropdown::new(
        [
            menu.element(MenuEntry::MakeParagraph),
            menu.element(MenuEntry::MakeCodeBlock),
            headings.map(MenuElement::Submenu),
        ],
        DropdownOptions::new().icon(MenuIcon::Text),
    );

    menu.inline_menu = [
        menu.type_menu.clone().map(MenuElement::Dropdown),
        menu.element(MenuEntry::ToggleStrong),
        menu.element(MenuEntry::ToggleEm),
        menu.element(MenuEntry::ToggleCode),
        menu.element(MenuEntry::ToggleLink),
    ]
    .into_iter()
    .flatten()
    .collect();

    menu.block_menu = [
        menu.element(MenuEntry::WrapBulletList),
        menu.element(MenuEntry::WrapOrderedList),
        menu.element(MenuEntry::WrapBlockQuote),
        Some(MenuElement::Item(join_up_item())),
        Some(MenuElement::Item(lift_item())),
    ]
    .into_iter()
    .flatten()
    .collect();

    let insert_row: Vec<MenuElement> = [
        menu.element(MenuEntry::InsertTable),
        menu.table_dropdown.clone().map(MenuElement::Dropdown),
        menu.insert_menu.clone().map(MenuElement::Dropdown),
    ]
    .into_iter()
    .flatten()
    .collect();

    let rows = [menu.inline_menu.clone(), menu.block_menu.clone(), insert_row]
        .into_iter()
        .filter(|row| !row.is_empty())
        .collect();
    menu.full_menu = Toolbar::new(rows);
    tracing::debug!(
        entries = menu.items.len(),
        rows = menu.full_menu.rows.len(),
        "menu assembled"
    );
    menu
}

/// The toolbar for the options' schema.
pub fn build_menu(options: &EditorOptions) -> Toolbar {
    build_menu_items(&options.schema).full_menu
}
