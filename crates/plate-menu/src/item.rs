use std::fmt;
use std::sync::Arc;

use plate_core::{Attrs, Command, Editor, EditorState};
use serde::Serialize;

use crate::icons::MenuIcon;
use crate::prompt::PendingPrompt;

pub type StatePredicate = Arc<dyn Fn(&EditorState) -> bool + Send + Sync>;
pub type RunFn = Arc<dyn Fn(&mut Editor) -> RunOutcome + Send + Sync>;

pub fn predicate(f: impl Fn(&EditorState) -> bool + Send + Sync + 'static) -> StatePredicate {
    Arc::new(f)
}

/// A predicate that holds when `command` would apply.
pub fn command_predicate(command: Command) -> StatePredicate {
    predicate(move |state| command(state, None))
}

pub fn run_command(command: Command) -> RunFn {
    Arc::new(move |editor| RunOutcome::Done(editor.run(&command)))
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The command ran; `false` means it did not apply.
    Done(bool),
    /// The command waits on user input before touching the document.
    Prompt(PendingPrompt),
}

impl RunOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Done(true))
    }

    pub fn into_prompt(self) -> Option<PendingPrompt> {
        match self {
            Self::Prompt(pending) => Some(pending),
            Self::Done(_) => None,
        }
    }
}

#[derive(Clone)]
pub enum Enable {
    /// Enabled whenever visible.
    Always,
    When(StatePredicate),
}

/// Caller-facing options for a menu item. Unset fields are derived by the
/// item factories.
#[derive(Clone, Default)]
pub struct MenuItemOptions {
    pub title: Option<String>,
    pub label: Option<String>,
    pub icon: Option<MenuIcon>,
    pub attrs: Attrs,
    pub enable: Option<Enable>,
    pub select: Option<StatePredicate>,
    pub active: Option<StatePredicate>,
    pub run: Option<RunFn>,
}

impl fmt::Debug for MenuItemOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItemOptions")
            .field("title", &self.title)
            .field("label", &self.label)
            .field("icon", &self.icon)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

impl MenuItemOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn icon(mut self, icon: MenuIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn enable_always(mut self) -> Self {
        self.enable = Some(Enable::Always);
        self
    }

    pub fn enable_when(mut self, f: impl Fn(&EditorState) -> bool + Send + Sync + 'static) -> Self {
        self.enable = Some(Enable::When(predicate(f)));
        self
    }

    pub fn select_when(mut self, f: impl Fn(&EditorState) -> bool + Send + Sync + 'static) -> Self {
        self.select = Some(predicate(f));
        self
    }

    pub fn active_when(mut self, f: impl Fn(&EditorState) -> bool + Send + Sync + 'static) -> Self {
        self.active = Some(predicate(f));
        self
    }

    pub fn run(mut self, run: impl Fn(&mut Editor) -> RunOutcome + Send + Sync + 'static) -> Self {
        self.run = Some(Arc::new(run));
        self
    }
}

/// What a toolbar renderer needs to draw one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemState {
    pub label: String,
    pub title: Option<String>,
    pub icon: Option<&'static str>,
    pub visible: bool,
    pub enabled: bool,
    pub active: bool,
}

#[derive(Clone)]
pub struct MenuItem {
    title: Option<String>,
    label: Option<String>,
    icon: Option<MenuIcon>,
    enable: Option<StatePredicate>,
    select: Option<StatePredicate>,
    active: Option<StatePredicate>,
    run: Option<RunFn>,
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("title", &self.title)
            .field("label", &self.label)
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}

impl MenuItem {
    pub fn new(options: MenuItemOptions) -> Self {
        let enable = match options.enable {
            Some(Enable::When(f)) => Some(f),
            Some(Enable::Always) | None => None,
        };
        Self {
            title: options.title,
            label: options.label,
            icon: options.icon,
            enable,
            select: options.select,
            active: options.active,
            run: options.run,
        }
    }

    /// The label, falling back to the title.
    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn icon(&self) -> Option<MenuIcon> {
        self.icon
    }

    pub fn is_visible(&self, state: &EditorState) -> bool {
        self.select.as_ref().is_none_or(|select| select(state))
    }

    pub fn is_enabled(&self, state: &EditorState) -> bool {
        self.is_visible(state) && self.enable.as_ref().is_none_or(|enable| enable(state))
    }

    pub fn is_active(&self, state: &EditorState) -> bool {
        self.active.as_ref().is_some_and(|active| active(state))
    }

    pub fn render_state(&self, state: &EditorState) -> ItemState {
        let visible = self.is_visible(state);
        ItemState {
            label: self.label().to_string(),
            title: self.title.clone(),
            icon: self.icon.map(MenuIcon::path),
            visible,
            enabled: visible && self.enable.as_ref().is_none_or(|enable| enable(state)),
            active: self.is_active(state),
        }
    }

    pub fn run(&self, editor: &mut Editor) -> RunOutcome {
        match &self.run {
            Some(run) => run(editor),
            None => RunOutcome::Done(false),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DropdownOptions {
    pub label: Option<String>,
    pub title: Option<String>,
    pub icon: Option<MenuIcon>,
}

impl DropdownOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn icon(mut self, icon: MenuIcon) -> Self {
        self.icon = Some(icon);
        self
    }
}

fn present(children: impl IntoIterator<Item = Option<MenuElement>>) -> Option<Vec<MenuElement>> {
    let children: Vec<MenuElement> = children.into_iter().flatten().collect();
    (!children.is_empty()).then_some(children)
}

/// A disclosure widget over other menu elements.
#[derive(Debug, Clone)]
pub struct Dropdown {
    options: DropdownOptions,
    children: Vec<MenuElement>,
}

impl Dropdown {
    /// Absent children are dropped; with none left there is no dropdown.
    pub fn new(
        children: impl IntoIterator<Item = Option<MenuElement>>,
        options: DropdownOptions,
    ) -> Option<Self> {
        Some(Self {
            options,
            children: present(children)?,
        })
    }

    pub fn options(&self) -> &DropdownOptions {
        &self.options
    }

    pub fn children(&self) -> &[MenuElement] {
        &self.children
    }
}

/// A nested group inside a dropdown.
#[derive(Debug, Clone)]
pub struct DropdownSubmenu {
    options: DropdownOptions,
    children: Vec<MenuElement>,
}

impl DropdownSubmenu {
    pub fn new(
        children: impl IntoIterator<Item = Option<MenuElement>>,
        options: DropdownOptions,
    ) -> Option<Self> {
        Some(Self {
            options,
            children: present(children)?,
        })
    }

    pub fn options(&self) -> &DropdownOptions {
        &self.options
    }

    pub fn children(&self) -> &[MenuElement] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub enum MenuElement {
    Item(MenuItem),
    Dropdown(Dropdown),
    Submenu(DropdownSubmenu),
}

impl From<MenuItem> for MenuElement {
    fn from(item: MenuItem) -> Self {
        Self::Item(item)
    }
}

impl From<Dropdown> for MenuElement {
    fn from(dropdown: Dropdown) -> Self {
        Self::Dropdown(dropdown)
    }
}

impl From<DropdownSubmenu> for MenuElement {
    fn from(submenu: DropdownSubmenu) -> Self {
        Self::Submenu(submenu)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementState {
    Item(ItemState),
    Dropdown {
        label: Option<String>,
        icon: Option<&'static str>,
        children: Vec<ElementState>,
    },
    Submenu {
        label: Option<String>,
        children: Vec<ElementState>,
    },
}

impl MenuElement {
    /// The element's own label; dropdowns without one report their title.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Item(item) => Some(item.label()),
            Self::Dropdown(Dropdown { options, .. })
            | Self::Submenu(DropdownSubmenu { options, .. }) => {
                options.label.as_deref().or(options.title.as_deref())
            }
        }
    }

    pub fn children(&self) -> &[MenuElement] {
        match self {
            Self::Item(_) => &[],
            Self::Dropdown(dropdown) => dropdown.children(),
            Self::Submenu(submenu) => submenu.children(),
        }
    }

    /// Depth-first search for an item by label.
    pub fn find_item(&self, label: &str) -> Option<&MenuItem> {
        match self {
            Self::Item(item) => (item.label() == label).then_some(item),
            _ => self
                .children()
                .iter()
                .find_map(|child| child.find_item(label)),
        }
    }

    pub fn render_state(&self, state: &EditorState) -> ElementState {
        let children = |children: &[MenuElement]| -> Vec<ElementState> {
            children
                .iter()
                .map(|child| child.render_state(state))
                .collect()
        };
        match self {
            Self::Item(item) => ElementState::Item(item.render_state(state)),
            Self::Dropdown(dropdown) => ElementState::Dropdown {
                label: dropdown.options.label.clone(),
                icon: dropdown.options.icon.map(MenuIcon::path),
                children: children(&dropdown.children),
            },
            Self::Submenu(submenu) => ElementState::Submenu {
                label: submenu.options.label.clone(),
                children: children(&submenu.children),
            },
        }
    }
}

/// Rows of menu elements, top to bottom.
#[derive(Debug, Clone, Default)]
pub struct Toolbar {
    pub rows: Vec<Vec<MenuElement>>,
}

impl Toolbar {
    pub fn new(rows: Vec<Vec<MenuElement>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<MenuElement>] {
        &self.rows
    }

    pub fn elements(&self) -> impl Iterator<Item = &MenuElement> {
        self.rows.iter().flatten()
    }

    pub fn find_item(&self, label: &str) -> Option<&MenuItem> {
        self.elements().find_map(|element| element.find_item(label))
    }

    pub fn render_state(&self, state: &EditorState) -> Vec<Vec<ElementState>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|element| element.render_state(state)).collect())
            .collect()
    }
}
