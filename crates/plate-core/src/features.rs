//! Built-in feature descriptors.

use std::sync::Arc;

use serde_json::Value;

use crate::commands::{
    insert_node, join_up, lift, set_block_type, toggle_mark, wrap_in, wrap_in_list,
};
use crate::core::{Attrs, EditorState, Node};
use crate::input_rules::{InputMatch, InputRule};
use crate::keymap::Keymap;
use crate::plugin::{
    EditorBehavior, EditorOptions, FeatureError, MarkdownRegistrar, PlatePlugin, PluginRegistry,
};
use crate::schema::{ChildConstraint, MarkSpec, NodeSpec, Schema};
use crate::table::{TABLE, TABLE_CELL, TABLE_HEADER, TABLE_ROW};

pub const MAX_HEADING_LEVEL: u8 = 6;

pub fn heading_attrs(level: u8) -> Attrs {
    Attrs::from([("level".to_string(), Value::from(level))])
}

fn no_attrs(_: &InputMatch) -> Attrs {
    Attrs::default()
}

impl PluginRegistry {
    /// Every built-in feature, in precedence order.
    pub fn standard() -> Self {
        let plugins: Vec<Arc<dyn PlatePlugin>> = vec![
            Arc::new(DocPlugin),
            Arc::new(ParagraphPlugin),
            Arc::new(BlockquotePlugin),
            Arc::new(BulletListPlugin),
            Arc::new(StrongPlugin),
            Arc::new(CodePlugin),
            Arc::new(CodeBlockPlugin),
            Arc::new(EmojiPlugin),
            Arc::new(HardBreakPlugin),
            Arc::new(EmPlugin),
            Arc::new(HorizontalRulePlugin),
            Arc::new(ImagePlugin),
            Arc::new(ListItemPlugin),
            Arc::new(OrderedListPlugin),
            Arc::new(HeadingPlugin),
            Arc::new(StrikethroughPlugin),
            Arc::new(TablePlugin),
            Arc::new(LinkPlugin),
        ];
        Self::new(plugins)
    }
}

/// Marker for the document root; contributes nothing.
pub struct DocPlugin;

impl PlatePlugin for DocPlugin {
    fn id(&self) -> &str {
        "doc"
    }
}

pub struct ParagraphPlugin;

impl PlatePlugin for ParagraphPlugin {
    fn id(&self) -> &str {
        "paragraph"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("paragraph")]
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([(
            "Shift-Ctrl-0",
            set_block_type("paragraph", Attrs::default()),
        )])?;
        Ok(Some(keymap))
    }
}

pub struct BlockquotePlugin;

impl PlatePlugin for BlockquotePlugin {
    fn id(&self) -> &str {
        "blockquote"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block("blockquote", ChildConstraint::BlockOnly)]
    }

    fn input_rules(&self, schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        if !schema.has_node("blockquote") {
            return Ok(Vec::new());
        }
        Ok(vec![InputRule::wrapping(
            "blockquote",
            r"^\s*>\s$",
            "blockquote",
            no_attrs,
        )?])
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([
            ("Ctrl->", wrap_in("blockquote", Attrs::default())),
            ("Alt-ArrowUp", join_up()),
        ])?;
        Ok(Some(keymap))
    }
}

pub struct BulletListPlugin;

impl PlatePlugin for BulletListPlugin {
    fn id(&self) -> &str {
        "bullet_list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(
            "bullet_list",
            ChildConstraint::Kinds(vec!["list_item".into()]),
        )]
    }

    fn input_rules(&self, schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        if !schema.has_node("bullet_list") {
            return Ok(Vec::new());
        }
        Ok(vec![InputRule::wrapping(
            "bullet_list",
            r"^\s*([-+*])\s$",
            "bullet_list",
            no_attrs,
        )?])
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([(
            "Shift-Ctrl-8",
            wrap_in_list("bullet_list", Attrs::default()),
        )])?;
        Ok(Some(keymap))
    }
}

pub struct OrderedListPlugin;

impl PlatePlugin for OrderedListPlugin {
    fn id(&self) -> &str {
        "ordered_list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(
            "ordered_list",
            ChildConstraint::Kinds(vec!["list_item".into()]),
        )]
    }

    fn input_rules(&self, schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        if !schema.has_node("ordered_list") {
            return Ok(Vec::new());
        }
        Ok(vec![InputRule::wrapping(
            "ordered_list",
            r"^(\d+)\.\s$",
            "ordered_list",
            |m: &InputMatch| {
                let order = m
                    .group(1)
                    .and_then(|digits| digits.parse::<u64>().ok())
                    .unwrap_or(1);
                Attrs::from([("order".to_string(), Value::from(order))])
            },
        )?])
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([(
            "Shift-Ctrl-9",
            wrap_in_list("ordered_list", Attrs::default()),
        )])?;
        Ok(Some(keymap))
    }
}

pub struct ListItemPlugin;

impl PlatePlugin for ListItemPlugin {
    fn id(&self) -> &str {
        "list_item"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::component("list_item", ChildConstraint::BlockOnly)]
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([("Mod-[", lift())])?;
        Ok(Some(keymap))
    }
}

pub struct StrongPlugin;

impl PlatePlugin for StrongPlugin {
    fn id(&self) -> &str {
        "strong"
    }

    fn mark_specs(&self) -> Vec<MarkSpec> {
        vec![MarkSpec::new("strong")]
    }

    fn input_rules(&self, _schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        Ok(vec![InputRule::mark("strong", r"\*\*([^*]+)\*\*$", "strong")?])
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([
            ("Mod-b", toggle_mark("strong", Attrs::default())),
            ("Mod-B", toggle_mark("strong", Attrs::default())),
        ])?;
        Ok(Some(keymap))
    }
}

pub struct EmPlugin;

impl PlatePlugin for EmPlugin {
    fn id(&self) -> &str {
        "em"
    }

    fn mark_specs(&self) -> Vec<MarkSpec> {
        vec![MarkSpec::new("em")]
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([
            ("Mod-i", toggle_mark("em", Attrs::default())),
            ("Mod-I", toggle_mark("em", Attrs::default())),
        ])?;
        Ok(Some(keymap))
    }
}

pub struct CodePlugin;

impl PlatePlugin for CodePlugin {
    fn id(&self) -> &str {
        "code"
    }

    fn mark_specs(&self) -> Vec<MarkSpec> {
        vec![MarkSpec::new("code")]
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([("Mod-`", toggle_mark("code", Attrs::default()))])?;
        Ok(Some(keymap))
    }
}

pub struct StrikethroughPlugin;

impl PlatePlugin for StrikethroughPlugin {
    fn id(&self) -> &str {
        "strikethrough"
    }

    fn mark_specs(&self) -> Vec<MarkSpec> {
        vec![MarkSpec::new("strikethrough")]
    }

    fn input_rules(&self, _schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        Ok(vec![InputRule::mark(
            "strikethrough",
            r"~~([^~]+)~~$",
            "strikethrough",
        )?])
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([(
            "Mod-d",
            toggle_mark("strikethrough", Attrs::default()),
        )])?;
        Ok(Some(keymap))
    }

    fn register_markdown(&self, registrar: &mut dyn MarkdownRegistrar) {
        registrar.use_extension(self.id(), "strikethrough");
    }
}

pub struct LinkPlugin;

impl PlatePlugin for LinkPlugin {
    fn id(&self) -> &str {
        "link"
    }

    fn mark_specs(&self) -> Vec<MarkSpec> {
        vec![MarkSpec::new("link")]
    }
}

pub struct CodeBlockPlugin;

impl PlatePlugin for CodeBlockPlugin {
    fn id(&self) -> &str {
        "code_block"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("code_block").code()]
    }

    fn input_rules(&self, schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        if !schema.has_node("code_block") {
            return Ok(Vec::new());
        }
        Ok(vec![InputRule::textblock_type(
            "code_block",
            r"^```$",
            "code_block",
            no_attrs,
        )?])
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([(
            "Shift-Ctrl-\\",
            set_block_type("code_block", Attrs::default()),
        )])?;
        Ok(Some(keymap))
    }
}

pub struct HeadingPlugin;

impl PlatePlugin for HeadingPlugin {
    fn id(&self) -> &str {
        "heading"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("heading")]
    }

    fn input_rules(&self, schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        if !schema.has_node("heading") {
            return Ok(Vec::new());
        }
        Ok(vec![InputRule::textblock_type(
            "heading",
            r"^(#{1,6})\s$",
            "heading",
            |m: &InputMatch| {
                let level = m.group(1).map(str::len).unwrap_or(1);
                heading_attrs(u8::try_from(level).unwrap_or(MAX_HEADING_LEVEL))
            },
        )?])
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let mut keymap = Keymap::new();
        for level in 1..=MAX_HEADING_LEVEL {
            keymap.bind(
                &format!("Shift-Ctrl-{level}"),
                set_block_type("heading", heading_attrs(level)),
            )?;
        }
        Ok(Some(keymap))
    }
}

pub struct HardBreakPlugin;

impl PlatePlugin for HardBreakPlugin {
    fn id(&self) -> &str {
        "hard_break"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_void("hard_break")]
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let hard_break = || insert_node(Node::void("hard_break", Attrs::default()));
        let keymap =
            Keymap::from_bindings([("Mod-Enter", hard_break()), ("Shift-Enter", hard_break())])?;
        Ok(Some(keymap))
    }
}

pub struct HorizontalRulePlugin;

impl PlatePlugin for HorizontalRulePlugin {
    fn id(&self) -> &str {
        "horizontal_rule"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void_block("horizontal_rule")]
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        let keymap = Keymap::from_bindings([(
            "Mod-_",
            insert_node(Node::void("horizontal_rule", Attrs::default())),
        )])?;
        Ok(Some(keymap))
    }
}

pub struct ImagePlugin;

impl PlatePlugin for ImagePlugin {
    fn id(&self) -> &str {
        "image"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_void("image")]
    }

    fn register_markdown(&self, registrar: &mut dyn MarkdownRegistrar) {
        registrar.use_extension(self.id(), "imsize");
    }
}

pub struct TablePlugin;

impl PlatePlugin for TablePlugin {
    fn id(&self) -> &str {
        "table"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::block(TABLE, ChildConstraint::Kinds(vec![TABLE_ROW.into()])),
            NodeSpec::component(
                TABLE_ROW,
                ChildConstraint::Kinds(vec![TABLE_CELL.into(), TABLE_HEADER.into()]),
            ),
            NodeSpec::component(TABLE_CELL, ChildConstraint::BlockOnly),
            NodeSpec::component(TABLE_HEADER, ChildConstraint::BlockOnly),
        ]
    }

    fn register_markdown(&self, registrar: &mut dyn MarkdownRegistrar) {
        registrar.use_extension(self.id(), "table");
    }
}

pub struct EmojiPlugin;

impl PlatePlugin for EmojiPlugin {
    fn id(&self) -> &str {
        "emoji"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_void("emoji")]
    }

    fn behaviors(&self, _options: &EditorOptions) -> Vec<Arc<dyn EditorBehavior>> {
        vec![Arc::new(UnwrapPastedDocument)]
    }
}

/// Pasting a whole document inserts its blocks, not the document node.
struct UnwrapPastedDocument;

impl EditorBehavior for UnwrapPastedDocument {
    fn id(&self) -> &str {
        "emoji.unwrap_pasted_document"
    }

    fn transform_pasted(&self, _state: &EditorState, nodes: Vec<Node>) -> Vec<Node> {
        if let [Node::Element(el)] = nodes.as_slice() {
            if el.kind == "doc" {
                return el.children.clone();
            }
        }
        nodes
    }
}
