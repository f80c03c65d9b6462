use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::core::{Attrs, Document, Editor, EditorState, Node, Point, Selection};
use crate::input_rules::{InputRule, InputRules, baseline_rules};
use crate::keymap::{Keymap, KeymapError};
use crate::ops::Transaction;
use crate::schema::{MarkSpec, NodeSpec, Schema, SchemaError};

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Keymap(#[from] KeymapError),
    #[error("invalid input rule pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Editor-level behavior contributed by a feature.
pub trait EditorBehavior: Send + Sync {
    fn id(&self) -> &str;

    /// Rewrites a transaction before it is applied; `None` keeps it as is.
    fn transform_transaction(&self, _state: &EditorState, _tx: &Transaction) -> Option<Transaction> {
        None
    }

    fn transform_pasted(&self, _state: &EditorState, nodes: Vec<Node>) -> Vec<Node> {
        nodes
    }
}

/// Receives the markdown parser extensions features ask for.
pub trait MarkdownRegistrar {
    fn use_extension(&mut self, feature: &str, extension: &str);
}

/// Records `(feature, extension)` pairs in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownExtensions {
    entries: Vec<(String, String)>,
}

impl MarkdownExtensions {
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, ext)| ext.as_str()).collect()
    }
}

impl MarkdownRegistrar for MarkdownExtensions {
    fn use_extension(&mut self, feature: &str, extension: &str) {
        self.entries.push((feature.to_string(), extension.to_string()));
    }
}

/// A feature descriptor. Every contribution hook is optional.
pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &str;

    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }

    fn mark_specs(&self) -> Vec<MarkSpec> {
        Vec::new()
    }

    fn input_rules(&self, _schema: &Schema) -> Result<Vec<InputRule>, FeatureError> {
        Ok(Vec::new())
    }

    fn keymap(&self, _options: &EditorOptions) -> Result<Option<Keymap>, FeatureError> {
        Ok(None)
    }

    fn behaviors(&self, _options: &EditorOptions) -> Vec<Arc<dyn EditorBehavior>> {
        Vec::new()
    }

    fn register_markdown(&self, _registrar: &mut dyn MarkdownRegistrar) {}
}

pub type ResolvedPlugins = Vec<Arc<dyn PlatePlugin>>;

#[derive(Clone, Default, Deserialize)]
pub struct PluginSelection {
    /// Ad-hoc descriptors appended after the registered ones.
    #[serde(skip)]
    pub include: Option<ResolvedPlugins>,
    #[serde(default, deserialize_with = "lenient_exclude")]
    pub exclude: Option<Vec<String>>,
}

impl fmt::Debug for PluginSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let include: Option<Vec<&str>> = self
            .include
            .as_ref()
            .map(|plugins| plugins.iter().map(|p| p.id()).collect());
        f.debug_struct("PluginSelection")
            .field("include", &include)
            .field("exclude", &self.exclude)
            .finish()
    }
}

/// A non-array `exclude` turns into "exclude nothing".
fn lenient_exclude<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(id) => Some(id),
                    _ => None,
                })
                .collect(),
        ),
        Some(other) => {
            tracing::warn!(value = %other, "plugins.exclude is not an array; nothing is excluded");
            None
        }
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub plugins: Option<PluginSelection>,
}

impl RegistryConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn exclude<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins.get_or_insert_with(PluginSelection::default).exclude =
            Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn include(mut self, plugins: impl IntoIterator<Item = Arc<dyn PlatePlugin>>) -> Self {
        self.plugins.get_or_insert_with(PluginSelection::default).include =
            Some(plugins.into_iter().collect());
        self
    }

    fn excluded(&self) -> Option<&[String]> {
        self.plugins.as_ref()?.exclude.as_deref()
    }

    fn included(&self) -> Option<&[Arc<dyn PlatePlugin>]> {
        self.plugins.as_ref()?.include.as_deref()
    }
}

/// What every feature hook sees: the active schema, the registry config it
/// was resolved with, and free-form per-feature settings.
#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub schema: Arc<Schema>,
    pub config: RegistryConfig,
    pub settings: Attrs,
}

impl EditorOptions {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            config: RegistryConfig::default(),
            settings: Attrs::default(),
        }
    }

    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn get_setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// The ordered feature list plus the named preset cache.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn PlatePlugin>>,
    presets: Mutex<HashMap<String, ResolvedPlugins>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.ids())
            .field("presets", &self.cached_presets())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Arc<dyn PlatePlugin>>) -> Self {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register(plugin);
        }
        registry
    }

    /// Appends `plugin`. Ids are not checked for duplicates.
    pub fn register(&mut self, plugin: Arc<dyn PlatePlugin>) {
        tracing::debug!(plugin = plugin.id(), "plugin registered");
        self.plugins.push(plugin);
    }

    pub fn register_plugin(&mut self, plugin: impl PlatePlugin + 'static) {
        self.register(Arc::new(plugin));
    }

    pub fn plugins(&self) -> &[Arc<dyn PlatePlugin>] {
        &self.plugins
    }

    pub fn ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.id()).collect()
    }

    /// The active feature subset for `config`.
    ///
    /// A cached preset is returned as is. Otherwise the registered features
    /// minus `exclude`, followed by `include`; the result is cached when a
    /// preset name is given.
    pub fn resolve(&self, config: &RegistryConfig) -> ResolvedPlugins {
        if let Some(preset) = config.preset.as_deref() {
            if let Some(cached) = self.presets.lock().get(preset) {
                tracing::debug!(preset, "preset cache hit");
                return cached.clone();
            }
        }

        let mut resolved: ResolvedPlugins = match config.excluded() {
            Some(excluded) => self
                .plugins
                .iter()
                .filter(|plugin| !excluded.iter().any(|id| id == plugin.id()))
                .cloned()
                .collect(),
            None => self.plugins.clone(),
        };
        if let Some(included) = config.included() {
            resolved.extend(included.iter().cloned());
        }

        if let Some(preset) = config.preset.as_deref() {
            tracing::debug!(preset, plugins = resolved.len(), "preset cached");
            self.presets
                .lock()
                .insert(preset.to_string(), resolved.clone());
        }
        resolved
    }

    pub fn cached_presets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.presets.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// The baseline rules followed by each active feature's rules.
pub fn build_input_rules(registry: &PluginRegistry, options: &EditorOptions) -> InputRules {
    let mut rules = baseline_rules();
    for plugin in registry.resolve(&options.config) {
        match plugin.input_rules(&options.schema) {
            Ok(contributed) => rules.extend(contributed),
            Err(err) => {
                tracing::warn!(plugin = plugin.id(), error = %err, "skipping input rules");
            }
        }
    }
    InputRules::new(rules)
}

pub fn build_plugins(
    registry: &PluginRegistry,
    options: &EditorOptions,
) -> Vec<Arc<dyn EditorBehavior>> {
    registry
        .resolve(&options.config)
        .iter()
        .flat_map(|plugin| plugin.behaviors(options))
        .collect()
}

/// One keymap per active feature that binds keys, in resolution order.
pub fn build_plugin_keymap(registry: &PluginRegistry, options: &EditorOptions) -> Vec<Keymap> {
    let mut keymaps = Vec::new();
    for plugin in registry.resolve(&options.config) {
        match plugin.keymap(options) {
            Ok(Some(keymap)) => keymaps.push(keymap),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(plugin = plugin.id(), error = %err, "skipping keymap");
            }
        }
    }
    keymaps
}

/// Merges the node and mark specs of the active features, in order.
pub fn build_schema(registry: &PluginRegistry, config: &RegistryConfig) -> Result<Schema, SchemaError> {
    let mut schema = Schema::default();
    for plugin in registry.resolve(config) {
        for spec in plugin.node_specs() {
            schema.add_node(spec)?;
        }
        for spec in plugin.mark_specs() {
            schema.add_mark(spec)?;
        }
    }
    Ok(schema)
}

pub fn register_markdown_extensions(
    registry: &PluginRegistry,
    config: &RegistryConfig,
    registrar: &mut dyn MarkdownRegistrar,
) {
    for plugin in registry.resolve(config) {
        plugin.register_markdown(registrar);
    }
}

/// An editing surface wired with every aggregated contribution.
pub fn build_editor(registry: &PluginRegistry, options: &EditorOptions, doc: Document) -> Editor {
    let state = EditorState::new(
        options.schema.clone(),
        doc,
        Selection::collapsed(Point::new(vec![0, 0], 0)),
    );
    Editor::new(state)
        .with_input_rules(build_input_rules(registry, options))
        .with_keymaps(build_plugin_keymap(registry, options))
        .with_behaviors(build_plugins(registry, options))
}
