//! Widget registry: the capability surface the tree engine relies on
//!
//! Rendering lives elsewhere. The engine only asks a registry for default
//! props, whether a type may hold children, its default height mode, and
//! the resize handles the grid should offer.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::BuilderConfig;

use super::types::{HeightMode, ResizeHandle, WidgetInstance};

/// Errors that can occur while building a registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate widget definition: {type_name}")]
    Duplicate { type_name: String },

    #[error("widget type not registered: {type_name}")]
    NotFound { type_name: String },

    #[error("widget type name must not be empty")]
    EmptyType,
}

/// Catalog entry for one widget type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub supports_children: bool,
    #[serde(default)]
    pub default_props: Map<String, Value>,
    /// Explicit default height mode; unset falls back to the registry's
    /// auto-height type list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mode: Option<HeightMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize_handles: Option<Vec<ResizeHandle>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_options: Vec<String>,
}

impl WidgetDefinition {
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            label: type_name.clone(),
            type_name,
            category: String::new(),
            supports_children: false,
            default_props: Map::new(),
            height_mode: None,
            resize_handles: None,
            event_options: Vec::new(),
        }
    }

    pub fn with_children(mut self) -> Self {
        self.supports_children = true;
        self
    }

    pub fn with_height_mode(mut self, mode: HeightMode) -> Self {
        self.height_mode = Some(mode);
        self
    }

    pub fn with_default_props(mut self, props: Value) -> Self {
        if let Value::Object(map) = props {
            self.default_props = map;
        }
        self
    }
}

/// What the engine needs to know about a widget type.
///
/// Unknown types are not an error: every query has a neutral answer so
/// tree operations keep working with the raw type string.
pub trait WidgetRegistry {
    fn definition(&self, widget_type: &str) -> Option<&WidgetDefinition>;

    fn default_props(&self, widget_type: &str) -> Map<String, Value> {
        self.definition(widget_type)
            .map(|d| d.default_props.clone())
            .unwrap_or_default()
    }

    fn supports_children(&self, widget_type: &str) -> bool {
        self.definition(widget_type)
            .is_some_and(|d| d.supports_children)
    }

    fn default_height_mode(&self, widget_type: &str) -> HeightMode {
        self.definition(widget_type)
            .and_then(|d| d.height_mode)
            .unwrap_or(HeightMode::Fixed)
    }

    fn resize_handles(&self, widget_type: &str) -> Vec<ResizeHandle> {
        self.definition(widget_type)
            .and_then(|d| d.resize_handles.clone())
            .unwrap_or_else(|| ResizeHandle::ALL.to_vec())
    }

    /// Fresh instance seeded with the type's default props; container
    /// types start with an empty child list
    fn instantiate(&self, id: &str, widget_type: &str) -> WidgetInstance {
        let mut widget = WidgetInstance::new(id, widget_type);
        widget.props = self.default_props(widget_type);
        if self.supports_children(widget_type) {
            widget.children = Some(Vec::new());
        }
        widget
    }
}

/// In-memory registry keyed by type name
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: HashMap<String, Arc<WidgetDefinition>>,
    auto_height_types: BTreeSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded from the `[[widgets]]` catalog of a config
    pub fn from_config(config: &BuilderConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new().with_auto_height_types(config.auto_height_types.iter());
        for definition in &config.widgets {
            registry.register(definition.clone())?;
        }
        Ok(registry)
    }

    /// Types that default to auto height when their definition is silent
    pub fn with_auto_height_types<S: AsRef<str>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.auto_height_types = types.into_iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    pub fn register(&mut self, definition: WidgetDefinition) -> Result<(), RegistryError> {
        if definition.type_name.trim().is_empty() {
            return Err(RegistryError::EmptyType);
        }
        if self.definitions.contains_key(&definition.type_name) {
            return Err(RegistryError::Duplicate {
                type_name: definition.type_name,
            });
        }
        self.definitions
            .insert(definition.type_name.clone(), Arc::new(definition));
        Ok(())
    }

    pub fn get(&self, widget_type: &str) -> Result<&WidgetDefinition, RegistryError> {
        self.definition(widget_type)
            .ok_or_else(|| RegistryError::NotFound {
                type_name: widget_type.to_string(),
            })
    }

    pub fn contains(&self, widget_type: &str) -> bool {
        self.definitions.contains_key(widget_type)
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions grouped by category, categories and entries sorted
    pub fn by_category(&self) -> Vec<(&str, Vec<&WidgetDefinition>)> {
        let mut groups: Vec<(&str, Vec<&WidgetDefinition>)> = Vec::new();
        for name in self.names() {
            let Some(def) = self.definition(name) else {
                continue;
            };
            match groups.iter_mut().find(|(c, _)| *c == def.category) {
                Some((_, entries)) => entries.push(def),
                None => groups.push((def.category.as_str(), vec![def])),
            }
        }
        groups.sort_by(|a, b| a.0.cmp(b.0));
        groups
    }
}

impl WidgetRegistry for Registry {
    fn definition(&self, widget_type: &str) -> Option<&WidgetDefinition> {
        self.definitions.get(widget_type).map(Arc::as_ref)
    }

    fn default_height_mode(&self, widget_type: &str) -> HeightMode {
        match self.definition(widget_type).and_then(|d| d.height_mode) {
            Some(mode) => mode,
            None if self.auto_height_types.contains(widget_type) => HeightMode::Auto,
            None => HeightMode::Fixed,
        }
    }
}
