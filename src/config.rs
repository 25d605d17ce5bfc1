//! Builder configuration loaded from TOML
//!
//! A config carries the grid dimensions, spacing defaults and the widget
//! catalog used to seed the registry. Every section is optional; missing
//! values come from the built-in defaults below.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::layout::GridConfig;
use crate::widget::WidgetDefinition;

/// Errors that can occur when loading a config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Padding defaults, as CSS shorthand
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpacingDefaults {
    pub widget_padding: String,
    pub page_padding: String,
}

impl Default for SpacingDefaults {
    fn default() -> Self {
        Self {
            widget_padding: "4px 8px".to_string(),
            page_padding: "8px 12px".to_string(),
        }
    }
}

/// Everything configurable about the builder core
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub spacing: SpacingDefaults,
    /// Content-sized types that default to auto height
    #[serde(default = "default_auto_height_types")]
    pub auto_height_types: Vec<String>,
    /// Widget catalog
    #[serde(default = "default_widgets")]
    pub widgets: Vec<WidgetDefinition>,
}

/// Built-in widget catalog
const DEFAULT_CONFIG: &str = r##"
autoHeightTypes = ["Text", "Heading", "Markdown", "Alert", "Divider", "Form"]

[[widgets]]
type = "Text"
label = "Text"
category = "Display"
defaultProps = { value = "Text" }

[[widgets]]
type = "Heading"
label = "Heading"
category = "Display"
defaultProps = { value = "Heading", level = 2 }

[[widgets]]
type = "Markdown"
label = "Markdown"
category = "Display"
defaultProps = { value = "" }

[[widgets]]
type = "Alert"
label = "Alert"
category = "Display"
defaultProps = { message = "", variant = "info" }

[[widgets]]
type = "Divider"
label = "Divider"
category = "Display"
resizeHandles = ["e", "w"]

[[widgets]]
type = "Image"
label = "Image"
category = "Display"
defaultProps = { src = "", fit = "cover" }

[[widgets]]
type = "Button"
label = "Button"
category = "Input"
defaultProps = { label = "Button", variant = "primary" }
eventOptions = ["onClick"]

[[widgets]]
type = "TextInput"
label = "Text Input"
category = "Input"
defaultProps = { label = "Label", placeholder = "", value = "" }
eventOptions = ["onChange", "onSubmit"]

[[widgets]]
type = "Select"
label = "Select"
category = "Input"
defaultProps = { label = "Label", options = [] }
eventOptions = ["onChange"]

[[widgets]]
type = "Checkbox"
label = "Checkbox"
category = "Input"
defaultProps = { label = "Checkbox", value = false }
eventOptions = ["onChange"]

[[widgets]]
type = "Table"
label = "Table"
category = "Data"
defaultProps = { data = "{{ [] }}", pageSize = 10 }
eventOptions = ["onRowClick", "onSelectionChange"]

[[widgets]]
type = "Chart"
label = "Chart"
category = "Data"
defaultProps = { kind = "line", data = "{{ [] }}" }

[[widgets]]
type = "Container"
label = "Container"
category = "Layout"
supportsChildren = true

[[widgets]]
type = "Form"
label = "Form"
category = "Layout"
supportsChildren = true
eventOptions = ["onSubmit"]

[[widgets]]
type = "Tabs"
label = "Tabs"
category = "Layout"
supportsChildren = true
defaultProps = { tabs = ["Tab 1", "Tab 2"] }
eventOptions = ["onChange"]

[[widgets]]
type = "GlobalHeader"
label = "Header"
category = "Global"
supportsChildren = true
heightMode = "fixed"

[[widgets]]
type = "GlobalSidebar"
label = "Sidebar"
category = "Global"
supportsChildren = true

[[widgets]]
type = "GlobalDrawer"
label = "Drawer"
category = "Global"
supportsChildren = true
eventOptions = ["onOpen", "onClose"]

[[widgets]]
type = "GlobalModal"
label = "Modal"
category = "Global"
supportsChildren = true
defaultProps = { title = "Modal" }
eventOptions = ["onOpen", "onClose"]

[[widgets]]
type = "GlobalSplitPane"
label = "Split Pane"
category = "Global"
supportsChildren = true
"##;

/// Sections of the built-in config that serde defaults draw from
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuiltinCatalog {
    auto_height_types: Vec<String>,
    widgets: Vec<WidgetDefinition>,
}

fn builtin_catalog() -> BuiltinCatalog {
    toml::from_str(DEFAULT_CONFIG).expect("Built-in config should be valid TOML")
}

fn default_auto_height_types() -> Vec<String> {
    builtin_catalog().auto_height_types
}

fn default_widgets() -> Vec<WidgetDefinition> {
    builtin_catalog().widgets
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::from_str(DEFAULT_CONFIG).expect("Built-in config should be valid TOML")
    }
}

impl BuilderConfig {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load config from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` if given, otherwise the built-in config
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Set the grid configuration
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Set the default widget padding
    pub fn with_widget_padding(mut self, padding: impl Into<String>) -> Self {
        self.spacing.widget_padding = padding.into();
        self
    }

    /// Set the default page padding
    pub fn with_page_padding(mut self, padding: impl Into<String>) -> Self {
        self.spacing.page_padding = padding.into();
        self
    }

    /// Replace the widget catalog
    pub fn with_widgets(mut self, widgets: Vec<WidgetDefinition>) -> Self {
        self.widgets = widgets;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::widget::{HeightMode, ResizeHandle};

    #[test]
    fn test_default_config() {
        let config = BuilderConfig::default();
        assert_eq!(config.grid.columns, 12);
        assert_eq!(config.grid.sidebar_columns, 1);
        assert_eq!(config.spacing.widget_padding, "4px 8px");
        assert_eq!(config.spacing.page_padding, "8px 12px");
        assert!(config.auto_height_types.contains(&"Text".to_string()));
        assert_eq!(config.widgets.len(), 20);
    }

    #[test]
    fn test_catalog_entries() {
        let config = BuilderConfig::default();
        let button = config.widgets.iter().find(|w| w.type_name == "Button").unwrap();
        assert_eq!(button.default_props.get("label"), Some(&json!("Button")));
        assert_eq!(button.event_options, vec!["onClick"]);

        let header = config.widgets.iter().find(|w| w.type_name == "GlobalHeader").unwrap();
        assert!(header.supports_children);
        assert_eq!(header.height_mode, Some(HeightMode::Fixed));

        let divider = config.widgets.iter().find(|w| w.type_name == "Divider").unwrap();
        assert_eq!(divider.resize_handles, Some(vec![ResizeHandle::E, ResizeHandle::W]));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = BuilderConfig::from_str(
            r#"
            [grid]
            columns = 24

            [spacing]
            pagePadding = "0"
            "#,
        )
        .unwrap();
        assert_eq!(config.grid.columns, 24);
        assert_eq!(config.grid.footprint.w, 4);
        assert_eq!(config.spacing.widget_padding, "4px 8px");
        assert_eq!(config.spacing.page_padding, "0");
        assert_eq!(config.widgets.len(), 20);
    }

    #[test]
    fn test_custom_catalog_replaces_builtin() {
        let config = BuilderConfig::from_str(
            r#"
            [[widgets]]
            type = "Gauge"
            label = "Gauge"
            defaultProps = { value = 0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.widgets.len(), 1);
        assert_eq!(config.widgets[0].type_name, "Gauge");
    }

    #[test]
    fn test_invalid_toml() {
        let err = BuilderConfig::from_str("[grid\ncolumns = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_builder_setters() {
        let config = BuilderConfig::default()
            .with_grid(GridConfig::new().with_columns(6))
            .with_widget_padding("2px");
        assert_eq!(config.grid.columns, 6);
        assert_eq!(config.spacing.widget_padding, "2px");
    }
}
