//! App Canvas - widget tree, grid layout and FX expressions for an app builder
//!
//! This library provides the core of a drag-and-drop application builder:
//! the widget tree store with its identity and layout bookkeeping, and the
//! resolver that turns `{{ ... }}` bindings into values.
//!
//! # Example
//!
//! ```rust
//! use app_canvas::{BuilderConfig, BuilderStore, AppPayload, Page, TreeScope};
//!
//! let app = AppPayload::new().with_page(Page::new("home", "Home"));
//! let mut store = BuilderStore::from_config(app, BuilderConfig::default()).unwrap();
//!
//! let scope = TreeScope::Page("home".into());
//! let first = store.drop_widget(&scope, "Button", None, None).unwrap();
//! let second = store.drop_widget(&scope, "Button", None, None).unwrap();
//! assert_eq!(first, "button1");
//! assert_eq!(second, "button2");
//! ```

pub mod config;
pub mod error;
pub mod fx;
pub mod layout;
pub mod spacing;
pub mod store;
pub mod widget;

pub use config::{BuilderConfig, ConfigError};
pub use error::ParseError;
pub use fx::{resolve_expression, resolve_template, EvalContext, FxError};
pub use layout::{GridConfig, InsertOutcome, InsertPosition, LintWarning};
pub use store::{
    AppPayload, BuilderStore, EditorSession, Page, SaveScheduler, Selection, StoreError, TreeScope,
};
pub use widget::{GridLayout, Registry, WidgetInstance, WidgetRef, WidgetRegistry};

/// Resolve a bound value against an empty context
///
/// # Example
///
/// ```rust
/// use app_canvas::evaluate_str;
/// use serde_json::json;
///
/// assert_eq!(evaluate_str("{{ 1 + 1 }}").unwrap(), json!(2));
/// assert!(evaluate_str("{{ invalid syntax ++ }}").is_err());
/// ```
pub fn evaluate_str(source: &str) -> Result<serde_json::Value, FxError> {
    resolve_template(source, &EvalContext::new())
}
