//! FX expressions: `{{ ... }}` bindings in widget props
//!
//! Expressions are parsed with a fixed grammar and interpreted directly;
//! nothing is compiled or executed outside the interpreter. Failures are
//! values ([`FxError`]) so property editors, the canvas and the preview
//! can keep their previous value and show the message inline.
//!
//! # Example
//!
//! ```rust
//! use app_canvas::fx::{resolve_template, EvalContext};
//! use serde_json::json;
//!
//! let ctx = EvalContext::new().with_component("textInput1", json!({"value": "Ada"}));
//! let value = resolve_template("Hello {{ textInput1.value }}", &ctx).unwrap();
//! assert_eq!(value, json!("Hello Ada"));
//! ```

pub mod ast;
mod condition;
mod context;
mod eval;
mod grammar;
pub mod lexer;
mod template;

pub use condition::{
    evaluate_condition, evaluate_condition_value, has_required_policies, is_widget_disabled,
    is_widget_visible, parse_boolean,
};
pub use context::{BuilderMeta, EvalContext, Viewport};
pub use eval::{evaluate, number_value, to_js_string, to_number, truthy, EvalError};
pub use grammar::parse;
pub use template::{
    is_bound, resolve_expression, resolve_or_keep, resolve_props, resolve_template,
    resolve_value, split_segments, strip_wrapper, FxError, ResolvedProps, Segment,
};
