//! Boolean gating: `parse_boolean`, `visibleWhen`/`disabledWhen`, policies

use serde_json::{Map, Value};

use crate::widget::WidgetInstance;

use super::context::EvalContext;
use super::eval::truthy;
use super::template::{is_bound, resolve_expression};

/// Coerce a loosely typed flag.
///
/// Booleans pass through, numbers test non-zero, and strings match
/// `true|1|yes|y` / `false|0|no|n` case-insensitively. Anything else
/// yields `fallback`.
pub fn parse_boolean(value: &Value, fallback: bool) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(fallback),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => true,
            "false" | "0" | "no" | "n" => false,
            _ => fallback,
        },
        _ => fallback,
    }
}

/// Truthiness of a condition result; textual `'0'`, `'false'` and `''`
/// count as false
fn condition_truthy(value: &Value) -> bool {
    match value {
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false"
        ),
        other => truthy(other),
    }
}

/// Evaluate a boolean-mode field against a full context.
///
/// Absent or blank input yields `when_empty`. Unbound text that reads as
/// a boolean literal is taken literally. Evaluation failures yield
/// `false` so a broken gate never grants access.
pub fn evaluate_condition_value(raw: Option<&Value>, ctx: &EvalContext, when_empty: bool) -> bool {
    let text = match raw {
        None | Some(Value::Null) => return when_empty,
        Some(Value::String(s)) => s,
        Some(other) => return condition_truthy(other),
    };
    if text.trim().is_empty() {
        return when_empty;
    }
    if !is_bound(text) {
        let literal = Value::String(text.clone());
        if parse_boolean(&literal, true) == parse_boolean(&literal, false) {
            return parse_boolean(&literal, false);
        }
    }
    match resolve_expression(text, ctx) {
        Ok(value) => condition_truthy(&value),
        Err(err) => {
            tracing::warn!(expression = %text, error = %err, "condition failed to evaluate");
            false
        }
    }
}

/// Evaluate a condition against the access-policy mapping only.
///
/// Policies are reachable as `policies.key` and, when the key is a valid
/// identifier, as a bare name.
pub fn evaluate_condition(expression: Option<&str>, policies: &Map<String, Value>) -> bool {
    let ctx = EvalContext::new().with_policies(policies.clone());
    let raw = expression.map(|e| Value::String(e.to_string()));
    evaluate_condition_value(raw.as_ref(), &ctx, true)
}

/// Every policy key the widget requires is granted
pub fn has_required_policies(widget: &WidgetInstance, policies: &Map<String, Value>) -> bool {
    widget
        .policy
        .iter()
        .all(|key| policies.get(key).is_some_and(|v| parse_boolean(v, false)))
}

/// Runtime visibility: policy set, `visibleWhen`, then `hidden`
pub fn is_widget_visible(widget: &WidgetInstance, ctx: &EvalContext) -> bool {
    if !has_required_policies(widget, &ctx.policies) {
        return false;
    }
    if !evaluate_condition_value(widget.visible_when.as_ref(), ctx, true) {
        return false;
    }
    !evaluate_condition_value(widget.hidden.as_ref(), ctx, false)
}

/// Runtime disabled state from `disabledWhen`; absent means enabled
pub fn is_widget_disabled(widget: &WidgetInstance, ctx: &EvalContext) -> bool {
    evaluate_condition_value(widget.disabled_when.as_ref(), ctx, false)
}
