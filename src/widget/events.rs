//! Event-action lists stored in `props.events`
//!
//! A widget's events are either a JSON array of action objects or the
//! same array serialized into a string. Actions point at other widgets
//! through one of several alias fields, either directly on the action or
//! inside its `params` object.

use serde_json::{Map, Value};

/// Prop holding a widget's event actions
pub const EVENTS_PROP: &str = "events";

/// Fields an action may use to reference another widget by id
pub const REFERENCE_FIELDS: [&str; 4] = ["componentId", "widgetId", "targetId", "pluginId"];

/// Decode an events prop into a list of actions.
///
/// Absent, null or empty values are an empty list. A string that does
/// not decode to a JSON array is treated as no events.
pub fn normalize_events(raw: Option<&Value>) -> Vec<Value> {
    match raw {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Vec::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                tracing::warn!("serialized events are not an array; ignoring");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "malformed serialized events; ignoring");
                Vec::new()
            }
        },
        _ => Vec::new(),
    }
}

/// Widget ids an action refers to, in field order
pub fn action_references(action: &Value) -> Vec<&str> {
    let mut refs = Vec::new();
    let scopes = [Some(action), action.get("params")];
    for scope in scopes.into_iter().flatten() {
        for field in REFERENCE_FIELDS {
            if let Some(id) = scope.get(field).and_then(Value::as_str) {
                refs.push(id);
            }
        }
    }
    refs
}

/// Replace reference fields equal to `old_id` in one object
fn rewrite_fields(object: &mut Map<String, Value>, old_id: &str, new_id: &str) -> bool {
    let mut changed = false;
    for field in REFERENCE_FIELDS {
        if let Some(value) = object.get_mut(field) {
            if value.as_str() == Some(old_id) {
                *value = Value::String(new_id.to_string());
                changed = true;
            }
        }
    }
    changed
}

/// Rewrite one action; `None` when it does not reference `old_id`
pub fn rewrite_action(action: &Value, old_id: &str, new_id: &str) -> Option<Value> {
    let Value::Object(object) = action else {
        return None;
    };
    let mut object = object.clone();
    let mut changed = rewrite_fields(&mut object, old_id, new_id);
    if let Some(Value::Object(params)) = object.get_mut("params") {
        changed |= rewrite_fields(params, old_id, new_id);
    }
    changed.then_some(Value::Object(object))
}

fn rewrite_list(actions: &[Value], old_id: &str, new_id: &str) -> Option<Vec<Value>> {
    let mut changed = false;
    let rewritten = actions
        .iter()
        .map(|action| match rewrite_action(action, old_id, new_id) {
            Some(updated) => {
                changed = true;
                updated
            }
            None => action.clone(),
        })
        .collect();
    changed.then_some(rewritten)
}

/// Rewrite an events prop, keeping its storage form.
///
/// Arrays stay arrays and serialized strings are re-serialized. Returns
/// `None` when nothing referenced `old_id`; malformed strings are left
/// untouched.
pub fn rewrite_event_references(events: &Value, old_id: &str, new_id: &str) -> Option<Value> {
    match events {
        Value::Array(actions) => rewrite_list(actions, old_id, new_id).map(Value::Array),
        Value::String(text) => {
            let Ok(Value::Array(actions)) = serde_json::from_str::<Value>(text) else {
                return None;
            };
            let rewritten = rewrite_list(&actions, old_id, new_id)?;
            serde_json::to_string(&rewritten).ok().map(Value::String)
        }
        _ => None,
    }
}

/// Props with their events rewritten; `None` when unchanged
pub fn rewrite_props_references(
    props: &Map<String, Value>,
    old_id: &str,
    new_id: &str,
) -> Option<Map<String, Value>> {
    let events = props.get(EVENTS_PROP)?;
    let rewritten = rewrite_event_references(events, old_id, new_id)?;
    let mut props = props.clone();
    props.insert(EVENTS_PROP.to_string(), rewritten);
    Some(props)
}
