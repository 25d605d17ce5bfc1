//! Widget id generation, normalization and uniqueness
//!
//! Ids are `lowerCamel(type)` followed by the smallest free positive
//! integer suffix (`button1`, `button2`, ...). Every function that hands
//! out an id also records it in the caller's id set, so a batch of calls
//! against the same set never collides.

use std::collections::HashSet;
use std::sync::Arc;

use convert_case::{Case, Casing};

use super::types::{WidgetInstance, WidgetRef};

/// Id used when a type or user input yields nothing usable
pub const DEFAULT_WIDGET_ID: &str = "widget";

/// Lower-camel id prefix for a widget type; unusable types fall back to
/// [`DEFAULT_WIDGET_ID`]
pub fn widget_id_prefix(widget_type: &str) -> String {
    let prefix: String = widget_type
        .to_case(Case::Camel)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    match prefix.chars().next() {
        None => DEFAULT_WIDGET_ID.to_string(),
        Some(c) if c.is_ascii_digit() => format!("{DEFAULT_WIDGET_ID}{prefix}"),
        Some(_) => prefix,
    }
}

/// Allocate `prefix` + smallest free suffix and register it
fn allocate(prefix: &str, existing: &mut HashSet<String>) -> String {
    let mut suffix = 1u64;
    loop {
        let candidate = format!("{prefix}{suffix}");
        if !existing.contains(&candidate) {
            existing.insert(candidate.clone());
            return candidate;
        }
        suffix += 1;
    }
}

/// Fresh id for a new widget of `widget_type`
pub fn build_widget_id(widget_type: &str, existing: &mut HashSet<String>) -> String {
    let id = allocate(&widget_id_prefix(widget_type), existing);
    tracing::debug!(widget_type, id = %id, "allocated widget id");
    id
}

/// Turn free-form user text into an identifier.
///
/// The text is split on runs of non-alphanumeric characters. The first
/// token gets a lower-case initial, later tokens an upper-case initial;
/// the rest of each token keeps its casing. A leading digit is prefixed
/// with [`DEFAULT_WIDGET_ID`].
pub fn normalize_widget_id_input(raw: &str) -> String {
    let mut out = String::new();
    let tokens = raw
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty());
    for (index, token) in tokens.enumerate() {
        let mut chars = token.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                out.push(first.to_ascii_lowercase());
            } else {
                out.push(first.to_ascii_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }

    match out.chars().next() {
        None => DEFAULT_WIDGET_ID.to_string(),
        Some(c) if c.is_ascii_digit() => format!("{DEFAULT_WIDGET_ID}{out}"),
        Some(_) => out,
    }
}

/// Keep `candidate` if it is free, otherwise re-suffix its base name.
///
/// The base name is `candidate` without its trailing digit run, so
/// `button1` taken yields `button2` (or the next free suffix).
pub fn ensure_unique_widget_id(candidate: &str, existing: &mut HashSet<String>) -> String {
    if !candidate.is_empty() && !existing.contains(candidate) {
        existing.insert(candidate.to_string());
        return candidate.to_string();
    }
    let base = candidate.trim_end_matches(|c: char| c.is_ascii_digit());
    let base = if base.is_empty() { DEFAULT_WIDGET_ID } else { base };
    allocate(base, existing)
}

/// Every id in the given trees, descendants included
pub fn collect_widget_ids<'a>(trees: impl IntoIterator<Item = &'a [WidgetRef]>) -> HashSet<String> {
    let mut ids = HashSet::new();
    for tree in trees {
        for widget in tree {
            widget.walk(&mut |w| {
                ids.insert(w.id.clone());
            });
        }
    }
    ids
}

/// Deep copy of `widget` where every node gets a newly allocated id.
///
/// The source subtree's ids are registered first, so no clone ever
/// reuses a source id even when the caller's set is incomplete.
pub fn clone_widget_tree(widget: &WidgetInstance, existing: &mut HashSet<String>) -> WidgetInstance {
    widget.walk(&mut |w| {
        existing.insert(w.id.clone());
    });
    clone_with_fresh_ids(widget, existing)
}

fn clone_with_fresh_ids(widget: &WidgetInstance, existing: &mut HashSet<String>) -> WidgetInstance {
    let children = widget.children.as_ref().map(|children| {
        children
            .iter()
            .map(|child| Arc::new(clone_with_fresh_ids(child, existing)))
            .collect()
    });
    WidgetInstance {
        id: build_widget_id(&widget.widget_type, existing),
        children,
        ..widget.clone()
    }
}
