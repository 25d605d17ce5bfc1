//! Widget tree: data model, registry contract, identity and tree edits

mod events;
mod identity;
mod registry;
mod tree;
mod types;

pub use events::{
    action_references, normalize_events, rewrite_action, rewrite_event_references,
    rewrite_props_references, EVENTS_PROP, REFERENCE_FIELDS,
};
pub use identity::{
    build_widget_id, clone_widget_tree, collect_widget_ids, ensure_unique_widget_id,
    normalize_widget_id_input, widget_id_prefix, DEFAULT_WIDGET_ID,
};
pub use registry::{Registry, RegistryError, WidgetDefinition, WidgetRegistry};
pub use tree::{
    add_child_widget, contains_widget, edit_siblings_of, find_siblings, find_widget,
    remove_widget_by_id, rewrite_references_in_tree, try_update_widget_by_id,
    update_widget_by_id, walk_tree,
};
pub use types::{
    region_widgets, GlobalRegion, GridLayout, HeightMode, MarginMode, ResizeHandle, UnknownMode,
    WidgetInstance, WidgetRef, WidgetSpacing,
};

/// Data key under which a drag source carries the widget type
pub const DRAG_PAYLOAD_KEY: &str = "application/x-app-canvas-widget";

/// Widget type carried by a drop, if it is a widget drop.
///
/// `payload` looks up a drag data key; absent or blank data means the
/// drop is not for the canvas.
pub fn widget_type_from_drag<'a>(payload: impl Fn(&str) -> Option<&'a str>) -> Option<&'a str> {
    payload(DRAG_PAYLOAD_KEY)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
