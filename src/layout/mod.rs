//! Grid layout engine for widget trees
//!
//! Layout is a non-overlapping grid of integer cells. This module
//! computes default and normalized placements, implements the structural
//! edits that have to keep siblings apart, and lints finished trees.

pub mod config;
pub mod engine;
pub mod lint;

pub use config::{Footprint, GridConfig};
pub use engine::{
    apply_layout_changes, apply_spacing_to_layout, default_layout_at, duplicate_widget,
    get_default_widget_layout, insert_adjacent_widget, normalize_layout, place_adjacent_widget,
    reorder_widget_in_tree, shift_widgets_for_insert, InsertOutcome, InsertPosition,
    NormalizeOptions, NormalizedLayout,
};
pub use lint::{check, LintCategory, LintWarning};
