//! Grid layout engine
//!
//! Positions are integer cells on a fixed-column grid. The engine
//! computes default and normalized placements and implements the
//! structural edits (insert-adjacent, duplicate, reorder) as pure
//! functions over the shared widget tree.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::widget::{
    clone_widget_tree, edit_siblings_of, find_siblings, find_widget, try_update_widget_by_id,
    update_widget_by_id, GridLayout, HeightMode, ResizeHandle, WidgetInstance, WidgetRef,
};

use super::config::GridConfig;

/// Side of the target a new widget is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Above,
    Below,
}

impl FromStr for InsertPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "above" => Ok(InsertPosition::Above),
            "below" => Ok(InsertPosition::Below),
            other => Err(format!("invalid insert position '{other}'")),
        }
    }
}

impl fmt::Display for InsertPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertPosition::Above => write!(f, "above"),
            InsertPosition::Below => write!(f, "below"),
        }
    }
}

/// Result of an insertion; callers must check `inserted`
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    pub widgets: Vec<WidgetRef>,
    pub inserted: bool,
    /// Id of the inserted widget
    pub id: Option<String>,
    /// Layout the inserted widget was given
    pub layout: Option<GridLayout>,
}

impl InsertOutcome {
    fn unchanged(widgets: &[WidgetRef]) -> Self {
        Self {
            widgets: widgets.to_vec(),
            inserted: false,
            id: None,
            layout: None,
        }
    }
}

/// Layout with every field filled, plus the handles the grid should offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLayout {
    pub layout: GridLayout,
    pub resize_handles: Vec<ResizeHandle>,
}

/// Inputs to [`normalize_layout`] besides the widget itself
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions<'a> {
    /// Columns available to the widget's grid
    pub columns: i32,
    /// Handles the widget type allows
    pub resize_handles: &'a [ResizeHandle],
    pub is_selected: bool,
    /// Effective height mode after spacing resolution
    pub height_mode: HeightMode,
}

/// Default placement of the `index`-th widget of a list on a grid of
/// `columns`
pub fn default_layout_at(index: usize, columns: i32, grid: &GridConfig) -> GridLayout {
    let per_row = grid.columns_per_row(columns) as usize;
    let footprint = grid.footprint_in(columns);
    GridLayout {
        x: (index % per_row) as i32 * footprint.w,
        y: (index / per_row) as i32 * footprint.h,
        ..footprint
    }
}

/// Cells a sibling covers once its layout is fitted to `columns`
fn occupied_cells(widget: &WidgetInstance, index: usize, columns: i32, grid: &GridConfig) -> GridLayout {
    let stored = widget
        .layout
        .unwrap_or_else(|| default_layout_at(index, columns, grid));
    let columns = columns.max(1);
    let w = stored.w.clamp(1, columns);
    GridLayout {
        x: stored.x.clamp(0, columns - w),
        y: stored.y.max(0),
        w,
        h: stored.h.max(1),
        ..stored
    }
}

/// Placement for a widget appended after `siblings`.
///
/// Widgets pack left to right, top to bottom in default footprints; the
/// first slot that no sibling covers is taken.
pub fn get_default_widget_layout(siblings: &[WidgetRef], columns: i32, grid: &GridConfig) -> GridLayout {
    let occupied: Vec<GridLayout> = siblings
        .iter()
        .enumerate()
        .map(|(index, widget)| occupied_cells(widget, index, columns, grid))
        .collect();
    let mut slot = 0;
    loop {
        let candidate = default_layout_at(slot, columns, grid);
        if !occupied.iter().any(|taken| candidate.intersects(taken)) {
            return candidate;
        }
        slot += 1;
    }
}

/// Auto height relaxes the minimum row count to one
pub fn apply_spacing_to_layout(layout: GridLayout, height_mode: HeightMode) -> GridLayout {
    match height_mode {
        HeightMode::Auto => GridLayout {
            min_h: Some(1),
            ..layout
        },
        HeightMode::Fixed => layout,
    }
}

/// Fill a widget's layout from its stored values, then the default for
/// its position, then clamp widths to the available columns.
pub fn normalize_layout(
    widget: &WidgetInstance,
    index: usize,
    options: &NormalizeOptions<'_>,
    grid: &GridConfig,
) -> NormalizedLayout {
    let fallback = default_layout_at(index, options.columns, grid);
    let stored = widget.layout.unwrap_or(fallback);
    let columns = options.columns.max(1);

    let w = stored.w.clamp(1, columns);
    let h = stored.h.max(1);
    let max_w = stored.max_w.unwrap_or(columns).clamp(1, columns);
    let w = w.min(max_w);
    let min_w = stored.min_w.or(fallback.min_w).unwrap_or(1).clamp(1, w);
    let min_h = stored.min_h.or(fallback.min_h).unwrap_or(1).clamp(1, h);

    let layout = GridLayout {
        x: stored.x.clamp(0, columns - w),
        y: stored.y.max(0),
        w,
        h,
        min_w: Some(min_w),
        min_h: Some(min_h),
        max_w: Some(max_w),
        max_h: stored.max_h,
    };
    let layout = apply_spacing_to_layout(layout, options.height_mode);

    let resize_handles = if options.is_selected {
        options
            .resize_handles
            .iter()
            .copied()
            .filter(|handle| options.height_mode == HeightMode::Fixed || handle.is_horizontal())
            .collect()
    } else {
        Vec::new()
    };

    NormalizedLayout {
        layout,
        resize_handles,
    }
}

/// Layout for a widget placed next to `target`: same columns, height
/// from the widget's own layout or the default footprint
fn adjacent_layout(
    target: &GridLayout,
    position: InsertPosition,
    own: Option<&GridLayout>,
    height_mode: HeightMode,
    grid: &GridConfig,
) -> GridLayout {
    let footprint = grid.footprint_layout();
    let h = own.map(|l| l.h).unwrap_or(footprint.h);
    let min_w = own
        .and_then(|l| l.min_w)
        .or(footprint.min_w)
        .map(|m| m.min(target.w));
    let min_h = own.and_then(|l| l.min_h).or(footprint.min_h);

    let y = match position {
        InsertPosition::Above => (target.y - h).max(0),
        InsertPosition::Below => target.bottom(),
    };
    let layout = GridLayout {
        x: target.x,
        y,
        w: target.w,
        h,
        min_w,
        min_h,
        max_w: own.and_then(|l| l.max_w),
        max_h: own.and_then(|l| l.max_h),
    };
    apply_spacing_to_layout(layout, height_mode)
}

/// Insert `new_widget` directly above or below `target_id` in the
/// target's sibling list, searching nested children as needed.
///
/// The tree is returned unchanged with `inserted == false` when the
/// target does not exist.
pub fn insert_adjacent_widget(
    widgets: &[WidgetRef],
    target_id: &str,
    position: InsertPosition,
    new_widget: WidgetInstance,
    height_mode: HeightMode,
    grid: &GridConfig,
) -> InsertOutcome {
    let Some((siblings, _)) = find_siblings(widgets, target_id) else {
        return InsertOutcome::unchanged(widgets);
    };
    let Some(target_index) = siblings.iter().position(|w| w.id == target_id) else {
        return InsertOutcome::unchanged(widgets);
    };
    let target_layout = siblings[target_index]
        .layout
        .unwrap_or_else(|| default_layout_at(target_index, grid.columns, grid));
    let layout = adjacent_layout(
        &target_layout,
        position,
        new_widget.layout.as_ref(),
        height_mode,
        grid,
    );

    let id = new_widget.id.clone();
    let node = Arc::new(WidgetInstance {
        layout: Some(layout),
        ..new_widget
    });
    let at = match position {
        InsertPosition::Above => target_index,
        InsertPosition::Below => target_index + 1,
    };
    let Some(updated) = edit_siblings_of(widgets, target_id, |siblings| {
        let mut list = siblings.to_vec();
        list.insert(at, node);
        list
    }) else {
        return InsertOutcome::unchanged(widgets);
    };

    InsertOutcome {
        widgets: updated,
        inserted: true,
        id: Some(id),
        layout: Some(layout),
    }
}

/// Push siblings of the inserted widget down to make room for it.
///
/// Every other sibling of `target_id` whose columns overlap the inserted
/// widget's columns and whose top is at or below the inserted top moves
/// down by the inserted height. Siblings in other columns and siblings
/// without a stored layout are untouched. This is a single pass: a shift
/// may leave a new overlap further down.
pub fn shift_widgets_for_insert(
    widgets: &[WidgetRef],
    inserted_id: &str,
    target_id: &str,
    inserted_layout: &GridLayout,
) -> Vec<WidgetRef> {
    let shifted = edit_siblings_of(widgets, target_id, |siblings| {
        siblings
            .iter()
            .map(|sibling| match sibling.layout {
                Some(layout)
                    if sibling.id != inserted_id
                        && layout.overlaps_horizontally(inserted_layout)
                        && layout.y >= inserted_layout.y =>
                {
                    Arc::new(WidgetInstance {
                        layout: Some(GridLayout {
                            y: layout.y + inserted_layout.h,
                            ..layout
                        }),
                        ..(**sibling).clone()
                    })
                }
                _ => Arc::clone(sibling),
            })
            .collect()
    });
    shifted.unwrap_or_else(|| widgets.to_vec())
}

/// Insert next to `target_id`, then shift overlapping siblings
pub fn place_adjacent_widget(
    widgets: &[WidgetRef],
    target_id: &str,
    position: InsertPosition,
    new_widget: WidgetInstance,
    height_mode: HeightMode,
    grid: &GridConfig,
) -> InsertOutcome {
    let outcome = insert_adjacent_widget(widgets, target_id, position, new_widget, height_mode, grid);
    let (Some(id), Some(layout)) = (outcome.id.as_deref(), outcome.layout) else {
        return outcome;
    };
    let widgets = shift_widgets_for_insert(&outcome.widgets, id, target_id, &layout);
    InsertOutcome { widgets, ..outcome }
}

/// Clone `source_id` with fresh ids and place the copy below it
pub fn duplicate_widget(
    widgets: &[WidgetRef],
    source_id: &str,
    existing_ids: &mut HashSet<String>,
    height_mode: HeightMode,
    grid: &GridConfig,
) -> InsertOutcome {
    let Some(source) = find_widget(widgets, source_id) else {
        return InsertOutcome::unchanged(widgets);
    };
    let copy = clone_widget_tree(source, existing_ids);
    place_adjacent_widget(widgets, source_id, InsertPosition::Below, copy, height_mode, grid)
}

/// Swap `active_id` and `over_id` within one sibling list.
///
/// `parent_id` selects the container whose children are reordered, or
/// the root list when `None`. Grid coordinates are not changed. The tree
/// is unchanged if either id is not a child of that parent.
pub fn reorder_widget_in_tree(
    widgets: &[WidgetRef],
    active_id: &str,
    over_id: &str,
    parent_id: Option<&str>,
) -> Vec<WidgetRef> {
    let swap = |list: &[WidgetRef]| -> Option<Vec<WidgetRef>> {
        let from = list.iter().position(|w| w.id == active_id)?;
        let to = list.iter().position(|w| w.id == over_id)?;
        let mut out = list.to_vec();
        out.swap(from, to);
        Some(out)
    };
    if active_id == over_id {
        return widgets.to_vec();
    }

    let reordered = match parent_id {
        None => swap(widgets),
        Some(parent_id) => {
            let children = find_widget(widgets, parent_id).and_then(|p| swap(p.children()));
            children.and_then(|children| {
                try_update_widget_by_id(widgets, parent_id, |parent| WidgetInstance {
                    children: Some(children),
                    ..parent.clone()
                })
            })
        }
    };
    reordered.unwrap_or_else(|| widgets.to_vec())
}

/// Store layouts reported by the grid after a drag or resize.
///
/// Ids not present in the tree are ignored.
pub fn apply_layout_changes(widgets: &[WidgetRef], changes: &[(String, GridLayout)]) -> Vec<WidgetRef> {
    changes
        .iter()
        .fold(widgets.to_vec(), |tree, (id, layout)| {
            update_widget_by_id(&tree, id, |widget| widget.clone().with_layout(*layout))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid() -> GridConfig {
        GridConfig::default()
    }

    fn placed(id: &str, x: i32, y: i32, w: i32, h: i32) -> WidgetRef {
        Arc::new(WidgetInstance::new(id, "Button").with_layout(GridLayout::new(x, y, w, h)))
    }

    fn layout_of(widgets: &[WidgetRef], id: &str) -> GridLayout {
        find_widget(widgets, id).and_then(|w| w.layout).unwrap()
    }

    #[test]
    fn test_default_layout_packs_rows() {
        let grid = grid();
        let first = default_layout_at(0, grid.columns, &grid);
        assert_eq!((first.x, first.y, first.w, first.h), (0, 0, 4, 6));
        let third = default_layout_at(2, grid.columns, &grid);
        assert_eq!((third.x, third.y), (8, 0));
        let fourth = default_layout_at(3, grid.columns, &grid);
        assert_eq!((fourth.x, fourth.y), (0, 6));
        assert_eq!(fourth.min_w, Some(2));
        assert_eq!(fourth.min_h, Some(2));
    }

    #[test]
    fn test_default_from_siblings() {
        let siblings = vec![placed("a", 0, 0, 4, 6)];
        assert_eq!(get_default_widget_layout(&siblings, 12, &grid()).x, 4);
    }

    #[test]
    fn test_default_skips_taken_slots() {
        // First slot freed by a delete, later slots still taken
        let siblings = vec![placed("b", 4, 0, 4, 6), placed("c", 8, 0, 4, 6)];
        let layout = get_default_widget_layout(&siblings, 12, &grid());
        assert_eq!((layout.x, layout.y), (0, 0));

        let siblings = vec![placed("a", 0, 0, 4, 6), placed("c", 8, 0, 4, 6)];
        let layout = get_default_widget_layout(&siblings, 12, &grid());
        assert_eq!((layout.x, layout.y), (4, 0));
        assert!(siblings.iter().all(|s| !s.layout.unwrap().intersects(&layout)));
    }

    #[test]
    fn test_default_stacks_in_single_column() {
        let grid = grid();
        let first = get_default_widget_layout(&[], grid.sidebar_columns, &grid);
        assert_eq!((first.x, first.y, first.w, first.h), (0, 0, 1, 6));
        assert_eq!(first.min_w, Some(1));

        let siblings = vec![Arc::new(WidgetInstance::new("a", "Button").with_layout(first))];
        let second = get_default_widget_layout(&siblings, grid.sidebar_columns, &grid);
        assert_eq!((second.x, second.y, second.w), (0, 6, 1));

        // Stored wide layouts are squeezed into the column before the check
        let siblings = vec![placed("wide", 4, 0, 4, 6)];
        let next = get_default_widget_layout(&siblings, grid.sidebar_columns, &grid);
        assert_eq!((next.x, next.y), (0, 6));
    }

    #[test]
    fn test_apply_spacing_auto_forces_min_h() {
        let layout = GridLayout::new(0, 0, 4, 6).with_min(2, 3);
        assert_eq!(apply_spacing_to_layout(layout, HeightMode::Auto).min_h, Some(1));
        assert_eq!(apply_spacing_to_layout(layout, HeightMode::Fixed).min_h, Some(3));
    }

    #[test]
    fn test_normalize_fills_from_default() {
        let widget = WidgetInstance::new("a", "Button");
        let options = NormalizeOptions {
            columns: 12,
            resize_handles: &ResizeHandle::ALL,
            is_selected: false,
            height_mode: HeightMode::Fixed,
        };
        let normalized = normalize_layout(&widget, 1, &options, &grid());
        assert_eq!(
            normalized.layout,
            GridLayout {
                max_w: Some(12),
                ..GridLayout::new(4, 0, 4, 6).with_min(2, 2)
            }
        );
        assert!(normalized.resize_handles.is_empty());
    }

    #[test]
    fn test_normalize_single_column() {
        let widget = WidgetInstance::new("a", "Button").with_layout(GridLayout::new(3, 2, 6, 4));
        let options = NormalizeOptions {
            columns: 1,
            resize_handles: &ResizeHandle::ALL,
            is_selected: true,
            height_mode: HeightMode::Fixed,
        };
        let layout = normalize_layout(&widget, 0, &options, &grid()).layout;
        assert_eq!((layout.x, layout.w, layout.max_w, layout.min_w), (0, 1, Some(1), Some(1)));
    }

    #[test]
    fn test_normalize_auto_height() {
        let widget = WidgetInstance::new("a", "Text")
            .with_layout(GridLayout::new(0, 0, 4, 6).with_min(2, 3));
        let options = NormalizeOptions {
            columns: 12,
            resize_handles: &ResizeHandle::ALL,
            is_selected: true,
            height_mode: HeightMode::Auto,
        };
        let normalized = normalize_layout(&widget, 0, &options, &grid());
        assert_eq!(normalized.layout.min_h, Some(1));
        assert_eq!(normalized.resize_handles, vec![ResizeHandle::W, ResizeHandle::E]);
    }

    #[test]
    fn test_insert_below_places_under_target() {
        let widgets = vec![placed("target", 2, 3, 5, 4)];
        let outcome = insert_adjacent_widget(
            &widgets,
            "target",
            InsertPosition::Below,
            WidgetInstance::new("new", "Button"),
            HeightMode::Fixed,
            &grid(),
        );
        assert!(outcome.inserted);
        let ids: Vec<&str> = outcome.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["target", "new"]);
        let layout = layout_of(&outcome.widgets, "new");
        assert_eq!((layout.x, layout.y, layout.w, layout.h), (2, 7, 5, 6));
    }

    #[test]
    fn test_insert_above_floors_at_zero() {
        let widgets = vec![placed("target", 0, 2, 4, 6)];
        let outcome = place_adjacent_widget(
            &widgets,
            "target",
            InsertPosition::Above,
            WidgetInstance::new("new", "Button"),
            HeightMode::Fixed,
            &grid(),
        );
        let ids: Vec<&str> = outcome.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "target"]);
        assert_eq!(layout_of(&outcome.widgets, "new").y, 0);
        assert_eq!(layout_of(&outcome.widgets, "target").y, 8);
    }

    #[test]
    fn test_insert_auto_height_min_h() {
        let widgets = vec![placed("target", 0, 0, 4, 6)];
        let outcome = insert_adjacent_widget(
            &widgets,
            "target",
            InsertPosition::Below,
            WidgetInstance::new("text1", "Text"),
            HeightMode::Auto,
            &grid(),
        );
        assert_eq!(layout_of(&outcome.widgets, "text1").min_h, Some(1));
    }

    #[test]
    fn test_insert_missing_target() {
        let widgets = vec![placed("a", 0, 0, 4, 6)];
        let outcome = insert_adjacent_widget(
            &widgets,
            "missing",
            InsertPosition::Below,
            WidgetInstance::new("new", "Button"),
            HeightMode::Fixed,
            &grid(),
        );
        assert!(!outcome.inserted);
        assert!(outcome.id.is_none());
        assert!(Arc::ptr_eq(&outcome.widgets[0], &widgets[0]));
    }

    #[test]
    fn test_insert_into_nested_children() {
        let container = WidgetInstance::new("container1", "Container").with_children(vec![
            WidgetInstance::new("inner", "Button").with_layout(GridLayout::new(0, 0, 12, 2)),
        ]);
        let widgets = vec![Arc::new(container)];
        let outcome = insert_adjacent_widget(
            &widgets,
            "inner",
            InsertPosition::Below,
            WidgetInstance::new("new", "Button"),
            HeightMode::Fixed,
            &grid(),
        );
        assert!(outcome.inserted);
        assert_eq!(outcome.widgets.len(), 1);
        assert_eq!(outcome.widgets[0].children().len(), 2);
        assert_eq!(layout_of(&outcome.widgets, "new").y, 2);
    }

    #[test]
    fn test_shift_keeps_side_by_side() {
        let widgets = vec![
            placed("target", 0, 0, 4, 6),
            placed("beside", 4, 0, 4, 6),
            placed("under", 0, 6, 4, 6),
        ];
        let outcome = place_adjacent_widget(
            &widgets,
            "target",
            InsertPosition::Below,
            WidgetInstance::new("new", "Button"),
            HeightMode::Fixed,
            &grid(),
        );
        assert_eq!(layout_of(&outcome.widgets, "target").y, 0);
        assert_eq!(layout_of(&outcome.widgets, "beside").y, 0);
        assert_eq!(layout_of(&outcome.widgets, "under").y, 12);
        assert_eq!(layout_of(&outcome.widgets, "new").y, 6);
        assert!(Arc::ptr_eq(&outcome.widgets[0], &widgets[0]));
    }

    #[test]
    fn test_duplicate_places_copy_below() {
        let widgets = vec![placed("button1", 0, 0, 4, 2), placed("button2", 0, 2, 4, 2)];
        let mut ids: HashSet<String> = ["button1", "button2"].iter().map(|s| s.to_string()).collect();
        let outcome = duplicate_widget(&widgets, "button1", &mut ids, HeightMode::Fixed, &grid());
        assert!(outcome.inserted);
        assert_eq!(outcome.id.as_deref(), Some("button3"));
        assert_eq!(layout_of(&outcome.widgets, "button3").y, 2);
        assert_eq!(layout_of(&outcome.widgets, "button3").h, 2);
        assert_eq!(layout_of(&outcome.widgets, "button2").y, 4);
    }

    #[test]
    fn test_duplicate_missing_source() {
        let widgets = vec![placed("a", 0, 0, 4, 6)];
        let mut ids = HashSet::new();
        let outcome = duplicate_widget(&widgets, "zzz", &mut ids, HeightMode::Fixed, &grid());
        assert!(!outcome.inserted);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_reorder_root_swaps_order_only() {
        let widgets = vec![placed("a", 0, 0, 4, 6), placed("b", 4, 0, 4, 6), placed("c", 8, 0, 4, 6)];
        let reordered = reorder_widget_in_tree(&widgets, "a", "c", None);
        let ids: Vec<&str> = reordered.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(layout_of(&reordered, "a").x, 0);
    }

    #[test]
    fn test_reorder_within_parent() {
        let container = WidgetInstance::new("box", "Container").with_children(vec![
            WidgetInstance::new("a", "Button"),
            WidgetInstance::new("b", "Button"),
        ]);
        let widgets = vec![Arc::new(container)];
        let reordered = reorder_widget_in_tree(&widgets, "b", "a", Some("box"));
        let ids: Vec<&str> = reordered[0].children().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let across = reorder_widget_in_tree(&widgets, "a", "box", Some("box"));
        assert!(Arc::ptr_eq(&across[0], &widgets[0]));
    }

    #[test]
    fn test_apply_layout_changes() {
        let widgets = vec![placed("a", 0, 0, 4, 6), placed("b", 4, 0, 4, 6)];
        let changes = vec![
            ("a".to_string(), GridLayout::new(0, 6, 4, 6)),
            ("ghost".to_string(), GridLayout::new(0, 0, 1, 1)),
        ];
        let updated = apply_layout_changes(&widgets, &changes);
        assert_eq!(layout_of(&updated, "a").y, 6);
        assert!(Arc::ptr_eq(&updated[1], &widgets[1]));
    }
}
