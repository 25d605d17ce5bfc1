//! Core types for the widget tree

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shared handle to an immutable widget node.
///
/// Tree edits rebuild only the path to the edited node; every other
/// branch is the same `Arc` in the old and the new tree.
pub type WidgetRef = Arc<WidgetInstance>;

/// Grid placement in row/column units.
///
/// This is also the persisted JSON shape: `{x, y, w, h, minW?, minH?,
/// maxW?, maxH?}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<i32>,
}

impl GridLayout {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            ..Self::default()
        }
    }

    pub fn with_min(mut self, min_w: i32, min_h: i32) -> Self {
        self.min_w = Some(min_w);
        self.min_h = Some(min_h);
        self
    }

    pub fn with_max(mut self, max_w: i32, max_h: i32) -> Self {
        self.max_w = Some(max_w);
        self.max_h = Some(max_h);
        self
    }

    /// Column just past the right edge
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Row just past the bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Horizontal spans share at least one column
    pub fn overlaps_horizontally(&self, other: &GridLayout) -> bool {
        self.x < other.right() && self.right() > other.x
    }

    /// Vertical spans share at least one row
    pub fn overlaps_vertically(&self, other: &GridLayout) -> bool {
        self.y < other.bottom() && self.bottom() > other.y
    }

    /// Overlap in both axes at once
    pub fn intersects(&self, other: &GridLayout) -> bool {
        self.overlaps_horizontally(other) && self.overlaps_vertically(other)
    }
}

/// Height policy of a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightMode {
    /// Content drives the row count
    Auto,
    Fixed,
}

/// Outer spacing policy of a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    Normal,
    None,
}

/// Grid resize handle, named by compass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    S,
    W,
    E,
    N,
    Sw,
    Nw,
    Se,
    Ne,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::S,
        ResizeHandle::W,
        ResizeHandle::E,
        ResizeHandle::N,
        ResizeHandle::Sw,
        ResizeHandle::Nw,
        ResizeHandle::Se,
        ResizeHandle::Ne,
    ];

    /// Handle only changes width
    pub fn is_horizontal(self) -> bool {
        matches!(self, ResizeHandle::E | ResizeHandle::W)
    }
}

/// Error for mode literals that are not one of the allowed values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode '{}'", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for HeightMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(HeightMode::Auto),
            "fixed" => Ok(HeightMode::Fixed),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

impl FromStr for MarginMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(MarginMode::Normal),
            "none" => Ok(MarginMode::None),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for HeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightMode::Auto => write!(f, "auto"),
            HeightMode::Fixed => write!(f, "fixed"),
        }
    }
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginMode::Normal => write!(f, "normal"),
            MarginMode::None => write!(f, "none"),
        }
    }
}

/// Stored spacing settings; unset modes fall back to type defaults
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSpacing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mode: Option<HeightMode>,
    #[serde(default)]
    pub height_fx_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_fx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_mode: Option<MarginMode>,
    #[serde(default)]
    pub margin_fx_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_fx: Option<String>,
}

impl WidgetSpacing {
    pub fn with_height_mode(mut self, mode: HeightMode) -> Self {
        self.height_mode = Some(mode);
        self
    }

    pub fn with_margin_mode(mut self, mode: MarginMode) -> Self {
        self.margin_mode = Some(mode);
        self
    }

    pub fn with_height_fx(mut self, fx: impl Into<String>) -> Self {
        self.height_fx_enabled = true;
        self.height_fx = Some(fx.into());
        self
    }

    pub fn with_margin_fx(mut self, fx: impl Into<String>) -> Self {
        self.margin_fx_enabled = true;
        self.margin_fx = Some(fx.into());
        self
    }
}

/// One node of a page or global-region tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub widget_type: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    /// Present only for container types; `Some(vec![])` is an empty
    /// container, `None` a leaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WidgetRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<GridLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<WidgetSpacing>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub policy: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_when: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<Value>,
}

impl WidgetInstance {
    pub fn new(id: impl Into<String>, widget_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            widget_type: widget_type.into(),
            props: Map::new(),
            children: None,
            layout: None,
            spacing: None,
            policy: BTreeSet::new(),
            visible_when: None,
            disabled_when: None,
            hidden: None,
        }
    }

    /// Replace props with the entries of a JSON object
    pub fn with_props(mut self, props: Value) -> Self {
        if let Value::Object(map) = props {
            self.props = map;
        }
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    pub fn with_layout(mut self, layout: GridLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_spacing(mut self, spacing: WidgetSpacing) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn with_children(mut self, children: Vec<WidgetInstance>) -> Self {
        self.children = Some(children.into_iter().map(Arc::new).collect());
        self
    }

    pub fn with_policy(mut self, key: impl Into<String>) -> Self {
        self.policy.insert(key.into());
        self
    }

    /// Children, or an empty slice for leaves
    pub fn children(&self) -> &[WidgetRef] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Depth-first walk over this node and all descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a WidgetInstance)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

/// Application-wide slot a global widget belongs to, derived from its type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalRegion {
    Header,
    Sidebar,
    Drawer,
    Modal,
    SplitPane,
    Other,
}

impl GlobalRegion {
    pub const ALL: [GlobalRegion; 6] = [
        GlobalRegion::Header,
        GlobalRegion::Sidebar,
        GlobalRegion::Drawer,
        GlobalRegion::Modal,
        GlobalRegion::SplitPane,
        GlobalRegion::Other,
    ];

    pub fn from_type(widget_type: &str) -> Self {
        match widget_type {
            "GlobalHeader" => GlobalRegion::Header,
            "GlobalSidebar" => GlobalRegion::Sidebar,
            "GlobalDrawer" => GlobalRegion::Drawer,
            "GlobalModal" => GlobalRegion::Modal,
            "GlobalSplitPane" => GlobalRegion::SplitPane,
            _ => GlobalRegion::Other,
        }
    }

    pub fn of(widget: &WidgetInstance) -> Self {
        Self::from_type(&widget.widget_type)
    }
}

/// Widgets of `globals` that belong to `region`, in order
pub fn region_widgets(globals: &[WidgetRef], region: GlobalRegion) -> Vec<WidgetRef> {
    globals
        .iter()
        .filter(|w| GlobalRegion::of(w) == region)
        .cloned()
        .collect()
}

/// Render a JSON shape for diagnostics
impl fmt::Display for GridLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.w, self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_layout_json_round_trips_exactly() {
        let raw = json!({"x": 0, "y": 6, "w": 4, "h": 6, "minW": 2, "minH": 1});
        let layout: GridLayout = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(layout.min_w, Some(2));
        assert_eq!(layout.max_h, None);
        assert_eq!(serde_json::to_value(layout).unwrap(), raw);
    }

    #[test]
    fn test_intersects_requires_both_axes() {
        let a = GridLayout::new(0, 0, 4, 6);
        let side = GridLayout::new(4, 0, 4, 6);
        let below = GridLayout::new(0, 6, 4, 6);
        let overlap = GridLayout::new(2, 3, 4, 6);
        assert!(!a.intersects(&side));
        assert!(!a.intersects(&below));
        assert!(a.intersects(&overlap));
        assert!(a.overlaps_horizontally(&below));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("AUTO".parse::<HeightMode>(), Ok(HeightMode::Auto));
        assert_eq!(" none ".parse::<MarginMode>(), Ok(MarginMode::None));
        assert!("tall".parse::<HeightMode>().is_err());
    }

    #[test]
    fn test_widget_json_shape() {
        let raw = json!({
            "id": "container1",
            "type": "Container",
            "props": {"title": "{{ state.title }}"},
            "children": [{"id": "button1", "type": "Button", "props": {}}],
            "spacing": {"heightMode": "auto", "heightFxEnabled": false, "marginFxEnabled": false},
            "policy": ["devices:read"]
        });
        let widget: WidgetInstance = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(widget.children().len(), 1);
        assert_eq!(widget.spacing.as_ref().unwrap().height_mode, Some(HeightMode::Auto));
        assert_eq!(serde_json::to_value(&widget).unwrap(), raw);
    }

    #[test]
    fn test_leaf_and_empty_container_differ() {
        let leaf = WidgetInstance::new("a", "Button");
        let empty = WidgetInstance::new("b", "Container").with_children(vec![]);
        assert!(leaf.children.is_none());
        assert_eq!(empty.children.as_ref().map(Vec::len), Some(0));
        assert!(serde_json::to_value(&empty).unwrap().get("children").is_some());
    }

    #[test]
    fn test_region_from_type() {
        assert_eq!(GlobalRegion::from_type("GlobalSidebar"), GlobalRegion::Sidebar);
        assert_eq!(GlobalRegion::from_type("Banner"), GlobalRegion::Other);
    }

    #[test]
    fn test_walk_visits_descendants() {
        let tree = WidgetInstance::new("a", "Container").with_children(vec![
            WidgetInstance::new("b", "Container")
                .with_children(vec![WidgetInstance::new("c", "Text")]),
        ]);
        let mut ids = Vec::new();
        tree.walk(&mut |w| ids.push(w.id.clone()));
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
