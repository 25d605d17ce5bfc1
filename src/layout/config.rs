//! Configuration for the grid layout engine

use serde::{Deserialize, Serialize};

use crate::widget::GridLayout;

/// Size given to a widget that has no stored layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footprint {
    pub w: i32,
    pub h: i32,
    pub min_w: i32,
    pub min_h: i32,
}

impl Default for Footprint {
    fn default() -> Self {
        Self {
            w: 4,
            h: 6,
            min_w: 2,
            min_h: 2,
        }
    }
}

/// Grid dimensions and defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Columns of a page or container grid
    pub columns: i32,

    /// Columns of the global sidebar grid
    pub sidebar_columns: i32,

    /// Default widget footprint
    pub footprint: Footprint,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 12,
            sidebar_columns: 1,
            footprint: Footprint::default(),
        }
    }
}

impl GridConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column count
    pub fn with_columns(mut self, columns: i32) -> Self {
        self.columns = columns;
        self
    }

    /// Set the sidebar column count
    pub fn with_sidebar_columns(mut self, columns: i32) -> Self {
        self.sidebar_columns = columns;
        self
    }

    /// Set the default footprint
    pub fn with_footprint(mut self, w: i32, h: i32, min_w: i32, min_h: i32) -> Self {
        self.footprint = Footprint { w, h, min_w, min_h };
        self
    }

    /// Widgets that fit side by side in one row of default footprints on
    /// a grid of `columns`
    pub fn columns_per_row(&self, columns: i32) -> i32 {
        (columns / self.footprint.w.max(1)).max(1)
    }

    /// The footprint as a layout at the origin
    pub fn footprint_layout(&self) -> GridLayout {
        GridLayout::new(0, 0, self.footprint.w, self.footprint.h)
            .with_min(self.footprint.min_w, self.footprint.min_h)
    }

    /// The footprint narrowed to fit a grid of `columns`
    pub fn footprint_in(&self, columns: i32) -> GridLayout {
        let footprint = self.footprint_layout();
        let w = footprint.w.clamp(1, columns.max(1));
        GridLayout {
            w,
            min_w: footprint.min_w.map(|m| m.clamp(1, w)),
            ..footprint
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GridConfig::default();
        assert_eq!(config.columns, 12);
        assert_eq!(config.sidebar_columns, 1);
        assert_eq!(config.footprint, Footprint { w: 4, h: 6, min_w: 2, min_h: 2 });
        assert_eq!(config.columns_per_row(config.columns), 3);
    }

    #[test]
    fn test_builder_pattern() {
        let config = GridConfig::new().with_columns(24).with_footprint(6, 4, 1, 1);
        assert_eq!(config.columns, 24);
        assert_eq!(config.columns_per_row(config.columns), 4);
        assert_eq!(config.footprint_layout().min_h, Some(1));
    }

    #[test]
    fn test_narrow_grid_still_has_one_column() {
        let config = GridConfig::new().with_columns(1);
        assert_eq!(config.columns_per_row(config.columns), 1);
    }

    #[test]
    fn test_footprint_narrows_to_sidebar() {
        let config = GridConfig::default();
        let footprint = config.footprint_in(config.sidebar_columns);
        assert_eq!((footprint.w, footprint.h), (1, 6));
        assert_eq!(footprint.min_w, Some(1));
        assert_eq!(config.footprint_in(config.columns), config.footprint_layout());
    }

    #[test]
    fn test_partial_toml() {
        let config: GridConfig = toml::from_str("columns = 24").unwrap();
        assert_eq!(config.columns, 24);
        assert_eq!(config.sidebar_columns, 1);
    }
}
