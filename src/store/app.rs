//! Application payload: pages, global regions, queries and scripts
//!
//! This is the unit handed to the persistence backend. It is also the
//! explicit store every cross-tree operation (id uniqueness, rename
//! propagation, lint) reads from.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::layout::GridConfig;
use crate::widget::{collect_widget_ids, region_widgets, GlobalRegion, WidgetInstance, WidgetRef};

use super::selection::TreeScope;

/// Denormalized layout snapshot stored with a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    /// Mirror of the page's `pageGlobals`
    #[serde(default)]
    pub globals: Vec<WidgetRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub widgets: Vec<WidgetRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_globals: Vec<WidgetRef>,
    #[serde(default)]
    pub menu: Value,
    #[serde(default)]
    pub page_meta: Value,
    #[serde(default)]
    pub page_component: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PageLayout>,
}

impl Page {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            widgets: Vec::new(),
            page_globals: Vec::new(),
            menu: Value::Null,
            page_meta: Value::Null,
            page_component: Value::Null,
            layout: None,
        }
    }

    pub fn with_widgets(mut self, widgets: Vec<WidgetInstance>) -> Self {
        self.widgets = widgets.into_iter().map(Arc::new).collect();
        self
    }

    pub fn with_page_globals(mut self, globals: Vec<WidgetInstance>) -> Self {
        self.set_page_globals(globals.into_iter().map(Arc::new).collect());
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.page_meta = meta;
        self
    }

    /// Replace the page-global overrides and their layout mirror
    pub fn set_page_globals(&mut self, globals: Vec<WidgetRef>) {
        self.layout.get_or_insert_with(PageLayout::default).globals = globals.clone();
        self.page_globals = globals;
    }
}

/// Everything persisted for one application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPayload {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub globals: Vec<WidgetRef>,
    #[serde(default)]
    pub queries: Vec<Value>,
    #[serde(default)]
    pub scripts: Vec<Value>,
}

impl AppPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_globals(mut self, globals: Vec<WidgetInstance>) -> Self {
        self.globals = globals.into_iter().map(Arc::new).collect();
        self
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    pub fn page_mut(&mut self, page_id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == page_id)
    }

    /// Every tree, in page order, then the application globals
    pub fn trees(&self) -> Vec<(TreeScope, &[WidgetRef])> {
        let mut trees = Vec::with_capacity(self.pages.len() * 2 + 1);
        for page in &self.pages {
            trees.push((TreeScope::Page(page.id.clone()), page.widgets.as_slice()));
            trees.push((
                TreeScope::PageGlobals(page.id.clone()),
                page.page_globals.as_slice(),
            ));
        }
        trees.push((TreeScope::Globals, self.globals.as_slice()));
        trees
    }

    pub fn tree(&self, scope: &TreeScope) -> Option<&[WidgetRef]> {
        match scope {
            TreeScope::Page(id) => self.page(id).map(|p| p.widgets.as_slice()),
            TreeScope::PageGlobals(id) => self.page(id).map(|p| p.page_globals.as_slice()),
            TreeScope::Globals => Some(self.globals.as_slice()),
        }
    }

    /// Replace one tree, keeping denormalized copies in step.
    ///
    /// Returns `false` when the scope names an unknown page.
    pub fn set_tree(&mut self, scope: &TreeScope, widgets: Vec<WidgetRef>) -> bool {
        match scope {
            TreeScope::Page(id) => match self.page_mut(id) {
                Some(page) => {
                    page.widgets = widgets;
                    true
                }
                None => false,
            },
            TreeScope::PageGlobals(id) => match self.page_mut(id) {
                Some(page) => {
                    page.set_page_globals(widgets);
                    true
                }
                None => false,
            },
            TreeScope::Globals => {
                self.globals = widgets;
                true
            }
        }
    }

    /// Ids in use across every page, page-global list and the globals
    pub fn widget_ids(&self) -> HashSet<String> {
        collect_widget_ids(self.trees().into_iter().map(|(_, tree)| tree))
    }

    /// Contents of a global region as seen from a page: a non-empty
    /// page-global override replaces the application-wide region
    pub fn effective_region(&self, page_id: &str, region: GlobalRegion) -> Vec<WidgetRef> {
        let overrides = self
            .page(page_id)
            .map(|p| region_widgets(&p.page_globals, region))
            .unwrap_or_default();
        if overrides.is_empty() {
            region_widgets(&self.globals, region)
        } else {
            overrides
        }
    }
}

/// Columns of the grid a tree's widgets are placed on
pub fn region_columns(region: GlobalRegion, grid: &GridConfig) -> i32 {
    match region {
        GlobalRegion::Sidebar => grid.sidebar_columns,
        _ => grid.columns,
    }
}

/// Columns available to the children of `parent`, or to a root list
pub fn container_columns(parent: Option<&WidgetInstance>, grid: &GridConfig) -> i32 {
    parent
        .map(|p| region_columns(GlobalRegion::of(p), grid))
        .unwrap_or(grid.columns)
}
