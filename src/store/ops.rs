//! Routed store operations
//!
//! [`BuilderStore`] owns the application payload together with the
//! registry, configuration and preview context the edits need. Each
//! operation names the tree it applies to with a [`TreeScope`]; the
//! `*_selected` variants derive the scope from the editor's selection.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::BuilderConfig;
use crate::fx::{resolve_expression, EvalContext};
use crate::layout::{
    apply_layout_changes, apply_spacing_to_layout, duplicate_widget, get_default_widget_layout,
    normalize_layout, place_adjacent_widget, reorder_widget_in_tree, InsertPosition,
    NormalizeOptions, NormalizedLayout,
};
use crate::spacing::{
    resolve_page_padding_value, resolve_spacing_padding, resolve_widget_spacing_modes, PageSpacing,
    SpacingModes,
};
use crate::widget::{
    add_child_widget, build_widget_id, contains_widget, ensure_unique_widget_id, find_widget,
    normalize_widget_id_input, remove_widget_by_id, rewrite_references_in_tree,
    try_update_widget_by_id, widget_type_from_drag, GridLayout, HeightMode, Registry,
    RegistryError, WidgetInstance, WidgetRef, WidgetRegistry, WidgetSpacing,
};

use super::app::{container_columns, AppPayload};
use super::selection::{EditorSession, Selection, TreeScope};

/// Errors from store operations that would break an invariant
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("page not found: {page_id}")]
    PageNotFound { page_id: String },

    #[error("widget not found: \"{id}\" in {scope}")]
    WidgetNotFound { id: String, scope: TreeScope },

    #[error("widget id already in use: \"{id}\"")]
    DuplicateId { id: String },

    #[error("widget \"{id}\" of type {widget_type} cannot hold children")]
    ChildrenNotSupported { id: String, widget_type: String },

    #[error("no widget is selected")]
    NoSelection,

    #[error("not a usable widget id: \"{input}\"")]
    InvalidId { input: String },
}

/// The application being edited plus everything edits depend on
#[derive(Debug, Clone)]
pub struct BuilderStore {
    app: AppPayload,
    registry: Registry,
    config: BuilderConfig,
    context: EvalContext,
    revision: u64,
}

impl BuilderStore {
    pub fn new(app: AppPayload, registry: Registry, config: BuilderConfig) -> Self {
        Self {
            app,
            registry,
            config,
            context: EvalContext::new(),
            revision: 0,
        }
    }

    /// Store with a registry seeded from the config's catalog
    pub fn from_config(app: AppPayload, config: BuilderConfig) -> Result<Self, RegistryError> {
        let registry = Registry::from_config(&config)?;
        Ok(Self::new(app, registry, config))
    }

    /// Context used to evaluate spacing overrides during edits
    pub fn with_context(mut self, context: EvalContext) -> Self {
        self.context = context;
        self
    }

    pub fn app(&self) -> &AppPayload {
        &self.app
    }

    pub fn into_app(self) -> AppPayload {
        self.app
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn context(&self) -> &EvalContext {
        &self.context
    }

    /// Incremented on every committed edit
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tree(&self, scope: &TreeScope) -> Result<&[WidgetRef], StoreError> {
        self.app.tree(scope).ok_or_else(|| Self::page_not_found(scope))
    }

    fn page_not_found(scope: &TreeScope) -> StoreError {
        match scope {
            TreeScope::Page(id) | TreeScope::PageGlobals(id) => StoreError::PageNotFound {
                page_id: id.clone(),
            },
            TreeScope::Globals => StoreError::PageNotFound {
                page_id: String::new(),
            },
        }
    }

    fn not_found(scope: &TreeScope, id: &str) -> StoreError {
        StoreError::WidgetNotFound {
            id: id.to_string(),
            scope: scope.clone(),
        }
    }

    fn commit(&mut self, scope: &TreeScope, widgets: Vec<WidgetRef>) -> Result<(), StoreError> {
        if !self.app.set_tree(scope, widgets) {
            return Err(Self::page_not_found(scope));
        }
        self.revision += 1;
        Ok(())
    }

    /// The scope's tree with `id` replaced by `edit(widget)`
    fn edited<F>(&self, scope: &TreeScope, id: &str, edit: F) -> Result<Vec<WidgetRef>, StoreError>
    where
        F: FnOnce(&WidgetInstance) -> WidgetInstance,
    {
        try_update_widget_by_id(self.tree(scope)?, id, edit).ok_or_else(|| Self::not_found(scope, id))
    }

    /// Effective spacing modes of a widget, overrides evaluated against
    /// the store's context
    pub fn spacing_modes(&self, widget_type: &str, spacing: Option<&WidgetSpacing>) -> SpacingModes {
        resolve_widget_spacing_modes(widget_type, spacing, &self.registry, |source| {
            resolve_expression(source, &self.context)
        })
    }

    /// CSS padding of a widget's wrapper
    pub fn widget_padding(&self, widget: &WidgetInstance) -> String {
        let modes = self.spacing_modes(&widget.widget_type, widget.spacing.as_ref());
        resolve_spacing_padding(
            modes.margin_mode,
            widget.spacing.as_ref(),
            |source| resolve_expression(source, &self.context),
            &self.config.spacing.widget_padding,
        )
    }

    /// CSS padding of a page container, from the page's meta settings
    pub fn page_padding(&self, page_id: &str) -> Result<String, StoreError> {
        let page = self.app.page(page_id).ok_or_else(|| StoreError::PageNotFound {
            page_id: page_id.to_string(),
        })?;
        Ok(resolve_page_padding_value(
            &PageSpacing::from_meta(&page.page_meta),
            |source| resolve_expression(source, &self.context),
            &self.config.spacing.page_padding,
        ))
    }

    fn height_mode(&self, widget: &WidgetInstance) -> HeightMode {
        self.spacing_modes(&widget.widget_type, widget.spacing.as_ref())
            .height_mode
    }

    // ── Insertion ────────────────────────────────────────────────

    /// Drop a new widget at the end of the root list or of a container.
    ///
    /// Without an explicit layout the widget gets the next default slot.
    pub fn drop_widget(
        &mut self,
        scope: &TreeScope,
        widget_type: &str,
        parent_id: Option<&str>,
        layout: Option<GridLayout>,
    ) -> Result<String, StoreError> {
        let tree = self.tree(scope)?;
        let (siblings, parent) = match parent_id {
            None => (tree, None),
            Some(parent_id) => {
                let parent = find_widget(tree, parent_id).ok_or_else(|| Self::not_found(scope, parent_id))?;
                if parent.children.is_none() && !self.registry.supports_children(&parent.widget_type) {
                    return Err(StoreError::ChildrenNotSupported {
                        id: parent.id.clone(),
                        widget_type: parent.widget_type.clone(),
                    });
                }
                (parent.children(), Some(parent.as_ref()))
            }
        };
        let columns = container_columns(parent, &self.config.grid);

        let mut ids = self.app.widget_ids();
        let id = build_widget_id(widget_type, &mut ids);
        let mut widget = self.registry.instantiate(&id, widget_type);
        let layout = layout.unwrap_or_else(|| get_default_widget_layout(siblings, columns, &self.config.grid));
        widget.layout = Some(apply_spacing_to_layout(layout, self.height_mode(&widget)));

        let updated = match parent_id {
            None => {
                let mut list = tree.to_vec();
                list.push(Arc::new(widget));
                list
            }
            Some(parent_id) => add_child_widget(tree, parent_id, widget),
        };
        self.commit(scope, updated)?;
        tracing::debug!(%scope, id = %id, widget_type, parent = ?parent_id, "dropped widget");
        Ok(id)
    }

    /// Drop whatever widget type a drag carries; `Ok(None)` when the drag
    /// is not a widget drag
    pub fn drop_dragged<'a>(
        &mut self,
        scope: &TreeScope,
        parent_id: Option<&str>,
        payload: impl Fn(&str) -> Option<&'a str>,
    ) -> Result<Option<String>, StoreError> {
        match widget_type_from_drag(payload) {
            Some(widget_type) => self.drop_widget(scope, widget_type, parent_id, None).map(Some),
            None => Ok(None),
        }
    }

    /// Insert a new widget above or below `target_id` and push overlapping
    /// siblings down. `Ok(None)` when the target does not exist.
    pub fn quick_add(
        &mut self,
        scope: &TreeScope,
        widget_type: &str,
        target_id: &str,
        position: InsertPosition,
    ) -> Result<Option<String>, StoreError> {
        let tree = self.tree(scope)?;
        if !contains_widget(tree, target_id) {
            return Ok(None);
        }
        let mut ids = self.app.widget_ids();
        let id = build_widget_id(widget_type, &mut ids);
        let widget = self.registry.instantiate(&id, widget_type);
        let mode = self.height_mode(&widget);
        let outcome = place_adjacent_widget(tree, target_id, position, widget, mode, &self.config.grid);
        if !outcome.inserted {
            return Ok(None);
        }
        self.commit(scope, outcome.widgets)?;
        tracing::debug!(%scope, id = %id, target = target_id, %position, "quick-added widget");
        Ok(outcome.id)
    }

    /// Clone a widget subtree with fresh ids and place it below the
    /// source. `Ok(None)` when the source does not exist.
    pub fn duplicate(&mut self, scope: &TreeScope, id: &str) -> Result<Option<String>, StoreError> {
        let tree = self.tree(scope)?;
        let Some(source) = find_widget(tree, id) else {
            return Ok(None);
        };
        let mode = self.height_mode(source);
        let mut ids = self.app.widget_ids();
        let outcome = duplicate_widget(tree, id, &mut ids, mode, &self.config.grid);
        if !outcome.inserted {
            return Ok(None);
        }
        self.commit(scope, outcome.widgets)?;
        tracing::debug!(%scope, source = id, copy = ?outcome.id, "duplicated widget");
        Ok(outcome.id)
    }

    // ── Removal and identity ─────────────────────────────────────

    /// Remove a widget and its subtree; `false` when it does not exist
    pub fn delete(&mut self, scope: &TreeScope, id: &str) -> Result<bool, StoreError> {
        let tree = self.tree(scope)?;
        if !contains_widget(tree, id) {
            return Ok(false);
        }
        let updated = remove_widget_by_id(tree, id);
        self.commit(scope, updated)?;
        tracing::debug!(%scope, id, "deleted widget");
        Ok(true)
    }

    /// Change a widget's id and repoint every event action in the
    /// application that referenced the old id.
    ///
    /// `new_id` is normalized first; input with no usable characters is
    /// rejected. Returns the id actually applied.
    pub fn rename_widget_id(&mut self, scope: &TreeScope, old_id: &str, new_id: &str) -> Result<String, StoreError> {
        if !new_id.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(StoreError::InvalidId {
                input: new_id.to_string(),
            });
        }
        let normalized = normalize_widget_id_input(new_id);
        let new_id = normalized.as_str();
        if old_id == new_id {
            return Ok(new_id.to_string());
        }
        if self.app.widget_ids().contains(new_id) {
            return Err(StoreError::DuplicateId {
                id: new_id.to_string(),
            });
        }
        let renamed = self.edited(scope, old_id, |widget| WidgetInstance {
            id: new_id.to_string(),
            ..widget.clone()
        })?;
        self.commit(scope, renamed)?;

        self.app.globals = rewrite_references_in_tree(&self.app.globals, old_id, new_id);
        for page in &mut self.app.pages {
            page.widgets = rewrite_references_in_tree(&page.widgets, old_id, new_id);
            page.page_globals = rewrite_references_in_tree(&page.page_globals, old_id, new_id);
            if let Some(layout) = page.layout.as_mut() {
                layout.globals = rewrite_references_in_tree(&layout.globals, old_id, new_id);
            }
        }
        tracing::debug!(%scope, old_id, new_id, "renamed widget");
        Ok(new_id.to_string())
    }

    /// Rename from free-form user input: normalize, make unique, rename.
    ///
    /// Returns the id the widget ended up with.
    pub fn rename(&mut self, scope: &TreeScope, old_id: &str, raw: &str) -> Result<String, StoreError> {
        let candidate = normalize_widget_id_input(raw);
        if candidate == old_id {
            return Ok(candidate);
        }
        let mut ids = self.app.widget_ids();
        let new_id = ensure_unique_widget_id(&candidate, &mut ids);
        self.rename_widget_id(scope, old_id, &new_id)
    }

    // ── Property, spacing and layout edits ───────────────────────

    pub fn set_prop(&mut self, scope: &TreeScope, id: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let updated = self.edited(scope, id, |widget| widget.clone().with_prop(key, value))?;
        self.commit(scope, updated)
    }

    /// Merge `patch` into a widget's props
    pub fn update_props(&mut self, scope: &TreeScope, id: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        let updated = self.edited(scope, id, |widget| {
            let mut widget = widget.clone();
            widget.props.extend(patch);
            widget
        })?;
        self.commit(scope, updated)
    }

    /// Store new spacing settings; switching to auto height relaxes the
    /// stored minimum height
    pub fn update_spacing(&mut self, scope: &TreeScope, id: &str, spacing: WidgetSpacing) -> Result<(), StoreError> {
        let updated = self.edited(scope, id, |widget| {
            let mode = self.spacing_modes(&widget.widget_type, Some(&spacing)).height_mode;
            WidgetInstance {
                layout: widget.layout.map(|layout| apply_spacing_to_layout(layout, mode)),
                ..widget.clone().with_spacing(spacing)
            }
        })?;
        self.commit(scope, updated)
    }

    pub fn update_layout(&mut self, scope: &TreeScope, id: &str, layout: GridLayout) -> Result<(), StoreError> {
        let updated = self.edited(scope, id, |widget| {
            let layout = apply_spacing_to_layout(layout, self.height_mode(widget));
            widget.clone().with_layout(layout)
        })?;
        self.commit(scope, updated)
    }

    /// Commit the layouts the grid reports after a drag or resize.
    ///
    /// Unknown ids are skipped.
    pub fn commit_layouts(&mut self, scope: &TreeScope, changes: &[(String, GridLayout)]) -> Result<(), StoreError> {
        let tree = self.tree(scope)?;
        let changes: Vec<(String, GridLayout)> = changes
            .iter()
            .filter_map(|(id, layout)| {
                let widget = find_widget(tree, id)?;
                Some((id.clone(), apply_spacing_to_layout(*layout, self.height_mode(widget))))
            })
            .collect();
        let updated = apply_layout_changes(tree, &changes);
        self.commit(scope, updated)?;
        tracing::debug!(%scope, count = changes.len(), "committed layout batch");
        Ok(())
    }

    /// Swap two siblings under `parent_id` (root list when `None`)
    pub fn reorder(
        &mut self,
        scope: &TreeScope,
        active_id: &str,
        over_id: &str,
        parent_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let updated = reorder_widget_in_tree(self.tree(scope)?, active_id, over_id, parent_id);
        self.commit(scope, updated)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Normalized layouts of one sibling list, as the grid renders them
    pub fn normalized_layouts(
        &self,
        scope: &TreeScope,
        parent_id: Option<&str>,
        selection: &Selection,
    ) -> Result<Vec<(String, NormalizedLayout)>, StoreError> {
        let tree = self.tree(scope)?;
        let (siblings, parent) = match parent_id {
            None => (tree, None),
            Some(parent_id) => {
                let parent = find_widget(tree, parent_id).ok_or_else(|| Self::not_found(scope, parent_id))?;
                (parent.children(), Some(parent.as_ref()))
            }
        };
        let columns = container_columns(parent, &self.config.grid);
        let selected = selection.widget_id();

        Ok(siblings
            .iter()
            .enumerate()
            .map(|(index, widget)| {
                let handles = self.registry.resize_handles(&widget.widget_type);
                let options = NormalizeOptions {
                    columns,
                    resize_handles: &handles,
                    is_selected: selected == Some(widget.id.as_str()),
                    height_mode: self.height_mode(widget),
                };
                let normalized = normalize_layout(widget, index, &options, &self.config.grid);
                (widget.id.clone(), normalized)
            })
            .collect())
    }

    // ── Selection routing ────────────────────────────────────────

    fn selected(session: &EditorSession) -> Result<(TreeScope, String), StoreError> {
        let selection = session.selection();
        match (selection.scope(), selection.widget_id()) {
            (Some(scope), Some(id)) => Ok((scope, id.to_string())),
            _ => Err(StoreError::NoSelection),
        }
    }

    /// Delete the selected widget and clear the selection
    pub fn delete_selected(&mut self, session: &mut EditorSession) -> Result<bool, StoreError> {
        let (scope, id) = Self::selected(session)?;
        let deleted = self.delete(&scope, &id)?;
        session.clear();
        Ok(deleted)
    }

    /// Duplicate the selected widget and select the copy
    pub fn duplicate_selected(&mut self, session: &mut EditorSession) -> Result<Option<String>, StoreError> {
        let (scope, id) = Self::selected(session)?;
        let copy = self.duplicate(&scope, &id)?;
        if let Some(copy) = &copy {
            session.select(Selection::widget(&scope, copy.clone()));
        }
        Ok(copy)
    }

    /// Rename the selected widget and keep it selected under its new id
    pub fn rename_selected(&mut self, session: &mut EditorSession, raw: &str) -> Result<String, StoreError> {
        let (scope, id) = Self::selected(session)?;
        let new_id = self.rename(&scope, &id, raw)?;
        session.select(Selection::widget(&scope, new_id.clone()));
        Ok(new_id)
    }

    /// Quick-add next to the selected widget
    pub fn quick_add_selected(
        &mut self,
        session: &EditorSession,
        widget_type: &str,
        position: InsertPosition,
    ) -> Result<Option<String>, StoreError> {
        let (scope, id) = Self::selected(session)?;
        self.quick_add(&scope, widget_type, &id, position)
    }

    /// Set one prop of the selected widget
    pub fn set_selected_prop(&mut self, session: &EditorSession, key: &str, value: Value) -> Result<(), StoreError> {
        let (scope, id) = Self::selected(session)?;
        self.set_prop(&scope, &id, key, value)
    }
}
