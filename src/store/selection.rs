//! Selection state and the tree each selection routes edits to

use std::fmt;

/// One of the widget trees an application holds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreeScope {
    /// Root widgets of a page
    Page(String),
    /// Page-scoped overrides of the global regions
    PageGlobals(String),
    /// Application-wide global regions
    Globals,
}

impl fmt::Display for TreeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeScope::Page(page) => write!(f, "page \"{page}\""),
            TreeScope::PageGlobals(page) => write!(f, "page globals of \"{page}\""),
            TreeScope::Globals => write!(f, "globals"),
        }
    }
}

/// What the editor currently has selected.
///
/// Exactly one mode is active at a time; the mode decides which tree an
/// edit applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    PageWidget {
        page_id: String,
        widget_id: String,
    },
    GlobalWidget {
        widget_id: String,
    },
    PageGlobalWidget {
        page_id: String,
        widget_id: String,
    },
    PageComponent {
        page_id: String,
    },
}

/// Discriminant of [`Selection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    None,
    PageWidget,
    GlobalWidget,
    PageGlobalWidget,
    PageComponent,
}

impl Selection {
    pub fn mode(&self) -> SelectionMode {
        match self {
            Selection::None => SelectionMode::None,
            Selection::PageWidget { .. } => SelectionMode::PageWidget,
            Selection::GlobalWidget { .. } => SelectionMode::GlobalWidget,
            Selection::PageGlobalWidget { .. } => SelectionMode::PageGlobalWidget,
            Selection::PageComponent { .. } => SelectionMode::PageComponent,
        }
    }

    /// Selected widget id, if a widget is selected
    pub fn widget_id(&self) -> Option<&str> {
        match self {
            Selection::PageWidget { widget_id, .. }
            | Selection::GlobalWidget { widget_id }
            | Selection::PageGlobalWidget { widget_id, .. } => Some(widget_id),
            Selection::None | Selection::PageComponent { .. } => None,
        }
    }

    /// Tree the selected widget lives in
    pub fn scope(&self) -> Option<TreeScope> {
        match self {
            Selection::PageWidget { page_id, .. } => Some(TreeScope::Page(page_id.clone())),
            Selection::GlobalWidget { .. } => Some(TreeScope::Globals),
            Selection::PageGlobalWidget { page_id, .. } => {
                Some(TreeScope::PageGlobals(page_id.clone()))
            }
            Selection::None | Selection::PageComponent { .. } => None,
        }
    }

    /// Selection of `widget_id` inside `scope`
    pub fn widget(scope: &TreeScope, widget_id: impl Into<String>) -> Self {
        let widget_id = widget_id.into();
        match scope {
            TreeScope::Page(page_id) => Selection::PageWidget {
                page_id: page_id.clone(),
                widget_id,
            },
            TreeScope::PageGlobals(page_id) => Selection::PageGlobalWidget {
                page_id: page_id.clone(),
                widget_id,
            },
            TreeScope::Globals => Selection::GlobalWidget { widget_id },
        }
    }
}

/// Editor state tied to the current selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSession {
    selection: Selection,
    /// In-progress rename text for the selected widget
    pub rename_draft: Option<String>,
    /// Open add-on panel for the selected widget
    pub addon_panel: Option<String>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Change the selection; anything tied to the old one is dropped
    pub fn select(&mut self, selection: Selection) {
        if selection != self.selection {
            tracing::debug!(from = ?self.selection.mode(), to = ?selection.mode(), "selection changed");
            self.rename_draft = None;
            self.addon_panel = None;
        }
        self.selection = selection;
    }

    pub fn clear(&mut self) {
        self.select(Selection::None);
    }

    /// Start renaming the selected widget; ignored without one
    pub fn begin_rename(&mut self) {
        if let Some(id) = self.selection.widget_id() {
            self.rename_draft = Some(id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_routing() {
        let page = Selection::PageWidget {
            page_id: "home".into(),
            widget_id: "button1".into(),
        };
        assert_eq!(page.scope(), Some(TreeScope::Page("home".into())));
        assert_eq!(page.widget_id(), Some("button1"));

        let component = Selection::PageComponent {
            page_id: "home".into(),
        };
        assert_eq!(component.scope(), None);
        assert_eq!(component.widget_id(), None);
        assert_eq!(Selection::None.mode(), SelectionMode::None);
    }

    #[test]
    fn test_widget_constructor_matches_scope() {
        let sel = Selection::widget(&TreeScope::PageGlobals("home".into()), "side1");
        assert_eq!(sel.mode(), SelectionMode::PageGlobalWidget);
        assert_eq!(sel.scope(), Some(TreeScope::PageGlobals("home".into())));
    }

    #[test]
    fn test_switching_clears_rename_and_addon_state() {
        let mut session = EditorSession::new();
        session.select(Selection::widget(&TreeScope::Page("home".into()), "button1"));
        session.begin_rename();
        session.addon_panel = Some("events".into());
        assert_eq!(session.rename_draft.as_deref(), Some("button1"));

        session.select(Selection::widget(&TreeScope::Globals, "header1"));
        assert_eq!(session.rename_draft, None);
        assert_eq!(session.addon_panel, None);
    }

    #[test]
    fn test_reselecting_keeps_state() {
        let mut session = EditorSession::new();
        let sel = Selection::widget(&TreeScope::Page("home".into()), "button1");
        session.select(sel.clone());
        session.begin_rename();
        session.select(sel);
        assert!(session.rename_draft.is_some());
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(TreeScope::Page("home".into()).to_string(), "page \"home\"");
        assert_eq!(TreeScope::Globals.to_string(), "globals");
    }
}
