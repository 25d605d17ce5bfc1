//! Lint engine for detecting defects in an application's widget trees.
//!
//! Checks the invariants edits are expected to keep: sibling layouts do
//! not overlap, ids are unique across every tree, and event actions only
//! reference widgets that exist.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::store::{AppPayload, TreeScope};
use crate::widget::{action_references, normalize_events, GlobalRegion, WidgetRef, EVENTS_PROP};

/// A lint warning about a tree defect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintWarning {
    pub category: LintCategory,
    pub message: String,
}

/// Category of lint defect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintCategory {
    Overlap,
    DuplicateId,
    DanglingReference,
}

impl fmt::Display for LintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintCategory::Overlap => write!(f, "overlap"),
            LintCategory::DuplicateId => write!(f, "duplicate-id"),
            LintCategory::DanglingReference => write!(f, "dangling-reference"),
        }
    }
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Run all lint checks on an application payload.
pub fn check(app: &AppPayload) -> Vec<LintWarning> {
    let mut warnings = Vec::new();
    let trees = app.trees();
    for (scope, tree) in &trees {
        check_overlaps(scope, tree, &mut warnings);
    }
    check_duplicate_ids(&trees, &mut warnings);
    check_references(&trees, &mut warnings);
    warnings
}

// ── Overlap detection ─────────────────────────────────────────────

fn check_overlaps(scope: &TreeScope, tree: &[WidgetRef], warnings: &mut Vec<LintWarning>) {
    match scope {
        // Each global region is its own grid
        TreeScope::Globals | TreeScope::PageGlobals(_) => {
            for region in GlobalRegion::ALL {
                let members: Vec<&WidgetRef> = tree
                    .iter()
                    .filter(|w| GlobalRegion::of(w) == region)
                    .collect();
                check_sibling_overlaps(scope, None, &members, warnings);
            }
        }
        TreeScope::Page(_) => {
            let members: Vec<&WidgetRef> = tree.iter().collect();
            check_sibling_overlaps(scope, None, &members, warnings);
        }
    }
    for widget in tree {
        check_nested_overlaps(scope, widget, warnings);
    }
}

fn check_nested_overlaps(scope: &TreeScope, parent: &WidgetRef, warnings: &mut Vec<LintWarning>) {
    let children: Vec<&WidgetRef> = parent.children().iter().collect();
    check_sibling_overlaps(scope, Some(&parent.id), &children, warnings);
    for child in parent.children() {
        check_nested_overlaps(scope, child, warnings);
    }
}

fn check_sibling_overlaps(
    scope: &TreeScope,
    parent: Option<&str>,
    siblings: &[&WidgetRef],
    warnings: &mut Vec<LintWarning>,
) {
    for (i, a) in siblings.iter().enumerate() {
        let Some(la) = a.layout else { continue };
        for b in &siblings[i + 1..] {
            let Some(lb) = b.layout else { continue };
            if la.intersects(&lb) {
                let location = match parent {
                    Some(parent) => format!("in \"{parent}\" of {scope}"),
                    None => format!("in {scope}"),
                };
                warnings.push(LintWarning {
                    category: LintCategory::Overlap,
                    message: format!(
                        "\"{}\" at {} overlaps \"{}\" at {} {}",
                        a.id, la, b.id, lb, location
                    ),
                });
            }
        }
    }
}

// ── Id uniqueness ─────────────────────────────────────────────────

fn check_duplicate_ids(trees: &[(TreeScope, &[WidgetRef])], warnings: &mut Vec<LintWarning>) {
    let mut seen: HashMap<&str, &TreeScope> = HashMap::new();
    for (scope, tree) in trees {
        for widget in tree.iter() {
            widget.walk(&mut |w| {
                if let Some(first) = seen.get(w.id.as_str()) {
                    warnings.push(LintWarning {
                        category: LintCategory::DuplicateId,
                        message: format!("\"{}\" in {} was already used in {}", w.id, scope, first),
                    });
                } else {
                    seen.insert(w.id.as_str(), scope);
                }
            });
        }
    }
}

// ── Event references ──────────────────────────────────────────────

fn check_references(trees: &[(TreeScope, &[WidgetRef])], warnings: &mut Vec<LintWarning>) {
    let mut ids: HashSet<&str> = HashSet::new();
    for (_, tree) in trees {
        for widget in tree.iter() {
            widget.walk(&mut |w| {
                ids.insert(w.id.as_str());
            });
        }
    }

    for (scope, tree) in trees {
        for widget in tree.iter() {
            widget.walk(&mut |w| {
                for action in normalize_events(w.props.get(EVENTS_PROP)) {
                    for target in action_references(&action) {
                        if !ids.contains(target) {
                            warnings.push(LintWarning {
                                category: LintCategory::DanglingReference,
                                message: format!(
                                    "\"{}\" in {} has an event action targeting missing widget \"{}\"",
                                    w.id, scope, target
                                ),
                            });
                        }
                    }
                }
            });
        }
    }
}
