//! Recursive tree primitives with structural sharing
//!
//! Every primitive takes a sibling list and returns a new one. Nodes off
//! the path to the edited node are the same `Arc` in the input and the
//! output; when nothing matches the output shares every node.

use std::sync::Arc;

use super::events::rewrite_props_references;
use super::types::{WidgetInstance, WidgetRef};

/// Rebuild `node` with new children
fn with_children(node: &WidgetInstance, children: Option<Vec<WidgetRef>>) -> WidgetRef {
    Arc::new(WidgetInstance {
        children,
        ..node.clone()
    })
}

/// Replace `tree[index]`, sharing every other node
fn replace_at(tree: &[WidgetRef], index: usize, node: WidgetRef) -> Vec<WidgetRef> {
    let mut out = tree.to_vec();
    out[index] = node;
    out
}

/// Find a node anywhere in the tree
pub fn find_widget<'a>(tree: &'a [WidgetRef], id: &str) -> Option<&'a WidgetRef> {
    for node in tree {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_widget(node.children(), id) {
            return Some(found);
        }
    }
    None
}

pub fn contains_widget(tree: &[WidgetRef], id: &str) -> bool {
    find_widget(tree, id).is_some()
}

/// The sibling list holding `id`, and the id of its parent (`None` for
/// the root list)
pub fn find_siblings<'a>(
    tree: &'a [WidgetRef],
    id: &str,
) -> Option<(&'a [WidgetRef], Option<&'a str>)> {
    if tree.iter().any(|node| node.id == id) {
        return Some((tree, None));
    }
    for node in tree {
        if let Some((siblings, parent)) = find_siblings(node.children(), id) {
            return Some((siblings, parent.or(Some(node.id.as_str()))));
        }
    }
    None
}

/// Apply `edit` to the sibling list containing `id`.
///
/// `edit` receives that list and returns its replacement; the path above
/// it is rebuilt. `None` when `id` is not in the tree.
pub fn edit_siblings_of<F>(tree: &[WidgetRef], id: &str, edit: F) -> Option<Vec<WidgetRef>>
where
    F: FnOnce(&[WidgetRef]) -> Vec<WidgetRef>,
{
    let mut edit = Some(edit);
    edit_siblings_in(tree, id, &mut edit)
}

fn edit_siblings_in<F>(tree: &[WidgetRef], id: &str, edit: &mut Option<F>) -> Option<Vec<WidgetRef>>
where
    F: FnOnce(&[WidgetRef]) -> Vec<WidgetRef>,
{
    if tree.iter().any(|node| node.id == id) {
        let edit = edit.take()?;
        return Some(edit(tree));
    }
    for (index, node) in tree.iter().enumerate() {
        let Some(children) = node.children.as_deref() else {
            continue;
        };
        if let Some(updated) = edit_siblings_in(children, id, edit) {
            return Some(replace_at(tree, index, with_children(node, Some(updated))));
        }
    }
    None
}

/// Replace the node with `id` by `updater(node)`
pub fn update_widget_by_id<F>(tree: &[WidgetRef], id: &str, updater: F) -> Vec<WidgetRef>
where
    F: FnOnce(&WidgetInstance) -> WidgetInstance,
{
    try_update_widget_by_id(tree, id, updater).unwrap_or_else(|| tree.to_vec())
}

/// Like [`update_widget_by_id`], but `None` when `id` is absent
pub fn try_update_widget_by_id<F>(tree: &[WidgetRef], id: &str, updater: F) -> Option<Vec<WidgetRef>>
where
    F: FnOnce(&WidgetInstance) -> WidgetInstance,
{
    let mut updater = Some(updater);
    update_in(tree, id, &mut updater)
}

fn update_in<F>(tree: &[WidgetRef], id: &str, updater: &mut Option<F>) -> Option<Vec<WidgetRef>>
where
    F: FnOnce(&WidgetInstance) -> WidgetInstance,
{
    for (index, node) in tree.iter().enumerate() {
        let replacement = if node.id == id {
            let update = updater.take()?;
            Arc::new(update(node.as_ref()))
        } else if let Some(children) = node.children.as_deref() {
            match update_in(children, id, updater) {
                Some(updated) => with_children(node, Some(updated)),
                None => continue,
            }
        } else {
            continue;
        };
        return Some(replace_at(tree, index, replacement));
    }
    None
}

/// Remove the node with `id`, wherever it is.
///
/// A parent left without children loses its `children` entirely.
pub fn remove_widget_by_id(tree: &[WidgetRef], id: &str) -> Vec<WidgetRef> {
    remove_in(tree, id).unwrap_or_else(|| tree.to_vec())
}

fn remove_in(tree: &[WidgetRef], id: &str) -> Option<Vec<WidgetRef>> {
    if let Some(index) = tree.iter().position(|node| node.id == id) {
        let mut out = tree.to_vec();
        out.remove(index);
        return Some(out);
    }
    for (index, node) in tree.iter().enumerate() {
        let Some(children) = node.children.as_deref() else {
            continue;
        };
        if let Some(updated) = remove_in(children, id) {
            let children = (!updated.is_empty()).then_some(updated);
            return Some(replace_at(tree, index, with_children(node, children)));
        }
    }
    None
}

/// Append `child` to the children of `parent_id`, creating the list if
/// needed. Unchanged when the parent is absent.
pub fn add_child_widget(tree: &[WidgetRef], parent_id: &str, child: WidgetInstance) -> Vec<WidgetRef> {
    update_widget_by_id(tree, parent_id, |parent| {
        let mut children = parent.children.clone().unwrap_or_default();
        children.push(Arc::new(child));
        WidgetInstance {
            children: Some(children),
            ..parent.clone()
        }
    })
}

/// Point every event action that references `old_id` at `new_id`, at any
/// depth. Only nodes whose events change, and their ancestors, are rebuilt.
pub fn rewrite_references_in_tree(tree: &[WidgetRef], old_id: &str, new_id: &str) -> Vec<WidgetRef> {
    rewrite_in(tree, old_id, new_id).unwrap_or_else(|| tree.to_vec())
}

fn rewrite_in(tree: &[WidgetRef], old_id: &str, new_id: &str) -> Option<Vec<WidgetRef>> {
    let mut out: Option<Vec<WidgetRef>> = None;
    for (index, node) in tree.iter().enumerate() {
        let props = rewrite_props_references(&node.props, old_id, new_id);
        let children = node
            .children
            .as_deref()
            .and_then(|children| rewrite_in(children, old_id, new_id));
        if props.is_none() && children.is_none() {
            continue;
        }
        let mut updated = (**node).clone();
        if let Some(props) = props {
            updated.props = props;
        }
        if let Some(children) = children {
            updated.children = Some(children);
        }
        out.get_or_insert_with(|| tree.to_vec())[index] = Arc::new(updated);
    }
    out
}

/// Visit every node of a tree depth-first
pub fn walk_tree<'a>(tree: &'a [WidgetRef], visit: &mut impl FnMut(&'a WidgetInstance)) {
    for node in tree {
        node.walk(visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Vec<WidgetRef> {
        vec![
            Arc::new(WidgetInstance::new("header1", "Text")),
            Arc::new(
                WidgetInstance::new("container1", "Container").with_children(vec![
                    WidgetInstance::new("button1", "Button"),
                    WidgetInstance::new("container2", "Container")
                        .with_children(vec![WidgetInstance::new("text1", "Text")]),
                ]),
            ),
            Arc::new(WidgetInstance::new("table1", "Table")),
        ]
    }

    #[test]
    fn test_update_shares_untouched_branches() {
        let tree = sample();
        let updated = update_widget_by_id(&tree, "text1", |w| {
            w.clone().with_prop("value", json!("hi"))
        });

        assert!(Arc::ptr_eq(&tree[0], &updated[0]));
        assert!(Arc::ptr_eq(&tree[2], &updated[2]));
        assert!(!Arc::ptr_eq(&tree[1], &updated[1]));
        assert!(Arc::ptr_eq(&tree[1].children()[0], &updated[1].children()[0]));

        let text = find_widget(&updated, "text1").unwrap();
        assert_eq!(text.props.get("value"), Some(&json!("hi")));
        assert!(find_widget(&tree, "text1").unwrap().props.is_empty());
    }

    #[test]
    fn test_update_missing_shares_everything() {
        let tree = sample();
        let updated = update_widget_by_id(&tree, "missing", |w| w.clone());
        assert!(tree.iter().zip(&updated).all(|(a, b)| Arc::ptr_eq(a, b)));
        assert!(try_update_widget_by_id(&tree, "missing", |w| w.clone()).is_none());
    }

    #[test]
    fn test_remove_root_and_nested() {
        let tree = sample();
        let without_root = remove_widget_by_id(&tree, "table1");
        assert_eq!(without_root.len(), 2);

        let without_nested = remove_widget_by_id(&tree, "button1");
        assert_eq!(without_nested[1].children().len(), 1);
        assert!(!contains_widget(&without_nested, "button1"));
    }

    #[test]
    fn test_remove_last_child_drops_children() {
        let tree = sample();
        let updated = remove_widget_by_id(&tree, "text1");
        let container = find_widget(&updated, "container2").unwrap();
        assert!(container.children.is_none());
    }

    #[test]
    fn test_add_child_initializes_list() {
        let tree = sample();
        let updated = add_child_widget(&tree, "table1", WidgetInstance::new("text2", "Text"));
        let table = find_widget(&updated, "table1").unwrap();
        assert_eq!(table.children().len(), 1);

        let appended = add_child_widget(&tree, "container1", WidgetInstance::new("text2", "Text"));
        let ids: Vec<&str> = appended[1].children().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["button1", "container2", "text2"]);
    }

    #[test]
    fn test_find_siblings_reports_parent() {
        let tree = sample();
        let (siblings, parent) = find_siblings(&tree, "text1").unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(parent, Some("container2"));

        let (root, parent) = find_siblings(&tree, "table1").unwrap();
        assert_eq!(root.len(), 3);
        assert_eq!(parent, None);
    }

    #[test]
    fn test_rewrite_references_at_depth() {
        let tree = vec![Arc::new(
            WidgetInstance::new("container1", "Container").with_children(vec![
                WidgetInstance::new("button1", "Button")
                    .with_prop("events", json!([{"componentId": "modal1"}])),
                WidgetInstance::new("button2", "Button")
                    .with_prop("events", json!([{"componentId": "other"}])),
            ]),
        )];
        let updated = rewrite_references_in_tree(&tree, "modal1", "confirmModal");
        let button = find_widget(&updated, "button1").unwrap();
        assert_eq!(button.props["events"], json!([{"componentId": "confirmModal"}]));
        assert!(Arc::ptr_eq(&tree[0].children()[1], &updated[0].children()[1]));
    }

    #[test]
    fn test_edit_siblings_of() {
        let tree = sample();
        let updated = edit_siblings_of(&tree, "text1", |siblings| {
            let mut list = siblings.to_vec();
            list.push(Arc::new(WidgetInstance::new("text2", "Text")));
            list
        })
        .unwrap();
        let container = find_widget(&updated, "container2").unwrap();
        assert_eq!(container.children().len(), 2);
        assert!(edit_siblings_of(&tree, "missing", |s| s.to_vec()).is_none());
    }
}
