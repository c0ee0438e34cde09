/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Drag-and-drop boundary: turns a drop result into one concrete action.

use dashshell_core::ContentStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Droppable id of the tab strip.
pub const TAB_STRIP_DROPPABLE: &str = "tabs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropKind {
    Tab,
    CanvasItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropSource {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropDestination {
    pub droppable_id: String,
    pub index: usize,
}

/// `{type, source:{index}, destination:{droppableId,index}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropResult {
    #[serde(rename = "type")]
    pub kind: DropKind,
    pub source: DropSource,
    #[serde(default)]
    pub destination: Option<DropDestination>,
}

impl DropResult {
    /// Lenient decode. Anything malformed is `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropAction {
    ReorderTabs { from: usize, to: usize },
    /// Reparent into another container.
    Move {
        id: String,
        parent: String,
        index: usize,
    },
    /// Same-parent sibling reorder.
    Reorder {
        id: String,
        parent: String,
        index: usize,
    },
    Ignore,
}

/// What the reducer needs to know about the active view.
pub struct DropContext<'a> {
    pub view_id: &'a str,
    /// Children of the active view in display order.
    pub child_ids: &'a [String],
    pub tab_count: usize,
    /// Only a manually sorted view accepts sibling reordering.
    pub manual_sort: bool,
}

/// Translate a drop into a tab reorder, a reparenting move, or a sibling
/// reorder. Cancelled drops and stale indices become `Ignore`.
pub fn reduce_drop(drop: &DropResult, cx: &DropContext<'_>, store: &ContentStore) -> DropAction {
    let Some(destination) = &drop.destination else {
        return DropAction::Ignore;
    };
    match drop.kind {
        DropKind::Tab => {
            if destination.droppable_id != TAB_STRIP_DROPPABLE
                || drop.source.index >= cx.tab_count
                || destination.index >= cx.tab_count
                || drop.source.index == destination.index
            {
                return DropAction::Ignore;
            }
            DropAction::ReorderTabs {
                from: drop.source.index,
                to: destination.index,
            }
        },
        DropKind::CanvasItem => {
            let Some(id) = cx.child_ids.get(drop.source.index) else {
                log::debug!("dnd: source index {} out of range", drop.source.index);
                return DropAction::Ignore;
            };
            let target = destination.droppable_id.as_str();
            if target == cx.view_id {
                if !cx.manual_sort || drop.source.index == destination.index {
                    return DropAction::Ignore;
                }
                if !is_child_of(store, id, target) {
                    log::debug!("dnd: {id} is detached from {target}, not reordering");
                    return DropAction::Ignore;
                }
                return DropAction::Reorder {
                    id: id.clone(),
                    parent: target.to_string(),
                    index: sibling_index(cx, store, id, destination.index),
                };
            }
            match store.get(target) {
                Some(node) if node.is_container() && target != id => DropAction::Move {
                    id: id.clone(),
                    parent: target.to_string(),
                    index: destination.index,
                },
                _ => {
                    log::debug!("dnd: drop target {target} is not a container");
                    DropAction::Ignore
                },
            }
        },
    }
}

fn is_child_of(store: &ContentStore, id: &str, parent: &str) -> bool {
    store.get(id).and_then(|node| node.parent()) == Some(parent)
}

/// Map a display slot to an index among the real siblings of `id`.
///
/// The displayed list can hold detached nodes (the root view shows orphans),
/// which the store does not count as siblings.
fn sibling_index(cx: &DropContext<'_>, store: &ContentStore, id: &str, slot: usize) -> usize {
    cx.child_ids
        .iter()
        .filter(|other| other.as_str() != id)
        .take(slot)
        .filter(|other| is_child_of(store, other, cx.view_id))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashshell_core::{ContentNode, NodeKind, ROOT_ID};
    use serde_json::json;

    fn fixture() -> (ContentStore, Vec<String>) {
        let mut store = ContentStore::from_seed();
        store
            .insert(ContentNode::with_id("f", NodeKind::Folder, "F"), Some(ROOT_ID), None)
            .unwrap();
        store
            .insert(ContentNode::with_id("n", NodeKind::Note, "N"), Some(ROOT_ID), None)
            .unwrap();
        let children = store.children_of(ROOT_ID).iter().map(|n| n.id.clone()).collect();
        (store, children)
    }

    fn cx<'a>(children: &'a [String], manual_sort: bool) -> DropContext<'a> {
        DropContext {
            view_id: ROOT_ID,
            child_ids: children,
            tab_count: 3,
            manual_sort,
        }
    }

    fn canvas_drop(source: usize, target: &str, index: usize) -> DropResult {
        DropResult::from_json(&json!({
            "type": "canvas-item",
            "source": { "index": source },
            "destination": { "droppableId": target, "index": index },
        }))
        .unwrap()
    }

    #[test]
    fn test_tab_drop_reorders_tabs() {
        let (store, children) = fixture();
        let drop = DropResult::from_json(&json!({
            "type": "tab",
            "source": { "index": 0 },
            "destination": { "droppableId": "tabs", "index": 2 },
        }))
        .unwrap();
        assert_eq!(
            reduce_drop(&drop, &cx(&children, true), &store),
            DropAction::ReorderTabs { from: 0, to: 2 }
        );
    }

    #[test]
    fn test_drop_onto_folder_moves() {
        let (store, children) = fixture();
        let source = children.iter().position(|id| id == "n").unwrap();
        assert_eq!(
            reduce_drop(&canvas_drop(source, "f", 0), &cx(&children, true), &store),
            DropAction::Move {
                id: "n".to_string(),
                parent: "f".to_string(),
                index: 0
            }
        );
    }

    #[test]
    fn test_same_parent_reorder_requires_manual_sort() {
        let (store, children) = fixture();
        let drop = canvas_drop(0, ROOT_ID, 2);
        assert!(matches!(
            reduce_drop(&drop, &cx(&children, true), &store),
            DropAction::Reorder { .. }
        ));
        assert_eq!(reduce_drop(&drop, &cx(&children, false), &store), DropAction::Ignore);
    }

    #[test]
    fn test_invalid_drops_are_ignored() {
        let (store, children) = fixture();
        let source = children.iter().position(|id| id == "f").unwrap();
        assert_eq!(
            reduce_drop(&canvas_drop(source, "n", 0), &cx(&children, true), &store),
            DropAction::Ignore
        );
        assert_eq!(
            reduce_drop(&canvas_drop(99, "f", 0), &cx(&children, true), &store),
            DropAction::Ignore
        );
        let cancelled = DropResult::from_json(&json!({
            "type": "canvas-item",
            "source": { "index": 0 },
            "destination": null,
        }))
        .unwrap();
        assert_eq!(reduce_drop(&cancelled, &cx(&children, true), &store), DropAction::Ignore);
        assert!(DropResult::from_json(&json!({ "type": "window" })).is_none());
    }

    fn orphan_fixture() -> (ContentStore, Vec<String>) {
        let mut store = ContentStore::from_seed();
        store
            .insert(ContentNode::with_id("z", NodeKind::Note, "Z"), Some(ROOT_ID), None)
            .unwrap();
        let mut orphan = ContentNode::with_id("o", NodeKind::Note, "O");
        orphan.parent_id = Some("ghost".to_string());
        orphan.order = 0.5;
        let store = ContentStore::from_nodes_unchecked(
            store.nodes().iter().cloned().chain([orphan]).collect(),
        );
        let hierarchy = dashshell_core::build_hierarchy(store.nodes());
        let children = dashshell_core::resolve_view(ROOT_ID, &store, &hierarchy)
            .unwrap()
            .child_ids();
        (store, children)
    }

    #[test]
    fn test_reorder_slot_skips_detached_nodes_in_root_view() {
        let (mut store, children) = orphan_fixture();
        assert_eq!(children, ["saved", "o", "welcome", "trash", "z"]);

        let action = reduce_drop(&canvas_drop(4, ROOT_ID, 2), &cx(&children, true), &store);
        assert_eq!(
            action,
            DropAction::Reorder {
                id: "z".to_string(),
                parent: ROOT_ID.to_string(),
                index: 1
            }
        );
        store.move_node("z", Some(ROOT_ID), Some(1)).unwrap();
        let hierarchy = dashshell_core::build_hierarchy(store.nodes());
        let after = dashshell_core::resolve_view(ROOT_ID, &store, &hierarchy)
            .unwrap()
            .child_ids();
        assert_eq!(after.iter().position(|id| id == "z"), Some(2));
    }

    #[test]
    fn test_dragging_a_detached_node_within_root_is_ignored() {
        let (store, children) = orphan_fixture();
        let source = children.iter().position(|id| id == "o").unwrap();
        assert_eq!(
            reduce_drop(&canvas_drop(source, ROOT_ID, 3), &cx(&children, true), &store),
            DropAction::Ignore
        );
    }
}
