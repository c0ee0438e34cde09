/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Content store: the flat, authoritative node collection.
//!
//! Every mutation goes through this type so that the tree invariants hold
//! after each call:
//! - ids are unique
//! - the essential folders exist and sit at their fixed parents
//! - following `parent_id` from any node never revisits a node
//!
//! Each successful mutation bumps [`ContentStore::revision`], which
//! downstream memoization keys on.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::model::seed::default_seed;
use crate::model::{ContentNode, NodePatch, ROOT_ID, TRASH_ID, is_essential, now_millis};

pub mod reconcile;

pub use reconcile::{RepairReport, reconcile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    InvalidId,
    NotFound(String),
    EssentialNode(String),
    RootCannotBeChild,
    WouldCreateCycle { id: String, parent: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidId => write!(f, "Node id must not be empty"),
            StoreError::NotFound(id) => write!(f, "Node not found: {id}"),
            StoreError::EssentialNode(id) => write!(f, "Essential node cannot be moved or removed: {id}"),
            StoreError::RootCannotBeChild => write!(f, "The root node cannot have a parent"),
            StoreError::WouldCreateCycle { id, parent } => {
                write!(f, "Attaching {id} under {parent} would create a cycle")
            },
        }
    }
}

impl std::error::Error for StoreError {}

/// Ids touched by one store call, for persistence and mirroring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl MutationOutcome {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn merge(&mut self, other: MutationOutcome) {
        for id in other.inserted {
            if !self.inserted.contains(&id) {
                self.inserted.push(id);
            }
        }
        for id in other.updated {
            self.note_updated(&id);
        }
        for id in other.removed {
            self.inserted.retain(|existing| existing != &id);
            self.updated.retain(|existing| existing != &id);
            if !self.removed.contains(&id) {
                self.removed.push(id);
            }
        }
    }

    fn note_updated(&mut self, id: &str) {
        if !self.inserted.iter().any(|existing| existing == id)
            && !self.updated.iter().any(|existing| existing == id)
        {
            self.updated.push(id.to_string());
        }
    }

    fn touches(&self, id: &str) -> bool {
        self.inserted.iter().chain(&self.updated).any(|existing| existing == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    nodes: Vec<ContentNode>,
    index: HashMap<String, usize>,
    revision: u64,
}

impl ContentStore {
    /// A store holding only the essential folders.
    pub fn from_seed() -> Self {
        Self::from_nodes_unchecked(default_seed())
    }

    /// Adopt a loaded collection, repairing it first.
    pub fn from_nodes(mut nodes: Vec<ContentNode>) -> (Self, RepairReport) {
        let report = reconcile(&mut nodes);
        (Self::from_nodes_unchecked(nodes), report)
    }

    /// Adopt `nodes` without repair. Later duplicates of an id are dropped
    /// so lookups stay unambiguous.
    pub fn from_nodes_unchecked(mut nodes: Vec<ContentNode>) -> Self {
        let mut seen = HashSet::with_capacity(nodes.len());
        nodes.retain(|node| seen.insert(node.id.clone()));
        let mut store = Self {
            nodes,
            index: HashMap::new(),
            revision: 0,
        };
        store.reindex();
        store
    }

    /// Swap in a freshly loaded collection (cross-tab reload, import).
    pub fn replace_all(&mut self, mut nodes: Vec<ContentNode>) -> RepairReport {
        let report = reconcile(&mut nodes);
        self.nodes = nodes;
        self.reindex();
        self.bump();
        report
    }

    pub fn nodes(&self) -> &[ContentNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&ContentNode> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Direct children of `parent` in manual order.
    pub fn children_of(&self, parent: &str) -> Vec<&ContentNode> {
        self.sibling_positions(Some(parent), None)
            .into_iter()
            .map(|pos| &self.nodes[pos])
            .collect()
    }

    /// `id` and every node whose parent chain reaches it, breadth first.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in &self.nodes {
            if let Some(parent) = node.parent() {
                children.entry(parent).or_default().push(node.id.as_str());
            }
        }
        let mut visited: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            out.push(current.to_string());
            if let Some(kids) = children.get(current) {
                queue.extend(kids.iter().copied());
            }
        }
        out
    }

    /// Whether `ancestor` is `id` or appears on its parent chain.
    pub fn is_within(&self, ancestor: &str, id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                return false;
            }
            match self.get(current).and_then(ContentNode::parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Insert `node` under `parent_id`.
    ///
    /// With an `index` the node takes that sibling position and later
    /// siblings shift down by one. Without one it is appended. The parent
    /// does not have to exist yet. An id that is already present is moved in
    /// place instead of duplicated.
    pub fn insert(
        &mut self,
        mut node: ContentNode,
        parent_id: Option<&str>,
        index: Option<usize>,
    ) -> Result<MutationOutcome, StoreError> {
        if node.id.trim().is_empty() {
            return Err(StoreError::InvalidId);
        }
        if self.contains(&node.id) {
            log::debug!("store: insert of existing id {} treated as a move", node.id);
            return self.move_node(&node.id, parent_id, index);
        }
        self.check_attach(&node.id, parent_id)?;

        node.parent_id = parent_id.map(str::to_string);
        node.touch();
        let id = node.id.clone();
        self.nodes.push(node);
        let pos = self.nodes.len() - 1;
        self.index.insert(id.clone(), pos);

        let mut outcome = MutationOutcome::default();
        outcome.inserted.push(id);
        self.place(pos, index, &mut outcome);
        self.bump();
        Ok(outcome)
    }

    /// Apply a partial update. A `parent_id` change is validated like a move.
    pub fn update(&mut self, id: &str, patch: &NodePatch) -> Result<MutationOutcome, StoreError> {
        let pos = self.position(id)?;
        let mut outcome = MutationOutcome::default();
        self.update_at(pos, patch, &mut outcome)?;
        if !outcome.is_empty() {
            self.bump();
        }
        Ok(outcome)
    }

    /// Apply one patch to many nodes. Missing or protected ids are skipped;
    /// the revision moves once for the whole batch.
    pub fn bulk_update(&mut self, ids: &[String], patch: &NodePatch) -> MutationOutcome {
        let mut outcome = MutationOutcome::default();
        for id in ids {
            let Some(&pos) = self.index.get(id.as_str()) else {
                log::debug!("store: bulk update skipped missing {id}");
                continue;
            };
            if let Err(error) = self.update_at(pos, patch, &mut outcome) {
                log::warn!("store: bulk update skipped {id}: {error}");
            }
        }
        if !outcome.is_empty() {
            self.bump();
        }
        outcome
    }

    /// Reparent and/or reorder a node.
    ///
    /// Within the same parent the sibling group is renumbered `0..n` with the
    /// node at `index` (end when `None`).
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent: Option<&str>,
        index: Option<usize>,
    ) -> Result<MutationOutcome, StoreError> {
        let pos = self.position(id)?;
        if id == ROOT_ID && new_parent.is_some() {
            return Err(StoreError::RootCannotBeChild);
        }
        if is_essential(id) {
            return Err(StoreError::EssentialNode(id.to_string()));
        }
        self.check_attach(id, new_parent)?;

        let mut outcome = MutationOutcome::default();
        if self.nodes[pos].parent() == new_parent {
            self.reorder_within(pos, index, &mut outcome);
        } else {
            self.nodes[pos].parent_id = new_parent.map(str::to_string);
            self.nodes[pos].touch();
            outcome.note_updated(id);
            self.place(pos, index, &mut outcome);
        }
        self.bump();
        Ok(outcome)
    }

    /// Remove `id` and everything below it.
    pub fn delete_subtree(&mut self, id: &str) -> Result<MutationOutcome, StoreError> {
        self.position(id)?;
        if is_essential(id) {
            return Err(StoreError::EssentialNode(id.to_string()));
        }
        let outcome = self.remove_subtrees(&[id.to_string()]);
        self.bump();
        Ok(outcome)
    }

    /// Move a node to the front of the trash folder.
    pub fn move_to_trash(&mut self, id: &str) -> Result<MutationOutcome, StoreError> {
        self.move_node(id, Some(TRASH_ID), Some(0))
    }

    /// Permanently delete everything in the trash.
    pub fn empty_trash(&mut self) -> MutationOutcome {
        let roots: Vec<String> = self
            .children_of(TRASH_ID)
            .into_iter()
            .map(|node| node.id.clone())
            .collect();
        if roots.is_empty() {
            return MutationOutcome::default();
        }
        let outcome = self.remove_subtrees(&roots);
        self.bump();
        outcome
    }

    /// Copy `id` and its subtree under `parent_id` with fresh ids.
    ///
    /// Returns the id of the copied subtree root.
    pub fn duplicate_subtree(
        &mut self,
        id: &str,
        parent_id: Option<&str>,
        index: Option<usize>,
    ) -> Result<(String, MutationOutcome), StoreError> {
        self.position(id)?;
        if id == ROOT_ID {
            return Err(StoreError::RootCannotBeChild);
        }
        let source_ids = self.descendants(id);
        let mapping: HashMap<&str, String> = source_ids
            .iter()
            .map(|old| (old.as_str(), Uuid::new_v4().to_string()))
            .collect();
        let now = now_millis();
        let mut copies = Vec::with_capacity(source_ids.len());
        for old in &source_ids {
            let (Some(source), Some(new_id)) = (self.get(old), mapping.get(old.as_str())) else {
                continue;
            };
            let mut copy = source.clone();
            copy.id = new_id.clone();
            copy.parent_id = if old == id {
                parent_id.map(str::to_string)
            } else {
                source
                    .parent()
                    .and_then(|parent| mapping.get(parent).cloned())
                    .or_else(|| source.parent_id.clone())
            };
            copy.created_at = now;
            copy.updated_at = now;
            copies.push(copy);
        }

        let Some(new_root) = mapping.get(id).cloned() else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let mut outcome = MutationOutcome::default();
        for copy in copies {
            outcome.inserted.push(copy.id.clone());
            self.index.insert(copy.id.clone(), self.nodes.len());
            self.nodes.push(copy);
        }
        let root_pos = self.position(&new_root)?;
        self.place(root_pos, index, &mut outcome);
        self.bump();
        Ok((new_root, outcome))
    }

    /// Re-run the repair pass in place.
    pub fn ensure_essentials(&mut self) -> RepairReport {
        let report = reconcile(&mut self.nodes);
        if !report.is_clean() {
            self.reindex();
            self.bump();
        }
        report
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id.clone(), pos))
            .collect();
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn check_attach(&self, id: &str, parent: Option<&str>) -> Result<(), StoreError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if id == ROOT_ID {
            return Err(StoreError::RootCannotBeChild);
        }
        if self.is_within(id, parent) {
            return Err(StoreError::WouldCreateCycle {
                id: id.to_string(),
                parent: parent.to_string(),
            });
        }
        Ok(())
    }

    /// Positions of `parent`'s children in manual order. The root is never
    /// part of a sibling group.
    fn sibling_positions(&self, parent: Option<&str>, exclude: Option<&str>) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.parent() == parent && node.id != ROOT_ID && Some(node.id.as_str()) != exclude
            })
            .map(|(pos, _)| pos)
            .collect();
        positions.sort_by(|&a, &b| self.nodes[a].order.total_cmp(&self.nodes[b].order));
        positions
    }

    fn set_order(&mut self, pos: usize, order: f64, outcome: &mut MutationOutcome) {
        let node = &mut self.nodes[pos];
        if node.order != order {
            node.order = order;
            node.touch();
            outcome.note_updated(&node.id);
        }
    }

    /// Give the node at `pos` an order within its (already set) parent.
    fn place(&mut self, pos: usize, index: Option<usize>, outcome: &mut MutationOutcome) {
        let id = self.nodes[pos].id.clone();
        let parent = self.nodes[pos].parent_id.clone();
        let siblings = self.sibling_positions(parent.as_deref(), Some(&id));

        let has_ties = siblings
            .windows(2)
            .any(|pair| self.nodes[pair[0]].order == self.nodes[pair[1]].order);
        if has_ties {
            for (i, &sibling) in siblings.iter().enumerate() {
                self.set_order(sibling, i as f64, outcome);
            }
        }

        let order = match index {
            Some(i) if i < siblings.len() => {
                let at = self.nodes[siblings[i]].order;
                for &sibling in &siblings[i..] {
                    let shifted = self.nodes[sibling].order + 1.0;
                    self.set_order(sibling, shifted, outcome);
                }
                at
            },
            _ => siblings
                .last()
                .map(|&last| self.nodes[last].order + 1.0)
                .unwrap_or(0.0),
        };
        self.nodes[pos].order = order;
    }

    fn reorder_within(&mut self, pos: usize, index: Option<usize>, outcome: &mut MutationOutcome) {
        let id = self.nodes[pos].id.clone();
        let parent = self.nodes[pos].parent_id.clone();
        let mut group = self.sibling_positions(parent.as_deref(), Some(&id));
        let at = index.unwrap_or(group.len()).min(group.len());
        group.insert(at, pos);
        for (i, &member) in group.iter().enumerate() {
            self.set_order(member, i as f64, outcome);
        }
        self.nodes[pos].touch();
        outcome.note_updated(&id);
    }

    fn update_at(
        &mut self,
        pos: usize,
        patch: &NodePatch,
        outcome: &mut MutationOutcome,
    ) -> Result<(), StoreError> {
        let id = self.nodes[pos].id.clone();
        let reparent = patch
            .parent_id
            .as_deref()
            .filter(|parent| self.nodes[pos].parent() != Some(*parent));

        if reparent.is_some() || patch.order.is_some() {
            if id == ROOT_ID && reparent.is_some() {
                return Err(StoreError::RootCannotBeChild);
            }
            if is_essential(&id) {
                return Err(StoreError::EssentialNode(id));
            }
        }
        if let Some(parent) = reparent {
            self.check_attach(&id, Some(parent))?;
            self.nodes[pos].parent_id = Some(parent.to_string());
            outcome.note_updated(&id);
            if patch.order.is_none() {
                self.place(pos, None, outcome);
            }
        }
        if let Some(order) = patch.order.filter(|order| order.is_finite()) {
            self.set_order(pos, order, outcome);
        }
        if patch.apply_fields(&mut self.nodes[pos]) {
            outcome.note_updated(&id);
        }
        if outcome.touches(&id) {
            self.nodes[pos].touch();
        }
        Ok(())
    }

    fn remove_subtrees(&mut self, roots: &[String]) -> MutationOutcome {
        let mut doomed: Vec<String> = Vec::new();
        for root in roots {
            for id in self.descendants(root) {
                if !doomed.contains(&id) {
                    doomed.push(id);
                }
            }
        }
        let doomed_set: HashSet<&str> = doomed.iter().map(String::as_str).collect();
        self.nodes.retain(|node| !doomed_set.contains(node.id.as_str()));

        let mut outcome = MutationOutcome {
            removed: doomed.clone(),
            ..MutationOutcome::default()
        };
        // An essential folder can only end up below a deleted node in an
        // unrepaired collection; put it back where it belongs.
        let report = reconcile(&mut self.nodes);
        outcome.removed.retain(|id| !report.restored.contains(id));
        outcome.updated.extend(report.restored);
        self.reindex();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{HierarchyAnomaly, build_hierarchy};
    use crate::model::{ESSENTIAL_IDS, NodeKind, SAVED_ID, WELCOME_ID};
    use proptest::prelude::*;

    fn note(id: &str) -> ContentNode {
        ContentNode::with_id(id, NodeKind::Note, id)
    }

    fn folder(id: &str) -> ContentNode {
        ContentNode::with_id(id, NodeKind::Folder, id)
    }

    fn child_ids(store: &ContentStore, parent: &str) -> Vec<String> {
        store
            .children_of(parent)
            .into_iter()
            .map(|node| node.id.clone())
            .collect()
    }

    fn orders(store: &ContentStore, parent: &str) -> Vec<f64> {
        store
            .children_of(parent)
            .into_iter()
            .map(|node| node.order)
            .collect()
    }

    #[test]
    fn test_insert_at_front_of_root_shifts_essentials() {
        let mut store = ContentStore::from_seed();
        let before = store.revision();
        let outcome = store.insert(note("x"), Some(ROOT_ID), Some(0)).unwrap();
        assert_eq!(child_ids(&store, ROOT_ID), ["x", SAVED_ID, WELCOME_ID, TRASH_ID]);
        assert_eq!(orders(&store, ROOT_ID), [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(outcome.inserted, ["x"]);
        assert_eq!(outcome.updated, [SAVED_ID, WELCOME_ID, TRASH_ID]);
        assert!(store.revision() > before);
    }

    #[test]
    fn test_insert_without_index_appends() {
        let mut store = ContentStore::from_seed();
        store.insert(note("a"), Some(SAVED_ID), None).unwrap();
        store.insert(note("b"), Some(SAVED_ID), None).unwrap();
        store.insert(note("c"), Some(SAVED_ID), Some(1)).unwrap();
        assert_eq!(child_ids(&store, SAVED_ID), ["a", "c", "b"]);
        assert_eq!(orders(&store, SAVED_ID), [0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_insert_normalizes_tied_orders_first() {
        let mut nodes = default_seed();
        for id in ["a", "b", "c"] {
            let mut node = note(id);
            node.parent_id = Some(SAVED_ID.to_string());
            nodes.push(node);
        }
        let mut store = ContentStore::from_nodes_unchecked(nodes);
        store.insert(note("x"), Some(SAVED_ID), Some(1)).unwrap();
        assert_eq!(child_ids(&store, SAVED_ID), ["a", "x", "b", "c"]);
        assert_eq!(orders(&store, SAVED_ID), [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_insert_existing_id_moves_in_place() {
        let mut store = ContentStore::from_seed();
        store.insert(note("a"), Some(SAVED_ID), None).unwrap();
        let count = store.len();
        store.insert(note("a"), Some(WELCOME_ID), None).unwrap();
        assert_eq!(store.len(), count);
        assert_eq!(store.get("a").unwrap().parent(), Some(WELCOME_ID));
    }

    #[test]
    fn test_insert_under_missing_parent_is_accepted() {
        let mut store = ContentStore::from_seed();
        store.insert(note("child"), Some("later"), None).unwrap();
        assert!(store.contains("child"));
        // The parent arriving afterwards cannot close a loop through the child.
        assert!(matches!(
            store.insert(folder("later"), Some("child"), None),
            Err(StoreError::WouldCreateCycle { .. })
        ));
        store.insert(folder("later"), Some(SAVED_ID), None).unwrap();
        assert_eq!(child_ids(&store, "later"), ["child"]);
    }

    #[test]
    fn test_insert_rejects_empty_id_and_parented_root() {
        let mut store = ContentStore::from_nodes_unchecked(Vec::new());
        assert_eq!(store.insert(note(" "), None, None), Err(StoreError::InvalidId));
        assert_eq!(
            store.insert(folder(ROOT_ID), Some(SAVED_ID), None),
            Err(StoreError::RootCannotBeChild)
        );
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let mut store = ContentStore::from_seed();
        store.insert(folder("a"), Some(SAVED_ID), None).unwrap();
        store.insert(folder("b"), Some("a"), None).unwrap();
        let revision = store.revision();
        assert!(matches!(
            store.move_node("a", Some("b"), None),
            Err(StoreError::WouldCreateCycle { .. })
        ));
        assert!(matches!(
            store.move_node("a", Some("a"), None),
            Err(StoreError::WouldCreateCycle { .. })
        ));
        assert_eq!(store.revision(), revision);
        assert_eq!(store.get("a").unwrap().parent(), Some(SAVED_ID));
    }

    #[test]
    fn test_essential_nodes_are_protected() {
        let mut store = ContentStore::from_seed();
        assert_eq!(
            store.move_node(TRASH_ID, Some(SAVED_ID), None),
            Err(StoreError::EssentialNode(TRASH_ID.to_string()))
        );
        assert_eq!(
            store.delete_subtree(SAVED_ID),
            Err(StoreError::EssentialNode(SAVED_ID.to_string()))
        );
        assert_eq!(store.move_to_trash(ROOT_ID), Err(StoreError::RootCannotBeChild));
        assert_eq!(
            store.update(WELCOME_ID, &NodePatch {
                parent_id: Some(SAVED_ID.to_string()),
                ..NodePatch::default()
            }),
            Err(StoreError::EssentialNode(WELCOME_ID.to_string()))
        );
        // Renaming is not structural.
        store.update(WELCOME_ID, &NodePatch::title("Hello")).unwrap();
        assert_eq!(store.get(WELCOME_ID).unwrap().title, "Hello");
    }

    #[test]
    fn test_move_within_parent_renumbers_group() {
        let mut store = ContentStore::from_seed();
        for id in ["a", "b", "c"] {
            store.insert(note(id), Some(SAVED_ID), None).unwrap();
        }
        store.move_node("c", Some(SAVED_ID), Some(0)).unwrap();
        assert_eq!(child_ids(&store, SAVED_ID), ["c", "a", "b"]);
        assert_eq!(orders(&store, SAVED_ID), [0.0, 1.0, 2.0]);
        store.move_node("c", Some(SAVED_ID), None).unwrap();
        assert_eq!(child_ids(&store, SAVED_ID), ["a", "b", "c"]);
    }

    #[test]
    fn test_move_across_parents_keeps_identity() {
        let mut store = ContentStore::from_seed();
        store.insert(note("a"), Some(SAVED_ID), None).unwrap();
        store.insert(note("w"), Some(WELCOME_ID), None).unwrap();
        let created = store.get("a").unwrap().created_at;
        store.move_node("a", Some(WELCOME_ID), Some(0)).unwrap();
        assert_eq!(child_ids(&store, WELCOME_ID), ["a", "w"]);
        assert!(child_ids(&store, SAVED_ID).is_empty());
        assert_eq!(store.get("a").unwrap().created_at, created);
    }

    #[test]
    fn test_update_reparent_is_validated_like_move() {
        let mut store = ContentStore::from_seed();
        store.insert(folder("a"), Some(SAVED_ID), None).unwrap();
        store.insert(folder("b"), Some("a"), None).unwrap();
        let patch = NodePatch {
            parent_id: Some("b".to_string()),
            ..NodePatch::default()
        };
        assert!(matches!(
            store.update("a", &patch),
            Err(StoreError::WouldCreateCycle { .. })
        ));
        let patch = NodePatch {
            parent_id: Some(WELCOME_ID.to_string()),
            title: Some("moved".to_string()),
            ..NodePatch::default()
        };
        let outcome = store.update("b", &patch).unwrap();
        assert_eq!(outcome.updated, ["b"]);
        let b = store.get("b").unwrap();
        assert_eq!(b.parent(), Some(WELCOME_ID));
        assert_eq!(b.title, "moved");
    }

    #[test]
    fn test_bulk_update_skips_missing_and_bumps_once() {
        let mut store = ContentStore::from_seed();
        store.insert(note("a"), Some(SAVED_ID), None).unwrap();
        store.insert(note("b"), Some(SAVED_ID), None).unwrap();
        let revision = store.revision();
        let ids = vec!["a".to_string(), "ghost".to_string(), "b".to_string()];
        let outcome = store.bulk_update(&ids, &NodePatch {
            rating: Some(5.0),
            ..NodePatch::default()
        });
        assert_eq!(outcome.updated, ["a", "b"]);
        assert_eq!(store.revision(), revision + 1);
        assert_eq!(store.get("b").unwrap().rating, Some(5.0));
    }

    #[test]
    fn test_delete_subtree_removes_descendants_only() {
        let mut store = ContentStore::from_seed();
        store.insert(folder("a"), Some(SAVED_ID), None).unwrap();
        store.insert(folder("b"), Some("a"), None).unwrap();
        store.insert(note("c"), Some("b"), None).unwrap();
        store.insert(note("keep"), Some(SAVED_ID), None).unwrap();
        let outcome = store.delete_subtree("a").unwrap();
        assert_eq!(outcome.removed, ["a", "b", "c"]);
        assert!(!store.contains("c"));
        assert!(store.contains("keep"));
        assert_eq!(store.len(), 5);
        assert_eq!(store.delete_subtree("a"), Err(StoreError::NotFound("a".to_string())));
    }

    #[test]
    fn test_trash_round_trip() {
        let mut store = ContentStore::from_seed();
        store.insert(folder("a"), Some(SAVED_ID), None).unwrap();
        store.insert(note("b"), Some("a"), None).unwrap();
        store.insert(note("c"), Some(SAVED_ID), None).unwrap();
        store.move_to_trash("a").unwrap();
        store.move_to_trash("c").unwrap();
        assert_eq!(child_ids(&store, TRASH_ID), ["c", "a"]);
        let outcome = store.empty_trash();
        assert_eq!(outcome.removed.len(), 3);
        assert!(child_ids(&store, TRASH_ID).is_empty());
        assert!(store.contains(TRASH_ID));
        assert!(store.empty_trash().is_empty());
    }

    #[test]
    fn test_duplicate_subtree_uses_fresh_ids() {
        let mut store = ContentStore::from_seed();
        store.insert(folder("a"), Some(SAVED_ID), None).unwrap();
        store.insert(note("b"), Some("a"), None).unwrap();
        let (copy, outcome) = store.duplicate_subtree("a", Some(WELCOME_ID), None).unwrap();
        assert_ne!(copy, "a");
        assert_eq!(outcome.inserted.len(), 2);
        assert_eq!(store.get(&copy).unwrap().parent(), Some(WELCOME_ID));
        let copied_children = child_ids(&store, &copy);
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children[0], "b");
        assert_eq!(child_ids(&store, "a"), ["b"]);
    }

    #[test]
    fn test_from_nodes_repairs_and_reports() {
        let mut nodes: Vec<ContentNode> = default_seed()
            .into_iter()
            .filter(|node| node.id != TRASH_ID)
            .collect();
        let mut a = note("a");
        a.parent_id = Some("b".to_string());
        let mut b = note("b");
        b.parent_id = Some("a".to_string());
        nodes.extend([a, b]);
        let (store, report) = ContentStore::from_nodes(nodes);
        assert_eq!(report.restored, [TRASH_ID]);
        assert_eq!(report.cycles_broken.len(), 1);
        assert!(store.contains(TRASH_ID));
        let hierarchy = build_hierarchy(store.nodes());
        assert!(
            !hierarchy
                .anomalies()
                .iter()
                .any(|anomaly| matches!(anomaly, HierarchyAnomaly::Cycle { .. }))
        );
    }

    #[test]
    fn test_ensure_essentials_bumps_only_on_repair() {
        let mut store = ContentStore::from_seed();
        let revision = store.revision();
        assert!(store.ensure_essentials().is_clean());
        assert_eq!(store.revision(), revision);

        let mut store = ContentStore::from_nodes_unchecked(Vec::new());
        let report = store.ensure_essentials();
        assert_eq!(report.restored.len(), ESSENTIAL_IDS.len());
        assert_eq!(store.revision(), revision + 1);
    }

    const POOL: [&str; 9] = [ROOT_ID, SAVED_ID, TRASH_ID, "n0", "n1", "n2", "n3", "n4", "n5"];

    fn chain_terminates(store: &ContentStore, id: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(id.to_string());
        while let Some(cur) = current {
            if !seen.insert(cur.clone()) {
                return false;
            }
            current = store.get(&cur).and_then(|node| node.parent_id.clone());
        }
        true
    }

    proptest! {
        #[test]
        fn prop_random_mutations_keep_tree_acyclic(
            ops in prop::collection::vec((0u8..4, 0usize..6, 0usize..POOL.len(), prop::option::of(0usize..5)), 0..60)
        ) {
            let mut store = ContentStore::from_seed();
            for (op, a, b, index) in ops {
                let id = format!("n{a}");
                let target = POOL[b];
                let _ = match op {
                    0 => store.insert(folder(&id), Some(target), index),
                    1 => store.move_node(&id, Some(target), index),
                    2 => store.delete_subtree(&id),
                    _ => store.move_to_trash(&id),
                };
            }
            for node in store.nodes() {
                prop_assert!(chain_terminates(&store, &node.id));
            }
            for id in ESSENTIAL_IDS {
                prop_assert!(store.contains(id));
            }
            prop_assert!(store.get(ROOT_ID).unwrap().parent_id.is_none());
        }

        #[test]
        fn prop_delete_leaves_no_dangling_descendants(
            parents in prop::collection::vec(0usize..8, 1..12),
            victim in 0usize..12
        ) {
            let mut store = ContentStore::from_seed();
            for (i, parent) in parents.iter().enumerate() {
                let parent_id = if *parent < i { format!("n{parent}") } else { SAVED_ID.to_string() };
                store.insert(folder(&format!("n{i}")), Some(&parent_id), None).unwrap();
            }
            let victim = format!("n{}", victim % parents.len());
            let subtree = store.descendants(&victim);
            let survivors: Vec<String> = store
                .nodes()
                .iter()
                .map(|node| node.id.clone())
                .filter(|id| !subtree.contains(id))
                .collect();
            let before_len = store.len();

            let outcome = store.delete_subtree(&victim).unwrap();
            prop_assert_eq!(store.len(), before_len - subtree.len());
            prop_assert_eq!(outcome.removed.len(), subtree.len());
            for id in &subtree {
                prop_assert!(!store.contains(id));
            }
            for id in &survivors {
                prop_assert!(store.contains(id));
            }
            for node in store.nodes() {
                prop_assert!(!store.is_within(&victim, &node.id));
                if let Some(parent) = node.parent() {
                    prop_assert!(!outcome.removed.iter().any(|id| id == parent));
                }
            }
        }
    }
}
