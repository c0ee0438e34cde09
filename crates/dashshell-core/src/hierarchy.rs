/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Hierarchy builder: derives ordered children and rolled-up statistics from
//! the flat node collection.
//!
//! The builder is a pure function of its input. Malformed input (missing
//! root, cycles, dangling parents, duplicate ids) is logged and recorded as
//! [`HierarchyAnomaly`] values, and the output is still a best-effort tree:
//! nodes on a cycle or under a missing parent are treated as top-level.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::model::{ContentNode, ROOT_ID};
use crate::store::ContentStore;

/// Rolled-up numbers for one node's transitive subtree (self excluded).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeStats {
    /// Every node reachable below this one.
    pub item_count: usize,
    /// Direct children only.
    pub child_count: usize,
    pub container_count: usize,
    pub leaf_count: usize,
    /// Descendants that carry a rating.
    pub rated_count: usize,
    rating_sum: f64,
    /// Distance from the nearest top-level ancestor.
    pub depth: usize,
}

impl NodeStats {
    /// Mean rating over rated descendants.
    pub fn aggregate_rating(&self) -> Option<f64> {
        (self.rated_count > 0).then(|| self.rating_sum / self.rated_count as f64)
    }
}

/// Derived view of one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HierarchyEntry {
    /// Children ordered by stored `order`, ties kept in input order.
    pub children: Vec<String>,
    /// Parent as actually used by the tree (after cycle/orphan healing).
    pub parent: Option<String>,
    pub stats: NodeStats,
    /// True when the stored parent is missing or the link was cut to break a cycle.
    pub orphan: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyAnomaly {
    MissingRoot,
    DuplicateId { id: String },
    Cycle { node_id: String },
    Orphan { node_id: String, missing_parent: String },
}

/// Output of [`build_hierarchy`].
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    entries: HashMap<String, HierarchyEntry>,
    top_level: Vec<String>,
    anomalies: Vec<HierarchyAnomaly>,
}

impl Hierarchy {
    pub fn entry(&self, id: &str) -> Option<&HierarchyEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn children(&self, id: &str) -> &[String] {
        self.entries
            .get(id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats(&self, id: &str) -> NodeStats {
        self.entries
            .get(id)
            .map(|entry| entry.stats)
            .unwrap_or_default()
    }

    pub fn item_count(&self, id: &str) -> usize {
        self.stats(id).item_count
    }

    /// The root (when present) and every other parentless or orphaned node,
    /// in input order.
    pub fn top_level(&self) -> &[String] {
        &self.top_level
    }

    /// Top-level nodes other than the root: displayed alongside root's children.
    pub fn detached(&self) -> impl Iterator<Item = &String> + '_ {
        self.top_level.iter().filter(|id| id.as_str() != ROOT_ID)
    }

    pub fn is_orphan(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(|entry| entry.orphan)
    }

    pub fn anomalies(&self) -> &[HierarchyAnomaly] {
        &self.anomalies
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids from the top-level ancestor down to `id` (inclusive).
    pub fn path_to(&self, id: &str) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.entries.get(id).map(|_| id.to_string());
        while let Some(node_id) = current {
            current = self
                .entries
                .get(&node_id)
                .and_then(|entry| entry.parent.clone());
            path.push(node_id);
            if path.len() > self.entries.len() {
                break;
            }
        }
        path.reverse();
        path
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Ids whose parent link closes a cycle, in input order.
///
/// Cutting exactly these links leaves an acyclic forest.
pub(crate) fn cycle_breaks(nodes: &[ContentNode]) -> Vec<String> {
    let mut parents: HashMap<&str, Option<&str>> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        parents.entry(node.id.as_str()).or_insert(node.parent());
    }

    let mut state: HashMap<&str, Visit> = HashMap::with_capacity(nodes.len());
    let mut breaks = Vec::new();
    for node in nodes {
        if state.contains_key(node.id.as_str()) {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        let mut current = node.id.as_str();
        loop {
            match state.get(current) {
                Some(Visit::Done) => break,
                Some(Visit::InProgress) => {
                    if let Some(last) = path.last() {
                        breaks.push((*last).to_string());
                    }
                    break;
                },
                None => {},
            }
            state.insert(current, Visit::InProgress);
            path.push(current);
            match parents.get(current).copied().flatten() {
                Some(parent) if parents.contains_key(parent) => current = parent,
                _ => break,
            }
        }
        for id in path {
            state.insert(id, Visit::Done);
        }
    }
    breaks
}

/// Build ordered children and subtree statistics for every node.
pub fn build_hierarchy(nodes: &[ContentNode]) -> Hierarchy {
    let mut anomalies = Vec::new();

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut unique: Vec<&ContentNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if index.contains_key(node.id.as_str()) {
            anomalies.push(HierarchyAnomaly::DuplicateId {
                id: node.id.clone(),
            });
            continue;
        }
        index.insert(node.id.as_str(), unique.len());
        unique.push(node);
    }
    if !index.contains_key(ROOT_ID) {
        anomalies.push(HierarchyAnomaly::MissingRoot);
    }

    let broken: HashSet<String> = cycle_breaks(nodes).into_iter().collect();

    let mut parent_of: Vec<Option<usize>> = vec![None; unique.len()];
    let mut orphan = vec![false; unique.len()];
    for (position, node) in unique.iter().enumerate() {
        if node.id == ROOT_ID {
            continue;
        }
        let Some(parent_id) = node.parent() else {
            continue;
        };
        if broken.contains(&node.id) {
            anomalies.push(HierarchyAnomaly::Cycle {
                node_id: node.id.clone(),
            });
            orphan[position] = true;
            continue;
        }
        match index.get(parent_id) {
            Some(&parent) => parent_of[position] = Some(parent),
            None => {
                anomalies.push(HierarchyAnomaly::Orphan {
                    node_id: node.id.clone(),
                    missing_parent: parent_id.to_string(),
                });
                orphan[position] = true;
            },
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); unique.len()];
    let mut top_level = Vec::new();
    for (position, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(position),
            None => top_level.push(position),
        }
    }
    for list in &mut children {
        list.sort_by(|a, b| unique[*a].order.total_cmp(&unique[*b].order));
    }

    // Breadth-first from the top level; the healed parent links form a forest,
    // so this visits every node exactly once.
    let mut stats = vec![NodeStats::default(); unique.len()];
    let mut visit_order = Vec::with_capacity(unique.len());
    let mut queue: VecDeque<usize> = top_level.iter().copied().collect();
    while let Some(position) = queue.pop_front() {
        visit_order.push(position);
        for &child in &children[position] {
            stats[child].depth = stats[position].depth + 1;
            queue.push_back(child);
        }
    }
    for &position in visit_order.iter().rev() {
        let Some(parent) = parent_of[position] else {
            continue;
        };
        let child = stats[position];
        let node = unique[position];
        let parent_stats = &mut stats[parent];
        parent_stats.child_count += 1;
        parent_stats.item_count += 1 + child.item_count;
        parent_stats.container_count += child.container_count;
        parent_stats.leaf_count += child.leaf_count;
        if node.is_container() {
            parent_stats.container_count += 1;
        } else {
            parent_stats.leaf_count += 1;
        }
        parent_stats.rated_count += child.rated_count;
        parent_stats.rating_sum += child.rating_sum;
        if let Some(rating) = node.rating.filter(|r| r.is_finite()) {
            parent_stats.rated_count += 1;
            parent_stats.rating_sum += rating;
        }
    }

    for anomaly in &anomalies {
        log::warn!("hierarchy: healed anomaly {anomaly:?}");
    }

    let mut entries = HashMap::with_capacity(unique.len());
    for (position, node) in unique.iter().enumerate() {
        entries.insert(
            node.id.clone(),
            HierarchyEntry {
                children: children[position]
                    .iter()
                    .map(|child| unique[*child].id.clone())
                    .collect(),
                parent: parent_of[position].map(|parent| unique[parent].id.clone()),
                stats: stats[position],
                orphan: orphan[position],
            },
        );
    }

    Hierarchy {
        entries,
        top_level: top_level
            .into_iter()
            .map(|position| unique[position].id.clone())
            .collect(),
        anomalies,
    }
}

/// Memoized hierarchy keyed by the store revision.
#[derive(Debug, Default)]
pub struct HierarchyCache {
    built_for: Option<u64>,
    current: Arc<Hierarchy>,
}

impl HierarchyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hierarchy for the store's current revision, rebuilt only when stale.
    pub fn get(&mut self, store: &ContentStore) -> Arc<Hierarchy> {
        if self.built_for != Some(store.revision()) {
            self.current = Arc::new(build_hierarchy(store.nodes()));
            self.built_for = Some(store.revision());
        }
        Arc::clone(&self.current)
    }

    pub fn invalidate(&mut self) {
        self.built_for = None;
    }
}
