/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Reconciliation pass over a flat node collection.
//!
//! Runs once at load and again after any operation that could orphan a
//! required node. Repairs, in order:
//! 1. duplicate ids (first occurrence wins)
//! 2. missing or misattached essential folders, from the seed table
//! 3. parent links that close a cycle (the node becomes top-level)
//! 4. zero grid spans (normalized to 1)
//!
//! Non-essential nodes are otherwise left untouched.

use std::collections::HashSet;

use crate::hierarchy::cycle_breaks;
use crate::model::ContentNode;
use crate::model::seed::REQUIRED_NODES;

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub duplicates_dropped: Vec<String>,
    pub restored: Vec<String>,
    pub reattached: Vec<String>,
    pub cycles_broken: Vec<String>,
    pub spans_normalized: Vec<String>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates_dropped.is_empty()
            && self.restored.is_empty()
            && self.reattached.is_empty()
            && self.cycles_broken.is_empty()
            && self.spans_normalized.is_empty()
    }

    /// Whether the structure (not just cosmetic fields) changed.
    pub fn is_structural(&self) -> bool {
        !(self.duplicates_dropped.is_empty()
            && self.restored.is_empty()
            && self.reattached.is_empty()
            && self.cycles_broken.is_empty())
    }
}

/// Repair `nodes` in place.
pub fn reconcile(nodes: &mut Vec<ContentNode>) -> RepairReport {
    let mut report = RepairReport::default();

    let mut seen = HashSet::with_capacity(nodes.len());
    nodes.retain(|node| {
        if seen.insert(node.id.clone()) {
            true
        } else {
            report.duplicates_dropped.push(node.id.clone());
            false
        }
    });

    for required in &REQUIRED_NODES {
        match nodes.iter_mut().find(|node| node.id == required.id) {
            Some(node) => {
                let expected = required.parent_id;
                if node.parent() != expected {
                    node.parent_id = expected.map(str::to_string);
                    node.touch();
                    report.reattached.push(node.id.clone());
                }
            },
            None => {
                nodes.push(required.to_node());
                report.restored.push(required.id.to_string());
            },
        }
    }

    for id in cycle_breaks(nodes) {
        if let Some(node) = nodes.iter_mut().find(|node| node.id == id) {
            node.parent_id = None;
            node.touch();
            report.cycles_broken.push(id);
        }
    }

    // Legacy records may carry zero spans. Wider spans are user choices.
    for node in nodes.iter_mut() {
        if node.grid_span_col == 0 || node.grid_span_row == 0 {
            node.grid_span_col = node.grid_span_col.max(1);
            node.grid_span_row = node.grid_span_row.max(1);
            report.spans_normalized.push(node.id.clone());
        }
    }

    if !report.is_clean() {
        log::warn!(
            "reconcile: dropped {} duplicate(s), restored {:?}, reattached {:?}, broke cycles at {:?}",
            report.duplicates_dropped.len(),
            report.restored,
            report.reattached,
            report.cycles_broken
        );
    }
    report
}
