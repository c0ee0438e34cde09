/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-tab undo/redo of view snapshots.
//!
//! Each checkpoint remembers the view active before a content mutation and
//! the view active once it settled. Undo and redo only move the active view
//! pointer; the mutation itself stays applied.

pub const MAX_UNDO_STEPS: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoCheckpoint {
    pub view_before: String,
    pub view_after: String,
    /// Store revision the mutation produced, when known.
    pub revision: Option<u64>,
}

/// `index` counts applied checkpoints: `entries[..index]` can be undone,
/// `entries[index..]` can be redone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoStack {
    entries: Vec<UndoCheckpoint>,
    index: usize,
    max_steps: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(MAX_UNDO_STEPS)
    }
}

impl UndoStack {
    pub fn new(max_steps: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
            max_steps: max_steps.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.entries.len()
    }

    /// Record the view in effect before a mutation. Discards the redo tail.
    pub fn capture_checkpoint(&mut self, view_before: &str) {
        self.entries.truncate(self.index);
        self.entries.push(UndoCheckpoint {
            view_before: view_before.to_string(),
            view_after: view_before.to_string(),
            revision: None,
        });
        if self.entries.len() > self.max_steps {
            let excess = self.entries.len() - self.max_steps;
            self.entries.drain(0..excess);
        }
        self.index = self.entries.len();
    }

    /// Fill in the post-mutation side of the newest checkpoint.
    pub fn settle(&mut self, view_after: &str, revision: u64) {
        if let Some(last) = self.index.checked_sub(1).and_then(|i| self.entries.get_mut(i)) {
            last.view_after = view_after.to_string();
            last.revision = Some(revision);
        }
    }

    /// Drop the newest checkpoint when its mutation turned out to be a no-op.
    pub fn discard_last(&mut self) {
        if self.index == self.entries.len() && self.index > 0 {
            self.entries.pop();
            self.index -= 1;
        }
    }

    /// Step back one checkpoint and return the view to restore.
    pub fn perform_undo(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.entries[self.index].view_before)
    }

    /// Step forward one checkpoint and return the view to restore.
    pub fn perform_redo(&mut self) -> Option<&str> {
        let entry = self.entries.get(self.index)?;
        self.index += 1;
        Some(&entry.view_after)
    }
}
