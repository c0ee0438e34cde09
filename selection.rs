/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionUpdateMode {
    Replace,
    Add,
    Toggle,
}

/// Ordered, de-duplicated set of selected node ids.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: HashSet<String>,
    order: Vec<String>,
    revision: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic revision incremented whenever the selection changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Most recently selected id.
    pub fn primary(&self) -> Option<&str> {
        self.order.last().map(String::as_str)
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn select(&mut self, id: &str, multi_select: bool) {
        let mode = if multi_select {
            SelectionUpdateMode::Toggle
        } else {
            SelectionUpdateMode::Replace
        };
        self.update_many(vec![id.to_string()], mode);
    }

    pub fn clear(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.ids.clear();
        self.order.clear();
        self.bump();
    }

    pub fn update_many(&mut self, ids: Vec<String>, mode: SelectionUpdateMode) {
        let mut changed = false;
        match mode {
            SelectionUpdateMode::Replace => {
                changed = !self.order.is_empty() || !ids.is_empty();
                self.ids.clear();
                self.order.clear();
                for id in ids {
                    self.push(id);
                }
            },
            SelectionUpdateMode::Add => {
                for id in ids {
                    changed |= self.push(id);
                }
            },
            SelectionUpdateMode::Toggle => {
                for id in ids {
                    if self.ids.remove(&id) {
                        self.order.retain(|existing| existing != &id);
                    } else {
                        self.push(id);
                    }
                    changed = true;
                }
            },
        }
        if changed {
            self.bump();
        }
    }

    /// Drop ids that no longer resolve. Returns how many were removed.
    pub fn retain_existing(&mut self, exists: impl Fn(&str) -> bool) -> usize {
        let before = self.order.len();
        self.order.retain(|id| exists(id));
        if self.order.len() == before {
            return 0;
        }
        self.ids = self.order.iter().cloned().collect();
        self.bump();
        before - self.order.len()
    }

    fn push(&mut self, id: String) -> bool {
        if self.ids.insert(id.clone()) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    fn bump(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }
}
