/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Linear back/forward history of visited view ids.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: Vec<String>,
    index: usize,
    max_entries: usize,
}

impl NavigationHistory {
    pub fn new(initial: impl Into<String>, max_entries: usize) -> Self {
        Self {
            entries: vec![initial.into()],
            index: 0,
            max_entries: max_entries.max(1),
        }
    }

    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Record a visit, discarding any forward entries. Revisiting the current
    /// entry is a no-op.
    pub fn push(&mut self, view_id: &str) -> bool {
        if self.current() == view_id {
            return false;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(view_id.to_string());
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(0..excess);
        }
        self.index = self.entries.len() - 1;
        true
    }

    /// Step back to the nearest earlier entry accepted by `exists` that shows
    /// a different view.
    pub fn back_where(&mut self, exists: impl Fn(&str) -> bool) -> Option<&str> {
        let current = self.current();
        let target = (0..self.index)
            .rev()
            .find(|&i| self.entries[i] != current && exists(&self.entries[i]))?;
        self.index = target;
        Some(self.current())
    }

    /// Step forward to the nearest later entry accepted by `exists` that
    /// shows a different view.
    pub fn forward_where(&mut self, exists: impl Fn(&str) -> bool) -> Option<&str> {
        let current = self.current();
        let target = (self.index + 1..self.entries.len())
            .find(|&i| self.entries[i] != current && exists(&self.entries[i]))?;
        self.index = target;
        Some(self.current())
    }

    /// Overwrite the current entry, folding it into a neighbour that already
    /// shows `view_id`.
    pub fn replace_current(&mut self, view_id: &str) {
        self.entries[self.index] = view_id.to_string();
        if self.entries.get(self.index + 1).is_some_and(|next| next == view_id) {
            self.entries.remove(self.index + 1);
        }
        if self.index > 0 && self.entries[self.index - 1] == view_id {
            self.entries.remove(self.index);
            self.index -= 1;
        }
    }
}
