/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tab / navigation controller.
//!
//! Every tab is an independent cursor over the shared content tree with its
//! own back/forward history and its own undo stack. There is always at least
//! one open tab and exactly one active tab.

pub mod history;
pub mod undo;

use dashshell_core::ROOT_ID;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::HistoryConfig;
use history::NavigationHistory;
use undo::UndoStack;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabKind {
    #[default]
    Normal,
    NewTab,
    ItemViewer,
}

#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub kind: TabKind,
    history: NavigationHistory,
    undo: UndoStack,
}

impl Tab {
    fn new(view_id: &str, kind: TabKind, limits: HistoryConfig) -> Self {
        Self {
            id: TabId::new(),
            kind,
            history: NavigationHistory::new(view_id, limits.max_navigation_entries),
            undo: UndoStack::new(limits.max_undo_steps),
        }
    }

    pub fn active_view_id(&self) -> &str {
        self.history.current()
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }
}

/// A tab whose active view stopped resolving and was re-pointed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFallback {
    pub tab_id: TabId,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct TabController {
    tabs: Vec<Tab>,
    active: usize,
    limits: HistoryConfig,
}

impl Default for TabController {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl TabController {
    /// One normal tab on the root view.
    pub fn new(limits: HistoryConfig) -> Self {
        Self {
            tabs: vec![Tab::new(ROOT_ID, TabKind::Normal, limits)],
            active: 0,
            limits,
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn active_tab(&self) -> &Tab {
        &self.tabs[self.active]
    }

    fn active_tab_mut(&mut self) -> &mut Tab {
        &mut self.tabs[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_view_id(&self) -> &str {
        self.active_tab().active_view_id()
    }

    pub fn tab(&self, id: &TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| &tab.id == id)
    }

    fn position(&self, id: &TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| &tab.id == id)
    }

    /// Open a tab after the active one and focus it.
    pub fn open_tab(&mut self, view_id: &str, kind: TabKind) -> TabId {
        let tab = Tab::new(view_id, kind, self.limits);
        let id = tab.id.clone();
        self.active = (self.active + 1).min(self.tabs.len());
        self.tabs.insert(self.active, tab);
        id
    }

    /// Close a tab. Closing the active tab focuses its right neighbour (or
    /// the left one at the end); closing the last tab leaves a fresh root tab.
    pub fn close_tab(&mut self, id: &TabId) -> bool {
        let Some(pos) = self.position(id) else {
            log::debug!("tabs: close of unknown tab {id} ignored");
            return false;
        };
        self.tabs.remove(pos);
        if self.tabs.is_empty() {
            self.tabs.push(Tab::new(ROOT_ID, TabKind::Normal, self.limits));
            self.active = 0;
        } else if pos < self.active || self.active >= self.tabs.len() {
            self.active = self.active.saturating_sub(1).min(self.tabs.len() - 1);
        }
        true
    }

    pub fn switch_tab(&mut self, id: &TabId) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.active = pos;
                true
            },
            None => {
                log::debug!("tabs: switch to unknown tab {id} ignored");
                false
            },
        }
    }

    /// Move a tab within the tab strip, keeping the same tab active.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tabs.len() || to >= self.tabs.len() {
            return false;
        }
        if from == to {
            return true;
        }
        let active_id = self.active_tab().id.clone();
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        self.active = self.position(&active_id).unwrap_or(0);
        true
    }

    /// Navigate the active tab. Returns whether the active view changed.
    pub fn navigate(&mut self, view_id: &str) -> bool {
        self.active_tab_mut().history.push(view_id)
    }

    pub fn back(&mut self, exists: impl Fn(&str) -> bool) -> Option<String> {
        self.active_tab_mut()
            .history
            .back_where(exists)
            .map(str::to_string)
    }

    pub fn forward(&mut self, exists: impl Fn(&str) -> bool) -> Option<String> {
        self.active_tab_mut()
            .history
            .forward_where(exists)
            .map(str::to_string)
    }

    /// Record the active view before a content mutation.
    pub fn capture_checkpoint(&mut self) {
        let tab = self.active_tab_mut();
        let view = tab.history.current().to_string();
        tab.undo.capture_checkpoint(&view);
    }

    pub fn settle_checkpoint(&mut self, revision: u64) {
        let tab = self.active_tab_mut();
        let view = tab.history.current().to_string();
        tab.undo.settle(&view, revision);
    }

    pub fn discard_checkpoint(&mut self) {
        self.active_tab_mut().undo.discard_last();
    }

    /// Undo on the active tab: re-point to the pre-mutation view. A view that
    /// no longer exists resolves to the root.
    pub fn undo(&mut self, exists: impl Fn(&str) -> bool) -> Option<String> {
        let tab = self.active_tab_mut();
        let view = tab.undo.perform_undo()?.to_string();
        let view = if exists(&view) { view } else { ROOT_ID.to_string() };
        tab.history.push(&view);
        Some(view)
    }

    pub fn redo(&mut self, exists: impl Fn(&str) -> bool) -> Option<String> {
        let tab = self.active_tab_mut();
        let view = tab.undo.perform_redo()?.to_string();
        let view = if exists(&view) { view } else { ROOT_ID.to_string() };
        tab.history.push(&view);
        Some(view)
    }

    /// Re-point every tab whose active view no longer resolves to the root.
    pub fn validate(&mut self, exists: impl Fn(&str) -> bool) -> Vec<ViewFallback> {
        let mut fallbacks = Vec::new();
        for tab in &mut self.tabs {
            let current = tab.history.current();
            if current == ROOT_ID || exists(current) {
                continue;
            }
            let from = current.to_string();
            tab.history.replace_current(ROOT_ID);
            log::debug!("tabs: view {from} vanished, tab {} falls back to root", tab.id);
            fallbacks.push(ViewFallback {
                tab_id: tab.id.clone(),
                from,
                to: ROOT_ID.to_string(),
            });
        }
        fallbacks
    }
}
