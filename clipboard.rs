/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! In-app copy/cut/paste of content subtrees.

use dashshell_core::{ContentStore, MutationOutcome, StoreError, is_essential};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardMode {
    Copy,
    Cut,
}

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    ids: Vec<String>,
    mode: Option<ClipboardMode>,
}

/// Result of one paste.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteOutcome {
    /// Ids of the pasted roots, in paste order.
    pub pasted: Vec<String>,
    pub mutation: MutationOutcome,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<ClipboardMode> {
        self.mode
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn copy(&mut self, ids: &[String]) {
        self.capture(ids, ClipboardMode::Copy);
    }

    /// Cut marks ids for a move on paste. Essential folders cannot be cut.
    pub fn cut(&mut self, ids: &[String]) {
        let movable: Vec<String> = ids.iter().filter(|id| !is_essential(id)).cloned().collect();
        self.capture(&movable, ClipboardMode::Cut);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.mode = None;
    }

    /// Paste into `target`, appending at the end of its children.
    ///
    /// Copies duplicate each subtree with fresh ids. Cuts move the nodes and
    /// then clear the clipboard. Ids that vanished since capture, or whose
    /// move would create a cycle, are skipped.
    pub fn paste(&mut self, store: &mut ContentStore, target: &str) -> PasteOutcome {
        let mut outcome = PasteOutcome::default();
        let Some(mode) = self.mode else {
            return outcome;
        };
        for id in &self.ids {
            if !store.contains(id) {
                log::debug!("clipboard: {id} no longer exists, skipped");
                continue;
            }
            let result = match mode {
                ClipboardMode::Copy => store.duplicate_subtree(id, Some(target), None),
                ClipboardMode::Cut => store
                    .move_node(id, Some(target), None)
                    .map(|mutation| (id.clone(), mutation)),
            };
            match result {
                Ok((pasted, mutation)) => {
                    outcome.pasted.push(pasted);
                    outcome.mutation.merge(mutation);
                },
                Err(error) => log_skip(id, &error),
            }
        }
        if mode == ClipboardMode::Cut {
            self.clear();
        }
        outcome
    }

    fn capture(&mut self, ids: &[String], mode: ClipboardMode) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(id) {
                self.ids.push(id.clone());
            }
        }
        self.mode = (!self.ids.is_empty()).then_some(mode);
    }
}

fn log_skip(id: &str, error: &StoreError) {
    log::debug!("clipboard: paste of {id} skipped: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashshell_core::{ContentNode, NodeKind, ROOT_ID, SAVED_ID, WELCOME_ID};

    fn store_with_folder() -> ContentStore {
        let mut store = ContentStore::from_seed();
        store
            .insert(ContentNode::with_id("f", NodeKind::Folder, "F"), Some(SAVED_ID), None)
            .unwrap();
        store
            .insert(ContentNode::with_id("leaf", NodeKind::Note, "L"), Some("f"), None)
            .unwrap();
        store
    }

    #[test]
    fn test_copy_paste_duplicates_subtree() {
        let mut store = store_with_folder();
        let before = store.len();
        let mut clipboard = Clipboard::new();
        clipboard.copy(&["f".to_string()]);
        let outcome = clipboard.paste(&mut store, ROOT_ID);
        assert_eq!(outcome.pasted.len(), 1);
        assert_ne!(outcome.pasted[0], "f");
        assert_eq!(store.len(), before + 2);
        assert_eq!(outcome.mutation.inserted.len(), 2);
        assert_eq!(store.children_of(&outcome.pasted[0]).len(), 1);
        assert_eq!(clipboard.mode(), Some(ClipboardMode::Copy));
    }

    #[test]
    fn test_cut_paste_moves_and_clears() {
        let mut store = store_with_folder();
        let mut clipboard = Clipboard::new();
        clipboard.cut(&["f".to_string(), WELCOME_ID.to_string()]);
        assert_eq!(clipboard.ids(), ["f".to_string()].as_slice());
        let outcome = clipboard.paste(&mut store, ROOT_ID);
        assert_eq!(outcome.pasted, vec!["f".to_string()]);
        assert_eq!(store.get("f").unwrap().parent(), Some(ROOT_ID));
        assert!(clipboard.is_empty());
    }

    #[test]
    fn test_paste_skips_missing_and_cyclic_targets() {
        let mut store = store_with_folder();
        let mut clipboard = Clipboard::new();
        clipboard.cut(&["gone".to_string(), "f".to_string()]);
        let outcome = clipboard.paste(&mut store, "leaf");
        assert!(outcome.pasted.is_empty());
        assert_eq!(store.get("f").unwrap().parent(), Some(SAVED_ID));
    }
}
