/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Static seed set: the essential folders and where they attach.

use super::{ContentNode, NodeKind, ROOT_ID, SAVED_ID, TRASH_ID, WELCOME_ID};

/// One required node and its fixed attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredNode {
    pub id: &'static str,
    pub parent_id: Option<&'static str>,
    pub title: &'static str,
    pub icon: &'static str,
    pub order: u32,
}

/// Required nodes in attachment order (parents before children).
pub const REQUIRED_NODES: [RequiredNode; 4] = [
    RequiredNode {
        id: ROOT_ID,
        parent_id: None,
        title: "Home",
        icon: "home",
        order: 0,
    },
    RequiredNode {
        id: SAVED_ID,
        parent_id: Some(ROOT_ID),
        title: "Saved",
        icon: "bookmark",
        order: 0,
    },
    RequiredNode {
        id: WELCOME_ID,
        parent_id: Some(ROOT_ID),
        title: "Welcome",
        icon: "sparkles",
        order: 1,
    },
    RequiredNode {
        id: TRASH_ID,
        parent_id: Some(ROOT_ID),
        title: "Trash",
        icon: "trash",
        order: 2,
    },
];

pub fn required_node(id: &str) -> Option<&'static RequiredNode> {
    REQUIRED_NODES.iter().find(|required| required.id == id)
}

impl RequiredNode {
    pub fn to_node(&self) -> ContentNode {
        let mut node = ContentNode::with_id(self.id, NodeKind::Folder, self.title);
        node.parent_id = self.parent_id.map(str::to_string);
        node.icon = Some(self.icon.to_string());
        node.order = f64::from(self.order);
        node
    }
}

/// Seed definition for one essential id.
pub fn seed_node(id: &str) -> Option<ContentNode> {
    required_node(id).map(RequiredNode::to_node)
}

/// The default collection used on first run or after a wiped store.
pub fn default_seed() -> Vec<ContentNode> {
    REQUIRED_NODES.iter().map(RequiredNode::to_node).collect()
}
