/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! View resolution: which node a tab shows and its sorted children.

use std::borrow::Cow;

use crate::hierarchy::Hierarchy;
use crate::model::seed::seed_node;
use crate::model::{ContentNode, ROOT_ID};
use crate::store::ContentStore;

pub mod sort;

use sort::{SortSpec, sort_nodes};

/// A resolved active view.
#[derive(Debug, Clone)]
pub struct ResolvedView<'a> {
    pub node: Cow<'a, ContentNode>,
    pub sorted_children: Vec<&'a ContentNode>,
    pub sort: SortSpec,
    /// True when the root was missing and the seed definition stood in.
    pub from_seed: bool,
}

impl ResolvedView<'_> {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn child_ids(&self) -> Vec<String> {
        self.sorted_children
            .iter()
            .map(|node| node.id.clone())
            .collect()
    }
}

/// Resolve `view_id` using the container's own sort choice.
pub fn resolve_view<'a>(
    view_id: &str,
    store: &'a ContentStore,
    hierarchy: &Hierarchy,
) -> Option<ResolvedView<'a>> {
    resolve_view_sorted(view_id, store, hierarchy, None)
}

/// Resolve `view_id`, optionally overriding the container's sort choice.
///
/// A missing root falls back to the seed definition. Any other missing id
/// yields `None` and the caller keeps its previous valid view.
pub fn resolve_view_sorted<'a>(
    view_id: &str,
    store: &'a ContentStore,
    hierarchy: &Hierarchy,
    sort_override: Option<SortSpec>,
) -> Option<ResolvedView<'a>> {
    let (node, from_seed) = match store.get(view_id) {
        Some(node) => (Cow::Borrowed(node), false),
        None if view_id == ROOT_ID => {
            log::warn!("view: root missing from store, resolving from seed");
            (Cow::Owned(seed_node(ROOT_ID)?), true)
        },
        None => return None,
    };

    let mut children: Vec<&ContentNode> = hierarchy
        .children(view_id)
        .iter()
        .filter_map(|id| store.get(id))
        .collect();
    if view_id == ROOT_ID {
        // Orphans and parentless nodes are shown at the top of the tree.
        children.extend(hierarchy.detached().filter_map(|id| store.get(id)));
    }

    let sort = sort_override.unwrap_or_else(|| SortSpec::for_container(&node));
    sort_nodes(&mut children, sort, hierarchy);

    Some(ResolvedView {
        node,
        sorted_children: children,
        sort,
        from_seed,
    })
}
