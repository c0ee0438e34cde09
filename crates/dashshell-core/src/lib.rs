/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Portable dashboard kernel: the content tree, its repair pass, the derived
//! hierarchy, and view resolution. No I/O and no async runtime.

pub mod hierarchy;
pub mod model;
pub mod store;
pub mod view;

pub use hierarchy::{Hierarchy, HierarchyAnomaly, HierarchyCache, NodeStats, build_hierarchy};
pub use model::{
    ContainerSettings, ContentNode, ESSENTIAL_IDS, NodeKind, NodePatch, ROOT_ID, SAVED_ID,
    TRASH_ID, WELCOME_ID, is_essential,
};
pub use store::{ContentStore, MutationOutcome, RepairReport, StoreError};
pub use view::sort::{SortDirection, SortOption, SortSpec};
pub use view::{ResolvedView, resolve_view, resolve_view_sorted};
