/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use dashshell_core::{ContentStore, RepairReport};

use crate::diagnostics::ReseedReason;

/// Where a loaded store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    Reseeded(ReseedReason),
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub store: ContentStore,
    pub source: LoadSource,
    pub repair: RepairReport,
    /// Stored records that could not be decoded and were skipped.
    pub skipped_records: usize,
}

impl LoadOutcome {
    /// Whether the persisted copy differs from what was loaded and should be
    /// rewritten once.
    pub fn needs_write_back(&self) -> bool {
        self.source != LoadSource::Stored || !self.repair.is_clean() || self.skipped_records > 0
    }
}
