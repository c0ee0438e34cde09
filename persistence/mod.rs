/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Persistence at rest: the whole node list as JSON under one key.
//!
//! The backing store is a string-keyed byte map. `RedbKeyValueStore` keeps it
//! in a single redb table; `MemoryKeyValueStore` is shared in-process and
//! stands in for browser-local storage in tests and multi-tab setups.

pub mod types;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dashshell_core::{ContentNode, ContentStore};
use log::warn;
use parking_lot::Mutex;
use redb::{ReadableDatabase, ReadableTable};
pub use types::{LoadOutcome, LoadSource};

use crate::diagnostics::{self, DiagnosticEvent, ReseedReason};

const ITEMS_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("items");
const DATABASE_FILE: &str = "dashboard.redb";

/// Errors from the key/value backend
#[derive(Debug)]
pub enum PersistenceError {
    Io(String),
    Redb(String),
    Serde(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "IO error: {e}"),
            PersistenceError::Redb(e) => write!(f, "Redb error: {e}"),
            PersistenceError::Serde(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

pub struct RedbKeyValueStore {
    db: redb::Database,
}

impl RedbKeyValueStore {
    /// Open or create the database file inside `base_dir`.
    pub fn open(base_dir: &Path) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(base_dir)
            .map_err(|e| PersistenceError::Io(format!("Failed to create dir: {e}")))?;
        let db = redb::Database::create(base_dir.join(DATABASE_FILE))
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        Ok(Self { db })
    }
}

impl KeyValueStore for RedbKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let table = match read_txn.open_table(ITEMS_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(PersistenceError::Redb(format!("{e}"))),
        };
        let entry = table
            .get(key)
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        Ok(entry.map(|value| value.value().to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        {
            let mut table = write_txn
                .open_table(ITEMS_TABLE)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
            table
                .insert(key, value)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        {
            let mut table = write_txn
                .open_table(ITEMS_TABLE)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
            table
                .remove(key)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Loads and saves the node list under one key.
#[derive(Clone)]
pub struct ItemsRepository {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl ItemsRepository {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored collection.
    ///
    /// Absent, empty, or undecodable data reseeds from the default set.
    /// Individual records that fail to decode are skipped. The result is
    /// always repaired before it is returned.
    pub fn load(&self) -> Result<LoadOutcome, PersistenceError> {
        let Some(bytes) = self.backend.get(&self.key)? else {
            return Ok(Self::reseeded(ReseedReason::Absent));
        };
        let records: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(e) => {
                warn!("persistence: stored items under {} are malformed: {e}", self.key);
                return Ok(Self::reseeded(ReseedReason::Malformed));
            },
        };
        if records.is_empty() {
            return Ok(Self::reseeded(ReseedReason::Empty));
        }

        let total = records.len();
        let nodes: Vec<ContentNode> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!("persistence: skipping undecodable record: {e}");
                    None
                },
            })
            .collect();
        let skipped_records = total - nodes.len();
        if nodes.is_empty() {
            return Ok(Self::reseeded(ReseedReason::Malformed));
        }

        let (store, repair) = ContentStore::from_nodes(nodes);
        diagnostics::emit_repair_report(&repair);
        Ok(LoadOutcome {
            store,
            source: LoadSource::Stored,
            repair,
            skipped_records,
        })
    }

    /// Load, and write back once if the stored copy needed repair.
    pub fn load_and_heal(&self) -> Result<LoadOutcome, PersistenceError> {
        let outcome = self.load()?;
        if outcome.needs_write_back() {
            self.save(&outcome.store)?;
        }
        Ok(outcome)
    }

    pub fn save(&self, store: &ContentStore) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(store.nodes())
            .map_err(|e| PersistenceError::Serde(format!("{e}")))?;
        self.backend.put(&self.key, &bytes)
    }

    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.backend.remove(&self.key)
    }

    fn reseeded(reason: ReseedReason) -> LoadOutcome {
        log::info!("persistence: reseeding items ({reason:?})");
        diagnostics::emit_event(DiagnosticEvent::StoreReseeded { reason });
        LoadOutcome {
            store: ContentStore::from_seed(),
            source: LoadSource::Reseeded(reason),
            repair: Default::default(),
            skipped_records: 0,
        }
    }
}
