/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Best-effort remote mirror.
//!
//! Local mutations become `MirrorOp`s in an outbox channel. A worker task
//! drains the outbox against a `RemoteMirror`, after the local state has
//! already been updated and persisted. Nothing here can fail a local
//! operation: failures are either swallowed or surfaced as notices.

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use dashshell_core::{ContentNode, ContentStore, MutationOutcome};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{DiagnosticEvent, emit_event};

const RETRY_MIN_DELAY: Duration = Duration::from_millis(50);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);
const MAX_TRANSPORT_RETRIES: usize = 3;

/// Fields promoted to top-level columns of the remote record. Everything
/// else a node carries goes into `metadata`.
const RECORD_COLUMNS: [&str; 9] = [
    "id", "parentId", "type", "title", "content", "url", "icon", "styles", "order",
];

/// Remote row shape, keyed by node id and scoped by user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub styles: Option<Value>,
    pub order: f64,
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl RemoteRecord {
    pub fn from_node(node: &ContentNode, user_id: Option<&str>) -> Self {
        let metadata = match serde_json::to_value(node) {
            Ok(Value::Object(mut fields)) => {
                for column in RECORD_COLUMNS {
                    fields.remove(column);
                }
                fields
            },
            _ => Map::new(),
        };
        Self {
            id: node.id.clone(),
            parent_id: node.parent_id.clone(),
            kind: node.kind.as_str().to_string(),
            title: node.title.clone(),
            content: node.content.clone(),
            url: node.url.clone(),
            icon: node.icon.clone(),
            styles: node.styles.clone(),
            order: node.order,
            metadata,
            user_id: user_id.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MirrorOp {
    Insert(RemoteRecord),
    Update(RemoteRecord),
    Delete { id: String, user_id: Option<String> },
}

impl MirrorOp {
    pub fn node_id(&self) -> &str {
        match self {
            MirrorOp::Insert(record) | MirrorOp::Update(record) => &record.id,
            MirrorOp::Delete { id, .. } => id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            MirrorOp::Insert(_) => "insert",
            MirrorOp::Update(_) => "update",
            MirrorOp::Delete { .. } => "delete",
        }
    }

    /// Ops for one store call, read against the post-mutation store.
    pub fn from_outcome(
        outcome: &MutationOutcome,
        store: &ContentStore,
        user_id: Option<&str>,
    ) -> Vec<MirrorOp> {
        let record = |id: &String| store.get(id).map(|node| RemoteRecord::from_node(node, user_id));
        let mut ops = Vec::new();
        ops.extend(outcome.inserted.iter().filter_map(record).map(MirrorOp::Insert));
        ops.extend(outcome.updated.iter().filter_map(record).map(MirrorOp::Update));
        ops.extend(outcome.removed.iter().map(|id| MirrorOp::Delete {
            id: id.clone(),
            user_id: user_id.map(str::to_string),
        }));
        ops
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// The remote table is not provisioned. Not an error for the user.
    SchemaMissing,
    /// No authenticated user, so nothing to mirror to.
    Unauthenticated,
    Transport(String),
    Rejected(String),
}

impl MirrorError {
    /// Whether the failure should reach the user as a notice.
    pub fn is_reportable(&self) -> bool {
        matches!(self, MirrorError::Transport(_) | MirrorError::Rejected(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, MirrorError::Transport(_))
    }
}

impl std::fmt::Display for MirrorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MirrorError::SchemaMissing => write!(f, "Remote schema is not provisioned"),
            MirrorError::Unauthenticated => write!(f, "No authenticated user"),
            MirrorError::Transport(e) => write!(f, "Transport error: {e}"),
            MirrorError::Rejected(e) => write!(f, "Remote rejected the change: {e}"),
        }
    }
}

impl std::error::Error for MirrorError {}

/// The remote persistence collaborator.
pub trait RemoteMirror: Send + Sync {
    fn apply<'a>(&'a self, op: &'a MirrorOp) -> BoxFuture<'a, Result<(), MirrorError>>;
}

/// Non-modal notice for a reportable mirror failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorNotice {
    pub node_id: String,
    pub verb: &'static str,
    pub message: String,
}

/// Sending half of the mirror channel. Disabled outboxes drop ops.
#[derive(Debug, Clone, Default)]
pub struct MirrorOutbox {
    tx: Option<mpsc::UnboundedSender<MirrorOp>>,
}

impl MirrorOutbox {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MirrorOp>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn enqueue(&self, op: MirrorOp) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(op).is_err() {
            log::debug!("mirror: worker gone, dropping op");
        }
    }

    pub fn enqueue_all(&self, ops: impl IntoIterator<Item = MirrorOp>) {
        for op in ops {
            self.enqueue(op);
        }
    }
}

/// Drains the outbox against a remote mirror until cancelled or the outbox
/// closes.
pub struct MirrorWorker {
    mirror: Arc<dyn RemoteMirror>,
    op_rx: mpsc::UnboundedReceiver<MirrorOp>,
    notice_tx: mpsc::UnboundedSender<MirrorNotice>,
    cancel: CancellationToken,
    schema_missing: bool,
}

impl MirrorWorker {
    pub fn new(
        mirror: Arc<dyn RemoteMirror>,
        op_rx: mpsc::UnboundedReceiver<MirrorOp>,
        notice_tx: mpsc::UnboundedSender<MirrorNotice>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            mirror,
            op_rx,
            notice_tx,
            cancel,
            schema_missing: false,
        }
    }

    pub async fn run(mut self) {
        log::debug!("mirror worker started");
        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    log::debug!("mirror worker shutting down (cancellation requested)");
                    break;
                }

                op = self.op_rx.recv() => {
                    let Some(op) = op else {
                        log::debug!("mirror worker shutting down (outbox closed)");
                        break;
                    };
                    self.process(op).await;
                }
            }
        }
    }

    async fn process(&mut self, op: MirrorOp) {
        if self.schema_missing {
            return;
        }
        let result = self.apply_with_retry(&op).await;
        let Err(error) = result else {
            return;
        };
        match &error {
            MirrorError::SchemaMissing => {
                log::debug!("mirror: remote schema missing, mirroring disabled");
                self.schema_missing = true;
                emit_event(DiagnosticEvent::MirrorSchemaMissing);
            },
            MirrorError::Unauthenticated => {
                log::debug!("mirror: no authenticated user, {} {} skipped", op.verb(), op.node_id());
            },
            MirrorError::Transport(_) | MirrorError::Rejected(_) => {
                log::warn!("mirror: {} {} failed: {error}", op.verb(), op.node_id());
                emit_event(DiagnosticEvent::MirrorFailed {
                    node_id: op.node_id().to_string(),
                    message: error.to_string(),
                });
            },
        }
        if error.is_reportable() {
            let _ = self.notice_tx.send(MirrorNotice {
                node_id: op.node_id().to_string(),
                verb: op.verb(),
                message: error.to_string(),
            });
        }
    }

    async fn apply_with_retry(&self, op: &MirrorOp) -> Result<(), MirrorError> {
        let mut delays = ExponentialBuilder::default()
            .with_min_delay(RETRY_MIN_DELAY)
            .with_max_delay(RETRY_MAX_DELAY)
            .with_factor(2.0)
            .with_max_times(MAX_TRANSPORT_RETRIES)
            .build();
        loop {
            match self.mirror.apply(op).await {
                Err(error) if error.is_retryable() => match delays.next() {
                    Some(delay) => {
                        log::debug!("mirror: {} {} retrying in {delay:?}", op.verb(), op.node_id());
                        tokio::time::sleep(delay).await;
                    },
                    None => return Err(error),
                },
                result => return result,
            }
        }
    }
}

/// Spawn a worker on the current runtime and return the notice receiver.
pub fn spawn_worker(
    mirror: Arc<dyn RemoteMirror>,
    op_rx: mpsc::UnboundedReceiver<MirrorOp>,
    cancel: CancellationToken,
) -> (
    tokio::task::JoinHandle<()>,
    mpsc::UnboundedReceiver<MirrorNotice>,
) {
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let worker = MirrorWorker::new(mirror, op_rx, notice_tx, cancel);
    (tokio::spawn(worker.run()), notice_rx)
}
