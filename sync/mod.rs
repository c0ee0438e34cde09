/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Cross-tab sync: the broadcast relay between open dashboards and the
//! best-effort remote mirror.

pub mod bus;
pub mod mirror;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use bus::{BusHub, RelayEvent, SyncRelay};
pub use mirror::{
    MirrorError, MirrorNotice, MirrorOp, MirrorOutbox, MirrorWorker, RemoteMirror, RemoteRecord,
};

pub const TARGET_ALL: &str = "all";
pub const TARGET_CURRENT_SESSION: &str = "current-session";

/// Who a broadcast is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BroadcastTarget {
    All,
    /// Relays in the sender's own session group.
    CurrentSession,
    Session(String),
}

impl BroadcastTarget {
    pub fn parse(value: &str) -> Self {
        match value {
            TARGET_ALL => BroadcastTarget::All,
            TARGET_CURRENT_SESSION => BroadcastTarget::CurrentSession,
            other => BroadcastTarget::Session(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            BroadcastTarget::All => TARGET_ALL,
            BroadcastTarget::CurrentSession => TARGET_CURRENT_SESSION,
            BroadcastTarget::Session(id) => id,
        }
    }
}

/// Typed bus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Navigate { view_id: String },
    ItemsChanged { revision: u64 },
}

/// One message on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub event: BusEvent,
    pub target: BroadcastTarget,
    /// Sender clock, milliseconds since the epoch.
    pub sent_at: i64,
    pub origin_id: String,
    pub origin_group: String,
}

/// JSON shape: `{type, payload, targetId, sentAt, originId, originGroup}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    target_id: Option<String>,
    #[serde(default)]
    sent_at: i64,
    #[serde(default)]
    origin_id: String,
    #[serde(default)]
    origin_group: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigatePayload {
    view_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemsChangedPayload {
    revision: u64,
}

const KIND_NAVIGATE: &str = "NAVIGATE";
const KIND_ITEMS_CHANGED: &str = "ITEMS_CHANGED";

impl BusMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let (kind, payload) = match &self.event {
            BusEvent::Navigate { view_id } => (
                KIND_NAVIGATE,
                serde_json::to_value(NavigatePayload {
                    view_id: view_id.clone(),
                })?,
            ),
            BusEvent::ItemsChanged { revision } => (
                KIND_ITEMS_CHANGED,
                serde_json::to_value(ItemsChangedPayload {
                    revision: *revision,
                })?,
            ),
        };
        serde_json::to_string(&WireMessage {
            kind: kind.to_string(),
            payload,
            target_id: Some(self.target.as_wire().to_string()),
            sent_at: self.sent_at,
            origin_id: self.origin_id.clone(),
            origin_group: self.origin_group.clone(),
        })
    }

    /// Decode a bus message. Unknown types and malformed payloads yield
    /// `None`. A missing target means `all`.
    pub fn from_json(text: &str) -> Option<Self> {
        let wire: WireMessage = serde_json::from_str(text).ok()?;
        let event = match wire.kind.as_str() {
            KIND_NAVIGATE => {
                let payload: NavigatePayload = serde_json::from_value(wire.payload).ok()?;
                if payload.view_id.is_empty() {
                    return None;
                }
                BusEvent::Navigate {
                    view_id: payload.view_id,
                }
            },
            KIND_ITEMS_CHANGED => {
                let payload: ItemsChangedPayload = serde_json::from_value(wire.payload).ok()?;
                BusEvent::ItemsChanged {
                    revision: payload.revision,
                }
            },
            _ => return None,
        };
        Some(Self {
            event,
            target: wire
                .target_id
                .as_deref()
                .map(BroadcastTarget::parse)
                .unwrap_or(BroadcastTarget::All),
            sent_at: wire.sent_at,
            origin_id: wire.origin_id,
            origin_group: wire.origin_group,
        })
    }
}
