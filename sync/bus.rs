/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Named broadcast channels shared by every relay in the process, and the
//! relay that publishes and filters dashboard messages on one of them.
//!
//! Receiving is a synchronous drain so the owning reducer applies remote
//! events between its own intents, never in the middle of one.

use std::collections::HashMap;
use std::sync::Arc;

use dashshell_core::model::now_millis;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use super::{BroadcastTarget, BusEvent, BusMessage};
use crate::diagnostics::{DiagnosticEvent, emit_event};

const CHANNEL_CAPACITY: usize = 256;

/// Registry of named channels. Clones share the same registry.
#[derive(Clone, Default)]
pub struct BusHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
}

impl BusHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribe(&self, name: &str) -> (broadcast::Sender<String>, broadcast::Receiver<String>) {
        let mut channels = self.channels.lock();
        let tx = channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        let rx = tx.subscribe();
        (tx, rx)
    }
}

/// What a relay hands back to its owner after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Navigate { view_id: String },
    ItemsChanged { revision: u64 },
}

pub struct SyncRelay {
    session_id: String,
    group_id: String,
    channel_name: String,
    tx: broadcast::Sender<String>,
    rx: broadcast::Receiver<String>,
    armed: Option<BroadcastTarget>,
    /// Newest navigation applied or issued here, as `(sent_at, origin_id)`.
    last_navigation: Option<(i64, String)>,
    last_sent_at: i64,
}

impl SyncRelay {
    /// Join `channel_name` as a new session inside `group_id`.
    pub fn join(hub: &BusHub, channel_name: &str, group_id: impl Into<String>) -> Self {
        let (tx, rx) = hub.subscribe(channel_name);
        Self {
            session_id: Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            channel_name: channel_name.to_string(),
            tx,
            rx,
            armed: None,
            last_navigation: None,
            last_sent_at: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Start broadcasting navigation to `target`.
    pub fn arm(&mut self, target: BroadcastTarget) {
        log::debug!("relay {}: armed for {}", self.session_id, target.as_wire());
        self.armed = Some(target);
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    pub fn armed(&self) -> Option<&BroadcastTarget> {
        self.armed.as_ref()
    }

    /// Note a local active-view change. Publishes `NAVIGATE` when armed.
    pub fn announce_navigate(&mut self, view_id: &str) -> bool {
        let sent_at = self.next_timestamp();
        self.last_navigation = Some((sent_at, self.session_id.clone()));
        let Some(target) = self.armed.clone() else {
            return false;
        };
        self.publish(
            BusEvent::Navigate {
                view_id: view_id.to_string(),
            },
            target,
            sent_at,
        )
    }

    /// Tell every other relay that persisted items changed.
    pub fn announce_items_changed(&mut self, revision: u64) -> bool {
        let sent_at = self.next_timestamp();
        self.publish(
            BusEvent::ItemsChanged { revision },
            BroadcastTarget::All,
            sent_at,
        )
    }

    /// Whether a message is addressed to this relay.
    pub fn is_addressed_to_me(&self, message: &BusMessage) -> bool {
        match &message.target {
            BroadcastTarget::All => true,
            BroadcastTarget::CurrentSession => message.origin_group == self.group_id,
            BroadcastTarget::Session(id) => id == &self.session_id,
        }
    }

    /// Drain everything delivered since the last call, filtered and ordered.
    pub fn drain(&mut self) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        loop {
            let text = match self.rx.try_recv() {
                Ok(text) => text,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("relay {}: lagged, {skipped} message(s) lost", self.session_id);
                    continue;
                },
            };
            if let Some(event) = self.accept(&text) {
                events.push(event);
            }
        }
        events
    }

    fn accept(&mut self, text: &str) -> Option<RelayEvent> {
        let Some(message) = BusMessage::from_json(text) else {
            log::debug!("relay {}: ignoring malformed message", self.session_id);
            return None;
        };
        if message.origin_id == self.session_id {
            return None;
        }
        if !self.is_addressed_to_me(&message) {
            emit_event(DiagnosticEvent::ForeignBroadcastIgnored {
                target: message.target.as_wire().to_string(),
            });
            return None;
        }
        match message.event {
            BusEvent::Navigate { view_id } => {
                let key = (message.sent_at, message.origin_id);
                if self.last_navigation.as_ref().is_some_and(|last| &key <= last) {
                    log::debug!("relay {}: dropping stale navigation to {view_id}", self.session_id);
                    return None;
                }
                self.last_navigation = Some(key);
                Some(RelayEvent::Navigate { view_id })
            },
            BusEvent::ItemsChanged { revision } => Some(RelayEvent::ItemsChanged { revision }),
        }
    }

    fn publish(&mut self, event: BusEvent, target: BroadcastTarget, sent_at: i64) -> bool {
        let message = BusMessage {
            event,
            target,
            sent_at,
            origin_id: self.session_id.clone(),
            origin_group: self.group_id.clone(),
        };
        match message.to_json() {
            Ok(text) => self.tx.send(text).is_ok(),
            Err(e) => {
                log::warn!("relay {}: failed to encode message: {e}", self.session_id);
                false
            },
        }
    }

    /// Strictly increasing per relay, so two local events never tie.
    fn next_timestamp(&mut self) -> i64 {
        let now = now_millis().max(self.last_sent_at + 1);
        self.last_sent_at = now;
        now
    }
}
