/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Structured diagnostics channel.
//!
//! Emission is fire-and-forget: with no sender installed events are dropped,
//! and a disconnected receiver never fails the caller.

use std::sync::OnceLock;

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashshell_core::{Hierarchy, HierarchyAnomaly, RepairReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    CycleBroken { node_id: String },
    EssentialRestored { node_id: String },
    EssentialReattached { node_id: String },
    OrphanPromoted { node_id: String, missing_parent: String },
    StoreReseeded { reason: ReseedReason },
    MirrorFailed { node_id: String, message: String },
    MirrorSchemaMissing,
    StaleMetadataDropped { node_id: String },
    ForeignBroadcastIgnored { target: String },
    InvalidDropIgnored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReseedReason {
    Absent,
    Empty,
    Malformed,
}

static GLOBAL_DIAGNOSTICS_TX: OnceLock<Sender<DiagnosticEvent>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_DIAGNOSTICS_TX: std::cell::RefCell<Option<Sender<DiagnosticEvent>>> =
        const { std::cell::RefCell::new(None) };
}

/// Install the process-wide sender. Only the first call takes effect.
pub fn install_global_sender(sender: Sender<DiagnosticEvent>) {
    let _ = GLOBAL_DIAGNOSTICS_TX.set(sender);
}

/// Create a channel and install its sender, returning the receiver.
pub fn install_channel() -> Receiver<DiagnosticEvent> {
    let (tx, rx) = unbounded();
    install_global_sender(tx);
    rx
}

/// Route this thread's events to a private channel.
#[cfg(test)]
pub(crate) fn capture_for_test() -> Receiver<DiagnosticEvent> {
    let (tx, rx) = unbounded();
    TEST_DIAGNOSTICS_TX.with(|slot| {
        *slot.borrow_mut() = Some(tx);
    });
    rx
}

pub fn emit_event(event: DiagnosticEvent) {
    #[cfg(test)]
    {
        let mut event = Some(event);
        TEST_DIAGNOSTICS_TX.with(|slot| {
            if let Some(tx) = slot.borrow().as_ref() {
                if let Some(payload) = event.take() {
                    let _ = tx.send(payload);
                }
            }
        });
        if let (Some(tx), Some(payload)) = (GLOBAL_DIAGNOSTICS_TX.get(), event) {
            let _ = tx.send(payload);
        }
    }

    #[cfg(not(test))]
    {
        if let Some(tx) = GLOBAL_DIAGNOSTICS_TX.get() {
            let _ = tx.send(event);
        }
    }
}

pub(crate) fn emit_repair_report(report: &RepairReport) {
    for node_id in &report.restored {
        emit_event(DiagnosticEvent::EssentialRestored {
            node_id: node_id.clone(),
        });
    }
    for node_id in &report.reattached {
        emit_event(DiagnosticEvent::EssentialReattached {
            node_id: node_id.clone(),
        });
    }
    for node_id in &report.cycles_broken {
        emit_event(DiagnosticEvent::CycleBroken {
            node_id: node_id.clone(),
        });
    }
}

pub(crate) fn emit_orphans(hierarchy: &Hierarchy) {
    for anomaly in hierarchy.anomalies() {
        if let HierarchyAnomaly::Orphan {
            node_id,
            missing_parent,
        } = anomaly
        {
            emit_event(DiagnosticEvent::OrphanPromoted {
                node_id: node_id.clone(),
                missing_parent: missing_parent.clone(),
            });
        }
    }
}
