/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::sync::Arc;

use dashshell::VERSION;
use dashshell::config::DashboardConfig;
use dashshell::persistence::{
    ItemsRepository, KeyValueStore, MemoryKeyValueStore, RedbKeyValueStore,
};
use dashshell::sync::mirror::spawn_worker;
use dashshell::sync::{
    BroadcastTarget, BusHub, MirrorError, MirrorOp, MirrorOutbox, RemoteMirror, SyncRelay,
};
use dashshell::{DashboardApp, DashboardIntent};
use dashshell_core::{ContentNode, NodeKind, ROOT_ID, SAVED_ID, TRASH_ID, WELCOME_ID};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

fn insert(app: &mut DashboardApp, id: &str, kind: NodeKind, parent: &str) {
    app.apply_intents([DashboardIntent::Insert {
        node: ContentNode::with_id(id, kind, id),
        parent_id: Some(parent.to_string()),
        index: None,
    }]);
}

fn navigate(view_id: &str) -> DashboardIntent {
    DashboardIntent::Navigate {
        view_id: view_id.to_string(),
    }
}

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

#[test]
fn website_inserted_at_front_of_root_shifts_siblings() {
    let mut app = DashboardApp::new(DashboardConfig::default());
    let before_count = app.hierarchy().item_count(ROOT_ID);
    let before_orders: Vec<(String, f64)> = app
        .store()
        .children_of(ROOT_ID)
        .iter()
        .map(|node| (node.id.clone(), node.order))
        .collect();
    assert_eq!(before_orders.len(), 3);

    let website = ContentNode::website("https://example.com");
    let website_id = website.id.clone();
    app.apply_intents([DashboardIntent::Insert {
        node: website,
        parent_id: Some(ROOT_ID.to_string()),
        index: Some(0),
    }]);

    let store = app.store();
    let inserted = store.get(&website_id).unwrap();
    assert_eq!(inserted.order, 0.0);
    assert_eq!(inserted.parent(), Some(ROOT_ID));
    for (id, order) in &before_orders {
        assert_eq!(store.get(id).unwrap().order, order + 1.0);
    }
    assert_eq!(store.children_of(ROOT_ID).len(), before_orders.len() + 1);
    assert_eq!(app.hierarchy().item_count(ROOT_ID), before_count + 1);
}

#[test]
fn undo_and_redo_move_the_view_but_keep_content() {
    let mut app = DashboardApp::new(DashboardConfig::default());
    app.apply_intents([navigate(SAVED_ID)]);
    insert(&mut app, "f", NodeKind::Folder, SAVED_ID);
    app.apply_intents([navigate("f")]);
    insert(&mut app, "note", NodeKind::Note, "f");
    app.apply_intents([navigate(ROOT_ID)]);

    app.apply_intents([DashboardIntent::Undo]);
    assert_eq!(app.active_view_id(), "f");
    app.apply_intents([DashboardIntent::Undo]);
    assert_eq!(app.active_view_id(), SAVED_ID);
    assert_eq!(app.tabs().active_tab().undo_stack().index(), 0);
    app.apply_intents([DashboardIntent::Undo]);
    assert_eq!(app.active_view_id(), SAVED_ID);

    app.apply_intents([DashboardIntent::Redo]);
    assert_eq!(app.active_view_id(), SAVED_ID);
    assert_eq!(app.tabs().active_tab().undo_stack().index(), 1);
    assert!(app.store().contains("note"));

    app.apply_intents([DashboardIntent::Back]);
    assert_eq!(app.active_view_id(), "f");
}

#[test]
fn tabs_browse_independently_and_survive_deletes() {
    let mut app = DashboardApp::new(DashboardConfig::default());
    insert(&mut app, "f", NodeKind::Folder, ROOT_ID);
    let first = app.tabs().active_tab().id.clone();
    app.apply_intents([DashboardIntent::OpenTab {
        view_id: "f".to_string(),
        kind: Default::default(),
    }]);
    assert_eq!(app.tabs().len(), 2);
    assert_eq!(app.active_view_id(), "f");

    app.apply_intents([
        DashboardIntent::SwitchTab {
            tab_id: first.clone(),
        },
        DashboardIntent::MoveToTrash { id: "f".to_string() },
        DashboardIntent::EmptyTrash,
    ]);
    assert!(!app.store().contains("f"));
    assert!(app.tabs().tabs().iter().all(|tab| tab.active_view_id() == ROOT_ID));
    assert_eq!(app.store().children_of(TRASH_ID).len(), 0);

    app.apply_intents([DashboardIntent::CloseTab { tab_id: first }]);
    assert_eq!(app.tabs().len(), 1);
}

#[test]
fn clipboard_round_trip_through_intents() {
    let mut app = DashboardApp::new(DashboardConfig::default());
    insert(&mut app, "f", NodeKind::Folder, SAVED_ID);
    insert(&mut app, "leaf", NodeKind::Note, "f");
    let before = app.store().len();

    app.apply_intents([
        DashboardIntent::Select {
            id: "f".to_string(),
            multi_select: false,
        },
        DashboardIntent::Copy,
        DashboardIntent::Paste {
            target: Some(WELCOME_ID.to_string()),
        },
    ]);
    assert_eq!(app.store().len(), before + 2);
    let copy_id = app.selection().primary().unwrap().to_string();
    assert_ne!(copy_id, "f");
    assert_eq!(app.store().get(&copy_id).unwrap().parent(), Some(WELCOME_ID));

    app.apply_intents([
        DashboardIntent::Select {
            id: "leaf".to_string(),
            multi_select: false,
        },
        DashboardIntent::Cut,
        DashboardIntent::Paste {
            target: Some("leaf".to_string()),
        },
    ]);
    assert_eq!(app.store().get("leaf").unwrap().parent(), Some("f"));
    app.apply_intents([DashboardIntent::Paste {
        target: Some(copy_id.clone()),
    }]);
    assert_eq!(app.store().get("leaf").unwrap().parent(), Some(copy_id.as_str()));
}

#[test]
fn repair_merge_on_load_restores_missing_essentials() {
    let backend = Arc::new(MemoryKeyValueStore::new());
    let mut note = ContentNode::with_id("note", NodeKind::Note, "keep me");
    note.parent_id = Some(ROOT_ID.to_string());
    let payload = serde_json::to_vec(&vec![note.clone()]).unwrap();
    backend.put("dashboard-items", &payload).unwrap();

    let repository = ItemsRepository::new(backend.clone(), "dashboard-items");
    let app = DashboardApp::open(DashboardConfig::default(), repository).unwrap();
    for id in [ROOT_ID, SAVED_ID, WELCOME_ID, TRASH_ID] {
        assert!(app.store().contains(id), "{id} should be restored");
    }
    let kept = app.store().get("note").unwrap();
    assert_eq!(kept.title, note.title);
    assert_eq!(kept.parent(), Some(ROOT_ID));

    let written: Vec<serde_json::Value> =
        serde_json::from_slice(&backend.get("dashboard-items").unwrap().unwrap()).unwrap();
    assert_eq!(written.len(), 5);
}

#[test]
fn redb_store_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    {
        let backend = RedbKeyValueStore::open(dir.path()).unwrap();
        let repository = ItemsRepository::new(Arc::new(backend), "dashboard-items");
        let mut app = DashboardApp::open(DashboardConfig::default(), repository).unwrap();
        insert(&mut app, "kept", NodeKind::Folder, SAVED_ID);
    }
    let backend = RedbKeyValueStore::open(dir.path()).unwrap();
    let repository = ItemsRepository::new(Arc::new(backend), "dashboard-items");
    let app = DashboardApp::open(DashboardConfig::default(), repository).unwrap();
    assert_eq!(app.store().get("kept").unwrap().parent(), Some(SAVED_ID));
}

#[test]
fn two_dashboards_share_items_and_follow_armed_navigation() {
    let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let hub = BusHub::new();
    let config = DashboardConfig::default();
    let channel = config.sync.channel_name.clone();

    let mut first = DashboardApp::open(
        config.clone(),
        ItemsRepository::new(backend.clone(), config.storage.items_key.clone()),
    )
    .unwrap();
    first.attach_relay(SyncRelay::join(&hub, &channel, "window-1"));
    let mut second = DashboardApp::open(
        config.clone(),
        ItemsRepository::new(backend.clone(), config.storage.items_key.clone()),
    )
    .unwrap();
    second.attach_relay(SyncRelay::join(&hub, &channel, "window-2"));

    insert(&mut first, "shared", NodeKind::Folder, ROOT_ID);
    first.apply_intents([navigate("shared")]);
    assert_eq!(second.sync_tick(), 1);
    assert!(second.store().contains("shared"));
    assert_eq!(second.active_view_id(), ROOT_ID);

    first.apply_intents([
        DashboardIntent::ArmBroadcast {
            target: BroadcastTarget::All,
        },
        navigate(ROOT_ID),
        navigate("shared"),
    ]);
    assert_eq!(second.sync_tick(), 2);
    assert_eq!(second.active_view_id(), "shared");

    first.apply_intents([
        DashboardIntent::ArmBroadcast {
            target: BroadcastTarget::CurrentSession,
        },
        navigate(ROOT_ID),
    ]);
    assert_eq!(second.sync_tick(), 0);
    assert_eq!(second.active_view_id(), "shared");
}

#[test]
fn unreadable_shared_items_do_not_replace_the_local_tree() {
    let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let hub = BusHub::new();
    let config = DashboardConfig::default();
    let channel = config.sync.channel_name.clone();
    let key = config.storage.items_key.clone();

    let mut first =
        DashboardApp::open(config.clone(), ItemsRepository::new(backend.clone(), key.clone()))
            .unwrap();
    first.attach_relay(SyncRelay::join(&hub, &channel, "window-1"));
    let mut second =
        DashboardApp::open(config.clone(), ItemsRepository::new(backend.clone(), key.clone()))
            .unwrap();
    second.attach_relay(SyncRelay::join(&hub, &channel, "window-2"));

    insert(&mut second, "mine", NodeKind::Note, SAVED_ID);
    insert(&mut first, "theirs", NodeKind::Note, SAVED_ID);
    backend.put(&key, b"{not json").unwrap();

    assert_eq!(second.sync_tick(), 0);
    assert!(second.store().contains("mine"));
    assert!(!second.store().contains("theirs"));
}

#[derive(Default)]
struct RecordingMirror {
    applied: Mutex<Vec<MirrorOp>>,
    fail_with: Option<MirrorError>,
}

impl RemoteMirror for RecordingMirror {
    fn apply<'a>(&'a self, op: &'a MirrorOp) -> BoxFuture<'a, Result<(), MirrorError>> {
        Box::pin(async move {
            self.applied.lock().push(op.clone());
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        })
    }
}

#[tokio::test]
async fn mutations_are_mirrored_after_local_apply() {
    let mirror = Arc::new(RecordingMirror::default());
    let (outbox, op_rx) = MirrorOutbox::channel();
    let (handle, notices) = spawn_worker(mirror.clone(), op_rx, CancellationToken::new());

    let mut app = DashboardApp::new(DashboardConfig::default());
    app.attach_mirror(outbox, notices);
    insert(&mut app, "n", NodeKind::Note, SAVED_ID);
    app.apply_intents([DashboardIntent::Delete { id: "n".to_string() }]);
    assert!(!app.store().contains("n"));
    drop(app);
    handle.await.unwrap();

    let applied = mirror.applied.lock();
    assert!(matches!(&applied[0], MirrorOp::Insert(record) if record.id == "n"));
    assert!(matches!(applied.last(), Some(MirrorOp::Delete { id, .. }) if id == "n"));
}

#[tokio::test]
async fn rejected_mirror_writes_surface_as_notices() {
    let mirror = Arc::new(RecordingMirror {
        fail_with: Some(MirrorError::Rejected("row level security".to_string())),
        ..RecordingMirror::default()
    });
    let (outbox, op_rx) = MirrorOutbox::channel();
    let cancel = CancellationToken::new();
    let (handle, notices) = spawn_worker(mirror, op_rx, cancel.clone());

    let mut app = DashboardApp::new(DashboardConfig::default());
    app.attach_mirror(outbox, notices);
    insert(&mut app, "n", NodeKind::Note, SAVED_ID);
    assert!(app.store().contains("n"));

    let mut received = Vec::new();
    for _ in 0..100 {
        received.extend(app.drain_mirror_notices());
        if !received.is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    cancel.cancel();
    handle.await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].node_id, "n");
}
