/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Application state and the single write path.
//!
//! Every user action, keyboard command, drop, and remote event reaches the
//! store through [`DashboardApp::apply_intents`]. A content mutation is
//! applied, the hierarchy and every tab are re-validated, and only then is
//! the new state persisted, mirrored, and announced to other relays. No
//! intent can fail: invalid input is logged and dropped.

use std::sync::Arc;

use dash_layout::{
    ItemLayout, LayoutMode, Pagination, Point, Size, Vector, auto_fit_columns, compute_layout,
    drag_position,
};
use dashshell_core::{
    ContentNode, ContentStore, Hierarchy, HierarchyCache, MutationOutcome, NodePatch, ROOT_ID,
    ResolvedView, SortOption, SortSpec, StoreError, TRASH_ID, resolve_view, resolve_view_sorted,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::clipboard::Clipboard;
use crate::config::DashboardConfig;
use crate::diagnostics::{self, DiagnosticEvent, emit_event};
use crate::dnd::{DropAction, DropContext, DropResult, reduce_drop};
use crate::persistence::{ItemsRepository, LoadOutcome, LoadSource, PersistenceError};
use crate::selection::{Selection, SelectionUpdateMode};
use crate::sync::{BroadcastTarget, MirrorNotice, MirrorOp, MirrorOutbox, RelayEvent, SyncRelay};
use crate::tabs::{TabController, TabId, TabKind, ViewFallback};

/// Display fields filled in by an asynchronous metadata fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.icon.is_none()
            && self.description.is_none()
            && self.thumbnail.is_none()
    }

    fn into_node_patch(self) -> NodePatch {
        NodePatch {
            title: self.title,
            icon: self.icon,
            description: self.description,
            thumbnail: self.thumbnail,
            ..NodePatch::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum DashboardIntent {
    Insert {
        node: ContentNode,
        parent_id: Option<String>,
        index: Option<usize>,
    },
    Update {
        id: String,
        patch: NodePatch,
    },
    BulkUpdate {
        ids: Vec<String>,
        patch: NodePatch,
    },
    Move {
        id: String,
        parent_id: Option<String>,
        index: Option<usize>,
    },
    Delete {
        id: String,
    },
    MoveToTrash {
        id: String,
    },
    EmptyTrash,
    SetLayoutMode {
        id: String,
        mode: LayoutMode,
    },
    /// Finish a canvas drag: `origin` plus the pointer delta, snapped.
    MoveCanvasItem {
        id: String,
        origin: Point,
        delta: Vector,
    },
    /// Result of a metadata fetch. Dropped if the node is gone.
    ApplyMetadata {
        id: String,
        patch: MetadataPatch,
    },
    Navigate {
        view_id: String,
    },
    Back,
    Forward,
    Undo,
    Redo,
    OpenTab {
        view_id: String,
        kind: TabKind,
    },
    CloseTab {
        tab_id: TabId,
    },
    SwitchTab {
        tab_id: TabId,
    },
    Select {
        id: String,
        multi_select: bool,
    },
    UpdateSelection {
        ids: Vec<String>,
        mode: SelectionUpdateMode,
    },
    ClearSelection,
    Copy,
    Cut,
    /// Paste into `target`, or the active view when `None`.
    Paste {
        target: Option<String>,
    },
    DeleteSelected,
    Drop(DropResult),
    ArmBroadcast {
        target: BroadcastTarget,
    },
    DisarmBroadcast,
}

/// Placement of one visible child of the active view.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedItem {
    pub id: String,
    pub layout: ItemLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewLayout {
    pub view_id: String,
    pub mode: LayoutMode,
    pub total_count: usize,
    /// Set for the paginated square grid.
    pub pagination: Option<Pagination>,
    pub items: Vec<PlacedItem>,
}

pub struct DashboardApp {
    config: DashboardConfig,
    store: ContentStore,
    hierarchy: HierarchyCache,
    tabs: TabController,
    selection: Selection,
    clipboard: Clipboard,
    relay: Option<SyncRelay>,
    outbox: MirrorOutbox,
    notice_rx: Option<mpsc::UnboundedReceiver<MirrorNotice>>,
    repository: Option<ItemsRepository>,
    last_fallbacks: Vec<ViewFallback>,
}

impl DashboardApp {
    /// In-memory dashboard over the default seed.
    pub fn new(config: DashboardConfig) -> Self {
        Self::with_store(config, ContentStore::from_seed())
    }

    pub fn with_store(config: DashboardConfig, store: ContentStore) -> Self {
        let tabs = TabController::new(config.history);
        let mut app = Self {
            config,
            store,
            hierarchy: HierarchyCache::new(),
            tabs,
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            relay: None,
            outbox: MirrorOutbox::disabled(),
            notice_rx: None,
            repository: None,
            last_fallbacks: Vec::new(),
        };
        app.refresh();
        app
    }

    /// Load from `repository`, repairing and writing back once if needed.
    pub fn open(
        config: DashboardConfig,
        repository: ItemsRepository,
    ) -> Result<Self, PersistenceError> {
        let outcome = repository.load_and_heal()?;
        if let LoadSource::Reseeded(reason) = outcome.source {
            log::info!("app: started from seed ({reason:?})");
        }
        let mut app = Self::with_store(config, outcome.store);
        diagnostics::emit_orphans(&app.hierarchy());
        app.repository = Some(repository);
        Ok(app)
    }

    pub fn attach_relay(&mut self, relay: SyncRelay) {
        self.relay = Some(relay);
    }

    /// Route mutations into a mirror worker and collect its notices.
    pub fn attach_mirror(
        &mut self,
        outbox: MirrorOutbox,
        notice_rx: mpsc::UnboundedReceiver<MirrorNotice>,
    ) {
        if !self.config.sync.mirror_enabled {
            log::debug!("app: mirroring disabled by configuration");
            return;
        }
        self.outbox = outbox;
        self.notice_rx = Some(notice_rx);
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn hierarchy(&mut self) -> Arc<Hierarchy> {
        self.hierarchy.get(&self.store)
    }

    pub fn tabs(&self) -> &TabController {
        &self.tabs
    }

    pub fn active_view_id(&self) -> &str {
        self.tabs.active_view_id()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn relay(&self) -> Option<&SyncRelay> {
        self.relay.as_ref()
    }

    /// Tabs re-pointed to the root by the most recent refresh.
    pub fn last_fallbacks(&self) -> &[ViewFallback] {
        &self.last_fallbacks
    }

    /// Apply a batch of intents deterministically in insertion order.
    pub fn apply_intents<I>(&mut self, intents: I)
    where
        I: IntoIterator<Item = DashboardIntent>,
    {
        for intent in intents {
            self.apply_intent(intent);
        }
    }

    fn apply_intent(&mut self, intent: DashboardIntent) {
        let view_before = self.tabs.active_view_id().to_string();

        match intent {
            DashboardIntent::Insert {
                node,
                parent_id,
                index,
            } => {
                self.begin_mutation();
                let result = self.store.insert(node, parent_id.as_deref(), index);
                self.finish_mutation("insert", result);
            },
            DashboardIntent::Update { id, patch } => {
                self.begin_mutation();
                let result = self.store.update(&id, &patch);
                self.finish_mutation("update", result);
            },
            DashboardIntent::BulkUpdate { ids, patch } => {
                self.begin_mutation();
                let outcome = self.store.bulk_update(&ids, &patch);
                self.finish_mutation("bulk update", Ok(outcome));
            },
            DashboardIntent::Move {
                id,
                parent_id,
                index,
            } => {
                self.begin_mutation();
                let result = self.store.move_node(&id, parent_id.as_deref(), index);
                self.finish_mutation("move", result);
            },
            DashboardIntent::Delete { id } => {
                self.begin_mutation();
                let result = self.store.delete_subtree(&id);
                self.finish_mutation("delete", result);
            },
            DashboardIntent::MoveToTrash { id } => {
                self.begin_mutation();
                let result = self.store.move_to_trash(&id);
                self.finish_mutation("trash", result);
            },
            DashboardIntent::EmptyTrash => {
                self.begin_mutation();
                let outcome = self.store.empty_trash();
                self.finish_mutation("empty trash", Ok(outcome));
            },
            DashboardIntent::SetLayoutMode { id, mode } => {
                self.begin_mutation();
                let result = self.store.update(&id, &NodePatch::layout_mode(mode));
                self.finish_mutation("set layout mode", result);
            },
            DashboardIntent::MoveCanvasItem { id, origin, delta } => {
                let position = drag_position(origin, delta, self.config.layout.snap_grid_size);
                self.begin_mutation();
                let result = self.store.update(&id, &NodePatch::position(position));
                self.finish_mutation("canvas move", result);
            },
            DashboardIntent::ApplyMetadata { id, patch } => self.apply_metadata(&id, patch),
            DashboardIntent::Navigate { view_id } => self.navigate(&view_id),
            DashboardIntent::Back => {
                let store = &self.store;
                if self.tabs.back(|id| view_exists(store, id)).is_none() {
                    log::debug!("app: nothing to go back to");
                }
            },
            DashboardIntent::Forward => {
                let store = &self.store;
                if self.tabs.forward(|id| view_exists(store, id)).is_none() {
                    log::debug!("app: nothing to go forward to");
                }
            },
            DashboardIntent::Undo => {
                let store = &self.store;
                if self.tabs.undo(|id| view_exists(store, id)).is_none() {
                    log::debug!("app: undo stack exhausted");
                }
            },
            DashboardIntent::Redo => {
                let store = &self.store;
                if self.tabs.redo(|id| view_exists(store, id)).is_none() {
                    log::debug!("app: nothing to redo");
                }
            },
            DashboardIntent::OpenTab { view_id, kind } => {
                let view_id = if view_exists(&self.store, &view_id) {
                    view_id
                } else {
                    log::debug!("app: open tab for missing view {view_id}, using root");
                    ROOT_ID.to_string()
                };
                self.tabs.open_tab(&view_id, kind);
            },
            DashboardIntent::CloseTab { tab_id } => {
                self.tabs.close_tab(&tab_id);
            },
            DashboardIntent::SwitchTab { tab_id } => {
                self.tabs.switch_tab(&tab_id);
            },
            DashboardIntent::Select { id, multi_select } => {
                if self.store.contains(&id) {
                    self.selection.select(&id, multi_select);
                }
            },
            DashboardIntent::UpdateSelection { ids, mode } => {
                let ids = ids
                    .into_iter()
                    .filter(|id| self.store.contains(id))
                    .collect();
                self.selection.update_many(ids, mode);
            },
            DashboardIntent::ClearSelection => self.selection.clear(),
            DashboardIntent::Copy => self.clipboard.copy(self.selection.ids()),
            DashboardIntent::Cut => self.clipboard.cut(self.selection.ids()),
            DashboardIntent::Paste { target } => self.paste(target),
            DashboardIntent::DeleteSelected => self.delete_selected(),
            DashboardIntent::Drop(drop) => self.apply_drop(&drop),
            DashboardIntent::ArmBroadcast { target } => match self.relay.as_mut() {
                Some(relay) => relay.arm(target),
                None => log::debug!("app: no relay attached, broadcast not armed"),
            },
            DashboardIntent::DisarmBroadcast => {
                if let Some(relay) = self.relay.as_mut() {
                    relay.disarm();
                }
            },
        }

        if self.tabs.active_view_id() != view_before {
            self.announce_active_view();
        }
    }

    /// Drain the relay and apply what other dashboards sent. Returns how many
    /// events were applied.
    pub fn sync_tick(&mut self) -> usize {
        let Some(relay) = self.relay.as_mut() else {
            return 0;
        };
        let events = relay.drain();
        let mut applied = 0;
        for event in events {
            match event {
                RelayEvent::Navigate { view_id } => {
                    if view_exists(&self.store, &view_id) {
                        self.tabs.navigate(&view_id);
                        applied += 1;
                    } else {
                        log::debug!("app: remote navigation to unknown view {view_id} ignored");
                    }
                },
                RelayEvent::ItemsChanged { revision } => {
                    log::debug!("app: remote items changed (revision {revision})");
                    if self.reload_from_repository() {
                        applied += 1;
                    }
                },
            }
        }
        applied
    }

    /// Pending non-modal mirror failure notices.
    pub fn drain_mirror_notices(&mut self) -> Vec<MirrorNotice> {
        let mut notices = Vec::new();
        let Some(rx) = self.notice_rx.as_mut() else {
            return notices;
        };
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    /// The active tab's view with its container-chosen sort.
    pub fn resolve_active_view(&mut self) -> Option<ResolvedView<'_>> {
        let hierarchy = self.hierarchy.get(&self.store);
        resolve_view(self.tabs.active_view_id(), &self.store, &hierarchy)
    }

    pub fn resolve_active_view_sorted(&mut self, sort: SortSpec) -> Option<ResolvedView<'_>> {
        let hierarchy = self.hierarchy.get(&self.store);
        resolve_view_sorted(self.tabs.active_view_id(), &self.store, &hierarchy, Some(sort))
    }

    /// Lay out the visible children of the active view.
    ///
    /// Only the current page (square grid) or the revealed window (vertical
    /// grid) is placed.
    pub fn layout_active_view(
        &mut self,
        container: Size,
        current_page: usize,
        revealed: Option<usize>,
    ) -> Option<ViewLayout> {
        let default_mode = self.config.layout.default_mode;
        let mut extras = self.config.layout.extras();
        extras.current_page = current_page;
        extras.revealed = revealed;

        let hierarchy = self.hierarchy.get(&self.store);
        let view = resolve_view(self.tabs.active_view_id(), &self.store, &hierarchy)?;
        let mode = view.node.layout_mode.unwrap_or(default_mode);
        let children = &view.sorted_children;
        let total_count = children.len();

        let pagination = (mode == LayoutMode::GridSquare)
            .then(|| Pagination::new(total_count, extras.square_columns, current_page));
        let range = match mode {
            LayoutMode::GridSquare => pagination.map(|p| p.item_range()).unwrap_or(0..0),
            LayoutMode::GridVertical => {
                let columns = auto_fit_columns(container.width, &extras.metrics);
                let window = revealed.unwrap_or(columns * extras.virtual_rows);
                0..window.min(total_count)
            },
            LayoutMode::Grid | LayoutMode::Canvas => 0..total_count,
        };

        let items = range
            .filter_map(|index| {
                let node = children.get(index)?;
                let mut item_extras = extras;
                item_extras.selected = self.selection.contains(&node.id);
                Some(PlacedItem {
                    id: node.id.clone(),
                    layout: compute_layout(
                        mode,
                        index,
                        total_count,
                        container,
                        &node.layout_item(),
                        &item_extras,
                    ),
                })
            })
            .collect();

        Some(ViewLayout {
            view_id: view.id().to_string(),
            mode,
            total_count,
            pagination,
            items,
        })
    }

    fn navigate(&mut self, view_id: &str) {
        if !view_exists(&self.store, view_id) {
            log::debug!("app: navigation to unknown view {view_id} ignored");
            return;
        }
        self.tabs.navigate(view_id);
    }

    fn apply_metadata(&mut self, id: &str, patch: MetadataPatch) {
        if !self.store.contains(id) {
            log::debug!("app: metadata for removed node {id} dropped");
            emit_event(DiagnosticEvent::StaleMetadataDropped {
                node_id: id.to_string(),
            });
            return;
        }
        if patch.is_empty() {
            return;
        }
        // Fetch results are not user edits and stay off the undo stack.
        match self.store.update(id, &patch.into_node_patch()) {
            Ok(outcome) if !outcome.is_empty() => self.commit(outcome, false),
            Ok(_) => {},
            Err(error) => log::debug!("app: metadata apply for {id} rejected: {error}"),
        }
    }

    fn paste(&mut self, target: Option<String>) {
        let target = target.unwrap_or_else(|| self.tabs.active_view_id().to_string());
        let accepts_children =
            target == ROOT_ID || self.store.get(&target).is_some_and(ContentNode::is_container);
        if !accepts_children {
            log::debug!("app: paste target {target} is not a container");
            return;
        }
        self.begin_mutation();
        let outcome = self.clipboard.paste(&mut self.store, &target);
        let pasted = outcome.pasted;
        self.finish_mutation("paste", Ok(outcome.mutation));
        if !pasted.is_empty() {
            self.selection.update_many(pasted, SelectionUpdateMode::Replace);
        }
    }

    /// Selected nodes go to the trash. Nodes already in the trash are deleted.
    fn delete_selected(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let ids = self.selection.ids().to_vec();
        self.begin_mutation();
        let mut outcome = MutationOutcome::default();
        for id in &ids {
            let result = if self.store.is_within(TRASH_ID, id) {
                self.store.delete_subtree(id)
            } else {
                self.store.move_to_trash(id)
            };
            match result {
                Ok(step) => outcome.merge(step),
                Err(error) => log::debug!("app: delete of {id} skipped: {error}"),
            }
        }
        self.finish_mutation("delete selected", Ok(outcome));
    }

    fn apply_drop(&mut self, drop: &DropResult) {
        let hierarchy = self.hierarchy.get(&self.store);
        let (view_id, child_ids, manual_sort) =
            match resolve_view(self.tabs.active_view_id(), &self.store, &hierarchy) {
                Some(view) => (
                    view.id().to_string(),
                    view.child_ids(),
                    view.sort.option == SortOption::Manual,
                ),
                None => (self.tabs.active_view_id().to_string(), Vec::new(), false),
            };
        let cx = DropContext {
            view_id: &view_id,
            child_ids: &child_ids,
            tab_count: self.tabs.len(),
            manual_sort,
        };
        match reduce_drop(drop, &cx, &self.store) {
            DropAction::ReorderTabs { from, to } => {
                self.tabs.reorder(from, to);
            },
            DropAction::Move { id, parent, index } | DropAction::Reorder { id, parent, index } => {
                self.begin_mutation();
                let result = self.store.move_node(&id, Some(&parent), Some(index));
                self.finish_mutation("drop", result);
            },
            DropAction::Ignore => emit_event(DiagnosticEvent::InvalidDropIgnored),
        }
    }

    fn begin_mutation(&mut self) {
        self.tabs.capture_checkpoint();
    }

    fn finish_mutation(&mut self, label: &str, result: Result<MutationOutcome, StoreError>) {
        match result {
            Ok(outcome) if !outcome.is_empty() => self.commit(outcome, true),
            Ok(_) => {
                self.tabs.discard_checkpoint();
                log::debug!("app: {label} changed nothing");
            },
            Err(error) => {
                self.tabs.discard_checkpoint();
                log::debug!("app: {label} rejected: {error}");
            },
        }
    }

    fn commit(&mut self, outcome: MutationOutcome, checkpointed: bool) {
        self.refresh();
        let revision = self.store.revision();
        if checkpointed {
            self.tabs.settle_checkpoint(revision);
        }
        self.persist();
        let user_id = self.config.sync.user_id.as_deref();
        self.outbox
            .enqueue_all(MirrorOp::from_outcome(&outcome, &self.store, user_id));
        if let Some(relay) = self.relay.as_mut() {
            relay.announce_items_changed(revision);
        }
    }

    /// Rebuild derived state and re-point anything that stopped resolving.
    fn refresh(&mut self) {
        self.hierarchy.get(&self.store);
        let store = &self.store;
        self.last_fallbacks = self.tabs.validate(|id| view_exists(store, id));
        let pruned = self.selection.retain_existing(|id| store.contains(id));
        if pruned > 0 {
            log::debug!("app: {pruned} vanished id(s) dropped from the selection");
        }
    }

    fn persist(&self) {
        let Some(repository) = &self.repository else {
            return;
        };
        if let Err(error) = repository.save(&self.store) {
            log::warn!("app: failed to persist items: {error}");
        }
    }

    fn reload_from_repository(&mut self) -> bool {
        let Some(repository) = &self.repository else {
            return false;
        };
        match repository.load() {
            Ok(LoadOutcome {
                source: LoadSource::Reseeded(reason),
                ..
            }) => {
                log::warn!("app: shared items unreadable ({reason:?}), keeping local copy");
                false
            },
            Ok(outcome) => {
                self.store.replace_all(outcome.store.nodes().to_vec());
                self.refresh();
                true
            },
            Err(error) => {
                log::warn!("app: reload after remote change failed: {error}");
                false
            },
        }
    }

    fn announce_active_view(&mut self) {
        let view_id = self.tabs.active_view_id().to_string();
        if let Some(relay) = self.relay.as_mut() {
            relay.announce_navigate(&view_id);
        }
    }
}

/// The root always resolves, falling back to its seed definition.
fn view_exists(store: &ContentStore, id: &str) -> bool {
    id == ROOT_ID || store.contains(id)
}
