/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Content node data model.
//!
//! Core structures:
//! - `ContentNode`: the only persisted entity; one flat record per item
//! - `NodeKind`: tagged variant over item kinds, split into containers and leaves
//! - `NodePatch`: partial field update accepted by the store
//!
//! Children are never stored. They are always derived from `parent_id` by the
//! hierarchy builder, which rules out duplicate or cyclic ownership at rest.

use dash_layout::{GridSpan, LayoutItem, LayoutMode, Point, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::view::sort::{SortDirection, SortOption};

pub mod seed;

/// Reserved id of the tree root. The root is never a child.
pub const ROOT_ID: &str = "root";
/// Saved-items essential folder.
pub const SAVED_ID: &str = "saved";
/// Welcome essential folder.
pub const WELCOME_ID: &str = "welcome";
/// Trash essential folder.
pub const TRASH_ID: &str = "trash";

/// Ids that must always exist.
pub const ESSENTIAL_IDS: [&str; 4] = [ROOT_ID, SAVED_ID, WELCOME_ID, TRASH_ID];

pub fn is_essential(id: &str) -> bool {
    ESSENTIAL_IDS.contains(&id)
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Item kind. Drives rendering; the core only cares about container vs. leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Folder,
    List,
    Space,
    Board,
    Collection,
    Playlist,
    Website,
    Bookmark,
    Video,
    Audio,
    Image,
    Note,
    Text,
    Document,
    Pdf,
    Code,
    File,
    Tweet,
    Podcast,
    Book,
    Movie,
    Product,
    Repository,
    RssFeed,
    Map,
    Widget,
    Clock,
    Weather,
    Calendar,
    Todo,
    Calculator,
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    /// Whether nodes of this kind can have children.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::Folder
                | NodeKind::List
                | NodeKind::Space
                | NodeKind::Board
                | NodeKind::Collection
                | NodeKind::Playlist
        )
    }

    pub fn is_widget(self) -> bool {
        matches!(
            self,
            NodeKind::Widget
                | NodeKind::Clock
                | NodeKind::Weather
                | NodeKind::Calendar
                | NodeKind::Todo
                | NodeKind::Calculator
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::List => "list",
            NodeKind::Space => "space",
            NodeKind::Board => "board",
            NodeKind::Collection => "collection",
            NodeKind::Playlist => "playlist",
            NodeKind::Website => "website",
            NodeKind::Bookmark => "bookmark",
            NodeKind::Video => "video",
            NodeKind::Audio => "audio",
            NodeKind::Image => "image",
            NodeKind::Note => "note",
            NodeKind::Text => "text",
            NodeKind::Document => "document",
            NodeKind::Pdf => "pdf",
            NodeKind::Code => "code",
            NodeKind::File => "file",
            NodeKind::Tweet => "tweet",
            NodeKind::Podcast => "podcast",
            NodeKind::Book => "book",
            NodeKind::Movie => "movie",
            NodeKind::Product => "product",
            NodeKind::Repository => "repository",
            NodeKind::RssFeed => "rss-feed",
            NodeKind::Map => "map",
            NodeKind::Widget => "widget",
            NodeKind::Clock => "clock",
            NodeKind::Weather => "weather",
            NodeKind::Calendar => "calendar",
            NodeKind::Todo => "todo",
            NodeKind::Calculator => "calculator",
            NodeKind::Unknown => "unknown",
        }
    }
}

fn one() -> u32 {
    1
}

fn is_one(value: &u32) -> bool {
    *value == 1
}

/// Display settings of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl ContainerSettings {
    pub fn is_empty(&self) -> bool {
        self == &ContainerSettings::default()
    }
}

/// One item of the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Opaque unique id, immutable once created.
    pub id: String,

    /// Parent id; `None` for top-level nodes (and always for the root).
    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Sibling ordering key, meaningful only within one parent group.
    #[serde(default)]
    pub order: f64,

    #[serde(default)]
    pub created_at: i64,

    /// Refreshed on every mutation.
    #[serde(default)]
    pub updated_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_mode: Option<LayoutMode>,

    /// Free-form canvas position. Kept when the container leaves canvas mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,

    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub grid_span_col: u32,

    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub grid_span_row: u32,

    #[serde(default, skip_serializing_if = "ContainerSettings::is_empty")]
    pub settings: ContainerSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_option: Option<SortOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,

    /// Publish date of the underlying source, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_created_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Value>,

    /// Fields this version does not model, preserved across load/save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentNode {
    /// Create a node with a fresh UUID id.
    pub fn new(kind: NodeKind, title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), kind, title)
    }

    pub fn with_id(id: impl Into<String>, kind: NodeKind, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            parent_id: None,
            kind,
            title: title.into(),
            content: None,
            url: None,
            icon: None,
            description: None,
            thumbnail: None,
            order: 0.0,
            created_at: now,
            updated_at: now,
            layout_mode: None,
            x: None,
            y: None,
            width: None,
            height: None,
            grid_span_col: 1,
            grid_span_row: 1,
            settings: ContainerSettings::default(),
            sort_option: None,
            sort_direction: None,
            rating: None,
            view_count: None,
            like_count: None,
            source_created_at: None,
            styles: None,
            extra: Map::new(),
        }
    }

    pub fn folder(title: impl Into<String>) -> Self {
        Self::new(NodeKind::Folder, title)
    }

    /// A website item. The title defaults to the URL host.
    pub fn website(url: &str) -> Self {
        let trimmed = url.trim();
        let (normalized, title) = match url::Url::parse(trimmed) {
            Ok(parsed) => {
                let title = parsed
                    .host_str()
                    .map(|host| host.trim_start_matches("www.").to_string())
                    .unwrap_or_else(|| trimmed.to_string());
                (parsed.to_string(), title)
            },
            Err(_) => (trimmed.to_string(), trimmed.to_string()),
        };
        let mut node = Self::new(NodeKind::Website, title);
        node.url = Some(normalized);
        node
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Stored canvas position, present only when both axes are set.
    pub fn canvas_position(&self) -> Option<Point> {
        Some(Point::new(self.x?, self.y?))
    }

    /// Inputs for the layout engine.
    pub fn layout_item(&self) -> LayoutItem {
        LayoutItem {
            canvas_position: self.canvas_position(),
            canvas_size: match (self.width, self.height) {
                (Some(w), Some(h)) => Some(Size::new(w, h)),
                _ => None,
            },
            span: GridSpan {
                cols: self.grid_span_col.max(1),
                rows: self.grid_span_row.max(1),
            },
        }
    }

    pub fn layout_mode_or_default(&self) -> LayoutMode {
        self.layout_mode.unwrap_or_default()
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.created_at);
    }
}

/// Partial update. `None` leaves the field unchanged.
///
/// `parent_id` changes are routed through the store's move validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePatch {
    pub parent_id: Option<String>,
    pub order: Option<f64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub layout_mode: Option<LayoutMode>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub grid_span_col: Option<u32>,
    pub grid_span_row: Option<u32>,
    pub settings: Option<ContainerSettings>,
    pub sort_option: Option<SortOption>,
    pub sort_direction: Option<SortDirection>,
    pub rating: Option<f64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub source_created_at: Option<i64>,
    pub styles: Option<Value>,
}

impl NodePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn position(point: Point) -> Self {
        Self {
            x: Some(point.x),
            y: Some(point.y),
            ..Self::default()
        }
    }

    pub fn layout_mode(mode: LayoutMode) -> Self {
        Self {
            layout_mode: Some(mode),
            ..Self::default()
        }
    }

    /// Whether the patch moves the node within the tree.
    pub fn is_structural(&self) -> bool {
        self.parent_id.is_some() || self.order.is_some()
    }

    /// Apply every non-structural field. Returns whether anything was set.
    pub fn apply_fields(&self, node: &mut ContentNode) -> bool {
        let mut changed = false;
        macro_rules! set {
            ($field:ident) => {
                if let Some(value) = &self.$field {
                    node.$field = value.clone();
                    changed = true;
                }
            };
            ($field:ident, opt) => {
                if let Some(value) = &self.$field {
                    node.$field = Some(value.clone());
                    changed = true;
                }
            };
        }
        set!(title);
        set!(content, opt);
        set!(url, opt);
        set!(icon, opt);
        set!(description, opt);
        set!(thumbnail, opt);
        set!(layout_mode, opt);
        set!(x, opt);
        set!(y, opt);
        set!(width, opt);
        set!(height, opt);
        set!(settings);
        set!(sort_option, opt);
        set!(sort_direction, opt);
        set!(rating, opt);
        set!(view_count, opt);
        set!(like_count, opt);
        set!(source_created_at, opt);
        set!(styles, opt);
        if let Some(cols) = self.grid_span_col {
            node.grid_span_col = cols.max(1);
            changed = true;
        }
        if let Some(rows) = self.grid_span_row {
            node.grid_span_row = rows.max(1);
            changed = true;
        }
        changed
    }
}
