/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Layout engine for dashboard containers.
//!
//! Turns an ordered sibling list into concrete on-screen placement. Every
//! function here is pure: no storage, no I/O, and no loop over the full item
//! count beyond the slice that is actually visible.
//!
//! Mode families:
//! - [`LayoutMode::Grid`]: responsive auto-fit grid in reading order
//! - [`LayoutMode::GridVertical`]: infinite grid that only reveals a window
//!   of `columns * rows` items at a time
//! - [`LayoutMode::GridSquare`]: paginated grid where one page is a full
//!   `columns x columns` square
//! - [`LayoutMode::Canvas`]: free-form placement from stored coordinates,
//!   snapped to a configurable grid on drop
//!
//! Switching modes never rewrites stored canvas coordinates, so a container
//! returning to canvas mode restores its previous placement.

use euclid::default::{Point2D, Size2D, Vector2D};
use serde::de::IntoDeserializer;
use serde::de::value::{Error as DeError, StrDeserializer};
use serde::{Deserialize, Serialize};

pub mod canvas;
pub mod grid;
pub mod paginated;
pub mod virtualized;

pub use canvas::{CanvasDrag, drag_position, snap, snap_value};
pub use grid::{GridGeometry, auto_fit_columns};
pub use paginated::{Pagination, clamp_page, page_items, total_pages};
pub use virtualized::{DEFAULT_VIRTUAL_ROWS, VirtualWindow, visible_slice};

/// Point in container space (pixels, origin at the container's top-left).
pub type Point = Point2D<f32>;

/// Size in container space.
pub type Size = Size2D<f32>;

/// Pointer movement in container space.
pub type Vector = Vector2D<f32>;

/// Stacking order assigned to the item currently being dragged.
pub const DRAG_Z_INDEX: i32 = 10_000;

/// Per-container layout choice.
///
/// Mutually exclusive per container and switchable at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Responsive auto-fit grid.
    #[default]
    Grid,
    /// Infinite, virtualized grid.
    GridVertical,
    /// Paginated square grid.
    GridSquare,
    /// Free-form canvas.
    Canvas,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Grid => "grid",
            LayoutMode::GridVertical => "grid-vertical",
            LayoutMode::GridSquare => "grid-square",
            LayoutMode::Canvas => "canvas",
        }
    }

    /// Parse the wire name of a mode. Unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let name = value.trim().to_ascii_lowercase();
        let deserializer: StrDeserializer<'_, DeError> = name.as_str().into_deserializer();
        Self::deserialize(deserializer).ok()
    }
}

/// Grid cell multiplier. Migrated data is normalized to 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpan {
    pub cols: u32,
    pub rows: u32,
}

impl Default for GridSpan {
    fn default() -> Self {
        Self { cols: 1, rows: 1 }
    }
}

/// Sizing knobs shared by every grid family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    /// Desired cell edge length before stretching to fill a row.
    pub cell_size: f32,
    /// Space between neighbouring cells.
    pub gap: f32,
    /// Inner padding of the container on every side.
    pub padding: f32,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            cell_size: 180.0,
            gap: 16.0,
            padding: 16.0,
        }
    }
}

/// The per-item inputs the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutItem {
    /// Stored free-form position, if the item was ever placed on a canvas.
    pub canvas_position: Option<Point>,
    /// Stored free-form size.
    pub canvas_size: Option<Size>,
    pub span: GridSpan,
}

/// Context that is not a property of the item itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutExtras {
    pub metrics: GridMetrics,
    /// 1-based page requested for [`LayoutMode::GridSquare`].
    pub current_page: usize,
    /// Side length of one square page, in cells.
    pub square_columns: usize,
    /// Rows revealed per step for [`LayoutMode::GridVertical`].
    pub virtual_rows: usize,
    /// Items revealed so far in [`LayoutMode::GridVertical`]. `None` means
    /// the initial window.
    pub revealed: Option<usize>,
    pub selected: bool,
    pub dragging: bool,
}

impl Default for LayoutExtras {
    fn default() -> Self {
        Self {
            metrics: GridMetrics::default(),
            current_page: 1,
            square_columns: 3,
            virtual_rows: virtualized::DEFAULT_VIRTUAL_ROWS,
            revealed: None,
            selected: false,
            dragging: false,
        }
    }
}

/// Concrete placement for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLayout {
    pub position: Point,
    pub size: Size,
    pub z_index: i32,
    pub class_name: String,
    /// False when the item falls outside the visible slice or page.
    pub visible: bool,
}

/// Compute the placement of the item at `index` among `total_count` siblings.
pub fn compute_layout(
    mode: LayoutMode,
    index: usize,
    total_count: usize,
    container: Size,
    item: &LayoutItem,
    extras: &LayoutExtras,
) -> ItemLayout {
    match mode {
        LayoutMode::Grid => grid::layout_auto_fit(index, container, item, extras),
        LayoutMode::GridVertical => {
            virtualized::layout_virtual(index, total_count, container, item, extras)
        },
        LayoutMode::GridSquare => {
            paginated::layout_square(index, total_count, container, extras)
        },
        LayoutMode::Canvas => canvas::layout_canvas(index, total_count, container, item, extras),
    }
}

fn class_name(base: &str, modifiers: &[(&str, bool)]) -> String {
    let mut out = base.to_string();
    for (modifier, enabled) in modifiers {
        if *enabled {
            out.push(' ');
            out.push_str(base);
            out.push_str("--");
            out.push_str(modifier);
        }
    }
    out
}
