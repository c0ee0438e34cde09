/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Responsive auto-fit grid geometry.
//!
//! Column count follows the container width; cells stretch to fill the row
//! and stay square. Items are placed in reading order by index.

use crate::{GridMetrics, GridSpan, ItemLayout, LayoutExtras, LayoutItem, Point, Size, class_name};

/// Number of columns that fit `width` at the desired cell size. Never zero.
pub fn auto_fit_columns(width: f32, metrics: &GridMetrics) -> usize {
    let inner = inner_extent(width, metrics.padding);
    let cell = metrics.cell_size.max(1.0);
    let gap = metrics.gap.max(0.0);
    let fit = ((inner + gap) / (cell + gap)).floor();
    if fit.is_finite() && fit >= 1.0 {
        fit as usize
    } else {
        1
    }
}

fn inner_extent(extent: f32, padding: f32) -> f32 {
    if !extent.is_finite() {
        return 0.0;
    }
    (extent - padding.max(0.0) * 2.0).max(0.0)
}

/// Resolved geometry for one container width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub columns: usize,
    pub cell: Size,
    pub gap: f32,
    pub padding: f32,
}

impl GridGeometry {
    /// Auto-fit geometry: columns from the width, square cells stretched to fill.
    pub fn auto_fit(container: Size, metrics: &GridMetrics) -> Self {
        let columns = auto_fit_columns(container.width, metrics);
        Self::with_columns(columns, container.width, metrics)
    }

    /// Geometry for a fixed column count across `width`.
    pub fn with_columns(columns: usize, width: f32, metrics: &GridMetrics) -> Self {
        let columns = columns.max(1);
        let gap = metrics.gap.max(0.0);
        let inner = inner_extent(width, metrics.padding);
        let side = ((inner - gap * (columns as f32 - 1.0)) / columns as f32).max(0.0);
        Self {
            columns,
            cell: Size::new(side, side),
            gap,
            padding: metrics.padding.max(0.0),
        }
    }

    /// Top-left corner of the cell at `index` in reading order.
    pub fn position_of(&self, index: usize) -> Point {
        let row = index / self.columns;
        let col = index % self.columns;
        Point::new(
            self.padding + col as f32 * (self.cell.width + self.gap),
            self.padding + row as f32 * (self.cell.height + self.gap),
        )
    }

    /// Extent of an item spanning `span` cells, clamped to the column count.
    pub fn size_of(&self, span: GridSpan) -> Size {
        let cols = (span.cols.max(1) as usize).min(self.columns) as f32;
        let rows = span.rows.max(1) as f32;
        Size::new(
            self.cell.width * cols + self.gap * (cols - 1.0),
            self.cell.height * rows + self.gap * (rows - 1.0),
        )
    }

    /// Number of rows needed for `count` items.
    pub fn rows_for(&self, count: usize) -> usize {
        count.div_ceil(self.columns)
    }
}

pub(crate) fn layout_auto_fit(
    index: usize,
    container: Size,
    item: &LayoutItem,
    extras: &LayoutExtras,
) -> ItemLayout {
    let geometry = GridGeometry::auto_fit(container, &extras.metrics);
    ItemLayout {
        position: geometry.position_of(index),
        size: geometry.size_of(item.span),
        z_index: 1,
        class_name: class_name("grid-item", &[("selected", extras.selected)]),
        visible: true,
    }
}
