/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Infinite grid with a bounded render window.
//!
//! Only `columns * rows` items are revealed initially regardless of how many
//! siblings exist. The presentation layer grows the window on scroll through
//! [`VirtualWindow::reveal_more`].

use crate::grid::GridGeometry;
use crate::{ItemLayout, LayoutExtras, LayoutItem, Size, class_name};

pub const DEFAULT_VIRTUAL_ROWS: usize = 4;

/// The leading slice of `items` that the initial window renders.
pub fn visible_slice<T>(items: &[T], columns: usize) -> &[T] {
    let end = items.len().min(columns.max(1) * DEFAULT_VIRTUAL_ROWS);
    &items[..end]
}

/// Revealed-window state for one virtualized container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualWindow {
    columns: usize,
    rows_per_step: usize,
    revealed: usize,
}

impl VirtualWindow {
    pub fn new(columns: usize, rows_per_step: usize) -> Self {
        let columns = columns.max(1);
        let rows_per_step = rows_per_step.max(1);
        Self {
            columns,
            rows_per_step,
            revealed: columns * rows_per_step,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Items currently revealed (may exceed the sibling count).
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    fn step(&self) -> usize {
        self.columns * self.rows_per_step
    }

    /// Grow the window by one step, never past `total_count` rounded up to a step.
    pub fn reveal_more(&mut self, total_count: usize) -> bool {
        let ceiling = total_count.div_ceil(self.step()).max(1) * self.step();
        if self.revealed >= ceiling {
            return false;
        }
        self.revealed = (self.revealed + self.step()).min(ceiling);
        true
    }

    /// Adapt to a new column count, keeping at least as many whole rows revealed.
    pub fn set_columns(&mut self, columns: usize) {
        let columns = columns.max(1);
        if columns == self.columns {
            return;
        }
        let rows = self.revealed.div_ceil(self.columns).max(self.rows_per_step);
        self.columns = columns;
        self.revealed = rows * columns;
    }

    pub fn reset(&mut self) {
        self.revealed = self.step();
    }

    pub fn has_more(&self, total_count: usize) -> bool {
        self.revealed < total_count
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..items.len().min(self.revealed)]
    }
}

pub(crate) fn layout_virtual(
    index: usize,
    total_count: usize,
    container: Size,
    item: &LayoutItem,
    extras: &LayoutExtras,
) -> ItemLayout {
    let geometry = GridGeometry::auto_fit(container, &extras.metrics);
    let initial = geometry.columns * extras.virtual_rows.max(1);
    let revealed = extras.revealed.unwrap_or(initial).min(total_count.max(index + 1));
    let visible = index < revealed;
    ItemLayout {
        position: geometry.position_of(index),
        size: geometry.size_of(item.span),
        z_index: 1,
        class_name: class_name(
            "grid-item",
            &[("selected", extras.selected), ("hidden", !visible)],
        ),
        visible,
    }
}
