/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Paginated square grid.
//!
//! A page is one full square of `columns x columns` cells, so
//! `total_pages = ceil(total_count / columns²)`. Pages are 1-based. A page
//! that no longer exists after the item count shrinks clamps back to 1.

use std::ops::Range;

use crate::grid::GridGeometry;
use crate::{ItemLayout, LayoutExtras, Point, Size, class_name};

/// Number of pages needed for `total_count` items at `columns` per side.
pub fn total_pages(total_count: usize, columns: usize) -> usize {
    let columns = columns.max(1);
    total_count.div_ceil(columns * columns)
}

/// Clamp a requested 1-based page. Out-of-range requests resolve to page 1.
pub fn clamp_page(current_page: usize, total_pages: usize) -> usize {
    if current_page == 0 || current_page > total_pages {
        1
    } else {
        current_page
    }
}

/// Items shown on `page` (after clamping).
pub fn page_items<T>(items: &[T], columns: usize, page: usize) -> &[T] {
    let range = Pagination::new(items.len(), columns, page).item_range();
    &items[range]
}

/// Resolved pagination state for one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub columns: usize,
    pub per_page: usize,
    pub total_count: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

impl Pagination {
    pub fn new(total_count: usize, columns: usize, requested_page: usize) -> Self {
        let columns = columns.max(1);
        let total_pages = total_pages(total_count, columns);
        Self {
            columns,
            per_page: columns * columns,
            total_count,
            total_pages,
            current_page: clamp_page(requested_page, total_pages),
        }
    }

    /// Index range of the current page within the full sibling list.
    pub fn item_range(&self) -> Range<usize> {
        let start = ((self.current_page - 1) * self.per_page).min(self.total_count);
        let end = (start + self.per_page).min(self.total_count);
        start..end
    }

    pub fn page_of(&self, index: usize) -> usize {
        index / self.per_page + 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn next(&self) -> Self {
        Self::new(
            self.total_count,
            self.columns,
            if self.has_next() {
                self.current_page + 1
            } else {
                self.current_page
            },
        )
    }

    pub fn previous(&self) -> Self {
        Self::new(
            self.total_count,
            self.columns,
            self.current_page.saturating_sub(1).max(1),
        )
    }
}

pub(crate) fn layout_square(
    index: usize,
    total_count: usize,
    container: Size,
    extras: &LayoutExtras,
) -> ItemLayout {
    let pagination = Pagination::new(total_count, extras.square_columns, extras.current_page);
    let metrics = &extras.metrics;
    let side = container.width.min(container.height);
    let geometry = GridGeometry::with_columns(pagination.columns, side, metrics);
    let local = index % pagination.per_page;
    let visible = pagination.item_range().contains(&index);
    let position = if visible {
        geometry.position_of(local)
    } else {
        Point::new(metrics.padding, metrics.padding)
    };
    ItemLayout {
        position,
        size: geometry.cell,
        z_index: 1,
        class_name: class_name(
            "grid-square-item",
            &[("selected", extras.selected), ("offpage", !visible)],
        ),
        visible,
    }
}
