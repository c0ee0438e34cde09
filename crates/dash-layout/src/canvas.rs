/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Free-form canvas placement and snapping.

use crate::grid::GridGeometry;
use crate::{DRAG_Z_INDEX, ItemLayout, LayoutExtras, LayoutItem, Point, Size, Vector, class_name};

/// Quantize one coordinate to the nearest multiple of `grid_size`.
///
/// Non-positive or non-finite grid sizes leave the value untouched.
pub fn snap_value(value: f32, grid_size: f32) -> f32 {
    if !(grid_size.is_finite() && grid_size > 0.0) || !value.is_finite() {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Snap both axes independently.
pub fn snap(point: Point, grid_size: f32) -> Point {
    Point::new(snap_value(point.x, grid_size), snap_value(point.y, grid_size))
}

/// New position for a drag that started at `origin` and moved by `pointer_delta`.
pub fn drag_position(origin: Point, pointer_delta: Vector, grid_size: f32) -> Point {
    snap(origin + pointer_delta, grid_size)
}

/// In-flight drag of one canvas item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasDrag {
    origin: Point,
    pointer_start: Point,
    pointer_current: Point,
}

impl CanvasDrag {
    pub fn begin(origin: Point, pointer: Point) -> Self {
        Self {
            origin,
            pointer_start: pointer,
            pointer_current: pointer,
        }
    }

    pub fn update(&mut self, pointer: Point) {
        self.pointer_current = pointer;
    }

    pub fn delta(&self) -> Vector {
        self.pointer_current - self.pointer_start
    }

    /// Unsnapped position while the pointer is still down.
    pub fn preview(&self) -> Point {
        self.origin + self.delta()
    }

    /// Snapped position to persist on drop.
    pub fn finish(self, grid_size: f32) -> Point {
        drag_position(self.origin, self.delta(), grid_size)
    }
}

/// Stacking orders saturate below the drag layer.
fn stacking_order(rank: usize) -> i32 {
    i32::try_from(rank).unwrap_or(i32::MAX).min(DRAG_Z_INDEX - 1)
}

pub(crate) fn layout_canvas(
    index: usize,
    total_count: usize,
    container: Size,
    item: &LayoutItem,
    extras: &LayoutExtras,
) -> ItemLayout {
    let metrics = &extras.metrics;
    // Items never placed on a canvas fall back to their auto-fit grid slot.
    let position = item.canvas_position.unwrap_or_else(|| {
        GridGeometry::auto_fit(container, metrics).position_of(index)
    });
    let size = item
        .canvas_size
        .unwrap_or_else(|| Size::new(metrics.cell_size, metrics.cell_size));
    let z_index = if extras.dragging {
        DRAG_Z_INDEX
    } else if extras.selected {
        stacking_order(total_count.saturating_add(index).saturating_add(1))
    } else {
        stacking_order(index.saturating_add(1))
    };
    ItemLayout {
        position,
        size,
        z_index,
        class_name: class_name(
            "canvas-item",
            &[("selected", extras.selected), ("dragging", extras.dragging)],
        ),
        visible: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridMetrics, LayoutMode, compute_layout};
    use proptest::prelude::*;

    #[test]
    fn test_snap_rounds_to_nearest_multiple() {
        assert_eq!(snap(Point::new(29.0, 31.0), 20.0), Point::new(20.0, 40.0));
        assert_eq!(snap(Point::new(-9.0, -11.0), 20.0), Point::new(-0.0, -20.0));
        assert_eq!(snap(Point::new(13.5, 7.2), 0.0), Point::new(13.5, 7.2));
        assert_eq!(snap(Point::new(13.5, 7.2), -5.0), Point::new(13.5, 7.2));
    }

    #[test]
    fn test_drag_applies_delta_then_snaps() {
        let mut drag = CanvasDrag::begin(Point::new(100.0, 100.0), Point::new(5.0, 5.0));
        drag.update(Point::new(38.0, -12.0));
        assert_eq!(drag.preview(), Point::new(133.0, 83.0));
        assert_eq!(drag.finish(20.0), Point::new(140.0, 80.0));
    }

    #[test]
    fn test_stored_position_wins_and_fallback_uses_grid_slot() {
        let extras = LayoutExtras {
            metrics: GridMetrics {
                cell_size: 100.0,
                gap: 0.0,
                padding: 0.0,
            },
            ..LayoutExtras::default()
        };
        let container = Size::new(300.0, 300.0);
        let unplaced = compute_layout(
            LayoutMode::Canvas,
            4,
            6,
            container,
            &LayoutItem::default(),
            &extras,
        );
        assert_eq!(unplaced.position, Point::new(100.0, 100.0));
        assert_eq!(unplaced.z_index, 5);

        let placed = LayoutItem {
            canvas_position: Some(Point::new(7.0, 9.0)),
            canvas_size: Some(Size::new(50.0, 40.0)),
            ..LayoutItem::default()
        };
        let layout = compute_layout(LayoutMode::Canvas, 4, 6, container, &placed, &extras);
        assert_eq!(layout.position, Point::new(7.0, 9.0));
        assert_eq!(layout.size, Size::new(50.0, 40.0));
    }

    #[test]
    fn test_selected_and_dragging_stack_above_siblings() {
        let container = Size::new(300.0, 300.0);
        let item = LayoutItem::default();
        let selected = LayoutExtras {
            selected: true,
            ..LayoutExtras::default()
        };
        let dragging = LayoutExtras {
            dragging: true,
            ..LayoutExtras::default()
        };
        let top_plain = compute_layout(LayoutMode::Canvas, 9, 10, container, &item, &LayoutExtras::default());
        let low_selected = compute_layout(LayoutMode::Canvas, 0, 10, container, &item, &selected);
        let dragged = compute_layout(LayoutMode::Canvas, 0, 10, container, &item, &dragging);
        assert!(low_selected.z_index > top_plain.z_index);
        assert_eq!(dragged.z_index, DRAG_Z_INDEX);
        assert!(dragged.class_name.contains("canvas-item--dragging"));
    }

    #[test]
    fn test_huge_counts_stay_below_the_drag_layer() {
        let container = Size::new(300.0, 300.0);
        let item = LayoutItem {
            canvas_position: Some(Point::new(0.0, 0.0)),
            ..LayoutItem::default()
        };
        let selected = LayoutExtras {
            selected: true,
            ..LayoutExtras::default()
        };
        let count = usize::MAX - 1;
        let plain = compute_layout(LayoutMode::Canvas, count, count, container, &item, &LayoutExtras::default());
        let picked = compute_layout(LayoutMode::Canvas, count, count, container, &item, &selected);
        assert_eq!(plain.z_index, DRAG_Z_INDEX - 1);
        assert_eq!(picked.z_index, DRAG_Z_INDEX - 1);
    }

    proptest! {
        #[test]
        fn prop_snap_is_idempotent(
            x in -1.0e5f32..1.0e5,
            y in -1.0e5f32..1.0e5,
            grid in 0.5f32..200.0,
        ) {
            let once = snap(Point::new(x, y), grid);
            let twice = snap(once, grid);
            prop_assert_eq!(once, twice);
        }
    }
}
