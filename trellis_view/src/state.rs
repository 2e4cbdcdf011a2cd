// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached per-cell display state.

use kurbo::{Point, Rect};
use smallvec::SmallVec;

use trellis_model::{CellId, Style};

/// The validated device-space state of one cell.
///
/// States are created and kept current by [`View`](crate::View); consumers
/// read them after validation. All coordinates are in device space, that is
/// after the view translate and scale have been applied.
#[derive(Clone, Debug)]
pub struct CellState {
    /// The cell this state describes.
    pub cell: CellId,
    /// The style the state was computed with.
    pub style: Style,
    /// Accumulated unscaled origin of the parent chain.
    pub origin: Point,
    /// Device-space bounds. For an edge these are the bounds of the routed
    /// points.
    pub bounds: Rect,
    /// Geometry width before scaling.
    pub unscaled_width: f64,
    /// Geometry height before scaling.
    pub unscaled_height: f64,
    /// Device-space label position.
    pub absolute_offset: Point,
    /// Routed points of an edge: `[source, waypoints…, target]`. Endpoints
    /// are `None` until the floating terminal pass has filled them.
    pub absolute_points: SmallVec<[Option<Point>; 4]>,
    /// Resolved visible source terminal, if any.
    pub visible_source: Option<CellId>,
    /// Resolved visible target terminal, if any.
    pub visible_target: Option<CellId>,
    /// Distance between the two endpoints of an edge.
    pub terminal_distance: f64,
    /// Total length of an edge's routed path.
    pub length: f64,
    /// Lengths of the individual path segments.
    pub segments: SmallVec<[f64; 4]>,

    pub(crate) invalid: bool,
    pub(crate) invalid_style: bool,
}

impl CellState {
    /// Creates an invalid state for the given cell.
    #[must_use]
    pub fn new(cell: CellId) -> Self {
        Self {
            cell,
            style: Style::new(),
            origin: Point::ZERO,
            bounds: Rect::ZERO,
            unscaled_width: 0.0,
            unscaled_height: 0.0,
            absolute_offset: Point::ZERO,
            absolute_points: SmallVec::new(),
            visible_source: None,
            visible_target: None,
            terminal_distance: 0.0,
            length: 0.0,
            segments: SmallVec::new(),
            invalid: true,
            invalid_style: true,
        }
    }

    /// Returns `true` if the state needs revalidation.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Returns the device-space center.
    #[must_use]
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// Returns the bounds grown by `border` on every side.
    #[must_use]
    pub fn perimeter_bounds(&self, border: f64) -> Rect {
        self.bounds.inflate(border, border)
    }

    /// Returns the routed endpoint of an edge, if already placed.
    #[must_use]
    pub fn absolute_terminal_point(&self, source: bool) -> Option<Point> {
        if source {
            self.absolute_points.first().copied().flatten()
        } else {
            self.absolute_points.last().copied().flatten()
        }
    }

    /// Returns the resolved visible terminal of an edge end.
    #[must_use]
    pub fn visible_terminal(&self, source: bool) -> Option<CellId> {
        if source {
            self.visible_source
        } else {
            self.visible_target
        }
    }

    pub(crate) fn set_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.bounds = Rect::new(x, y, x + width, y + height);
    }

    pub(crate) fn set_absolute_terminal_point(&mut self, point: Option<Point>, source: bool) {
        if source {
            if self.absolute_points.is_empty() {
                self.absolute_points.push(point);
            } else {
                self.absolute_points[0] = point;
            }
        } else if self.absolute_points.len() < 2 {
            while self.absolute_points.is_empty() {
                self.absolute_points.push(None);
            }
            self.absolute_points.push(point);
        } else {
            let last = self.absolute_points.len() - 1;
            self.absolute_points[last] = point;
        }
    }
}
