// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell geometry: local bounds plus edge routing data.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Vec2};

/// Geometry of one cell.
///
/// For a vertex, `rect` holds the local bounds relative to the parent origin
/// (or, when `relative` is set, `rect.x0`/`rect.y0` are fractions of the
/// parent's size). For an edge, `rect` is unused for placement; the optional
/// terminal points and waypoints describe the route, and a relative geometry
/// places the label along the path with `rect.x0` in `-1.0..=1.0`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    /// Local bounds, or the relative placement described above.
    pub rect: Rect,
    /// Interprets the coordinates as relative to the parent.
    pub relative: bool,
    /// Label displacement, applied after the (relative) placement.
    pub offset: Option<Vec2>,
    /// User-set waypoints of an edge, in parent coordinates.
    pub points: Vec<Point>,
    /// Fixed source point of an unconnected edge end.
    pub source_point: Option<Point>,
    /// Fixed target point of an unconnected edge end.
    pub target_point: Option<Point>,
}

impl Geometry {
    /// Creates a geometry with the given local bounds.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            rect: Rect::new(x, y, x + width, y + height),
            ..Self::default()
        }
    }

    /// Sets the relative flag.
    #[must_use]
    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    /// Sets the offset.
    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the fixed point of the given edge end, if set.
    #[must_use]
    pub fn terminal_point(&self, source: bool) -> Option<Point> {
        if source {
            self.source_point
        } else {
            self.target_point
        }
    }

    /// Sets the fixed point of the given edge end.
    pub fn set_terminal_point(&mut self, point: Option<Point>, source: bool) {
        if source {
            self.source_point = point;
        } else {
            self.target_point = point;
        }
    }

    /// Translates the geometry by the given delta.
    ///
    /// Relative placements are left alone; terminal points and waypoints move
    /// with the geometry.
    pub fn translate(&mut self, delta: Vec2) {
        if !self.relative {
            self.rect = self.rect + delta;
        }
        if let Some(p) = &mut self.source_point {
            *p += delta;
        }
        if let Some(p) = &mut self.target_point {
            *p += delta;
        }
        for p in &mut self.points {
            *p += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_moves_bounds_and_route_data() {
        let mut geo = Geometry::new(10.0, 10.0, 40.0, 20.0);
        geo.points.push(Point::new(0.0, 0.0));
        geo.set_terminal_point(Some(Point::new(5.0, 5.0)), true);

        geo.translate(Vec2::new(3.0, -2.0));
        assert_eq!(geo.rect, Rect::new(13.0, 8.0, 53.0, 28.0));
        assert_eq!(geo.points[0], Point::new(3.0, -2.0));
        assert_eq!(geo.terminal_point(true), Some(Point::new(8.0, 3.0)));
    }

    #[test]
    fn translate_skips_relative_placement() {
        let mut geo = Geometry::new(0.5, 0.5, 0.0, 0.0).with_relative(true);
        geo.translate(Vec2::new(100.0, 100.0));
        assert_eq!(geo.rect.origin(), Point::new(0.5, 0.5));
    }
}
