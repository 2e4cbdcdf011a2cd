// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Perimeter projection: where an edge meets a vertex's border.

use kurbo::{Point, Rect};

use trellis_model::keys;

/// The closed set of perimeter functions a style can name.
///
/// A perimeter maps the direction towards a neighboring point onto the
/// border of a shape. With `orthogonal`, the projection is axis-aligned
/// where the neighbor overlaps the bounds instead of aiming at the center.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Perimeter {
    /// Intersection with an axis-aligned rectangle.
    #[default]
    Rectangle,
    /// Intersection with an inscribed ellipse.
    Ellipse,
    /// Intersection with an inscribed rhombus.
    Rhombus,
    /// Intersection with an isosceles triangle pointing in the `direction`
    /// style of the vertex.
    Triangle,
}

impl Perimeter {
    /// Resolves a style value such as `"ellipsePerimeter"`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rectanglePerimeter" => Some(Self::Rectangle),
            "ellipsePerimeter" => Some(Self::Ellipse),
            "rhombusPerimeter" => Some(Self::Rhombus),
            "trianglePerimeter" => Some(Self::Triangle),
            _ => None,
        }
    }

    /// Projects `next` onto the perimeter of `bounds`.
    ///
    /// `direction` is the vertex's `direction` style, used by the triangle
    /// perimeter to pick the apex side.
    #[must_use]
    pub fn apply(self, bounds: Rect, direction: Option<&str>, next: Point, orthogonal: bool) -> Point {
        match self {
            Self::Rectangle => rectangle(bounds, next, orthogonal),
            Self::Ellipse => ellipse(bounds, next, orthogonal),
            Self::Rhombus => rhombus(bounds, next, orthogonal),
            Self::Triangle => triangle(bounds, direction, next, orthogonal),
        }
    }
}

fn rectangle(bounds: Rect, next: Point, orthogonal: bool) -> Point {
    let cx = bounds.center().x;
    let cy = bounds.center().y;
    let w = bounds.width();
    let h = bounds.height();
    let dx = next.x - cx;
    let dy = next.y - cy;
    let alpha = dy.atan2(dx);
    let beta = core::f64::consts::FRAC_PI_2 - alpha;
    let t = h.atan2(w);
    let pi = core::f64::consts::PI;

    let mut p = Point::ZERO;
    if alpha < -pi + t || alpha > pi - t {
        // Left edge
        p.x = bounds.x0;
        p.y = cy - w * alpha.tan() / 2.0;
    } else if alpha < -t {
        // Top edge
        p.y = bounds.y0;
        p.x = cx - h * beta.tan() / 2.0;
    } else if alpha < t {
        // Right edge
        p.x = bounds.x1;
        p.y = cy + w * alpha.tan() / 2.0;
    } else {
        // Bottom edge
        p.y = bounds.y1;
        p.x = cx + h * beta.tan() / 2.0;
    }

    if orthogonal {
        if next.x >= bounds.x0 && next.x <= bounds.x1 {
            p.x = next.x;
        } else if next.y >= bounds.y0 && next.y <= bounds.y1 {
            p.y = next.y;
        }
        if next.x < bounds.x0 {
            p.x = bounds.x0;
        } else if next.x > bounds.x1 {
            p.x = bounds.x1;
        }
        if next.y < bounds.y0 {
            p.y = bounds.y0;
        } else if next.y > bounds.y1 {
            p.y = bounds.y1;
        }
    }
    p
}

fn ellipse(bounds: Rect, next: Point, orthogonal: bool) -> Point {
    let a = bounds.width() / 2.0;
    let b = bounds.height() / 2.0;
    let cx = bounds.x0 + a;
    let cy = bounds.y0 + b;
    let px = next.x;
    let py = next.y;
    let dx = (px - cx).trunc();
    let dy = (py - cy).trunc();

    if dx == 0.0 && dy != 0.0 {
        return Point::new(cx, cy + b * dy / dy.abs());
    } else if dx == 0.0 && dy == 0.0 {
        return Point::new(px, py);
    }

    if orthogonal {
        if py >= bounds.y0 && py <= bounds.y1 {
            let ty = py - cy;
            let mut tx = (a * a * (1.0 - (ty * ty) / (b * b))).sqrt();
            if tx.is_nan() {
                tx = 0.0;
            }
            if px <= bounds.x0 {
                tx = -tx;
            }
            return Point::new(cx + tx, py);
        }
        if px >= bounds.x0 && px <= bounds.x1 {
            let tx = px - cx;
            let mut ty = (b * b * (1.0 - (tx * tx) / (a * a))).sqrt();
            if ty.is_nan() {
                ty = 0.0;
            }
            if py <= bounds.y0 {
                ty = -ty;
            }
            return Point::new(px, cy + ty);
        }
    }

    // Intersection of the center line with the ellipse.
    let d = dy / dx;
    let h = cy - d * cx;
    let e = a * a * d * d + b * b;
    let f = -2.0 * cx * e;
    let g = a * a * d * d * cx * cx + b * b * cx * cx - a * a * b * b;
    let det = (f * f - 4.0 * e * g).sqrt();
    let xout1 = (-f + det) / (2.0 * e);
    let xout2 = (-f - det) / (2.0 * e);
    let yout1 = d * xout1 + h;
    let yout2 = d * xout2 + h;
    let dist1 = (xout1 - px).hypot(yout1 - py);
    let dist2 = (xout2 - px).hypot(yout2 - py);
    if dist1 < dist2 {
        Point::new(xout1, yout1)
    } else {
        Point::new(xout2, yout2)
    }
}

fn rhombus(bounds: Rect, next: Point, orthogonal: bool) -> Point {
    let x = bounds.x0;
    let y = bounds.y0;
    let w = bounds.width();
    let h = bounds.height();
    let cx = x + w / 2.0;
    let cy = y + h / 2.0;
    let px = next.x;
    let py = next.y;

    if cx == px {
        return if cy > py {
            Point::new(cx, y)
        } else {
            Point::new(cx, y + h)
        };
    } else if cy == py {
        return if cx > px {
            Point::new(x, cy)
        } else {
            Point::new(x + w, cy)
        };
    }

    let mut tx = cx;
    let mut ty = cy;
    if orthogonal {
        if px >= x && px <= x + w {
            tx = px;
        } else if py >= y && py <= y + h {
            ty = py;
        }
    }

    let result = if px < cx {
        if py < cy {
            intersection(px, py, tx, ty, cx, y, x, cy)
        } else {
            intersection(px, py, tx, ty, cx, y + h, x, cy)
        }
    } else if py < cy {
        intersection(px, py, tx, ty, cx, y, x + w, cy)
    } else {
        intersection(px, py, tx, ty, cx, y + h, x + w, cy)
    };
    result.unwrap_or(Point::new(cx, cy))
}

fn triangle(bounds: Rect, direction: Option<&str>, next: Point, orthogonal: bool) -> Point {
    let direction = direction.unwrap_or(keys::EAST);
    let vertical = direction == keys::NORTH || direction == keys::SOUTH;
    let x = bounds.x0;
    let y = bounds.y0;
    let w = bounds.width();
    let h = bounds.height();
    let mut cx = x + w / 2.0;
    let mut cy = y + h / 2.0;

    let (start, corner, end) = match direction {
        keys::NORTH => (
            Point::new(x, y + h),
            Point::new(cx, y),
            Point::new(x + w, y + h),
        ),
        keys::SOUTH => (
            Point::new(x, y),
            Point::new(cx, y + h),
            Point::new(x + w, y),
        ),
        keys::WEST => (
            Point::new(x + w, y),
            Point::new(x, cy),
            Point::new(x + w, y + h),
        ),
        _ => (
            Point::new(x, y),
            Point::new(x + w, cy),
            Point::new(x, y + h),
        ),
    };

    let dx = next.x - cx;
    let dy = next.y - cy;
    let alpha = if vertical { dx.atan2(dy) } else { dy.atan2(dx) };
    let t = if vertical { w.atan2(h) } else { h.atan2(w) };
    let pi = core::f64::consts::PI;

    let base = if direction == keys::NORTH || direction == keys::WEST {
        alpha > -t && alpha < t
    } else {
        alpha < -pi + t || alpha > pi - t
    };

    let result = if base {
        if orthogonal
            && ((vertical && next.x >= start.x && next.x <= end.x)
                || (!vertical && next.y >= start.y && next.y <= end.y))
        {
            Some(if vertical {
                Point::new(next.x, start.y)
            } else {
                Point::new(start.x, next.y)
            })
        } else {
            Some(match direction {
                keys::NORTH => Point::new(x + w / 2.0 + h * alpha.tan() / 2.0, y + h),
                keys::SOUTH => Point::new(x + w / 2.0 - h * alpha.tan() / 2.0, y),
                keys::WEST => Point::new(x + w, y + h / 2.0 + w * alpha.tan() / 2.0),
                _ => Point::new(x, y + h / 2.0 - w * alpha.tan() / 2.0),
            })
        }
    } else {
        if orthogonal {
            let mut pt = Point::new(cx, cy);
            if next.y >= y && next.y <= y + h {
                pt.x = if vertical {
                    cx
                } else if direction == keys::WEST {
                    x + w
                } else {
                    x
                };
                pt.y = next.y;
            } else if next.x >= x && next.x <= x + w {
                pt.x = next.x;
                pt.y = if !vertical {
                    cy
                } else if direction == keys::NORTH {
                    y + h
                } else {
                    y
                };
            }
            cx = pt.x;
            cy = pt.y;
        }
        if (vertical && next.x <= x + w / 2.0) || (!vertical && next.y <= y + h / 2.0) {
            intersection(next.x, next.y, cx, cy, start.x, start.y, corner.x, corner.y)
        } else {
            intersection(next.x, next.y, cx, cy, corner.x, corner.y, end.x, end.y)
        }
    };
    result.unwrap_or(Point::new(cx, cy))
}

/// Intersection of the segments `(x0, y0)-(x1, y1)` and `(x2, y2)-(x3, y3)`.
#[allow(clippy::too_many_arguments)]
fn intersection(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
) -> Option<Point> {
    let denom = (y3 - y2) * (x1 - x0) - (x3 - x2) * (y1 - y0);
    let nume_a = (x3 - x2) * (y0 - y2) - (y3 - y2) * (x0 - x2);
    let nume_b = (x1 - x0) * (y0 - y2) - (y1 - y0) * (x0 - x2);
    let ua = nume_a / denom;
    let ub = nume_b / denom;
    if (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub) {
        Some(Point::new(x0 + ua * (x1 - x0), y0 + ua * (y1 - y0)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_hits_the_facing_edge() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 60.0);
        // Neighbor straight to the right: intersection on the right edge,
        // vertically centered.
        let p = Perimeter::Rectangle.apply(bounds, None, Point::new(200.0, 30.0), false);
        assert_eq!(p, Point::new(100.0, 30.0));
        // Straight above: top edge.
        let p = Perimeter::Rectangle.apply(bounds, None, Point::new(50.0, -100.0), false);
        assert!((p.y - 0.0).abs() < 1e-9);
        assert!((p.x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rectangle_orthogonal_projects_straight() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 60.0);
        let p = Perimeter::Rectangle.apply(bounds, None, Point::new(20.0, 200.0), true);
        // The neighbor overlaps horizontally, so the projection keeps its x.
        assert_eq!(p, Point::new(20.0, 60.0));
    }

    #[test]
    fn ellipse_point_lies_on_the_ellipse() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let p = Perimeter::Ellipse.apply(bounds, None, Point::new(200.0, 50.0), false);
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 50.0).abs() < 1e-9);
        // A diagonal neighbor lands on the circle of radius 50.
        let p = Perimeter::Ellipse.apply(bounds, None, Point::new(150.0, 150.0), false);
        let r = (p.x - 50.0).hypot(p.y - 50.0);
        assert!((r - 50.0).abs() < 1e-6);
    }

    #[test]
    fn rhombus_axis_aligned_neighbors_hit_the_tips() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 60.0);
        assert_eq!(
            Perimeter::Rhombus.apply(bounds, None, Point::new(50.0, -10.0), false),
            Point::new(50.0, 0.0)
        );
        assert_eq!(
            Perimeter::Rhombus.apply(bounds, None, Point::new(-10.0, 30.0), false),
            Point::new(0.0, 30.0)
        );
    }

    #[test]
    fn triangle_base_faces_away_from_the_direction() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 60.0);
        // Default direction is east: the base is the left edge.
        let p = Perimeter::Triangle.apply(bounds, None, Point::new(-100.0, 30.0), false);
        assert!((p.x - 0.0).abs() < 1e-9);
        assert!((p.y - 30.0).abs() < 1e-9);
    }

    #[test]
    fn from_name_resolves_known_perimeters() {
        assert_eq!(Perimeter::from_name("rectanglePerimeter"), Some(Perimeter::Rectangle));
        assert_eq!(Perimeter::from_name("ellipsePerimeter"), Some(Perimeter::Ellipse));
        assert_eq!(Perimeter::from_name("nope"), None);
    }
}
