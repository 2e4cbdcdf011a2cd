// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in edge routing styles.
//!
//! A routing style computes the interior waypoints of an edge between the
//! already-placed endpoints. The endpoints themselves are produced by the
//! fixed and floating terminal passes of [`View`] validation; styles only
//! push the points in between.

use kurbo::{Point, Rect};

use trellis_model::{Model, keys};

use crate::View;
use crate::state::CellState;

/// Default segment length of [`EdgeStyle::EntityRelation`], in unscaled
/// units.
pub const ENTITY_SEGMENT: f64 = 30.0;

/// Default segment length of [`EdgeStyle::Loop`], in unscaled units.
pub const LOOP_SEGMENT: f64 = 10.0;

/// The edge routing styles understood by the view.
///
/// A style is selected per edge through the `edgeStyle` style key, see
/// [`EdgeStyle::from_name`]. Self-loops fall back to [`EdgeStyle::Loop`]
/// regardless of the key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EdgeStyle {
    /// Entity-relation routing with fixed horizontal stubs, as used in
    /// database schema diagrams.
    EntityRelation,
    /// Self-reference routing around one side of the terminal.
    Loop,
    /// Elbow routing that picks [`EdgeStyle::SideToSide`] or
    /// [`EdgeStyle::TopToBottom`] from the terminal positions and the
    /// `elbow` style key.
    ElbowConnector,
    /// Elbow routing through a vertical segment between the terminals.
    SideToSide,
    /// Elbow routing through a horizontal segment between the terminals.
    TopToBottom,
}

impl EdgeStyle {
    /// Resolves a style name from the `edgeStyle` style key.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "entityRelationEdgeStyle" => Some(Self::EntityRelation),
            "loopEdgeStyle" => Some(Self::Loop),
            "elbowEdgeStyle" => Some(Self::ElbowConnector),
            "sideToSideEdgeStyle" => Some(Self::SideToSide),
            "topToBottomEdgeStyle" => Some(Self::TopToBottom),
            _ => None,
        }
    }

    /// Routes `edge` between its terminals, pushing interior waypoints into
    /// `result`.
    ///
    /// `points` are the edge's raw control points in parent coordinates;
    /// styles transform (or ignore) them as they see fit.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn route(
        self,
        view: &View,
        model: &Model,
        edge: &CellState,
        source: Option<&CellState>,
        target: Option<&CellState>,
        points: &[Point],
        result: &mut Vec<Point>,
    ) {
        match self {
            Self::EntityRelation => entity_relation(view, model, edge, source, target, result),
            Self::Loop => loop_route(view, edge, source, points, result),
            Self::ElbowConnector => elbow_connector(view, edge, source, target, points, result),
            Self::SideToSide => side_to_side(view, edge, source, target, points, result),
            Self::TopToBottom => top_to_bottom(view, edge, source, target, points, result),
        }
    }
}

/// A routing target: either a terminal's state or a fixed endpoint standing
/// in as a degenerate, zero-size box.
#[derive(Clone, Copy)]
struct Anchor {
    bounds: Rect,
    center_x: f64,
    center_y: f64,
}

impl Anchor {
    fn of(view: &View, state: &CellState) -> Self {
        Self {
            bounds: state.bounds,
            center_x: view.routing_center_x(state),
            center_y: view.routing_center_y(state),
        }
    }

    fn at(point: Point) -> Self {
        Self {
            bounds: Rect::new(point.x, point.y, point.x, point.y),
            center_x: point.x,
            center_y: point.y,
        }
    }

    fn resolve(
        view: &View,
        fixed: Option<Point>,
        terminal: Option<&CellState>,
    ) -> Option<Self> {
        match (fixed, terminal) {
            (Some(point), _) => Some(Self::at(point)),
            (None, Some(state)) => Some(Self::of(view, state)),
            (None, None) => None,
        }
    }

    /// Inclusive containment, so the degenerate case still holds its own
    /// point.
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.bounds.x0 && x <= self.bounds.x1 && y >= self.bounds.y0 && y <= self.bounds.y1
    }
}

fn entity_relation(
    view: &View,
    model: &Model,
    edge: &CellState,
    source: Option<&CellState>,
    target: Option<&CellState>,
    result: &mut Vec<Point>,
) {
    let segment = edge.style.f64_or(keys::SEGMENT, ENTITY_SEGMENT) * view.scale();
    let p0 = edge.absolute_terminal_point(true);
    let pe = edge.absolute_terminal_point(false);

    // The side each terminal connects on: a relative (port) geometry decides
    // by its horizontal position, otherwise the terminals' relative order
    // does.
    let mut is_source_left = false;
    if let Some(src) = source {
        if let Some(geometry) = model.geometry(src.cell) {
            if geometry.relative {
                is_source_left = geometry.rect.x0 <= 0.5;
            } else if let Some(trg) = target {
                let end = pe.map_or(trg.bounds.x1, |p| p.x);
                let start = p0.map_or(src.bounds.x0, |p| p.x);
                is_source_left = end < start;
            }
        }
    }
    let mut is_target_left = true;
    if let Some(trg) = target {
        if let Some(geometry) = model.geometry(trg.cell) {
            if geometry.relative {
                is_target_left = geometry.rect.x0 <= 0.5;
            } else if let Some(src) = source {
                let start = p0.map_or(src.bounds.x1, |p| p.x);
                let end = pe.map_or(trg.bounds.x0, |p| p.x);
                is_target_left = start < end;
            }
        }
    }

    let Some(src) = Anchor::resolve(view, p0, source) else {
        return;
    };
    let Some(trg) = Anchor::resolve(view, pe, target) else {
        return;
    };

    let x0 = if is_source_left {
        src.bounds.x0
    } else {
        src.bounds.x1
    };
    let y0 = src.center_y;
    let xe = if is_target_left {
        trg.bounds.x0
    } else {
        trg.bounds.x1
    };
    let ye = trg.center_y;

    let dx = if is_source_left { -segment } else { segment };
    let dep = Point::new(x0 + dx, y0);
    let dx = if is_target_left { -segment } else { segment };
    let arr = Point::new(xe + dx, ye);

    if is_source_left == is_target_left {
        // Both stubs leave on the same side; join them beyond the outermost
        // terminal.
        let x = if is_source_left {
            x0.min(xe) - segment
        } else {
            x0.max(xe) + segment
        };
        result.push(Point::new(x, y0));
        result.push(Point::new(x, ye));
    } else if (dep.x < arr.x) == is_source_left {
        let mid_y = y0 + (ye - y0) / 2.0;
        result.push(dep);
        result.push(Point::new(dep.x, mid_y));
        result.push(Point::new(arr.x, mid_y));
        result.push(arr);
    } else {
        result.push(dep);
        result.push(arr);
    }
}

fn loop_route(
    view: &View,
    edge: &CellState,
    source: Option<&CellState>,
    points: &[Point],
    result: &mut Vec<Point>,
) {
    let p0 = edge.absolute_terminal_point(true);
    let pe = edge.absolute_terminal_point(false);

    // With both ends fixed the loop degenerates to the user's waypoints.
    if p0.is_some() && pe.is_some() {
        for &point in points {
            result.push(view.transform_control_point(edge, point));
        }
        return;
    }
    let Some(source) = source else {
        return;
    };

    let mut pt = points
        .first()
        .map(|&point| view.transform_control_point(edge, point));
    if let Some(p) = pt {
        if Anchor::of(view, source).contains(p.x, p.y) {
            pt = None;
        }
    }

    let seg = edge.style.f64_or(keys::SEGMENT, LOOP_SEGMENT) * view.scale();
    let dir = edge.style.str_or(keys::DIRECTION, keys::WEST);

    let mut x = 0.0;
    let mut dx = 0.0;
    let mut y = 0.0;
    let mut dy = 0.0;
    if dir == keys::NORTH || dir == keys::SOUTH {
        x = view.routing_center_x(source);
        dx = seg;
    } else {
        y = view.routing_center_y(source);
        dy = seg;
    }

    if pt.is_none_or(|p| p.x < source.bounds.x0 || p.x > source.bounds.x1) {
        if let Some(p) = pt {
            x = p.x;
            dy = (y - p.y).abs().max(dy);
        } else {
            match dir {
                keys::NORTH => y = source.bounds.y0 - 2.0 * dx,
                keys::SOUTH => y = source.bounds.y1 + 2.0 * dx,
                keys::EAST => x = source.bounds.x0 - 2.0 * dy,
                _ => x = source.bounds.x1 + 2.0 * dy,
            }
        }
    } else if let Some(p) = pt {
        x = view.routing_center_x(source);
        dx = (x - p.x).abs().max(dy);
        y = p.y;
        dy = 0.0;
    }

    result.push(Point::new(x - dx, y - dy));
    result.push(Point::new(x + dx, y + dy));
}

fn elbow_connector(
    view: &View,
    edge: &CellState,
    source: Option<&CellState>,
    target: Option<&CellState>,
    points: &[Point],
    result: &mut Vec<Point>,
) {
    let mut vertical = false;
    let mut horizontal = false;

    if let (Some(src), Some(trg)) = (source, target) {
        if let Some(&raw) = points.first() {
            let left = src.bounds.x0.min(trg.bounds.x0);
            let right = src.bounds.x1.max(trg.bounds.x1);
            let top = src.bounds.y0.min(trg.bounds.y0);
            let bottom = src.bounds.y1.max(trg.bounds.y1);

            let pt = view.transform_control_point(edge, raw);
            vertical = pt.y < top || pt.y > bottom;
            horizontal = pt.x < left || pt.x > right;
        } else {
            // Without a waypoint the decision falls to the degenerate overlap
            // of the terminal projections.
            let left = src.bounds.x0.max(trg.bounds.x0);
            let right = src.bounds.x1.min(trg.bounds.x1);
            vertical = left == right;
            if !vertical {
                let top = src.bounds.y0.max(trg.bounds.y0);
                let bottom = src.bounds.y1.min(trg.bounds.y1);
                horizontal = top == bottom;
            }
        }
    }

    if !horizontal && (vertical || edge.style.get(keys::ELBOW) == Some(keys::VERTICAL)) {
        top_to_bottom(view, edge, source, target, points, result);
    } else {
        side_to_side(view, edge, source, target, points, result);
    }
}

fn side_to_side(
    view: &View,
    edge: &CellState,
    source: Option<&CellState>,
    target: Option<&CellState>,
    points: &[Point],
    result: &mut Vec<Point>,
) {
    let pt = points
        .first()
        .map(|&point| view.transform_control_point(edge, point));
    let p0 = edge.absolute_terminal_point(true);
    let pe = edge.absolute_terminal_point(false);

    let Some(src) = Anchor::resolve(view, p0, source) else {
        return;
    };
    let Some(trg) = Anchor::resolve(view, pe, target) else {
        return;
    };

    let l = src.bounds.x0.max(trg.bounds.x0);
    let r = src.bounds.x1.min(trg.bounds.x1);
    let x = pt.map_or_else(|| (r + (l - r) / 2.0).round(), |p| p.x);

    let mut y1 = src.center_y;
    let mut y2 = trg.center_y;
    if let Some(p) = pt {
        if p.y >= src.bounds.y0 && p.y <= src.bounds.y1 {
            y1 = p.y;
        }
        if p.y >= trg.bounds.y0 && p.y <= trg.bounds.y1 {
            y2 = p.y;
        }
    }

    if !trg.contains(x, y1) && !src.contains(x, y1) {
        result.push(Point::new(x, y1));
    }
    if !trg.contains(x, y2) && !src.contains(x, y2) {
        result.push(Point::new(x, y2));
    }
    if result.is_empty() {
        if let Some(p) = pt {
            if !trg.contains(x, p.y) && !src.contains(x, p.y) {
                result.push(Point::new(x, p.y));
            }
        } else {
            let t = src.bounds.y0.max(trg.bounds.y0);
            let b = src.bounds.y1.min(trg.bounds.y1);
            result.push(Point::new(x, t + (b - t) / 2.0));
        }
    }
}

fn top_to_bottom(
    view: &View,
    edge: &CellState,
    source: Option<&CellState>,
    target: Option<&CellState>,
    points: &[Point],
    result: &mut Vec<Point>,
) {
    let pt = points
        .first()
        .map(|&point| view.transform_control_point(edge, point));
    let p0 = edge.absolute_terminal_point(true);
    let pe = edge.absolute_terminal_point(false);

    let Some(src) = Anchor::resolve(view, p0, source) else {
        return;
    };
    let Some(trg) = Anchor::resolve(view, pe, target) else {
        return;
    };

    let t = src.bounds.y0.max(trg.bounds.y0);
    let b = src.bounds.y1.min(trg.bounds.y1);

    let mut x = src.center_x;
    if let Some(p) = pt {
        if p.x >= src.bounds.x0 && p.x <= src.bounds.x1 {
            x = p.x;
        }
    }
    let y = pt.map_or_else(|| (b + (t - b) / 2.0).round(), |p| p.y);

    if !trg.contains(x, y) && !src.contains(x, y) {
        result.push(Point::new(x, y));
    }

    x = match pt {
        Some(p) if p.x >= trg.bounds.x0 && p.x <= trg.bounds.x1 => p.x,
        _ => trg.center_x,
    };
    if !trg.contains(x, y) && !src.contains(x, y) {
        result.push(Point::new(x, y));
    }

    if result.is_empty() {
        if let Some(p) = pt {
            if !trg.contains(p.x, y) && !src.contains(p.x, y) {
                result.push(Point::new(p.x, y));
            }
        } else {
            let l = src.bounds.x0.max(trg.bounds.x0);
            let r = src.bounds.x1.min(trg.bounds.x1);
            result.push(Point::new(l + (r - l) / 2.0, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use trellis_model::{Cell, Geometry, Style};

    use super::*;

    fn state(model: &mut Model, x: f64, y: f64, width: f64, height: f64) -> CellState {
        let parent = model.default_parent();
        let cell = model.add_cell(
            parent,
            Cell::vertex(Geometry::new(x, y, width, height), Style::new()),
            None,
        );
        let mut state = CellState::new(cell);
        state.set_rect(x, y, width, height);
        state
    }

    fn edge_state(model: &mut Model, style: Style) -> CellState {
        let parent = model.default_parent();
        let cell = model.add_cell(parent, Cell::edge(Geometry::default(), style.clone()), None);
        let mut state = CellState::new(cell);
        state.style = style;
        state
    }

    #[test]
    fn from_name_resolves_known_styles() {
        assert_eq!(
            EdgeStyle::from_name("entityRelationEdgeStyle"),
            Some(EdgeStyle::EntityRelation)
        );
        assert_eq!(
            EdgeStyle::from_name("elbowEdgeStyle"),
            Some(EdgeStyle::ElbowConnector)
        );
        assert_eq!(EdgeStyle::from_name("bezier"), None);
    }

    #[test]
    fn entity_relation_joins_same_side_stubs() {
        let mut model = Model::new();
        let view = View::new();
        let source = state(&mut model, 0.0, 0.0, 40.0, 20.0);
        let target = state(&mut model, 0.0, 100.0, 40.0, 20.0);
        let edge = edge_state(&mut model, Style::new());

        let mut result = Vec::new();
        EdgeStyle::EntityRelation.route(
            &view,
            &model,
            &edge,
            Some(&source),
            Some(&target),
            &[],
            &mut result,
        );

        // Both terminals connect on the right; the joining segment sits one
        // entity segment beyond the rightmost edge.
        assert_eq!(result, vec![Point::new(70.0, 10.0), Point::new(70.0, 110.0)]);
    }

    #[test]
    fn loop_routes_around_the_west_side_by_default() {
        let mut model = Model::new();
        let view = View::new();
        let source = state(&mut model, 0.0, 0.0, 40.0, 20.0);
        let edge = edge_state(&mut model, Style::new());

        let mut result = Vec::new();
        EdgeStyle::Loop.route(&view, &model, &edge, Some(&source), None, &[], &mut result);

        assert_eq!(result, vec![Point::new(60.0, 0.0), Point::new(60.0, 20.0)]);
    }

    #[test]
    fn elbow_picks_a_vertical_segment_for_side_by_side_terminals() {
        let mut model = Model::new();
        let view = View::new();
        let source = state(&mut model, 0.0, 0.0, 40.0, 20.0);
        let target = state(&mut model, 100.0, 0.0, 40.0, 20.0);
        let edge = edge_state(&mut model, Style::new());

        let mut result = Vec::new();
        EdgeStyle::ElbowConnector.route(
            &view,
            &model,
            &edge,
            Some(&source),
            Some(&target),
            &[],
            &mut result,
        );

        // SideToSide routes through x = 70, the midpoint of the gap.
        assert_eq!(result, vec![Point::new(70.0, 10.0), Point::new(70.0, 10.0)]);
    }

    #[test]
    fn top_to_bottom_respects_a_waypoint() {
        let mut model = Model::new();
        let view = View::new();
        let source = state(&mut model, 0.0, 0.0, 40.0, 20.0);
        let target = state(&mut model, 0.0, 100.0, 40.0, 20.0);
        let edge = edge_state(&mut model, Style::new());

        let mut result = Vec::new();
        EdgeStyle::TopToBottom.route(
            &view,
            &model,
            &edge,
            Some(&source),
            Some(&target),
            &[Point::new(20.0, 60.0)],
            &mut result,
        );

        // The waypoint lies in both terminals' horizontal span, so both
        // passes route through it.
        assert_eq!(result, vec![Point::new(20.0, 60.0), Point::new(20.0, 60.0)]);
    }
}
