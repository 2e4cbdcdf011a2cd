// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the edit → invalidate → validate cycle of `trellis_view`.
//!
//! These drive a [`Model`] and a [`View`] together the way an embedder
//! would: mutate the model, feed the dispatched edits to the view, and
//! revalidate, checking that exactly the affected states change.

use std::rc::Rc;

use kurbo::{Point, Rect};
use trellis_model::{Cell, Geometry, Model, ModelEvent, Style, UndoableEdit};
use trellis_view::View;

fn vertex(x: f64, y: f64, width: f64, height: f64) -> Cell {
    Cell::vertex(Geometry::new(x, y, width, height), Style::new())
}

fn dispatched(model: &mut Model) -> Vec<Rc<UndoableEdit>> {
    model
        .drain_events()
        .filter_map(|event| match event {
            ModelEvent::Dispatched { edit } => Some(edit),
            _ => None,
        })
        .collect()
}

fn apply(view: &mut View, model: &mut Model) {
    for edit in dispatched(model) {
        view.process_edit(model, &edit);
    }
}

fn routed_points(view: &View, edge: trellis_model::CellId) -> Vec<Point> {
    view.state(edge)
        .expect("edge state")
        .absolute_points
        .iter()
        .copied()
        .flatten()
        .collect()
}

// Perimeter projection goes through trigonometry, so routed coordinates sit
// a few ulps off the geometric answer.
fn assert_points_near(actual: &[Point], expected: &[Point]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} != {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((*a - *e).hypot() < 1e-9, "{actual:?} != {expected:?}");
    }
}

#[test]
fn batched_terminal_swap_dispatches_once_and_reroutes() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
    let b = model.add_cell(layer, vertex(100.0, 0.0, 40.0, 20.0), None);
    let c = model.add_cell(layer, vertex(0.0, 100.0, 40.0, 20.0), None);
    let e = model.add_cell(layer, Cell::new_edge(), None);
    model.set_terminals(e, Some(a), Some(b));

    let mut view = View::new();
    view.validate(&model);
    let _ = dispatched(&mut model);

    assert_points_near(
        &routed_points(&view, e),
        &[Point::new(40.0, 10.0), Point::new(100.0, 10.0)],
    );

    model.update(|m| m.set_terminal(e, Some(c), true));
    let edits = dispatched(&mut model);
    assert_eq!(edits.len(), 1);
    view.process_edit(&model, &edits[0]);

    // Only the edge was invalidated.
    assert!(view.state(e).unwrap().is_invalid());
    assert!(!view.state(a).unwrap().is_invalid());
    assert!(!view.state(b).unwrap().is_invalid());
    assert!(!view.state(c).unwrap().is_invalid());

    view.validate(&model);
    let state = view.state(e).unwrap();
    assert_eq!(state.visible_terminal(true), Some(c));
    assert_points_near(
        &routed_points(&view, e),
        &[Point::new(30.0, 100.0), Point::new(110.0, 20.0)],
    );
}

#[test]
fn incremental_validation_matches_a_fresh_view() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
    let b = model.add_cell(layer, vertex(100.0, 0.0, 40.0, 20.0), None);
    let e = model.add_cell(layer, Cell::new_edge(), None);
    model.set_terminals(e, Some(a), Some(b));

    let mut view = View::new();
    view.validate(&model);
    let _ = dispatched(&mut model);

    // A few rounds of typical edits, applied incrementally.
    model.set_geometry(a, Some(Geometry::new(0.0, 60.0, 40.0, 20.0)));
    apply(&mut view, &mut model);
    view.validate(&model);

    model.set_style(
        e,
        Style::new().with("edgeStyle", "elbowEdgeStyle"),
    );
    apply(&mut view, &mut model);
    view.validate(&model);

    let (d, e2) = model.update(|m| {
        let d = m.add_cell(layer, vertex(200.0, 60.0, 40.0, 20.0), None);
        let e2 = m.add_cell(layer, Cell::new_edge(), None);
        m.set_terminals(e2, Some(b), Some(d));
        (d, e2)
    });
    apply(&mut view, &mut model);
    view.validate(&model);

    let mut fresh = View::new();
    fresh.validate(&model);

    for cell in [a, b, d, e, e2] {
        let incremental = view.state(cell).expect("incremental state");
        let reference = fresh.state(cell).expect("fresh state");
        assert_eq!(incremental.bounds, reference.bounds, "bounds of {cell:?}");
        assert_eq!(
            incremental.absolute_points, reference.absolute_points,
            "points of {cell:?}"
        );
        assert_eq!(
            incremental.absolute_offset, reference.absolute_offset,
            "label offset of {cell:?}"
        );
    }
    assert_eq!(view.graph_bounds(), fresh.graph_bounds());
}

#[test]
fn collapsing_a_group_reroutes_edges_to_the_group() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let group = model.add_cell(layer, vertex(0.0, 0.0, 60.0, 40.0), None);
    let inner = model.add_cell(group, vertex(10.0, 10.0, 20.0, 10.0), None);
    let b = model.add_cell(layer, vertex(200.0, 0.0, 40.0, 40.0), None);
    let e = model.add_cell(layer, Cell::new_edge(), None);
    model.set_terminals(e, Some(inner), Some(b));

    let mut view = View::new();
    view.validate(&model);
    let _ = dispatched(&mut model);
    assert_eq!(
        view.state(e).unwrap().visible_terminal(true),
        Some(inner)
    );

    model.set_collapsed(group, true);
    apply(&mut view, &mut model);
    view.validate(&model);

    assert!(view.state(inner).is_none());
    let state = view.state(e).unwrap();
    assert_eq!(state.visible_terminal(true), Some(group));
    assert_points_near(
        &[state.absolute_terminal_point(true).unwrap()],
        &[Point::new(60.0, 20.0)],
    );

    // Expanding again restores the child terminal.
    model.set_collapsed(group, false);
    apply(&mut view, &mut model);
    view.validate(&model);

    assert!(view.state(inner).is_some());
    assert_eq!(
        view.state(e).unwrap().visible_terminal(true),
        Some(inner)
    );
}

#[test]
fn undoing_an_edit_restores_the_previous_layout() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);

    let mut view = View::new();
    view.validate(&model);
    let _ = dispatched(&mut model);
    assert_eq!(view.state(a).unwrap().bounds, Rect::new(0.0, 0.0, 40.0, 20.0));

    model.set_geometry(a, Some(Geometry::new(0.0, 50.0, 40.0, 20.0)));
    let edits = dispatched(&mut model);
    assert_eq!(edits.len(), 1);
    view.process_edit(&model, &edits[0]);
    view.validate(&model);
    assert_eq!(view.state(a).unwrap().bounds, Rect::new(0.0, 50.0, 40.0, 70.0));

    model.undo_edit(&edits[0]);
    apply(&mut view, &mut model);
    view.validate(&model);
    assert_eq!(view.state(a).unwrap().bounds, Rect::new(0.0, 0.0, 40.0, 20.0));

    model.redo_edit(&edits[0]);
    apply(&mut view, &mut model);
    view.validate(&model);
    assert_eq!(view.state(a).unwrap().bounds, Rect::new(0.0, 50.0, 40.0, 70.0));
}

#[test]
fn hiding_and_showing_a_vertex_drops_and_recreates_states() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
    let b = model.add_cell(layer, vertex(100.0, 0.0, 40.0, 20.0), None);
    let e = model.add_cell(layer, Cell::new_edge(), None);
    model.set_terminals(e, Some(a), Some(b));

    let mut view = View::new();
    view.validate(&model);
    let _ = dispatched(&mut model);

    model.set_visible(b, false);
    apply(&mut view, &mut model);
    view.validate(&model);
    assert!(view.state(b).is_none());
    assert!(view.state(e).is_none());

    model.set_visible(b, true);
    apply(&mut view, &mut model);
    view.validate(&model);
    assert!(view.state(b).is_some());
    assert_points_near(
        &routed_points(&view, e),
        &[Point::new(40.0, 10.0), Point::new(100.0, 10.0)],
    );
}

#[test]
fn drilling_into_a_group_rebuilds_the_view() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let group = model.add_cell(layer, vertex(50.0, 50.0, 100.0, 100.0), None);
    let inner = model.add_cell(group, vertex(10.0, 10.0, 20.0, 20.0), None);

    let mut view = View::new();
    view.validate(&model);
    assert_eq!(
        view.state(inner).unwrap().bounds,
        Rect::new(60.0, 60.0, 80.0, 80.0)
    );

    view.set_current_root(Some(group));
    view.validate(&model);

    // The group is now the coordinate origin; the child's own geometry
    // stands alone.
    assert_eq!(
        view.state(inner).unwrap().bounds,
        Rect::new(10.0, 10.0, 30.0, 30.0)
    );
}
