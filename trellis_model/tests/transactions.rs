// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the transaction protocol of `trellis_model`.
//!
//! These exercise the event sequence around mutations, the batching of
//! nested updates into one dispatched edit, replaying edits in both
//! directions, and automatic edge re-parenting.

use std::rc::Rc;

use kurbo::Point;
use trellis_model::{
    Cell, Change, Geometry, Model, ModelEvent, Style, UndoableEdit,
};

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

#[test]
fn a_bare_mutation_runs_the_full_event_sequence() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let v = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
    let _ = model.drain_events();

    model.set_value(v, Some("hello".into()));
    let events: Vec<_> = model.drain_events().collect();

    assert_eq!(events.len(), 8);
    assert!(matches!(events[0], ModelEvent::LevelIncreased { level: 1 }));
    assert!(matches!(events[1], ModelEvent::TransactionOpened));
    assert!(matches!(events[2], ModelEvent::Execute { .. }));
    assert!(matches!(events[3], ModelEvent::Executed { .. }));
    assert!(matches!(events[4], ModelEvent::TransactionClosing));
    assert!(matches!(events[5], ModelEvent::LevelDecreased { .. }));
    assert!(matches!(events[6], ModelEvent::BeforeDispatch { .. }));
    assert!(matches!(events[7], ModelEvent::Dispatched { .. }));
}

#[test]
fn nested_updates_dispatch_one_edit_in_execution_order() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let v = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
    let _ = model.drain_events();

    model.update(|m| {
        m.set_value(v, Some("outer".into()));
        m.update(|m| m.set_collapsed(v, true));
    });

    let edits = dispatched(&mut model);
    assert_eq!(edits.len(), 1);
    let changes = edits[0].changes();
    assert_eq!(changes.len(), 2);
    assert!(matches!(changes[0], Change::Value { .. }));
    assert!(matches!(changes[1], Change::Collapsed { .. }));
}

#[test]
fn an_empty_transaction_dispatches_nothing() {
    let mut model = Model::new();
    let _ = model.drain_events();

    model.update(|_| {});
    let events: Vec<_> = model.drain_events().collect();

    assert!(events.iter().any(
        |e| matches!(e, ModelEvent::LevelDecreased { edit } if edit.is_empty())
    ));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ModelEvent::Dispatched { .. }))
    );
}

#[test]
fn an_edit_replays_in_both_directions() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let _ = model.drain_events();

    let (v, e) = model.update(|m| {
        let v = m.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
        let e = m.add_cell(layer, Cell::new_edge(), None);
        m.set_terminal(e, Some(v), true);
        (v, e)
    });

    let edits = dispatched(&mut model);
    assert_eq!(edits.len(), 1);

    model.undo_edit(&edits[0]);
    assert!(!model.contains(v));
    assert!(!model.contains(e));
    // The cells stay addressable for a redo.
    assert!(model.is_alive(v));
    assert!(model.is_alive(e));

    model.redo_edit(&edits[0]);
    assert!(model.contains(v));
    assert!(model.contains(e));
    assert_eq!(model.terminal(e, true), Some(v));
}

#[test]
fn undo_restores_child_order() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let a = model.add_cell(layer, vertex(0.0, 0.0, 10.0, 10.0), None);
    let b = model.add_cell(layer, vertex(20.0, 0.0, 10.0, 10.0), None);
    let c = model.add_cell(layer, vertex(40.0, 0.0, 10.0, 10.0), None);
    let _ = model.drain_events();

    model.update(|m| m.add(layer, a, Some(2)));
    assert_eq!(model.children(layer), &[b, c, a]);

    let edits = dispatched(&mut model);
    model.undo_edit(&edits[0]);
    assert_eq!(model.children(layer), &[a, b, c]);
}

#[test]
fn moving_a_terminal_reparents_the_edge_to_the_common_ancestor() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let g1 = model.add_cell(layer, vertex(10.0, 10.0, 100.0, 100.0), None);
    let g2 = model.add_cell(layer, vertex(200.0, 10.0, 100.0, 100.0), None);
    let a = model.add_cell(g1, vertex(10.0, 10.0, 20.0, 20.0), None);
    let b = model.add_cell(g2, vertex(10.0, 10.0, 20.0, 20.0), None);

    let mut geometry = Geometry::default().with_relative(true);
    geometry.points.push(Point::new(50.0, 50.0));
    let e = model.add_cell(layer, Cell::edge(geometry, Style::new()), None);
    model.set_terminals(e, Some(a), Some(b));

    // Terminals live under different groups; the edge stays on the layer.
    assert_eq!(model.parent(e), Some(layer));

    model.add(g1, b, None);

    // Both terminals are now under g1, and the edge follows, its waypoint
    // translated into the new parent's coordinates.
    assert_eq!(model.parent(e), Some(g1));
    assert_eq!(
        model.geometry(e).unwrap().points,
        vec![Point::new(40.0, 40.0)]
    );
}

#[test]
fn edge_reparenting_is_idempotent() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let g1 = model.add_cell(layer, vertex(10.0, 10.0, 100.0, 100.0), None);
    let a = model.add_cell(g1, vertex(10.0, 10.0, 20.0, 20.0), None);
    let b = model.add_cell(g1, vertex(50.0, 50.0, 20.0, 20.0), None);
    let e = model.add_cell(layer, Cell::new_edge(), None);

    // Connecting the terminals already moves the edge under their group.
    model.set_terminals(e, Some(a), Some(b));
    assert_eq!(model.parent(e), Some(g1));
    let geometry = model.geometry(e).cloned();
    let children = model.children(g1).to_vec();
    let _ = model.drain_events();

    // A second maintenance pass finds every edge in place and changes
    // nothing.
    model.update_edge_parents(layer, None);

    assert_eq!(model.parent(e), Some(g1));
    assert_eq!(model.geometry(e).cloned(), geometry);
    assert_eq!(model.children(g1), children);
    assert!(dispatched(&mut model).is_empty());
}

#[test]
fn self_loop_edges_parent_under_the_terminal_parent() {
    let mut model = Model::new();
    let layer = model.default_parent();
    let group = model.add_cell(layer, vertex(0.0, 0.0, 100.0, 100.0), None);
    let a = model.add_cell(group, vertex(10.0, 10.0, 20.0, 20.0), None);
    let e = model.add_cell(layer, Cell::new_edge(), None);

    model.set_terminals(e, Some(a), Some(a));

    assert_eq!(model.parent(e), Some(group));
}
