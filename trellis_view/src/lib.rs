// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis View: incremental validation of diagram display state.
//!
//! The view turns the cell tree of a [`trellis_model::Model`] into cached
//! device-space [`CellState`]s. Validation is incremental: model edits
//! invalidate exactly the affected states (the edited cell, its descendants,
//! and connected edges), and the next [`View::validate`] recomputes only
//! those. The crate provides:
//!
//! - **States** ([`CellState`]): Per-cell bounds, origin, label offsets, and
//!   for edges the routed points, segment lengths, and resolved visible
//!   terminals.
//! - **Validation** ([`View`]): State creation and removal along the visible
//!   tree, invalidation from dispatched edits, scale and translation, graph
//!   bounds, and drill-in via a current root.
//! - **Perimeters** ([`Perimeter`]): Rectangle, ellipse, rhombus, and
//!   triangle boundary intersection for floating edge ends.
//! - **Edge styles** ([`EdgeStyle`]): Entity-relation, loop, elbow,
//!   side-to-side, and top-to-bottom interior routing.
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis_model::{Cell, Geometry, Model, ModelEvent, Style};
//! use trellis_view::View;
//!
//! let mut model = Model::new();
//! let layer = model.default_parent();
//! let a = model.add_cell(layer, Cell::vertex(Geometry::new(0.0, 0.0, 40.0, 20.0), Style::new()), None);
//! let b = model.add_cell(layer, Cell::vertex(Geometry::new(100.0, 0.0, 40.0, 20.0), Style::new()), None);
//! let e = model.add_cell(layer, Cell::new_edge(), None);
//! model.set_terminals(e, Some(a), Some(b));
//!
//! let mut view = View::new();
//! view.validate(&model);
//! let _ = model.drain_events();
//!
//! // Later edits invalidate; revalidation touches only what changed.
//! model.set_geometry(b, Some(Geometry::new(100.0, 50.0, 40.0, 20.0)));
//! for event in model.drain_events().collect::<Vec<_>>() {
//!     if let ModelEvent::Dispatched { edit } = event {
//!         view.process_edit(&model, &edit);
//!     }
//! }
//! assert!(!view.state(a).unwrap().is_invalid());
//! assert!(view.state(e).unwrap().is_invalid());
//! view.validate(&model);
//! ```

mod edge_style;
mod perimeter;
mod state;
mod view;

pub use edge_style::{EdgeStyle, ENTITY_SEGMENT, LOOP_SEGMENT};
pub use perimeter::Perimeter;
pub use state::CellState;
pub use view::{ConnectionConstraint, View};
