// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Model: a transactional graph model for interactive diagrams.
//!
//! The model holds a single tree of cells (vertices and edges) below an
//! invisible root whose children act as layers. Edges additionally connect a
//! source and a target cell, forming a graph on top of the tree. The crate
//! provides:
//!
//! - **Cells** ([`Cell`], [`CellId`]): Vertices and edges with geometry,
//!   style, user value, and visibility/folding flags, stored in a
//!   generational arena and addressed by small copyable handles.
//! - **Changes** ([`Change`], [`UndoableEdit`]): Every mutation is recorded
//!   as a reversible change carrying both the previous and the next state,
//!   batched per transaction into an undoable edit.
//! - **Transactions** ([`Model::update`], [`Model::begin_update`]): Nested
//!   batching with exactly one dispatched edit per outermost transaction.
//! - **Events** ([`ModelEvent`]): A drainable queue announcing every step of
//!   the transaction protocol, for views and undo histories to react to.
//! - **Graph queries**: Ancestry, nearest common ancestors, incident and
//!   directed edges, opposite terminals, subtree filtering, cloning, and
//!   cross-model merging.
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis_model::{Cell, Geometry, Model, Style};
//!
//! let mut model = Model::new();
//! let layer = model.default_parent();
//!
//! model.update(|m| {
//!     let a = m.add_cell(layer, Cell::vertex(Geometry::new(20.0, 20.0, 80.0, 30.0), Style::new()), None);
//!     let b = m.add_cell(layer, Cell::vertex(Geometry::new(200.0, 150.0, 80.0, 30.0), Style::new()), None);
//!     let e = m.add_cell(layer, Cell::new_edge(), None);
//!     m.set_terminals(e, Some(a), Some(b));
//! });
//!
//! // The whole batch is one undoable edit.
//! let edits: Vec<_> = model
//!     .drain_events()
//!     .filter_map(|ev| match ev {
//!         trellis_model::ModelEvent::Dispatched { edit } => Some(edit),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(edits.len(), 2); // root installation + the batch
//! model.undo_edit(&edits[1]);
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. The `std` feature (default)
//! enables `kurbo/std`; disable it and enable `libm` for floating-point
//! support without `std`.

#![no_std]

extern crate alloc;

mod arena;
mod cell;
mod change;
mod event;
mod geometry;
mod model;
pub mod path;
mod style;

pub use arena::CellId;
pub use cell::{Cell, CellFlags, Terminals};
pub use change::{Change, Direction, UndoableEdit};
pub use event::ModelEvent;
pub use geometry::Geometry;
pub use model::Model;
pub use style::{Style, keys};
