// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reversible change records and undoable edits.
//!
//! Every mutation of a [`Model`](crate::Model) is expressed as a [`Change`]:
//! a tagged value holding both the previous and the next state of exactly one
//! cell property. Applying a change [`Forward`](Direction::Forward) and then
//! [`Inverse`](Direction::Inverse) restores the model, which is what makes a
//! recorded [`UndoableEdit`] replayable in either direction.

use alloc::string::String;
use alloc::vec::Vec;

use crate::CellId;
use crate::geometry::Geometry;
use crate::style::Style;

/// Direction in which a [`Change`] is applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Apply the mutation: previous → next.
    Forward,
    /// Undo the mutation: next → previous.
    Inverse,
}

/// One atomic, reversible model mutation.
///
/// Each variant stores the affected cell together with the previous and next
/// value of the mutated property, so the record is its own inverse
/// description. Changes are built and executed by the model; they appear in
/// [`ModelEvent`](crate::ModelEvent)s and [`UndoableEdit`]s as values.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// Replaces the model root, resetting the id index.
    Root {
        /// Root before the change.
        previous: Option<CellId>,
        /// Root after the change.
        next: Option<CellId>,
    },
    /// Attaches, moves, or detaches a cell below a parent.
    Child {
        /// The cell whose parent changes.
        child: CellId,
        /// Parent before the change; `None` when the cell was detached.
        previous_parent: Option<CellId>,
        /// Child index before the change.
        previous_index: usize,
        /// Parent after the change; `None` detaches the subtree.
        parent: Option<CellId>,
        /// Child index after the change.
        index: usize,
    },
    /// Reconnects one end of an edge.
    Terminal {
        /// The edge cell.
        edge: CellId,
        /// `true` for the source end.
        source: bool,
        /// Terminal before the change.
        previous: Option<CellId>,
        /// Terminal after the change.
        next: Option<CellId>,
    },
    /// Replaces a cell's user value.
    Value {
        /// The affected cell.
        cell: CellId,
        /// Value before the change.
        previous: Option<String>,
        /// Value after the change.
        next: Option<String>,
    },
    /// Replaces a cell's style.
    Style {
        /// The affected cell.
        cell: CellId,
        /// Style before the change.
        previous: Style,
        /// Style after the change.
        next: Style,
    },
    /// Replaces a cell's geometry.
    Geometry {
        /// The affected cell.
        cell: CellId,
        /// Geometry before the change.
        previous: Option<Geometry>,
        /// Geometry after the change.
        next: Option<Geometry>,
    },
    /// Toggles a cell's collapsed flag.
    Collapsed {
        /// The affected cell.
        cell: CellId,
        /// Flag before the change.
        previous: bool,
        /// Flag after the change.
        next: bool,
    },
    /// Toggles a cell's visible flag.
    Visible {
        /// The affected cell.
        cell: CellId,
        /// Flag before the change.
        previous: bool,
        /// Flag after the change.
        next: bool,
    },
}

/// An ordered batch of changes executed inside one transaction.
///
/// Every edit the model dispatches is significant, meaning it belongs in an
/// undo history; see [`UndoableEdit::is_significant`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UndoableEdit {
    changes: Vec<Change>,
    significant: bool,
}

impl UndoableEdit {
    /// Creates an empty, significant edit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
            significant: true,
        }
    }

    /// Returns `true` if the edit contains no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns `true` if the edit should appear in an undo history.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.significant
    }

    /// Returns the changes in execution order.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub(crate) fn push(&mut self, change: Change) {
        self.changes.push(change);
    }
}
