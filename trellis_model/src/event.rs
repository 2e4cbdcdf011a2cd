// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transaction lifecycle events.
//!
//! The model queues an event for every step of the transaction protocol;
//! consumers drain the queue after their mutating call returns (see
//! [`Model::drain_events`](crate::Model::drain_events)). Because the model is
//! single-threaded, a consumer reacting to [`Dispatched`](ModelEvent::Dispatched)
//! may freely mutate the model again; the resulting events are simply appended
//! behind the ones being drained.

use alloc::rc::Rc;

use crate::change::{Change, UndoableEdit};

/// One step of the model's transaction protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelEvent {
    /// The outermost transaction opened (nesting 0 → 1).
    TransactionOpened,
    /// A (possibly nested) transaction level was entered.
    LevelIncreased {
        /// The nesting depth after the increment.
        level: usize,
    },
    /// A change was executed. Legacy form, kept for embedders that mirror the
    /// original protocol; always paired with [`ModelEvent::Executed`].
    Execute {
        /// The executed change.
        change: Change,
    },
    /// A change was executed.
    Executed {
        /// The executed change.
        change: Change,
    },
    /// The outermost transaction is about to close (nesting 1 → 0).
    TransactionClosing,
    /// Nesting returned to zero; carries the pending edit (possibly empty).
    LevelDecreased {
        /// The edit accumulated by the closing transaction.
        edit: Rc<UndoableEdit>,
    },
    /// A non-empty edit is about to be dispatched.
    BeforeDispatch {
        /// The completed edit.
        edit: Rc<UndoableEdit>,
    },
    /// A completed edit was dispatched. This is the notification a view or an
    /// undo history reacts to; it fires exactly once per outermost
    /// transaction that executed at least one change, and once per
    /// [`undo_edit`](crate::Model::undo_edit)/[`redo_edit`](crate::Model::redo_edit)
    /// replay.
    Dispatched {
        /// The completed edit, with changes in execution order.
        edit: Rc<UndoableEdit>,
    },
}
