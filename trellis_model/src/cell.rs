// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cell: a vertex or edge in the diagram tree.

use alloc::string::String;
use alloc::vec::Vec;

use crate::CellId;
use crate::geometry::Geometry;
use crate::style::Style;

bitflags::bitflags! {
    /// Cell flags controlling visibility, folding, and connectability.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CellFlags: u8 {
        /// Cell participates in view validation.
        const VISIBLE     = 0b0000_0001;
        /// Children of this cell are hidden.
        const COLLAPSED   = 0b0000_0010;
        /// Edges may be connected to this cell.
        const CONNECTABLE = 0b0000_0100;
    }
}

impl Default for CellFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::CONNECTABLE
    }
}

/// The terminal pair of an edge.
///
/// A cell *is* an edge exactly when it carries a terminal pair, even while
/// both ends are unset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Terminals {
    /// The source endpoint, if connected.
    pub source: Option<CellId>,
    /// The target endpoint, if connected.
    pub target: Option<CellId>,
}

/// A node in the diagram tree.
///
/// Cells are created outside the model and handed to it via
/// [`Model::add`](crate::Model::add); from then on, all mutation goes through
/// the model so that the id index and undo history stay consistent.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub(crate) id: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) style: Style,
    pub(crate) geometry: Option<Geometry>,
    pub(crate) flags: CellFlags,
    pub(crate) parent: Option<CellId>,
    pub(crate) children: Vec<CellId>,
    /// Edges with a terminal at this cell, in connection order.
    pub(crate) edges: Vec<CellId>,
    pub(crate) terminals: Option<Terminals>,
}

impl Cell {
    /// Creates a vertex with no geometry and an empty style.
    #[must_use]
    pub fn new_vertex() -> Self {
        Self {
            flags: CellFlags::default(),
            ..Self::default()
        }
    }

    /// Creates a vertex with the given geometry and style.
    #[must_use]
    pub fn vertex(geometry: Geometry, style: Style) -> Self {
        Self {
            geometry: Some(geometry),
            style,
            flags: CellFlags::default(),
            ..Self::default()
        }
    }

    /// Creates an edge with both ends unset.
    ///
    /// Edge geometry is relative by default so that label positions are
    /// expressed along the path.
    #[must_use]
    pub fn new_edge() -> Self {
        Self::edge(Geometry::default().with_relative(true), Style::default())
    }

    /// Creates an edge with the given geometry and style.
    #[must_use]
    pub fn edge(geometry: Geometry, style: Style) -> Self {
        Self {
            geometry: Some(geometry),
            style,
            flags: CellFlags::default(),
            terminals: Some(Terminals::default()),
            ..Self::default()
        }
    }

    /// Sets the id. Ids are normally assigned by the model on insertion.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the user value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Returns the id, if assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the user value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the style.
    #[must_use]
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Returns the geometry, if any.
    #[must_use]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Returns `true` if this cell carries a terminal pair.
    #[must_use]
    pub fn is_edge(&self) -> bool {
        self.terminals.is_some()
    }

    /// Returns `true` if this cell is a vertex.
    #[must_use]
    pub fn is_vertex(&self) -> bool {
        self.terminals.is_none()
    }

    /// Returns `true` if the cell is visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(CellFlags::VISIBLE)
    }

    /// Returns `true` if the cell is collapsed.
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.flags.contains(CellFlags::COLLAPSED)
    }

    /// Returns `true` if edges may connect to the cell.
    #[must_use]
    pub fn is_connectable(&self) -> bool {
        self.flags.contains(CellFlags::CONNECTABLE)
    }

    /// Returns the parent, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<CellId> {
        self.parent
    }

    /// Returns the ordered children.
    #[must_use]
    pub fn children(&self) -> &[CellId] {
        &self.children
    }

    /// Returns the edges with a terminal at this cell.
    #[must_use]
    pub fn edges(&self) -> &[CellId] {
        &self.edges
    }

    /// Returns the source or target terminal of an edge cell.
    #[must_use]
    pub fn terminal(&self, source: bool) -> Option<CellId> {
        let terminals = self.terminals?;
        if source {
            terminals.source
        } else {
            terminals.target
        }
    }

    pub(crate) fn set_terminal(&mut self, terminal: Option<CellId>, source: bool) {
        if let Some(terminals) = &mut self.terminals {
            if source {
                terminals.source = terminal;
            } else {
                terminals.target = terminal;
            }
        }
    }

    pub(crate) fn child_index(&self, child: CellId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    pub(crate) fn link_edge(&mut self, edge: CellId) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub(crate) fn unlink_edge(&mut self, edge: CellId) {
        if let Some(pos) = self.edges.iter().position(|&e| e == edge) {
            self.edges.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_iff_terminal_pair() {
        let v = Cell::new_vertex();
        assert!(v.is_vertex());
        assert!(!v.is_edge());
        assert_eq!(v.terminal(true), None);

        let e = Cell::new_edge();
        assert!(e.is_edge());
        assert!(!e.is_vertex());
        // Both ends unset, but the pair exists.
        assert_eq!(e.terminal(true), None);
        assert_eq!(e.terminal(false), None);
    }

    #[test]
    fn default_flags() {
        let v = Cell::new_vertex();
        assert!(v.is_visible());
        assert!(v.is_connectable());
        assert!(!v.is_collapsed());
    }

    #[test]
    fn link_edge_is_idempotent() {
        let mut v = Cell::new_vertex();
        let e = CellId::new(7, 1);
        v.link_edge(e);
        v.link_edge(e);
        assert_eq!(v.edges(), &[e]);
        v.unlink_edge(e);
        assert!(v.edges().is_empty());
    }
}
