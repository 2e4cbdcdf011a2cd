// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The transactional graph model.

use alloc::collections::VecDeque;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use kurbo::Point;

use crate::arena::Arena;
pub use crate::arena::CellId;
use crate::cell::{Cell, CellFlags, Terminals};
use crate::change::{Change, Direction, UndoableEdit};
use crate::event::ModelEvent;
use crate::geometry::Geometry;
use crate::path;
use crate::style::Style;

/// A transactional diagram model.
///
/// The model owns a tree of [`Cell`]s rooted at an invisible root whose
/// children act as layers. Every mutation is executed as a reversible
/// [`Change`], batched into an [`UndoableEdit`] by the enclosing transaction,
/// and announced through the event queue (see [`Model::drain_events`]).
///
/// # Example
///
/// ```
/// use trellis_model::{Cell, Geometry, Model, ModelEvent, Style};
///
/// let mut model = Model::new();
/// let parent = model.default_parent();
/// // Discard the root-installation edit dispatched by `Model::new`.
/// let _ = model.drain_events();
/// let (a, b, e) = model.update(|m| {
///     let a = m.add_cell(parent, Cell::vertex(Geometry::new(0.0, 0.0, 40.0, 20.0), Style::new()), None);
///     let b = m.add_cell(parent, Cell::vertex(Geometry::new(100.0, 0.0, 40.0, 20.0), Style::new()), None);
///     let e = m.add_cell(parent, Cell::new_edge(), None);
///     m.set_terminal(e, Some(a), true);
///     m.set_terminal(e, Some(b), false);
///     (a, b, e)
/// });
///
/// assert_eq!(model.terminal(e, true), Some(a));
/// assert_eq!(model.connections(b), vec![e]);
/// // Exactly one completed edit was dispatched for the whole batch.
/// let dispatched = model
///     .drain_events()
///     .filter(|ev| matches!(ev, ModelEvent::Dispatched { .. }))
///     .count();
/// assert_eq!(dispatched, 1);
/// ```
#[derive(Clone, Debug)]
pub struct Model {
    arena: Arena,
    root: Option<CellId>,
    /// String id → cell, for every cell attached below the root.
    index: HashMap<String, CellId>,

    /// Assign ids to cells inserted without one.
    pub create_ids: bool,
    /// Re-parent edges to the nearest common ancestor of their terminals.
    pub maintain_edge_parent: bool,
    /// Resolve edge terminals past relative-geometry ancestors when
    /// maintaining edge parents.
    pub ignore_relative_edge_parent: bool,
    /// Prefix prepended to generated ids.
    pub id_prefix: String,
    /// Postfix appended to generated ids.
    pub id_postfix: String,
    next_id: u64,

    update_level: usize,
    ending_update: bool,
    current_edit: UndoableEdit,
    events: VecDeque<ModelEvent>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates a model with a fresh root and one default layer.
    ///
    /// Installing the root is itself a transaction, so the event queue starts
    /// out non-empty; drain or ignore those events as appropriate.
    #[must_use]
    pub fn new() -> Self {
        let mut model = Self {
            arena: Arena::new(),
            root: None,
            index: HashMap::new(),
            create_ids: true,
            maintain_edge_parent: true,
            ignore_relative_edge_parent: true,
            id_prefix: String::new(),
            id_postfix: String::new(),
            next_id: 0,
            update_level: 0,
            ending_update: false,
            current_edit: UndoableEdit::new(),
            events: VecDeque::new(),
        };
        model.clear();
        model
    }

    /// Replaces the entire tree with a fresh root and one default layer.
    pub fn clear(&mut self) {
        let root = self.create_root();
        self.set_root(Some(root));
    }

    fn create_root(&mut self) -> CellId {
        let root = self.arena.insert(Cell::new_vertex());
        let layer = self.arena.insert(Cell::new_vertex());
        // Spliced directly; registration happens when the root is installed.
        if let Some(cell) = self.arena.get_mut(layer) {
            cell.parent = Some(root);
        }
        if let Some(cell) = self.arena.get_mut(root) {
            cell.children.push(layer);
        }
        root
    }

    // --- Accessors -------------------------------------------------------

    /// Returns the root cell.
    #[must_use]
    pub fn root(&self) -> Option<CellId> {
        self.root
    }

    /// Returns the first layer, the usual parent for new cells.
    ///
    /// # Panics
    ///
    /// Panics if the root has been replaced with one that has no children.
    #[must_use]
    pub fn default_parent(&self) -> CellId {
        self.root
            .and_then(|r| self.children(r).first().copied())
            .expect("model has no layer")
    }

    /// Returns `true` if the handle refers to a live cell.
    #[must_use]
    pub fn is_alive(&self, cell: CellId) -> bool {
        self.arena.is_alive(cell)
    }

    /// Looks up a cell by its string id.
    #[must_use]
    pub fn get_cell(&self, id: &str) -> Option<CellId> {
        self.index.get(id).copied()
    }

    /// Returns the string id of a cell, if assigned.
    #[must_use]
    pub fn id_of(&self, cell: CellId) -> Option<&str> {
        self.arena.get(cell)?.id()
    }

    /// Returns the parent of a cell.
    #[must_use]
    pub fn parent(&self, cell: CellId) -> Option<CellId> {
        self.arena.get(cell)?.parent()
    }

    /// Returns the ordered children of a cell.
    #[must_use]
    pub fn children(&self, cell: CellId) -> &[CellId] {
        self.arena.get(cell).map_or(&[], Cell::children)
    }

    /// Returns the number of children of a cell.
    #[must_use]
    pub fn child_count(&self, cell: CellId) -> usize {
        self.children(cell).len()
    }

    /// Returns the child at `index`.
    #[must_use]
    pub fn child_at(&self, cell: CellId, index: usize) -> Option<CellId> {
        self.children(cell).get(index).copied()
    }

    /// Returns the index of `child` below `parent`.
    #[must_use]
    pub fn child_index(&self, parent: CellId, child: CellId) -> Option<usize> {
        self.arena.get(parent)?.child_index(child)
    }

    /// Returns the edges with a terminal at the given cell, in connection
    /// order.
    #[must_use]
    pub fn edges(&self, cell: CellId) -> &[CellId] {
        self.arena.get(cell).map_or(&[], Cell::edges)
    }

    /// Returns the source (`true`) or target (`false`) terminal of an edge.
    #[must_use]
    pub fn terminal(&self, edge: CellId, source: bool) -> Option<CellId> {
        self.arena.get(edge)?.terminal(source)
    }

    /// Returns the geometry of a cell, if any.
    #[must_use]
    pub fn geometry(&self, cell: CellId) -> Option<&Geometry> {
        self.arena.get(cell)?.geometry()
    }

    /// Returns the style of a cell.
    #[must_use]
    pub fn style(&self, cell: CellId) -> Option<&Style> {
        self.arena.get(cell).map(Cell::style)
    }

    /// Returns the user value of a cell.
    #[must_use]
    pub fn value(&self, cell: CellId) -> Option<&str> {
        self.arena.get(cell)?.value()
    }

    /// Returns `true` if the cell is an edge.
    #[must_use]
    pub fn is_edge(&self, cell: CellId) -> bool {
        self.arena.get(cell).is_some_and(Cell::is_edge)
    }

    /// Returns `true` if the cell is a vertex.
    #[must_use]
    pub fn is_vertex(&self, cell: CellId) -> bool {
        self.arena.get(cell).is_some_and(Cell::is_vertex)
    }

    /// Returns `true` if the cell is visible.
    #[must_use]
    pub fn is_visible(&self, cell: CellId) -> bool {
        self.arena.get(cell).is_some_and(Cell::is_visible)
    }

    /// Returns `true` if the cell is collapsed.
    #[must_use]
    pub fn is_collapsed(&self, cell: CellId) -> bool {
        self.arena.get(cell).is_some_and(Cell::is_collapsed)
    }

    /// Returns `true` if edges may connect to the cell.
    #[must_use]
    pub fn is_connectable(&self, cell: CellId) -> bool {
        self.arena.get(cell).is_some_and(Cell::is_connectable)
    }

    /// Returns `true` if the cell is a direct child of the root.
    #[must_use]
    pub fn is_layer(&self, cell: CellId) -> bool {
        self.root.is_some() && self.parent(cell) == self.root
    }

    // --- Transactions ----------------------------------------------------

    /// Opens a (possibly nested) transaction.
    ///
    /// Pair with [`end_update`](Self::end_update); prefer
    /// [`update`](Self::update) which cannot be left unbalanced.
    pub fn begin_update(&mut self) {
        self.update_level += 1;
        self.events.push_back(ModelEvent::LevelIncreased {
            level: self.update_level,
        });
        if self.update_level == 1 {
            self.events.push_back(ModelEvent::TransactionOpened);
        }
    }

    /// Closes a transaction. When the outermost one closes, the accumulated
    /// edit is dispatched if it contains any changes.
    pub fn end_update(&mut self) {
        self.update_level = self.update_level.saturating_sub(1);
        if self.update_level == 0 {
            self.events.push_back(ModelEvent::TransactionClosing);
        }
        if !self.ending_update {
            self.ending_update = self.update_level == 0;
            if self.ending_update {
                let edit = Rc::new(core::mem::replace(
                    &mut self.current_edit,
                    UndoableEdit::new(),
                ));
                self.events.push_back(ModelEvent::LevelDecreased {
                    edit: edit.clone(),
                });
                if !edit.is_empty() {
                    self.events.push_back(ModelEvent::BeforeDispatch {
                        edit: edit.clone(),
                    });
                    self.events.push_back(ModelEvent::Dispatched { edit });
                }
            }
            self.ending_update = false;
        }
    }

    /// Runs `f` inside a transaction.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    /// Returns the current transaction nesting depth.
    #[must_use]
    pub fn update_level(&self) -> usize {
        self.update_level
    }

    /// Drains the queued [`ModelEvent`]s in emission order.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ModelEvent> + '_ {
        self.events.drain(..)
    }

    /// Applies the change forward, records it in the current edit, and emits
    /// the execution events inside a transaction of its own.
    pub fn execute(&mut self, change: Change) {
        self.apply_change(&change, Direction::Forward);
        self.begin_update();
        self.current_edit.push(change.clone());
        self.events.push_back(ModelEvent::Execute {
            change: change.clone(),
        });
        self.events.push_back(ModelEvent::Executed { change });
        self.end_update();
    }

    /// Replays a completed edit backwards, restoring the model to its state
    /// before the edit, and dispatches the edit again.
    pub fn undo_edit(&mut self, edit: &UndoableEdit) {
        for change in edit.changes().iter().rev() {
            self.apply_change(change, Direction::Inverse);
        }
        self.events.push_back(ModelEvent::Dispatched {
            edit: Rc::new(edit.clone()),
        });
    }

    /// Replays a completed edit forwards and dispatches it again.
    pub fn redo_edit(&mut self, edit: &UndoableEdit) {
        for change in edit.changes() {
            self.apply_change(change, Direction::Forward);
        }
        self.events.push_back(ModelEvent::Dispatched {
            edit: Rc::new(edit.clone()),
        });
    }

    // --- Change application ----------------------------------------------

    fn apply_change(&mut self, change: &Change, direction: Direction) {
        let forward = direction == Direction::Forward;
        match change {
            Change::Root { previous, next } => {
                self.root_changed(if forward { *next } else { *previous });
            }
            Change::Child {
                child,
                previous_parent,
                previous_index,
                parent,
                index,
            } => {
                let (parent, index) = if forward {
                    (*parent, *index)
                } else {
                    (*previous_parent, *previous_index)
                };
                self.child_changed(*child, parent, index);
            }
            Change::Terminal {
                edge,
                source,
                previous,
                next,
            } => {
                let terminal = if forward { *next } else { *previous };
                self.terminal_changed(*edge, terminal, *source);
            }
            Change::Value {
                cell,
                previous,
                next,
            } => {
                let value = if forward { next } else { previous };
                if let Some(c) = self.arena.get_mut(*cell) {
                    c.value = value.clone();
                }
            }
            Change::Style {
                cell,
                previous,
                next,
            } => {
                let style = if forward { next } else { previous };
                if let Some(c) = self.arena.get_mut(*cell) {
                    c.style = style.clone();
                }
            }
            Change::Geometry {
                cell,
                previous,
                next,
            } => {
                let geometry = if forward { next } else { previous };
                if let Some(c) = self.arena.get_mut(*cell) {
                    c.geometry = geometry.clone();
                }
            }
            Change::Collapsed {
                cell,
                previous,
                next,
            } => {
                let collapsed = if forward { *next } else { *previous };
                if let Some(c) = self.arena.get_mut(*cell) {
                    c.flags.set(CellFlags::COLLAPSED, collapsed);
                }
            }
            Change::Visible {
                cell,
                previous,
                next,
            } => {
                let visible = if forward { *next } else { *previous };
                if let Some(c) = self.arena.get_mut(*cell) {
                    c.flags.set(CellFlags::VISIBLE, visible);
                }
            }
        }
    }

    fn root_changed(&mut self, root: Option<CellId>) {
        self.root = root;
        self.next_id = 0;
        self.index.clear();
        if let Some(root) = root {
            self.cell_added(root);
        }
    }

    fn child_changed(&mut self, child: CellId, parent: Option<CellId>, index: usize) {
        if parent.is_none() {
            self.connect(child, false);
        }
        let previous = self.parent(child);
        match parent {
            Some(p) => {
                if previous != Some(p) || self.child_index(p, child) != Some(index) {
                    if let Some(prev) = previous {
                        if let Some(cell) = self.arena.get_mut(prev) {
                            cell.children.retain(|&c| c != child);
                        }
                    }
                    if let Some(cell) = self.arena.get_mut(p) {
                        let index = index.min(cell.children.len());
                        cell.children.insert(index, child);
                    }
                    if let Some(cell) = self.arena.get_mut(child) {
                        cell.parent = Some(p);
                    }
                }
            }
            None => {
                if let Some(prev) = previous {
                    if let Some(cell) = self.arena.get_mut(prev) {
                        cell.children.retain(|&c| c != child);
                    }
                    if let Some(cell) = self.arena.get_mut(child) {
                        cell.parent = None;
                    }
                }
            }
        }
        if parent.is_some() {
            self.connect(child, true);
        }
        let attached = parent.is_some_and(|p| self.contains(p));
        let was_attached = previous.is_some_and(|p| self.contains(p));
        if attached && !was_attached {
            self.cell_added(child);
        } else if was_attached && !attached {
            self.cell_removed(child);
        }
    }

    /// Links or unlinks the incident-edge lists for every edge in the given
    /// subtree, keeping the terminal fields intact.
    fn connect(&mut self, cell: CellId, is_connect: bool) {
        let (source, target) = match self.arena.get(cell).and_then(|c| c.terminals) {
            Some(Terminals { source, target }) => (source, target),
            None => (None, None),
        };
        for terminal in [source, target].into_iter().flatten() {
            if let Some(t) = self.arena.get_mut(terminal) {
                if is_connect {
                    t.link_edge(cell);
                } else {
                    t.unlink_edge(cell);
                }
            }
        }
        for child in self.children(cell).to_vec() {
            self.connect(child, is_connect);
        }
    }

    fn terminal_changed(&mut self, edge: CellId, terminal: Option<CellId>, source: bool) {
        if let Some(previous) = self.terminal(edge, source) {
            // A self-loop stays linked while the other end still points here.
            if self.terminal(edge, !source) != Some(previous) {
                if let Some(cell) = self.arena.get_mut(previous) {
                    cell.unlink_edge(edge);
                }
            }
            if let Some(cell) = self.arena.get_mut(edge) {
                cell.set_terminal(None, source);
            }
        }
        if let Some(terminal) = terminal {
            if let Some(cell) = self.arena.get_mut(edge) {
                cell.set_terminal(Some(terminal), source);
            }
            if let Some(cell) = self.arena.get_mut(terminal) {
                cell.link_edge(edge);
            }
        }
    }

    fn cell_added(&mut self, cell: CellId) {
        let needs_id = self.arena.get(cell).is_some_and(|c| c.id.is_none());
        if needs_id && self.create_ids {
            let id = self.create_id();
            if let Some(c) = self.arena.get_mut(cell) {
                c.id = Some(id);
            }
        }
        if let Some(mut key) = self.arena.get(cell).and_then(|c| c.id.clone()) {
            // Regenerate on collision with a different cell.
            while self.index.get(&key).is_some_and(|&existing| existing != cell) {
                key = self.create_id();
            }
            if let Some(c) = self.arena.get_mut(cell) {
                c.id = Some(key.clone());
            }
            if let Ok(numeric) = key.parse::<u64>() {
                // Numeric ids advance the generator so they are never reused.
                self.next_id = self.next_id.max(numeric + 1);
            }
            self.index.insert(key, cell);
        }
        for child in self.children(cell).to_vec() {
            self.cell_added(child);
        }
    }

    fn cell_removed(&mut self, cell: CellId) {
        for child in self.children(cell).to_vec() {
            self.cell_removed(child);
        }
        // The cell keeps its id string; re-attaching restores the same entry.
        if let Some(key) = self.arena.get(cell).and_then(|c| c.id.clone()) {
            if self.index.get(&key) == Some(&cell) {
                self.index.remove(&key);
            }
        }
    }

    fn create_id(&mut self) -> String {
        let id = format!("{}{}{}", self.id_prefix, self.next_id, self.id_postfix);
        self.next_id += 1;
        id
    }

    // --- Structural mutation ---------------------------------------------

    /// Stores a cell in the model without attaching it to the tree.
    ///
    /// The returned handle is used with [`add`](Self::add); detached cells
    /// are invisible to all queries that walk the tree.
    pub fn alloc(&mut self, cell: Cell) -> CellId {
        self.arena.insert(cell)
    }

    /// Stores `cell` and attaches it below `parent` in one step.
    pub fn add_cell(&mut self, parent: CellId, cell: Cell, index: Option<usize>) -> CellId {
        let child = self.alloc(cell);
        self.add(parent, child, index);
        child
    }

    /// Replaces the root, resetting the id index and the id generator.
    pub fn set_root(&mut self, root: Option<CellId>) {
        self.execute(Change::Root {
            previous: self.root,
            next: root,
        });
    }

    /// Attaches `child` below `parent` at `index` (append when `None`).
    ///
    /// Attaching a cell to itself or to one of its own descendants is a
    /// silent no-op. When the parent actually changes and
    /// [`maintain_edge_parent`](Self::maintain_edge_parent) is set, edges in
    /// the moved subtree are re-parented to the nearest common ancestor of
    /// their terminals.
    pub fn add(&mut self, parent: CellId, child: CellId, index: Option<usize>) {
        if child == parent
            || !self.arena.is_alive(parent)
            || !self.arena.is_alive(child)
            || self.is_ancestor(child, parent)
        {
            return;
        }
        let index = index.unwrap_or_else(|| {
            let mut i = self.child_count(parent);
            if self.parent(child) == Some(parent) {
                i = i.saturating_sub(1);
            }
            i
        });
        let previous_parent = self.parent(child);
        let previous_index = previous_parent
            .and_then(|p| self.child_index(p, child))
            .unwrap_or(0);
        let parent_changed = previous_parent != Some(parent);
        self.execute(Change::Child {
            child,
            previous_parent,
            previous_index,
            parent: Some(parent),
            index,
        });
        if self.maintain_edge_parent && parent_changed {
            self.update_edge_parents(child, None);
        }
    }

    /// Detaches a cell from the tree; removing the root clears it.
    ///
    /// The cell and its subtree stay addressable so an undo can restore them.
    pub fn remove(&mut self, cell: CellId) {
        if Some(cell) == self.root {
            self.set_root(None);
        } else if let Some(previous_parent) = self.parent(cell) {
            let previous_index = self.child_index(previous_parent, cell).unwrap_or(0);
            self.execute(Change::Child {
                child: cell,
                previous_parent: Some(previous_parent),
                previous_index,
                parent: None,
                index: 0,
            });
        }
    }

    /// Connects one end of an edge, or disconnects it with `None`.
    pub fn set_terminal(&mut self, edge: CellId, terminal: Option<CellId>, source: bool) {
        if !self.is_edge(edge) {
            return;
        }
        let previous = self.terminal(edge, source);
        let terminal_changed = terminal != previous;
        self.execute(Change::Terminal {
            edge,
            source,
            previous,
            next: terminal,
        });
        if self.maintain_edge_parent && terminal_changed {
            if let Some(root) = self.root {
                self.update_edge_parent(edge, root);
            }
        }
    }

    /// Connects both ends of an edge in one transaction.
    pub fn set_terminals(
        &mut self,
        edge: CellId,
        source: Option<CellId>,
        target: Option<CellId>,
    ) {
        self.update(|m| {
            m.set_terminal(edge, source, true);
            m.set_terminal(edge, target, false);
        });
    }

    /// Replaces a cell's geometry; equal geometry is a silent no-op.
    pub fn set_geometry(&mut self, cell: CellId, geometry: Option<Geometry>) {
        let Some(c) = self.arena.get(cell) else {
            return;
        };
        if c.geometry == geometry {
            return;
        }
        self.execute(Change::Geometry {
            cell,
            previous: c.geometry.clone(),
            next: geometry,
        });
    }

    /// Replaces a cell's style; an equal style is a silent no-op.
    pub fn set_style(&mut self, cell: CellId, style: Style) {
        let Some(c) = self.arena.get(cell) else {
            return;
        };
        if c.style == style {
            return;
        }
        self.execute(Change::Style {
            cell,
            previous: c.style.clone(),
            next: style,
        });
    }

    /// Replaces a cell's user value; an equal value is a silent no-op.
    pub fn set_value(&mut self, cell: CellId, value: Option<String>) {
        let Some(c) = self.arena.get(cell) else {
            return;
        };
        if c.value == value {
            return;
        }
        self.execute(Change::Value {
            cell,
            previous: c.value.clone(),
            next: value,
        });
    }

    /// Sets a cell's collapsed flag; no change is recorded if it already has
    /// that value.
    pub fn set_collapsed(&mut self, cell: CellId, collapsed: bool) {
        let Some(c) = self.arena.get(cell) else {
            return;
        };
        let previous = c.is_collapsed();
        if previous == collapsed {
            return;
        }
        self.execute(Change::Collapsed {
            cell,
            previous,
            next: collapsed,
        });
    }

    /// Sets a cell's visible flag; no change is recorded if it already has
    /// that value.
    pub fn set_visible(&mut self, cell: CellId, visible: bool) {
        let Some(c) = self.arena.get(cell) else {
            return;
        };
        let previous = c.is_visible();
        if previous == visible {
            return;
        }
        self.execute(Change::Visible {
            cell,
            previous,
            next: visible,
        });
    }

    // --- Edge parent maintenance -----------------------------------------

    /// Re-parents every edge in the subtree of `cell` to the nearest common
    /// ancestor of its terminals.
    ///
    /// `root` bounds the scan; `None` uses the topmost ancestor of `cell`.
    pub fn update_edge_parents(&mut self, cell: CellId, root: Option<CellId>) {
        let root = root.unwrap_or_else(|| self.root_of(cell));
        for child in self.children(cell).to_vec() {
            self.update_edge_parents(child, Some(root));
        }
        for edge in self.edges(cell).to_vec() {
            if self.is_ancestor(root, edge) {
                self.update_edge_parent(edge, root);
            }
        }
    }

    fn update_edge_parent(&mut self, edge: CellId, root: CellId) {
        let source = self.relative_anchor(self.terminal(edge, true));
        let target = self.relative_anchor(self.terminal(edge, false));
        let (Some(source), Some(target)) = (source, target) else {
            return;
        };
        if !self.is_ancestor(root, source) || !self.is_ancestor(root, target) {
            return;
        }
        let cell = if source == target {
            self.parent(source)
        } else {
            self.nearest_common_ancestor(source, target)
        };
        let Some(cell) = cell else {
            return;
        };
        // Never hoist an edge into a layer it is not already under.
        if (self.parent(cell) != self.root || self.is_ancestor(cell, edge))
            && self.parent(edge) != Some(cell)
        {
            let origin1 = self.origin(self.parent(edge));
            let origin2 = self.origin(Some(cell));
            let delta = origin2 - origin1;
            if let Some(mut geo) = self.geometry(edge).cloned() {
                geo.translate(-delta);
                self.set_geometry(edge, Some(geo));
            }
            let index = self.child_count(cell);
            self.add(cell, edge, Some(index));
        }
    }

    /// Walks a terminal up past relative-geometry ancestors.
    fn relative_anchor(&self, terminal: Option<CellId>) -> Option<CellId> {
        let mut current = terminal;
        while let Some(cell) = current {
            if self.is_edge(cell) || !self.ignore_relative_edge_parent {
                break;
            }
            match self.geometry(cell) {
                Some(geo) if geo.relative => current = self.parent(cell),
                _ => break,
            }
        }
        current
    }

    // --- Derived queries -------------------------------------------------

    /// Returns `true` if `parent` is `child` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, parent: CellId, child: CellId) -> bool {
        let mut current = Some(child);
        while let Some(cell) = current {
            if cell == parent {
                return true;
            }
            current = self.parent(cell);
        }
        false
    }

    /// Returns `true` if the cell is attached below the model root.
    #[must_use]
    pub fn contains(&self, cell: CellId) -> bool {
        self.root.is_some_and(|root| self.is_ancestor(root, cell))
    }

    /// Returns the topmost ancestor of a cell.
    #[must_use]
    pub fn root_of(&self, cell: CellId) -> CellId {
        let mut current = cell;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Returns the deepest cell that is an ancestor of (or equal to) both
    /// arguments, or `None` when they belong to different trees.
    #[must_use]
    pub fn nearest_common_ancestor(&self, cell1: CellId, cell2: CellId) -> Option<CellId> {
        if !self.arena.is_alive(cell1) || !self.arena.is_alive(cell2) {
            return None;
        }
        if cell1 == cell2 {
            return Some(cell1);
        }
        if self.root_of(cell1) != self.root_of(cell2) {
            return None;
        }
        let path1 = path::create(self, cell1);
        let path2 = path::create(self, cell2);
        // Walk the deeper cell up; the first ancestor whose path prefixes the
        // other path is the answer. The shared tree root always qualifies.
        let (mut cell, mut current, other) = if path2.len() < path1.len() {
            (cell2, path2, path1)
        } else {
            (cell1, path1, path2)
        };
        loop {
            if path::is_ancestor(&current, &other) {
                return Some(cell);
            }
            let parent = self.parent(cell)?;
            current = path::parent(&current)?.into();
            cell = parent;
        }
    }

    /// Returns the cell and all its descendants in depth-first order.
    #[must_use]
    pub fn descendants(&self, parent: CellId) -> Vec<CellId> {
        self.filter_descendants(Some(parent), |_| true)
    }

    /// Returns the cells in the subtree of `parent` (the model root when
    /// `None`) for which `filter` returns `true`, in depth-first order.
    #[must_use]
    pub fn filter_descendants(
        &self,
        parent: Option<CellId>,
        mut filter: impl FnMut(CellId) -> bool,
    ) -> Vec<CellId> {
        let mut result = Vec::new();
        let Some(parent) = parent.or(self.root) else {
            return result;
        };
        self.filter_descendants_into(parent, &mut filter, &mut result);
        result
    }

    fn filter_descendants_into(
        &self,
        cell: CellId,
        filter: &mut impl FnMut(CellId) -> bool,
        result: &mut Vec<CellId>,
    ) {
        if filter(cell) {
            result.push(cell);
        }
        for &child in self.children(cell) {
            self.filter_descendants_into(child, filter, result);
        }
    }

    /// Returns the edges between `source` and `target`, scanning the smaller
    /// incident-edge list. With `directed`, only source→target edges match.
    #[must_use]
    pub fn edges_between(&self, source: CellId, target: CellId, directed: bool) -> Vec<CellId> {
        let terminal = if self.edges(source).len() <= self.edges(target).len() {
            source
        } else {
            target
        };
        let mut result = Vec::new();
        for &edge in self.edges(terminal) {
            let src = self.terminal(edge, true);
            let tgt = self.terminal(edge, false);
            let forward = src == Some(source) && tgt == Some(target);
            let backward = tgt == Some(source) && src == Some(target);
            if forward || (!directed && backward) {
                result.push(edge);
            }
        }
        result
    }

    /// Returns the incident edges of a cell, filtered by direction.
    ///
    /// Self-loops are reported only when `include_loops` is set.
    #[must_use]
    pub fn edges_of(
        &self,
        cell: CellId,
        incoming: bool,
        outgoing: bool,
        include_loops: bool,
    ) -> Vec<CellId> {
        let mut result = Vec::new();
        for &edge in self.edges(cell) {
            let src = self.terminal(edge, true);
            let tgt = self.terminal(edge, false);
            let is_loop = src == tgt && src == Some(cell);
            let matches = (incoming && tgt == Some(cell)) || (outgoing && src == Some(cell));
            if (include_loops && is_loop) || (src != tgt && matches) {
                result.push(edge);
            }
        }
        result
    }

    /// Returns all distinct edges at a cell, excluding self-loops.
    #[must_use]
    pub fn connections(&self, cell: CellId) -> Vec<CellId> {
        self.edges_of(cell, true, true, false)
    }

    /// Returns the edges ending at the cell.
    #[must_use]
    pub fn incoming_edges(&self, cell: CellId) -> Vec<CellId> {
        self.edges_of(cell, true, false, false)
    }

    /// Returns the edges starting at the cell.
    #[must_use]
    pub fn outgoing_edges(&self, cell: CellId) -> Vec<CellId> {
        self.edges_of(cell, false, true, false)
    }

    /// Counts the edges whose source (`outgoing`) or target end is `cell`,
    /// optionally ignoring one edge.
    #[must_use]
    pub fn directed_edge_count(
        &self,
        cell: CellId,
        outgoing: bool,
        ignored_edge: Option<CellId>,
    ) -> usize {
        self.edges(cell)
            .iter()
            .filter(|&&edge| {
                Some(edge) != ignored_edge && self.terminal(edge, outgoing) == Some(cell)
            })
            .count()
    }

    /// Returns the terminals opposite to `terminal` along the given edges.
    ///
    /// `sources`/`targets` select which end of each edge may be reported.
    #[must_use]
    pub fn opposites(
        &self,
        edges: &[CellId],
        terminal: CellId,
        sources: bool,
        targets: bool,
    ) -> Vec<CellId> {
        let mut result = Vec::new();
        for &edge in edges {
            let src = self.terminal(edge, true);
            let tgt = self.terminal(edge, false);
            if src == Some(terminal) && tgt.is_some() && tgt != Some(terminal) {
                if targets {
                    result.extend(tgt);
                }
            } else if tgt == Some(terminal) && src.is_some() && src != Some(terminal) && sources {
                result.extend(src);
            }
        }
        result
    }

    /// Returns the cells of the given set that have no ancestor in the set.
    #[must_use]
    pub fn topmost_cells(&self, cells: &[CellId]) -> Vec<CellId> {
        let set: HashSet<CellId> = cells.iter().copied().collect();
        let mut result = Vec::new();
        for &cell in cells {
            let mut topmost = true;
            let mut current = self.parent(cell);
            while let Some(parent) = current {
                if set.contains(&parent) {
                    topmost = false;
                    break;
                }
                current = self.parent(parent);
            }
            if topmost {
                result.push(cell);
            }
        }
        result
    }

    /// Returns the children of `parent` that are vertices (`vertices`) or
    /// edges (`edges`).
    #[must_use]
    pub fn child_cells(&self, parent: CellId, vertices: bool, edges: bool) -> Vec<CellId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| (vertices && self.is_vertex(c)) || (edges && self.is_edge(c)))
            .collect()
    }

    /// Returns the child vertices of a cell.
    #[must_use]
    pub fn child_vertices(&self, parent: CellId) -> Vec<CellId> {
        self.child_cells(parent, true, false)
    }

    /// Returns the child edges of a cell.
    #[must_use]
    pub fn child_edges(&self, parent: CellId) -> Vec<CellId> {
        self.child_cells(parent, false, true)
    }

    /// Returns the accumulated geometry offset of a cell's ancestors,
    /// including the cell itself unless it is an edge.
    #[must_use]
    pub fn origin(&self, cell: Option<CellId>) -> Point {
        let Some(cell) = cell else {
            return Point::ZERO;
        };
        let mut result = self.origin(self.parent(cell));
        if !self.is_edge(cell) {
            if let Some(geo) = self.geometry(cell) {
                result.x += geo.rect.x0;
                result.y += geo.rect.y0;
            }
        }
        result
    }

    // --- Cloning and merging ---------------------------------------------

    /// Clones the given cells (and their subtrees when `include_children`),
    /// remapping terminals onto clones for edges whose terminals are inside
    /// the cloned set.
    ///
    /// Clones are detached and carry no ids; attach them with
    /// [`add`](Self::add).
    pub fn clone_cells(
        &mut self,
        cells: &[CellId],
        include_children: bool,
    ) -> Vec<Option<CellId>> {
        let mut mapping: HashMap<CellId, CellId> = HashMap::new();
        let mut clones = Vec::with_capacity(cells.len());
        for &cell in cells {
            clones.push(self.clone_cell_impl(cell, &mut mapping, include_children));
        }
        for (&cell, &clone) in cells.iter().zip(&clones) {
            if let Some(clone) = clone {
                self.restore_clone(clone, cell, &mapping);
            }
        }
        clones
    }

    fn clone_cell_impl(
        &mut self,
        cell: CellId,
        mapping: &mut HashMap<CellId, CellId>,
        include_children: bool,
    ) -> Option<CellId> {
        let original = self.arena.get(cell)?;
        let data = Cell {
            id: None,
            value: original.value.clone(),
            style: original.style.clone(),
            geometry: original.geometry.clone(),
            flags: original.flags,
            parent: None,
            children: Vec::new(),
            edges: Vec::new(),
            terminals: original.terminals.map(|_| Terminals::default()),
        };
        let clone = self.arena.insert(data);
        mapping.insert(cell, clone);
        if include_children {
            for child in self.children(cell).to_vec() {
                if let Some(child_clone) = self.clone_cell_impl(child, mapping, true) {
                    if let Some(c) = self.arena.get_mut(child_clone) {
                        c.parent = Some(clone);
                    }
                    if let Some(c) = self.arena.get_mut(clone) {
                        c.children.push(child_clone);
                    }
                }
            }
        }
        Some(clone)
    }

    fn restore_clone(&mut self, clone: CellId, cell: CellId, mapping: &HashMap<CellId, CellId>) {
        for source in [true, false] {
            if let Some(terminal) = self.terminal(cell, source) {
                if let Some(&mapped) = mapping.get(&terminal) {
                    self.terminal_changed(clone, Some(mapped), source);
                }
            }
        }
        let pairs: Vec<_> = self
            .children(clone)
            .iter()
            .copied()
            .zip(self.children(cell).iter().copied())
            .collect();
        for (child_clone, child) in pairs {
            self.restore_clone(child_clone, child, mapping);
        }
    }

    /// Merges the children of `from_parent` in another model below `to`.
    ///
    /// Vertices carrying an id that already exists here are reused; all other
    /// cells (and every edge) are cloned with their ids preserved. Edge
    /// terminals are remapped onto the merged cells where possible.
    pub fn merge_children(&mut self, from: &Self, from_parent: CellId, to: CellId) {
        self.begin_update();
        let mut mapping: HashMap<String, CellId> = HashMap::new();
        let mut pairs: Vec<(CellId, CellId)> = Vec::new();
        self.merge_children_impl(from, from_parent, to, &mut mapping, &mut pairs);
        for (original, merged) in pairs {
            if !from.is_edge(original) {
                continue;
            }
            for source in [true, false] {
                if let Some(terminal) = from.terminal(original, source) {
                    let key = path::create(from, terminal);
                    if let Some(&mapped) = mapping.get(&key) {
                        self.set_terminal(merged, Some(mapped), source);
                    }
                }
            }
        }
        self.end_update();
    }

    fn merge_children_impl(
        &mut self,
        from: &Self,
        from_parent: CellId,
        to: CellId,
        mapping: &mut HashMap<String, CellId>,
        pairs: &mut Vec<(CellId, CellId)>,
    ) {
        self.begin_update();
        for cell in from.children(from_parent).to_vec() {
            let id = from.arena.get(cell).and_then(|c| c.id.clone());
            let target = match (&id, from.is_edge(cell)) {
                (Some(id), false) => self.get_cell(id),
                _ => None,
            };
            let target = match target {
                Some(target) => target,
                None => {
                    let Some(original) = from.arena.get(cell) else {
                        continue;
                    };
                    let data = Cell {
                        id: id.clone(),
                        value: original.value.clone(),
                        style: original.style.clone(),
                        geometry: original.geometry.clone(),
                        flags: original.flags,
                        parent: None,
                        children: Vec::new(),
                        edges: Vec::new(),
                        terminals: original.terminals.map(|_| Terminals::default()),
                    };
                    let clone = self.arena.insert(data);
                    // Spliced directly; going through `add` would re-run the
                    // edge-parent maintenance and move the clone away.
                    if let Some(c) = self.arena.get_mut(clone) {
                        c.parent = Some(to);
                    }
                    if let Some(c) = self.arena.get_mut(to) {
                        c.children.push(clone);
                    }
                    self.cell_added(clone);
                    clone
                }
            };
            mapping.insert(path::create(from, cell), target);
            pairs.push((cell, target));
            self.merge_children_impl(from, cell, target, mapping, pairs);
        }
        self.end_update();
    }
}
