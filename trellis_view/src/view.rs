// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The incremental view: cached cell states and their validation.

use hashbrown::{HashMap, HashSet};
use kurbo::{Line, ParamCurveNearest, Point, Rect, Size, Vec2};

use trellis_model::{Change, CellId, Geometry, Model, Style, UndoableEdit, keys};

use crate::edge_style::EdgeStyle;
use crate::perimeter::Perimeter;
use crate::state::CellState;

/// A fixed connection point of one edge end, read from the edge style.
///
/// The point is in fractions of the terminal bounds; `dx`/`dy` are absolute
/// offsets added after scaling. With `perimeter` set the resulting point is
/// projected onto the terminal's perimeter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionConstraint {
    /// Fractional position within the terminal bounds, if fixed.
    pub point: Option<Point>,
    /// Projects the point onto the terminal perimeter.
    pub perimeter: bool,
    /// Absolute x offset, scaled with the view.
    pub dx: f64,
    /// Absolute y offset, scaled with the view.
    pub dy: f64,
}

impl ConnectionConstraint {
    /// Reads the constraint of the given edge end from an edge style.
    #[must_use]
    pub fn from_style(style: &Style, source: bool) -> Self {
        let (kx, ky, kdx, kdy, kperimeter) = if source {
            (
                keys::EXIT_X,
                keys::EXIT_Y,
                keys::EXIT_DX,
                keys::EXIT_DY,
                keys::EXIT_PERIMETER,
            )
        } else {
            (
                keys::ENTRY_X,
                keys::ENTRY_Y,
                keys::ENTRY_DX,
                keys::ENTRY_DY,
                keys::ENTRY_PERIMETER,
            )
        };
        let point = match (style.get_f64(kx), style.get_f64(ky)) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        };
        let mut perimeter = true;
        let mut dx = 0.0;
        let mut dy = 0.0;
        if point.is_some() {
            perimeter = style.bool_or(kperimeter, true);
            dx = style.f64_or(kdx, 0.0);
            dy = style.f64_or(kdy, 0.0);
        }
        Self {
            point,
            perimeter,
            dx,
            dy,
        }
    }
}

/// The display side of a diagram: a cache of [`CellState`]s kept current
/// incrementally.
///
/// The view owns no model; every operation that needs the cell tree takes the
/// [`Model`] as an argument. The intended cycle is: apply model edits, feed
/// the dispatched [`UndoableEdit`]s to [`View::process_edit`], then call
/// [`View::validate`], which recomputes exactly the invalidated states.
///
/// # Example
///
/// ```rust
/// use trellis_model::{Cell, Geometry, Model, Style};
/// use trellis_view::View;
///
/// let mut model = Model::new();
/// let layer = model.default_parent();
/// let v = model.add_cell(
///     layer,
///     Cell::vertex(Geometry::new(20.0, 20.0, 80.0, 30.0), Style::new()),
///     None,
/// );
///
/// let mut view = View::new();
/// view.validate(&model);
/// assert_eq!(view.state(v).unwrap().bounds.origin(), (20.0, 20.0).into());
/// ```
#[derive(Clone, Debug)]
pub struct View {
    states: HashMap<CellId, CellState>,
    scale: f64,
    translate: Vec2,
    current_root: Option<CellId>,
    graph_bounds: Rect,
    validated: Vec<CellId>,
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

impl View {
    /// Creates an empty view with scale `1.0` and no translation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            scale: 1.0,
            translate: Vec2::ZERO,
            current_root: None,
            graph_bounds: Rect::ZERO,
            validated: Vec::new(),
        }
    }

    /// Returns the current zoom factor.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Sets the zoom factor, invalidating all cached states.
    pub fn set_scale(&mut self, scale: f64) {
        if self.scale != scale {
            self.scale = scale;
            self.invalidate_all();
        }
    }

    /// Returns the unscaled view translation.
    #[must_use]
    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    /// Sets the translation, invalidating all cached states.
    pub fn set_translate(&mut self, translate: Vec2) {
        if self.translate != translate {
            self.translate = translate;
            self.invalidate_all();
        }
    }

    /// Sets scale and translation together, invalidating at most once.
    pub fn scale_and_translate(&mut self, scale: f64, translate: Vec2) {
        if self.scale != scale || self.translate != translate {
            self.scale = scale;
            self.translate = translate;
            self.invalidate_all();
        }
    }

    /// Returns the cell whose children are displayed, if the view has
    /// drilled into a subtree.
    #[must_use]
    pub fn current_root(&self) -> Option<CellId> {
        self.current_root
    }

    /// Drills into (or out of) a subtree. All cached states are dropped.
    pub fn set_current_root(&mut self, root: Option<CellId>) {
        if self.current_root != root {
            self.states.clear();
            self.current_root = root;
        }
    }

    /// Returns the device-space bounds of the diagram after the last
    /// [`View::validate`].
    #[must_use]
    pub fn graph_bounds(&self) -> Rect {
        self.graph_bounds
    }

    /// Returns the cached state of a cell, if one exists.
    #[must_use]
    pub fn state(&self, cell: CellId) -> Option<&CellState> {
        self.states.get(&cell)
    }

    /// Returns the state of a cell, creating an invalid one if missing.
    pub fn state_or_create(&mut self, cell: CellId) -> &mut CellState {
        self.states
            .entry(cell)
            .or_insert_with(|| CellState::new(cell))
    }

    /// Returns the existing states of the given cells, skipping cells
    /// without one.
    #[must_use]
    pub fn cell_states(&self, cells: &[CellId]) -> Vec<&CellState> {
        cells
            .iter()
            .filter_map(|cell| self.states.get(cell))
            .collect()
    }

    /// Iterates over all cached states, in no particular order.
    pub fn states(&self) -> impl Iterator<Item = &CellState> + '_ {
        self.states.values()
    }

    /// Removes and returns the state of a cell.
    pub fn remove_state(&mut self, cell: CellId) -> Option<CellState> {
        self.states.remove(&cell)
    }

    /// The cells validated by the last [`View::validate`], in paint order:
    /// parents before children, siblings in child order.
    #[must_use]
    pub fn validation_order(&self) -> &[CellId] {
        &self.validated
    }

    /// Returns the union of the state bounds of the given vertices and
    /// edges.
    #[must_use]
    pub fn bounds_of(&self, model: &Model, cells: &[CellId]) -> Option<Rect> {
        let mut result: Option<Rect> = None;
        for &cell in cells {
            if model.is_vertex(cell) || model.is_edge(cell) {
                if let Some(state) = self.states.get(&cell) {
                    result = Some(result.map_or(state.bounds, |r| r.union(state.bounds)));
                }
            }
        }
        result
    }

    // ---------------------------------------------------------------------
    // Invalidation
    // ---------------------------------------------------------------------

    /// Marks the state of `cell`, its descendants, and all connected edges
    /// as needing revalidation.
    pub fn invalidate(&mut self, model: &Model, cell: CellId) {
        let mut visited = HashSet::new();
        self.invalidate_cell(model, cell, true, true, &mut visited);
    }

    fn invalidate_cell(
        &mut self,
        model: &Model,
        cell: CellId,
        recurse: bool,
        include_edges: bool,
        visited: &mut HashSet<CellId>,
    ) {
        // Mutually connected cells would otherwise recurse forever.
        if !visited.insert(cell) {
            return;
        }
        if let Some(state) = self.states.get_mut(&cell) {
            state.invalid = true;
        }
        if recurse {
            for &child in model.children(cell) {
                self.invalidate_cell(model, child, recurse, include_edges, visited);
            }
        }
        if include_edges {
            for &edge in model.edges(cell) {
                self.invalidate_cell(model, edge, recurse, include_edges, visited);
            }
        }
    }

    fn invalidate_all(&mut self) {
        for state in self.states.values_mut() {
            state.invalid = true;
        }
    }

    /// Removes the state of `cell`. With `recurse`, descendant states are
    /// removed as well unless `cell` is the current root and `force` is not
    /// set; otherwise the cell is merely invalidated.
    pub fn clear(&mut self, model: &Model, cell: CellId, force: bool, recurse: bool) {
        self.states.remove(&cell);
        if recurse && (force || Some(cell) != self.current_root) {
            for &child in model.children(cell) {
                self.clear(model, child, force, true);
            }
        } else {
            self.invalidate(model, cell);
        }
    }

    /// Applies the display consequences of a dispatched model edit.
    ///
    /// This only invalidates and removes states; call [`View::validate`]
    /// afterwards to bring the cache up to date.
    pub fn process_edit(&mut self, model: &Model, edit: &UndoableEdit) {
        for change in edit.changes() {
            self.process_change(model, change);
        }
    }

    fn process_change(&mut self, model: &Model, change: &Change) {
        match change {
            Change::Root { .. } => {
                self.states.clear();
                self.current_root = None;
            }
            Change::Child {
                child,
                previous_parent,
                ..
            } => {
                let child = *child;
                self.invalidate(model, child);

                let new_parent = model.parent(child);
                let orphaned =
                    new_parent.is_none_or(|p| !model.contains(p) || model.is_collapsed(p));
                if orphaned {
                    self.invalidate(model, child);
                    self.remove_state_for_cell(model, child);
                    if self.current_root == Some(child) {
                        self.current_root = None;
                    }
                }
                if new_parent != *previous_parent {
                    if let Some(parent) = new_parent {
                        let mut visited = HashSet::new();
                        self.invalidate_cell(model, parent, false, false, &mut visited);
                    }
                    if let Some(parent) = *previous_parent {
                        let mut visited = HashSet::new();
                        self.invalidate_cell(model, parent, false, false, &mut visited);
                    }
                }
            }
            Change::Terminal { edge, .. } => self.invalidate(model, *edge),
            Change::Geometry { cell, .. } => self.invalidate(model, *cell),
            Change::Style { cell, .. } => {
                self.invalidate(model, *cell);
                if let Some(state) = self.states.get_mut(cell) {
                    state.invalid_style = true;
                }
            }
            Change::Value { cell, .. } => {
                let mut visited = HashSet::new();
                self.invalidate_cell(model, *cell, false, false, &mut visited);
            }
            Change::Collapsed { cell, .. } | Change::Visible { cell, .. } => {
                self.remove_state_for_cell(model, *cell);
            }
        }
    }

    /// Removes the states of a subtree bottom-up, invalidating the incident
    /// edges of every removed cell.
    fn remove_state_for_cell(&mut self, model: &Model, cell: CellId) {
        for &child in model.children(cell) {
            self.remove_state_for_cell(model, child);
        }
        let mut visited = HashSet::new();
        self.invalidate_cell(model, cell, false, true, &mut visited);
        self.states.remove(&cell);
    }

    // ---------------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------------

    /// Brings the state cache up to date.
    ///
    /// States are created for newly visible cells, removed for hidden ones,
    /// and recomputed where invalid; valid states are left untouched. The
    /// graph bounds and the [`View::validation_order`] are refreshed.
    pub fn validate(&mut self, model: &Model) {
        self.validated.clear();

        let root = self.current_root.or_else(|| model.root());
        let Some(root) = root else {
            self.graph_bounds = self.empty_bounds();
            return;
        };

        self.validate_cell(model, root, true);
        let bounds = self
            .validate_cell_state(model, root, true)
            .and_then(|cell| self.bounding_box(model, cell, true));
        self.graph_bounds = bounds.unwrap_or_else(|| self.empty_bounds());
    }

    /// The graph bounds of an empty diagram: a zero-size rectangle at the
    /// scaled translation.
    fn empty_bounds(&self) -> Rect {
        Rect::from_origin_size(
            (self.translate.x * self.scale, self.translate.y * self.scale),
            Size::ZERO,
        )
    }

    /// Creates and removes states along the visible part of the cell tree.
    fn validate_cell(&mut self, model: &Model, cell: CellId, visible: bool) {
        let visible = visible && model.is_visible(cell);
        let exists = self.states.contains_key(&cell);

        if exists && !visible {
            self.states.remove(&cell);
        } else {
            if visible {
                self.state_or_create(cell);
            }
            let children_visible =
                visible && (!model.is_collapsed(cell) || Some(cell) == self.current_root);
            for &child in model.children(cell) {
                self.validate_cell(model, child, children_visible);
            }
        }
    }

    /// Recomputes the state of `cell` if invalid, then optionally its
    /// children. Returns the cell if a state survives validation.
    fn validate_cell_state(&mut self, model: &Model, cell: CellId, recurse: bool) -> Option<CellId> {
        let invalid = self.states.get(&cell)?.invalid;

        if invalid {
            // Cleared up front so that loops through the terminals below
            // terminate.
            if let Some(state) = self.states.get_mut(&cell) {
                state.invalid = false;
                if state.invalid_style {
                    state.style = model.style(cell).cloned().unwrap_or_default();
                    state.invalid_style = false;
                }
            }

            if Some(cell) != self.current_root {
                if let Some(parent) = model.parent(cell) {
                    self.validate_cell_state(model, parent, false);
                }
            }

            let visible_source = self
                .visible_terminal(model, cell, true)
                .and_then(|t| self.validate_cell_state(model, t, false));
            let visible_target = self
                .visible_terminal(model, cell, false)
                .and_then(|t| self.validate_cell_state(model, t, false));
            if let Some(state) = self.states.get_mut(&cell) {
                state.visible_source = visible_source;
                state.visible_target = visible_target;
            }

            self.update_cell_state(model, cell);
        }

        let state = self.states.get(&cell)?;
        if recurse && !state.invalid {
            if model.is_vertex(cell) || model.is_edge(cell) {
                self.validated.push(cell);
            }
            for &child in model.children(cell) {
                self.validate_cell_state(model, child, true);
            }
        }
        Some(cell)
    }

    /// Recomputes the device-space placement of one state.
    fn update_cell_state(&mut self, model: &Model, cell: CellId) {
        let Some(mut state) = self.states.remove(&cell) else {
            return;
        };
        state.absolute_offset = Point::ZERO;
        state.origin = Point::ZERO;
        state.length = 0.0;

        let mut keep = true;
        if Some(cell) != self.current_root {
            let parent = model.parent(cell);

            if let Some(parent_state) = parent
                .filter(|&p| Some(p) != self.current_root)
                .and_then(|p| self.states.get(&p))
            {
                state.origin += parent_state.origin.to_vec2();
            }

            if let Some(geo) = model.geometry(cell) {
                let is_edge = model.is_edge(cell);
                if !is_edge {
                    let offset = geo.offset.unwrap_or(Vec2::ZERO);
                    let parent_state = parent.and_then(|p| self.states.get(&p));
                    if let (true, Some(parent_state)) = (geo.relative, parent_state) {
                        if model.is_edge(parent_state.cell) {
                            // A label placed along the parent edge's path.
                            let origin = self.absolute_point(parent_state, Some(geo));
                            state.origin.x +=
                                origin.x / self.scale - parent_state.origin.x - self.translate.x;
                            state.origin.y +=
                                origin.y / self.scale - parent_state.origin.y - self.translate.y;
                        } else {
                            state.origin.x +=
                                geo.rect.x0 * parent_state.unscaled_width + offset.x;
                            state.origin.y +=
                                geo.rect.y0 * parent_state.unscaled_height + offset.y;
                        }
                    } else {
                        state.absolute_offset =
                            Point::new(self.scale * offset.x, self.scale * offset.y);
                        state.origin.x += geo.rect.x0;
                        state.origin.y += geo.rect.y0;
                    }
                }

                state.set_rect(
                    self.scale * (self.translate.x + state.origin.x),
                    self.scale * (self.translate.y + state.origin.y),
                    self.scale * geo.rect.width(),
                    self.scale * geo.rect.height(),
                );
                state.unscaled_width = geo.rect.width();
                state.unscaled_height = geo.rect.height();

                if model.is_vertex(cell) {
                    self.update_vertex_state(model, &mut state, geo);
                }
                if is_edge {
                    keep = self.update_edge_state(model, &mut state, geo);
                }
            }
        }

        if keep {
            self.states.insert(cell, state);
        } else {
            // The edge cannot be displayed; its subtree goes with it.
            for &child in model.children(cell) {
                self.clear(model, child, true, true);
            }
        }
    }

    fn update_vertex_state(&self, model: &Model, state: &mut CellState, geo: &Geometry) {
        if geo.relative {
            if let Some(parent_state) = model
                .parent(state.cell)
                .and_then(|p| self.states.get(&p))
                .filter(|ps| !model.is_edge(ps.cell))
            {
                let alpha = parent_state
                    .style
                    .f64_or(keys::ROTATION, 0.0)
                    .to_radians();
                if alpha != 0.0 {
                    // The child follows the parent's rotation around the
                    // parent center.
                    let rotated = rotate_about(
                        state.center(),
                        alpha.cos(),
                        alpha.sin(),
                        parent_state.center(),
                    );
                    let width = state.bounds.width();
                    let height = state.bounds.height();
                    state.set_rect(
                        rotated.x - width / 2.0,
                        rotated.y - height / 2.0,
                        width,
                        height,
                    );
                }
            }
        }
        self.update_vertex_label_offset(state);
    }

    /// Routes the edge. Returns `false` if the state cannot be displayed and
    /// must be dropped.
    fn update_edge_state(&self, model: &Model, state: &mut CellState, geo: &Geometry) -> bool {
        let source = state.visible_source.and_then(|c| self.states.get(&c));
        let target = state.visible_target.and_then(|c| self.states.get(&c));

        // A connected end without a visible terminal, or a dangling end
        // without a fixed point, leaves nothing to route to.
        if (model.terminal(state.cell, true).is_some() && source.is_none())
            || (source.is_none() && geo.terminal_point(true).is_none())
            || (model.terminal(state.cell, false).is_some() && target.is_none())
            || (target.is_none() && geo.terminal_point(false).is_none())
        {
            return false;
        }

        self.update_fixed_terminal_points(model, state, source, target);
        self.update_points(model, state, &geo.points, source, target);
        self.update_floating_terminal_points(model, state, source, target);

        let points = &state.absolute_points;
        if Some(state.cell) != self.current_root
            && (points.len() < 2
                || points.first().copied().flatten().is_none()
                || points.last().copied().flatten().is_none())
        {
            return false;
        }

        self.update_edge_bounds(state);
        self.update_edge_label_offset(model, state);
        true
    }

    fn update_vertex_label_offset(&self, state: &mut CellState) {
        let width = state.bounds.width();
        let height = state.bounds.height();

        match state.style.str_or(keys::LABEL_POSITION, keys::CENTER) {
            keys::LEFT => {
                let label_width = state
                    .style
                    .get_f64(keys::LABEL_WIDTH)
                    .map_or(width, |w| w * self.scale);
                state.absolute_offset.x -= label_width;
            }
            keys::RIGHT => {
                state.absolute_offset.x += width;
            }
            keys::CENTER => {
                if let Some(label_width) = state.style.get_f64(keys::LABEL_WIDTH) {
                    let dx = match state.style.str_or(keys::ALIGN, keys::CENTER) {
                        keys::CENTER => 0.5,
                        keys::RIGHT => 1.0,
                        _ => 0.0,
                    };
                    if dx != 0.0 {
                        state.absolute_offset.x -= (label_width * self.scale - width) * dx;
                    }
                }
            }
            _ => {}
        }

        match state.style.str_or(keys::VERTICAL_LABEL_POSITION, keys::MIDDLE) {
            keys::TOP => state.absolute_offset.y -= height,
            keys::BOTTOM => state.absolute_offset.y += height,
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Edge routing
    // ---------------------------------------------------------------------

    fn update_fixed_terminal_points(
        &self,
        model: &Model,
        edge: &mut CellState,
        source: Option<&CellState>,
        target: Option<&CellState>,
    ) {
        let constraint = ConnectionConstraint::from_style(&edge.style, true);
        let point = self.fixed_terminal_point(model, edge, source, true, &constraint);
        edge.set_absolute_terminal_point(point, true);

        let constraint = ConnectionConstraint::from_style(&edge.style, false);
        let point = self.fixed_terminal_point(model, edge, target, false, &constraint);
        edge.set_absolute_terminal_point(point, false);
    }

    /// Returns the fixed point of an edge end: the constrained connection
    /// point of the terminal, or the geometry's terminal point of a dangling
    /// end.
    fn fixed_terminal_point(
        &self,
        model: &Model,
        edge: &CellState,
        terminal: Option<&CellState>,
        source: bool,
        constraint: &ConnectionConstraint,
    ) -> Option<Point> {
        let mut point = None;
        if let Some(terminal) = terminal {
            point = self.connection_point(model, terminal, constraint);
        }
        if point.is_none() && terminal.is_none() {
            if let Some(p) = model
                .geometry(edge.cell)
                .and_then(|geo| geo.terminal_point(source))
            {
                point = Some(Point::new(
                    self.scale * (self.translate.x + p.x + edge.origin.x),
                    self.scale * (self.translate.y + p.y + edge.origin.y),
                ));
            }
        }
        point
    }

    /// Resolves a connection constraint against the terminal bounds.
    #[must_use]
    pub fn connection_point(
        &self,
        model: &Model,
        vertex: &CellState,
        constraint: &ConnectionConstraint,
    ) -> Option<Point> {
        let fraction = constraint.point?;
        let bounds = self.perimeter_bounds(vertex, 0.0);
        let center = bounds.center();

        let mut point = Point::new(
            bounds.x0 + fraction.x * bounds.width() + constraint.dx * self.scale,
            bounds.y0 + fraction.y * bounds.height() + constraint.dy * self.scale,
        );

        let rotation = vertex.style.f64_or(keys::ROTATION, 0.0);
        if constraint.perimeter {
            point = self.perimeter_point(model, vertex, point, false, 0.0);
        } else if model.is_vertex(vertex.cell) {
            if vertex.style.bool_or(keys::FLIP_H, false) {
                point.x = 2.0 * bounds.center().x - point.x;
            }
            if vertex.style.bool_or(keys::FLIP_V, false) {
                point.y = 2.0 * bounds.center().y - point.y;
            }
        }
        if rotation != 0.0 {
            let alpha = rotation.to_radians();
            point = rotate_about(point, alpha.cos(), alpha.sin(), center);
        }
        Some(point)
    }

    /// Replaces the routed points of the edge, keeping the endpoints and
    /// computing the interior from the edge style or the raw control points.
    fn update_points(
        &self,
        model: &Model,
        edge: &mut CellState,
        points: &[Point],
        source: Option<&CellState>,
        target: Option<&CellState>,
    ) {
        let mut result: Vec<Option<Point>> = vec![edge.absolute_terminal_point(true)];

        let mut interior = Vec::new();
        if let Some(style) = self.edge_style(edge, points, source, target) {
            let src = self.terminal_port(model, edge, source, true);
            let trg = self.terminal_port(model, edge, target, false);
            style.route(self, model, edge, src, trg, points, &mut interior);
        } else {
            for &point in points {
                interior.push(self.transform_control_point(edge, point));
            }
        }
        result.extend(interior.into_iter().map(Some));

        result.push(edge.absolute_terminal_point(false));
        edge.absolute_points = result.into_iter().collect();
    }

    /// Transforms a raw control point of an edge into device space.
    #[must_use]
    pub fn transform_control_point(&self, state: &CellState, point: Point) -> Point {
        Point::new(
            self.scale * (point.x + self.translate.x + state.origin.x),
            self.scale * (point.y + self.translate.y + state.origin.y),
        )
    }

    /// Returns `true` if the edge is a self-loop that should be routed with
    /// the loop style.
    fn is_loop_style_enabled(
        &self,
        edge: &CellState,
        points: &[Point],
        source: Option<&CellState>,
        target: Option<&CellState>,
    ) -> bool {
        let source_constraint = ConnectionConstraint::from_style(&edge.style, true);
        let target_constraint = ConnectionConstraint::from_style(&edge.style, false);

        if points.len() < 2
            && (!edge.style.bool_or(keys::ORTHOGONAL_LOOP, false)
                || (source_constraint.point.is_none() && target_constraint.point.is_none()))
        {
            return source.is_some() && source.map(|s| s.cell) == target.map(|t| t.cell);
        }
        false
    }

    /// Resolves the routing style of an edge.
    fn edge_style(
        &self,
        edge: &CellState,
        points: &[Point],
        source: Option<&CellState>,
        target: Option<&CellState>,
    ) -> Option<EdgeStyle> {
        if self.is_loop_style_enabled(edge, points, source, target) {
            match edge.style.get(keys::LOOP) {
                Some(name) => EdgeStyle::from_name(name),
                None => Some(EdgeStyle::Loop),
            }
        } else if !edge.style.bool_or(keys::NO_EDGE_STYLE, false) {
            edge.style.get(keys::EDGE).and_then(EdgeStyle::from_name)
        } else {
            None
        }
    }

    /// Returns `true` if the edge routes with right angles. An explicit
    /// `orthogonal` style key wins; otherwise every routed style except the
    /// loop counts.
    #[must_use]
    pub fn is_orthogonal(&self, edge: &CellState) -> bool {
        if let Some(value) = edge.style.get(keys::ORTHOGONAL) {
            return value == "1";
        }
        let style = if edge.style.bool_or(keys::NO_EDGE_STYLE, false) {
            None
        } else {
            edge.style.get(keys::EDGE).and_then(EdgeStyle::from_name)
        };
        matches!(style, Some(s) if s != EdgeStyle::Loop)
    }

    /// Substitutes a port cell for the terminal if the edge style names one.
    fn terminal_port<'a>(
        &'a self,
        model: &Model,
        edge: &CellState,
        terminal: Option<&'a CellState>,
        source: bool,
    ) -> Option<&'a CellState> {
        let key = if source {
            keys::SOURCE_PORT
        } else {
            keys::TARGET_PORT
        };
        edge.style
            .get(key)
            .and_then(|id| model.get_cell(id))
            .and_then(|cell| self.states.get(&cell))
            .or(terminal)
    }

    fn update_floating_terminal_points(
        &self,
        model: &Model,
        state: &mut CellState,
        source: Option<&CellState>,
        target: Option<&CellState>,
    ) {
        let p0 = state.absolute_terminal_point(true);
        let pe = state.absolute_terminal_point(false);

        if pe.is_none() {
            if let Some(target) = target {
                let point = self.floating_terminal_point(model, state, target, source, false);
                state.set_absolute_terminal_point(point, false);
            }
        }
        if p0.is_none() {
            if let Some(source) = source {
                let point = self.floating_terminal_point(model, state, source, target, true);
                state.set_absolute_terminal_point(point, true);
            }
        }
    }

    /// Computes the perimeter intersection of a floating edge end towards
    /// the next routed point, honoring terminal rotation and perimeter
    /// spacing.
    fn floating_terminal_point(
        &self,
        model: &Model,
        edge: &CellState,
        start: &CellState,
        end: Option<&CellState>,
        source: bool,
    ) -> Option<Point> {
        let start = self.terminal_port(model, edge, Some(start), source)?;
        let mut next = self.next_point(edge, end, source)?;

        let orthogonal = self.is_orthogonal(edge);
        let alpha = start.style.f64_or(keys::ROTATION, 0.0).to_radians();
        let center = start.center();
        if alpha != 0.0 {
            next = rotate_about(next, (-alpha).cos(), (-alpha).sin(), center);
        }

        let mut border = edge.style.f64_or(keys::PERIMETER_SPACING, 0.0);
        border += edge.style.f64_or(
            if source {
                keys::SOURCE_PERIMETER_SPACING
            } else {
                keys::TARGET_PERIMETER_SPACING
            },
            0.0,
        );
        let mut point =
            self.perimeter_point(model, start, next, alpha == 0.0 && orthogonal, border);
        if alpha != 0.0 {
            point = rotate_about(point, alpha.cos(), alpha.sin(), center);
        }
        Some(point)
    }

    /// Intersects the line from the terminal towards `next` with the
    /// terminal's perimeter. Falls back to the terminal center.
    #[must_use]
    pub fn perimeter_point(
        &self,
        model: &Model,
        terminal: &CellState,
        next: Point,
        orthogonal: bool,
        border: f64,
    ) -> Point {
        let mut result = None;

        if let Some(perimeter) = self.perimeter(terminal) {
            let bounds = self.perimeter_bounds(terminal, border);
            if bounds.width() > 0.0 || bounds.height() > 0.0 {
                let mut point = next;
                let mut flip_h = false;
                let mut flip_v = false;
                if model.is_vertex(terminal.cell) {
                    flip_h = terminal.style.bool_or(keys::FLIP_H, false);
                    flip_v = terminal.style.bool_or(keys::FLIP_V, false);
                    if flip_h {
                        point.x = 2.0 * bounds.center().x - point.x;
                    }
                    if flip_v {
                        point.y = 2.0 * bounds.center().y - point.y;
                    }
                }

                let mut point = perimeter.apply(
                    bounds,
                    terminal.style.get(keys::DIRECTION),
                    point,
                    orthogonal,
                );
                if flip_h {
                    point.x = 2.0 * bounds.center().x - point.x;
                }
                if flip_v {
                    point.y = 2.0 * bounds.center().y - point.y;
                }
                result = Some(point);
            }
        }

        result.unwrap_or_else(|| self.absolute_point(terminal, None))
    }

    /// Resolves the perimeter of a terminal from its style. Without a
    /// `perimeter` key the rectangle perimeter applies; an unknown name
    /// disables the perimeter.
    fn perimeter(&self, terminal: &CellState) -> Option<Perimeter> {
        match terminal.style.get(keys::PERIMETER) {
            Some(name) => Perimeter::from_name(name),
            None => Some(Perimeter::default()),
        }
    }

    /// Returns the terminal bounds grown by its perimeter spacing and the
    /// given border, both scaled.
    #[must_use]
    pub fn perimeter_bounds(&self, terminal: &CellState, border: f64) -> Rect {
        let border = border + terminal.style.f64_or(keys::PERIMETER_SPACING, 0.0);
        terminal.perimeter_bounds(border * self.scale)
    }

    /// Returns the horizontal routing center of a state, shifted by its
    /// `routingCenterX` style.
    #[must_use]
    pub fn routing_center_x(&self, state: &CellState) -> f64 {
        let f = state.style.f64_or(keys::ROUTING_CENTER_X, 0.0);
        state.center().x + f * state.bounds.width()
    }

    /// Returns the vertical routing center of a state, shifted by its
    /// `routingCenterY` style.
    #[must_use]
    pub fn routing_center_y(&self, state: &CellState) -> f64 {
        let f = state.style.f64_or(keys::ROUTING_CENTER_Y, 0.0);
        state.center().y + f * state.bounds.height()
    }

    /// The point an edge end aims at: the nearest interior routed point, or
    /// the center of the opposite terminal.
    fn next_point(
        &self,
        edge: &CellState,
        opposite: Option<&CellState>,
        source: bool,
    ) -> Option<Point> {
        let points = &edge.absolute_points;
        let mut point = None;
        if points.len() >= 2 {
            let index = if source { 1 } else { points.len() - 2 };
            point = points[index];
        }
        point.or_else(|| opposite.map(CellState::center))
    }

    /// Resolves the terminal of an edge end to its nearest visible ancestor.
    ///
    /// Returns `None` for a hidden terminal with no displayable ancestor,
    /// and for layers and the current root, which cannot act as terminals.
    #[must_use]
    pub fn visible_terminal(&self, model: &Model, edge: CellId, source: bool) -> Option<CellId> {
        let mut result = model.terminal(edge, source);
        let mut best = result;

        while let Some(cell) = result {
            if Some(cell) == self.current_root {
                break;
            }
            if !best.is_some_and(|b| model.is_visible(b)) || model.is_collapsed(cell) {
                best = Some(cell);
            }
            result = model.parent(cell);
        }

        if let Some(b) = best {
            if !model.contains(b) || model.parent(b) == model.root() || Some(b) == self.current_root
            {
                best = None;
            }
        }
        best
    }

    /// Recomputes terminal distance, segment lengths, path length, and the
    /// bounds of a routed edge.
    fn update_edge_bounds(&self, state: &mut CellState) {
        let points: Vec<Point> = state.absolute_points.iter().copied().flatten().collect();
        let (Some(&p0), Some(&pe)) = (points.first(), points.last()) else {
            return;
        };

        state.terminal_distance = if p0 != pe { (pe - p0).hypot() } else { 0.0 };

        let mut length = 0.0;
        state.segments.clear();
        let mut previous = p0;
        let mut min = p0;
        let mut max = p0;
        for &point in &points[1..] {
            let segment = (point - previous).hypot();
            state.segments.push(segment);
            length += segment;
            previous = point;
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        state.length = length;

        // A degenerate path still occupies one marker-sized pixel row.
        let marker_size = 1.0;
        state.set_rect(
            min.x,
            min.y,
            (max.x - min.x).max(marker_size),
            (max.y - min.y).max(marker_size),
        );
    }

    /// Returns the absolute position described by a geometry on a state.
    ///
    /// On an edge state with a relative geometry this walks the routed path:
    /// `rect.x0` in `-1.0..=1.0` picks the position along the path,
    /// `rect.y0` the orthogonal distance, and the offset a final absolute
    /// displacement. Otherwise the state center plus the offset is returned.
    #[must_use]
    pub fn absolute_point(&self, state: &CellState, geometry: Option<&Geometry>) -> Point {
        let mut x = state.center().x;
        let mut y = state.center().y;

        if !state.segments.is_empty() && geometry.is_none_or(|g| g.relative) {
            let gx = geometry.map_or(0.0, |g| g.rect.x0 / 2.0);
            let point_count = state.absolute_points.len();
            let dist = ((gx + 0.5) * state.length).round();
            let mut segment = state.segments[0];
            let mut length = 0.0;
            let mut index = 1;
            while dist >= (length + segment).round() && index < point_count - 1 {
                length += segment;
                segment = state.segments[index];
                index += 1;
            }

            let factor = if segment == 0.0 {
                0.0
            } else {
                (dist - length) / segment
            };
            let p0 = state.absolute_points[index - 1];
            let pe = state.absolute_points[index];
            if let (Some(p0), Some(pe)) = (p0, pe) {
                let mut gy = 0.0;
                let mut offset = Vec2::ZERO;
                if let Some(g) = geometry {
                    gy = g.rect.y0;
                    offset = g.offset.unwrap_or(Vec2::ZERO);
                }

                let dx = pe.x - p0.x;
                let dy = pe.y - p0.y;
                let nx = if segment == 0.0 { 0.0 } else { dy / segment };
                let ny = if segment == 0.0 { 0.0 } else { dx / segment };
                x = p0.x + dx * factor + (nx * gy + offset.x) * self.scale;
                y = p0.y + dy * factor - (ny * gy - offset.y) * self.scale;
            }
        } else if let Some(offset) = geometry.and_then(|g| g.offset) {
            x += offset.x;
            y += offset.y;
        }

        Point::new(x, y)
    }

    /// Converts an absolute point into the relative geometry coordinates of
    /// an edge: the inverse of [`View::absolute_point`] for edge labels.
    #[must_use]
    pub fn relative_point(&self, model: &Model, state: &CellState, point: Point) -> Point {
        let relative = model.geometry(state.cell).is_some_and(|g| g.relative);
        let points: Vec<Point> = state.absolute_points.iter().copied().flatten().collect();

        if relative && points.len() > 1 && points.len() == state.absolute_points.len() {
            let total_length = state.length;
            let segments = &state.segments;

            // Closest segment to the dropped point.
            let mut min_dist = Line::new(points[0], points[1])
                .nearest(point, 1e-12)
                .distance_sq;
            let mut index = 0;
            let mut tmp = 0.0;
            let mut length = 0.0;
            for i in 2..points.len() {
                tmp += segments[i - 2];
                let dist = Line::new(points[i - 1], points[i])
                    .nearest(point, 1e-12)
                    .distance_sq;
                if dist <= min_dist {
                    min_dist = dist;
                    index = i - 1;
                    length = tmp;
                }
            }

            let seg = segments[index];
            let p0 = points[index];
            let pe = points[index + 1];
            let nearest = Line::new(p0, pe).nearest(point, 1e-12);
            let projlen = (nearest.t * seg).min(seg);

            let mut y_distance = nearest.distance_sq.sqrt();
            if relative_ccw(p0, pe, point) == -1 {
                y_distance = -y_distance;
            }

            return Point::new(
                ((total_length / 2.0 - length - projlen) / total_length) * -2.0,
                y_distance / self.scale,
            );
        }

        Point::ZERO
    }

    /// Places the edge label: along the path for a relative geometry, at the
    /// path midpoint plus the offset otherwise.
    fn update_edge_label_offset(&self, model: &Model, state: &mut CellState) {
        state.absolute_offset = state.center();

        if state.absolute_points.is_empty() || state.segments.is_empty() {
            return;
        }
        let Some(geometry) = model.geometry(state.cell) else {
            return;
        };

        if geometry.relative {
            state.absolute_offset = self.absolute_point(state, Some(geometry));
        } else {
            let p0 = state.absolute_points.first().copied().flatten();
            let pe = state.absolute_points.last().copied().flatten();
            if let (Some(p0), Some(pe)) = (p0, pe) {
                let offset = geometry.offset.unwrap_or(Vec2::ZERO);
                state.absolute_offset = Point::new(
                    p0.x + (pe.x - p0.x) / 2.0 + offset.x * self.scale,
                    p0.y + (pe.y - p0.y) / 2.0 + offset.y * self.scale,
                );
            }
        }
    }

    /// Returns the union of the state bounds of a subtree.
    #[must_use]
    pub fn bounding_box(&self, model: &Model, cell: CellId, recurse: bool) -> Option<Rect> {
        let state = self.states.get(&cell)?;
        let mut bbox = (model.geometry(cell).is_some()
            && (model.is_vertex(cell) || model.is_edge(cell)))
        .then_some(state.bounds);

        if recurse {
            for &child in model.children(cell) {
                if let Some(bounds) = self.bounding_box(model, child, true) {
                    bbox = Some(bbox.map_or(bounds, |b| b.union(bounds)));
                }
            }
        }
        bbox
    }
}

fn rotate_about(point: Point, cos: f64, sin: f64, center: Point) -> Point {
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(dx * cos - dy * sin + center.x, dy * cos + dx * sin + center.y)
}

/// Which side of the directed segment `p0 → pe` the point lies on:
/// `1` counterclockwise, `-1` clockwise, `0` on the segment.
fn relative_ccw(p0: Point, pe: Point, point: Point) -> i32 {
    let x2 = pe.x - p0.x;
    let y2 = pe.y - p0.y;
    let px = point.x - p0.x;
    let py = point.y - p0.y;

    let mut ccw = px * y2 - py * x2;
    if ccw == 0.0 {
        ccw = px * x2 + py * y2;
        if ccw > 0.0 {
            ccw = (px - x2) * x2 + (py - y2) * y2;
            if ccw < 0.0 {
                ccw = 0.0;
            }
        }
    }
    if ccw < 0.0 {
        -1
    } else if ccw > 0.0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use trellis_model::{Cell, ModelEvent};

    use super::*;

    fn vertex(x: f64, y: f64, width: f64, height: f64) -> Cell {
        Cell::vertex(Geometry::new(x, y, width, height), Style::new())
    }

    // Perimeter projection goes through `atan2`/`tan`, leaving coordinates a
    // few ulps off the geometric answer.
    fn assert_near(actual: Point, expected: Point) {
        assert!(
            (actual - expected).hypot() < 1e-9,
            "{actual:?} != {expected:?}"
        );
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
    fn vertex_state_applies_translate_and_scale() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let v = model.add_cell(layer, vertex(20.0, 30.0, 100.0, 50.0), None);

        let mut view = View::new();
        view.scale_and_translate(2.0, Vec2::new(10.0, 5.0));
        view.validate(&model);

        let state = view.state(v).unwrap();
        assert_eq!(state.bounds, Rect::new(60.0, 70.0, 260.0, 170.0));
        assert_eq!(state.unscaled_width, 100.0);
        assert_eq!(view.graph_bounds(), Rect::new(60.0, 70.0, 260.0, 170.0));
    }

    #[test]
    fn child_origin_accumulates_parent_offsets() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let group = model.add_cell(layer, vertex(100.0, 100.0, 80.0, 60.0), None);
        let child = model.add_cell(group, vertex(10.0, 20.0, 30.0, 20.0), None);

        let mut view = View::new();
        view.validate(&model);

        let state = view.state(child).unwrap();
        assert_eq!(state.bounds.origin(), Point::new(110.0, 120.0));
        assert_eq!(state.origin, Point::new(110.0, 120.0));
    }

    #[test]
    fn relative_child_scales_with_parent_size() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let group = model.add_cell(layer, vertex(100.0, 100.0, 80.0, 60.0), None);
        let child = model.add_cell(
            group,
            Cell::vertex(
                Geometry::new(0.5, 0.5, 10.0, 10.0).with_relative(true),
                Style::new(),
            ),
            None,
        );

        let mut view = View::new();
        view.validate(&model);

        let state = view.state(child).unwrap();
        assert_eq!(state.bounds.origin(), Point::new(140.0, 130.0));
    }

    #[test]
    fn straight_edge_connects_facing_perimeters() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
        let b = model.add_cell(layer, vertex(100.0, 0.0, 40.0, 20.0), None);
        let e = model.add_cell(layer, Cell::new_edge(), None);
        model.set_terminals(e, Some(a), Some(b));

        let mut view = View::new();
        view.validate(&model);

        let state = view.state(e).unwrap();
        let points: Vec<_> = state.absolute_points.iter().copied().flatten().collect();
        assert_eq!(points.len(), 2);
        assert_near(points[0], Point::new(40.0, 10.0));
        assert_near(points[1], Point::new(100.0, 10.0));
        assert!((state.terminal_distance - 60.0).abs() < 1e-9);
        assert!((state.length - 60.0).abs() < 1e-9);
        assert_eq!(state.segments.len(), 1);
        // Label at the path midpoint.
        assert_near(state.absolute_offset, Point::new(70.0, 10.0));
    }

    #[test]
    fn relative_edge_label_follows_the_path() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
        let b = model.add_cell(layer, vertex(100.0, 0.0, 40.0, 20.0), None);
        let mut geometry = Geometry::default();
        geometry.relative = true;
        geometry.offset = Some(Vec2::new(0.0, 5.0));
        let e = model.add_cell(layer, Cell::edge(geometry, Style::new()), None);
        model.set_terminals(e, Some(a), Some(b));

        let mut view = View::new();
        view.validate(&model);

        let state = view.state(e).unwrap();
        assert_near(state.absolute_offset, Point::new(70.0, 15.0));

        // Dropping the label back near the midpoint round-trips to the
        // relative origin.
        let relative = view.relative_point(&model, state, Point::new(70.0, 10.0));
        assert_near(relative, Point::new(0.0, 0.0));
    }

    #[test]
    fn geometry_change_invalidates_cell_and_edges_only() {
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

        model.set_geometry(a, Some(Geometry::new(0.0, 40.0, 40.0, 20.0)));
        for edit in dispatched(&mut model) {
            view.process_edit(&model, &edit);
        }

        assert!(view.state(a).unwrap().is_invalid());
        assert!(view.state(e).unwrap().is_invalid());
        assert!(!view.state(b).unwrap().is_invalid());
        assert!(!view.state(c).unwrap().is_invalid());

        view.validate(&model);
        let points: Vec<_> = view
            .state(e)
            .unwrap()
            .absolute_points
            .iter()
            .copied()
            .flatten()
            .collect();
        // The moved source now connects along the diagonal to the target.
        assert_eq!(points.len(), 2);
        assert!(points[0].y > 10.0);
    }

    #[test]
    fn edge_with_hidden_terminal_has_no_state() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
        let b = model.add_cell(layer, vertex(100.0, 0.0, 40.0, 20.0), None);
        let e = model.add_cell(layer, Cell::new_edge(), None);
        model.set_terminals(e, Some(a), Some(b));
        model.set_visible(b, false);

        let mut view = View::new();
        view.validate(&model);

        assert!(view.state(a).is_some());
        assert!(view.state(b).is_none());
        assert!(view.state(e).is_none());
    }

    #[test]
    fn collapsed_group_substitutes_for_its_children() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let group = model.add_cell(layer, vertex(0.0, 0.0, 60.0, 40.0), None);
        let inner = model.add_cell(group, vertex(10.0, 10.0, 20.0, 10.0), None);
        let b = model.add_cell(layer, vertex(200.0, 0.0, 40.0, 40.0), None);
        let e = model.add_cell(layer, Cell::new_edge(), None);
        model.set_terminals(e, Some(inner), Some(b));
        model.set_collapsed(group, true);

        let mut view = View::new();
        view.validate(&model);

        assert!(view.state(inner).is_none());
        let state = view.state(e).unwrap();
        assert_eq!(state.visible_terminal(true), Some(group));
        let source_point = state.absolute_terminal_point(true).unwrap();
        assert_near(source_point, Point::new(60.0, 20.0));
    }

    #[test]
    fn self_loop_routes_with_the_loop_style() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
        let e = model.add_cell(layer, Cell::new_edge(), None);
        model.set_terminals(e, Some(a), Some(a));

        let mut view = View::new();
        view.validate(&model);

        let state = view.state(e).unwrap();
        let points: Vec<_> = state.absolute_points.iter().copied().flatten().collect();
        // Two interior loop points plus the two perimeter endpoints.
        assert_eq!(points.len(), 4);
        assert!(points[1].x > 40.0 && points[2].x > 40.0);
    }

    #[test]
    fn fixed_connection_point_overrides_the_perimeter() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);
        let b = model.add_cell(layer, vertex(100.0, 0.0, 40.0, 20.0), None);
        let style = Style::new().with(keys::EXIT_X, "0.5").with(keys::EXIT_Y, "1");
        let e = model.add_cell(layer, Cell::edge(Geometry::default(), style), None);
        model.set_terminals(e, Some(a), Some(b));

        let mut view = View::new();
        view.validate(&model);

        let state = view.state(e).unwrap();
        assert_eq!(
            state.absolute_terminal_point(true),
            Some(Point::new(20.0, 20.0))
        );
    }

    #[test]
    fn dangling_edge_uses_geometry_terminal_points() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let mut geometry = Geometry::default();
        geometry.set_terminal_point(Some(Point::new(10.0, 10.0)), true);
        geometry.set_terminal_point(Some(Point::new(50.0, 50.0)), false);
        let e = model.add_cell(layer, Cell::edge(geometry, Style::new()), None);

        let mut view = View::new();
        view.set_scale(2.0);
        view.validate(&model);

        let state = view.state(e).unwrap();
        let points: Vec<_> = state.absolute_points.iter().copied().flatten().collect();
        assert_eq!(points, vec![Point::new(20.0, 20.0), Point::new(100.0, 100.0)]);
    }

    #[test]
    fn scale_change_invalidates_every_state() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);

        let mut view = View::new();
        view.validate(&model);
        assert!(!view.state(a).unwrap().is_invalid());

        view.set_scale(3.0);
        assert!(view.state(a).unwrap().is_invalid());

        view.validate(&model);
        assert_eq!(view.state(a).unwrap().bounds, Rect::new(0.0, 0.0, 120.0, 60.0));
    }

    #[test]
    fn removing_a_cell_drops_its_state_after_processing() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let a = model.add_cell(layer, vertex(0.0, 0.0, 40.0, 20.0), None);

        let mut view = View::new();
        view.validate(&model);
        let _ = dispatched(&mut model);

        model.remove(a);
        for edit in dispatched(&mut model) {
            view.process_edit(&model, &edit);
        }
        view.validate(&model);

        assert!(view.state(a).is_none());
    }

    #[test]
    fn validation_order_lists_parents_before_children() {
        let mut model = Model::new();
        let layer = model.default_parent();
        let group = model.add_cell(layer, vertex(0.0, 0.0, 100.0, 100.0), None);
        let inner = model.add_cell(group, vertex(10.0, 10.0, 20.0, 20.0), None);

        let mut view = View::new();
        view.validate(&model);

        let order = view.validation_order();
        let group_index = order.iter().position(|&c| c == group).unwrap();
        let inner_index = order.iter().position(|&c| c == inner).unwrap();
        assert!(group_index < inner_index);
    }
}
