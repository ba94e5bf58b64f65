//! One engine instance per canvas.
//!
//! [`Flow`] owns the node and edge collections (or mirrors the caller's, see
//! [`Flow::set_auto_apply_changes`]) and routes renderer input to the
//! component that handles it:
//!
//! - pointer down on a handle starts a connection
//! - pointer down on a node arms a drag (and selects the node)
//! - shift + pointer down on the pane starts a rubber band
//! - any other pointer down on the pane pans the view
//!
//! Every mutation goes out as a change batch to the node/edge listeners.
//! Hierarchy and edge geometry are recomputed whenever the collections change.

use crate::changes::{apply_edge_changes, apply_node_changes, EdgeChange, NodeChange};
use crate::config::FlowConfig;
use crate::connection::{Connection, ConnectionEngine, ConnectionEvent, ConnectionOptions, ConnectionState};
use crate::drag::{NodeDrag, NodeDragOptions};
use crate::edges::{compute_edge_geometries, EdgeGeometry, EdgeGeometryOptions, EdgePathRegistry};
use crate::error::{log_error_handler, ErrorHandler, FlowError};
use crate::events::{ListenerId, Listeners};
use crate::geometry::{Dimensions, Point, Rect, Transform};
use crate::graph::{ConnectionValidator, GraphLogic, ValidationError};
use crate::hierarchy::{HierarchyResolver, ResolveOptions, ResolvedNode, ResolvedNodes};
use crate::hit_test::{handle_at, node_at, visible_nodes};
use crate::model::{Edge, Node};
use crate::path::{EdgePath, EdgePathParams};
use crate::selection::{SelectionChanges, SelectionManager};
use crate::viewport::{FitBoundsOptions, GestureKind, ViewportEngine, ViewportEvent, ViewportOptions, WheelEvent};
use std::rc::Rc;
use std::time::Duration;

/// Extra grab area around a handle's box, in screen pixels.
pub const HANDLE_GRAB_TOLERANCE: f32 = 4.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Key that adds to / toggles the selection.
    pub fn is_multi(&self) -> bool {
        self.ctrl || self.meta || self.shift
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// Pointer input in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn primary(x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Other,
}

impl Key {
    /// Map a DOM-style key name.
    pub fn from_name(name: &str) -> Key {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            _ => Key::Other,
        }
    }
}

/// What the pointer is currently doing.
#[derive(Debug, Clone, PartialEq)]
enum Interaction {
    Idle,
    Connecting,
    /// Pointer down on a node; `collapse` turns a plain click on an already
    /// selected node into a single selection.
    Dragging { node_id: String, collapse: bool },
    Selecting,
    Panning { start: Point, moved: bool },
}

pub struct Flow {
    config: FlowConfig,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    resolver: HierarchyResolver,
    registry: EdgePathRegistry,
    edge_options: EdgeGeometryOptions,
    geometries: Vec<EdgeGeometry>,
    viewport: ViewportEngine,
    connection: ConnectionEngine,
    selection: SelectionManager,
    drag: NodeDrag,
    interaction: Interaction,
    auto_apply: bool,
    node_listeners: Listeners<Vec<NodeChange>>,
    edge_listeners: Listeners<Vec<EdgeChange>>,
    error_handler: ErrorHandler,
    /// Structural problems of the last pass, so a persisting problem is only
    /// reported once.
    last_errors: Vec<FlowError>,
}

impl Default for Flow {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("interaction", &self.interaction)
            .field("transform", &self.viewport.transform())
            .finish()
    }
}

impl Flow {
    /// Engine with the default error handler (logs through `log::warn!`).
    pub fn new(config: FlowConfig) -> Self {
        Self::with_error_handler(config, log_error_handler())
    }

    pub fn with_error_handler(config: FlowConfig, error_handler: ErrorHandler) -> Self {
        let mut flow = Self {
            config: FlowConfig::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
            resolver: HierarchyResolver::default(),
            registry: EdgePathRegistry::default(),
            edge_options: EdgeGeometryOptions::default(),
            geometries: Vec::new(),
            viewport: ViewportEngine::default(),
            connection: ConnectionEngine::default(),
            selection: SelectionManager::default(),
            drag: NodeDrag::default(),
            interaction: Interaction::Idle,
            auto_apply: true,
            node_listeners: Listeners::new(),
            edge_listeners: Listeners::new(),
            error_handler,
            last_errors: Vec::new(),
        };
        flow.set_config(config);
        flow
    }

    /// Replace the options. Invalid values are reported and replaced.
    pub fn set_config(&mut self, config: FlowConfig) {
        let (config, errors) = config.validated();
        for e in &errors {
            (self.error_handler)(e);
        }

        self.resolver.set_options(ResolveOptions {
            elevate_on_select: config.elevate_nodes_on_select,
            selected_z_boost: config.selected_z_boost,
            node_origin: config.node_origin,
        });
        self.edge_options = EdgeGeometryOptions {
            elevate_on_select: config.elevate_edges_on_select,
            selected_z_boost: config.selected_z_boost,
        };
        self.registry.set_default_type(config.default_edge_type.clone());
        self.viewport.set_options(ViewportOptions::from(&config));
        self.connection.set_options(ConnectionOptions::from(&config));
        self.drag.set_options(NodeDragOptions::from(&config));
        self.selection.set_mode(config.selection_mode);
        self.selection.set_elements_selectable(config.elements_selectable);
        self.config = config;
        self.refresh_nodes();
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.error_handler = handler;
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    /// Replace the node collection with a caller snapshot.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
        self.refresh_nodes();
    }

    /// Replace the edge collection with a caller snapshot.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges;
        self.refresh_edges();
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn resolved_nodes(&self) -> &ResolvedNodes {
        self.resolver.resolved()
    }

    pub fn edge_geometries(&self) -> &[EdgeGeometry] {
        &self.geometries
    }

    /// Nodes touching the visible part of the canvas.
    pub fn visible_nodes(&self) -> Vec<&Rc<ResolvedNode>> {
        visible_nodes(self.resolver.resolved(), &self.viewport.visible_flow_rect())
    }

    /// Add or replace an edge path calculator.
    pub fn register_edge_type(&mut self, name: &str, calculator: impl Fn(&EdgePathParams) -> EdgePath + 'static) {
        self.registry.register(name, calculator);
        self.refresh_edges();
    }

    /// When on (the default) the engine folds its own change batches into its
    /// collections. When off, the caller applies them and hands back
    /// snapshots through [`Self::set_nodes`] / [`Self::set_edges`].
    pub fn set_auto_apply_changes(&mut self, auto_apply: bool) {
        self.auto_apply = auto_apply;
    }

    /// Apply node changes and notify listeners, as if the engine made them.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        self.emit_node_changes(changes);
    }

    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        self.emit_edge_changes(changes);
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn on_nodes_change(&mut self, listener: impl FnMut(&Vec<NodeChange>) + 'static) -> ListenerId {
        self.node_listeners.subscribe(listener)
    }

    pub fn off_nodes_change(&mut self, id: ListenerId) -> bool {
        self.node_listeners.unsubscribe(id)
    }

    pub fn on_edges_change(&mut self, listener: impl FnMut(&Vec<EdgeChange>) + 'static) -> ListenerId {
        self.edge_listeners.subscribe(listener)
    }

    pub fn off_edges_change(&mut self, id: ListenerId) -> bool {
        self.edge_listeners.unsubscribe(id)
    }

    pub fn on_connection(&mut self, listener: impl FnMut(&ConnectionEvent) + 'static) -> ListenerId {
        self.connection.subscribe(listener)
    }

    pub fn off_connection(&mut self, id: ListenerId) -> bool {
        self.connection.unsubscribe(id)
    }

    pub fn on_viewport(&mut self, listener: impl FnMut(&ViewportEvent) + 'static) -> ListenerId {
        self.viewport.subscribe(listener)
    }

    pub fn off_viewport(&mut self, id: ListenerId) -> bool {
        self.viewport.unsubscribe(id)
    }

    pub fn set_connection_validator(&mut self, validator: impl ConnectionValidator + 'static) {
        self.connection.set_validator(validator);
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    pub fn viewport(&self) -> &ViewportEngine {
        &self.viewport
    }

    /// Direct access for imperative viewport operations.
    pub fn viewport_mut(&mut self) -> &mut ViewportEngine {
        &mut self.viewport
    }

    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.viewport.set_size(width, height);
    }

    /// Fit every visible node into the viewport.
    pub fn fit_view(&mut self, duration: Duration) -> Result<Transform, FlowError> {
        let (width, height) = self.viewport.size();
        if width <= 0.0 || height <= 0.0 {
            return Err(FlowError::ViewportNotInitialized);
        }
        let Some(bounds) = self.resolver.resolved().bounds() else {
            return Ok(self.viewport.transform());
        };
        self.viewport.fit_bounds(
            bounds,
            FitBoundsOptions {
                padding: self.config.fit_view_padding,
                duration,
                ..FitBoundsOptions::default()
            },
        )
    }

    pub fn wheel(&mut self, event: WheelEvent) -> bool {
        let changed = self.viewport.wheel(event);
        if changed {
            self.follow_view();
        }
        changed
    }

    /// Advance animations and auto-pan by one frame.
    pub fn tick(&mut self, dt: Duration) {
        let travel = self.viewport.tick(dt);
        if travel != Point::ZERO {
            self.follow_view();
        }
    }

    // ------------------------------------------------------------------
    // Interaction state
    // ------------------------------------------------------------------

    pub fn connection_state(&self) -> Option<&ConnectionState> {
        self.connection.state()
    }

    /// Screen position of the handle the in-progress connection started from.
    pub fn connection_from_screen_position(&self) -> Option<Point> {
        self.connection
            .state()
            .map(|state| state.from_screen_position(self.viewport.transform()))
    }

    /// Rubber band in flow space, while one is active.
    pub fn selection_box(&self) -> Option<Rect> {
        self.selection.box_rect()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn is_interacting(&self) -> bool {
        self.interaction != Interaction::Idle
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Pointer pressed. Returns whether the engine took the gesture.
    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        if self.interaction != Interaction::Idle {
            return false;
        }
        match event.button {
            PointerButton::Secondary => return false,
            PointerButton::Middle => return self.begin_pan(event.position),
            PointerButton::Primary => {}
        }

        let t = self.viewport.transform();
        let zoom = if t.zoom > 0.0 { t.zoom } else { 1.0 };
        let flow_point = t.invert(event.position);

        let handle_hit = handle_at(
            self.resolver.resolved(),
            flow_point,
            HANDLE_GRAB_TOLERANCE / zoom,
            self.config.nodes_connectable,
        );
        if let Some(hit) = handle_hit {
            if self.connection.start(hit.handle, event.position, &t, self.resolver.resolved()) {
                self.interaction = Interaction::Connecting;
                return true;
            }
        }

        let node_hit = node_at(self.resolver.resolved(), flow_point).map(|n| n.id().to_string());
        if let Some(node_id) = node_hit {
            self.press_node(node_id, event);
            return true;
        }

        if event.modifiers.shift && self.config.elements_selectable {
            let additive = event.modifiers.ctrl || event.modifiers.meta;
            self.selection.begin_box(flow_point, additive, &self.nodes, &self.edges);
            self.interaction = Interaction::Selecting;
            return true;
        }

        self.begin_pan(event.position)
    }

    fn begin_pan(&mut self, pointer: Point) -> bool {
        if !self.viewport.gesture_start(GestureKind::Pan, pointer) {
            return false;
        }
        self.interaction = Interaction::Panning {
            start: pointer,
            moved: false,
        };
        true
    }

    fn press_node(&mut self, node_id: String, event: PointerEvent) {
        let t = self.viewport.transform();
        let multi = event.modifiers.is_multi();
        let was_selected = self.node(&node_id).map_or(false, |n| n.selected);

        // Decided on the pre-click selection: an unselected node drags alone.
        if !(multi && was_selected) {
            self.drag.start(&node_id, event.position, &t, self.resolver.resolved());
        }
        if multi || !was_selected {
            let changes = self.selection.click_node(&node_id, multi, &self.nodes, &self.edges);
            self.emit_selection(changes);
        }
        self.interaction = Interaction::Dragging {
            node_id,
            collapse: !multi && was_selected,
        };
    }

    pub fn pointer_move(&mut self, position: Point) {
        let t = self.viewport.transform();
        if let Interaction::Panning { start, moved } = &mut self.interaction {
            if position.distance(*start) >= self.config.node_drag_threshold {
                *moved = true;
            }
            self.viewport.gesture_move(position, 1.0);
            return;
        }
        match self.interaction {
            Interaction::Idle | Interaction::Panning { .. } => {}
            Interaction::Connecting => {
                self.connection
                    .move_to(position, &t, self.resolver.resolved(), &self.edges);
                if self.config.auto_pan_on_connect {
                    self.viewport.set_auto_pan_pointer(Some(position));
                }
            }
            Interaction::Dragging { .. } => {
                let changes = self.drag.move_to(position, &t);
                if self.drag.is_dragging() && self.config.auto_pan_on_node_drag {
                    self.viewport.set_auto_pan_pointer(Some(position));
                }
                self.emit_node_changes(changes);
            }
            Interaction::Selecting => {
                let changes = self.selection.update_box(
                    t.invert(position),
                    self.resolver.resolved(),
                    &self.nodes,
                    &self.edges,
                );
                self.emit_selection(changes);
            }
        }
    }

    pub fn pointer_up(&mut self, position: Point) {
        let t = self.viewport.transform();
        self.viewport.set_auto_pan_pointer(None);
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Idle => {}
            Interaction::Connecting => {
                self.connection
                    .end(position, &t, self.resolver.resolved(), &self.edges);
            }
            Interaction::Dragging { node_id, collapse } => {
                let changes = self.drag.end();
                if changes.is_empty() {
                    if collapse {
                        let changes = self.selection.click_node(&node_id, false, &self.nodes, &self.edges);
                        self.emit_selection(changes);
                    }
                } else {
                    self.emit_node_changes(changes);
                }
            }
            Interaction::Selecting => {
                self.selection.end_box();
            }
            Interaction::Panning { moved, .. } => {
                self.viewport.gesture_end();
                if !moved {
                    self.clear_selection();
                }
            }
        }
    }

    /// The renderer hit an edge (edges are not hit-tested here).
    pub fn edge_click(&mut self, edge_id: &str, modifiers: Modifiers) {
        let changes = self
            .selection
            .click_edge(edge_id, modifiers.is_multi(), &self.nodes, &self.edges);
        self.emit_selection(changes);
    }

    /// The renderer measured a node.
    pub fn node_resized(&mut self, node_id: &str, dimensions: Dimensions) {
        let unchanged = self.node(node_id).map_or(true, |n| n.dimensions == Some(dimensions));
        if unchanged {
            return;
        }
        self.emit_node_changes(vec![NodeChange::Dimensions {
            id: node_id.to_string(),
            dimensions: Some(dimensions),
            resizing: None,
        }]);
    }

    // ------------------------------------------------------------------
    // Keyboard and commands
    // ------------------------------------------------------------------

    /// Returns whether the key did something.
    pub fn key_down(&mut self, key: Key) -> bool {
        match key {
            Key::Escape => self.cancel_interaction(),
            Key::Delete | Key::Backspace => {
                if !self.config.delete_on_key || self.interaction != Interaction::Idle {
                    return false;
                }
                self.delete_selected()
            }
            Key::Other => false,
        }
    }

    /// Abort whatever the pointer is doing, undoing its effects.
    pub fn cancel_interaction(&mut self) -> bool {
        self.viewport.set_auto_pan_pointer(None);
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Idle => false,
            Interaction::Connecting => self.connection.cancel(),
            Interaction::Dragging { .. } => {
                let changes = self.drag.cancel();
                self.emit_node_changes(changes);
                true
            }
            Interaction::Selecting => {
                let changes = self.selection.cancel_box(&self.nodes, &self.edges);
                self.emit_selection(changes);
                true
            }
            Interaction::Panning { .. } => self.viewport.gesture_end(),
        }
    }

    /// Remove the selected nodes (with descendants) and edges.
    pub fn delete_selected(&mut self) -> bool {
        let node_ids: Vec<String> = self.nodes.iter().filter(|n| n.selected).map(|n| n.id.clone()).collect();
        let edge_ids: Vec<String> = self.edges.iter().filter(|e| e.selected).map(|e| e.id.clone()).collect();
        self.delete_elements_inner(&node_ids, &edge_ids)
    }

    /// Remove the given nodes (with descendants and attached edges) and edges.
    pub fn delete_elements(&mut self, node_ids: &[&str], edge_ids: &[&str]) -> bool {
        let nodes: Vec<String> = node_ids.iter().map(|s| s.to_string()).collect();
        let edges: Vec<String> = edge_ids.iter().map(|s| s.to_string()).collect();
        self.delete_elements_inner(&nodes, &edges)
    }

    fn delete_elements_inner(&mut self, node_ids: &[String], edge_ids: &[String]) -> bool {
        let node_refs: Vec<&str> = node_ids.iter().map(String::as_str).collect();
        let edge_refs: Vec<&str> = edge_ids.iter().map(String::as_str).collect();
        let (node_changes, edge_changes) =
            GraphLogic::removal_changes(&node_refs, &edge_refs, &self.nodes, &self.edges);
        if node_changes.is_empty() && edge_changes.is_empty() {
            return false;
        }
        log::debug!(
            "removing {} node(s) and {} edge(s)",
            node_changes.len(),
            edge_changes.len()
        );
        // Edges first so no edge outlives its node.
        self.emit_edge_changes(edge_changes);
        self.emit_node_changes(node_changes);
        true
    }

    /// Turn a connection into an edge.
    pub fn connect(&mut self, connection: &Connection) -> Result<(), ValidationError> {
        let Some(edge) = GraphLogic::add_edge(connection, &self.edges)?.pop() else {
            return Ok(());
        };
        self.emit_edge_changes(vec![EdgeChange::Add { item: edge, index: None }]);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        let changes = self.selection.clear(&self.nodes, &self.edges);
        self.emit_selection(changes);
    }

    pub fn select_nodes(&mut self, ids: &[&str]) {
        let changes = self.selection.replace_selection(ids, &self.nodes, &self.edges);
        self.emit_selection(changes);
    }

    // ------------------------------------------------------------------
    // Change plumbing
    // ------------------------------------------------------------------

    fn emit_selection(&mut self, changes: SelectionChanges) {
        self.emit_node_changes(changes.nodes);
        self.emit_edge_changes(changes.edges);
    }

    fn emit_node_changes(&mut self, changes: Vec<NodeChange>) {
        if changes.is_empty() {
            return;
        }
        self.node_listeners.emit(&changes);
        if self.auto_apply {
            self.nodes = apply_node_changes(&changes, &self.nodes);
            self.refresh_nodes();
        }
    }

    fn emit_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        if changes.is_empty() {
            return;
        }
        self.edge_listeners.emit(&changes);
        if self.auto_apply {
            self.edges = apply_edge_changes(&changes, &self.edges);
            self.refresh_edges();
        }
    }

    /// Re-run hit testing of the active interaction after the view moved.
    fn follow_view(&mut self) {
        let t = self.viewport.transform();
        match self.interaction {
            Interaction::Connecting => {
                self.connection.refresh(&t, self.resolver.resolved(), &self.edges);
            }
            Interaction::Dragging { .. } => {
                let changes = self.drag.refresh(&t);
                self.emit_node_changes(changes);
            }
            _ => {}
        }
    }

    fn refresh_nodes(&mut self) {
        let mut errors = self.resolver.resolve(&self.nodes);
        let resolved = self.resolver.resolved();
        if self.connection.on_nodes_changed(resolved) && self.interaction == Interaction::Connecting {
            self.interaction = Interaction::Idle;
            self.viewport.set_auto_pan_pointer(None);
        }
        if self.drag.on_nodes_changed(resolved) {
            self.interaction = Interaction::Idle;
            self.viewport.set_auto_pan_pointer(None);
        }
        errors.extend(self.compute_edges());
        self.report(errors);
    }

    fn refresh_edges(&mut self) {
        let mut errors = self.last_errors.iter().filter(|e| is_node_error(e)).cloned().collect::<Vec<_>>();
        errors.extend(self.compute_edges());
        self.report(errors);
    }

    fn compute_edges(&mut self) -> Vec<FlowError> {
        let (geometries, errors) = compute_edge_geometries(
            &self.edges,
            self.resolver.resolved(),
            &self.registry,
            &self.edge_options,
        );
        self.geometries = geometries;
        errors
    }

    fn report(&mut self, errors: Vec<FlowError>) {
        for e in errors.iter().filter(|e| !self.last_errors.contains(e)) {
            (self.error_handler)(e);
        }
        self.last_errors = errors;
    }
}

fn is_node_error(e: &FlowError) -> bool {
    matches!(e, FlowError::MissingParent { .. } | FlowError::ParentCycle { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Handle, Side};
    use std::cell::RefCell;

    fn sample() -> Flow {
        let mut flow = Flow::default();
        flow.set_viewport_size(800.0, 600.0);
        flow.set_nodes(vec![
            Node::new("a", 0.0, 0.0)
                .with_dimensions(100.0, 50.0)
                .with_handle(Handle::source(Side::Right).with_id("out").with_bounds(95.0, 20.0, 10.0, 10.0)),
            Node::new("b", 300.0, 0.0)
                .with_dimensions(100.0, 50.0)
                .with_handle(Handle::target(Side::Left).with_id("in").with_bounds(-5.0, 20.0, 10.0, 10.0)),
        ]);
        flow.set_edges(vec![Edge::new("e", "a", "b")]);
        flow
    }

    fn selected(flow: &Flow) -> Vec<&str> {
        flow.nodes().iter().filter(|n| n.selected).map(|n| n.id.as_str()).collect()
    }

    // ========================================================================
    // Setup
    // ========================================================================

    #[test]
    fn test_edges_computed_on_set() {
        let flow = sample();
        assert_eq!(flow.edge_geometries().len(), 1);
        assert_eq!(flow.edge_geometries()[0].source, Point::new(105.0, 25.0));
    }

    #[test]
    fn test_structural_errors_reported_once() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut flow = Flow::with_error_handler(
            FlowConfig::default(),
            Box::new(move |e: &FlowError| sink.borrow_mut().push(e.code())),
        );
        flow.set_nodes(vec![Node::new("orphan", 0.0, 0.0).with_parent("ghost")]);
        flow.set_nodes(vec![Node::new("orphan", 5.0, 0.0).with_parent("ghost")]);
        assert_eq!(*seen.borrow(), vec!["missing-parent"]);
    }

    #[test]
    fn test_invalid_config_reported() {
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        let config = FlowConfig {
            min_zoom: 4.0,
            max_zoom: 1.0,
            ..FlowConfig::default()
        };
        let flow = Flow::with_error_handler(config, Box::new(move |_: &FlowError| *sink.borrow_mut() += 1));
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(flow.config().min_zoom, 0.5);
    }

    // ========================================================================
    // Pointer routing
    // ========================================================================

    #[test]
    fn test_click_node_selects() {
        let mut flow = sample();
        assert!(flow.pointer_down(PointerEvent::primary(50.0, 25.0)));
        flow.pointer_up(Point::new(50.0, 25.0));
        assert_eq!(selected(&flow), vec!["a"]);
        assert!(!flow.is_interacting());
    }

    #[test]
    fn test_pane_click_clears_selection() {
        let mut flow = sample();
        flow.select_nodes(&["a", "b"]);
        flow.pointer_down(PointerEvent::primary(600.0, 400.0));
        flow.pointer_up(Point::new(600.0, 400.0));
        assert!(selected(&flow).is_empty());
    }

    #[test]
    fn test_pane_drag_pans_and_keeps_selection() {
        let mut flow = sample();
        flow.select_nodes(&["a"]);
        flow.pointer_down(PointerEvent::primary(600.0, 400.0));
        flow.pointer_move(Point::new(650.0, 420.0));
        flow.pointer_up(Point::new(650.0, 420.0));
        assert_eq!(flow.transform(), Transform::new(50.0, 20.0, 1.0));
        assert_eq!(selected(&flow), vec!["a"]);
    }

    #[test]
    fn test_handle_press_starts_connection() {
        let mut flow = sample();
        let made = Rc::new(RefCell::new(Vec::new()));
        let sink = made.clone();
        flow.on_connection(move |e| {
            if let ConnectionEvent::Connect(c) = e {
                sink.borrow_mut().push(c.clone());
            }
        });
        assert!(flow.pointer_down(PointerEvent::primary(104.0, 25.0)));
        assert!(flow.connection_state().is_some());
        flow.pointer_move(Point::new(290.0, 25.0));
        flow.pointer_up(Point::new(290.0, 25.0));
        assert_eq!(made.borrow().len(), 1);
        assert!(flow.connection_state().is_none());

        let connection = made.borrow()[0].clone();
        assert_eq!(flow.connect(&connection), Ok(()));
        assert_eq!(flow.edges().len(), 2);
        assert_eq!(flow.connect(&connection), Err(ValidationError::DuplicateConnection));
    }

    #[test]
    fn test_escape_cancels_drag() {
        let mut flow = sample();
        flow.pointer_down(PointerEvent::primary(50.0, 25.0));
        flow.pointer_move(Point::new(150.0, 125.0));
        assert_eq!(flow.node("a").unwrap().position, Point::new(100.0, 100.0));
        assert!(flow.key_down(Key::Escape));
        assert_eq!(flow.node("a").unwrap().position, Point::ZERO);
        assert!(!flow.node("a").unwrap().dragging);
    }

    #[test]
    fn test_delete_removes_node_and_edge() {
        let mut flow = sample();
        flow.select_nodes(&["a"]);
        assert!(flow.key_down(Key::Delete));
        assert_eq!(flow.nodes().len(), 1);
        assert!(flow.edges().is_empty());
        assert!(flow.edge_geometries().is_empty());
    }

    #[test]
    fn test_controlled_mode_does_not_mutate() {
        let mut flow = sample();
        flow.set_auto_apply_changes(false);
        let batches = Rc::new(RefCell::new(0));
        let sink = batches.clone();
        flow.on_nodes_change(move |_| *sink.borrow_mut() += 1);
        flow.pointer_down(PointerEvent::primary(50.0, 25.0));
        flow.pointer_up(Point::new(50.0, 25.0));
        assert_eq!(*batches.borrow(), 1);
        assert!(selected(&flow).is_empty());
    }

    #[test]
    fn test_fit_view_requires_size() {
        let mut flow = Flow::default();
        assert_eq!(flow.fit_view(Duration::ZERO), Err(FlowError::ViewportNotInitialized));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("Backspace"), Key::Backspace);
        assert_eq!(Key::from_name("a"), Key::Other);
    }
}
