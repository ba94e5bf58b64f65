//! Interactive edge creation.
//!
//! [`ConnectionEngine`] runs `NoConnection -> Connecting -> NoConnection`
//! while the user drags from a handle. It hit-tests candidate handles,
//! evaluates the validator and reports the finished [`Connection`]; turning
//! that into an [`Edge`] is left to the caller (see
//! [`GraphLogic::edge_from_connection`]).

use crate::config::FlowConfig;
use crate::events::{ListenerId, Listeners};
use crate::geometry::{snap_position, Point, Transform};
use crate::graph::{
    ConnectionValidator, DefaultConnectionValidator, GraphLogic, ValidationContext, ValidationError,
    ValidationResult,
};
use crate::hierarchy::ResolvedNodes;
use crate::hit_test::closest_handle;
use crate::model::{Edge, HandleType, Side};
use crate::path::EdgePathParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Source handles connect to target handles only.
    #[default]
    Strict,
    /// Any two handles may connect.
    Loose,
}

/// Identifies one handle on one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleRef {
    pub node_id: String,
    #[serde(default)]
    pub handle_id: Option<String>,
    #[serde(rename = "type")]
    pub handle_type: HandleType,
}

impl HandleRef {
    pub fn new(node_id: impl Into<String>, handle_id: Option<&str>, handle_type: HandleType) -> Self {
        Self {
            node_id: node_id.into(),
            handle_id: handle_id.map(String::from),
            handle_type,
        }
    }
}

/// A proposed source -> target pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(default)]
    pub target_handle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Valid,
    Invalid,
}

/// The in-progress connection. Positions are flow space.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionState {
    pub from_handle: HandleRef,
    pub from_position: Point,
    pub from_side: Side,
    pub to_handle: Option<HandleRef>,
    pub to_position: Option<Point>,
    pub to_side: Option<Side>,
    pub pointer_position: Point,
    /// `None` while no candidate handle is in range.
    pub status: Option<ConnectionStatus>,
    pub rejection: Option<ValidationError>,
}

impl ConnectionState {
    pub fn is_valid(&self) -> bool {
        self.status == Some(ConnectionStatus::Valid)
    }

    /// Screen position of the source handle under `transform`.
    pub fn from_screen_position(&self, transform: Transform) -> Point {
        transform.apply(self.from_position)
    }

    /// Endpoints for drawing the connection line. The line ends on the
    /// candidate handle when there is one, otherwise at the pointer.
    pub fn path_params(&self) -> EdgePathParams {
        let (target, target_side) = match (self.to_position, self.to_side) {
            (Some(p), Some(side)) => (p, side),
            _ => (self.pointer_position, opposite_side(self.from_side)),
        };
        EdgePathParams {
            source: self.from_position,
            source_side: self.from_side,
            target,
            target_side,
        }
    }

    /// The connection the current candidate would produce.
    pub fn connection(&self) -> Option<Connection> {
        self.to_handle
            .as_ref()
            .map(|to| GraphLogic::connection_between(&self.from_handle, to))
    }
}

fn opposite_side(side: Side) -> Side {
    match side {
        Side::Top => Side::Bottom,
        Side::Right => Side::Left,
        Side::Bottom => Side::Top,
        Side::Left => Side::Right,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Start(ConnectionState),
    Move(ConnectionState),
    /// A valid connection was completed.
    Connect(Connection),
    /// Always sent when a connection attempt finishes, valid or not.
    End(ConnectionState),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionOptions {
    pub mode: ConnectionMode,
    /// Hit-test radius in screen pixels.
    pub radius: f32,
    pub snap_grid: Option<[f32; 2]>,
    pub nodes_connectable: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::from(&FlowConfig::default())
    }
}

impl From<&FlowConfig> for ConnectionOptions {
    fn from(config: &FlowConfig) -> Self {
        Self {
            mode: config.connection_mode,
            radius: config.connection_radius,
            snap_grid: config.snap_to_grid.then_some(config.snap_grid),
            nodes_connectable: config.nodes_connectable,
        }
    }
}

pub struct ConnectionEngine {
    options: ConnectionOptions,
    validator: Box<dyn ConnectionValidator>,
    state: Option<ConnectionState>,
    /// Last pointer in screen space, so the state can be refreshed when the
    /// view pans underneath a still pointer.
    last_pointer: Option<Point>,
    listeners: Listeners<ConnectionEvent>,
}

impl Default for ConnectionEngine {
    fn default() -> Self {
        Self::new(ConnectionOptions::default())
    }
}

impl std::fmt::Debug for ConnectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEngine")
            .field("options", &self.options)
            .field("state", &self.state)
            .finish()
    }
}

impl ConnectionEngine {
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            options,
            validator: Box::new(DefaultConnectionValidator),
            state: None,
            last_pointer: None,
            listeners: Listeners::new(),
        }
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ConnectionOptions) {
        self.options = options;
    }

    /// Replace the validity predicate. The default is [`DefaultConnectionValidator`].
    pub fn set_validator(&mut self, validator: impl ConnectionValidator + 'static) {
        self.validator = Box::new(validator);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ConnectionEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn state(&self) -> Option<&ConnectionState> {
        self.state.as_ref()
    }

    pub fn is_connecting(&self) -> bool {
        self.state.is_some()
    }

    /// Begin dragging from `from`. Returns false when the handle cannot be
    /// found, its node is not connectable, or a connection is already active.
    pub fn start(&mut self, from: HandleRef, pointer: Point, transform: &Transform, nodes: &ResolvedNodes) -> bool {
        if self.state.is_some() {
            return false;
        }
        let Some(node) = nodes.get(&from.node_id) else {
            return false;
        };
        if !node.node.is_connectable(self.options.nodes_connectable) {
            return false;
        }
        let Some(handle) = node.node.find_handle(from.handle_type, from.handle_id.as_deref()) else {
            return false;
        };

        let from_position = node.handle_position(handle);
        let state = ConnectionState {
            from_handle: from,
            from_position,
            from_side: handle.side,
            to_handle: None,
            to_position: None,
            to_side: None,
            pointer_position: transform.invert(pointer),
            status: None,
            rejection: None,
        };
        log::debug!("connection start from {:?}", state.from_handle);
        self.last_pointer = Some(pointer);
        self.listeners.emit(&ConnectionEvent::Start(state.clone()));
        self.state = Some(state);
        true
    }

    /// Recompute the candidate for a screen-space pointer.
    fn evaluate(&self, pointer: Point, transform: &Transform, nodes: &ResolvedNodes, edges: &[Edge]) -> Option<ConnectionState> {
        let mut state = self.state.clone()?;
        let zoom = if transform.zoom > 0.0 { transform.zoom } else { 1.0 };
        let pointer_flow = transform.invert(pointer);

        let prefer = match self.options.mode {
            ConnectionMode::Strict => Some(state.from_handle.handle_type.opposite()),
            ConnectionMode::Loose => None,
        };
        let hit = closest_handle(
            nodes,
            pointer_flow,
            self.options.radius / zoom,
            Some(&state.from_handle),
            prefer,
            self.options.nodes_connectable,
        );

        state.pointer_position = match (&hit, self.options.snap_grid) {
            (None, Some(grid)) => snap_position(pointer_flow, grid),
            _ => pointer_flow,
        };

        match hit {
            Some(hit) => {
                let connection = GraphLogic::connection_between(&state.from_handle, &hit.handle);
                let context = ValidationContext {
                    mode: self.options.mode,
                    from_type: state.from_handle.handle_type,
                    to_type: hit.handle.handle_type,
                    edges,
                };
                let result = self.validator.validate(&connection, &context);
                state.status = Some(if result.is_valid() {
                    ConnectionStatus::Valid
                } else {
                    ConnectionStatus::Invalid
                });
                state.rejection = match result {
                    ValidationResult::Valid => None,
                    ValidationResult::Invalid(e) => Some(e),
                };
                state.to_position = Some(hit.position);
                state.to_side = Some(hit.side);
                state.to_handle = Some(hit.handle);
            }
            None => {
                state.to_handle = None;
                state.to_position = None;
                state.to_side = None;
                state.status = None;
                state.rejection = None;
            }
        }
        Some(state)
    }

    /// Pointer moved (screen space). Emits `Move` with the new state.
    pub fn move_to(
        &mut self,
        pointer: Point,
        transform: &Transform,
        nodes: &ResolvedNodes,
        edges: &[Edge],
    ) -> Option<&ConnectionState> {
        let state = self.evaluate(pointer, transform, nodes, edges)?;
        log::trace!("connection move: candidate {:?} status {:?}", state.to_handle, state.status);
        self.last_pointer = Some(pointer);
        self.listeners.emit(&ConnectionEvent::Move(state.clone()));
        self.state = Some(state);
        self.state.as_ref()
    }

    /// Re-run hit testing at the last pointer, e.g. after the view auto-panned.
    pub fn refresh(&mut self, transform: &Transform, nodes: &ResolvedNodes, edges: &[Edge]) -> Option<&ConnectionState> {
        let pointer = self.last_pointer?;
        self.move_to(pointer, transform, nodes, edges)
    }

    /// Pointer released. Returns the connection if the candidate was valid.
    /// `End` is emitted either way.
    pub fn end(&mut self, pointer: Point, transform: &Transform, nodes: &ResolvedNodes, edges: &[Edge]) -> Option<Connection> {
        let state = self.evaluate(pointer, transform, nodes, edges)?;
        self.state = None;
        self.last_pointer = None;

        let connection = if state.is_valid() { state.connection() } else { None };
        if let Some(c) = &connection {
            log::debug!("connection made {} -> {}", c.source, c.target);
            self.listeners.emit(&ConnectionEvent::Connect(c.clone()));
        }
        log::debug!("connection end");
        self.listeners.emit(&ConnectionEvent::End(state));
        connection
    }

    /// Abort without a connection (Escape, source removed).
    pub fn cancel(&mut self) -> bool {
        let Some(mut state) = self.state.take() else {
            return false;
        };
        self.last_pointer = None;
        state.to_handle = None;
        state.to_position = None;
        state.to_side = None;
        state.status = None;
        state.rejection = None;
        log::debug!("connection cancelled");
        self.listeners.emit(&ConnectionEvent::End(state));
        true
    }

    /// Cancel when the source node or handle is no longer in the collection.
    pub fn on_nodes_changed(&mut self, nodes: &ResolvedNodes) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let from = &state.from_handle;
        let still_there = nodes
            .get(&from.node_id)
            .map_or(false, |n| n.node.find_handle(from.handle_type, from.handle_id.as_deref()).is_some());
        if still_there {
            false
        } else {
            self.cancel()
        }
    }
}
