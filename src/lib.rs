//! # flow-canvas
//!
//! A renderer-independent engine for node-and-edge diagrams: the geometry,
//! hierarchy, viewport and interaction logic behind a visual graph editor,
//! without any drawing code.
//!
//! The renderer reports input (pointer, wheel, keys, measured node sizes) and
//! reads back what to draw: resolved node positions in paint order, edge path
//! strings, the in-progress connection line and the rubber band. Every
//! mutation the engine makes is delivered as a batch of [`NodeChange`] /
//! [`EdgeChange`] records.
//!
//! ## Quick Start
//!
//! ```
//! use flow_canvas::{Edge, Flow, FlowConfig, Node, PointerEvent, Point};
//!
//! let mut flow = Flow::new(FlowConfig::default());
//! flow.set_viewport_size(800.0, 600.0);
//! flow.set_nodes(vec![
//!     Node::new("a", 0.0, 0.0).with_dimensions(100.0, 40.0),
//!     Node::new("b", 250.0, 100.0).with_dimensions(100.0, 40.0),
//! ]);
//! flow.set_edges(vec![Edge::new("a-b", "a", "b")]);
//!
//! // Drag node "a" by (30, 20)
//! flow.pointer_down(PointerEvent::primary(10.0, 10.0));
//! flow.pointer_move(Point::new(40.0, 30.0));
//! flow.pointer_up(Point::new(40.0, 30.0));
//!
//! assert_eq!(flow.node("a").unwrap().position, Point::new(30.0, 20.0));
//! assert!(flow.edge_geometries()[0].path.path.starts_with("M"));
//! ```
//!
//! ## Building blocks
//!
//! Each piece is usable on its own:
//!
//! - [`path`] - bezier, straight, step and smooth-step edge paths
//! - [`hierarchy`] - parent chains to absolute positions and z order
//! - [`viewport`] - pan/zoom gestures, animations, fit-to-bounds, auto-pan
//! - [`connection`] - interactive edge creation with validation
//! - [`changes`] - change records and pure apply functions
//! - [`selection`], [`drag`], [`hit_test`] - pointer interaction helpers
//!
//! With the `slint` feature, [`FlowController`] and [`sync_model`] connect a
//! [`Flow`] to Slint callbacks and models.

pub mod changes;
pub mod config;
pub mod connection;
pub mod drag;
pub mod edges;
pub mod error;
pub mod events;
pub mod flow;
pub mod geometry;
pub mod graph;
pub mod hierarchy;
pub mod model;
pub mod path;
pub mod selection;
pub mod viewport;

#[cfg(feature = "slint")]
pub mod slint_bridge;

pub use changes::{apply_edge_changes, apply_node_changes, EdgeChange, NodeChange};
pub use config::FlowConfig;
pub use connection::{
    Connection, ConnectionEngine, ConnectionEvent, ConnectionMode, ConnectionState, ConnectionStatus, HandleRef,
};
pub use drag::NodeDrag;
pub use edges::{compute_edge_geometries, EdgeGeometry, EdgePathRegistry};
pub use error::{ErrorHandler, ErrorKind, FlowError};
pub use events::ListenerId;
pub use flow::{Flow, Key, Modifiers, PointerButton, PointerEvent};
pub use geometry::{flow_to_screen, screen_to_flow, Dimensions, Point, Rect, Transform};
pub use graph::{
    CompositeValidator, ConnectionValidator, DefaultConnectionValidator, GraphLogic, NoDuplicatesValidator,
    ValidationContext, ValidationError, ValidationResult,
};
pub use hierarchy::{resolve_nodes, HierarchyResolver, ResolvedNode, ResolvedNodes};
pub use model::{Edge, Handle, HandleType, Node, NodeExtent, Side};
pub use path::{
    bezier_path, simple_bezier_path, smooth_step_path, step_path, straight_path, EdgePath, EdgePathParams,
};
pub use selection::{SelectionManager, SelectionMode};
pub use viewport::{FitBoundsOptions, ViewportEngine, ViewportEvent, WheelEvent};

#[cfg(feature = "slint")]
pub use slint_bridge::{sync_model, FlowController};
