//! Edge geometry.
//!
//! Maps an edge's `type` name to a path calculator and computes, for every
//! renderable edge, its endpoints, path string, label anchor and z.
//!
//! # Example
//!
//! ```ignore
//! use flow_canvas::{compute_edge_geometries, EdgeGeometryOptions, EdgePathRegistry};
//!
//! let mut registry = EdgePathRegistry::default();
//! registry.register("wire", |p| flow_canvas::path::step_path(p, 10.0));
//!
//! let (geometries, errors) =
//!     compute_edge_geometries(&edges, resolver.resolved(), &registry, &EdgeGeometryOptions::default());
//! ```

use crate::error::{EdgeEnd, FlowError};
use crate::geometry::Point;
use crate::hierarchy::{ResolvedNode, ResolvedNodes};
use crate::model::{Edge, HandleType, Side};
use crate::path::{
    bezier_path, simple_bezier_path, smooth_step_path, step_path, straight_path, EdgePath,
    EdgePathParams, DEFAULT_BORDER_RADIUS, DEFAULT_CURVATURE, DEFAULT_STEP_OFFSET,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

pub type PathCalculator = Box<dyn Fn(&EdgePathParams) -> EdgePath>;

/// Registry mapping an edge type name to its path calculator.
///
/// Built-in names: `default` and `bezier`, `straight`, `step`, `smoothstep`,
/// `simplebezier`. Unknown names fall back to the default type.
pub struct EdgePathRegistry {
    calculators: HashMap<String, PathCalculator>,
    default_type: String,
    /// Unknown type names already logged.
    reported: RefCell<HashSet<String>>,
}

impl Default for EdgePathRegistry {
    fn default() -> Self {
        let mut registry = Self {
            calculators: HashMap::new(),
            default_type: "default".to_string(),
            reported: RefCell::new(HashSet::new()),
        };
        registry.register("default", |p| bezier_path(p, DEFAULT_CURVATURE));
        registry.register("bezier", |p| bezier_path(p, DEFAULT_CURVATURE));
        registry.register("simplebezier", simple_bezier_path);
        registry.register("straight", straight_path);
        registry.register("step", |p| step_path(p, DEFAULT_STEP_OFFSET));
        registry.register("smoothstep", |p| {
            smooth_step_path(p, DEFAULT_BORDER_RADIUS, DEFAULT_STEP_OFFSET)
        });
        registry
    }
}

impl EdgePathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a calculator.
    pub fn register(&mut self, name: impl Into<String>, calculator: impl Fn(&EdgePathParams) -> EdgePath + 'static) {
        self.calculators.insert(name.into(), Box::new(calculator));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.calculators.contains_key(name)
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    /// Name used for edges without a `type`, and for unknown types.
    pub fn set_default_type(&mut self, name: impl Into<String>) {
        self.default_type = name.into();
    }

    pub fn compute(&self, edge_type: Option<&str>, params: &EdgePathParams) -> EdgePath {
        let name = edge_type.unwrap_or(&self.default_type);
        if let Some(calc) = self.calculators.get(name) {
            return calc(params);
        }
        if self.reported.borrow_mut().insert(name.to_string()) {
            log::warn!("Unknown edge type '{}', using '{}'", name, self.default_type);
        }
        match self.calculators.get(&self.default_type) {
            Some(calc) => calc(params),
            None => bezier_path(params, DEFAULT_CURVATURE),
        }
    }
}

impl std::fmt::Debug for EdgePathRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.calculators.keys().collect();
        names.sort();
        f.debug_struct("EdgePathRegistry")
            .field("types", &names)
            .field("default_type", &self.default_type)
            .finish()
    }
}

/// Computed geometry for one edge, in flow space.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    pub id: String,
    pub path: EdgePath,
    pub source: Point,
    pub source_side: Side,
    pub target: Point,
    pub target_side: Side,
    pub z: i32,
    pub selected: bool,
    pub animated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeGeometryOptions {
    pub elevate_on_select: bool,
    pub selected_z_boost: i32,
}

impl Default for EdgeGeometryOptions {
    fn default() -> Self {
        Self {
            elevate_on_select: false,
            selected_z_boost: 1000,
        }
    }
}

/// Where one end of an edge attaches.
///
/// A named handle must exist on the node. Without a name the first handle of
/// the right type is used, and a node with none falls back to the middle of
/// its default side.
pub fn edge_endpoint(
    edge: &Edge,
    node: &ResolvedNode,
    end: EdgeEnd,
) -> Result<(Point, Side), FlowError> {
    let (handle_type, handle_id) = match end {
        EdgeEnd::Source => (HandleType::Source, edge.source_handle.as_deref()),
        EdgeEnd::Target => (HandleType::Target, edge.target_handle.as_deref()),
    };

    if let Some(handle) = node.node.find_handle(handle_type, handle_id) {
        return Ok((node.handle_position(handle), handle.side));
    }

    match handle_id {
        Some(id) => Err(FlowError::MissingHandle {
            edge_id: edge.id.clone(),
            node_id: node.node.id.clone(),
            handle_id: id.to_string(),
            end,
        }),
        None => Ok(node.fallback_anchor(handle_type)),
    }
}

fn edge_z(edge: &Edge, source: &ResolvedNode, target: &ResolvedNode, options: &EdgeGeometryOptions) -> i32 {
    let mut z = edge.z_index.unwrap_or(0);
    if edge.selected && options.elevate_on_select {
        z = z.saturating_add(options.selected_z_boost);
    }
    if source.depth > 0 || target.depth > 0 {
        z = z.max(source.z).max(target.z);
    }
    z
}

fn lookup<'a>(nodes: &'a ResolvedNodes, edge: &Edge, end: EdgeEnd) -> Result<&'a ResolvedNode, FlowError> {
    let node_id = match end {
        EdgeEnd::Source => &edge.source,
        EdgeEnd::Target => &edge.target,
    };
    nodes
        .get(node_id)
        .map(|rc| rc.as_ref())
        .ok_or_else(|| FlowError::MissingEdgeNode {
            edge_id: edge.id.clone(),
            node_id: node_id.clone(),
            end,
        })
}

/// Geometry for one edge. `Ok(None)` means the edge is hidden.
pub fn compute_edge_geometry(
    edge: &Edge,
    nodes: &ResolvedNodes,
    registry: &EdgePathRegistry,
    options: &EdgeGeometryOptions,
) -> Result<Option<EdgeGeometry>, FlowError> {
    let source_node = lookup(nodes, edge, EdgeEnd::Source)?;
    let target_node = lookup(nodes, edge, EdgeEnd::Target)?;
    if edge.hidden || source_node.node.hidden || target_node.node.hidden {
        return Ok(None);
    }

    let (source, source_side) = edge_endpoint(edge, source_node, EdgeEnd::Source)?;
    let (target, target_side) = edge_endpoint(edge, target_node, EdgeEnd::Target)?;

    let params = EdgePathParams {
        source,
        source_side,
        target,
        target_side,
    };
    let path = registry.compute(edge.edge_type.as_deref(), &params);

    Ok(Some(EdgeGeometry {
        id: edge.id.clone(),
        path,
        source,
        source_side,
        target,
        target_side,
        z: edge_z(edge, source_node, target_node, options),
        selected: edge.selected,
        animated: edge.animated,
    }))
}

/// Geometry for every renderable edge, in input order.
///
/// Edges with a missing node or handle are skipped and reported; hidden edges
/// and edges touching hidden nodes are skipped silently.
pub fn compute_edge_geometries(
    edges: &[Edge],
    nodes: &ResolvedNodes,
    registry: &EdgePathRegistry,
    options: &EdgeGeometryOptions,
) -> (Vec<EdgeGeometry>, Vec<FlowError>) {
    let mut geometries = Vec::with_capacity(edges.len());
    let mut errors = Vec::new();
    for edge in edges {
        match compute_edge_geometry(edge, nodes, registry, options) {
            Ok(Some(g)) => geometries.push(g),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    (geometries, errors)
}
