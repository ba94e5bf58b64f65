//! User-owned node and edge data.
//!
//! These mirror the plain JSON objects a caller persists. Engine-computed data
//! (absolute positions, z order, paths) never lives here; see
//! [`crate::hierarchy::ResolvedNode`] and [`crate::edges::EdgeGeometry`].

use crate::geometry::{Dimensions, Point, Rect};
use serde::{Deserialize, Serialize};

pub type NodeId = String;
pub type EdgeId = String;

/// Side of a node's box a handle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// Unit vector pointing away from the node.
    pub fn direction(self) -> Point {
        match self {
            Side::Top => Point::new(0.0, -1.0),
            Side::Right => Point::new(1.0, 0.0),
            Side::Bottom => Point::new(0.0, 1.0),
            Side::Left => Point::new(-1.0, 0.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    Source,
    Target,
}

impl HandleType {
    pub fn opposite(self) -> HandleType {
        match self {
            HandleType::Source => HandleType::Target,
            HandleType::Target => HandleType::Source,
        }
    }
}

/// Attachment point on a node. `x`/`y` are relative to the node's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handle {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub handle_type: HandleType,
    pub side: Side,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl Handle {
    pub fn new(handle_type: HandleType, side: Side) -> Self {
        Self {
            id: None,
            handle_type,
            side,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn source(side: Side) -> Self {
        Self::new(HandleType::Source, side)
    }

    pub fn target(side: Side) -> Self {
        Self::new(HandleType::Target, side)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_bounds(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    /// Attachment point relative to the node's top-left corner.
    ///
    /// This is the middle of the handle box's edge facing `side`.
    pub fn anchor(&self) -> Point {
        match self.side {
            Side::Left => Point::new(self.x, self.y + self.height / 2.0),
            Side::Right => Point::new(self.x + self.width, self.y + self.height / 2.0),
            Side::Top => Point::new(self.x + self.width / 2.0, self.y),
            Side::Bottom => Point::new(self.x + self.width / 2.0, self.y + self.height),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Handles without an id match an edge that names no handle.
    pub fn matches_id(&self, id: Option<&str>) -> bool {
        match id {
            Some(id) => self.id.as_deref() == Some(id),
            None => true,
        }
    }
}

/// Where a node may be dragged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeExtent {
    /// Inside the parent node's box.
    Parent,
    /// Inside a flow-space rectangle (absolute coordinates).
    Rect(Rect),
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Relative to the parent's top-left corner, or to the flow origin.
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Set once the renderer has measured the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dragging: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub resizing: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// `None` defers to the canvas-wide setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<NodeExtent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handles: Vec<Handle>,
    /// Opaque application payload.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Node {
    pub fn new(id: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            position: Point::new(x, y),
            parent_id: None,
            node_type: None,
            dimensions: None,
            z_index: None,
            selected: false,
            dragging: false,
            resizing: false,
            hidden: false,
            draggable: None,
            selectable: None,
            connectable: None,
            extent: None,
            handles: Vec::new(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_dimensions(mut self, width: f32, height: f32) -> Self {
        self.dimensions = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }

    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handles.push(handle);
        self
    }

    pub fn with_extent(mut self, extent: NodeExtent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn size(&self) -> Dimensions {
        self.dimensions.unwrap_or_default()
    }

    pub fn is_draggable(&self, default: bool) -> bool {
        self.draggable.unwrap_or(default)
    }

    pub fn is_selectable(&self, default: bool) -> bool {
        self.selectable.unwrap_or(default)
    }

    pub fn is_connectable(&self, default: bool) -> bool {
        self.connectable.unwrap_or(default)
    }

    /// First handle of `handle_type` matching `id`.
    pub fn find_handle(&self, handle_type: HandleType, id: Option<&str>) -> Option<&Handle> {
        self.handles
            .iter()
            .find(|h| h.handle_type == handle_type && h.matches_id(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Name of the path calculator, see [`crate::edges::EdgePathRegistry`].
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            edge_type: None,
            z_index: None,
            selected: false,
            animated: false,
            hidden: false,
            selectable: None,
            label: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_handles(mut self, source_handle: Option<&str>, target_handle: Option<&str>) -> Self {
        self.source_handle = source_handle.map(str::to_owned);
        self.target_handle = target_handle.map(str::to_owned);
        self
    }

    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}
