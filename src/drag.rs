//! Node dragging.
//!
//! Positions are recomputed from the drag's start positions and the total
//! pointer travel on every move, so rounding never accumulates. Auto-pan needs
//! no special casing here: once the view shifts, [`NodeDrag::refresh`] with the
//! new transform moves the nodes under the still pointer.

use crate::changes::NodeChange;
use crate::config::FlowConfig;
use crate::geometry::{clamp_position, snap_position, Dimensions, Point, Rect, Transform};
use crate::hierarchy::{ResolvedNode, ResolvedNodes};
use crate::model::NodeExtent;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDragOptions {
    pub snap_grid: Option<[f32; 2]>,
    /// Screen pixels the pointer must travel before the drag starts.
    pub threshold: f32,
    pub nodes_draggable: bool,
}

impl Default for NodeDragOptions {
    fn default() -> Self {
        Self::from(&FlowConfig::default())
    }
}

impl From<&FlowConfig> for NodeDragOptions {
    fn from(config: &FlowConfig) -> Self {
        Self {
            snap_grid: config.snap_to_grid.then_some(config.snap_grid),
            threshold: config.node_drag_threshold,
            nodes_draggable: config.nodes_draggable,
        }
    }
}

/// One node being moved.
#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    pub id: String,
    /// Relative position when the drag started.
    pub start_position: Point,
    /// Absolute origin-point position when the drag started.
    start_absolute: Point,
    /// Top-left of the parent's box; relative positions are measured from here.
    parent_offset: Point,
    dimensions: Dimensions,
    origin: [f32; 2],
    /// Absolute rectangle the node's box must stay in.
    extent: Option<Rect>,
}

impl DragItem {
    fn new(node: &ResolvedNode, nodes: &ResolvedNodes) -> Self {
        let parent = if node.detached {
            None
        } else {
            node.node.parent_id.as_deref().and_then(|p| nodes.get(p))
        };
        let extent = match node.node.extent {
            Some(NodeExtent::Rect(r)) => Some(r.normalized()),
            Some(NodeExtent::Parent) => parent.map(|p| p.rect()),
            None => None,
        };
        Self {
            id: node.node.id.clone(),
            start_position: node.node.position,
            start_absolute: node.absolute_position,
            parent_offset: parent.map_or(Point::ZERO, |p| p.top_left()),
            dimensions: node.node.size(),
            origin: node.origin,
            extent,
        }
    }

    /// Relative position after moving the node by `delta` flow units.
    fn moved_by(&self, delta: Point, snap_grid: Option<[f32; 2]>) -> Point {
        let mut absolute = self.start_absolute + delta;
        if let Some(grid) = snap_grid {
            absolute = snap_position(absolute, grid);
        }
        if let Some(extent) = &self.extent {
            let origin_offset = Point::new(
                self.dimensions.width * self.origin[0],
                self.dimensions.height * self.origin[1],
            );
            let top_left = clamp_position(absolute - origin_offset, extent, self.dimensions);
            absolute = top_left + origin_offset;
        }
        absolute - self.parent_offset
    }
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    items: Vec<DragItem>,
    pointer_start: Point,
    pointer_start_screen: Point,
    last_pointer_screen: Point,
    /// Threshold crossed; before that the gesture may still be a click.
    started: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NodeDrag {
    options: NodeDragOptions,
    active: Option<ActiveDrag>,
}

impl NodeDrag {
    pub fn new(options: NodeDragOptions) -> Self {
        Self { options, active: None }
    }

    pub fn options(&self) -> &NodeDragOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: NodeDragOptions) {
        self.options = options;
    }

    /// A pointer is down on a node (the drag may not have started yet).
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Nodes are actually moving.
    pub fn is_dragging(&self) -> bool {
        self.active.as_ref().map_or(false, |a| a.started)
    }

    pub fn dragged_ids(&self) -> Vec<&str> {
        self.active
            .as_ref()
            .map(|a| a.items.iter().map(|i| i.id.as_str()).collect())
            .unwrap_or_default()
    }

    /// Pointer down on `node_id`.
    ///
    /// A selected node drags the whole selection; an unselected one drags
    /// alone (the caller selects it). Nodes whose ancestor is also dragged are
    /// left to move with it. Returns false when nothing is draggable.
    pub fn start(&mut self, node_id: &str, pointer: Point, transform: &Transform, nodes: &ResolvedNodes) -> bool {
        let Some(grabbed) = nodes.get(node_id) else {
            return false;
        };
        if !grabbed.node.is_draggable(self.options.nodes_draggable) {
            return false;
        }

        let candidates: Vec<&ResolvedNode> = if grabbed.node.selected {
            nodes
                .iter()
                .filter(|n| n.node.selected && n.node.is_draggable(self.options.nodes_draggable))
                .map(|n| n.as_ref())
                .collect()
        } else {
            vec![grabbed.as_ref()]
        };
        let ids: HashSet<&str> = candidates.iter().map(|n| n.id()).collect();
        let items: Vec<DragItem> = candidates
            .into_iter()
            .filter(|n| !has_dragged_ancestor(n, &ids, nodes))
            .map(|n| DragItem::new(n, nodes))
            .collect();
        if items.is_empty() {
            return false;
        }

        log::debug!("node drag armed on {} ({} item(s))", node_id, items.len());
        self.active = Some(ActiveDrag {
            items,
            pointer_start: transform.invert(pointer),
            pointer_start_screen: pointer,
            last_pointer_screen: pointer,
            started: false,
        });
        true
    }

    fn positions(&self, pointer: Point, transform: &Transform) -> Vec<NodeChange> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        let delta = transform.invert(pointer) - active.pointer_start;
        active
            .items
            .iter()
            .map(|item| NodeChange::Position {
                id: item.id.clone(),
                position: Some(item.moved_by(delta, self.options.snap_grid)),
                dragging: Some(true),
            })
            .collect()
    }

    /// Pointer moved (screen space). Empty until the threshold is crossed.
    pub fn move_to(&mut self, pointer: Point, transform: &Transform) -> Vec<NodeChange> {
        let threshold = self.options.threshold;
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        active.last_pointer_screen = pointer;
        if !active.started {
            if pointer.distance(active.pointer_start_screen) < threshold {
                return Vec::new();
            }
            active.started = true;
            log::debug!("node drag start");
        }
        let changes = self.positions(pointer, transform);
        log::trace!("node drag move: {} change(s)", changes.len());
        changes
    }

    /// Recompute positions at the last pointer, e.g. after auto-pan.
    pub fn refresh(&mut self, transform: &Transform) -> Vec<NodeChange> {
        match &self.active {
            Some(active) if active.started => {
                let pointer = active.last_pointer_screen;
                self.positions(pointer, transform)
            }
            _ => Vec::new(),
        }
    }

    /// Pointer released. Clears the `dragging` flags; empty when the drag
    /// never started.
    pub fn end(&mut self) -> Vec<NodeChange> {
        let Some(active) = self.active.take() else {
            return Vec::new();
        };
        if !active.started {
            return Vec::new();
        }
        log::debug!("node drag end");
        active
            .items
            .into_iter()
            .map(|item| NodeChange::Position {
                id: item.id,
                position: None,
                dragging: Some(false),
            })
            .collect()
    }

    /// Abort, putting every node back where it started.
    pub fn cancel(&mut self) -> Vec<NodeChange> {
        let Some(active) = self.active.take() else {
            return Vec::new();
        };
        if !active.started {
            return Vec::new();
        }
        log::debug!("node drag cancelled");
        active
            .items
            .into_iter()
            .map(|item| NodeChange::Position {
                id: item.id,
                position: Some(item.start_position),
                dragging: Some(false),
            })
            .collect()
    }

    /// Drop the drag if any dragged node disappeared.
    pub fn on_nodes_changed(&mut self, nodes: &ResolvedNodes) -> bool {
        let gone = self
            .active
            .as_ref()
            .map_or(false, |a| a.items.iter().any(|i| nodes.get(&i.id).is_none()));
        if gone {
            log::debug!("node drag dropped: dragged node removed");
            self.active = None;
        }
        gone
    }
}

fn has_dragged_ancestor(node: &ResolvedNode, dragged: &HashSet<&str>, nodes: &ResolvedNodes) -> bool {
    let mut current = node;
    // Bounded by depth; detached nodes have no resolved ancestors.
    for _ in 0..node.depth {
        let Some(parent) = current.node.parent_id.as_deref().and_then(|p| nodes.get(p)) else {
            return false;
        };
        if dragged.contains(parent.id()) {
            return true;
        }
        current = parent;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{resolve_nodes, ResolveOptions};
    use crate::model::Node;

    fn resolved(nodes: &[Node]) -> ResolvedNodes {
        resolve_nodes(nodes, None, &ResolveOptions::default()).0
    }

    fn position_of(changes: &[NodeChange], id: &str) -> Option<Point> {
        changes.iter().find_map(|c| match c {
            NodeChange::Position { id: cid, position, .. } if cid == id => *position,
            _ => None,
        })
    }

    fn drag(options: NodeDragOptions) -> NodeDrag {
        NodeDrag::new(options)
    }

    // ========================================================================
    // Basic movement
    // ========================================================================

    #[test]
    fn test_drag_moves_by_pointer_travel() {
        let nodes = resolved(&[Node::new("a", 10.0, 10.0).with_dimensions(50.0, 50.0)]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions::default());
        assert!(d.start("a", Point::new(20.0, 20.0), &t, &nodes));
        let changes = d.move_to(Point::new(50.0, 40.0), &t);
        assert_eq!(position_of(&changes, "a"), Some(Point::new(40.0, 30.0)));
        assert!(d.is_dragging());

        let end = d.end();
        assert_eq!(
            end,
            vec![NodeChange::Position {
                id: "a".into(),
                position: None,
                dragging: Some(false)
            }]
        );
        assert!(!d.is_active());
    }

    #[test]
    fn test_drag_divides_by_zoom() {
        let nodes = resolved(&[Node::new("a", 0.0, 0.0)]);
        let t = Transform::new(0.0, 0.0, 2.0);
        let mut d = drag(NodeDragOptions::default());
        d.start("a", Point::new(0.0, 0.0), &t, &nodes);
        let changes = d.move_to(Point::new(100.0, 0.0), &t);
        assert_eq!(position_of(&changes, "a"), Some(Point::new(50.0, 0.0)));
    }

    #[test]
    fn test_threshold_keeps_click_a_click() {
        let nodes = resolved(&[Node::new("a", 0.0, 0.0)]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions {
            threshold: 5.0,
            ..NodeDragOptions::default()
        });
        d.start("a", Point::ZERO, &t, &nodes);
        assert!(d.move_to(Point::new(3.0, 0.0), &t).is_empty());
        assert!(!d.is_dragging());
        assert!(d.end().is_empty());
    }

    #[test]
    fn test_snap_to_grid() {
        let nodes = resolved(&[Node::new("a", 0.0, 0.0)]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions {
            snap_grid: Some([15.0, 15.0]),
            ..NodeDragOptions::default()
        });
        d.start("a", Point::ZERO, &t, &nodes);
        let changes = d.move_to(Point::new(23.0, 7.0), &t);
        assert_eq!(position_of(&changes, "a"), Some(Point::new(30.0, 0.0)));
    }

    #[test]
    fn test_not_draggable() {
        let mut node = Node::new("a", 0.0, 0.0);
        node.draggable = Some(false);
        let nodes = resolved(&[node]);
        let mut d = drag(NodeDragOptions::default());
        assert!(!d.start("a", Point::ZERO, &Transform::IDENTITY, &nodes));
        assert!(!d.start("ghost", Point::ZERO, &Transform::IDENTITY, &nodes));
    }

    // ========================================================================
    // Selection and hierarchy
    // ========================================================================

    #[test]
    fn test_selected_nodes_move_together() {
        let nodes = resolved(&[
            Node::new("a", 0.0, 0.0).selected(true),
            Node::new("b", 100.0, 0.0).selected(true),
            Node::new("c", 200.0, 0.0),
        ]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions::default());
        d.start("a", Point::ZERO, &t, &nodes);
        let changes = d.move_to(Point::new(10.0, 10.0), &t);
        assert_eq!(position_of(&changes, "a"), Some(Point::new(10.0, 10.0)));
        assert_eq!(position_of(&changes, "b"), Some(Point::new(110.0, 10.0)));
        assert_eq!(position_of(&changes, "c"), None);
    }

    #[test]
    fn test_unselected_node_drags_alone() {
        let nodes = resolved(&[Node::new("a", 0.0, 0.0), Node::new("b", 100.0, 0.0).selected(true)]);
        let mut d = drag(NodeDragOptions::default());
        d.start("a", Point::ZERO, &Transform::IDENTITY, &nodes);
        assert_eq!(d.dragged_ids(), vec!["a"]);
    }

    #[test]
    fn test_child_of_dragged_parent_not_moved_twice() {
        let nodes = resolved(&[
            Node::new("p", 0.0, 0.0).with_dimensions(200.0, 200.0).selected(true),
            Node::new("c", 10.0, 10.0).with_parent("p").selected(true),
        ]);
        let mut d = drag(NodeDragOptions::default());
        d.start("c", Point::ZERO, &Transform::IDENTITY, &nodes);
        assert_eq!(d.dragged_ids(), vec!["p"]);
    }

    #[test]
    fn test_child_position_stays_relative() {
        let nodes = resolved(&[
            Node::new("p", 100.0, 100.0).with_dimensions(200.0, 200.0),
            Node::new("c", 10.0, 10.0).with_parent("p"),
        ]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions::default());
        d.start("c", Point::new(115.0, 115.0), &t, &nodes);
        let changes = d.move_to(Point::new(135.0, 125.0), &t);
        assert_eq!(position_of(&changes, "c"), Some(Point::new(30.0, 20.0)));
    }

    #[test]
    fn test_parent_extent_clamps_child() {
        let nodes = resolved(&[
            Node::new("p", 100.0, 100.0).with_dimensions(200.0, 100.0),
            Node::new("c", 10.0, 10.0)
                .with_parent("p")
                .with_dimensions(50.0, 20.0)
                .with_extent(NodeExtent::Parent),
        ]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions::default());
        d.start("c", Point::ZERO, &t, &nodes);
        let far = d.move_to(Point::new(1000.0, 1000.0), &t);
        assert_eq!(position_of(&far, "c"), Some(Point::new(150.0, 80.0)));
        let back = d.move_to(Point::new(-1000.0, -1000.0), &t);
        assert_eq!(position_of(&back, "c"), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_rect_extent() {
        let nodes = resolved(&[Node::new("a", 0.0, 0.0)
            .with_dimensions(10.0, 10.0)
            .with_extent(NodeExtent::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)))]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions::default());
        d.start("a", Point::ZERO, &t, &nodes);
        let changes = d.move_to(Point::new(500.0, 50.0), &t);
        assert_eq!(position_of(&changes, "a"), Some(Point::new(90.0, 50.0)));
    }

    // ========================================================================
    // Auto-pan, cancel, removal
    // ========================================================================

    #[test]
    fn test_refresh_after_pan_follows_view() {
        let nodes = resolved(&[Node::new("a", 0.0, 0.0)]);
        let mut d = drag(NodeDragOptions::default());
        d.start("a", Point::ZERO, &Transform::IDENTITY, &nodes);
        d.move_to(Point::new(10.0, 0.0), &Transform::IDENTITY);
        // View travelled 15px left under a still pointer
        let panned = Transform::new(15.0, 0.0, 1.0);
        let changes = d.refresh(&panned);
        assert_eq!(position_of(&changes, "a"), Some(Point::new(-5.0, 0.0)));
    }

    #[test]
    fn test_cancel_restores_start_positions() {
        let nodes = resolved(&[Node::new("a", 7.0, 9.0)]);
        let t = Transform::IDENTITY;
        let mut d = drag(NodeDragOptions::default());
        d.start("a", Point::ZERO, &t, &nodes);
        d.move_to(Point::new(50.0, 50.0), &t);
        let changes = d.cancel();
        assert_eq!(position_of(&changes, "a"), Some(Point::new(7.0, 9.0)));
        assert!(!d.is_active());
    }

    #[test]
    fn test_removed_node_drops_drag() {
        let mut d = drag(NodeDragOptions::default());
        d.start("a", Point::ZERO, &Transform::IDENTITY, &resolved(&[Node::new("a", 0.0, 0.0)]));
        assert!(d.on_nodes_changed(&resolved(&[])));
        assert!(!d.is_active());
    }
}
