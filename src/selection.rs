//! Click and rubber-band selection.
//!
//! The selected set lives in the `selected` flags of the caller's nodes and
//! edges; [`SelectionManager`] only decides what the next set should be and
//! hands back the change records that get there.

use crate::changes::{edge_selection_changes, node_selection_changes, EdgeChange, NodeChange};
use crate::geometry::{Point, Rect};
use crate::graph::GraphLogic;
use crate::hierarchy::ResolvedNodes;
use crate::hit_test::nodes_in_rect;
use crate::model::{Edge, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the rubber band picks nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Any overlap selects.
    Partial,
    /// The node must lie fully inside the band.
    #[default]
    Full,
}

/// Change records produced by one selection step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionChanges {
    pub nodes: Vec<NodeChange>,
    pub edges: Vec<EdgeChange>,
}

impl SelectionChanges {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    fn between(nodes: &[Node], edges: &[Edge], want_nodes: &HashSet<&str>, want_edges: &HashSet<&str>) -> Self {
        Self {
            nodes: node_selection_changes(nodes, want_nodes),
            edges: edge_selection_changes(edges, want_edges),
        }
    }
}

pub fn selected_node_ids(nodes: &[Node]) -> HashSet<&str> {
    nodes.iter().filter(|n| n.selected).map(|n| n.id.as_str()).collect()
}

pub fn selected_edge_ids(edges: &[Edge]) -> HashSet<&str> {
    edges.iter().filter(|e| e.selected).map(|e| e.id.as_str()).collect()
}

/// Rubber band in flow space.
#[derive(Debug, Clone, PartialEq)]
struct SelectionBox {
    start: Point,
    current: Point,
    /// Selection present when the band started and kept (multi-select key held).
    base_nodes: HashSet<String>,
    base_edges: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct SelectionManager {
    mode: SelectionMode,
    elements_selectable: bool,
    selection_box: Option<SelectionBox>,
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::new(SelectionMode::default(), true)
    }
}

impl SelectionManager {
    pub fn new(mode: SelectionMode, elements_selectable: bool) -> Self {
        Self {
            mode,
            elements_selectable,
            selection_box: None,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    pub fn set_elements_selectable(&mut self, selectable: bool) {
        self.elements_selectable = selectable;
    }

    /// Click on a node.
    ///
    /// With `multi` the node's state toggles and everything else stays. A plain
    /// click selects only this node; clicking the sole selected node is a no-op.
    pub fn click_node(&self, id: &str, multi: bool, nodes: &[Node], edges: &[Edge]) -> SelectionChanges {
        let Some(node) = nodes.iter().find(|n| n.id == id) else {
            return SelectionChanges::default();
        };
        if !node.is_selectable(self.elements_selectable) {
            return SelectionChanges::default();
        }

        let mut want_nodes = selected_node_ids(nodes);
        let mut want_edges = selected_edge_ids(edges);
        if multi {
            if !want_nodes.remove(id) {
                want_nodes.insert(node.id.as_str());
            }
        } else {
            if want_nodes.len() == 1 && want_nodes.contains(id) && want_edges.is_empty() {
                return SelectionChanges::default();
            }
            want_nodes = HashSet::from([node.id.as_str()]);
            want_edges.clear();
        }
        SelectionChanges::between(nodes, edges, &want_nodes, &want_edges)
    }

    /// Click on an edge. Same rules as [`Self::click_node`].
    pub fn click_edge(&self, id: &str, multi: bool, nodes: &[Node], edges: &[Edge]) -> SelectionChanges {
        let Some(edge) = edges.iter().find(|e| e.id == id) else {
            return SelectionChanges::default();
        };
        if !edge.selectable.unwrap_or(self.elements_selectable) {
            return SelectionChanges::default();
        }

        let mut want_nodes = selected_node_ids(nodes);
        let mut want_edges = selected_edge_ids(edges);
        if multi {
            if !want_edges.remove(id) {
                want_edges.insert(edge.id.as_str());
            }
        } else {
            if want_edges.len() == 1 && want_edges.contains(id) && want_nodes.is_empty() {
                return SelectionChanges::default();
            }
            want_edges = HashSet::from([edge.id.as_str()]);
            want_nodes.clear();
        }
        SelectionChanges::between(nodes, edges, &want_nodes, &want_edges)
    }

    /// Deselect everything.
    pub fn clear(&self, nodes: &[Node], edges: &[Edge]) -> SelectionChanges {
        SelectionChanges::between(nodes, edges, &HashSet::new(), &HashSet::new())
    }

    /// Select exactly the given nodes (and no edges).
    pub fn replace_selection(&self, ids: &[&str], nodes: &[Node], edges: &[Edge]) -> SelectionChanges {
        let want: HashSet<&str> = nodes
            .iter()
            .filter(|n| ids.contains(&n.id.as_str()) && n.is_selectable(self.elements_selectable))
            .map(|n| n.id.as_str())
            .collect();
        SelectionChanges::between(nodes, edges, &want, &HashSet::new())
    }

    // ------------------------------------------------------------------------
    // Rubber band
    // ------------------------------------------------------------------------

    /// Start a rubber band at a flow-space point. With `additive` the current
    /// selection is kept and the band adds to it.
    pub fn begin_box(&mut self, start: Point, additive: bool, nodes: &[Node], edges: &[Edge]) {
        let (base_nodes, base_edges) = if additive {
            (
                selected_node_ids(nodes).into_iter().map(String::from).collect(),
                selected_edge_ids(edges).into_iter().map(String::from).collect(),
            )
        } else {
            (HashSet::new(), HashSet::new())
        };
        log::debug!("selection box start at ({}, {})", start.x, start.y);
        self.selection_box = Some(SelectionBox {
            start,
            current: start,
            base_nodes,
            base_edges,
        });
    }

    pub fn is_box_active(&self) -> bool {
        self.selection_box.is_some()
    }

    /// Current band, normalised. `None` when no band is active.
    pub fn box_rect(&self) -> Option<Rect> {
        self.selection_box
            .as_ref()
            .map(|b| Rect::from_corners(b.start, b.current))
    }

    /// Move the band's free corner and return the changes that make the
    /// selection match it. Edges touching a selected node are selected too.
    pub fn update_box(
        &mut self,
        current: Point,
        resolved: &ResolvedNodes,
        nodes: &[Node],
        edges: &[Edge],
    ) -> SelectionChanges {
        let Some(band) = self.selection_box.as_mut() else {
            return SelectionChanges::default();
        };
        band.current = current;
        let rect = Rect::from_corners(band.start, band.current);
        let partial = self.mode == SelectionMode::Partial;

        let mut want_nodes: HashSet<&str> = band.base_nodes.iter().map(String::as_str).collect();
        for hit in nodes_in_rect(resolved, &rect, partial) {
            if hit.node.is_selectable(self.elements_selectable) {
                want_nodes.insert(hit.id());
            }
        }
        // Ids must borrow from the caller's slices, not the resolved pass.
        let want_nodes: HashSet<&str> = nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| want_nodes.contains(id))
            .collect();

        let mut want_edges: HashSet<&str> = edges
            .iter()
            .map(|e| e.id.as_str())
            .filter(|id| band.base_edges.contains(*id))
            .collect();
        for edge in GraphLogic::connected_edges(&want_nodes, edges) {
            if edge.selectable.unwrap_or(self.elements_selectable) {
                want_edges.insert(edge.id.as_str());
            }
        }
        log::trace!("selection box covers {} node(s)", want_nodes.len());
        SelectionChanges::between(nodes, edges, &want_nodes, &want_edges)
    }

    /// Finish the band, returning its final rectangle.
    pub fn end_box(&mut self) -> Option<Rect> {
        let rect = self.box_rect();
        if rect.is_some() {
            log::debug!("selection box end");
        }
        self.selection_box = None;
        rect
    }

    /// Abort the band, restoring the selection it started from.
    pub fn cancel_box(&mut self, nodes: &[Node], edges: &[Edge]) -> SelectionChanges {
        let Some(band) = self.selection_box.take() else {
            return SelectionChanges::default();
        };
        let want_nodes: HashSet<&str> = band.base_nodes.iter().map(String::as_str).collect();
        let want_edges: HashSet<&str> = band.base_edges.iter().map(String::as_str).collect();
        SelectionChanges::between(nodes, edges, &want_nodes, &want_edges)
    }
}
