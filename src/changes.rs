//! Change records for node and edge collections.
//!
//! Every mutation the engine makes (drag, resize, selection, deletion) is
//! reported as a batch of these records. Callers that own their data fold the
//! batches in with [`apply_node_changes`] / [`apply_edge_changes`]; the same
//! functions serve the engine when it owns the data itself.

use crate::geometry::{Dimensions, Point};
use crate::model::{Edge, Node};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeChange {
    Add {
        item: Node,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Remove {
        id: String,
    },
    Replace {
        id: String,
        item: Node,
    },
    Select {
        id: String,
        selected: bool,
    },
    Position {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dragging: Option<bool>,
    },
    Dimensions {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimensions: Option<Dimensions>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resizing: Option<bool>,
    },
}

impl NodeChange {
    pub fn id(&self) -> &str {
        match self {
            NodeChange::Add { item, .. } => &item.id,
            NodeChange::Remove { id }
            | NodeChange::Replace { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. } => id,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        NodeChange::Select {
            id: id.into(),
            selected,
        }
    }

    pub fn remove(id: impl Into<String>) -> Self {
        NodeChange::Remove { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdgeChange {
    Add {
        item: Edge,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Remove {
        id: String,
    },
    Replace {
        id: String,
        item: Edge,
    },
    Select {
        id: String,
        selected: bool,
    },
}

impl EdgeChange {
    pub fn id(&self) -> &str {
        match self {
            EdgeChange::Add { item, .. } => &item.id,
            EdgeChange::Remove { id } | EdgeChange::Replace { id, .. } | EdgeChange::Select { id, .. } => id,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        EdgeChange::Select {
            id: id.into(),
            selected,
        }
    }

    pub fn remove(id: impl Into<String>) -> Self {
        EdgeChange::Remove { id: id.into() }
    }
}

/// Id -> position index over a collection, rebuilt after structural edits.
struct IdIndex {
    map: Option<HashMap<String, usize>>,
}

impl IdIndex {
    fn new() -> Self {
        Self { map: None }
    }

    fn invalidate(&mut self) {
        self.map = None;
    }

    fn lookup<T>(&mut self, items: &[T], id: &str, id_of: impl Fn(&T) -> &str) -> Option<usize> {
        let map = self.map.get_or_insert_with(|| {
            let mut m = HashMap::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                m.entry(id_of(item).to_string()).or_insert(i);
            }
            m
        });
        map.get(id).copied()
    }
}

fn node_id(node: &Node) -> &str {
    &node.id
}

fn edge_id(edge: &Edge) -> &str {
    &edge.id
}

/// Apply node changes in order, returning a new collection.
///
/// Changes that name an unknown id are ignored.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &[Node]) -> Vec<Node> {
    let mut out = nodes.to_vec();
    let mut index = IdIndex::new();
    let id_of = node_id;

    for change in changes {
        match change {
            NodeChange::Add { item, index: at } => {
                match at {
                    Some(i) => out.insert((*i).min(out.len()), item.clone()),
                    None => out.push(item.clone()),
                }
                index.invalidate();
            }
            NodeChange::Remove { id } => {
                let before = out.len();
                out.retain(|n| n.id != *id);
                if out.len() != before {
                    index.invalidate();
                }
            }
            NodeChange::Replace { id, item } => {
                if let Some(i) = index.lookup(&out, id, id_of) {
                    out[i] = item.clone();
                    index.invalidate();
                }
            }
            NodeChange::Select { id, selected } => {
                if let Some(i) = index.lookup(&out, id, id_of) {
                    out[i].selected = *selected;
                }
            }
            NodeChange::Position { id, position, dragging } => {
                if let Some(i) = index.lookup(&out, id, id_of) {
                    if let Some(p) = position {
                        out[i].position = *p;
                    }
                    if let Some(d) = dragging {
                        out[i].dragging = *d;
                    }
                }
            }
            NodeChange::Dimensions { id, dimensions, resizing } => {
                if let Some(i) = index.lookup(&out, id, id_of) {
                    if let Some(d) = dimensions {
                        out[i].dimensions = Some(*d);
                    }
                    if let Some(r) = resizing {
                        out[i].resizing = *r;
                    }
                }
            }
        }
    }
    out
}

/// Apply edge changes in order, returning a new collection.
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &[Edge]) -> Vec<Edge> {
    let mut out = edges.to_vec();
    let mut index = IdIndex::new();
    let id_of = edge_id;

    for change in changes {
        match change {
            EdgeChange::Add { item, index: at } => {
                match at {
                    Some(i) => out.insert((*i).min(out.len()), item.clone()),
                    None => out.push(item.clone()),
                }
                index.invalidate();
            }
            EdgeChange::Remove { id } => {
                let before = out.len();
                out.retain(|e| e.id != *id);
                if out.len() != before {
                    index.invalidate();
                }
            }
            EdgeChange::Replace { id, item } => {
                if let Some(i) = index.lookup(&out, id, id_of) {
                    out[i] = item.clone();
                    index.invalidate();
                }
            }
            EdgeChange::Select { id, selected } => {
                if let Some(i) = index.lookup(&out, id, id_of) {
                    out[i].selected = *selected;
                }
            }
        }
    }
    out
}

/// Select changes that make exactly `selected` the selected node set.
///
/// Only nodes whose state actually flips get a record.
pub fn node_selection_changes(nodes: &[Node], selected: &HashSet<&str>) -> Vec<NodeChange> {
    nodes
        .iter()
        .filter_map(|n| {
            let want = selected.contains(n.id.as_str());
            (n.selected != want).then(|| NodeChange::select(n.id.clone(), want))
        })
        .collect()
}

/// Select changes that make exactly `selected` the selected edge set.
pub fn edge_selection_changes(edges: &[Edge], selected: &HashSet<&str>) -> Vec<EdgeChange> {
    edges
        .iter()
        .filter_map(|e| {
            let want = selected.contains(e.id.as_str());
            (e.selected != want).then(|| EdgeChange::select(e.id.clone(), want))
        })
        .collect()
}
