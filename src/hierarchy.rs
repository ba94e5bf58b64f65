//! Node hierarchy resolution.
//!
//! Turns a flat node list with `parent_id` links into absolute flow-space
//! positions and a stacking order. Engine-computed data lives in
//! [`ResolvedNode`], next to (never inside) the caller's [`Node`].

use crate::error::FlowError;
use crate::geometry::{rect_union, Point, Rect};
use crate::model::{Handle, HandleType, Node, Side};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    pub elevate_on_select: bool,
    pub selected_z_boost: i32,
    pub node_origin: [f32; 2],
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            elevate_on_select: true,
            selected_z_boost: 1000,
            node_origin: [0.0, 0.0],
        }
    }
}

/// A node plus its computed absolute position and z.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    pub node: Node,
    /// Flow-space position of the node's origin point.
    pub absolute_position: Point,
    pub z: i32,
    /// Number of resolved ancestors.
    pub depth: usize,
    /// Set when the parent could not be resolved (missing or cyclic); the
    /// node is then placed at its own raw position.
    pub detached: bool,
    pub origin: [f32; 2],
}

impl ResolvedNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    /// Flow-space top-left corner of the node's box.
    pub fn top_left(&self) -> Point {
        let size = self.node.size();
        Point::new(
            self.absolute_position.x - size.width * self.origin[0],
            self.absolute_position.y - size.height * self.origin[1],
        )
    }

    pub fn rect(&self) -> Rect {
        let size = self.node.size();
        let tl = self.top_left();
        Rect::new(tl.x, tl.y, size.width, size.height)
    }

    /// Flow-space attachment point of one of this node's handles.
    pub fn handle_position(&self, handle: &Handle) -> Point {
        self.top_left() + handle.anchor()
    }

    /// Flow-space box of one of this node's handles.
    pub fn handle_bounds(&self, handle: &Handle) -> Rect {
        let tl = self.top_left();
        Rect::new(tl.x + handle.x, tl.y + handle.y, handle.width, handle.height)
    }

    /// Attachment point for an edge end that names no existing handle:
    /// centre of the default side (bottom for sources, top for targets).
    pub fn fallback_anchor(&self, handle_type: HandleType) -> (Point, Side) {
        let r = self.rect();
        match handle_type {
            HandleType::Source => (Point::new(r.x + r.width / 2.0, r.bottom()), Side::Bottom),
            HandleType::Target => (Point::new(r.x + r.width / 2.0, r.y), Side::Top),
        }
    }
}

/// Result of one resolve pass, in input order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedNodes {
    nodes: Vec<Rc<ResolvedNode>>,
    index: HashMap<String, usize>,
}

impl ResolvedNodes {
    pub fn get(&self, id: &str) -> Option<&Rc<ResolvedNode>> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<ResolvedNode>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children that are attached to `id`.
    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Rc<ResolvedNode>> + 'a {
        self.nodes
            .iter()
            .filter(move |n| !n.detached && n.node.parent_id.as_deref() == Some(id))
    }

    /// Nodes sorted back to front by `(z, depth)`, stable on input order.
    pub fn paint_order(&self) -> Vec<&Rc<ResolvedNode>> {
        let mut ordered: Vec<&Rc<ResolvedNode>> = self.nodes.iter().collect();
        ordered.sort_by_key(|n| (n.z, n.depth));
        ordered
    }

    /// Bounding box of all visible nodes.
    pub fn bounds(&self) -> Option<Rect> {
        let rects: Vec<Rect> = self
            .nodes
            .iter()
            .filter(|n| !n.node.hidden)
            .map(|n| n.rect())
            .collect();
        rect_union(&rects)
    }
}

/// How a parent-chain walk stopped.
enum ChainEnd {
    Root,
    Anchored(usize),
    MissingParent,
    Cycle(usize),
}

/// Resolve absolute positions and z for a flat node list.
///
/// Each node is resolved once per pass; a shared ancestor is computed the first
/// time any descendant reaches it. When `previous` holds a node whose data and
/// computed values are unchanged, its `Rc` is reused so callers can skip work
/// with `Rc::ptr_eq`. Missing and cyclic parents are reported and the affected
/// nodes are placed at their raw positions.
pub fn resolve_nodes(
    nodes: &[Node],
    previous: Option<&ResolvedNodes>,
    options: &ResolveOptions,
) -> (ResolvedNodes, Vec<FlowError>) {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.entry(node.id.as_str()).or_insert(i);
    }

    let mut resolved: Vec<Option<Rc<ResolvedNode>>> = vec![None; nodes.len()];
    let mut errors = Vec::new();

    for start in 0..nodes.len() {
        if resolved[start].is_some() {
            continue;
        }

        // Walk up until we reach a root, an already resolved ancestor, or a
        // broken link.
        let mut chain = vec![start];
        let mut on_chain: HashSet<usize> = HashSet::from([start]);
        let end = loop {
            let current = chain[chain.len() - 1];
            let Some(parent_id) = nodes[current].parent_id.as_deref() else {
                break ChainEnd::Root;
            };
            match index.get(parent_id) {
                None => break ChainEnd::MissingParent,
                Some(&p) if resolved[p].is_some() => break ChainEnd::Anchored(p),
                Some(&p) if on_chain.contains(&p) => {
                    let from = chain.iter().position(|&c| c == p).unwrap_or(0);
                    break ChainEnd::Cycle(from);
                }
                Some(&p) => {
                    chain.push(p);
                    on_chain.insert(p);
                }
            }
        };

        // Index into `chain` above which everything is already resolved.
        let mut pending = chain.len();
        match end {
            ChainEnd::Root => {
                let top = chain[pending - 1];
                resolved[top] = Some(place(&nodes[top], None, false, previous, options));
                pending -= 1;
            }
            ChainEnd::MissingParent => {
                let top = chain[pending - 1];
                let node = &nodes[top];
                errors.push(FlowError::MissingParent {
                    node_id: node.id.clone(),
                    parent_id: node.parent_id.clone().unwrap_or_default(),
                });
                resolved[top] = Some(place(node, None, true, previous, options));
                pending -= 1;
            }
            ChainEnd::Cycle(from) => {
                let mut cycle: Vec<String> = chain[from..].iter().map(|&c| nodes[c].id.clone()).collect();
                cycle.push(nodes[chain[from]].id.clone());
                errors.push(FlowError::ParentCycle {
                    node_id: nodes[chain[from]].id.clone(),
                    cycle,
                });
                for &member in &chain[from..] {
                    resolved[member] = Some(place(&nodes[member], None, true, previous, options));
                }
                pending = from;
            }
            ChainEnd::Anchored(_) => {}
        }

        // Resolve the rest top-down.
        for k in (0..pending).rev() {
            let idx = chain[k];
            let parent_idx = match nodes[idx].parent_id.as_deref().and_then(|p| index.get(p)) {
                Some(&p) => p,
                None => continue,
            };
            let parent = resolved[parent_idx].clone();
            resolved[idx] = Some(place(&nodes[idx], parent.as_deref(), false, previous, options));
        }
    }

    let mut out = ResolvedNodes {
        nodes: Vec::with_capacity(nodes.len()),
        index: HashMap::with_capacity(nodes.len()),
    };
    for (i, entry) in resolved.into_iter().enumerate() {
        if let Some(rn) = entry {
            out.index.entry(nodes[i].id.clone()).or_insert(out.nodes.len());
            out.nodes.push(rn);
        }
    }

    if !errors.is_empty() {
        log::debug!("resolve pass over {} nodes reported {} problem(s)", nodes.len(), errors.len());
    }
    (out, errors)
}

fn own_z(node: &Node, options: &ResolveOptions) -> i32 {
    let base = node.z_index.unwrap_or(0);
    if node.selected && options.elevate_on_select {
        base.saturating_add(options.selected_z_boost)
    } else {
        base
    }
}

/// Compute one node's resolved entry, reusing the previous `Rc` if equal.
fn place(
    node: &Node,
    parent: Option<&ResolvedNode>,
    detached: bool,
    previous: Option<&ResolvedNodes>,
    options: &ResolveOptions,
) -> Rc<ResolvedNode> {
    let (absolute_position, z, depth) = match parent {
        Some(p) => (
            p.top_left() + node.position,
            own_z(node, options).max(p.z),
            p.depth + 1,
        ),
        None => (node.position, own_z(node, options), 0),
    };

    if let Some(prev) = previous.and_then(|p| p.get(&node.id)) {
        if prev.absolute_position == absolute_position
            && prev.z == z
            && prev.depth == depth
            && prev.detached == detached
            && prev.origin == options.node_origin
            && prev.node == *node
        {
            return Rc::clone(prev);
        }
    }

    Rc::new(ResolvedNode {
        node: node.clone(),
        absolute_position,
        z,
        depth,
        detached,
        origin: options.node_origin,
    })
}

/// Holds the previous pass so unchanged nodes keep their identity.
#[derive(Debug, Default)]
pub struct HierarchyResolver {
    options: ResolveOptions,
    current: ResolvedNodes,
}

impl HierarchyResolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            current: ResolvedNodes::default(),
        }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Changing options invalidates every cached entry.
    pub fn set_options(&mut self, options: ResolveOptions) {
        if options != self.options {
            self.options = options;
            self.current = ResolvedNodes::default();
        }
    }

    pub fn resolve(&mut self, nodes: &[Node]) -> Vec<FlowError> {
        let (next, errors) = resolve_nodes(nodes, Some(&self.current), &self.options);
        self.current = next;
        errors
    }

    pub fn resolved(&self) -> &ResolvedNodes {
        &self.current
    }
}
