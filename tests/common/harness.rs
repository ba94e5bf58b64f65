//! Test harness: a sized canvas with two connected nodes.
//!
//! Layout (flow space, identity transform):
//!
//! ```text
//!   A (100,100) 150x100           B (400,200) 150x100
//!   in  @ left  (100,150)         in  @ left  (400,250)
//!   out @ right (250,150) ------> out @ right (550,250)
//! ```

#![allow(dead_code)]

use super::{init_logging, EventTracker};
use flow_canvas::{
    Edge, Flow, FlowConfig, Handle, Modifiers, Node, Point, PointerEvent, Side, Transform, WheelEvent,
};
use std::time::Duration;

pub const VIEWPORT_WIDTH: f32 = 800.0;
pub const VIEWPORT_HEIGHT: f32 = 600.0;

/// Node with one target handle on the left and one source handle on the right.
pub fn io_node(id: &str, x: f32, y: f32) -> Node {
    Node::new(id, x, y)
        .with_dimensions(150.0, 100.0)
        .with_handle(Handle::target(Side::Left).with_id("in").with_bounds(0.0, 50.0, 0.0, 0.0))
        .with_handle(Handle::source(Side::Right).with_id("out").with_bounds(150.0, 50.0, 0.0, 0.0))
}

pub struct FlowHarness {
    pub flow: Flow,
    pub tracker: EventTracker,
}

impl FlowHarness {
    pub fn new() -> Self {
        Self::with_config(FlowConfig::default())
    }

    pub fn with_config(config: FlowConfig) -> Self {
        Self::with_graph(
            config,
            vec![io_node("A", 100.0, 100.0), io_node("B", 400.0, 200.0)],
            vec![Edge::new("A-B", "A", "B").with_handles(Some("out"), Some("in"))],
        )
    }

    pub fn with_graph(config: FlowConfig, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        init_logging();
        let mut flow = Flow::new(config);
        flow.set_viewport_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT);
        flow.set_nodes(nodes);
        flow.set_edges(edges);
        let tracker = EventTracker::new();
        tracker.attach(&mut flow);
        Self { flow, tracker }
    }

    // === Input simulation (screen space) ===

    pub fn press(&mut self, x: f32, y: f32) -> bool {
        self.flow.pointer_down(PointerEvent::primary(x, y))
    }

    pub fn press_with(&mut self, x: f32, y: f32, modifiers: Modifiers) -> bool {
        self.flow
            .pointer_down(PointerEvent::primary(x, y).with_modifiers(modifiers))
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.flow.pointer_move(Point::new(x, y));
    }

    pub fn release(&mut self, x: f32, y: f32) {
        self.flow.pointer_up(Point::new(x, y));
    }

    pub fn click(&mut self, x: f32, y: f32) {
        self.press(x, y);
        self.release(x, y);
    }

    pub fn click_with(&mut self, x: f32, y: f32, modifiers: Modifiers) {
        self.press_with(x, y, modifiers);
        self.release(x, y);
    }

    /// Press, move in `steps` increments, release.
    pub fn drag(&mut self, from: (f32, f32), to: (f32, f32), steps: usize) {
        self.press(from.0, from.1);
        let steps = steps.max(1);
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            self.move_to(from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
        }
        self.release(to.0, to.1);
    }

    pub fn scroll(&mut self, x: f32, y: f32, delta_x: f32, delta_y: f32, ctrl: bool) -> bool {
        self.flow.wheel(WheelEvent {
            position: Point::new(x, y),
            delta_x,
            delta_y,
            ctrl,
        })
    }

    /// Advance `frames` frames of 16ms.
    pub fn run_frames(&mut self, frames: usize) {
        for _ in 0..frames {
            self.flow.tick(Duration::from_millis(16));
        }
    }

    // === Queries ===

    pub fn position(&self, id: &str) -> Point {
        self.flow.node(id).map(|n| n.position).unwrap_or(Point::new(f32::NAN, f32::NAN))
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.flow.node(id).map_or(false, |n| n.selected)
    }

    pub fn is_edge_selected(&self, id: &str) -> bool {
        self.flow.edges().iter().any(|e| e.id == id && e.selected)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.flow
            .nodes()
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn transform(&self) -> Transform {
        self.flow.transform()
    }
}
