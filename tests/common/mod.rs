//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use flow_canvas::{ConnectionEvent, EdgeChange, Flow, NodeChange, ViewportEvent};
use std::cell::RefCell;
use std::rc::Rc;

/// Install `env_logger` once per test binary so `RUST_LOG=debug` shows engine logs.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every notification a [`Flow`] sends.
#[derive(Default, Clone)]
pub struct EventTracker {
    pub node_changes: Rc<RefCell<Vec<Vec<NodeChange>>>>,
    pub edge_changes: Rc<RefCell<Vec<Vec<EdgeChange>>>>,
    pub connection: Rc<RefCell<Vec<ConnectionEvent>>>,
    pub viewport: Rc<RefCell<Vec<ViewportEvent>>>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all of `flow`'s listener lists.
    pub fn attach(&self, flow: &mut Flow) {
        let sink = self.node_changes.clone();
        flow.on_nodes_change(move |c| sink.borrow_mut().push(c.clone()));
        let sink = self.edge_changes.clone();
        flow.on_edges_change(move |c| sink.borrow_mut().push(c.clone()));
        let sink = self.connection.clone();
        flow.on_connection(move |e| sink.borrow_mut().push(e.clone()));
        let sink = self.viewport.clone();
        flow.on_viewport(move |e| sink.borrow_mut().push(*e));
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.node_changes.borrow_mut().clear();
        self.edge_changes.borrow_mut().clear();
        self.connection.borrow_mut().clear();
        self.viewport.borrow_mut().clear();
    }

    /// Every node change, flattened across batches.
    pub fn all_node_changes(&self) -> Vec<NodeChange> {
        self.node_changes.borrow().iter().flatten().cloned().collect()
    }

    pub fn all_edge_changes(&self) -> Vec<EdgeChange> {
        self.edge_changes.borrow().iter().flatten().cloned().collect()
    }

    pub fn connects(&self) -> usize {
        self.connection
            .borrow()
            .iter()
            .filter(|e| matches!(e, ConnectionEvent::Connect(_)))
            .count()
    }
}
