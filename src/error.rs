//! Error taxonomy for the engine.
//!
//! Nothing in this crate panics on a data-shape problem. Structural and
//! configuration problems are reported through an [`ErrorHandler`] (or
//! returned alongside a pure function's output) and the offending element is
//! skipped; only misuse of the API surfaces as an `Err`.

use thiserror::Error;

/// Which end of an edge a structural problem refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
    Source,
    Target,
}

impl std::fmt::Display for EdgeEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeEnd::Source => write!(f, "source"),
            EdgeEnd::Target => write!(f, "target"),
        }
    }
}

/// Broad classification of a [`FlowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inconsistent node/edge data. The element is skipped for the pass.
    Structural,
    /// Invalid options. The engine falls back to permissive defaults.
    Configuration,
    /// The caller used the API before it was ready.
    Usage,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Node '{node_id}' references parent '{parent_id}', which is not in the collection")]
    MissingParent { node_id: String, parent_id: String },

    #[error("Parent chain of node '{node_id}' forms a cycle: {}", cycle.join(" -> "))]
    ParentCycle { node_id: String, cycle: Vec<String> },

    #[error("Edge '{edge_id}' has {end} node '{node_id}', which is not in the collection")]
    MissingEdgeNode {
        edge_id: String,
        node_id: String,
        end: EdgeEnd,
    },

    #[error("Edge '{edge_id}' uses {end} handle '{handle_id}', which node '{node_id}' does not have")]
    MissingHandle {
        edge_id: String,
        node_id: String,
        handle_id: String,
        end: EdgeEnd,
    },

    #[error("Zoom range [{min_zoom}, {max_zoom}] is invalid, falling back to the default range")]
    InvalidZoomRange { min_zoom: f32, max_zoom: f32 },

    #[error("Option '{field}' is invalid: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Failed to parse configuration JSON: {0}")]
    ConfigParse(String),

    #[error("Viewport has no size yet; call set_size before using viewport operations")]
    ViewportNotInitialized,
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParent { .. }
            | Self::ParentCycle { .. }
            | Self::MissingEdgeNode { .. }
            | Self::MissingHandle { .. } => ErrorKind::Structural,
            Self::InvalidZoomRange { .. } | Self::InvalidConfig { .. } | Self::ConfigParse(_) => {
                ErrorKind::Configuration
            }
            Self::ViewportNotInitialized => ErrorKind::Usage,
        }
    }

    /// Stable short code, suitable for the `onError(code, message)` style channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParent { .. } => "missing-parent",
            Self::ParentCycle { .. } => "parent-cycle",
            Self::MissingEdgeNode { .. } => "missing-edge-node",
            Self::MissingHandle { .. } => "missing-handle",
            Self::InvalidZoomRange { .. } => "invalid-zoom-range",
            Self::InvalidConfig { .. } => "invalid-config",
            Self::ConfigParse(_) => "config-parse",
            Self::ViewportNotInitialized => "viewport-not-initialized",
        }
    }
}

/// Caller-supplied channel for recoverable errors.
pub type ErrorHandler = Box<dyn FnMut(&FlowError)>;

/// Handler used when the caller has not registered one.
pub fn log_error_handler() -> ErrorHandler {
    Box::new(|err: &FlowError| log::warn!("[{}] {}", err.code(), err))
}
