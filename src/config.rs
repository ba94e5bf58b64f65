//! Canvas options.
//!
//! `FlowConfig` deserialises from the camelCase JSON option object callers
//! already keep around. Invalid values never stop the canvas from working:
//! [`FlowConfig::validated`] swaps them for defaults and reports what it
//! changed.

use crate::connection::ConnectionMode;
use crate::error::FlowError;
use crate::geometry::Rect;
use crate::selection::SelectionMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_ZOOM: f32 = 0.5;
pub const DEFAULT_MAX_ZOOM: f32 = 2.0;
pub const DEFAULT_SNAP_GRID: [f32; 2] = [15.0, 15.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Flow-space area the viewport may show. `None` is unbounded.
    pub translate_extent: Option<Rect>,
    /// Handle hit-test tolerance in screen pixels.
    pub connection_radius: f32,
    pub connection_mode: ConnectionMode,
    pub snap_to_grid: bool,
    pub snap_grid: [f32; 2],
    pub selection_mode: SelectionMode,
    /// Fraction of a node's size its `position` is anchored at.
    pub node_origin: [f32; 2],
    pub elevate_nodes_on_select: bool,
    pub elevate_edges_on_select: bool,
    pub selected_z_boost: i32,
    pub auto_pan_on_connect: bool,
    pub auto_pan_on_node_drag: bool,
    /// Screen pixels per tick at full speed.
    pub auto_pan_speed: f32,
    pub auto_pan_margin: f32,
    pub pan_on_scroll_speed: f32,
    pub zoom_step: f32,
    pub fit_view_padding: f32,
    pub node_drag_threshold: f32,
    pub default_edge_type: String,
    pub elements_selectable: bool,
    pub nodes_draggable: bool,
    pub nodes_connectable: bool,
    pub delete_on_key: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            translate_extent: None,
            connection_radius: 20.0,
            connection_mode: ConnectionMode::Strict,
            snap_to_grid: false,
            snap_grid: DEFAULT_SNAP_GRID,
            selection_mode: SelectionMode::Full,
            node_origin: [0.0, 0.0],
            elevate_nodes_on_select: true,
            elevate_edges_on_select: false,
            selected_z_boost: 1000,
            auto_pan_on_connect: true,
            auto_pan_on_node_drag: true,
            auto_pan_speed: 15.0,
            auto_pan_margin: 40.0,
            pan_on_scroll_speed: 0.5,
            zoom_step: 1.2,
            fit_view_padding: 0.1,
            node_drag_threshold: 1.0,
            default_edge_type: "default".to_string(),
            elements_selectable: true,
            nodes_draggable: true,
            nodes_connectable: true,
            delete_on_key: true,
        }
    }
}

impl FlowConfig {
    /// Parse a JSON option object and validate it.
    ///
    /// A parse failure is returned as `Err`; invalid values inside a
    /// well-formed object come back as errors next to the corrected config.
    pub fn from_json(json: &str) -> Result<(FlowConfig, Vec<FlowError>), FlowError> {
        let config: FlowConfig =
            serde_json::from_str(json).map_err(|e| FlowError::ConfigParse(e.to_string()))?;
        Ok(config.validated())
    }

    /// Replace invalid values with defaults, reporting each replacement.
    pub fn validated(mut self) -> (FlowConfig, Vec<FlowError>) {
        let defaults = FlowConfig::default();
        let mut errors = Vec::new();

        let zoom_ok = self.min_zoom.is_finite()
            && self.max_zoom.is_finite()
            && self.min_zoom > 0.0
            && self.min_zoom <= self.max_zoom;
        if !zoom_ok {
            errors.push(FlowError::InvalidZoomRange {
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
            });
            self.min_zoom = defaults.min_zoom;
            self.max_zoom = defaults.max_zoom;
        }

        if let Some(extent) = self.translate_extent {
            let finite = extent.x.is_finite()
                && extent.y.is_finite()
                && extent.width.is_finite()
                && extent.height.is_finite();
            if !finite {
                errors.push(invalid("translateExtent", "must be finite"));
                self.translate_extent = None;
            } else {
                self.translate_extent = Some(extent.normalized());
            }
        }

        let mut non_negative = |field: &str, value: &mut f32, default: f32| {
            if !value.is_finite() || *value < 0.0 {
                errors.push(invalid(field, &format!("{} is not a non-negative number", value)));
                *value = default;
            }
        };
        non_negative("connectionRadius", &mut self.connection_radius, defaults.connection_radius);
        non_negative("autoPanSpeed", &mut self.auto_pan_speed, defaults.auto_pan_speed);
        non_negative("autoPanMargin", &mut self.auto_pan_margin, defaults.auto_pan_margin);
        non_negative("panOnScrollSpeed", &mut self.pan_on_scroll_speed, defaults.pan_on_scroll_speed);
        non_negative("fitViewPadding", &mut self.fit_view_padding, defaults.fit_view_padding);
        non_negative("nodeDragThreshold", &mut self.node_drag_threshold, defaults.node_drag_threshold);

        if !self.zoom_step.is_finite() || self.zoom_step <= 1.0 {
            errors.push(invalid("zoomStep", "must be greater than 1"));
            self.zoom_step = defaults.zoom_step;
        }

        if self.snap_grid.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            errors.push(invalid("snapGrid", "cells must be positive"));
            self.snap_grid = DEFAULT_SNAP_GRID;
        }

        if self.node_origin.iter().any(|o| !(0.0..=1.0).contains(o)) {
            errors.push(invalid("nodeOrigin", "components must be within [0, 1]"));
            for o in self.node_origin.iter_mut() {
                *o = if o.is_finite() { o.clamp(0.0, 1.0) } else { 0.0 };
            }
        }

        (self, errors)
    }
}

fn invalid(field: &str, message: &str) -> FlowError {
    FlowError::InvalidConfig {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let (config, errors) = FlowConfig::default().validated();
        assert!(errors.is_empty());
        assert_eq!(config, FlowConfig::default());
    }

    #[test]
    fn test_from_json_camel_case() {
        let (config, errors) = FlowConfig::from_json(
            r#"{"minZoom": 0.25, "maxZoom": 4, "connectionMode": "loose", "snapToGrid": true, "snapGrid": [10, 20]}"#,
        )
        .unwrap();
        assert!(errors.is_empty());
        assert_eq!(config.min_zoom, 0.25);
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.connection_mode, ConnectionMode::Loose);
        assert!(config.snap_to_grid);
        assert_eq!(config.snap_grid, [10.0, 20.0]);
        // Omitted fields keep their defaults
        assert_eq!(config.connection_radius, 20.0);
    }

    #[test]
    fn test_inverted_zoom_falls_back() {
        let config = FlowConfig {
            min_zoom: 3.0,
            max_zoom: 1.0,
            ..FlowConfig::default()
        };
        let (config, errors) = config.validated();
        assert_eq!((config.min_zoom, config.max_zoom), (DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "invalid-zoom-range");
    }

    #[test]
    fn test_bad_values_reported_individually() {
        let config = FlowConfig {
            connection_radius: -5.0,
            snap_grid: [0.0, 15.0],
            node_origin: [1.5, -0.5],
            translate_extent: Some(Rect::new(100.0, 100.0, -200.0, -50.0)),
            ..FlowConfig::default()
        };
        let (config, errors) = config.validated();
        assert_eq!(errors.len(), 3);
        assert_eq!(config.connection_radius, 20.0);
        assert_eq!(config.snap_grid, DEFAULT_SNAP_GRID);
        assert_eq!(config.node_origin, [1.0, 0.0]);
        assert_eq!(config.translate_extent, Some(Rect::new(-100.0, 50.0, 200.0, 50.0)));
    }

    #[test]
    fn test_malformed_json() {
        let err = FlowConfig::from_json("{ not json").unwrap_err();
        assert_eq!(err.code(), "config-parse");
    }
}
