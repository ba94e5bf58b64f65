//! Viewport transform engine.
//!
//! Owns the pan/zoom [`Transform`] of one canvas. User gestures go through a
//! small state machine (`Idle -> Panning | Zooming -> Idle`); imperative
//! operations (`zoom_to`, `set_center`, `fit_bounds`, ...) share the same
//! clamping. Animated operations and auto-pan advance on [`ViewportEngine::tick`],
//! which the host calls once per animation frame.

use crate::config::{FlowConfig, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use crate::error::FlowError;
use crate::events::{ListenerId, Listeners};
use crate::geometry::{Point, Rect, Transform};
use std::time::Duration;

/// Wheel delta to zoom exponent, per pixel of `delta_y`.
const WHEEL_ZOOM_RATE: f32 = 0.002 * 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    /// Drag or plain scroll.
    Pan,
    /// Pinch or ctrl-wheel.
    Zoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportPhase {
    Idle,
    Panning,
    Zooming,
}

/// Notifications sent to viewport listeners.
///
/// A user gesture yields `Start`, zero or more `Change`, then exactly one
/// `End`. Animations do the same across ticks. Synchronous imperative
/// operations only yield `Change`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    Start(Transform),
    Change(Transform),
    End(Transform),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    /// Pointer position in screen space.
    pub position: Point,
    pub delta_x: f32,
    pub delta_y: f32,
    pub ctrl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBoundsOptions {
    /// Fraction of the bounds' size added around it.
    pub padding: f32,
    pub min_zoom: Option<f32>,
    pub max_zoom: Option<f32>,
    pub duration: Duration,
}

impl Default for FitBoundsOptions {
    fn default() -> Self {
        Self {
            padding: 0.1,
            min_zoom: None,
            max_zoom: None,
            duration: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportOptions {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub translate_extent: Option<Rect>,
    pub zoom_step: f32,
    pub pan_on_scroll_speed: f32,
    pub auto_pan_speed: f32,
    pub auto_pan_margin: f32,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self::from(&FlowConfig::default())
    }
}

impl ViewportOptions {
    /// Options with an unusable zoom range replaced by the default range.
    pub fn sanitized(mut self) -> Self {
        let usable = self.min_zoom.is_finite()
            && self.max_zoom.is_finite()
            && self.min_zoom > 0.0
            && self.min_zoom <= self.max_zoom;
        if !usable {
            log::warn!(
                "{}",
                FlowError::InvalidZoomRange {
                    min_zoom: self.min_zoom,
                    max_zoom: self.max_zoom,
                }
            );
            self.min_zoom = DEFAULT_MIN_ZOOM;
            self.max_zoom = DEFAULT_MAX_ZOOM;
        }
        self
    }
}

impl From<&FlowConfig> for ViewportOptions {
    fn from(config: &FlowConfig) -> Self {
        Self {
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            translate_extent: config.translate_extent,
            zoom_step: config.zoom_step,
            pan_on_scroll_speed: config.pan_on_scroll_speed,
            auto_pan_speed: config.auto_pan_speed,
            auto_pan_margin: config.auto_pan_margin,
        }
    }
}

/// d3's `easeCubicInOut`.
pub fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Eased interpolation between two transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformAnimation {
    pub from: Transform,
    pub to: Transform,
    pub duration: Duration,
    pub elapsed: Duration,
}

impl TransformAnimation {
    pub fn new(from: Transform, to: Transform, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn sample(&self) -> Transform {
        let t = ease_cubic_in_out(self.progress());
        let lerp = |a: f32, b: f32| a + (b - a) * t;
        Transform::new(
            lerp(self.from.x, self.to.x),
            lerp(self.from.y, self.to.y),
            lerp(self.from.zoom, self.to.zoom),
        )
    }
}

/// Auto-pan velocity for a pointer near the viewport edge.
///
/// The result is the direction the view travels across the flow, in screen
/// pixels per tick: a pointer near the left edge yields negative x. Speed
/// ramps from near zero at `margin` to `speed` at the edge.
pub fn calc_auto_pan(pointer: Point, width: f32, height: f32, speed: f32, margin: f32) -> Point {
    if margin.is_nan() || margin <= 0.0 {
        return Point::ZERO;
    }
    // Sub-pixel margins still ramp from a floor no larger than the margin
    let floor = margin.min(1.0);
    let velocity = |value: f32, max: f32| {
        if value < margin {
            -(value - margin).abs().clamp(floor, margin) / margin
        } else if value > max {
            (value - max).abs().clamp(floor, margin) / margin
        } else {
            0.0
        }
    };
    Point::new(
        velocity(pointer.x, width - margin) * speed,
        velocity(pointer.y, height - margin) * speed,
    )
}

/// Shift one translation axis so `[lo, hi]` covers the visible range, or the
/// visible range is centred on it when the extent is smaller than the view.
fn constrain_axis(pos: f32, zoom: f32, view: f32, lo: f32, hi: f32) -> f32 {
    let d0 = -pos / zoom - lo;
    let d1 = (view - pos) / zoom - hi;
    let shift = if d1 > d0 {
        (d0 + d1) / 2.0
    } else {
        let toward_lo = d0.min(0.0);
        if toward_lo != 0.0 {
            toward_lo
        } else {
            d1.max(0.0)
        }
    };
    pos + zoom * shift
}

pub struct ViewportEngine {
    transform: Transform,
    width: f32,
    height: f32,
    options: ViewportOptions,
    phase: ViewportPhase,
    /// Pointer and transform at gesture start.
    gesture_origin: Option<(Point, Transform)>,
    last_emitted: Transform,
    animation: Option<TransformAnimation>,
    auto_pan_pointer: Option<Point>,
    listeners: Listeners<ViewportEvent>,
}

impl Default for ViewportEngine {
    fn default() -> Self {
        Self::new(ViewportOptions::default())
    }
}

impl std::fmt::Debug for ViewportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportEngine")
            .field("transform", &self.transform)
            .field("size", &(self.width, self.height))
            .field("phase", &self.phase)
            .field("animating", &self.animation.is_some())
            .finish()
    }
}

impl ViewportEngine {
    pub fn new(options: ViewportOptions) -> Self {
        let mut engine = Self {
            transform: Transform::IDENTITY,
            width: 0.0,
            height: 0.0,
            options: options.sanitized(),
            phase: ViewportPhase::Idle,
            gesture_origin: None,
            last_emitted: Transform::IDENTITY,
            animation: None,
            auto_pan_pointer: None,
            listeners: Listeners::new(),
        };
        engine.transform = engine.constrain(Transform::IDENTITY);
        engine.last_emitted = engine.transform;
        engine
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn phase(&self) -> ViewportPhase {
        self.phase
    }

    pub fn options(&self) -> &ViewportOptions {
        &self.options
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ViewportEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Replace options and re-clamp the current transform.
    pub fn set_options(&mut self, options: ViewportOptions) {
        self.options = options.sanitized();
        self.commit(self.transform);
    }

    /// Report the viewport's pixel size, e.g. from a resize observer.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.commit(self.transform);
    }

    fn ensure_size(&self) -> Result<(), FlowError> {
        if self.width > 0.0 && self.height > 0.0 {
            Ok(())
        } else {
            Err(FlowError::ViewportNotInitialized)
        }
    }

    /// Flow-space rectangle currently visible.
    pub fn visible_flow_rect(&self) -> Rect {
        self.transform.visible_rect(self.width, self.height)
    }

    pub fn screen_to_flow(&self, point: Point) -> Point {
        self.transform.invert(point)
    }

    pub fn flow_to_screen(&self, point: Point) -> Point {
        self.transform.apply(point)
    }

    // ------------------------------------------------------------------
    // Clamping and emission
    // ------------------------------------------------------------------

    /// Clamp zoom into range and translation into the translate extent.
    pub fn constrain(&self, t: Transform) -> Transform {
        let zoom = if t.zoom.is_finite() && t.zoom > 0.0 { t.zoom } else { 1.0 };
        let zoom = zoom.clamp(self.options.min_zoom, self.options.max_zoom);
        let mut out = Transform::new(t.x, t.y, zoom);
        if !out.x.is_finite() || !out.y.is_finite() {
            out.x = self.transform.x;
            out.y = self.transform.y;
        }
        if let Some(extent) = self.options.translate_extent {
            let e = extent.normalized();
            out.x = constrain_axis(out.x, zoom, self.width, e.x, e.right());
            out.y = constrain_axis(out.y, zoom, self.height, e.y, e.bottom());
        }
        out
    }

    /// Apply a candidate transform. Emits `Change` only if the clamped result
    /// differs from the last emitted transform.
    fn commit(&mut self, candidate: Transform) -> bool {
        let next = self.constrain(candidate);
        self.transform = next;
        if next == self.last_emitted {
            return false;
        }
        self.last_emitted = next;
        log::trace!("viewport change {:?}", next);
        self.listeners.emit(&ViewportEvent::Change(next));
        true
    }

    /// Transform that zooms to `zoom` keeping `anchor` (screen) fixed.
    fn zoomed_around(&self, anchor: Point, zoom: f32) -> Transform {
        let zoom = zoom.clamp(self.options.min_zoom, self.options.max_zoom);
        let flow = self.transform.invert(anchor);
        Transform::new(anchor.x - flow.x * zoom, anchor.y - flow.y * zoom, zoom)
    }

    fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    // ------------------------------------------------------------------
    // User gestures
    // ------------------------------------------------------------------

    /// Begin a pan or zoom gesture. Ignored while another gesture is active.
    pub fn gesture_start(&mut self, kind: GestureKind, pointer: Point) -> bool {
        if self.phase != ViewportPhase::Idle {
            return false;
        }
        self.stop();
        self.phase = match kind {
            GestureKind::Pan => ViewportPhase::Panning,
            GestureKind::Zoom => ViewportPhase::Zooming,
        };
        self.gesture_origin = Some((pointer, self.transform));
        log::debug!("viewport gesture start: {:?}", self.phase);
        self.listeners.emit(&ViewportEvent::Start(self.transform));
        true
    }

    /// Continue the active gesture.
    ///
    /// `scale` is the pinch scale relative to the gesture start and is ignored
    /// while panning. Returns whether the transform changed.
    pub fn gesture_move(&mut self, pointer: Point, scale: f32) -> bool {
        let Some((start, origin)) = self.gesture_origin else {
            return false;
        };
        let candidate = match self.phase {
            ViewportPhase::Panning => Transform::new(
                origin.x + (pointer.x - start.x),
                origin.y + (pointer.y - start.y),
                origin.zoom,
            ),
            ViewportPhase::Zooming => {
                let zoom = (origin.zoom * scale).clamp(self.options.min_zoom, self.options.max_zoom);
                let flow = origin.invert(start);
                Transform::new(pointer.x - flow.x * zoom, pointer.y - flow.y * zoom, zoom)
            }
            ViewportPhase::Idle => return false,
        };
        self.commit(candidate)
    }

    pub fn gesture_end(&mut self) -> bool {
        if self.phase == ViewportPhase::Idle {
            return false;
        }
        log::debug!("viewport gesture end: {:?}", self.phase);
        self.phase = ViewportPhase::Idle;
        self.gesture_origin = None;
        self.listeners.emit(&ViewportEvent::End(self.transform));
        true
    }

    /// Wheel input: ctrl-wheel zooms around the pointer, plain wheel pans.
    ///
    /// Outside a gesture the wheel step is reported as its own
    /// start/change/end sequence.
    pub fn wheel(&mut self, event: WheelEvent) -> bool {
        let standalone = self.phase == ViewportPhase::Idle;
        if standalone {
            let kind = if event.ctrl { GestureKind::Zoom } else { GestureKind::Pan };
            self.gesture_start(kind, event.position);
        }

        let candidate = if event.ctrl {
            let factor = 2f32.powf(-event.delta_y * WHEEL_ZOOM_RATE);
            self.zoomed_around(event.position, self.transform.zoom * factor)
        } else {
            let speed = self.options.pan_on_scroll_speed;
            Transform::new(
                self.transform.x - event.delta_x * speed,
                self.transform.y - event.delta_y * speed,
                self.transform.zoom,
            )
        };
        let changed = self.commit(candidate);

        if standalone {
            self.gesture_end();
        }
        changed
    }

    // ------------------------------------------------------------------
    // Imperative operations
    // ------------------------------------------------------------------

    /// Jump or animate to `target`. A zero duration applies synchronously;
    /// otherwise any running animation is replaced.
    pub fn set_transform(&mut self, target: Transform, duration: Duration) {
        let target = self.constrain(target);
        if duration.is_zero() {
            self.stop();
            self.commit(target);
            return;
        }
        if self.animation.is_some() {
            log::debug!("viewport animation replaced");
        } else {
            self.listeners.emit(&ViewportEvent::Start(self.transform));
        }
        log::debug!("viewport animation to {:?} over {:?}", target, duration);
        self.animation = Some(TransformAnimation::new(self.transform, target, duration));
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) -> bool {
        let t = self.transform;
        self.commit(Transform::new(t.x + dx, t.y + dy, t.zoom))
    }

    /// Zoom to an absolute level around the viewport centre.
    pub fn zoom_to(&mut self, zoom: f32, duration: Duration) {
        let target = self.zoomed_around(self.center(), zoom);
        self.set_transform(target, duration);
    }

    pub fn zoom_by(&mut self, factor: f32, duration: Duration) {
        self.zoom_to(self.transform.zoom * factor, duration);
    }

    pub fn zoom_in(&mut self, duration: Duration) {
        self.zoom_by(self.options.zoom_step, duration);
    }

    pub fn zoom_out(&mut self, duration: Duration) {
        self.zoom_by(1.0 / self.options.zoom_step, duration);
    }

    /// Centre the viewport on a flow-space point.
    pub fn set_center(&mut self, x: f32, y: f32, zoom: Option<f32>, duration: Duration) -> Result<Transform, FlowError> {
        self.ensure_size()?;
        let zoom = zoom
            .unwrap_or(self.transform.zoom)
            .clamp(self.options.min_zoom, self.options.max_zoom);
        let c = self.center();
        let target = self.constrain(Transform::new(c.x - x * zoom, c.y - y * zoom, zoom));
        self.set_transform(target, duration);
        Ok(target)
    }

    /// Fit `bounds` (flow space) inside the viewport and centre it.
    pub fn fit_bounds(&mut self, bounds: Rect, options: FitBoundsOptions) -> Result<Transform, FlowError> {
        self.ensure_size()?;
        let bounds = bounds.normalized();
        let pad = 1.0 + options.padding.max(0.0);
        let zoom_x = self.width / (bounds.width * pad);
        let zoom_y = self.height / (bounds.height * pad);
        let usable = |z: &f32| z.is_finite() && *z > 0.0;
        let min_zoom = options.min_zoom.filter(usable).unwrap_or(self.options.min_zoom);
        let max_zoom = options
            .max_zoom
            .filter(usable)
            .unwrap_or(self.options.max_zoom)
            .max(min_zoom);
        let zoom = zoom_x.min(zoom_y).clamp(min_zoom, max_zoom);

        let center = bounds.center();
        let target = self.constrain(Transform::new(
            self.width / 2.0 - center.x * zoom,
            self.height / 2.0 - center.y * zoom,
            zoom,
        ));
        self.set_transform(target, options.duration);
        Ok(target)
    }

    /// Cancel an in-flight animation, leaving the transform where it is.
    pub fn stop(&mut self) {
        if self.animation.take().is_some() {
            log::debug!("viewport animation stopped");
            self.listeners.emit(&ViewportEvent::End(self.transform));
        }
    }

    // ------------------------------------------------------------------
    // Auto-pan and frame ticks
    // ------------------------------------------------------------------

    /// Track the pointer of a node or connection drag; `None` ends auto-pan.
    pub fn set_auto_pan_pointer(&mut self, pointer: Option<Point>) {
        self.auto_pan_pointer = pointer;
    }

    pub fn auto_pan_pointer(&self) -> Option<Point> {
        self.auto_pan_pointer
    }

    /// Advance the animation by `dt` and apply one auto-pan step.
    ///
    /// Returns how far the view travelled across the flow from auto-pan, in
    /// screen pixels. Zero when no auto-pan happened or it was clamped away.
    pub fn tick(&mut self, dt: Duration) -> Point {
        if let Some(mut animation) = self.animation.take() {
            animation.elapsed += dt;
            if animation.is_finished() {
                self.commit(animation.to);
                log::debug!("viewport animation finished");
                self.listeners.emit(&ViewportEvent::End(self.transform));
            } else {
                self.commit(animation.sample());
                self.animation = Some(animation);
            }
        }

        let Some(pointer) = self.auto_pan_pointer else {
            return Point::ZERO;
        };
        let velocity = calc_auto_pan(
            pointer,
            self.width,
            self.height,
            self.options.auto_pan_speed,
            self.options.auto_pan_margin,
        );
        if velocity == Point::ZERO {
            return Point::ZERO;
        }
        let before = self.transform;
        self.pan_by(-velocity.x, -velocity.y);
        Point::new(before.x - self.transform.x, before.y - self.transform.y)
    }
}
