//! Points, rectangles and the flow/screen transform.
//!
//! Flow space is where node positions live. Screen space is pixels on the
//! viewport. A [`Transform`] maps one to the other:
//! `screen = flow * zoom + (x, y)`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point::new(x, y)
    }
}

/// Measured width/height of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box in flow space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Box spanned by two corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Rect::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    pub fn from_position(position: Point, dimensions: Dimensions) -> Self {
        Rect::new(position.x, position.y, dimensions.width, dimensions.height)
    }

    /// Same box with negative width/height flipped into positive extents.
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Rect::new(x, y, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty_area(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    pub fn contains_point(&self, p: Point) -> bool {
        let r = self.normalized();
        p.x >= r.x && p.x <= r.right() && p.y >= r.y && p.y <= r.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let a = self.normalized();
        let b = other.normalized();
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Rect::new(x, y, a.right().max(b.right()) - x, a.bottom().max(b.bottom()) - y)
    }

    /// Grow by `amount` on every side.
    pub fn inflate(&self, amount: f32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }
}

/// Pan/zoom state: `screen = flow * zoom + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, zoom: 1.0 };

    pub const fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }

    /// Zoom guarded against zero so inversion never divides by zero.
    fn safe_zoom(&self) -> f32 {
        if self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    pub fn apply(&self, flow: Point) -> Point {
        Point::new(flow.x * self.zoom + self.x, flow.y * self.zoom + self.y)
    }

    pub fn invert(&self, screen: Point) -> Point {
        let z = self.safe_zoom();
        Point::new((screen.x - self.x) / z, (screen.y - self.y) / z)
    }

    /// Flow-space rectangle visible through a `width` x `height` viewport.
    pub fn visible_rect(&self, width: f32, height: f32) -> Rect {
        let z = self.safe_zoom();
        let origin = self.invert(Point::ZERO);
        Rect::new(origin.x, origin.y, width / z, height / z)
    }

    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.zoom - other.zoom).abs() <= epsilon
    }
}

pub fn screen_to_flow(point: Point, transform: &Transform) -> Point {
    transform.invert(point)
}

pub fn flow_to_screen(point: Point, transform: &Transform) -> Point {
    transform.apply(point)
}

/// Smallest rectangle containing all inputs, or `None` for an empty slice.
pub fn rect_union(rects: &[Rect]) -> Option<Rect> {
    let (first, rest) = rects.split_first()?;
    Some(rest.iter().fold(first.normalized(), |acc, r| acc.union(r)))
}

/// Test `a` against `b`.
///
/// With `partial` set, any overlap counts (touching the selection rectangle,
/// visibility culling). Without it, `b` must fully contain `a`. Negative
/// extents are normalised first; a zero-area box is tested as a point or
/// segment, so touching edges count for it.
pub fn rects_intersect(a: &Rect, b: &Rect, partial: bool) -> bool {
    let a = a.normalized();
    let b = b.normalized();

    if !partial {
        return a.x >= b.x && a.right() <= b.right() && a.y >= b.y && a.bottom() <= b.bottom();
    }

    if a.is_empty_area() || b.is_empty_area() {
        a.x <= b.right() && a.right() >= b.x && a.y <= b.bottom() && a.bottom() >= b.y
    } else {
        a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
    }
}

/// Quantise a position to the nearest grid intersection.
pub fn snap_position(point: Point, grid: [f32; 2]) -> Point {
    let snap = |v: f32, cell: f32| {
        if cell > 0.0 {
            (v / cell).round() * cell
        } else {
            v
        }
    };
    Point::new(snap(point.x, grid[0]), snap(point.y, grid[1]))
}

/// Keep a box of `dimensions` anchored at `point` inside `extent`.
pub fn clamp_position(point: Point, extent: &Rect, dimensions: Dimensions) -> Point {
    let extent = extent.normalized();
    let max_x = (extent.right() - dimensions.width).max(extent.x);
    let max_y = (extent.bottom() - dimensions.height).max(extent.y);
    Point::new(point.x.clamp(extent.x, max_x), point.y.clamp(extent.y, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    // ========================================================================
    // Transform conversions
    // ========================================================================

    #[test]
    fn test_flow_to_screen_applies_zoom_then_offset() {
        let t = Transform::new(10.0, 20.0, 2.0);
        assert_eq!(flow_to_screen(Point::new(5.0, 5.0), &t), Point::new(20.0, 30.0));
    }

    #[test]
    fn test_screen_to_flow_inverts() {
        let t = Transform::new(-35.0, 12.5, 0.75);
        let p = Point::new(123.0, -40.0);
        assert!(approx(screen_to_flow(flow_to_screen(p, &t), &t), p));
    }

    #[test]
    fn test_screen_to_flow_zero_zoom_does_not_divide_by_zero() {
        let t = Transform::new(10.0, 10.0, 0.0);
        let p = screen_to_flow(Point::new(20.0, 20.0), &t);
        assert!(p.is_finite());
        assert_eq!(p, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_visible_rect() {
        let t = Transform::new(-100.0, -50.0, 2.0);
        let r = t.visible_rect(800.0, 400.0);
        assert_eq!(r, Rect::new(50.0, 25.0, 400.0, 200.0));
    }

    // ========================================================================
    // rect_union()
    // ========================================================================

    #[test]
    fn test_rect_union_empty() {
        assert_eq!(rect_union(&[]), None);
    }

    #[test]
    fn test_rect_union_covers_all() {
        let rects = [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(100.0, 50.0, 20.0, 30.0),
            Rect::new(-5.0, 20.0, 1.0, 1.0),
        ];
        assert_eq!(rect_union(&rects), Some(Rect::new(-5.0, 0.0, 125.0, 80.0)));
    }

    #[test]
    fn test_rect_union_normalizes_negative_extent() {
        let rects = [Rect::new(10.0, 10.0, -10.0, -10.0)];
        assert_eq!(rect_union(&rects), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    // ========================================================================
    // rects_intersect()
    // ========================================================================

    #[test]
    fn test_partial_vs_full_selection() {
        let node = Rect::new(0.0, 0.0, 10.0, 10.0);
        let selection = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(rects_intersect(&node, &selection, true));
        assert!(!rects_intersect(&node, &selection, false));
    }

    #[test]
    fn test_full_containment() {
        let node = Rect::new(10.0, 10.0, 10.0, 10.0);
        let selection = Rect::new(0.0, 0.0, 50.0, 50.0);
        assert!(rects_intersect(&node, &selection, false));
        assert!(rects_intersect(&node, &selection, true));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!rects_intersect(&a, &b, true));
    }

    #[test]
    fn test_negative_drag_rect_is_normalized() {
        let node = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Dragged from (20, 20) up-left to (-5, -5)
        let selection = Rect::new(20.0, 20.0, -25.0, -25.0);
        assert!(rects_intersect(&node, &selection, false));
    }

    #[test]
    fn test_zero_area_rect_is_a_point() {
        let point = Rect::new(5.0, 5.0, 0.0, 0.0);
        let b = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rects_intersect(&point, &b, true));
        assert!(rects_intersect(&point, &b, false));

        let on_edge = Rect::new(10.0, 5.0, 0.0, 0.0);
        assert!(rects_intersect(&on_edge, &b, true));

        let outside = Rect::new(11.0, 5.0, 0.0, 0.0);
        assert!(!rects_intersect(&outside, &b, true));
    }

    // ========================================================================
    // Snapping and clamping
    // ========================================================================

    #[test]
    fn test_snap_position() {
        let p = snap_position(Point::new(22.0, 8.0), [15.0, 15.0]);
        assert_eq!(p, Point::new(15.0, 15.0));
        let p = snap_position(Point::new(-8.0, 31.0), [15.0, 10.0]);
        assert_eq!(p, Point::new(-15.0, 30.0));
    }

    #[test]
    fn test_snap_position_zero_cell_is_noop() {
        let p = snap_position(Point::new(22.5, 8.25), [0.0, 0.0]);
        assert_eq!(p, Point::new(22.5, 8.25));
    }

    #[test]
    fn test_clamp_position_keeps_box_inside() {
        let extent = Rect::new(0.0, 0.0, 100.0, 100.0);
        let dims = Dimensions::new(20.0, 10.0);
        assert_eq!(
            clamp_position(Point::new(95.0, -5.0), &extent, dims),
            Point::new(80.0, 0.0)
        );
    }

    #[test]
    fn test_clamp_position_box_larger_than_extent() {
        let extent = Rect::new(0.0, 0.0, 10.0, 10.0);
        let dims = Dimensions::new(50.0, 50.0);
        assert_eq!(
            clamp_position(Point::new(30.0, 30.0), &extent, dims),
            Point::new(0.0, 0.0)
        );
    }
}
