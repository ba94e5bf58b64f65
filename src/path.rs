//! Edge path calculators.
//!
//! Every calculator takes the two attachment points with the side of the node
//! each one sits on, and returns an SVG path command string plus the label
//! anchor. Coincident endpoints are allowed and never produce NaN.

use crate::geometry::Point;
use crate::model::Side;

/// Default bezier curvature coefficient.
pub const DEFAULT_CURVATURE: f32 = 0.25;
/// Default distance step edges travel away from a handle before turning.
pub const DEFAULT_STEP_OFFSET: f32 = 20.0;
/// Default corner radius of smoothstep edges.
pub const DEFAULT_BORDER_RADIUS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePathParams {
    pub source: Point,
    pub source_side: Side,
    pub target: Point,
    pub target_side: Side,
}

impl EdgePathParams {
    pub fn new(
        source_x: f32,
        source_y: f32,
        source_side: Side,
        target_x: f32,
        target_y: f32,
        target_side: Side,
    ) -> Self {
        Self {
            source: Point::new(source_x, source_y),
            source_side,
            target: Point::new(target_x, target_y),
            target_side,
        }
    }
}

/// Output of a path calculator.
///
/// `offset_x`/`offset_y` are the label's distance from the source point, which
/// renderers use to size label backgrounds.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    pub path: String,
    pub label_x: f32,
    pub label_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Midpoint of the segment and the half-extents from the source.
fn edge_center(source: Point, target: Point) -> (f32, f32, f32, f32) {
    let offset_x = (target.x - source.x).abs() / 2.0;
    let offset_y = (target.y - source.y).abs() / 2.0;
    let center_x = if target.x < source.x { target.x + offset_x } else { target.x - offset_x };
    let center_y = if target.y < source.y { target.y + offset_y } else { target.y - offset_y };
    (center_x, center_y, offset_x, offset_y)
}

// ============================================================================
// Bezier
// ============================================================================

/// Cubic bezier curve in flow space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point, // Start point
    pub p1: Point, // Control point 1
    pub p2: Point, // Control point 2
    pub p3: Point, // End point
}

impl CubicBezier {
    /// Project control points outward along each endpoint's side.
    pub fn from_params(params: &EdgePathParams, curvature: f32) -> Self {
        Self {
            p0: params.source,
            p1: control_with_curvature(params.source_side, params.source, params.target, curvature),
            p2: control_with_curvature(params.target_side, params.target, params.source, curvature),
            p3: params.target,
        }
    }

    /// Evaluate the curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f32) -> Point {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * self.p0.x + 3.0 * mt2 * t * self.p1.x + 3.0 * mt * t2 * self.p2.x + t3 * self.p3.x;
        let y = mt3 * self.p0.y + 3.0 * mt2 * t * self.p1.y + 3.0 * mt * t2 * self.p2.y + t3 * self.p3.y;
        Point::new(x, y)
    }

    /// Label anchor: the weighted-sum point at t = 0.5, not the arc-length midpoint.
    pub fn center(&self) -> Point {
        Point::new(
            self.p0.x * 0.125 + self.p1.x * 0.375 + self.p2.x * 0.375 + self.p3.x * 0.125,
            self.p0.y * 0.125 + self.p1.y * 0.375 + self.p2.y * 0.375 + self.p3.y * 0.125,
        )
    }

    pub fn to_path(&self) -> String {
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.p0.x, self.p0.y, self.p1.x, self.p1.y, self.p2.x, self.p2.y, self.p3.x, self.p3.y
        )
    }
}

/// Distance a control point is pushed out along its side.
///
/// `distance` is how far the other endpoint lies in front of this one along the
/// side's axis. When it is behind (negative), the push grows with the square
/// root of the overlap so the curve loops around instead of folding back.
fn control_offset(distance: f32, curvature: f32) -> f32 {
    if distance >= 0.0 {
        0.5 * distance
    } else {
        curvature * 25.0 * (-distance).sqrt()
    }
}

fn control_with_curvature(side: Side, from: Point, to: Point, curvature: f32) -> Point {
    match side {
        Side::Left => Point::new(from.x - control_offset(from.x - to.x, curvature), from.y),
        Side::Right => Point::new(from.x + control_offset(to.x - from.x, curvature), from.y),
        Side::Top => Point::new(from.x, from.y - control_offset(from.y - to.y, curvature)),
        Side::Bottom => Point::new(from.x, from.y + control_offset(to.y - from.y, curvature)),
    }
}

pub fn bezier_path(params: &EdgePathParams, curvature: f32) -> EdgePath {
    let bezier = CubicBezier::from_params(params, curvature);
    let center = bezier.center();
    EdgePath {
        path: bezier.to_path(),
        label_x: center.x,
        label_y: center.y,
        offset_x: (center.x - params.source.x).abs(),
        offset_y: (center.y - params.source.y).abs(),
    }
}

/// Bezier with control points halfway along each side's axis.
pub fn simple_bezier_path(params: &EdgePathParams) -> EdgePath {
    let control = |side: Side, from: Point, to: Point| {
        if side.is_horizontal() {
            Point::new(0.5 * (from.x + to.x), from.y)
        } else {
            Point::new(from.x, 0.5 * (from.y + to.y))
        }
    };
    let bezier = CubicBezier {
        p0: params.source,
        p1: control(params.source_side, params.source, params.target),
        p2: control(params.target_side, params.target, params.source),
        p3: params.target,
    };
    let center = bezier.center();
    EdgePath {
        path: bezier.to_path(),
        label_x: center.x,
        label_y: center.y,
        offset_x: (center.x - params.source.x).abs(),
        offset_y: (center.y - params.source.y).abs(),
    }
}

// ============================================================================
// Straight
// ============================================================================

pub fn straight_path(params: &EdgePathParams) -> EdgePath {
    let (label_x, label_y, offset_x, offset_y) = edge_center(params.source, params.target);
    EdgePath {
        path: format!(
            "M {} {} L {} {}",
            params.source.x, params.source.y, params.target.x, params.target.y
        ),
        label_x,
        label_y,
        offset_x,
        offset_y,
    }
}

// ============================================================================
// Step / Smoothstep
// ============================================================================

/// Right-angle path with sharp corners.
pub fn step_path(params: &EdgePathParams, offset: f32) -> EdgePath {
    smooth_step_path(params, 0.0, offset)
}

/// Right-angle path whose corners are rounded by up to `border_radius`.
///
/// The radius at each corner is capped to half of the shorter adjacent
/// segment, so short segments never get overlapping arcs.
pub fn smooth_step_path(params: &EdgePathParams, border_radius: f32, offset: f32) -> EdgePath {
    if faces_colinear(params) {
        return straight_path(params);
    }

    let (points, label_x, label_y, offset_x, offset_y) = step_points(params, offset);

    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if deduped.last() != Some(&p) {
            deduped.push(p);
        }
    }
    if deduped.len() < 2 {
        let p = params.source;
        return EdgePath {
            path: format!("M {} {} L {} {}", p.x, p.y, p.x, p.y),
            label_x,
            label_y,
            offset_x,
            offset_y,
        };
    }

    let mut path = String::with_capacity(deduped.len() * 24);
    for (i, p) in deduped.iter().enumerate() {
        if i == 0 {
            path.push_str(&format!("M {} {}", p.x, p.y));
            continue;
        }
        path.push(' ');
        if i < deduped.len() - 1 {
            path.push_str(&bend(deduped[i - 1], *p, deduped[i + 1], border_radius));
        } else {
            path.push_str(&format!("L {} {}", p.x, p.y));
        }
    }

    EdgePath {
        path,
        label_x,
        label_y,
        offset_x,
        offset_y,
    }
}

/// Handles pointing straight at each other on one line.
fn faces_colinear(params: &EdgePathParams) -> bool {
    let (s, t) = (params.source, params.target);
    match (params.source_side, params.target_side) {
        (Side::Right, Side::Left) => s.y == t.y && s.x <= t.x,
        (Side::Left, Side::Right) => s.y == t.y && s.x >= t.x,
        (Side::Bottom, Side::Top) => s.x == t.x && s.y <= t.y,
        (Side::Top, Side::Bottom) => s.x == t.x && s.y >= t.y,
        _ => false,
    }
}

fn along(p: Point, horizontal: bool) -> f32 {
    if horizontal {
        p.x
    } else {
        p.y
    }
}

fn set_along(p: &mut Point, horizontal: bool, v: f32) {
    if horizontal {
        p.x = v;
    } else {
        p.y = v;
    }
}

/// Corner points of a step path, with label position and offsets.
fn step_points(params: &EdgePathParams, offset: f32) -> (Vec<Point>, f32, f32, f32, f32) {
    let source = params.source;
    let target = params.target;
    let source_dir = params.source_side.direction();
    let target_dir = params.target_side.direction();
    let source_gapped = source + source_dir * offset;
    let target_gapped = target + target_dir * offset;

    // Main travel axis follows the source side.
    let horizontal = params.source_side.is_horizontal();
    let curr_dir = if along(source_gapped, horizontal) < along(target_gapped, horizontal) {
        1.0
    } else {
        -1.0
    };

    let (default_x, default_y, offset_x, offset_y) = edge_center(source, target);
    let mut source_gap_offset = Point::ZERO;
    let mut target_gap_offset = Point::ZERO;
    let mut points: Vec<Point>;
    let label_x;
    let label_y;

    let source_along = along(source_dir, horizontal);
    let target_along = along(target_dir, horizontal);

    if source_along * target_along == -1.0 {
        // Opposite sides: split in the middle.
        label_x = default_x;
        label_y = default_y;
        let vertical_split = vec![
            Point::new(default_x, source_gapped.y),
            Point::new(default_x, target_gapped.y),
        ];
        let horizontal_split = vec![
            Point::new(source_gapped.x, default_y),
            Point::new(target_gapped.x, default_y),
        ];
        points = if (source_along == curr_dir) == horizontal {
            vertical_split
        } else {
            horizontal_split
        };
    } else {
        let source_target = vec![Point::new(source_gapped.x, target_gapped.y)];
        let target_source = vec![Point::new(target_gapped.x, source_gapped.y)];
        points = if horizontal {
            if source_dir.x == curr_dir {
                target_source.clone()
            } else {
                source_target.clone()
            }
        } else if source_dir.y == curr_dir {
            source_target.clone()
        } else {
            target_source.clone()
        };

        if params.source_side == params.target_side {
            // Same side on both ends: keep the gapped points from overlapping
            // the turn when the endpoints are closer than the offset.
            let diff = (along(source, horizontal) - along(target, horizontal)).abs();
            if diff <= offset {
                let gap_offset = (offset - 1.0).min(offset - diff);
                if source_along == curr_dir {
                    let sign = if along(source_gapped, horizontal) > along(source, horizontal) { -1.0 } else { 1.0 };
                    set_along(&mut source_gap_offset, horizontal, sign * gap_offset);
                } else {
                    let sign = if along(target_gapped, horizontal) > along(target, horizontal) { -1.0 } else { 1.0 };
                    set_along(&mut target_gap_offset, horizontal, sign * gap_offset);
                }
            }
        } else {
            // Mixed sides such as Right -> Bottom.
            let cross = |p: Point| along(p, !horizontal);
            let is_same_dir = source_along == cross(target_dir);
            let source_gt = cross(source_gapped) > cross(target_gapped);
            let source_lt = cross(source_gapped) < cross(target_gapped);
            let flip = (source_along == 1.0 && ((!is_same_dir && source_gt) || (is_same_dir && source_lt)))
                || (source_along != 1.0 && ((!is_same_dir && source_lt) || (is_same_dir && source_gt)));
            if flip {
                points = if horizontal { source_target } else { target_source };
            }
        }

        let source_gap_point = source_gapped + source_gap_offset;
        let target_gap_point = target_gapped + target_gap_offset;
        let corner = points[0];
        let max_x = (source_gap_point.x - corner.x).abs().max((target_gap_point.x - corner.x).abs());
        let max_y = (source_gap_point.y - corner.y).abs().max((target_gap_point.y - corner.y).abs());

        // Label goes on the longest segment.
        if max_x >= max_y {
            label_x = (source_gap_point.x + target_gap_point.x) / 2.0;
            label_y = corner.y;
        } else {
            label_x = corner.x;
            label_y = (source_gap_point.y + target_gap_point.y) / 2.0;
        }
    }

    let mut path_points = Vec::with_capacity(points.len() + 4);
    path_points.push(source);
    path_points.push(source_gapped + source_gap_offset);
    path_points.extend(points);
    path_points.push(target_gapped + target_gap_offset);
    path_points.push(target);

    (path_points, label_x, label_y, offset_x, offset_y)
}

/// Path segment through corner `b`, rounded when `size` allows.
fn bend(a: Point, b: Point, c: Point, size: f32) -> String {
    let bend_size = (a.distance(b) / 2.0).min(b.distance(c) / 2.0).min(size);

    if (a.x == b.x && b.x == c.x) || (a.y == b.y && b.y == c.y) || bend_size <= 0.0 {
        return format!("L {} {}", b.x, b.y);
    }

    if a.y == b.y {
        // First segment is horizontal
        let x_dir = if a.x < c.x { -1.0 } else { 1.0 };
        let y_dir = if a.y < c.y { 1.0 } else { -1.0 };
        return format!(
            "L {} {} Q {} {} {} {}",
            b.x + bend_size * x_dir,
            b.y,
            b.x,
            b.y,
            b.x,
            b.y + bend_size * y_dir
        );
    }

    let x_dir = if a.x < c.x { 1.0 } else { -1.0 };
    let y_dir = if a.y < c.y { -1.0 } else { 1.0 };
    format!(
        "L {} {} Q {} {} {} {}",
        b.x,
        b.y + bend_size * y_dir,
        b.x,
        b.y,
        b.x + bend_size * x_dir,
        b.y
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// All numbers in a path string, in order.
    fn numbers(path: &str) -> Vec<f32> {
        path.split_whitespace()
            .filter_map(|tok| tok.parse::<f32>().ok())
            .collect()
    }

    fn assert_endpoints(path: &str, sx: f32, sy: f32, tx: f32, ty: f32) {
        assert!(path.starts_with("M "), "path should start with M: {path}");
        let n = numbers(path);
        assert_eq!((n[0], n[1]), (sx, sy), "start of {path}");
        assert_eq!((n[n.len() - 2], n[n.len() - 1]), (tx, ty), "end of {path}");
    }

    fn right_to_left(sx: f32, sy: f32, tx: f32, ty: f32) -> EdgePathParams {
        EdgePathParams::new(sx, sy, Side::Right, tx, ty, Side::Left)
    }

    // ========================================================================
    // bezier_path()
    // ========================================================================

    #[test]
    fn test_bezier_path_format() {
        let path = bezier_path(&right_to_left(0.0, 0.0, 100.0, 0.0), DEFAULT_CURVATURE);
        assert_eq!(path.path, "M 0 0 C 50 0 50 0 100 0");
        assert_eq!((path.label_x, path.label_y), (50.0, 0.0));
        assert_eq!((path.offset_x, path.offset_y), (50.0, 0.0));
    }

    #[test]
    fn test_bezier_endpoints_for_all_side_pairs() {
        let sides = [Side::Top, Side::Right, Side::Bottom, Side::Left];
        for &s in &sides {
            for &t in &sides {
                let params = EdgePathParams::new(10.0, 20.0, s, -140.0, 75.0, t);
                let path = bezier_path(&params, DEFAULT_CURVATURE);
                assert_endpoints(&path.path, 10.0, 20.0, -140.0, 75.0);
            }
        }
    }

    #[test]
    fn test_bezier_backwards_uses_sqrt_offset() {
        // Target lies behind the source: the curve loops out by 0.25 * 25 * sqrt(100)
        let path = bezier_path(&right_to_left(100.0, 0.0, 0.0, 0.0), DEFAULT_CURVATURE);
        assert_eq!(path.path, "M 100 0 C 162.5 0 -62.5 0 0 0");
    }

    #[test]
    fn test_bezier_label_is_weighted_sum() {
        let params = EdgePathParams::new(0.0, 0.0, Side::Bottom, 100.0, 200.0, Side::Top);
        let bezier = CubicBezier::from_params(&params, DEFAULT_CURVATURE);
        let path = bezier_path(&params, DEFAULT_CURVATURE);
        let mid = bezier.eval(0.5);
        assert!((path.label_x - mid.x).abs() < 1e-3);
        assert!((path.label_y - mid.y).abs() < 1e-3);
    }

    #[test]
    fn test_bezier_coincident_endpoints_are_finite() {
        let params = EdgePathParams::new(50.0, 50.0, Side::Right, 50.0, 50.0, Side::Left);
        let path = bezier_path(&params, DEFAULT_CURVATURE);
        assert_eq!(path.path, "M 50 50 C 50 50 50 50 50 50");
        assert!(numbers(&path.path).iter().all(|v| v.is_finite()));
        assert!(path.label_x.is_finite() && path.label_y.is_finite());
    }

    #[test]
    fn test_simple_bezier_controls_at_midpoint() {
        let path = simple_bezier_path(&right_to_left(0.0, 0.0, 100.0, 50.0));
        assert_eq!(path.path, "M 0 0 C 50 0 50 50 100 50");
    }

    // ========================================================================
    // CubicBezier::eval()
    // ========================================================================

    #[test]
    fn test_bezier_eval_boundaries() {
        let bezier = CubicBezier::from_params(&right_to_left(10.0, 20.0, 100.0, 80.0), DEFAULT_CURVATURE);
        let start = bezier.eval(0.0);
        let end = bezier.eval(1.0);
        assert!((start.x - 10.0).abs() < 0.001 && (start.y - 20.0).abs() < 0.001);
        assert!((end.x - 100.0).abs() < 0.001 && (end.y - 80.0).abs() < 0.001);
    }

    #[test]
    fn test_bezier_symmetry() {
        let bezier = CubicBezier::from_params(&right_to_left(0.0, 0.0, 100.0, 0.0), DEFAULT_CURVATURE);
        let left = bezier.eval(0.25);
        let right = bezier.eval(0.75);
        assert!((left.y - right.y).abs() < 0.001);
        assert!((left.x + right.x - 100.0).abs() < 0.1);
    }

    // ========================================================================
    // straight_path()
    // ========================================================================

    #[test]
    fn test_straight_path_and_midpoint() {
        let path = straight_path(&right_to_left(0.0, 10.0, 100.0, 50.0));
        assert_eq!(path.path, "M 0 10 L 100 50");
        assert_eq!((path.label_x, path.label_y), (50.0, 30.0));
        assert_eq!((path.offset_x, path.offset_y), (50.0, 20.0));
    }

    #[test]
    fn test_straight_path_zero_length() {
        let path = straight_path(&right_to_left(5.0, 5.0, 5.0, 5.0));
        assert_eq!(path.path, "M 5 5 L 5 5");
        assert_eq!((path.label_x, path.label_y), (5.0, 5.0));
    }

    // ========================================================================
    // step_path() / smooth_step_path()
    // ========================================================================

    #[test]
    fn test_step_path_opposite_sides_splits_in_middle() {
        let path = step_path(&right_to_left(0.0, 0.0, 100.0, 100.0), DEFAULT_STEP_OFFSET);
        assert_eq!(path.path, "M 0 0 L 20 0 L 50 0 L 50 100 L 80 100 L 100 100");
        assert_eq!((path.label_x, path.label_y), (50.0, 50.0));
    }

    #[test]
    fn test_smooth_step_rounds_corners() {
        let path = smooth_step_path(
            &right_to_left(0.0, 0.0, 100.0, 100.0),
            DEFAULT_BORDER_RADIUS,
            DEFAULT_STEP_OFFSET,
        );
        assert!(path.path.contains("L 45 0 Q 50 0 50 5"), "{}", path.path);
        assert!(path.path.contains("L 50 95 Q 50 100 55 100"), "{}", path.path);
        assert_endpoints(&path.path, 0.0, 0.0, 100.0, 100.0);
    }

    #[test]
    fn test_smooth_step_radius_capped_by_short_segment() {
        // Vertical jog of 4px: radius 10 must shrink to 2 (half the jog)
        let path = smooth_step_path(&right_to_left(0.0, 0.0, 100.0, 4.0), 10.0, DEFAULT_STEP_OFFSET);
        assert!(path.path.contains("Q 50 0 50 2"), "{}", path.path);
        assert!(path.path.contains("Q 50 4 52 4"), "{}", path.path);
    }

    #[test]
    fn test_step_colinear_facing_is_straight() {
        let path = smooth_step_path(&right_to_left(0.0, 30.0, 200.0, 30.0), 5.0, 20.0);
        assert_eq!(path.path, "M 0 30 L 200 30");

        let vertical = EdgePathParams::new(10.0, 0.0, Side::Bottom, 10.0, 90.0, Side::Top);
        assert_eq!(step_path(&vertical, 20.0).path, "M 10 0 L 10 90");
    }

    #[test]
    fn test_step_same_side_goes_around() {
        // Right -> Right: path has to come back in from the right of the target
        let params = EdgePathParams::new(0.0, 0.0, Side::Right, 100.0, 100.0, Side::Right);
        let path = step_path(&params, 20.0);
        assert_eq!(path.path, "M 0 0 L 20 0 L 120 0 L 120 100 L 100 100");
        assert_endpoints(&path.path, 0.0, 0.0, 100.0, 100.0);
    }

    #[test]
    fn test_step_mixed_sides_single_corner() {
        // Right -> Top with the target below and to the right
        let params = EdgePathParams::new(0.0, 0.0, Side::Right, 100.0, 100.0, Side::Top);
        let path = step_path(&params, 20.0);
        assert_eq!(path.path, "M 0 0 L 20 0 L 100 0 L 100 80 L 100 100");
    }

    #[test]
    fn test_step_coincident_endpoints_are_finite() {
        let sides = [Side::Top, Side::Right, Side::Bottom, Side::Left];
        for &s in &sides {
            for &t in &sides {
                let params = EdgePathParams::new(40.0, 40.0, s, 40.0, 40.0, t);
                let path = smooth_step_path(&params, DEFAULT_BORDER_RADIUS, DEFAULT_STEP_OFFSET);
                assert!(numbers(&path.path).iter().all(|v| v.is_finite()), "{}", path.path);
                assert!(!path.path.contains("NaN"));
                assert_endpoints(&path.path, 40.0, 40.0, 40.0, 40.0);
                assert!(path.label_x.is_finite() && path.label_y.is_finite());
            }
        }
    }
}
