//! Path construction and management.
//!
//! Paths are recorded sequences of move/line/curve/close segments describing
//! geometry to stroke or fill. They are built incrementally: each drawing
//! segment extends the current subpath, and `move_to` starts a new one.

use std::fmt;

use crate::matrix::Matrix;

/// A single path segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Move to a new point, starting a new subpath
    MoveTo(f64, f64),
    /// Straight line to a point
    LineTo(f64, f64),
    /// Cubic Bézier curve (cp1x, cp1y, cp2x, cp2y, x, y)
    CurveTo(f64, f64, f64, f64, f64, f64),
    /// Close the current subpath
    ClosePath,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::MoveTo(x, y) => write!(f, "M {} {}", x, y),
            PathSegment::LineTo(x, y) => write!(f, "L {} {}", x, y),
            PathSegment::CurveTo(c1x, c1y, c2x, c2y, x, y) => {
                write!(f, "C {} {} {} {} {} {}", c1x, c1y, c2x, c2y, x, y)
            }
            PathSegment::ClosePath => write!(f, "Z"),
        }
    }
}

/// A recorded path.
///
/// The path tracks its current point and the start of the open subpath so
/// that `close_path` and relative operations behave like the drawing
/// context's own path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
    current_point: Option<(f64, f64)>,
    subpath_start: Option<(f64, f64)>,
    has_open_subpath: bool,
}

impl Path {
    /// Create a new empty path.
    pub fn new() -> Self {
        Path::default()
    }

    /// Clear the path, removing all segments.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.current_point = None;
        self.subpath_start = None;
        self.has_open_subpath = false;
    }

    /// Begin a new subpath without establishing a current point.
    ///
    /// The next `line_to`/`curve_to` will behave as if the path were empty
    /// (implicit move), and arcs will start with a move instead of a line.
    pub fn new_sub_path(&mut self) {
        self.current_point = None;
        self.subpath_start = None;
        self.has_open_subpath = false;
    }

    /// Move to a new point, starting a new subpath.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.segments.push(PathSegment::MoveTo(x, y));
        self.current_point = Some((x, y));
        self.subpath_start = Some((x, y));
        self.has_open_subpath = false;
    }

    /// Add a line segment from the current point to (x, y).
    ///
    /// Without a current point this behaves as a `move_to`.
    pub fn line_to(&mut self, x: f64, y: f64) {
        if self.current_point.is_none() {
            self.move_to(x, y);
            return;
        }

        self.segments.push(PathSegment::LineTo(x, y));
        self.current_point = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Add a cubic Bézier curve from the current point.
    ///
    /// Without a current point the curve begins at its first control point.
    pub fn curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        if self.current_point.is_none() {
            self.move_to(c1x, c1y);
        }

        self.segments
            .push(PathSegment::CurveTo(c1x, c1y, c2x, c2y, x, y));
        self.current_point = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Add a closed rectangle subpath.
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    /// Add a circular arc traversed in the direction of increasing angles.
    ///
    /// The arc begins with a line from the current point to the arc start
    /// (or a move, if the path has no current point).
    pub fn arc(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) {
        self.arc_internal(xc, yc, radius, angle1, angle2, false);
    }

    /// Add a circular arc traversed in the direction of decreasing angles.
    pub fn arc_negative(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) {
        self.arc_internal(xc, yc, radius, angle1, angle2, true);
    }

    fn arc_internal(
        &mut self,
        xc: f64,
        yc: f64,
        radius: f64,
        angle1: f64,
        angle2: f64,
        negative: bool,
    ) {
        let (sx, sy) = (xc + radius * angle1.cos(), yc + radius * angle1.sin());
        if self.current_point.is_some() {
            self.line_to(sx, sy);
        } else {
            self.move_to(sx, sy);
        }

        for c in arc_to_cubics(xc, yc, radius, angle1, angle2, negative) {
            self.curve_to(c[0], c[1], c[2], c[3], c[4], c[5]);
        }
    }

    /// Close the current subpath with a line back to its starting point.
    ///
    /// Does nothing when there is no open subpath.
    pub fn close_path(&mut self) {
        if self.has_open_subpath {
            self.segments.push(PathSegment::ClosePath);
            if let Some(start) = self.subpath_start {
                self.current_point = Some(start);
            }
            self.has_open_subpath = false;
        }
    }

    /// Get the current point, if any.
    pub fn current_point(&self) -> Option<(f64, f64)> {
        self.current_point
    }

    /// Get the recorded segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Check whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of recorded segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Append another path's segments, preserving its subpath structure.
    pub fn append(&mut self, other: &Path) {
        for seg in &other.segments {
            match *seg {
                PathSegment::MoveTo(x, y) => self.move_to(x, y),
                PathSegment::LineTo(x, y) => self.line_to(x, y),
                PathSegment::CurveTo(c1x, c1y, c2x, c2y, x, y) => {
                    self.curve_to(c1x, c1y, c2x, c2y, x, y)
                }
                PathSegment::ClosePath => self.close_path(),
            }
        }
    }

    /// Return a copy of the path with every point transformed by `matrix`.
    pub fn transformed(&self, matrix: &Matrix) -> Path {
        let mut out = Path::new();
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(x, y) => {
                    let (x, y) = matrix.transform_point(x, y);
                    out.move_to(x, y);
                }
                PathSegment::LineTo(x, y) => {
                    let (x, y) = matrix.transform_point(x, y);
                    out.line_to(x, y);
                }
                PathSegment::CurveTo(c1x, c1y, c2x, c2y, x, y) => {
                    let (c1x, c1y) = matrix.transform_point(c1x, c1y);
                    let (c2x, c2y) = matrix.transform_point(c2x, c2y);
                    let (x, y) = matrix.transform_point(x, y);
                    out.curve_to(c1x, c1y, c2x, c2y, x, y);
                }
                PathSegment::ClosePath => out.close_path(),
            }
        }
        out
    }

    /// Return a copy of the path with every curve replaced by line segments
    /// approximating it to within `tolerance`.
    pub fn flattened(&self, tolerance: f64) -> Path {
        let tolerance = if tolerance > 0.0 { tolerance } else { 0.1 };
        let mut out = Path::new();
        let mut last = (0.0, 0.0);
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(x, y) => {
                    out.move_to(x, y);
                    last = (x, y);
                }
                PathSegment::LineTo(x, y) => {
                    out.line_to(x, y);
                    last = (x, y);
                }
                PathSegment::CurveTo(c1x, c1y, c2x, c2y, x, y) => {
                    flatten_cubic(
                        last,
                        (c1x, c1y),
                        (c2x, c2y),
                        (x, y),
                        tolerance,
                        0,
                        &mut out,
                    );
                    last = (x, y);
                }
                PathSegment::ClosePath => {
                    out.close_path();
                    if let Some(p) = out.current_point() {
                        last = p;
                    }
                }
            }
        }
        out
    }

    /// Get the bounding box of all path points as (x1, y1, x2, y2).
    ///
    /// Curve control points are included, so the box can be looser than the
    /// exact geometry, matching what path extents report before
    /// rasterization.
    pub fn extents(&self) -> Option<(f64, f64, f64, f64)> {
        if self.segments.is_empty() {
            return None;
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        let mut any = false;

        let mut grow = |x: f64, y: f64| {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        };

        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(x, y) | PathSegment::LineTo(x, y) => {
                    grow(x, y);
                    any = true;
                }
                PathSegment::CurveTo(c1x, c1y, c2x, c2y, x, y) => {
                    grow(c1x, c1y);
                    grow(c2x, c2y);
                    grow(x, y);
                    any = true;
                }
                PathSegment::ClosePath => {}
            }
        }

        if any {
            Some((min_x, min_y, max_x, max_y))
        } else {
            None
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", seg)?;
            first = false;
        }
        Ok(())
    }
}

const MAX_FLATTEN_DEPTH: u32 = 16;

fn flatten_cubic(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    tolerance: f64,
    depth: u32,
    out: &mut Path,
) {
    if depth >= MAX_FLATTEN_DEPTH || cubic_is_flat(p0, p1, p2, p3, tolerance) {
        out.line_to(p3.0, p3.1);
        return;
    }

    // de Casteljau subdivision at t = 1/2
    let mid = |a: (f64, f64), b: (f64, f64)| ((a.0 + b.0) * 0.5, (a.1 + b.1) * 0.5);
    let p01 = mid(p0, p1);
    let p12 = mid(p1, p2);
    let p23 = mid(p2, p3);
    let p012 = mid(p01, p12);
    let p123 = mid(p12, p23);
    let p0123 = mid(p012, p123);

    flatten_cubic(p0, p01, p012, p0123, tolerance, depth + 1, out);
    flatten_cubic(p0123, p123, p23, p3, tolerance, depth + 1, out);
}

/// Flatness test: both control points must lie within `tolerance` of the
/// chord from p0 to p3.
fn cubic_is_flat(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), tolerance: f64) -> bool {
    let d1 = point_segment_distance(p1, p0, p3);
    let d2 = point_segment_distance(p2, p0, p3);
    d1 <= tolerance && d2 <= tolerance
}

fn point_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (vx, vy) = (b.0 - a.0, b.1 - a.1);
    let (wx, wy) = (p.0 - a.0, p.1 - a.1);
    let len_sq = vx * vx + vy * vy;
    if len_sq == 0.0 {
        return (wx * wx + wy * wy).sqrt();
    }
    let t = ((wx * vx + wy * vy) / len_sq).clamp(0.0, 1.0);
    let (dx, dy) = (wx - t * vx, wy - t * vy);
    (dx * dx + dy * dy).sqrt()
}

/// Decompose a circular arc into cubic Bézier control points.
///
/// Returns one `[c1x, c1y, c2x, c2y, x, y]` record per segment; the caller
/// is expected to have already positioned the path at the arc's start. Each
/// segment spans at most a quarter circle.
pub(crate) fn arc_to_cubics(
    xc: f64,
    yc: f64,
    radius: f64,
    angle1: f64,
    angle2: f64,
    negative: bool,
) -> Vec<[f64; 6]> {
    use std::f64::consts::{FRAC_PI_2, PI};

    let mut angle2 = angle2;
    if negative {
        while angle2 > angle1 {
            angle2 -= 2.0 * PI;
        }
    } else {
        while angle2 < angle1 {
            angle2 += 2.0 * PI;
        }
    }

    let sweep = angle2 - angle1;
    if sweep == 0.0 || radius <= 0.0 {
        return Vec::new();
    }

    let n = (sweep.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / n as f64;

    let mut cubics = Vec::with_capacity(n);
    let mut a = angle1;
    for _ in 0..n {
        let b = a + step;
        // Standard unit-circle approximation constant for this sweep.
        let k = 4.0 / 3.0 * ((b - a) / 4.0).tan();

        let (sin_a, cos_a) = a.sin_cos();
        let (sin_b, cos_b) = b.sin_cos();

        let c1x = xc + radius * (cos_a - k * sin_a);
        let c1y = yc + radius * (sin_a + k * cos_a);
        let c2x = xc + radius * (cos_b + k * sin_b);
        let c2y = yc + radius * (sin_b - k * cos_b);
        let x = xc + radius * cos_b;
        let y = yc + radius * sin_b;

        cubics.push([c1x, c1y, c2x, c2y, x, y]);
        a = b;
    }
    cubics
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_empty_path() {
        let path = Path::new();
        assert!(path.is_empty());
        assert_eq!(path.current_point(), None);
        assert_eq!(path.extents(), None);
    }

    #[test]
    fn test_move_line_close() {
        let mut path = Path::new();
        path.move_to(10.0, 20.0);
        path.line_to(30.0, 40.0);
        path.close_path();
        assert_eq!(path.len(), 3);
        // close_path returns to the subpath start
        assert_eq!(path.current_point(), Some((10.0, 20.0)));
    }

    #[test]
    fn test_close_without_subpath_is_noop() {
        let mut path = Path::new();
        path.close_path();
        assert!(path.is_empty());

        path.move_to(1.0, 2.0);
        path.close_path();
        // A lone move_to has nothing to close
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_implicit_move() {
        let mut path = Path::new();
        path.line_to(30.0, 40.0);
        assert_eq!(path.segments()[0], PathSegment::MoveTo(30.0, 40.0));
    }

    #[test]
    fn test_rectangle() {
        let mut path = Path::new();
        path.rectangle(10.0, 20.0, 100.0, 50.0);
        assert_eq!(path.len(), 5);
        assert_eq!(path.extents(), Some((10.0, 20.0, 110.0, 70.0)));
    }

    #[test]
    fn test_new_sub_path() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(10.0, 0.0);
        path.new_sub_path();
        assert_eq!(path.current_point(), None);
        // The next arc starts with a move, not a line
        path.arc(50.0, 50.0, 10.0, 0.0, PI);
        assert!(matches!(path.segments()[2], PathSegment::MoveTo(..)));
    }

    #[test]
    fn test_arc_endpoints() {
        let mut path = Path::new();
        path.arc(0.0, 0.0, 10.0, 0.0, PI);
        let (x, y) = path.current_point().unwrap();
        assert!((x - (-10.0)).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_arc_negative_endpoints() {
        let mut path = Path::new();
        path.arc_negative(0.0, 0.0, 10.0, 0.0, -PI / 2.0);
        let (x, y) = path.current_point().unwrap();
        assert!(x.abs() < 1e-9);
        assert!((y - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_arc_from_current_point_draws_line() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.arc(50.0, 0.0, 10.0, 0.0, PI / 2.0);
        assert!(matches!(path.segments()[1], PathSegment::LineTo(..)));
    }

    #[test]
    fn test_full_circle_splits_into_quadrants() {
        let cubics = arc_to_cubics(0.0, 0.0, 1.0, 0.0, 2.0 * PI, false);
        assert_eq!(cubics.len(), 4);
    }

    #[test]
    fn test_flatten_replaces_curves() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.curve_to(0.0, 100.0, 100.0, 100.0, 100.0, 0.0);

        let flat = path.flattened(0.1);
        assert!(flat.len() > 2);
        for seg in flat.segments() {
            assert!(!matches!(seg, PathSegment::CurveTo(..)));
        }
        assert_eq!(flat.current_point(), Some((100.0, 0.0)));
    }

    #[test]
    fn test_transformed() {
        let mut path = Path::new();
        path.move_to(1.0, 2.0);
        path.line_to(3.0, 4.0);

        let moved = path.transformed(&Matrix::translation(10.0, 20.0));
        assert_eq!(moved.segments()[0], PathSegment::MoveTo(11.0, 22.0));
        assert_eq!(moved.segments()[1], PathSegment::LineTo(13.0, 24.0));
    }

    #[test]
    fn test_display() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 1.0);
        path.close_path();
        assert_eq!(path.to_string(), "M 0 0 L 1 1 Z");
    }
}
