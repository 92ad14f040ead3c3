//! Geometric primitives for drawing-page measurement.
//!
//! This module provides the planar types used by every takeoff stage for
//! locating, measuring and comparing page primitives.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in page space
//! - [`Bounds`] - An axis-aligned bounding box defined by minimum and maximum coordinates
//! - [`polyline_length`], [`ring_area`], [`ring_perimeter`], [`close_ring`] - Measurement helpers
//!
//! # Coordinate System
//!
//! Page space follows the standard drawing convention:
//!
//! ```text
//!    +Y
//!     ▲
//!     │
//!     │
//!     │
//!   (0,0) ────────► +X
//! ```
//!
//! - **Origin**: Bottom-left corner of the sheet
//! - **X-axis**: Increases rightward
//! - **Y-axis**: Increases upward, so "lower on the page" means a smaller y
//!
//! Pixel-space (y-down) snapshots must be converted with
//! [`PageSnapshot::into_page_space`](crate::element::PageSnapshot::into_page_space)
//! before they reach any measurement.

use serde::{Deserialize, Serialize};

/// A 2D point in page coordinate space.
///
/// Points serialize as a two-element `[x, y]` array, which is the format page
/// documents use for vertex lists.
///
/// # Examples
///
/// ```
/// # use takeoff_core::geometry::Point;
/// let p1 = Point::new(10.0, 20.0);
/// let p2 = Point::new(13.0, 24.0);
///
/// assert_eq!(p1.distance(p2), 5.0);
/// assert_eq!(p1.midpoint(p2), Point::new(11.5, 22.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f64 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f64 {
        self.y
    }

    /// Creates a new point with the specified y-coordinate
    pub fn with_y(mut self, y: f64) -> Self {
        self.y = y;
        self
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Calculates the midpoint between this point and another point
    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Calculates the hypotenuse (Euclidean distance from origin)
    pub fn hypot(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        self.sub_point(other).hypot()
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Used wherever only the ordering of distances matters.
    pub fn distance_squared(self, other: Point) -> f64 {
        let d = self.sub_point(other);
        d.x * d.x + d.y * d.y
    }

    /// Multiplies both coordinates by the given factor.
    pub fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Applies a 2D affine transform `[a, b, c, d, e, f]`.
    ///
    /// The matrix follows the PDF convention: `x' = a*x + c*y + e` and
    /// `y' = b*x + d*y + f`.
    pub fn transform(self, matrix: [f64; 6]) -> Self {
        let [a, b, c, d, e, f] = matrix;
        Self {
            x: a * self.x + c * self.y + e,
            y: b * self.x + d * self.y + f,
        }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// Represents an axis-aligned bounding box with minimum and maximum coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    /// Creates bounds from explicit extents, normalizing swapped coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Computes the tightest bounds around a set of points.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points[1..].iter().fold(init, |acc, p| Self {
            min_x: acc.min_x.min(p.x),
            min_y: acc.min_y.min(p.y),
            max_x: acc.max_x.max(p.x),
            max_y: acc.max_y.max(p.y),
        }))
    }

    /// Returns the minimum x-coordinate of the bounds
    pub fn min_x(self) -> f64 {
        self.min_x
    }

    /// Returns the minimum y-coordinate of the bounds
    pub fn min_y(self) -> f64 {
        self.min_y
    }

    /// Returns the maximum x-coordinate of the bounds
    pub fn max_x(self) -> f64 {
        self.max_x
    }

    /// Returns the maximum y-coordinate of the bounds
    pub fn max_y(self) -> f64 {
        self.max_y
    }

    /// Returns the center point of the bounds
    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns the width of the bounds
    pub fn width(self) -> f64 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds
    pub fn height(self) -> f64 {
        self.max_y - self.min_y
    }

    /// Merges two bounds to create a larger bounds that contains both.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grows the bounds by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    /// Returns true if the point lies inside the bounds (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Returns true if the two bounds overlap or touch.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Returns the bottom-left quadrant of these bounds (y-up).
    pub fn bottom_left_quadrant(&self) -> Self {
        let center = self.center();
        Self {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: center.x,
            max_y: center.y,
        }
    }
}

/// Total length of a polyline in page units.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Returns a copy of the ring with the first point appended when it is not
/// already closed.
///
/// Rings with fewer than three distinct vertices are returned unchanged.
pub fn close_ring(points: &[Point]) -> Vec<Point> {
    let mut ring = points.to_vec();
    if ring.len() >= 3 && ring.first() != ring.last() {
        ring.push(ring[0]);
    }
    ring
}

/// Unsigned ring area via the shoelace formula.
///
/// The ring is closed first when its first and last points differ, so open
/// and closed encodings of the same polygon have the same area.
///
/// # Examples
///
/// ```
/// # use takeoff_core::geometry::{Point, ring_area};
/// let square = [
///     Point::new(0.0, 0.0),
///     Point::new(10.0, 0.0),
///     Point::new(10.0, 10.0),
///     Point::new(0.0, 10.0),
/// ];
/// assert_eq!(ring_area(&square), 100.0);
/// ```
pub fn ring_area(points: &[Point]) -> f64 {
    let ring = close_ring(points);
    let twice: f64 = ring
        .windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum();
    (twice / 2.0).abs()
}

/// Perimeter of a ring, closing it first when needed.
pub fn ring_perimeter(points: &[Point]) -> f64 {
    polyline_length(&close_ring(points))
}

/// Returns true when the segment rises or falls by at most `tolerance` units.
pub fn is_near_horizontal(a: Point, b: Point, tolerance: f64) -> bool {
    (a.y - b.y).abs() <= tolerance
}

/// Point halfway along a polyline, measured by arc length.
///
/// Returns `None` for an empty polyline.
pub fn polyline_midpoint(points: &[Point]) -> Option<Point> {
    let first = *points.first()?;
    let half = polyline_length(points) / 2.0;
    let mut walked = 0.0;
    for w in points.windows(2) {
        let seg = w[0].distance(w[1]);
        if seg > 0.0 && walked + seg >= half {
            let t = (half - walked) / seg;
            return Some(Point::new(
                w[0].x + (w[1].x - w[0].x) * t,
                w[0].y + (w[1].y - w[0].y) * t,
            ));
        }
        walked += seg;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.distance_squared(b), 25.0);
    }

    #[test]
    fn test_point_transform() {
        // Translate by (10, 20) and scale x by 2
        let p = Point::new(1.0, 1.0).transform([2.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
        assert_eq!(p, Point::new(12.0, 21.0));
    }

    #[test]
    fn test_point_serde_as_array() {
        let p = Point::new(1.5, -2.0);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[1.5,-2.0]");
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_bounds_from_points() {
        let bounds = Bounds::from_points(&[
            Point::new(5.0, 1.0),
            Point::new(-2.0, 7.0),
            Point::new(3.0, 3.0),
        ])
        .unwrap();
        assert_eq!(bounds.min_x(), -2.0);
        assert_eq!(bounds.min_y(), 1.0);
        assert_eq!(bounds.max_x(), 5.0);
        assert_eq!(bounds.max_y(), 7.0);

        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_bounds_new_normalizes() {
        let bounds = Bounds::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(bounds.min_x(), 0.0);
        assert_eq!(bounds.max_y(), 10.0);
    }

    #[test]
    fn test_bottom_left_quadrant() {
        let bounds = Bounds::new(0.0, 0.0, 100.0, 50.0);
        let quadrant = bounds.bottom_left_quadrant();
        assert!(quadrant.contains(Point::new(10.0, 10.0)));
        assert!(quadrant.contains(Point::new(50.0, 25.0)));
        assert!(!quadrant.contains(Point::new(60.0, 10.0)));
        assert!(!quadrant.contains(Point::new(10.0, 40.0)));
    }

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(10.0, 5.0, 20.0, 20.0);
        let c = Bounds::new(11.0, 0.0, 20.0, 20.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_close_ring() {
        let open = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ];
        let closed = close_ring(&open);
        assert_eq!(closed.len(), 4);
        assert_eq!(closed.first(), closed.last());

        // Already closed rings are untouched
        assert_eq!(close_ring(&closed), closed);

        // Degenerate input is left alone
        let line = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        assert_eq!(close_ring(&line).len(), 2);
    }

    #[test]
    fn test_ring_area_open_and_closed_match() {
        let open = [
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 5.0),
            Point::new(0.0, 5.0),
        ];
        let closed = close_ring(&open);
        assert_eq!(ring_area(&open), 100.0);
        assert_eq!(ring_area(&closed), 100.0);
    }

    #[test]
    fn test_ring_area_clockwise_is_positive() {
        let cw = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 0.0),
        ];
        assert_eq!(ring_area(&cw), 16.0);
    }

    #[test]
    fn test_ring_perimeter() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(0.0, 3.0),
        ];
        assert_eq!(ring_perimeter(&square), 12.0);
    }

    #[test]
    fn test_polyline_midpoint() {
        let line = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        assert_eq!(polyline_midpoint(&line), Some(Point::new(10.0, 0.0)));
        assert_eq!(polyline_midpoint(&[]), None);
        assert_eq!(
            polyline_midpoint(&[Point::new(2.0, 2.0)]),
            Some(Point::new(2.0, 2.0))
        );
    }
}

#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn point_strategy() -> impl Strategy<Value = Point> {
        (-1000.0f64..1000.0, -1000.0f64..1000.0).prop_map(|(x, y)| Point::new(x, y))
    }

    fn rectangle_strategy() -> impl Strategy<Value = Vec<Point>> {
        (
            -500.0f64..500.0,
            -500.0f64..500.0,
            1.0f64..200.0,
            1.0f64..200.0,
        )
            .prop_map(|(x, y, w, h)| {
                vec![
                    Point::new(x, y),
                    Point::new(x + w, y),
                    Point::new(x + w, y + h),
                    Point::new(x, y + h),
                ]
            })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Shoelace area of an axis-aligned rectangle equals width * height,
    /// regardless of the starting vertex.
    fn check_rectangle_area_matches_extent(
        ring: Vec<Point>,
        rotate: usize,
    ) -> Result<(), TestCaseError> {
        let bounds = Bounds::from_points(&ring).unwrap();
        let expected = bounds.width() * bounds.height();

        let mut rotated = ring.clone();
        rotated.rotate_left(rotate % ring.len());

        prop_assert!(approx_eq!(f64, ring_area(&ring), expected, epsilon = 1e-6));
        prop_assert!(approx_eq!(f64, ring_area(&rotated), expected, epsilon = 1e-6));
        Ok(())
    }

    /// Distance is symmetric.
    fn check_distance_is_symmetric(a: Point, b: Point) -> Result<(), TestCaseError> {
        prop_assert!(approx_eq!(f64, a.distance(b), b.distance(a)));
        Ok(())
    }

    /// Merged bounds contain both inputs' centers.
    fn check_merge_contains_centers(a: Vec<Point>, b: Vec<Point>) -> Result<(), TestCaseError> {
        let ba = Bounds::from_points(&a).unwrap();
        let bb = Bounds::from_points(&b).unwrap();
        let merged = ba.merge(&bb);
        prop_assert!(merged.contains(ba.center()));
        prop_assert!(merged.contains(bb.center()));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn rectangle_area_matches_extent(ring in rectangle_strategy(), rotate in 0usize..4) {
            check_rectangle_area_matches_extent(ring, rotate)?;
        }

        #[test]
        fn distance_is_symmetric(a in point_strategy(), b in point_strategy()) {
            check_distance_is_symmetric(a, b)?;
        }

        #[test]
        fn merge_contains_centers(a in rectangle_strategy(), b in rectangle_strategy()) {
            check_merge_contains_centers(a, b)?;
        }
    }
}
