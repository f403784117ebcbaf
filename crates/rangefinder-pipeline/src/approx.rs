//! Polygon approximation using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces a closed contour to the vertices that lie farther than a
//! tolerance from the chords between their neighbors.
//!
//! `imageproc::geometry::approximate_polygon_dp` simplifies open chains.
//! A closed contour has no natural endpoints, so it is split in two at
//! the point farthest from the first point, and each half is simplified
//! as an open chain.

use imageproc::geometry::approximate_polygon_dp;

use crate::types::{Contour, GridPoint, Point, PolygonApproximation};

/// Approximate a closed contour by a polygon.
///
/// Vertices within `epsilon` pixels of the chord between their kept
/// neighbors are removed. An `epsilon` of 0.0 or less keeps every point
/// that is not exactly collinear with its kept neighbors.
///
/// Contours with fewer than 3 points are returned unchanged.
#[must_use = "returns the polygon approximation"]
pub fn approximate_polygon(contour: &Contour, epsilon: f64) -> PolygonApproximation {
    let points = contour.points();
    let n = points.len();
    if n < 3 {
        return PolygonApproximation::new(points.to_vec());
    }

    let split = farthest_from(points, 0);
    if split == 0 {
        // Every point coincides with the first.
        return PolygonApproximation::new(vec![points[0]]);
    }

    // imageproc rejects a zero tolerance; the smallest positive one
    // still drops exactly collinear points.
    let epsilon = epsilon.max(f64::MIN_POSITIVE);

    // Close the ring so the second half ends back at point 0.
    let mut ring = contour.to_imageproc();
    ring.push(ring[0]);

    let mut vertices = approximate_polygon_dp(&ring[..=split], epsilon, false);
    vertices.pop();
    let mut second = approximate_polygon_dp(&ring[split..], epsilon, false);
    second.pop();
    vertices.extend(second);

    PolygonApproximation::new(vertices.into_iter().map(GridPoint::from).collect())
}

/// Index of the point farthest from `points[origin]`; the first wins ties.
fn farthest_from(points: &[GridPoint], origin: usize) -> usize {
    let anchor = Point::from(points[origin]);
    let mut best = origin;
    let mut best_dist = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let d = Point::from(p).distance_squared(anchor);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}
