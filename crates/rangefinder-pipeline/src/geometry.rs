//! Bounding geometry of a contour.
//!
//! Three enclosures are derived from the same point set:
//!
//! - [`BoundingRect`]: axis-aligned, in whole pixels.
//! - [`RotatedRect`]: minimum-area rectangle at any angle, from
//!   `imageproc`'s rotating calipers.
//! - [`EnclosingCircle`]: smallest circle containing every point
//!   (Welzl's incremental construction over the hull).

use serde::{Deserialize, Serialize};

use crate::types::{Contour, GridPoint, Point};

/// Relative slack when testing whether a point lies in a circle.
const CIRCLE_EPSILON: f64 = 1e-9;

/// Axis-aligned bounding rectangle in pixel units.
///
/// `width` and `height` count pixels, so a single-pixel contour is 1×1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingRect {
    /// Left edge column.
    pub x: i32,
    /// Top edge row.
    pub y: i32,
    /// Horizontal extent in pixels.
    pub width: u32,
    /// Vertical extent in pixels.
    pub height: u32,
}

impl BoundingRect {
    /// Area in square pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Axis-aligned bounding rectangle of `points`.
///
/// Returns `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn bounding_rect(points: &[GridPoint]) -> Option<BoundingRect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingRect {
        x: min_x,
        y: min_y,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}

/// Minimum-area rectangle, possibly rotated.
///
/// `width` runs along the edge direction given by `angle_degrees`
/// (measured from the +x axis, y pointing down); `height` is
/// perpendicular to it. Dimensions are measured between pixel centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    /// Center of the rectangle.
    pub center: Point,
    /// Extent along the edge direction.
    pub width: f64,
    /// Extent perpendicular to the edge direction.
    pub height: f64,
    /// Direction of the `width` edge, in degrees.
    pub angle_degrees: f64,
    /// Corners in drawing order.
    pub corners: [Point; 4],
}

impl RotatedRect {
    /// Area of the rectangle.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Smallest circle containing a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnclosingCircle {
    /// Circle center.
    pub center: Point,
    /// Circle radius; zero for a single point.
    pub radius: f64,
}

impl EnclosingCircle {
    fn contains(&self, p: Point) -> bool {
        p.distance(self.center) <= self.radius.mul_add(CIRCLE_EPSILON, self.radius) + CIRCLE_EPSILON
    }
}

/// All bounding geometry for one contour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingGeometry {
    /// Axis-aligned box.
    pub bounding_rect: BoundingRect,
    /// Minimum-area rotated box.
    pub rotated_rect: RotatedRect,
    /// Minimum enclosing circle.
    pub enclosing_circle: EnclosingCircle,
}

/// Compute the bounding geometry of `contour`.
#[must_use]
pub fn measure(contour: &Contour) -> BoundingGeometry {
    let points = contour.points();
    let hull = convex_hull(points);
    BoundingGeometry {
        bounding_rect: bounding_rect(points).unwrap_or(BoundingRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        }),
        rotated_rect: min_area_rect(&hull),
        enclosing_circle: min_enclosing_circle(&hull),
    }
}

/// Convex hull of `points` via `imageproc::geometry::convex_hull`.
///
/// Duplicates are removed first; the Graham scan's angular sort has no
/// consistent order for coincident points. A set of identical points
/// yields one vertex and a straight segment yields its two ends.
#[must_use]
pub fn convex_hull(points: &[GridPoint]) -> Vec<GridPoint> {
    let mut unique = points.to_vec();
    unique.sort_unstable_by_key(|p| (p.x, p.y));
    unique.dedup();
    let unique: Vec<imageproc::point::Point<i32>> = unique.into_iter().map(Into::into).collect();
    imageproc::geometry::convex_hull(unique)
        .into_iter()
        .map(GridPoint::from)
        .collect()
}

/// Minimum-area enclosing rectangle of a point set.
///
/// `imageproc::geometry::min_area_rect` returns the corners as
/// `[top left, top right, bottom right, bottom left]`, snapped outward
/// to whole pixels; `width` runs from the first corner to the second.
#[must_use]
pub fn min_area_rect(points: &[GridPoint]) -> RotatedRect {
    if points.is_empty() {
        let origin = Point::new(0.0, 0.0);
        return RotatedRect {
            center: origin,
            width: 0.0,
            height: 0.0,
            angle_degrees: 0.0,
            corners: [origin; 4],
        };
    }
    let points: Vec<imageproc::point::Point<i32>> =
        points.iter().copied().map(Into::into).collect();
    let corners =
        imageproc::geometry::min_area_rect(&points).map(|c| Point::from(GridPoint::from(c)));
    let [tl, tr, br, bl] = corners;
    RotatedRect {
        center: Point::new(
            (tl.x + tr.x + br.x + bl.x) / 4.0,
            (tl.y + tr.y + br.y + bl.y) / 4.0,
        ),
        width: tl.distance(tr),
        height: tr.distance(br),
        angle_degrees: (tr.y - tl.y).atan2(tr.x - tl.x).to_degrees(),
        corners,
    }
}

/// Smallest circle enclosing `points`.
///
/// Incremental Welzl construction: each point that falls outside the
/// current circle must lie on the boundary of the next one. Intended for
/// hull vertices, which keeps the cubic worst case small.
#[must_use]
pub fn min_enclosing_circle(points: &[GridPoint]) -> EnclosingCircle {
    let pts: Vec<Point> = points.iter().copied().map(Point::from).collect();
    let Some(&first) = pts.first() else {
        return EnclosingCircle {
            center: Point::new(0.0, 0.0),
            radius: 0.0,
        };
    };

    let mut circle = EnclosingCircle {
        center: first,
        radius: 0.0,
    };
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = EnclosingCircle {
            center: pts[i],
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = circle_from_two(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = circle_from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    circle
}

fn circle_from_two(a: Point, b: Point) -> EnclosingCircle {
    EnclosingCircle {
        center: Point::new(f64::midpoint(a.x, b.x), f64::midpoint(a.y, b.y)),
        radius: a.distance(b) / 2.0,
    }
}

/// Circumcircle of three points; the widest pair's circle if collinear.
fn circle_from_three(a: Point, b: Point, c: Point) -> EnclosingCircle {
    let (bx, by) = (b.x - a.x, b.y - a.y);
    let (cx, cy) = (c.x - a.x, c.y - a.y);
    let d = 2.0 * bx.mul_add(cy, -(by * cx));
    if d.abs() < f64::EPSILON {
        return [circle_from_two(a, b), circle_from_two(a, c), circle_from_two(b, c)]
            .into_iter()
            .fold(circle_from_two(a, b), |widest, candidate| {
                if candidate.radius > widest.radius {
                    candidate
                } else {
                    widest
                }
            });
    }
    let b2 = bx.mul_add(bx, by * by);
    let c2 = cx.mul_add(cx, cy * cy);
    let ux = cy.mul_add(b2, -(by * c2)) / d;
    let uy = bx.mul_add(c2, -(cx * b2)) / d;
    let center = Point::new(a.x + ux, a.y + uy);
    EnclosingCircle {
        center,
        radius: ux.hypot(uy),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gp(points: &[(i32, i32)]) -> Vec<GridPoint> {
        points.iter().map(|&(x, y)| GridPoint::new(x, y)).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn bounding_rect_counts_pixels() {
        let r = bounding_rect(&gp(&[(10, 10), (109, 10), (109, 109), (10, 109)])).unwrap();
        assert_eq!(r, BoundingRect { x: 10, y: 10, width: 100, height: 100 });
        assert_eq!(r.area(), 10_000);
    }

    #[test]
    fn bounding_rect_of_single_point_is_one_pixel() {
        let r = bounding_rect(&gp(&[(4, 7)])).unwrap();
        assert_eq!((r.width, r.height, r.area()), (1, 1, 1));
        assert!(bounding_rect(&[]).is_none());
    }

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let hull = convex_hull(&gp(&[(0, 0), (5, 0), (10, 0), (10, 10), (5, 5), (0, 10), (0, 5)]));
        let mut sorted = hull.clone();
        sorted.sort_unstable_by_key(|p| (p.x, p.y));
        assert_eq!(sorted, gp(&[(0, 0), (0, 10), (10, 0), (10, 10)]));
    }

    #[test]
    fn hull_of_degenerate_inputs() {
        assert_eq!(convex_hull(&gp(&[(2, 2), (2, 2)])), gp(&[(2, 2)]));
        assert_eq!(convex_hull(&gp(&[(0, 0), (3, 3)])).len(), 2);
    }

    #[test]
    fn axis_aligned_square_rotated_rect() {
        let hull = convex_hull(&gp(&[(0, 0), (10, 0), (10, 10), (0, 10)]));
        let r = min_area_rect(&hull);
        // Corners are snapped to whole pixels, so allow one pixel of slack.
        assert!((100.0..=121.0).contains(&r.area()), "area {}", r.area());
        assert!((r.center.x - 5.0).abs() <= 1.0 && (r.center.y - 5.0).abs() <= 1.0);
    }

    #[test]
    fn diamond_rotated_rect_is_tilted() {
        // A square rotated 45 degrees: axis-aligned box is twice the area.
        let pts = gp(&[(10, 0), (20, 10), (10, 20), (0, 10)]);
        let r = min_area_rect(&convex_hull(&pts));
        assert!(r.area() < 300.0, "area {}", r.area());
        assert!((r.angle_degrees.rem_euclid(90.0) - 45.0).abs() < 8.0);
        assert_eq!(bounding_rect(&pts).unwrap().area(), 441);
    }

    #[test]
    fn empty_input_has_empty_rotated_rect() {
        assert!(close(min_area_rect(&[]).area(), 0.0));
        assert!(convex_hull(&[]).is_empty());
    }

    #[test]
    fn segment_rotated_rect_has_zero_height() {
        let r = min_area_rect(&convex_hull(&gp(&[(0, 0), (3, 4)])));
        assert!(close(r.width, 5.0));
        assert!(close(r.height, 0.0));
    }

    #[test]
    fn single_point_geometry() {
        let c = Contour::new(gp(&[(3, 4)])).unwrap();
        let g = measure(&c);
        assert_eq!(g.bounding_rect.area(), 1);
        assert!(close(g.enclosing_circle.radius, 0.0));
        assert_eq!(g.enclosing_circle.center, Point::new(3.0, 4.0));
        assert!(close(g.rotated_rect.area(), 0.0));
    }

    #[test]
    fn circle_through_diameter() {
        let c = min_enclosing_circle(&gp(&[(0, 0), (10, 0)]));
        assert!(close(c.radius, 5.0));
        assert!(close(c.center.x, 5.0) && close(c.center.y, 0.0));
    }

    #[test]
    fn circle_of_right_triangle_uses_hypotenuse() {
        let c = min_enclosing_circle(&gp(&[(0, 0), (6, 0), (0, 8)]));
        assert!(close(c.radius, 5.0));
        assert!(close(c.center.x, 3.0) && close(c.center.y, 4.0));
    }

    #[test]
    fn circle_of_equilateral_like_triangle_is_circumcircle() {
        let pts = gp(&[(0, 0), (10, 0), (5, 8)]);
        let c = min_enclosing_circle(&pts);
        for p in &pts {
            assert!(close(Point::from(*p).distance(c.center), c.radius));
        }
    }

    #[test]
    fn circle_contains_every_point() {
        let pts = gp(&[(0, 0), (7, 1), (3, 9), (12, 4), (5, 5), (-2, 6), (9, 11)]);
        let c = min_enclosing_circle(&convex_hull(&pts));
        for p in &pts {
            assert!(Point::from(*p).distance(c.center) <= c.radius + 1e-9);
        }
    }

    #[test]
    fn collinear_triple_falls_back_to_widest_pair() {
        let c = circle_from_three(Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(8.0, 0.0));
        assert!(close(c.radius, 4.0));
    }
}
