//! Object-of-interest selection and shape classification.
//!
//! The largest contour whose area clears a floor is the object of
//! interest. It is classified purely by the vertex count of its polygon
//! approximation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::approx::approximate_polygon;
use crate::types::{Contour, PolygonApproximation};

/// Shape class of the selected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeClass {
    /// Four to seven approximation vertices.
    Rectangle,
    /// Eight to eighteen approximation vertices.
    Circle,
    /// Any other vertex count.
    Undefined,
}

impl ShapeClass {
    const RECTANGLE_MIN: usize = 4;
    const RECTANGLE_MAX: usize = 7;
    const CIRCLE_MIN: usize = 8;
    const CIRCLE_MAX: usize = 18;

    /// Vertex counts classified as [`Rectangle`](Self::Rectangle).
    pub const RECTANGLE_VERTICES: std::ops::RangeInclusive<usize> =
        Self::RECTANGLE_MIN..=Self::RECTANGLE_MAX;
    /// Vertex counts classified as [`Circle`](Self::Circle).
    pub const CIRCLE_VERTICES: std::ops::RangeInclusive<usize> =
        Self::CIRCLE_MIN..=Self::CIRCLE_MAX;

    /// Classify a vertex count. Total over every `usize`.
    #[must_use]
    pub const fn from_vertex_count(vertices: usize) -> Self {
        match vertices {
            Self::RECTANGLE_MIN..=Self::RECTANGLE_MAX => Self::Rectangle,
            Self::CIRCLE_MIN..=Self::CIRCLE_MAX => Self::Circle,
            _ => Self::Undefined,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rectangle => "Rectangle",
            Self::Circle => "Circle",
            Self::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pick the contour with the largest area, if it exceeds `min_area`.
///
/// Returns the contour's index and area. On equal areas the earlier
/// contour wins. An empty slice, or a largest area not strictly above
/// `min_area`, yields `None`.
#[must_use]
pub fn select_largest(contours: &[Contour], min_area: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, contour) in contours.iter().enumerate() {
        let area = contour.area();
        if best.is_none_or(|(_, best_area)| area > best_area) {
            best = Some((i, area));
        }
    }
    best.filter(|&(_, area)| area > min_area)
}

/// Result of classifying one contour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The assigned shape class.
    pub shape: ShapeClass,
    /// The approximation whose vertex count decided `shape`.
    pub approximation: PolygonApproximation,
}

/// Approximate `contour` with a tolerance of `fraction` × perimeter and
/// classify it by vertex count.
#[must_use]
pub fn classify(contour: &Contour, fraction: f64) -> Classification {
    let epsilon = fraction * contour.perimeter();
    let approximation = approximate_polygon(contour, epsilon);
    Classification {
        shape: ShapeClass::from_vertex_count(approximation.vertex_count()),
        approximation,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::GridPoint;

    fn square(x: i32, y: i32, side: i32) -> Contour {
        Contour::new(vec![
            GridPoint::new(x, y),
            GridPoint::new(x, y + side),
            GridPoint::new(x + side, y + side),
            GridPoint::new(x + side, y),
        ])
        .unwrap()
    }

    /// Regular polygon with `n` vertices and radius `r`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn regular_polygon(n: usize, r: f64) -> Contour {
        let pts = (0..n)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / n as f64;
                GridPoint::new(
                    (200.0 + r * t.cos()).round() as i32,
                    (200.0 + r * t.sin()).round() as i32,
                )
            })
            .collect();
        Contour::new(pts).unwrap()
    }

    #[test]
    fn vertex_count_boundaries() {
        assert_eq!(ShapeClass::from_vertex_count(0), ShapeClass::Undefined);
        assert_eq!(ShapeClass::from_vertex_count(3), ShapeClass::Undefined);
        assert_eq!(ShapeClass::from_vertex_count(4), ShapeClass::Rectangle);
        assert_eq!(ShapeClass::from_vertex_count(7), ShapeClass::Rectangle);
        assert_eq!(ShapeClass::from_vertex_count(8), ShapeClass::Circle);
        assert_eq!(ShapeClass::from_vertex_count(18), ShapeClass::Circle);
        assert_eq!(ShapeClass::from_vertex_count(19), ShapeClass::Undefined);
        assert_eq!(ShapeClass::from_vertex_count(usize::MAX), ShapeClass::Undefined);
    }

    #[test]
    fn classification_ranges_partition_counts() {
        for v in 0..100 {
            let in_rect = ShapeClass::RECTANGLE_VERTICES.contains(&v);
            let in_circle = ShapeClass::CIRCLE_VERTICES.contains(&v);
            assert!(!(in_rect && in_circle));
            let expected = if in_rect {
                ShapeClass::Rectangle
            } else if in_circle {
                ShapeClass::Circle
            } else {
                ShapeClass::Undefined
            };
            assert_eq!(ShapeClass::from_vertex_count(v), expected);
        }
    }

    #[test]
    fn display_labels() {
        assert_eq!(ShapeClass::Rectangle.to_string(), "Rectangle");
        assert_eq!(ShapeClass::Circle.to_string(), "Circle");
        assert_eq!(ShapeClass::Undefined.to_string(), "Undefined");
    }

    #[test]
    fn selects_largest_contour() {
        let contours = vec![square(0, 0, 5), square(20, 20, 10), square(50, 0, 3)];
        assert_eq!(select_largest(&contours, 1.0), Some((1, 100.0)));
    }

    #[test]
    fn first_contour_wins_area_tie() {
        let contours = vec![square(0, 0, 6), square(30, 30, 6)];
        assert_eq!(select_largest(&contours, 0.0).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn area_must_exceed_floor_strictly() {
        let contours = vec![square(0, 0, 10)];
        assert_eq!(select_largest(&contours, 100.0), None);
        assert!(select_largest(&contours, 99.9).is_some());
    }

    #[test]
    fn no_contours_selects_nothing() {
        assert_eq!(select_largest(&[], 0.0), None);
    }

    #[test]
    fn single_point_contour_is_never_selected_with_positive_floor() {
        let c = Contour::new(vec![GridPoint::new(1, 1)]).unwrap();
        assert_eq!(select_largest(&[c], 1.0), None);
    }

    #[test]
    fn square_classifies_as_rectangle() {
        let result = classify(&square(10, 10, 100), 0.01);
        assert_eq!(result.approximation.vertex_count(), 4);
        assert_eq!(result.shape, ShapeClass::Rectangle);
    }

    #[test]
    fn twelve_gon_classifies_as_circle() {
        let result = classify(&regular_polygon(12, 100.0), 0.01);
        assert_eq!(result.approximation.vertex_count(), 12);
        assert_eq!(result.shape, ShapeClass::Circle);
    }

    #[test]
    fn triangle_is_undefined() {
        let result = classify(&regular_polygon(3, 80.0), 0.01);
        assert_eq!(result.shape, ShapeClass::Undefined);
    }
}
