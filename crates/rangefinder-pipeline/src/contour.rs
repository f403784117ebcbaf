//! Contour extraction: outer boundaries of connected foreground regions.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! Both shipped tracers follow borders with
//! `imageproc::contours::find_contours` and keep only outermost borders:
//! holes, and regions nested inside holes, are dropped. They differ in
//! how many boundary points survive.

use image::GrayImage;
use imageproc::contours::BorderType;
use serde::{Deserialize, Serialize};

use crate::types::{Contour, GridPoint};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourTracerKind {
    /// Outermost borders with straight runs compressed to their
    /// endpoints. A filled axis-aligned rectangle yields four points.
    #[default]
    ExternalSimple,
    /// Outermost borders with every boundary pixel retained.
    ExternalFull,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary mask (non-zero pixels = foreground).
/// Output: one closed [`Contour`] per outermost connected region, in
/// raster order of each region's first boundary pixel.
pub trait ContourTracer {
    /// Trace contours in the given mask.
    fn trace(&self, mask: &GrayImage) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &GrayImage) -> Vec<Contour> {
        let borders = trace_external(mask);
        match *self {
            Self::ExternalSimple => borders
                .into_iter()
                .filter_map(|points| Contour::new(compress_chain(&points)))
                .collect(),
            Self::ExternalFull => borders.into_iter().filter_map(Contour::new).collect(),
        }
    }
}

/// Suzuki-Abe border following, keeping top-level outer borders.
fn trace_external(mask: &GrayImage) -> Vec<Vec<GridPoint>> {
    let contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(mask);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| GridPoint::new(p.x, p.y))
                .collect()
        })
        .collect()
}

/// Drop boundary points that lie inside a straight run.
///
/// The boundary is treated as closed. A point is kept when the step
/// arriving at it differs in direction from the step leaving it, so
/// horizontal, vertical, and diagonal runs shrink to their endpoints.
/// Chains of one or two points are returned unchanged.
#[must_use]
pub fn compress_chain(points: &[GridPoint]) -> Vec<GridPoint> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step =
        |from: GridPoint, to: GridPoint| ((to.x - from.x).signum(), (to.y - from.y).signum());

    let kept: Vec<GridPoint> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if kept.is_empty() {
        // Only reachable for a degenerate chain of identical points.
        vec![points[0]]
    } else {
        kept
    }
}
