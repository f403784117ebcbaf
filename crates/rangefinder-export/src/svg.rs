//! SVG overlay serializer.
//!
//! Converts one tick's [`FrameOutput`] into an SVG string using the
//! [`svg`] crate for document construction, XML escaping, and path
//! data formatting. The document's coordinate space is the frame's
//! pixel grid, so the SVG can be laid directly over the frame.
//!
//! Layers, bottom to top:
//!
//! 1. `<g id="contours">`: one closed `<path>` per extracted contour.
//! 2. `<g id="annotations">`: rotated rectangles and enclosing circles
//!    whose draw flags are set.
//! 3. `<g id="detection">`: the selected object's bounding box, its
//!    enclosing circle when classified as a circle, and its
//!    shape/distance label.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>`, and the
//! pipeline configuration for reproducibility.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Rectangle, Text, Title};
use svg::node::{Node, Text as TextNode, Value};

use rangefinder_pipeline::{ContourAnnotation, Detection, FrameOutput, Point, ShapeClass};

use crate::{
    BOX_COLOR, CIRCLE_COLOR, CONTOUR_COLOR, DETECTION_COLOR, STROKE_WIDTH, detection_label,
    pixel_center, shifted,
};

/// Font size of the detection label, in pixels.
const LABEL_FONT_SIZE: u32 = 14;
/// Gap between the detection box and its label, in pixels.
const LABEL_GAP: f64 = 4.0;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the frame's file name or index.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized pipeline configuration, emitted inside `<metadata>`
    /// wrapped in a namespaced `<rangefinder:config>` element.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string through `points`.
///
/// Uses `M` for the first point and `L` for subsequent points, then `z`
/// when `closed`. Returns an empty string for fewer than 2 points.
///
/// # Examples
///
/// ```
/// use rangefinder_pipeline::Point;
/// use rangefinder_export::build_path_data;
///
/// let points = [Point::new(10.0, 20.0), Point::new(30.0, 40.0)];
/// assert_eq!(build_path_data(&points, false), "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(points: &[Point], closed: bool) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let mut data = Data::new().move_to((first.x, first.y));
    for p in rest {
        data = data.line_to((p.x, p.y));
    }
    if closed {
        data = data.close();
    }
    String::from(Value::from(data))
}

fn hex(color: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

fn stroked_path(d: String, color: [u8; 3]) -> Path {
    Path::new()
        .set("d", d)
        .set("fill", "none")
        .set("stroke", hex(color))
        .set("stroke-width", STROKE_WIDTH)
}

fn annotation_nodes(annotation: &ContourAnnotation) -> (Option<Path>, Option<Circle>) {
    let rotated = annotation.draw_box.then(|| {
        let corners: Vec<Point> = annotation
            .rotated_rect
            .corners
            .iter()
            .map(|&c| shifted(c))
            .collect();
        stroked_path(build_path_data(&corners, true), BOX_COLOR)
    });
    let circle = annotation.draw_circle.then(|| {
        let center = shifted(annotation.enclosing_circle.center);
        Circle::new()
            .set("cx", center.x)
            .set("cy", center.y)
            .set("r", annotation.enclosing_circle.radius)
            .set("fill", "none")
            .set("stroke", hex(CIRCLE_COLOR))
            .set("stroke-width", STROKE_WIDTH)
    });
    (rotated, circle)
}

fn detection_group(detection: &Detection) -> Group {
    let rect = detection.geometry.bounding_rect;
    let left = f64::from(rect.x) + 0.5;
    let top = f64::from(rect.y) + 0.5;
    let color = hex(DETECTION_COLOR);

    let outline = Rectangle::new()
        .set("x", left)
        .set("y", top)
        .set("width", f64::from(rect.width.saturating_sub(1)))
        .set("height", f64::from(rect.height.saturating_sub(1)))
        .set("fill", "none")
        .set("stroke", color.clone())
        .set("stroke-width", STROKE_WIDTH);

    let label = Text::new(detection_label(detection))
        .set("x", left)
        .set("y", top - LABEL_GAP)
        .set("fill", color)
        .set("font-family", "sans-serif")
        .set("font-size", LABEL_FONT_SIZE);

    let mut group = Group::new()
        .set("id", "detection")
        .set("data-shape", detection.shape.label())
        .add(outline);
    if detection.shape == ShapeClass::Circle {
        let circle = detection.geometry.enclosing_circle;
        let center = shifted(circle.center);
        group = group.add(
            Circle::new()
                .set("cx", center.x)
                .set("cy", center.y)
                .set("r", circle.radius)
                .set("fill", "none")
                .set("stroke", hex(DETECTION_COLOR))
                .set("stroke-width", STROKE_WIDTH),
        );
    }
    group.add(label)
}

/// Serialize one tick's output into an SVG overlay document.
///
/// The `viewBox` matches the frame's pixel grid. Markers are drawn
/// through pixel centers, so a contour point at pixel `(10, 20)` is
/// emitted at `(10.5, 20.5)`. Contours with fewer than 2 points, and
/// annotations whose draw flags are clear, are skipped.
///
/// # Examples
///
/// ```
/// use rangefinder_pipeline::{PipelineConfig, RgbImage, process_frame};
/// use rangefinder_export::{SvgMetadata, to_svg};
///
/// let output = process_frame(RgbImage::new(64, 48), &PipelineConfig::default());
/// let metadata = SvgMetadata {
///     title: Some("frame-00000"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&output, &metadata);
/// assert!(svg.contains(r#"viewBox="0 0 64 48""#));
/// assert!(svg.contains("<title>frame-00000</title>"));
/// ```
#[must_use]
pub fn to_svg(output: &FrameOutput, metadata: &SvgMetadata<'_>) -> String {
    let w = output.dimensions.width;
    let h = output.dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(TextNode::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("rangefinder:config");
        config_el.assign("xmlns:rangefinder", "https://rangefinder.invalid/ns/1");
        config_el.append(TextNode::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let mut contours = Group::new().set("id", "contours");
    for contour in &output.contours {
        let points: Vec<Point> = contour.points().iter().map(|&p| pixel_center(p)).collect();
        let d = build_path_data(&points, true);
        if !d.is_empty() {
            contours = contours.add(stroked_path(d, CONTOUR_COLOR));
        }
    }
    doc = doc.add(contours);

    if !output.annotations.is_empty() {
        let mut annotations = Group::new().set("id", "annotations");
        for annotation in &output.annotations {
            let (rotated, circle) = annotation_nodes(annotation);
            if let Some(rotated) = rotated {
                annotations = annotations.add(rotated);
            }
            if let Some(circle) = circle {
                annotations = annotations.add(circle);
            }
        }
        doc = doc.add(annotations);
    }

    if let Some(detection) = &output.detection {
        doc = doc.add(detection_group(detection));
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
