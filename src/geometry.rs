//! Shape geometry in image-intrinsic coordinates.
//!
//! Everything here is a pure function of a [`BoundingBox`] and a [`Shape`].
//! Values stay full-precision `f64`; rounding only happens at the export
//! boundary.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Share of the box width used by a trapezoid's top edge.
pub const TRAPEZOID_TOP_RATIO: f64 = 0.8;

/// Segments used to approximate a circle outline.
const CIRCLE_SEGMENTS: usize = 48;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned box, origin top-left, y growing downwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanned by two drag endpoints, whatever the drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn min(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn max(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Closed containment test; points on the edge count as inside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shape {
    #[default]
    Rectangle,
    Circle,
    Trapezoid,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Rectangle, Shape::Circle, Shape::Trapezoid];

    pub fn label(&self) -> &'static str {
        match self {
            Shape::Rectangle => "Rectangle",
            Shape::Circle => "Circle",
            Shape::Trapezoid => "Trapezoid",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexLabel {
    #[serde(rename = "Top-left")]
    TopLeft,
    #[serde(rename = "Top-right")]
    TopRight,
    #[serde(rename = "Bottom-right")]
    BottomRight,
    #[serde(rename = "Bottom-left")]
    BottomLeft,
    Center,
    Radius,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabeledPoint {
    pub label: VertexLabel,
    pub point: Point,
}

impl LabeledPoint {
    fn new(label: VertexLabel, x: f64, y: f64) -> Self {
        Self {
            label,
            point: Point::new(x, y),
        }
    }
}

/// Radius of the circle drawn in `bounds`: the larger half-extent, rounded.
pub fn circle_radius(bounds: &BoundingBox) -> f64 {
    (bounds.width.max(bounds.height) / 2.0).round()
}

/// Canonical labeled anchor points of a shape, in a fixed order.
pub fn vertices_of(bounds: &BoundingBox, shape: Shape) -> Vec<LabeledPoint> {
    let BoundingBox {
        x,
        y,
        width: w,
        height: h,
    } = *bounds;
    match shape {
        Shape::Rectangle => vec![
            LabeledPoint::new(VertexLabel::TopLeft, x, y),
            LabeledPoint::new(VertexLabel::TopRight, x + w, y),
            LabeledPoint::new(VertexLabel::BottomRight, x + w, y + h),
            LabeledPoint::new(VertexLabel::BottomLeft, x, y + h),
        ],
        Shape::Circle => {
            let c = bounds.center();
            let r = circle_radius(bounds);
            vec![
                LabeledPoint::new(VertexLabel::Center, c.x, c.y),
                LabeledPoint::new(VertexLabel::Radius, c.x + r, c.y),
            ]
        }
        Shape::Trapezoid => {
            let top_width = w * TRAPEZOID_TOP_RATIO;
            let top_offset = (w - top_width) / 2.0;
            vec![
                LabeledPoint::new(VertexLabel::TopLeft, x + top_offset, y),
                LabeledPoint::new(VertexLabel::TopRight, x + top_offset + top_width, y),
                LabeledPoint::new(VertexLabel::BottomRight, x + w, y + h),
                LabeledPoint::new(VertexLabel::BottomLeft, x, y + h),
            ]
        }
    }
}

/// Hit test used for every shape type.
///
/// This is a bounding-box test, not true polygon or circle containment: a
/// click in the empty corner of a trapezoid's box still counts as a hit.
pub fn contains(bounds: &BoundingBox, point: Point) -> bool {
    bounds.contains(point)
}

/// Polygon outline of the shape, used for stroking and overlay clipping.
pub fn clip_outline(bounds: &BoundingBox, shape: Shape) -> Vec<Point> {
    match shape {
        Shape::Rectangle | Shape::Trapezoid => vertices_of(bounds, shape)
            .into_iter()
            .map(|v| v.point)
            .collect(),
        Shape::Circle => {
            let c = bounds.center();
            let r = circle_radius(bounds);
            (0..CIRCLE_SEGMENTS)
                .map(|i| {
                    let angle = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                    Point::new(c.x + r * angle.cos(), c.y + r * angle.sin())
                })
                .collect()
        }
    }
}

/// Box an overlay image is stretched over.
pub fn overlay_frame(bounds: &BoundingBox, shape: Shape) -> BoundingBox {
    match shape {
        Shape::Circle => {
            let c = bounds.center();
            let r = circle_radius(bounds);
            BoundingBox::new(c.x - r, c.y - r, r * 2.0, r * 2.0)
        }
        Shape::Rectangle | Shape::Trapezoid => *bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(bounds: BoundingBox, shape: Shape) -> Vec<(VertexLabel, f64, f64)> {
        vertices_of(&bounds, shape)
            .into_iter()
            .map(|v| (v.label, v.point.x, v.point.y))
            .collect()
    }

    #[test]
    fn test_rectangle_corners_in_clockwise_order() {
        let pts = points(BoundingBox::new(10.0, 20.0, 30.0, 40.0), Shape::Rectangle);
        assert_eq!(
            pts,
            vec![
                (VertexLabel::TopLeft, 10.0, 20.0),
                (VertexLabel::TopRight, 40.0, 20.0),
                (VertexLabel::BottomRight, 40.0, 60.0),
                (VertexLabel::BottomLeft, 10.0, 60.0),
            ]
        );
    }

    #[test]
    fn test_circle_uses_larger_dimension_for_radius() {
        let pts = points(BoundingBox::new(0.0, 0.0, 10.0, 20.0), Shape::Circle);
        assert_eq!(
            pts,
            vec![
                (VertexLabel::Center, 5.0, 10.0),
                (VertexLabel::Radius, 15.0, 10.0),
            ]
        );
        assert_eq!(circle_radius(&BoundingBox::new(0.0, 0.0, 10.0, 20.0)), 10.0);
    }

    #[test]
    fn test_circle_radius_is_rounded() {
        assert_eq!(circle_radius(&BoundingBox::new(0.0, 0.0, 7.0, 3.0)), 4.0);
    }

    #[test]
    fn test_trapezoid_top_edge_is_centered() {
        let pts = points(BoundingBox::new(0.0, 0.0, 10.0, 10.0), Shape::Trapezoid);
        assert_eq!(pts[0].0, VertexLabel::TopLeft);
        assert!((pts[0].1 - 1.0).abs() < 1e-9);
        assert_eq!(pts[0].2, 0.0);
        assert!((pts[1].1 - 9.0).abs() < 1e-9);
        assert_eq!(pts[1].2, 0.0);
        assert_eq!((pts[2].1, pts[2].2), (10.0, 10.0));
        assert_eq!((pts[3].1, pts[3].2), (0.0, 10.0));
    }

    #[test]
    fn test_from_corners_normalizes_reverse_drag() {
        let bounds = BoundingBox::from_corners(Point::new(10.0, 10.0), Point::new(5.0, 5.0));
        assert_eq!(bounds, BoundingBox::new(5.0, 5.0, 5.0, 5.0));
    }

    #[test]
    fn test_contains_is_closed_box() {
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(contains(&bounds, Point::new(0.0, 0.0)));
        assert!(contains(&bounds, Point::new(10.0, 10.0)));
        assert!(!contains(&bounds, Point::new(10.1, 5.0)));
        assert!(!contains(&bounds, Point::new(5.0, -0.1)));
    }

    #[test]
    fn test_trapezoid_corner_outside_polygon_still_hits() {
        // (0.5, 0.5) lies left of the slanted edge but inside the box.
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(contains(&bounds, Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_circle_outline_stays_on_radius() {
        let bounds = BoundingBox::new(0.0, 0.0, 20.0, 10.0);
        let outline = clip_outline(&bounds, Shape::Circle);
        assert_eq!(outline.len(), CIRCLE_SEGMENTS);
        for p in outline {
            let d = ((p.x - 10.0).powi(2) + (p.y - 5.0).powi(2)).sqrt();
            assert!((d - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_overlay_frame_for_circle_is_square() {
        let frame = overlay_frame(&BoundingBox::new(0.0, 0.0, 10.0, 20.0), Shape::Circle);
        assert_eq!(frame, BoundingBox::new(-5.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_shape_serializes_uppercase() {
        let json = serde_json::to_string(&Shape::Trapezoid).unwrap();
        assert_eq!(json, "\"TRAPEZOID\"");
    }

    #[test]
    fn test_vertex_labels_serialize_as_display_names() {
        let json = serde_json::to_string(&[VertexLabel::TopLeft, VertexLabel::BottomRight, VertexLabel::Center]).unwrap();
        assert_eq!(json, r#"["Top-left","Bottom-right","Center"]"#);
    }
}
