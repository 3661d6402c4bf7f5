//! Screen ↔ image mapping and export-origin conventions.

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Point};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 5.0;
const ZOOM_IN_FACTOR: f64 = 1.1;
const ZOOM_OUT_FACTOR: f64 = 0.9;

/// Intrinsic size of the loaded image. For PDFs this is the 1x page size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: f64,
    pub height: f64,
}

impl ImageDimensions {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Zoom and pan of the annotation surface.
///
/// Screen coordinates are canvas-local: the image's top-left corner is drawn
/// at `pan`, so the rendered image element is the only anchor for the
/// screen → image mapping. Container scroll never enters the formula.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    scale: f64,
    pan: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: Point::ZERO,
        }
    }
}

impl ViewTransform {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn set_pan(&mut self, pan: Point) {
        self.pan = pan;
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }

    /// One wheel tick. Negative `delta_y` (wheel up) zooms in.
    pub fn zoom_step(&mut self, delta_y: f64) {
        if delta_y > 0.0 {
            self.set_scale(self.scale * ZOOM_OUT_FACTOR);
        } else if delta_y < 0.0 {
            self.set_scale(self.scale * ZOOM_IN_FACTOR);
        }
    }

    /// Zoom step that keeps the image point under `anchor` (screen) in place.
    pub fn zoom_step_at(&mut self, delta_y: f64, anchor: Point) {
        let fixed = self.screen_to_image(anchor);
        self.zoom_step(delta_y);
        self.pan = Point::new(
            anchor.x - fixed.x * self.scale,
            anchor.y - fixed.y * self.scale,
        );
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn screen_to_image(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.scale,
            (screen.y - self.pan.y) / self.scale,
        )
    }

    pub fn image_to_screen(&self, image: Point) -> Point {
        Point::new(
            image.x * self.scale + self.pan.x,
            image.y * self.scale + self.pan.y,
        )
    }

    pub fn box_to_screen(&self, bounds: &BoundingBox) -> BoundingBox {
        let min = self.image_to_screen(bounds.min());
        BoundingBox::new(
            min.x,
            min.y,
            bounds.width * self.scale,
            bounds.height * self.scale,
        )
    }

    /// On-screen rect of the whole image.
    pub fn image_rect(&self, dimensions: ImageDimensions) -> BoundingBox {
        self.box_to_screen(&BoundingBox::new(
            0.0,
            0.0,
            dimensions.width,
            dimensions.height,
        ))
    }
}

/// Axis convention applied to exported coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinateOrigin {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl CoordinateOrigin {
    pub const ALL: [CoordinateOrigin; 5] = [
        CoordinateOrigin::TopLeft,
        CoordinateOrigin::TopRight,
        CoordinateOrigin::BottomLeft,
        CoordinateOrigin::BottomRight,
        CoordinateOrigin::Center,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CoordinateOrigin::TopLeft => "Top left",
            CoordinateOrigin::TopRight => "Top right",
            CoordinateOrigin::BottomLeft => "Bottom left",
            CoordinateOrigin::BottomRight => "Bottom right",
            CoordinateOrigin::Center => "Center",
        }
    }

    /// Maps an image-intrinsic point into this origin's convention.
    pub fn to_origin(&self, p: Point, dims: ImageDimensions) -> Point {
        let (w, h) = (dims.width, dims.height);
        match self {
            CoordinateOrigin::TopLeft => p,
            CoordinateOrigin::TopRight => Point::new(w - p.x, p.y),
            CoordinateOrigin::BottomLeft => Point::new(p.x, h - p.y),
            CoordinateOrigin::BottomRight => Point::new(w - p.x, h - p.y),
            CoordinateOrigin::Center => Point::new(p.x - w / 2.0, p.y - h / 2.0),
        }
    }

    /// Inverse of [`Self::to_origin`].
    #[allow(dead_code)]
    pub fn from_origin(&self, p: Point, dims: ImageDimensions) -> Point {
        match self {
            CoordinateOrigin::Center => Point::new(p.x + dims.width / 2.0, p.y + dims.height / 2.0),
            // the mirrored conventions are their own inverse
            _ => self.to_origin(p, dims),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: ImageDimensions = ImageDimensions::new(200.0, 100.0);

    #[test]
    fn test_top_left_twice_is_identity() {
        let p = Point::new(12.5, 40.25);
        let once = CoordinateOrigin::TopLeft.to_origin(p, DIMS);
        assert_eq!(CoordinateOrigin::TopLeft.to_origin(once, DIMS), p);
    }

    #[test]
    fn test_bottom_right_is_self_inverse() {
        let p = Point::new(12.0, 40.0);
        let once = CoordinateOrigin::BottomRight.to_origin(p, DIMS);
        assert_eq!(once, Point::new(188.0, 60.0));
        assert_eq!(CoordinateOrigin::BottomRight.to_origin(once, DIMS), p);
    }

    #[test]
    fn test_every_origin_round_trips() {
        let p = Point::new(33.3, 71.7);
        for origin in CoordinateOrigin::ALL {
            let back = origin.from_origin(origin.to_origin(p, DIMS), DIMS);
            assert!((back.x - p.x).abs() < 1e-9, "{origin:?}");
            assert!((back.y - p.y).abs() < 1e-9, "{origin:?}");
        }
    }

    #[test]
    fn test_center_origin_offsets_by_half_size() {
        let p = CoordinateOrigin::Center.to_origin(Point::new(0.0, 100.0), DIMS);
        assert_eq!(p, Point::new(-100.0, 50.0));
    }

    #[test]
    fn test_screen_image_mapping_uses_pan_and_scale() {
        let mut view = ViewTransform::default();
        view.set_scale(2.0);
        view.set_pan(Point::new(30.0, -10.0));
        let image = view.screen_to_image(Point::new(50.0, 10.0));
        assert_eq!(image, Point::new(10.0, 10.0));
        assert_eq!(view.image_to_screen(image), Point::new(50.0, 10.0));
    }

    #[test]
    fn test_zoom_at_keeps_point_under_cursor() {
        let mut view = ViewTransform::default();
        view.set_pan(Point::new(20.0, 10.0));
        let anchor = Point::new(220.0, 110.0);
        let before = view.screen_to_image(anchor);
        view.zoom_step_at(-1.0, anchor);
        assert!((view.scale() - 1.1).abs() < 1e-9);
        let after = view.screen_to_image(anchor);
        assert!((after.x - before.x).abs() < 1e-9 && (after.y - before.y).abs() < 1e-9);

        // pinned at the max scale, the pan does not drift either
        view.set_scale(MAX_SCALE);
        let pan = view.pan();
        view.zoom_step_at(-1.0, anchor);
        assert_eq!(view.pan(), pan);
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut view = ViewTransform::default();
        view.zoom_step(-1.0);
        assert!((view.scale() - 1.1).abs() < 1e-9);
        view.zoom_step(1.0);
        assert!((view.scale() - 0.99).abs() < 1e-9);
        view.zoom_step(0.0);
        assert!((view.scale() - 0.99).abs() < 1e-9);

        for _ in 0..100 {
            view.zoom_step(-1.0);
        }
        assert_eq!(view.scale(), MAX_SCALE);
        for _ in 0..100 {
            view.zoom_step(1.0);
        }
        assert_eq!(view.scale(), MIN_SCALE);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut view = ViewTransform::default();
        view.set_scale(3.0);
        view.set_pan(Point::new(-500.0, 900.0));
        view.reset();
        assert_eq!(view, ViewTransform::default());
    }

    #[test]
    fn test_image_rect_scales_dimensions() {
        let mut view = ViewTransform::default();
        view.set_scale(0.5);
        view.set_pan(Point::new(10.0, 20.0));
        assert_eq!(
            view.image_rect(DIMS),
            BoundingBox::new(10.0, 20.0, 100.0, 50.0)
        );
    }
}
