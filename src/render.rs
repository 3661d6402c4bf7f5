//! Painting the image, positions, overlays and draft onto the canvas.

use eframe::egui;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::canvas::AnnotationController;
use crate::geometry::{self, BoundingBox, Point, Shape};
use crate::position::{Position, PositionId};
use crate::transform::{ImageDimensions, ViewTransform};

const OUTLINE: egui::Color32 = egui::Color32::from_rgb(255, 70, 70);
const SELECTED: egui::Color32 = egui::Color32::from_rgb(0, 120, 255);
const LINK_SOURCE: egui::Color32 = egui::Color32::from_rgb(255, 170, 0);
const DRAFT: egui::Color32 = egui::Color32::from_rgb(255, 255, 255);
const LABEL_BG: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);

fn to_screen(canvas_min: egui::Pos2, view: &ViewTransform, p: Point) -> egui::Pos2 {
    let s = view.image_to_screen(p);
    canvas_min + egui::vec2(s.x as f32, s.y as f32)
}

fn box_to_rect(canvas_min: egui::Pos2, view: &ViewTransform, bounds: &BoundingBox) -> egui::Rect {
    egui::Rect::from_min_max(
        to_screen(canvas_min, view, bounds.min()),
        to_screen(canvas_min, view, bounds.max()),
    )
}

/// Decoded overlay textures, keyed by position and invalidated when the
/// overlay bytes change.
#[derive(Default)]
pub struct OverlayTextures {
    cache: HashMap<PositionId, (Arc<[u8]>, Option<egui::TextureHandle>)>,
}

impl OverlayTextures {
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Texture of the overlay on `position`, decoding it on first use.
    pub fn texture_for(&mut self, ctx: &egui::Context, position: &Position) -> Option<&egui::TextureHandle> {
        let overlay = position.overlay.as_ref()?;
        let fresh = match self.cache.get(&position.id) {
            Some((bytes, _)) => !Arc::ptr_eq(bytes, &overlay.bytes),
            None => true,
        };
        if fresh {
            let handle = match image::load_from_memory(&overlay.bytes) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    let size = [rgba.width() as usize, rgba.height() as usize];
                    let color_image =
                        egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice());
                    Some(ctx.load_texture(
                        format!("overlay-{}", position.id),
                        color_image,
                        egui::TextureOptions::LINEAR,
                    ))
                }
                Err(e) => {
                    warn!(id = %position.id, file_name = %overlay.file_name, "overlay is not a decodable image: {e}");
                    None
                }
            };
            self.cache
                .insert(position.id, (overlay.bytes.clone(), handle));
        }
        self.cache
            .get(&position.id)
            .and_then(|(_, handle)| handle.as_ref())
    }

    /// Drops textures of positions that are gone or lost their overlay.
    pub fn retain_live(&mut self, controller: &AnnotationController) {
        self.cache.retain(|id, _| {
            controller
                .positions()
                .get(*id)
                .is_some_and(|p| p.overlay.is_some())
        });
    }
}

pub fn paint_image(
    painter: &egui::Painter,
    canvas_min: egui::Pos2,
    view: &ViewTransform,
    dimensions: ImageDimensions,
    texture: &egui::TextureHandle,
) {
    let on_screen = view.image_rect(dimensions);
    let rect = egui::Rect::from_min_size(
        canvas_min + egui::vec2(on_screen.x as f32, on_screen.y as f32),
        egui::vec2(on_screen.width as f32, on_screen.height as f32),
    );
    painter.image(
        texture.id(),
        rect,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );
}

fn outline_points(canvas_min: egui::Pos2, view: &ViewTransform, bounds: &BoundingBox, shape: Shape) -> Vec<egui::Pos2> {
    geometry::clip_outline(bounds, shape)
        .into_iter()
        .map(|p| to_screen(canvas_min, view, p))
        .collect()
}

/// Overlay stretched over the shape's frame and clipped to its outline.
fn paint_overlay(
    painter: &egui::Painter,
    canvas_min: egui::Pos2,
    view: &ViewTransform,
    position: &Position,
    texture: egui::TextureId,
) {
    let outline = geometry::clip_outline(&position.bounds, position.shape());
    if outline.len() < 3 {
        return;
    }
    let frame = geometry::overlay_frame(&position.bounds, position.shape());
    let mut mesh = egui::Mesh::with_texture(texture);
    for p in &outline {
        let uv = if frame.width > 0.0 && frame.height > 0.0 {
            egui::pos2(
                ((p.x - frame.x) / frame.width) as f32,
                ((p.y - frame.y) / frame.height) as f32,
            )
        } else {
            egui::Pos2::ZERO
        };
        mesh.vertices.push(egui::epaint::Vertex {
            pos: to_screen(canvas_min, view, *p),
            uv,
            color: egui::Color32::WHITE,
        });
    }
    // every outline is convex, so a fan from the first vertex covers it
    for i in 1..outline.len() as u32 - 1 {
        mesh.add_triangle(0, i, i + 1);
    }
    painter.add(egui::Shape::mesh(mesh));
}

fn paint_label(painter: &egui::Painter, center: egui::Pos2, text: &str) {
    let galley = painter.layout_no_wrap(
        text.to_owned(),
        egui::FontId::proportional(14.0),
        egui::Color32::WHITE,
    );
    let rect = egui::Rect::from_center_size(center, galley.size()).expand(3.0);
    painter.rect_filled(rect, 3.0, LABEL_BG);
    painter.galley(rect.min + egui::vec2(3.0, 3.0), galley, egui::Color32::WHITE);
}

pub fn paint_positions(
    ctx: &egui::Context,
    painter: &egui::Painter,
    canvas_min: egui::Pos2,
    controller: &AnnotationController,
    textures: &mut OverlayTextures,
) {
    let view = controller.view();
    let selected = controller.selected();
    let link_source = controller.link_source();

    for position in controller.positions() {
        if let Some(texture) = textures.texture_for(ctx, position) {
            paint_overlay(painter, canvas_min, view, position, texture.id());
        }

        let color = if link_source == Some(position.id) {
            LINK_SOURCE
        } else if selected == Some(position.id) {
            SELECTED
        } else {
            OUTLINE
        };
        let points = outline_points(canvas_min, view, &position.bounds, position.shape());
        painter.add(egui::Shape::closed_line(points, egui::Stroke::new(2.0, color)));

        if selected == Some(position.id) {
            painter.rect_stroke(
                box_to_rect(canvas_min, view, &position.bounds).expand(4.0),
                2.0,
                egui::Stroke::new(1.5, SELECTED),
                egui::StrokeKind::Middle,
            );
        }

        if let Some(name) = controller.resolve_display_file_name(position.id) {
            paint_label(painter, to_screen(canvas_min, view, position.bounds.center()), name);
        }
    }
}

pub fn paint_draft(painter: &egui::Painter, canvas_min: egui::Pos2, controller: &AnnotationController) {
    let Some((draft, shape)) = controller.draft() else {
        return;
    };
    let view = controller.view();
    painter.rect_stroke(
        box_to_rect(canvas_min, view, &draft),
        0.0,
        egui::Stroke::new(1.0, DRAFT.gamma_multiply(0.5)),
        egui::StrokeKind::Middle,
    );
    let points = outline_points(canvas_min, view, &draft, shape);
    painter.add(egui::Shape::closed_line(points, egui::Stroke::new(2.0, DRAFT)));
}
