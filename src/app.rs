use eframe::egui;
use egui_extras::{Column, TableBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::canvas::{
    AnnotationController, CanvasEvent, InteractionState, KeyEvent, PointerButton, PointerEvent,
};
use crate::config::{AppConfig, LoadConfigResult, PanModifier};
use crate::error::ExportError;
use crate::export::{export_positions, to_json};
use crate::geometry::{Point, Shape};
use crate::position::{Position, PositionSet};
use crate::render::{self, OverlayTextures};
use crate::source::{ConversionJob, LoadedImage, PendingUpload, RasterFormat, SourceKind};
use crate::transform::{CoordinateOrigin, ImageDimensions};

const UPLOAD_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "pdf"];
const OVERLAY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

// ── Loaded image ────────────────────────────────────────────────────────────

struct CanvasImage {
    file_name: String,
    kind: SourceKind,
    dimensions: ImageDimensions,
    texture: egui::TextureHandle,
}

impl CanvasImage {
    fn upload(ctx: &egui::Context, loaded: LoadedImage) -> Self {
        let size = [loaded.bitmap.width() as usize, loaded.bitmap.height() as usize];
        let color_image =
            egui::ColorImage::from_rgba_unmultiplied(size, loaded.bitmap.as_flat_samples().as_slice());
        let texture = ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR);
        Self {
            file_name: loaded.file_name,
            kind: loaded.kind,
            dimensions: loaded.dimensions,
            texture,
        }
    }
}

#[derive(Debug)]
enum Notice {
    Failure(String),
    Info(String),
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct PositionAnnotatorApp {
    config: AppConfig,
    controller: AnnotationController,
    origin: CoordinateOrigin,

    image: Option<CanvasImage>,
    overlays: OverlayTextures,

    // upload pipeline
    job: Option<ConversionJob>,
    awaiting_format: Option<PendingUpload>,
    pdf_format: RasterFormat,

    notice: Option<Notice>,
    export_output: Option<String>,

    pointer_inside: bool,
    hover_image_pos: Option<Point>,
}

impl PositionAnnotatorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, loaded: LoadConfigResult, initial: Option<PathBuf>) -> Self {
        Self::with_context(&cc.egui_ctx, loaded, initial)
    }

    fn with_context(ctx: &egui::Context, loaded: LoadConfigResult, initial: Option<PathBuf>) -> Self {
        let LoadConfigResult {
            config,
            reset_reason,
        } = loaded;
        let mut app = Self {
            controller: AnnotationController::new(config.data.default_shape),
            origin: config.data.default_origin,
            pdf_format: config.data.pdf_format,
            config,
            image: None,
            overlays: OverlayTextures::default(),
            job: None,
            awaiting_format: None,
            notice: reset_reason.map(|reason| {
                Notice::Info(format!("Preferences were reset to defaults. {reason}"))
            }),
            export_output: None,
            pointer_inside: false,
            hover_image_pos: None,
        };
        if let Some(path) = initial {
            app.begin_upload(ctx, &path);
        }
        app
    }

    fn uploads_enabled(&self) -> bool {
        self.job.is_none() && self.awaiting_format.is_none()
    }

    // ── Upload ──────────────────────────────────────────────────────────────

    fn pick_upload(&mut self, ctx: &egui::Context) {
        let mut dialog = rfd::FileDialog::new().add_filter("Images and PDF", UPLOAD_EXTENSIONS);
        if let Some(dir) = &self.config.data.last_directory {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.begin_upload(ctx, &path);
        }
    }

    fn begin_upload(&mut self, ctx: &egui::Context, path: &Path) {
        if !self.uploads_enabled() {
            warn!("upload ignored, a conversion is already running");
            return;
        }
        match PendingUpload::read(path) {
            Ok(upload) => {
                self.config.remember_directory(&upload.path);
                match upload.kind {
                    // the output format is chosen before a PDF is converted
                    SourceKind::Pdf => self.awaiting_format = Some(upload),
                    SourceKind::Raster => self.start_job(ctx, upload),
                }
            }
            Err(e) => {
                error!("{e}");
                self.notice = Some(Notice::Failure(e.to_string()));
            }
        }
    }

    fn start_job(&mut self, ctx: &egui::Context, upload: PendingUpload) {
        let quality = self.config.data.jpeg_quality;
        self.job = Some(ConversionJob::spawn(upload, self.pdf_format, quality, ctx.clone()));
    }

    fn poll_job(&mut self, ctx: &egui::Context) {
        let Some(result) = self.job.as_ref().and_then(ConversionJob::poll) else {
            return;
        };
        self.job = None;
        match result {
            Ok(loaded) => {
                info!(
                    file_name = %loaded.file_name,
                    width = loaded.dimensions.width,
                    height = loaded.dimensions.height,
                    "image loaded"
                );
                self.image = Some(CanvasImage::upload(ctx, loaded));
                self.controller.reset_for_new_image();
                self.overlays.clear();
                self.export_output = None;
            }
            Err(e) => {
                // previous image and positions stay as they were
                error!("{e}");
                self.notice = Some(Notice::Failure(e.to_string()));
            }
        }
    }

    // ── Overlay / link actions ──────────────────────────────────────────────

    fn pick_overlay(&mut self) {
        if self.controller.selected().is_none() {
            return;
        }
        let mut dialog = rfd::FileDialog::new().add_filter("Images", OVERLAY_EXTENSIONS);
        if let Some(dir) = &self.config.data.last_directory {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.pick_file() else {
            return;
        };
        match std::fs::read(&path) {
            Ok(bytes) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.config.remember_directory(&path);
                self.controller
                    .set_overlay_on_selected(Arc::from(bytes), file_name);
            }
            Err(e) => {
                error!("Failed to read overlay {:?}: {}", path, e);
                self.notice = Some(Notice::Failure(format!(
                    "Could not read {}: {e}",
                    path.display()
                )));
            }
        }
    }

    fn export(&mut self) {
        let Some(image) = &self.image else {
            self.notice = Some(Notice::Info(ExportError::NoPositions.to_string()));
            return;
        };
        let result = export_positions(self.controller.positions(), self.origin, image.dimensions)
            .and_then(|exported| to_json(&exported));
        match result {
            Ok(json) => {
                info!(origin = ?self.origin, "exported positions\n{json}");
                self.export_output = Some(json);
            }
            Err(e @ ExportError::NoPositions) => {
                self.notice = Some(Notice::Info(e.to_string()));
            }
            Err(e) => {
                error!("{e}");
                self.notice = Some(Notice::Failure(e.to_string()));
            }
        }
    }

    fn log_event(&self, event: Option<CanvasEvent>) {
        if let Some(event) = event {
            debug!(?event, "canvas");
        }
    }

    // ── Input ───────────────────────────────────────────────────────────────

    /// Feeds this frame's raw egui events to the controller, in order.
    fn handle_canvas_input(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let input = CanvasInput {
            rect: response.rect,
            hovered: response.hovered(),
            keyboard_free: !ctx.wants_keyboard_input(),
            pan_modifier: self.config.data.pan_modifier,
        };
        let events = ctx.input(|i| i.events.clone());

        for event in &events {
            let outcome = match translate_event(event, &input, &mut self.pointer_inside) {
                Some(CanvasInputEvent::Pointer(pointer)) => self.controller.handle_pointer(pointer),
                Some(CanvasInputEvent::Key(key)) => self.controller.handle_key(key),
                None => None,
            };
            self.log_event(outcome);
        }

        self.hover_image_pos = response
            .hover_pos()
            .map(|pos| self.controller.view().screen_to_image(input.local(pos)));
    }

    // ── Panels ──────────────────────────────────────────────────────────────

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add_enabled_ui(self.uploads_enabled(), |ui| {
                if ui.button("Open…").clicked() {
                    self.pick_upload(ctx);
                }
            });
            if let Some(job) = &self.job {
                ui.spinner();
                ui.label(format!("Converting {}", job.file_name()));
            }
            ui.separator();

            let mut shape = self.controller.shape();
            for s in Shape::ALL {
                ui.selectable_value(&mut shape, s, s.label());
            }
            if shape != self.controller.shape() {
                self.controller.set_shape(shape);
                self.config.data.default_shape = shape;
                self.config.dirty = true;
            }
            ui.separator();

            let has_selection = self.controller.selected().is_some();
            let selected_has_overlay = self
                .controller
                .selected()
                .and_then(|id| self.controller.positions().get(id))
                .is_some_and(|p| p.overlay.is_some());
            if ui
                .add_enabled(has_selection, egui::Button::new("Set overlay…"))
                .clicked()
            {
                self.pick_overlay();
            }
            if ui
                .add_enabled(selected_has_overlay, egui::Button::new("Clear overlay"))
                .clicked()
            {
                self.controller.clear_overlay_on_selected();
            }
            if ui
                .add_enabled(selected_has_overlay, egui::Button::new("Link file name"))
                .clicked()
            {
                let outcome = self.controller.request_link_filename_for_selected();
                self.log_event(outcome);
            }
            if ui
                .add_enabled(has_selection, egui::Button::new("Unlink"))
                .clicked()
            {
                self.controller.unlink_selected();
            }
            if ui
                .add_enabled(has_selection, egui::Button::new("Delete"))
                .clicked()
            {
                let outcome = self.controller.handle_key(KeyEvent::Delete);
                self.log_event(outcome);
            }
            ui.separator();

            let before = self.origin;
            egui::ComboBox::from_label("Origin")
                .selected_text(self.origin.label())
                .show_ui(ui, |ui| {
                    for origin in CoordinateOrigin::ALL {
                        ui.selectable_value(&mut self.origin, origin, origin.label());
                    }
                });
            if self.origin != before {
                self.config.data.default_origin = self.origin;
                self.config.dirty = true;
            }
            if ui.button("Export").clicked() {
                self.export();
            }
            ui.separator();
            if ui.button("Reset view").clicked() {
                self.controller.reset_view();
            }
            ui.label(format!("Zoom: {:.0}%", self.controller.view().scale() * 100.0));
        });
    }

    fn positions_table(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let selected = self.controller.selected();
        let mut clicked = None;
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::remainder())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("#");
                });
                header.col(|ui| {
                    ui.strong("Shape");
                });
                header.col(|ui| {
                    ui.strong("Box");
                });
                header.col(|ui| {
                    ui.strong("Overlay");
                });
            })
            .body(|mut body| {
                for (i, position) in self.controller.positions().iter().enumerate() {
                    body.row(28.0, |mut row| {
                        row.col(|ui| {
                            if ui
                                .selectable_label(selected == Some(position.id), format!("{}", i + 1))
                                .clicked()
                            {
                                clicked = Some(position.id);
                            }
                        });
                        row.col(|ui| {
                            ui.label(position.shape().label());
                        });
                        row.col(|ui| {
                            let b = position.bounds;
                            ui.label(format!(
                                "{:.0}, {:.0}  {:.0}×{:.0}",
                                b.x, b.y, b.width, b.height
                            ));
                        });
                        row.col(|ui| {
                            overlay_cell(ui, ctx, &mut self.overlays, self.controller.positions(), position)
                        });
                    });
                }
            });
        if let Some(id) = clicked {
            self.controller.select(Some(id));
        }
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let hint = match self.controller.state() {
                InteractionState::Idle => "Drag to draw, click to select, middle-drag to pan, scroll to zoom",
                InteractionState::Drawing { .. } => "Release to place the position",
                InteractionState::Panning { .. } => "Panning",
                InteractionState::Linking { .. } => {
                    "Click the position that should show the file name (Esc to cancel)"
                }
            };
            ui.label(hint);
            if let Some(image) = &self.image {
                ui.separator();
                let kind = match image.kind {
                    SourceKind::Raster => "image",
                    SourceKind::Pdf => "PDF page",
                };
                ui.label(format!(
                    "{} ({kind}, {:.0}×{:.0})",
                    image.file_name, image.dimensions.width, image.dimensions.height
                ));
                if let Some(p) = self.hover_image_pos {
                    let p = self.origin.to_origin(p, image.dimensions);
                    ui.separator();
                    ui.label(format!("x {:.0}  y {:.0}", p.x, p.y));
                }
            }
        });
    }

    fn dialogs(&mut self, ctx: &egui::Context) {
        if self.awaiting_format.is_some() {
            let mut choice = None;
            let mut cancelled = false;
            egui::Window::new("Convert PDF")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label("Only the first page is used. Choose the raster format:");
                    ui.horizontal(|ui| {
                        for format in [RasterFormat::Png, RasterFormat::Jpeg] {
                            ui.selectable_value(&mut self.pdf_format, format, format.label());
                        }
                    });
                    ui.horizontal(|ui| {
                        if ui.button("Convert").clicked() {
                            choice = Some(self.pdf_format);
                        }
                        if ui.button("Cancel").clicked() {
                            cancelled = true;
                        }
                    });
                });
            if let Some(format) = choice {
                if let Some(upload) = self.awaiting_format.take() {
                    self.config.data.pdf_format = format;
                    self.config.dirty = true;
                    self.start_job(ctx, upload);
                }
            } else if cancelled {
                self.awaiting_format = None;
            }
        }

        let mut dismiss = false;
        if let Some(notice) = &self.notice {
            let (title, text) = match notice {
                Notice::Failure(text) => ("Something went wrong", text),
                Notice::Info(text) => ("Notice", text),
            };
            egui::Window::new(title)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(text.as_str());
                    if ui.button("OK").clicked() {
                        dismiss = true;
                    }
                });
        }
        if dismiss {
            self.notice = None;
        }

        let mut open = self.export_output.is_some();
        if let Some(json) = &self.export_output {
            egui::Window::new(format!("Export ({})", self.origin.label()))
                .open(&mut open)
                .default_size([420.0, 480.0])
                .show(ctx, |ui| {
                    if ui.button("Copy to clipboard").clicked() {
                        ctx.copy_text(json.clone());
                    }
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut json.as_str())
                                .code_editor()
                                .desired_width(f32::INFINITY),
                        );
                    });
                });
        }
        if !open {
            self.export_output = None;
        }
    }
}

/// Thumbnails come from the canvas texture cache, so they are released
/// together with the overlay.
fn overlay_cell(
    ui: &mut egui::Ui,
    ctx: &egui::Context,
    textures: &mut OverlayTextures,
    positions: &PositionSet,
    position: &Position,
) {
    let Some(overlay) = &position.overlay else {
        ui.weak("-");
        return;
    };
    ui.horizontal(|ui| {
        match textures.texture_for(ctx, position) {
            Some(texture) => {
                ui.add(egui::Image::from_texture(texture).max_height(24.0));
            }
            None => {
                ui.weak("?");
            }
        }
        ui.label(overlay.file_name.as_str());
        if position.show_file_name() {
            let target = positions
                .link_target(position.id)
                .and_then(|target| positions.iter().position(|p| p.id == target));
            match target {
                Some(index) => ui.weak(format!("name on #{}", index + 1)),
                None => ui.weak("link target deleted"),
            };
        }
    });
}

// ── Input translation ───────────────────────────────────────────────────────

/// What the canvas looked like when this frame's events arrived.
struct CanvasInput {
    rect: egui::Rect,
    hovered: bool,
    keyboard_free: bool,
    pan_modifier: PanModifier,
}

impl CanvasInput {
    fn local(&self, pos: egui::Pos2) -> Point {
        let rel = pos - self.rect.min;
        Point::new(rel.x as f64, rel.y as f64)
    }
}

#[derive(Debug, PartialEq)]
enum CanvasInputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
}

/// Maps one raw egui event onto controller input.
///
/// `pointer_inside` tracks whether the last move was over the canvas, so
/// the first move outside turns into a single `Leave`.
fn translate_event(
    event: &egui::Event,
    input: &CanvasInput,
    pointer_inside: &mut bool,
) -> Option<CanvasInputEvent> {
    let pointer = match *event {
        egui::Event::PointerMoved(pos) => {
            if input.rect.contains(pos) {
                *pointer_inside = true;
                PointerEvent::Move {
                    pos: input.local(pos),
                }
            } else if std::mem::take(pointer_inside) {
                PointerEvent::Leave
            } else {
                return None;
            }
        }
        egui::Event::PointerGone => {
            *pointer_inside = false;
            PointerEvent::Leave
        }
        egui::Event::PointerButton {
            pos,
            button,
            pressed,
            modifiers,
        } => {
            let button = match button {
                egui::PointerButton::Primary => PointerButton::Primary,
                egui::PointerButton::Middle => PointerButton::Middle,
                _ => PointerButton::Secondary,
            };
            if !pressed {
                PointerEvent::Up {
                    pos: input.local(pos),
                    button,
                }
            } else if input.rect.contains(pos) && input.hovered {
                PointerEvent::Down {
                    pos: input.local(pos),
                    button,
                    pan_modifier: input.pan_modifier.is_held(&modifiers),
                }
            } else {
                return None;
            }
        }
        // egui reports wheel-up as positive, the controller expects it negative
        egui::Event::MouseWheel { delta, .. } if *pointer_inside => PointerEvent::Wheel {
            delta_y: -(delta.y as f64),
        },
        egui::Event::Key {
            key, pressed: true, ..
        } if input.keyboard_free => {
            let key = match key {
                egui::Key::Delete => KeyEvent::Delete,
                egui::Key::Backspace => KeyEvent::Backspace,
                egui::Key::Escape => KeyEvent::Escape,
                _ => return None,
            };
            return Some(CanvasInputEvent::Key(key));
        }
        _ => return None,
    };
    Some(CanvasInputEvent::Pointer(pointer))
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for PositionAnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_job(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ctx, ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.status_bar(ui);
        });

        egui::SidePanel::right("positions")
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.heading(format!("Positions ({})", self.controller.positions().len()));
                if self.controller.positions().is_empty() {
                    ui.weak("Drag on the image to add one.");
                } else {
                    self.positions_table(ctx, ui);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            let Some(dimensions) = self.image.as_ref().map(|image| image.dimensions) else {
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Open an image or PDF to start",
                    egui::FontId::proportional(18.0),
                    egui::Color32::from_gray(160),
                );
                return;
            };

            // only a mounted surface receives pointer and keyboard input
            self.handle_canvas_input(ctx, &response);

            let painter = painter.with_clip_rect(canvas_rect);
            if let Some(image) = &self.image {
                render::paint_image(
                    &painter,
                    canvas_rect.min,
                    self.controller.view(),
                    dimensions,
                    &image.texture,
                );
            }
            self.overlays.retain_live(&self.controller);
            render::paint_positions(ctx, &painter, canvas_rect.min, &self.controller, &mut self.overlays);
            render::paint_draft(&painter, canvas_rect.min, &self.controller);
        });

        self.dialogs(ctx);
        self.config.save_if_dirty();
    }
}
