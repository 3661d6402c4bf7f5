//! Interaction state machine of the annotation surface.
//!
//! [`AnnotationController`] is the single owner of the committed positions,
//! the selection, the view transform and the live gesture. The egui shell
//! translates raw input into [`PointerEvent`]s and [`KeyEvent`]s and feeds
//! them in order; every handler runs to completion before the next one.

use std::sync::Arc;
use tracing::{debug, info};

use crate::geometry::{BoundingBox, Point, Shape};
use crate::position::{Position, PositionId, PositionSet};
use crate::transform::ViewTransform;

/// Drafts at or below this size on either axis are treated as stray clicks.
pub const MIN_DRAW_SIZE: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Pointer input in canvas-local screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down {
        pos: Point,
        button: PointerButton,
        pan_modifier: bool,
    },
    Move {
        pos: Point,
    },
    Up {
        pos: Point,
        button: PointerButton,
    },
    Leave,
    Wheel {
        delta_y: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Delete,
    Backspace,
    Escape,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    Drawing { start: Point, draft: BoundingBox },
    Panning { anchor: Point, pan_at_anchor: Point },
    Linking { source: PositionId },
}

/// What a handled input did, for logging and UI feedback.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
    Selected(PositionId),
    DrawStarted,
    Committed(PositionId),
    Discarded,
    PanStarted,
    PanEnded,
    Zoomed(f64),
    LinkStarted(PositionId),
    Linked {
        source: PositionId,
        target: PositionId,
    },
    LinkCancelled,
    Deleted(PositionId),
}

#[derive(Debug)]
pub struct AnnotationController {
    positions: PositionSet,
    view: ViewTransform,
    state: InteractionState,
    selected: Option<PositionId>,
    shape: Shape,
    /// Last pointer position over the canvas, the zoom anchor.
    hover: Option<Point>,
}

impl Default for AnnotationController {
    fn default() -> Self {
        Self::new(Shape::default())
    }
}

impl AnnotationController {
    pub fn new(shape: Shape) -> Self {
        Self {
            positions: PositionSet::default(),
            view: ViewTransform::default(),
            state: InteractionState::Idle,
            selected: None,
            shape,
            hover: None,
        }
    }

    /// Drops everything tied to the previous image.
    pub fn reset_for_new_image(&mut self) {
        self.positions.clear();
        self.view.reset();
        self.state = InteractionState::Idle;
        self.selected = None;
        self.hover = None;
    }

    pub fn positions(&self) -> &PositionSet {
        &self.positions
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Shape used for the next committed draw; existing positions keep theirs.
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    pub fn selected(&self) -> Option<PositionId> {
        self.selected
    }

    pub fn select(&mut self, id: Option<PositionId>) {
        self.selected = id.filter(|id| self.positions.contains_id(*id));
    }

    /// In-progress draw, tagged with the shape it would be committed as.
    pub fn draft(&self) -> Option<(BoundingBox, Shape)> {
        match &self.state {
            InteractionState::Drawing { draft, .. } => Some((*draft, self.shape)),
            _ => None,
        }
    }

    pub fn link_source(&self) -> Option<PositionId> {
        match &self.state {
            InteractionState::Linking { source } => Some(*source),
            _ => None,
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<CanvasEvent> {
        match event {
            PointerEvent::Down {
                pos,
                button,
                pan_modifier,
            } => self.pointer_down(pos, button, pan_modifier),
            PointerEvent::Move { pos } => {
                self.hover = Some(pos);
                self.pointer_move(pos);
                None
            }
            PointerEvent::Up { pos, button } => self.pointer_up(Some((pos, button))),
            PointerEvent::Leave => {
                self.hover = None;
                self.pointer_up(None)
            }
            PointerEvent::Wheel { delta_y } => {
                if delta_y == 0.0 {
                    return None;
                }
                match self.hover {
                    Some(anchor) => self.view.zoom_step_at(delta_y, anchor),
                    None => self.view.zoom_step(delta_y),
                }
                Some(CanvasEvent::Zoomed(self.view.scale()))
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<CanvasEvent> {
        match key {
            KeyEvent::Delete | KeyEvent::Backspace => {
                let id = self.selected?;
                self.delete_position(id)
            }
            KeyEvent::Escape => match std::mem::replace(&mut self.state, InteractionState::Idle) {
                InteractionState::Linking { source } => {
                    debug!(%source, "link cancelled");
                    Some(CanvasEvent::LinkCancelled)
                }
                InteractionState::Drawing { .. } => Some(CanvasEvent::Discarded),
                InteractionState::Panning { .. } => Some(CanvasEvent::PanEnded),
                InteractionState::Idle => None,
            },
        }
    }

    /// Removes a position; any live gesture is dropped with it.
    pub fn delete_position(&mut self, id: PositionId) -> Option<CanvasEvent> {
        let removed = self.positions.remove(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.state = InteractionState::Idle;
        info!(id = %removed.id, shape = ?removed.shape(), "position deleted");
        Some(CanvasEvent::Deleted(removed.id))
    }

    fn pointer_down(
        &mut self,
        pos: Point,
        button: PointerButton,
        pan_modifier: bool,
    ) -> Option<CanvasEvent> {
        let image_pos = self.view.screen_to_image(pos);
        match (&self.state, button) {
            (InteractionState::Idle, PointerButton::Middle)
            | (InteractionState::Idle, PointerButton::Primary)
                if button == PointerButton::Middle || pan_modifier =>
            {
                self.state = InteractionState::Panning {
                    anchor: pos,
                    pan_at_anchor: self.view.pan(),
                };
                Some(CanvasEvent::PanStarted)
            }
            (InteractionState::Idle, PointerButton::Primary) => {
                if let Some(hit) = self.positions.hit_test(image_pos) {
                    self.selected = Some(hit);
                    return Some(CanvasEvent::Selected(hit));
                }
                self.selected = None;
                self.state = InteractionState::Drawing {
                    start: image_pos,
                    draft: BoundingBox::from_corners(image_pos, image_pos),
                };
                Some(CanvasEvent::DrawStarted)
            }
            (InteractionState::Linking { source }, PointerButton::Primary) => {
                let source = *source;
                let target = self.positions.hit_test_except(image_pos, source)?;
                if !self.positions.link_file_name(source, target) {
                    return None;
                }
                self.state = InteractionState::Idle;
                info!(%source, %target, "file name linked");
                Some(CanvasEvent::Linked { source, target })
            }
            _ => None,
        }
    }

    fn pointer_move(&mut self, pos: Point) {
        match &mut self.state {
            InteractionState::Drawing { start, draft } => {
                *draft = BoundingBox::from_corners(*start, self.view.screen_to_image(pos));
            }
            InteractionState::Panning {
                anchor,
                pan_at_anchor,
            } => {
                let pan = *pan_at_anchor + (pos - *anchor);
                self.view.set_pan(pan);
            }
            InteractionState::Idle | InteractionState::Linking { .. } => {}
        }
    }

    /// Button release, or the pointer leaving the canvas when `release` is `None`.
    fn pointer_up(&mut self, release: Option<(Point, PointerButton)>) -> Option<CanvasEvent> {
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Drawing { start, draft } => match release {
                Some((pos, PointerButton::Primary)) => {
                    let bounds = BoundingBox::from_corners(start, self.view.screen_to_image(pos));
                    Some(self.finish_draw(bounds))
                }
                Some(_) => {
                    self.state = InteractionState::Drawing { start, draft };
                    None
                }
                None => Some(self.finish_draw(draft)),
            },
            InteractionState::Panning { .. } => Some(CanvasEvent::PanEnded),
            // linking waits for a click on a target; a release or leave keeps it
            state @ InteractionState::Linking { .. } => {
                self.state = state;
                None
            }
            InteractionState::Idle => None,
        }
    }

    fn finish_draw(&mut self, bounds: BoundingBox) -> CanvasEvent {
        if bounds.width <= MIN_DRAW_SIZE || bounds.height <= MIN_DRAW_SIZE {
            debug!(width = bounds.width, height = bounds.height, "draft discarded");
            return CanvasEvent::Discarded;
        }
        let id = self.positions.push(Position::new(bounds, self.shape));
        info!(
            %id,
            shape = ?self.shape,
            x = bounds.x.round(),
            y = bounds.y.round(),
            width = bounds.width.round(),
            height = bounds.height.round(),
            "position committed"
        );
        CanvasEvent::Committed(id)
    }

    pub fn set_overlay(&mut self, id: PositionId, bytes: Arc<[u8]>, file_name: String) -> bool {
        self.positions.set_overlay(id, bytes, file_name)
    }

    pub fn clear_overlay(&mut self, id: PositionId) -> bool {
        if self.link_source() == Some(id) {
            self.state = InteractionState::Idle;
        }
        self.positions.clear_overlay(id)
    }

    /// Enters link-target selection for `id` if it carries an overlay.
    pub fn request_link_filename(&mut self, id: PositionId) -> Option<CanvasEvent> {
        if !matches!(self.state, InteractionState::Idle) {
            return None;
        }
        let has_overlay = self.positions.get(id)?.overlay.is_some();
        if !has_overlay {
            return None;
        }
        self.state = InteractionState::Linking { source: id };
        debug!(%id, "waiting for link target");
        Some(CanvasEvent::LinkStarted(id))
    }

    pub fn unlink_filename(&mut self, id: PositionId) -> bool {
        self.positions.unlink_file_name(id)
    }

    pub fn set_overlay_on_selected(&mut self, bytes: Arc<[u8]>, file_name: String) -> bool {
        match self.selected {
            Some(id) => self.set_overlay(id, bytes, file_name),
            None => false,
        }
    }

    pub fn clear_overlay_on_selected(&mut self) -> bool {
        match self.selected {
            Some(id) => self.clear_overlay(id),
            None => false,
        }
    }

    pub fn request_link_filename_for_selected(&mut self) -> Option<CanvasEvent> {
        let id = self.selected?;
        self.request_link_filename(id)
    }

    pub fn unlink_selected(&mut self) -> bool {
        match self.selected {
            Some(id) => self.unlink_filename(id),
            None => false,
        }
    }

    pub fn resolve_display_file_name(&self, id: PositionId) -> Option<&str> {
        self.positions.resolve_display_file_name(id)
    }
}
