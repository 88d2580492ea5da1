//! Pointer and keyboard handling for placed overlays.
//!
//! A single dispatch path serves every overlay: each pointer-down is resolved
//! to an [`OverlayId`] through the model's hit test, and drawn elements are
//! tracked per id. Per overlay the controller moves through
//!
//! ```text
//! Idle --down(hit)--> Dragging --move--> Dragging --up--> Selected
//! Selected --down(hit)--> Dragging
//! Selected --down(other hit / empty canvas)--> Idle
//! ```
//!
//! Selection and drag start are one pointer-down transition. While dragging
//! only the drawn elements move; the document position is resolved once, on
//! release. At most one overlay drags at a time: a pointer-down that arrives
//! while a drag is still open (a lost release) commits that drag first.

use std::collections::HashMap;

use image::RgbaImage;

use crate::config::EditorConfig;
use crate::geometry::{Point, Rect, Size};
use crate::mapper::PageView;
use crate::model::{AnnotationModel, ScaleOutcome};
use crate::notice::OperationLog;
use crate::overlay::{DragState, Overlay, OverlayId, OverlayKind};
use crate::surface::{Confirm, ElementId, Surface};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}

/// Keyboard commands understood by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ScaleUp,
    ScaleDown,
    ResetScale,
    Delete,
    Other,
}

impl Key {
    /// Parse a toolkit key symbol or typed character.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "+" | "=" | "plus" | "equal" | "KP_Add" => Self::ScaleUp,
            "-" | "minus" | "KP_Subtract" => Self::ScaleDown,
            "0" | "KP_0" => Self::ResetScale,
            "Delete" | "KP_Delete" | "BackSpace" => Self::Delete,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Idle,
    Selected,
    Dragging,
}

/// Surface elements drawn for one overlay.
#[derive(Debug, Clone, Copy)]
struct Drawn {
    image: ElementId,
    highlight: Option<ElementId>,
}

pub struct InteractionController<S: Surface> {
    model: AnnotationModel,
    view: PageView,
    surface: S,
    drawn: HashMap<OverlayId, Drawn>,
    /// The overlay whose drag is open, if any.
    active: Option<OverlayId>,
    config: EditorConfig,
    log: OperationLog,
}

impl<S: Surface> InteractionController<S> {
    pub fn new(model: AnnotationModel, surface: S, view: PageView, config: EditorConfig, log: OperationLog) -> Self {
        Self {
            model,
            view,
            surface,
            drawn: HashMap::new(),
            active: None,
            config,
            log,
        }
    }

    pub const fn model(&self) -> &AnnotationModel {
        &self.model
    }

    pub const fn view(&self) -> &PageView {
        &self.view
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub const fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub const fn log(&self) -> &OperationLog {
        &self.log
    }

    pub const fn log_mut(&mut self) -> &mut OperationLog {
        &mut self.log
    }

    /// Model and log borrowed together, for steps that read one and report to the other.
    pub const fn model_and_log(&mut self) -> (&AnnotationModel, &mut OperationLog) {
        (&self.model, &mut self.log)
    }

    pub fn into_parts(self) -> (AnnotationModel, S, OperationLog) {
        (self.model, self.surface, self.log)
    }

    /// Switch to another page view. Selection does not carry over.
    pub fn set_view(&mut self, view: PageView) {
        if view.page_index != self.view.page_index {
            self.cancel_drag();
            self.model.select(None);
        }
        self.view = view;
    }

    pub fn state(&self, id: OverlayId) -> OverlayState {
        match self.model.get(id) {
            Some(overlay) if overlay.is_dragging() => OverlayState::Dragging,
            Some(_) if self.model.is_selected(id) => OverlayState::Selected,
            _ => OverlayState::Idle,
        }
    }

    /// Surface element showing an overlay's image, if it is drawn.
    pub fn image_element(&self, id: OverlayId) -> Option<ElementId> {
        self.drawn.get(&id).map(|d| d.image)
    }

    /// Surface element of an overlay's selection highlight, if shown.
    pub fn highlight_element(&self, id: OverlayId) -> Option<ElementId> {
        self.drawn.get(&id).and_then(|d| d.highlight)
    }

    // =========================================================================
    // Overlay lifecycle
    // =========================================================================

    /// Add an overlay to the current page, select it and draw it.
    pub fn add(&mut self, image: RgbaImage, kind: OverlayKind) -> OverlayId {
        let id = self.model.add(image, kind, self.view.page_index, self.view.page_size);
        self.redraw();
        self.log.success(format!(
            "Added {kind} overlay #{id} on page {} and selected it",
            self.view.page_index + 1
        ));
        id
    }

    /// Remove every overlay after confirmation.
    pub fn clear_all(&mut self, confirm: &mut dyn Confirm) -> usize {
        if self.model.is_empty() {
            self.log.info("There are no overlays to clear");
            return 0;
        }
        if !confirm.confirm("Remove all overlays?") {
            self.log.info("Clearing overlays cancelled");
            return 0;
        }

        for drawn in std::mem::take(&mut self.drawn).into_values() {
            self.erase(drawn);
        }
        self.active = None;
        let count = self.model.clear();
        self.log.success(format!("Removed {count} overlays"));
        count
    }

    /// Erase and redraw the overlays of the current page, in paint order.
    pub fn redraw(&mut self) {
        for drawn in std::mem::take(&mut self.drawn).into_values() {
            self.erase(drawn);
        }

        let page = self.view.page_index;
        let ids: Vec<OverlayId> = self.model.on_page(page).map(|o| o.id).collect();
        for id in ids {
            self.draw(id, None);
        }
    }

    /// Draw one overlay, at `position` or at its committed position.
    fn draw(&mut self, id: OverlayId, position: Option<Point>) {
        let Some(overlay) = self.model.get(id) else {
            return;
        };
        let position = position.unwrap_or_else(|| self.view.display_rect(overlay).min);
        let image = overlay.rasterize_at(self.display_zoom());
        let element = self.surface.draw_image(position, &image);

        self.drawn.insert(id, Drawn { image: element, highlight: None });
        if self.model.is_selected(id) {
            self.show_highlight(id);
        }
    }

    fn erase(&mut self, drawn: Drawn) {
        self.surface.delete_element(drawn.image);
        if let Some(highlight) = drawn.highlight {
            self.surface.delete_element(highlight);
        }
    }

    /// Zoom applied to drawn overlays; identity when the page origin is unknown.
    fn display_zoom(&self) -> f32 {
        if self.view.origin.is_some() { self.view.zoom } else { 1.0 }
    }

    /// Current display top-left of a drawn overlay.
    fn display_position(&self, overlay: &Overlay) -> Point {
        if let Some(drag) = overlay.drag {
            return drag.display_position;
        }
        self.drawn
            .get(&overlay.id)
            .and_then(|d| self.surface.bounding_box(d.image))
            .map_or_else(|| self.view.display_rect(overlay).min, |rect| rect.min)
    }

    fn show_highlight(&mut self, id: OverlayId) {
        let Some(overlay) = self.model.get(id) else {
            return;
        };
        let Some(drawn) = self.drawn.get(&id).copied() else {
            return;
        };
        if let Some(old) = drawn.highlight {
            self.surface.delete_element(old);
        }

        let top_left = self.display_position(overlay);
        let size = overlay.scaled_size().scaled(self.display_zoom());
        let rect = Rect::from_origin_size(top_left, size).inflate(self.config.highlight_inset);
        let highlight = self.surface.draw_dashed_rect(rect);
        self.drawn.insert(id, Drawn { image: drawn.image, highlight: Some(highlight) });
    }

    fn hide_highlight(&mut self, id: OverlayId) {
        if let Some(drawn) = self.drawn.get_mut(&id)
            && let Some(highlight) = drawn.highlight.take()
        {
            self.surface.delete_element(highlight);
        }
    }

    /// Move the selection, keeping highlights in sync.
    fn change_selection(&mut self, id: Option<OverlayId>) {
        let previous = self.model.selected();
        if previous == id {
            return;
        }
        if let Some(previous) = previous {
            self.hide_highlight(previous);
        }
        self.model.select(id);
        if let Some(id) = id {
            self.show_highlight(id);
        }
    }

    // =========================================================================
    // Pointer events
    // =========================================================================

    pub fn pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(point) => self.pointer_down(point),
            PointerEvent::Move(point) => self.pointer_move(point),
            PointerEvent::Up(point) => self.pointer_up(point),
        }
    }

    pub fn pointer_down(&mut self, point: Point) {
        match self.model.hit_test(&self.view, point) {
            Some(id) => {
                if let Some(open) = self.active {
                    tracing::debug!("Pointer-down while overlay #{} drags, committing it", open);
                    self.finish_drag(open);
                }
                self.change_selection(Some(id));

                let Some(overlay) = self.model.get(id) else {
                    return;
                };
                let display_position = self.display_position(overlay);
                if let Some(overlay) = self.model.get_mut(id) {
                    overlay.drag = Some(DragState {
                        anchor: point,
                        display_position,
                    });
                    self.active = Some(id);
                }
                self.log.info(format!("Selected overlay #{id}"));
            }
            None if self.active.is_none() => {
                if self.model.selected().is_some() {
                    self.change_selection(None);
                    self.log.info("Clicked empty area, selection cleared");
                }
            }
            None => {}
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        let Some(id) = self.dragging() else {
            return;
        };
        self.drag_to(id, point);
    }

    pub fn pointer_up(&mut self, point: Point) {
        let Some(id) = self.dragging() else {
            return;
        };
        self.drag_to(id, point);
        self.finish_drag(id);
    }

    /// Close the open drag of `id` and resolve its drawn position into document space.
    fn finish_drag(&mut self, id: OverlayId) {
        if self.active == Some(id) {
            self.active = None;
        }
        let Some(drag) = self.model.get_mut(id).and_then(|o| o.drag.take()) else {
            return;
        };
        let top_left = self
            .drawn
            .get(&id)
            .and_then(|d| self.surface.bounding_box(d.image))
            .map_or(drag.display_position, |rect| rect.min);

        let mapping = self.view.to_document(top_left);
        if let Some(overlay) = self.model.get_mut(id) {
            overlay.document_position = mapping.point;
        }

        if mapping.degraded {
            self.log.warning(format!(
                "Page position unknown, overlay #{id} stored at display coordinates {}",
                mapping.point
            ));
        } else {
            tracing::debug!("Overlay #{} committed at display {} -> document {}", id, top_left, mapping.point);
            self.log.info(format!("Moved overlay #{id} to {}", mapping.point));
        }
    }

    const fn dragging(&self) -> Option<OverlayId> {
        self.active
    }

    /// Drop the open drag without committing it; the overlay keeps its document position.
    fn cancel_drag(&mut self) {
        if let Some(id) = self.active.take()
            && let Some(overlay) = self.model.get_mut(id)
        {
            overlay.drag = None;
        }
    }

    /// Apply the delta since the previous pointer position to the drawn elements.
    fn drag_to(&mut self, id: OverlayId, point: Point) {
        let Some(overlay) = self.model.get_mut(id) else {
            return;
        };
        let Some(drag) = overlay.drag.as_mut() else {
            return;
        };

        let delta = point - drag.anchor;
        drag.anchor = point;
        drag.display_position = drag.display_position + delta;
        if delta == Point::ORIGIN {
            return;
        }

        if let Some(drawn) = self.drawn.get(&id) {
            self.surface.move_element(drawn.image, delta.x, delta.y);
            if let Some(highlight) = drawn.highlight {
                self.surface.move_element(highlight, delta.x, delta.y);
            }
        }
    }

    // =========================================================================
    // Keyboard commands
    // =========================================================================

    pub fn key_press(&mut self, key: Key, confirm: &mut dyn Confirm) {
        match key {
            Key::ScaleUp => self.scale_selected(self.config.zoom_in_step),
            Key::ScaleDown => self.scale_selected(self.config.zoom_out_step),
            Key::ResetScale => self.reset_selected(),
            Key::Delete => {
                self.delete_selected(confirm);
            }
            Key::Other => {}
        }
    }

    fn require_selection(&mut self) -> Option<OverlayId> {
        let selected = self.model.selected();
        if selected.is_none() {
            self.log.warning("Select an overlay first");
        }
        selected
    }

    pub fn scale_selected(&mut self, multiplier: f32) {
        let Some(id) = self.require_selection() else {
            return;
        };
        match self.model.scale(id, multiplier) {
            Ok(ScaleOutcome::Applied(scale)) => {
                self.refresh(id);
                self.log.info(format!("Overlay #{id} scaled to {scale:.1}x"));
            }
            Ok(ScaleOutcome::Rejected { requested }) => {
                self.log.warning(format!(
                    "Scale {requested:.2}x is outside {:.1}x..{:.1}x",
                    self.config.min_scale, self.config.max_scale
                ));
            }
            Err(e) => self.log.error(e.to_string()),
        }
    }

    pub fn reset_selected(&mut self) {
        let Some(id) = self.require_selection() else {
            return;
        };
        match self.model.reset_scale(id) {
            Ok(()) => {
                self.refresh(id);
                self.log.info(format!("Overlay #{id} size reset"));
            }
            Err(e) => self.log.error(e.to_string()),
        }
    }

    /// Delete the selected overlay after confirmation. Returns the removed overlay.
    pub fn delete_selected(&mut self, confirm: &mut dyn Confirm) -> Option<Overlay> {
        let id = self.require_selection()?;
        if !confirm.confirm("Delete the selected overlay?") {
            self.log.info("Delete cancelled");
            return None;
        }

        if let Some(drawn) = self.drawn.remove(&id) {
            self.erase(drawn);
        }
        if self.active == Some(id) {
            self.active = None;
        }
        let removed = self.model.remove(id);
        if removed.is_some() {
            self.log.info(format!("Deleted overlay #{id}"));
        }
        removed
    }

    /// Redraw one overlay at its current display position after a scale change.
    fn refresh(&mut self, id: OverlayId) {
        let Some(overlay) = self.model.get(id) else {
            return;
        };
        if overlay.page_index() != self.view.page_index {
            return;
        }
        let position = self.display_position(overlay);
        if let Some(drawn) = self.drawn.remove(&id) {
            self.erase(drawn);
        }
        self.draw(id, Some(position));
    }

    /// One-line summary for a status bar.
    pub fn status_line(&self) -> String {
        if let Some(overlay) = self.model.selected_overlay() {
            return format!(
                "Selected overlay #{} | scale {:.1}x | {}",
                overlay.id,
                overlay.scale_factor(),
                overlay.kind
            );
        }
        match self.model.on_page(self.view.page_index).count() {
            0 => String::new(),
            count => format!("{count} overlays on this page - click one to select it"),
        }
    }

    /// Page size of the current view, in points.
    pub const fn page_size(&self) -> Size {
        self.view.page_size
    }
}
