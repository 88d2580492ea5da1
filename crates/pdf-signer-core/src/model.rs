//! The set of overlays placed in a signing session.
//!
//! The model owns the single selection. Collection order is paint order:
//! later overlays are drawn on top and win hit tests.

use image::RgbaImage;

use crate::config::{EditorConfig, PlacementConfig};
use crate::error::{Error, Result};
use crate::geometry::{Point, Size};
use crate::mapper::PageView;
use crate::overlay::{Overlay, OverlayId, OverlayKind};

/// Outcome of a scale request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleOutcome {
    Applied(f32),
    /// The request would leave the allowed range; nothing changed.
    Rejected { requested: f32 },
}

#[derive(Debug)]
pub struct AnnotationModel {
    overlays: Vec<Overlay>,
    selected: Option<OverlayId>,
    next_id: u32,
    placement: PlacementConfig,
    min_scale: f32,
    max_scale: f32,
}

impl Default for AnnotationModel {
    fn default() -> Self {
        Self::new(PlacementConfig::default(), &EditorConfig::default())
    }
}

impl AnnotationModel {
    pub fn new(placement: PlacementConfig, editor: &EditorConfig) -> Self {
        Self {
            overlays: Vec::new(),
            selected: None,
            next_id: 1,
            placement,
            min_scale: editor.min_scale,
            max_scale: editor.max_scale,
        }
    }

    /// Add an overlay to `page_index` at the default position and select it.
    ///
    /// The default position centers the image horizontally at 70% of the page
    /// height, kept at least `min_margin` points from the top-left corner.
    #[allow(clippy::cast_precision_loss)]
    pub fn add(&mut self, image: RgbaImage, kind: OverlayKind, page_index: usize, page_size: Size) -> OverlayId {
        let margin = self.placement.min_margin;
        let x = ((page_size.width - image.width() as f32) / 2.0).max(margin);
        let y = (page_size.height * self.placement.vertical_ratio).max(margin);

        let id = OverlayId(self.next_id);
        self.next_id += 1;

        tracing::debug!("Adding {} overlay #{} on page {} at ({:.1}, {:.1})", kind, id, page_index, x, y);
        self.overlays.push(Overlay::new(id, page_index, kind, image, Point::new(x, y)));
        self.selected = Some(id);
        id
    }

    /// Set or clear the selection. Returns `false` for an unknown id.
    pub fn select(&mut self, id: Option<OverlayId>) -> bool {
        match id {
            Some(id) if self.get(id).is_none() => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    pub const fn selected(&self) -> Option<OverlayId> {
        self.selected
    }

    pub fn selected_overlay(&self) -> Option<&Overlay> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn is_selected(&self, id: OverlayId) -> bool {
        self.selected == Some(id)
    }

    pub fn remove(&mut self, id: OverlayId) -> Option<Overlay> {
        let position = self.overlays.iter().position(|o| o.id == id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.overlays.remove(position))
    }

    /// Remove every overlay. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.overlays.len();
        self.overlays.clear();
        self.selected = None;
        count
    }

    /// Multiply the overlay's scale, rejecting results outside the allowed range.
    pub fn scale(&mut self, id: OverlayId, multiplier: f32) -> Result<ScaleOutcome> {
        let (min, max) = (self.min_scale, self.max_scale);
        let overlay = self.get_mut(id).ok_or(Error::UnknownOverlay(id))?;

        let requested = overlay.scale_factor() * multiplier;
        if !(min..=max).contains(&requested) {
            return Ok(ScaleOutcome::Rejected { requested });
        }
        overlay.set_scale_factor(requested);
        Ok(ScaleOutcome::Applied(requested))
    }

    pub fn reset_scale(&mut self, id: OverlayId) -> Result<()> {
        let overlay = self.get_mut(id).ok_or(Error::UnknownOverlay(id))?;
        overlay.set_scale_factor(1.0);
        Ok(())
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.overlays.iter_mut().find(|o| o.id == id)
    }

    /// All overlays in paint order.
    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    /// Overlays of one page in paint order.
    pub fn on_page(&self, page_index: usize) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter().filter(move |o| o.page_index() == page_index)
    }

    /// Topmost overlay of the viewed page whose display rectangle contains `point`.
    pub fn hit_test(&self, view: &PageView, point: Point) -> Option<OverlayId> {
        self.overlays
            .iter()
            .rev()
            .filter(|o| o.page_index() == view.page_index)
            .find(|o| view.display_rect(o).contains(point))
            .map(|o| o.id)
    }

    /// True while any overlay is being dragged.
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LETTER: Size = Size::new(612.0, 792.0);

    fn image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::new(width, height)
    }

    #[test]
    fn test_add_assigns_increasing_ids_and_selects() {
        let mut model = AnnotationModel::default();
        let a = model.add(image(50, 20), OverlayKind::Handwritten, 0, LETTER);
        let b = model.add(image(50, 20), OverlayKind::Uploaded, 0, LETTER);

        assert_eq!(a, OverlayId(1));
        assert_eq!(b, OverlayId(2));
        assert_eq!(model.selected(), Some(b));
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut model = AnnotationModel::default();
        let a = model.add(image(10, 10), OverlayKind::Test, 0, LETTER);
        model.remove(a);
        let b = model.add(image(10, 10), OverlayKind::Test, 0, LETTER);
        assert_eq!(b, OverlayId(2));
    }

    #[test]
    fn test_default_position() {
        let mut model = AnnotationModel::default();
        let id = model.add(image(50, 20), OverlayKind::Handwritten, 0, LETTER);
        let overlay = model.get(id).unwrap();
        assert!(overlay.document_position.approx_eq(Point::new(281.0, 554.4), 1e-3));
    }

    #[test]
    fn test_default_position_respects_margin() {
        let mut model = AnnotationModel::default();
        let id = model.add(image(400, 20), OverlayKind::Uploaded, 0, Size::new(300.0, 60.0));
        assert_eq!(model.get(id).unwrap().document_position, Point::new(50.0, 50.0));
    }

    #[test]
    fn test_select_unknown_is_rejected() {
        let mut model = AnnotationModel::default();
        let id = model.add(image(10, 10), OverlayKind::Test, 0, LETTER);
        assert!(!model.select(Some(OverlayId(99))));
        assert_eq!(model.selected(), Some(id));
        assert!(model.select(None));
        assert_eq!(model.selected(), None);
    }

    #[test]
    fn test_remove_selected_clears_selection() {
        let mut model = AnnotationModel::default();
        let a = model.add(image(10, 10), OverlayKind::Test, 0, LETTER);
        let b = model.add(image(10, 10), OverlayKind::Test, 0, LETTER);

        model.remove(a);
        assert_eq!(model.selected(), Some(b));
        model.remove(b);
        assert_eq!(model.selected(), None);
        assert!(model.is_empty());
    }

    #[test]
    fn test_scale_stays_within_bounds() {
        let mut model = AnnotationModel::default();
        let id = model.add(image(10, 10), OverlayKind::Test, 0, LETTER);

        for _ in 0..20 {
            model.scale(id, 1.2).unwrap();
            let scale = model.get(id).unwrap().scale_factor();
            assert!((0.1..=5.0).contains(&scale));
        }
        let before = model.get(id).unwrap().scale_factor();
        let outcome = model.scale(id, 1.2).unwrap();
        assert!(matches!(outcome, ScaleOutcome::Rejected { .. }));
        assert!((model.get(id).unwrap().scale_factor() - before).abs() < f32::EPSILON);

        for _ in 0..40 {
            model.scale(id, 0.8).unwrap();
            let scale = model.get(id).unwrap().scale_factor();
            assert!((0.1..=5.0).contains(&scale));
        }
    }

    #[test]
    fn test_scale_then_reset() {
        let mut model = AnnotationModel::default();
        let id = model.add(image(10, 10), OverlayKind::Test, 0, LETTER);
        for _ in 0..3 {
            model.scale(id, 1.2).unwrap();
        }
        assert!((model.get(id).unwrap().scale_factor() - 1.728).abs() < 1e-4);

        model.reset_scale(id).unwrap();
        assert!((model.get(id).unwrap().scale_factor() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_scale_unknown_overlay() {
        let mut model = AnnotationModel::default();
        assert!(matches!(model.scale(OverlayId(7), 1.2), Err(Error::UnknownOverlay(OverlayId(7)))));
    }

    #[test]
    fn test_hit_test_prefers_topmost_and_current_page() {
        let mut model = AnnotationModel::default();
        let below = model.add(image(50, 20), OverlayKind::Test, 0, LETTER);
        let above = model.add(image(50, 20), OverlayKind::Test, 0, LETTER);
        let other_page = model.add(image(50, 20), OverlayKind::Test, 1, LETTER);

        let view = PageView::new(0, LETTER, 1.0).with_origin(Point::new(0.0, 0.0));
        let inside = Point::new(290.0, 560.0);
        assert_eq!(model.hit_test(&view, inside), Some(above));

        model.remove(above);
        assert_eq!(model.hit_test(&view, inside), Some(below));
        assert_eq!(model.hit_test(&view, Point::new(10.0, 10.0)), None);

        let page_one = PageView::new(1, LETTER, 1.0).with_origin(Point::new(0.0, 0.0));
        assert_eq!(model.hit_test(&page_one, inside), Some(other_page));
    }

    #[test]
    fn test_hit_test_uses_zoom_and_origin() {
        let mut model = AnnotationModel::default();
        let id = model.add(image(50, 20), OverlayKind::Test, 0, LETTER);
        // Document rect (281, 554.4) .. (331, 574.4) at zoom 2 from origin (10, 10)
        let view = PageView::new(0, LETTER, 2.0).with_origin(Point::new(10.0, 10.0));
        assert_eq!(model.hit_test(&view, Point::new(575.0, 1120.0)), Some(id));
        assert_eq!(model.hit_test(&view, Point::new(300.0, 560.0)), None);
    }
}
