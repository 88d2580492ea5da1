//! Presentation-layer seam.
//!
//! The editor never talks to a UI toolkit directly. It draws through a
//! [`Surface`] and asks for confirmations through [`Confirm`]. The
//! [`RecordingSurface`] keeps drawn elements in memory and backs the CLI and
//! the tests.

use std::collections::BTreeMap;

use image::RgbaImage;

use crate::geometry::{Point, Rect, Size};

/// Handle of an element drawn on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u64);

/// Drawing surface of the presentation layer (display space).
pub trait Surface {
    /// Draw an image with its top-left corner at `position`.
    fn draw_image(&mut self, position: Point, image: &RgbaImage) -> ElementId;

    /// Draw a dashed rectangle outline.
    fn draw_dashed_rect(&mut self, rect: Rect) -> ElementId;

    fn move_element(&mut self, element: ElementId, dx: f32, dy: f32);

    fn delete_element(&mut self, element: ElementId);

    /// Current bounds of an element, if the surface can report them.
    fn bounding_box(&self, element: ElementId) -> Option<Rect>;

    /// Delete every element.
    fn clear(&mut self);
}

/// Yes/no prompt for destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Accepts every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Refuses every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Image,
    DashedRect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub rect: Rect,
}

/// In-memory surface remembering every drawn element.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    elements: BTreeMap<ElementId, Element>,
    next_id: u64,
    blind: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that never reports bounding boxes, like a toolkit queried
    /// before its first layout pass.
    pub fn blind() -> Self {
        Self {
            blind: true,
            ..Self::default()
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().map(|(id, element)| (*id, element))
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.values().filter(|e| e.kind == kind).count()
    }

    fn insert(&mut self, element: Element) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        self.elements.insert(id, element);
        id
    }
}

impl Surface for RecordingSurface {
    fn draw_image(&mut self, position: Point, image: &RgbaImage) -> ElementId {
        let size = Size::from_pixels(image.width(), image.height());
        self.insert(Element {
            kind: ElementKind::Image,
            rect: Rect::from_origin_size(position, size),
        })
    }

    fn draw_dashed_rect(&mut self, rect: Rect) -> ElementId {
        self.insert(Element {
            kind: ElementKind::DashedRect,
            rect,
        })
    }

    fn move_element(&mut self, element: ElementId, dx: f32, dy: f32) {
        if let Some(element) = self.elements.get_mut(&element) {
            element.rect = element.rect.translate(dx, dy);
        }
    }

    fn delete_element(&mut self, element: ElementId) {
        self.elements.remove(&element);
    }

    fn bounding_box(&self, element: ElementId) -> Option<Rect> {
        if self.blind {
            return None;
        }
        self.elements.get(&element).map(|e| e.rect)
    }

    fn clear(&mut self) {
        self.elements.clear();
    }
}
