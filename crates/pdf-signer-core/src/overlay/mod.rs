//! Overlay records placed on PDF pages.

mod prepare;

pub use prepare::{prepare_base_image, test_pattern};

use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};

/// Stable overlay identifier, unique within a session and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(pub u32);

impl std::fmt::Display for OverlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Handwritten,
    Uploaded,
    Text,
    Test,
}

impl OverlayKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handwritten => "handwritten",
            Self::Uploaded => "uploaded",
            Self::Text => "text",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient state of a drag in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// Pointer position of the previous event (display space)
    pub anchor: Point,
    /// Current top-left of the drawn image (display space)
    pub display_position: Point,
}

/// A signature, text or image placed on a page.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: OverlayId,
    page_index: usize,
    pub kind: OverlayKind,
    base_image: RgbaImage,
    /// Top-left anchor in PDF points, origin at the page's top-left
    pub document_position: Point,
    scale_factor: f32,
    pub drag: Option<DragState>,
}

impl Overlay {
    pub fn new(id: OverlayId, page_index: usize, kind: OverlayKind, base_image: RgbaImage, document_position: Point) -> Self {
        Self {
            id,
            page_index,
            kind,
            base_image,
            document_position,
            scale_factor: 1.0,
            drag: None,
        }
    }

    pub const fn page_index(&self) -> usize {
        self.page_index
    }

    pub const fn base_image(&self) -> &RgbaImage {
        &self.base_image
    }

    pub const fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Bounds are enforced by the annotation model.
    pub(crate) const fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
    }

    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Pixel dimensions after applying the scale factor.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn scaled_dimensions(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.scale_factor) as u32).max(1);
        (scale(self.base_image.width()), scale(self.base_image.height()))
    }

    /// Size after scaling, in document points.
    pub fn scaled_size(&self) -> Size {
        let (width, height) = self.scaled_dimensions();
        Size::from_pixels(width, height)
    }

    /// Rectangle occupied in document space.
    pub fn document_rect(&self) -> Rect {
        Rect::from_origin_size(self.document_position, self.scaled_size())
    }

    /// Re-sample the base image at the current scale.
    ///
    /// Always starts from the unscaled base image so repeated zoom steps do
    /// not accumulate resampling loss.
    pub fn rasterize(&self) -> RgbaImage {
        self.rasterize_at(1.0)
    }

    /// Re-sample at the current scale multiplied by an extra display zoom.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn rasterize_at(&self, zoom: f32) -> RgbaImage {
        let (width, height) = self.scaled_dimensions();
        let (width, height) = if (zoom - 1.0).abs() < f32::EPSILON {
            (width, height)
        } else {
            (
                ((width as f32 * zoom) as u32).max(1),
                ((height as f32 * zoom) as u32).max(1),
            )
        };

        if width == self.base_image.width() && height == self.base_image.height() {
            return self.base_image.clone();
        }
        imageops::resize(&self.base_image, width, height, FilterType::Lanczos3)
    }
}
