//! Conversion between display space and document space.
//!
//! # Coordinate Systems
//!
//! Document space is measured in PDF points with the origin at the page's
//! **top-left** corner and Y increasing downward. It does not depend on zoom.
//!
//! Display space is measured in pixels of the rendered page as shown in the
//! viewport. The rendered page's top-left sits at `origin`, and a single
//! uniform `zoom` maps points to pixels:
//! ```text
//! display = origin + doc * zoom
//! doc     = (display - origin) / zoom
//! ```
//!
//! The flip to PDF's bottom-left origin only happens when an overlay is
//! written into the page (see `pdf::image`).

use crate::config::EditorConfig;
use crate::geometry::{Point, Rect, Size};
use crate::overlay::Overlay;

/// Result of a display → document conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    pub point: Point,
    /// The page origin was unknown and the display point was used as is.
    pub degraded: bool,
}

/// Map a document point to display space.
pub fn to_display(doc: Point, zoom: f32, origin: Point) -> Point {
    origin + doc * zoom
}

/// Map a display point to document space.
///
/// Without a page origin (page not rendered yet) the display coordinates are
/// taken as document coordinates and the mapping is flagged as degraded.
pub fn to_document(display: Point, zoom: f32, origin: Option<Point>) -> Mapping {
    match origin {
        Some(origin) => Mapping {
            point: (display - origin) / zoom,
            degraded: false,
        },
        None => Mapping {
            point: display,
            degraded: true,
        },
    }
}

/// Uniform zoom fitting `page` into `viewport` minus `margin`, clamped to `[min, max]`.
pub fn fit_zoom(page: Size, viewport: Size, margin: f32, min: f32, max: f32) -> f32 {
    if page.width <= 0.0 || page.height <= 0.0 {
        return min;
    }
    let width_ratio = (viewport.width - margin) / page.width;
    let height_ratio = (viewport.height - margin) / page.height;
    width_ratio.min(height_ratio).clamp(min, max)
}

/// Display state of the page currently shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageView {
    pub page_index: usize,
    pub page_size: Size,
    pub zoom: f32,
    /// Display-space top-left of the rendered page, unknown until drawn.
    pub origin: Option<Point>,
}

impl PageView {
    pub const fn new(page_index: usize, page_size: Size, zoom: f32) -> Self {
        Self {
            page_index,
            page_size,
            zoom,
            origin: None,
        }
    }

    /// View for `page_size` fitted into `viewport` according to the editor's zoom policy.
    pub fn fit(page_index: usize, page_size: Size, viewport: Size, config: &EditorConfig) -> Self {
        let ready = viewport.width > config.ready_threshold && viewport.height > config.ready_threshold;
        let zoom = if ready {
            fit_zoom(
                page_size,
                viewport,
                config.viewport_margin,
                config.min_zoom,
                config.max_zoom,
            )
        } else {
            config.fallback_zoom
        };
        Self::new(page_index, page_size, zoom)
    }

    #[must_use]
    pub const fn with_origin(mut self, origin: Point) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Size of the rendered page in display pixels.
    pub fn display_size(&self) -> Size {
        self.page_size.scaled(self.zoom)
    }

    /// Document → display. An unknown origin behaves as `(0, 0)`, mirroring
    /// the identity fallback of [`PageView::to_document`].
    pub fn to_display(&self, doc: Point) -> Point {
        match self.origin {
            Some(origin) => to_display(doc, self.zoom, origin),
            None => doc,
        }
    }

    pub fn to_document(&self, display: Point) -> Mapping {
        to_document(display, self.zoom, self.origin)
    }

    /// Display rectangle of an overlay at its committed document position.
    pub fn display_rect(&self, overlay: &Overlay) -> Rect {
        let top_left = self.to_display(overlay.document_position);
        let zoom = if self.origin.is_some() { self.zoom } else { 1.0 };
        Rect::from_origin_size(top_left, overlay.scaled_size().scaled(zoom))
    }
}
