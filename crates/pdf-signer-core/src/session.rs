//! Open documents.
//!
//! [`DocumentSession`] is the PDF capability the editor and the export step
//! need. [`PdfSession`] implements it with lopdf for editing and mupdf for
//! rasterization.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use std::collections::BTreeMap;

use lopdf::{Document, ObjectId};
use mupdf::{Colorspace, Document as MuDocument, Matrix};

use crate::error::{Error, Result};
use crate::geometry::{Rect, Size};
use crate::pdf::{self, InsertOptions, PageIndex};
use crate::util::write_atomic;

/// An open PDF document.
///
/// Page indices are zero-based. Geometry is in PDF points with the origin at
/// the top-left corner of the page.
pub trait DocumentSession {
    fn page_count(&self) -> usize;

    /// Visible page dimensions in points (crop box, after rotation).
    fn page_size(&self, page: usize) -> Result<Size>;

    /// Render a page at `zoom` pixels per point.
    fn rasterize(&self, page: usize, zoom: f32) -> Result<RgbaImage>;

    /// Stamp an image into a page. Returns the rectangle actually covered.
    fn insert_image(&mut self, page: usize, rect: Rect, image: &RgbaImage, options: InsertOptions) -> Result<Rect>;

    /// Write the document to `path`.
    fn save(&mut self, path: &Path) -> Result<()>;
}

/// A PDF held in memory.
///
/// Rasterization uses the bytes the session was opened with, so inserted
/// images show up in renders only after the document is saved and reopened.
/// Cloning copies the lopdf object graph and shares the source bytes.
#[derive(Clone)]
pub struct PdfSession {
    document: Document,
    source: Arc<Vec<u8>>,
    /// Page objects keyed by one-based page number.
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfSession {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        let document = Document::load_mem(&bytes).map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;
        if document.is_encrypted() {
            return Err(Error::PdfOpen("encrypted documents are not supported".to_string()));
        }
        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(Error::PdfOpen("document has no pages".to_string()));
        }

        tracing::debug!("Opened PDF with {} pages ({} bytes)", pages.len(), bytes.len());
        Ok(Self {
            document,
            source: Arc::new(bytes),
            pages,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::PdfOpen(format!("Failed to read file {}: {}", path.display(), e)))?;
        Self::from_bytes(bytes)
    }

    /// Serialize the current state of the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.document.compress();
        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to serialize PDF: {e}")))?;
        Ok(output)
    }

    /// Release the document.
    pub fn close(self) {
        tracing::debug!("Closing PDF with {} pages", self.pages.len());
    }

    fn page_id(&self, page: usize) -> Result<(PageIndex, ObjectId)> {
        let total = self.pages.len();
        let index = PageIndex::checked(page, total)?;
        let page_id = self
            .pages
            .get(&index.lopdf_number())
            .copied()
            .ok_or(Error::PdfInvalidPage { page, total })?;
        Ok((index, page_id))
    }

    fn open_renderer(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.source, "").map_err(|e| Error::PdfOpen(format!("Failed to open document: {e}")))
    }
}

impl DocumentSession for PdfSession {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<Size> {
        let (_, page_id) = self.page_id(page)?;
        let frame = pdf::PageFrame::of(&self.document, page_id)?;
        if frame.rotation != 0 {
            tracing::debug!("Page {} is rotated by {} degrees", page + 1, frame.rotation);
        }
        Ok(frame.size())
    }

    fn rasterize(&self, page: usize, zoom: f32) -> Result<RgbaImage> {
        let (index, _) = self.page_id(page)?;
        let render_error = |reason: String| Error::PdfRender { page, reason };

        let doc = self.open_renderer()?;
        let mu_page = doc
            .load_page(index.as_mupdf())
            .map_err(|e| render_error(format!("Failed to load page: {e}")))?;

        let matrix = Matrix::new_scale(zoom, zoom);
        let pixmap = mu_page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), 1.0, true)
            .map_err(|e| render_error(format!("Failed to render: {e}")))?;

        let width = pixmap.width();
        let height = pixmap.height();
        let n = pixmap.n() as usize;
        let mut rgba = Vec::with_capacity((width as usize) * (height as usize) * 4);

        for chunk in pixmap.samples().chunks(n) {
            match *chunk {
                [gray] => rgba.extend_from_slice(&[gray, gray, gray, 255]),
                [r, g, b] => rgba.extend_from_slice(&[r, g, b, 255]),
                [r, g, b, a] => rgba.extend_from_slice(&[r, g, b, a]),
                _ => return Err(render_error(format!("Unexpected pixel format with {n} components"))),
            }
        }

        RgbaImage::from_raw(width, height, rgba).ok_or_else(|| render_error("Failed to create image buffer".to_string()))
    }

    fn insert_image(&mut self, page: usize, rect: Rect, image: &RgbaImage, options: InsertOptions) -> Result<Rect> {
        let (_, page_id) = self.page_id(page)?;
        pdf::insert_image(&mut self.document, page_id, rect, image, options).map_err(|e| Error::PdfInsertImage {
            page,
            reason: e.to_string(),
        })
    }

    /// Replaces `path` atomically, so an interrupted write never leaves a
    /// truncated PDF behind.
    fn save(&mut self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)
            .map_err(|e| Error::PdfSave(format!("Failed to write {}: {}", path.display(), e)))?;

        tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

impl std::fmt::Debug for PdfSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSession")
            .field("page_count", &self.pages.len())
            .field("source_len", &self.source.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::page::tests::sample_pdf;
    use image::Rgba;

    #[test]
    fn test_open_reports_pages_and_sizes() {
        let session = PdfSession::from_bytes(sample_pdf(3, 595, 842)).unwrap();
        assert_eq!(session.page_count(), 3);
        assert_eq!(session.page_size(2).unwrap(), Size::new(595.0, 842.0));
    }

    #[test]
    fn test_cropped_page_matches_render() {
        let session = PdfSession::from_bytes(crate::pdf::page::tests::cropped_pdf([100, 100, 400, 500], None)).unwrap();
        assert_eq!(session.page_size(0).unwrap(), Size::new(300.0, 400.0));
        assert_eq!(session.rasterize(0, 1.0).unwrap().dimensions(), (300, 400));
    }

    #[test]
    fn test_rotated_page_size_is_swapped() {
        let session =
            PdfSession::from_bytes(crate::pdf::page::tests::cropped_pdf([0, 0, 612, 792], Some(90))).unwrap();
        assert_eq!(session.page_size(0).unwrap(), Size::new(792.0, 612.0));
        assert_eq!(session.rasterize(0, 1.0).unwrap().dimensions(), (792, 612));
    }

    #[test]
    fn test_invalid_page() {
        let session = PdfSession::from_bytes(sample_pdf(2, 612, 792)).unwrap();
        assert!(matches!(session.page_size(2), Err(Error::PdfInvalidPage { page: 2, total: 2 })));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(PdfSession::from_bytes(b"not a pdf".to_vec()), Err(Error::PdfOpen(_))));
    }

    #[test]
    fn test_rasterize_scales_with_zoom() {
        let session = PdfSession::from_bytes(sample_pdf(1, 200, 100)).unwrap();
        let image = session.rasterize(0, 2.0).unwrap();
        assert_eq!(image.dimensions(), (400, 200));
    }

    #[test]
    fn test_insert_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signed.pdf");

        let mut session = PdfSession::from_bytes(sample_pdf(2, 612, 792)).unwrap();
        let image = RgbaImage::from_pixel(50, 20, Rgba([0, 0, 0, 255]));
        session
            .insert_image(1, Rect::new(100.0, 100.0, 150.0, 120.0), &image, InsertOptions::default())
            .unwrap();
        session.save(&path).unwrap();

        let reopened = Document::load(&path).unwrap();
        let page_id = *reopened.get_pages().get(&2).unwrap();
        let resources = pdf::resources(&reopened, page_id).unwrap();
        assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"Sig1"));

        let first_id = *reopened.get_pages().get(&1).unwrap();
        assert!(pdf::resources(&reopened, first_id).unwrap().get(b"XObject").is_err());
    }

    #[test]
    fn test_insert_on_missing_page() {
        let mut session = PdfSession::from_bytes(sample_pdf(1, 612, 792)).unwrap();
        let err = session
            .insert_image(5, Rect::new(0.0, 0.0, 1.0, 1.0), &RgbaImage::new(1, 1), InsertOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::PdfInvalidPage { page: 5, .. }));
    }
}
