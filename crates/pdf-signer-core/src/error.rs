use thiserror::Error;

use crate::overlay::OverlayId;

/// Unified error type for pdf-signer-core
///
/// Degraded paths (unknown page origin, rejected scale requests) are not errors:
/// they are reported as notices and the operation continues. This enum covers
/// the failures that abort an operation:
/// - PDF operations (opening, rendering, image insertion, saving)
/// - Overlay lookups and empty saves
/// - Merging several documents
/// - Configuration loading and validation
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to render a PDF page
    #[error("failed to render page {page}: {reason}")]
    PdfRender { page: usize, reason: String },

    /// Failed to insert an image into a page
    #[error("failed to insert image on page {page}: {reason}")]
    PdfInsertImage { page: usize, reason: String },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Overlay Errors
    // ==========================================================================
    /// Failed to load or process an overlay image
    #[error("image error: {0}")]
    Image(String),

    /// No overlay with this id exists in the session
    #[error("unknown overlay #{0}")]
    UnknownOverlay(OverlayId),

    /// Save requested without any overlay placed
    #[error("no overlays to save")]
    NothingToSave,

    // ==========================================================================
    // Merge Errors
    // ==========================================================================
    /// Failed to merge documents
    #[error("failed to merge PDFs: {0}")]
    Merge(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
