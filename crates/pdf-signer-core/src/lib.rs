//! PDF Signer Core Library
//!
//! Placement of signature and annotation overlays on PDF pages:
//! - Mapping between display pixels and PDF points
//! - The overlay model (selection, scale, paint order)
//! - Pointer and keyboard interaction through a drawing [`Surface`]
//! - Stamping overlays into the document and saving it
//! - Merging documents

pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod mapper;
pub mod merge;
pub mod model;
pub mod notice;
pub mod overlay;
pub mod pdf;
pub mod session;
pub mod sketch;
pub mod surface;
pub mod util;

pub use config::{EditorConfig, LogConfig, MaxSize, PlacementConfig, SignerConfig};
pub use controller::{InteractionController, Key, OverlayState, PointerEvent};
pub use editor::SigningEditor;
pub use error::{Error, Result};
pub use export::{ExportFailure, ExportReport, commit_overlays};
pub use geometry::{Point, Rect, Size};
pub use mapper::{Mapping, PageView, fit_zoom, to_display, to_document};
pub use merge::{MergeProgress, merge_documents, merge_files};
pub use model::{AnnotationModel, ScaleOutcome};
pub use notice::{Notice, NoticeLevel, OperationLog};
pub use overlay::{Overlay, OverlayId, OverlayKind, prepare_base_image, test_pattern};
pub use pdf::InsertOptions;
pub use session::{DocumentSession, PdfSession};
pub use sketch::SignaturePad;
pub use surface::{AlwaysConfirm, Confirm, Element, ElementId, ElementKind, NeverConfirm, RecordingSurface, Surface};

/// Load an image file for use as an overlay.
pub fn load_overlay_image(path: impl AsRef<std::path::Path>) -> Result<image::RgbaImage> {
    let path = path.as_ref();
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| Error::Image(format!("Failed to load {}: {}", path.display(), e)))
}
