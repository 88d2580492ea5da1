//! Integration tests for pdf-signer-core
//!
//! These tests drive the editor end to end:
//! - Placing, dragging and scaling overlays through pointer and key events
//! - Committing overlays into a document (mock and real PDF backends)
//! - Merging documents on the background worker

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_signer_core::{
    AlwaysConfirm, DocumentSession, Error, InsertOptions, Key, MergeProgress, NeverConfirm, NoticeLevel,
    OperationLog, OverlayKind, PdfSession, Point, RecordingSurface, Rect, Result, SignerConfig, SigningEditor,
    Size, Surface, merge_documents, merge_files,
};

// =============================================================================
// Mock Document for Testing
// =============================================================================

#[derive(Debug, Default)]
struct Journal {
    inserted: Vec<(usize, Rect)>,
    saved: Vec<PathBuf>,
}

/// A document of Letter-sized pages that records what is written into it.
/// Clones share the journal, so the editor's export copy stays observable.
#[derive(Debug, Clone)]
struct MockDocument {
    pages: usize,
    failing_page: Option<usize>,
    journal: Arc<Mutex<Journal>>,
}

impl MockDocument {
    fn new(pages: usize) -> Self {
        Self {
            pages,
            failing_page: None,
            journal: Arc::default(),
        }
    }

    fn failing_on(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    fn inserted(&self) -> Vec<(usize, Rect)> {
        self.journal.lock().unwrap().inserted.clone()
    }
}

impl DocumentSession for MockDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_size(&self, page: usize) -> Result<Size> {
        if page >= self.pages {
            return Err(Error::PdfInvalidPage { page, total: self.pages });
        }
        Ok(Size::new(612.0, 792.0))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize(&self, page: usize, zoom: f32) -> Result<RgbaImage> {
        let size = self.page_size(page)?.scaled(zoom);
        Ok(RgbaImage::from_pixel(size.width as u32, size.height as u32, Rgba([255, 255, 255, 255])))
    }

    fn insert_image(&mut self, page: usize, rect: Rect, _image: &RgbaImage, _options: InsertOptions) -> Result<Rect> {
        if self.failing_page == Some(page) {
            return Err(Error::PdfInsertImage {
                page,
                reason: "mock insertion failure".to_string(),
            });
        }
        self.journal.lock().unwrap().inserted.push((page, rect));
        Ok(rect)
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.journal.lock().unwrap().saved.push(path.to_path_buf());
        Ok(())
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Viewport smaller than a Letter page, so the fit zoom clamps to 1.
const SMALL_VIEWPORT: Size = Size::new(400.0, 400.0);

fn open_editor<D: DocumentSession>(document: D, viewport: Size) -> SigningEditor<D, RecordingSurface> {
    SigningEditor::open(
        document,
        RecordingSurface::new(),
        viewport,
        SignerConfig::default(),
        OperationLog::in_memory(),
    )
    .expect("editor should open")
}

fn ink(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
}

fn center(rect: Rect) -> Point {
    Point::new((rect.min.x + rect.max.x) / 2.0, (rect.min.y + rect.max.y) / 2.0)
}

fn overlay_center<D: DocumentSession>(editor: &SigningEditor<D, RecordingSurface>, id: pdf_signer_core::OverlayId) -> Point {
    let element = editor.controller().image_element(id).unwrap();
    center(editor.controller().surface().bounding_box(element).unwrap())
}

/// Build a PDF whose pages inherit MediaBox and Resources from the page tree.
fn build_pdf(pages: usize, width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut kids = Vec::new();
    for n in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Contract page {}", n + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let page_tree = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(i64::try_from(pages).unwrap())),
        (
            "Resources",
            Object::Dictionary(Dictionary::from_iter([(
                "Font",
                Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
            )])),
        ),
        ("MediaBox", Object::Array(vec![0.into(), 0.into(), width.into(), height.into()])),
    ]);
    doc.objects.insert(page_tree_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

// =============================================================================
// Placement and Interaction Tests
// =============================================================================

#[test]
fn test_drag_then_save_writes_moved_rect() {
    let document = MockDocument::new(1);
    let mut editor = open_editor(document.clone(), SMALL_VIEWPORT);
    assert!((editor.view().zoom - 1.0).abs() < f32::EPSILON);

    let id = editor.add_overlay(ink(50, 20), OverlayKind::Handwritten);
    let start = overlay_center(&editor, id);
    editor.pointer_down(start);
    editor.pointer_move(start.offset(12.0, -4.0));
    editor.pointer_move(start.offset(30.0, -10.0));
    editor.pointer_up(start.offset(30.0, -10.0));

    let report = editor.save(Path::new("signed.pdf")).unwrap();
    assert_eq!(report.written, 1);

    let inserted = document.inserted();
    assert_eq!(inserted.len(), 1);
    let (page, rect) = inserted[0];
    assert_eq!(page, 0);
    let expected = Rect::new(311.0, 544.4, 361.0, 564.4);
    assert!(rect.min.approx_eq(expected.min, 1e-3), "{rect:?}");
    assert!(rect.max.approx_eq(expected.max, 1e-3), "{rect:?}");
}

#[test]
fn test_drag_at_higher_zoom_is_divided_by_zoom() {
    let mut editor = open_editor(MockDocument::new(1), Size::new(1400.0, 1800.0));
    let zoom = editor.view().zoom;
    assert!(zoom > 1.0);

    let id = editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);
    let before = editor.overlay(id).unwrap().document_position;

    let start = overlay_center(&editor, id);
    editor.pointer_down(start);
    editor.pointer_move(start.offset(40.0, 20.0));
    editor.pointer_up(start.offset(40.0, 20.0));

    let after = editor.overlay(id).unwrap().document_position;
    assert!(after.approx_eq(before.offset(40.0 / zoom, 20.0 / zoom), 1e-2));
}

#[test]
fn test_scale_three_times_then_reset() {
    let mut editor = open_editor(MockDocument::new(1), SMALL_VIEWPORT);
    let id = editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);

    for _ in 0..3 {
        editor.key_press(Key::from_symbol("+"), &mut AlwaysConfirm);
    }
    assert!((editor.overlay(id).unwrap().scale_factor() - 1.728).abs() < 1e-4);
    assert!(editor.status_line().contains("scale 1.7x"));

    editor.key_press(Key::from_symbol("0"), &mut AlwaysConfirm);
    assert!((editor.overlay(id).unwrap().scale_factor() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_scale_without_selection_warns() {
    let mut editor = open_editor(MockDocument::new(1), SMALL_VIEWPORT);
    let id = editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);
    editor.pointer_down(Point::new(1.0, 1.0));
    assert!(editor.controller().model().selected().is_none());

    let warnings = editor.log().count(NoticeLevel::Warning);
    editor.key_press(Key::ScaleUp, &mut AlwaysConfirm);
    assert_eq!(editor.log().count(NoticeLevel::Warning), warnings + 1);
    assert!((editor.overlay(id).unwrap().scale_factor() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_delete_cancelled_then_confirmed() {
    let mut editor = open_editor(MockDocument::new(1), SMALL_VIEWPORT);
    let id = editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);

    editor.key_press(Key::Delete, &mut NeverConfirm);
    assert!(editor.overlay(id).is_some());

    editor.key_press(Key::Delete, &mut AlwaysConfirm);
    assert!(editor.overlay(id).is_none());
    assert!(matches!(editor.save(Path::new("out.pdf")), Err(Error::NothingToSave)));
}

#[test]
fn test_overlays_on_other_pages_are_exported() {
    let document = MockDocument::new(3);
    let mut editor = open_editor(document.clone(), SMALL_VIEWPORT);

    editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);
    editor.next_page().unwrap();
    editor.next_page().unwrap();
    editor.add_test_overlay();
    assert_eq!(editor.current_page(), 2);

    editor.save(Path::new("out.pdf")).unwrap();
    let pages: Vec<usize> = document.inserted().iter().map(|(page, _)| *page).collect();
    assert_eq!(pages, vec![0, 2]);
}

#[test]
fn test_failing_overlay_does_not_stop_export() {
    let document = MockDocument::new(2).failing_on(0);
    let mut editor = open_editor(document.clone(), SMALL_VIEWPORT);

    editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);
    editor.next_page().unwrap();
    editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);

    let report = editor.save(Path::new("out.pdf")).unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].page_index, 0);
    assert_eq!(document.inserted()[0].0, 1);
    assert_eq!(editor.log().count(NoticeLevel::Error), 1);
    assert_eq!(document.journal.lock().unwrap().saved.len(), 1);
}

#[test]
fn test_unknown_page_origin_degrades_to_identity() {
    let mut editor = SigningEditor::open(
        MockDocument::new(1),
        RecordingSurface::blind(),
        Size::new(1400.0, 1800.0),
        SignerConfig::default(),
        OperationLog::in_memory(),
    )
    .unwrap();
    assert!(editor.view().origin.is_none());

    let id = editor.add_overlay(ink(50, 20), OverlayKind::Uploaded);
    let before = editor.overlay(id).unwrap().document_position;
    let start = before.offset(25.0, 10.0);

    editor.pointer_down(start);
    editor.pointer_move(start.offset(10.0, 5.0));
    editor.pointer_up(start.offset(10.0, 5.0));

    let after = editor.overlay(id).unwrap().document_position;
    assert!(after.approx_eq(before.offset(10.0, 5.0), 1e-3));
    assert_eq!(editor.log().last().unwrap().level, NoticeLevel::Warning);
}

// =============================================================================
// PDF Backend Tests
// =============================================================================

#[test]
fn test_sign_real_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("signed.pdf");

    let session = PdfSession::from_bytes(build_pdf(2, 612, 792)).unwrap();
    let mut editor = open_editor(session, SMALL_VIEWPORT);
    editor.next_page().unwrap();
    editor.add_overlay(ink(50, 20), OverlayKind::Handwritten);
    editor.save(&output).unwrap();

    let signed = Document::load(&output).unwrap();
    let pages = signed.get_pages();
    let second = *pages.get(&2).unwrap();
    let resources = pdf_signer_core::pdf::resources(&signed, second).unwrap();
    assert!(resources.has(b"Font"), "inherited resources must survive");
    assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"Sig1"));

    let first = *pages.get(&1).unwrap();
    assert!(pdf_signer_core::pdf::resources(&signed, first).unwrap().get(b"XObject").is_err());

    let reopened = PdfSession::open(&output).unwrap();
    assert_eq!(reopened.page_count(), 2);
    assert_eq!(reopened.page_size(1).unwrap(), Size::new(612.0, 792.0));
}

#[test]
fn test_rendered_page_is_drawn_at_fit_zoom() {
    let session = PdfSession::from_bytes(build_pdf(1, 300, 200)).unwrap();
    let editor = open_editor(session, Size::new(620.0, 420.0));

    assert!((editor.view().zoom - 2.0).abs() < 1e-4);
    let page = editor.controller().surface().bounding_box(editor.page_element().unwrap()).unwrap();
    assert_eq!(page.size(), Size::new(600.0, 400.0));
    assert_eq!(editor.view().origin, Some(Point::new(10.0, 10.0)));
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_documents_page_count() {
    let merged = merge_documents(&[build_pdf(2, 612, 792), build_pdf(3, 595, 842)]).unwrap();
    let session = PdfSession::from_bytes(merged).unwrap();
    assert_eq!(session.page_count(), 5);
    assert_eq!(session.page_size(1).unwrap(), Size::new(612.0, 792.0));
    assert_eq!(session.page_size(2).unwrap(), Size::new(595.0, 842.0));
}

#[tokio::test]
async fn test_merge_files_on_worker() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<PathBuf> = (0..3)
        .map(|i| {
            let path = dir.path().join(format!("part{i}.pdf"));
            std::fs::write(&path, build_pdf(1, 612, 792)).unwrap();
            path
        })
        .collect();
    let output = dir.path().join("merged.pdf");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let pages = merge_files(inputs, output.clone(), tx).await.unwrap();
    assert_eq!(pages, 3);

    let mut last = None;
    while let Some(progress) = rx.recv().await {
        last = Some(progress);
    }
    assert_eq!(last, Some(MergeProgress::Done { pages: 3 }));
    assert_eq!(PdfSession::open(&output).unwrap().page_count(), 3);
}
