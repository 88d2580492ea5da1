//! The signing editor: one open document, its page view and the placed overlays.

use std::path::Path;

use image::RgbaImage;

use crate::config::SignerConfig;
use crate::controller::{InteractionController, Key, PointerEvent};
use crate::error::{Error, Result};
use crate::export::{ExportReport, commit_overlays};
use crate::geometry::{Point, Size};
use crate::mapper::PageView;
use crate::model::AnnotationModel;
use crate::notice::OperationLog;
use crate::overlay::{Overlay, OverlayId, OverlayKind, prepare_base_image, test_pattern};
use crate::session::DocumentSession;
use crate::surface::{Confirm, ElementId, Surface};

pub struct SigningEditor<D: DocumentSession, S: Surface> {
    session: D,
    controller: InteractionController<S>,
    viewport: Size,
    config: SignerConfig,
    page_element: Option<ElementId>,
}

impl<D: DocumentSession, S: Surface> SigningEditor<D, S> {
    /// Open an editor on `session` and show its first page.
    pub fn open(session: D, surface: S, viewport: Size, config: SignerConfig, log: OperationLog) -> Result<Self> {
        let page_size = session.page_size(0)?;
        let model = AnnotationModel::new(config.placement.clone(), &config.editor);
        let view = PageView::new(0, page_size, 1.0);
        let controller = InteractionController::new(model, surface, view, config.editor.clone(), log);

        let mut editor = Self {
            session,
            controller,
            viewport,
            config,
            page_element: None,
        };
        editor.show_page()?;
        Ok(editor)
    }

    pub const fn current_page(&self) -> usize {
        self.controller.view().page_index
    }

    pub fn page_count(&self) -> usize {
        self.session.page_count()
    }

    pub const fn view(&self) -> &PageView {
        self.controller.view()
    }

    pub const fn controller(&self) -> &InteractionController<S> {
        &self.controller
    }

    pub const fn session(&self) -> &D {
        &self.session
    }

    pub const fn log(&self) -> &OperationLog {
        self.controller.log()
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.controller.model().get(id)
    }

    /// Surface element showing the rendered page.
    pub const fn page_element(&self) -> Option<ElementId> {
        self.page_element
    }

    /// Render the current page fitted to the viewport and redraw its overlays.
    ///
    /// The page image is centered in the viewport. Its top-left corner, read
    /// back from the surface, becomes the origin of the coordinate mapping.
    pub fn show_page(&mut self) -> Result<()> {
        let page = self.current_page();
        let page_size = self.session.page_size(page)?;
        let view = PageView::fit(page, page_size, self.viewport, &self.config.editor);
        let image = self.session.rasterize(page, view.zoom)?;

        let surface = self.controller.surface_mut();
        surface.clear();
        let element = surface.draw_image(centered(self.viewport, &image), &image);
        let origin = surface.bounding_box(element).map(|rect| rect.min);
        self.page_element = Some(element);

        let view = match origin {
            Some(origin) => view.with_origin(origin),
            None => {
                self.controller
                    .log_mut()
                    .warning(format!("Position of page {} on screen is unknown", page + 1));
                view
            }
        };
        tracing::debug!("Page {} shown at zoom {:.2}, origin {:?}", page + 1, view.zoom, view.origin);

        self.controller.set_view(view);
        self.controller.redraw();
        self.controller
            .log_mut()
            .info(format!("Showing page {} of {}", page + 1, self.session.page_count()));
        Ok(())
    }

    /// New viewport dimensions; the page is fitted again.
    pub fn resize(&mut self, viewport: Size) -> Result<()> {
        self.viewport = viewport;
        self.show_page()
    }

    /// Advance one page. Returns `false` at the last page.
    pub fn next_page(&mut self) -> Result<bool> {
        let page = self.current_page();
        if page + 1 >= self.session.page_count() {
            self.controller.log_mut().info("Already at the last page");
            return Ok(false);
        }
        self.go_to_page(page + 1)
    }

    /// Go back one page. Returns `false` at the first page.
    pub fn previous_page(&mut self) -> Result<bool> {
        let page = self.current_page();
        if page == 0 {
            self.controller.log_mut().info("Already at the first page");
            return Ok(false);
        }
        self.go_to_page(page - 1)
    }

    fn go_to_page(&mut self, page: usize) -> Result<bool> {
        let page_size = self.session.page_size(page)?;
        self.controller.set_view(PageView::new(page, page_size, 1.0));
        self.show_page()?;
        Ok(true)
    }

    /// Prepare `image` for its kind and place it on the current page.
    pub fn add_overlay(&mut self, image: RgbaImage, kind: OverlayKind) -> OverlayId {
        let image = prepare_base_image(image, kind, &self.config.placement);
        self.controller.add(image, kind)
    }

    /// Place the built-in test pattern on the current page.
    pub fn add_test_overlay(&mut self) -> OverlayId {
        self.controller.add(test_pattern(), OverlayKind::Test)
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        self.controller.pointer(event);
    }

    pub fn pointer_down(&mut self, point: Point) {
        self.controller.pointer_down(point);
    }

    pub fn pointer_move(&mut self, point: Point) {
        self.controller.pointer_move(point);
    }

    pub fn pointer_up(&mut self, point: Point) {
        self.controller.pointer_up(point);
    }

    pub fn key_press(&mut self, key: Key, confirm: &mut dyn Confirm) {
        self.controller.key_press(key, confirm);
    }

    pub fn clear_overlays(&mut self, confirm: &mut dyn Confirm) -> usize {
        self.controller.clear_all(confirm)
    }

    pub fn status_line(&self) -> String {
        self.controller.status_line()
    }

    pub fn into_parts(self) -> (D, AnnotationModel, S, OperationLog) {
        let (model, surface, log) = self.controller.into_parts();
        (self.session, model, surface, log)
    }
}

impl<D: DocumentSession + Clone, S: Surface> SigningEditor<D, S> {
    /// Stamp every overlay into a copy of the document and write it to `path`.
    ///
    /// The open document stays unmodified, so saving again or retrying after
    /// a failed write never stamps an overlay twice.
    pub fn save(&mut self, path: &Path) -> Result<ExportReport> {
        let (model, log) = self.controller.model_and_log();
        if model.is_empty() {
            log.warning("Add an overlay before saving");
            return Err(Error::NothingToSave);
        }

        log.info(format!("Saving {} overlays to {}", model.len(), path.display()));
        let mut target = self.session.clone();
        let report = commit_overlays(&mut target, model, log);

        if let Err(e) = target.save(path) {
            log.error(format!("Failed to save {}: {}", path.display(), e));
            return Err(e);
        }

        if report.is_complete() {
            log.success(format!("Signed PDF saved to {}", path.display()));
        } else {
            log.warning(format!(
                "Signed PDF saved to {} without {} overlays",
                path.display(),
                report.failures.len()
            ));
        }
        Ok(report)
    }
}

/// Top-left position centering `image` in the viewport.
fn centered(viewport: Size, image: &RgbaImage) -> Point {
    let image = Size::from_pixels(image.width(), image.height());
    Point::new(
        (viewport.width - image.width) / 2.0,
        (viewport.height - image.height) / 2.0,
    )
}
