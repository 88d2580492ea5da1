//! Writing placed overlays into the document.

use crate::model::AnnotationModel;
use crate::notice::OperationLog;
use crate::overlay::OverlayId;
use crate::pdf::InsertOptions;
use crate::session::DocumentSession;

/// An overlay that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    pub id: OverlayId,
    pub page_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: usize,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Stamp every overlay of the model into its page.
///
/// Each overlay is re-sampled from its base image at its scale factor and
/// placed at its document rectangle; display zoom plays no part here. A failing
/// overlay is recorded and the remaining ones are still written.
pub fn commit_overlays<D: DocumentSession + ?Sized>(
    session: &mut D,
    model: &AnnotationModel,
    log: &mut OperationLog,
) -> ExportReport {
    let options = InsertOptions {
        keep_proportion: true,
        overlay: true,
    };
    let mut report = ExportReport::default();

    for overlay in model.iter() {
        let image = overlay.rasterize();
        let rect = overlay.document_rect();
        let page_index = overlay.page_index();

        match session.insert_image(page_index, rect, &image, options) {
            Ok(placed) => {
                tracing::debug!(
                    "Wrote overlay #{} on page {} at ({:.1}, {:.1})-({:.1}, {:.1})",
                    overlay.id,
                    page_index + 1,
                    placed.min.x,
                    placed.min.y,
                    placed.max.x,
                    placed.max.y
                );
                report.written += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to write overlay #{} on page {}: {}", overlay.id, page_index + 1, e);
                report.failures.push(ExportFailure {
                    id: overlay.id,
                    page_index,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !report.failures.is_empty() {
        let details: Vec<String> = report
            .failures
            .iter()
            .map(|f| format!("#{} (page {}): {}", f.id, f.page_index + 1, f.reason))
            .collect();
        log.error(format!(
            "{} of {} overlays could not be written: {}",
            report.failures.len(),
            model.len(),
            details.join("; ")
        ));
    }

    report
}
