//! Concatenating PDF documents.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Error, Result};
use crate::pdf;
use crate::util::write_atomic;

/// Progress of a background merge, in the order the messages are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeProgress {
    /// Input `index` (zero-based) of `total` has been read and parsed.
    Loaded { index: usize, total: usize },
    Saving,
    Done { pages: usize },
}

/// Concatenate every page of every input, in order.
pub fn merge_documents(inputs: &[Vec<u8>]) -> Result<Vec<u8>> {
    let documents = inputs
        .iter()
        .enumerate()
        .map(|(i, bytes)| load(i, bytes))
        .collect::<Result<Vec<_>>>()?;
    let (mut merged, _) = merge_loaded(documents)?;
    serialize(&mut merged)
}

/// Merge PDF files into `output` on a blocking worker.
///
/// Progress is posted to `progress`; a dropped receiver does not stop the
/// merge. Returns the number of pages written.
pub async fn merge_files(paths: Vec<PathBuf>, output: PathBuf, progress: UnboundedSender<MergeProgress>) -> Result<usize> {
    tokio::task::spawn_blocking(move || merge_files_blocking(&paths, &output, &progress))
        .await
        .map_err(|e| Error::Merge(format!("Merge task failed: {e}")))?
}

fn merge_files_blocking(paths: &[PathBuf], output: &Path, progress: &UnboundedSender<MergeProgress>) -> Result<usize> {
    let total = paths.len();
    let mut documents = Vec::with_capacity(total);

    for (index, path) in paths.iter().enumerate() {
        let bytes = std::fs::read(path).map_err(|e| Error::Merge(format!("Failed to read {}: {}", path.display(), e)))?;
        let doc = load(index, &bytes).map_err(|e| Error::Merge(format!("{}: {}", path.display(), e)))?;
        documents.push(doc);
        tracing::debug!("Loaded {} ({}/{})", path.display(), index + 1, total);
        let _ = progress.send(MergeProgress::Loaded { index, total });
    }

    let (mut merged, pages) = merge_loaded(documents)?;

    let _ = progress.send(MergeProgress::Saving);
    let bytes = serialize(&mut merged)?;
    write_atomic(output, &bytes).map_err(|e| Error::Merge(format!("Failed to write {}: {}", output.display(), e)))?;

    tracing::info!("Merged {} files ({} pages) into {}", total, pages, output.display());
    let _ = progress.send(MergeProgress::Done { pages });
    Ok(pages)
}

fn load(index: usize, bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| Error::Merge(format!("Failed to load input {}: {}", index + 1, e)))
}

fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save merged PDF: {e}")))?;
    Ok(output)
}

/// Build one document from `documents`. Returns it with its page count.
///
/// Page attributes inherited from a source page tree (MediaBox, Resources,
/// CropBox, Rotate) are copied onto each page, since the source trees are
/// dropped.
fn merge_loaded(documents: Vec<Document>) -> Result<(Document, usize)> {
    if documents.is_empty() {
        return Err(Error::Merge("No documents to merge".to_string()));
    }

    let mut max_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut merged = Document::with_version("1.5");

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            let mut page = doc
                .get_dictionary(page_id)
                .map_err(|e| Error::Merge(format!("Failed to read page: {e}")))?
                .clone();
            if !page.has(b"MediaBox") {
                let media_box = pdf::media_box(&doc, page_id)?;
                page.set("MediaBox", Object::Array(media_box.iter().map(|&v| Object::Real(v)).collect()));
            }
            if !page.has(b"Resources") {
                page.set("Resources", Object::Dictionary(pdf::resources(&doc, page_id)?));
            }
            for key in [b"CropBox".as_slice(), b"Rotate".as_slice()] {
                if !page.has(key)
                    && let Some(value) = pdf::inherited_attribute(&doc, page_id, key)?
                {
                    page.set(key, value);
                }
            }
            pages.push((page_id, page));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }
    }

    if pages.is_empty() {
        return Err(Error::Merge("Inputs contain no pages".to_string()));
    }

    merged.max_id = max_id;
    let pages_id = merged.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));
        merged.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(i64::try_from(count).unwrap_or(i64::MAX))),
            ("Kids", Object::Array(kids)),
        ])),
    );

    let catalog_id = merged.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    merged.renumber_objects();
    merged.compress();
    Ok((merged, count))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::page::tests::sample_pdf;

    fn page_sizes(bytes: &[u8]) -> Vec<[f32; 4]> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| pdf::media_box(&doc, id).unwrap())
            .collect()
    }

    #[test]
    fn test_merge_keeps_input_order() {
        let merged = merge_documents(&[sample_pdf(2, 612, 792), sample_pdf(1, 595, 842), sample_pdf(3, 300, 400)]).unwrap();

        let sizes = page_sizes(&merged);
        assert_eq!(sizes.len(), 6);
        assert_eq!(sizes[0], [0.0, 0.0, 612.0, 792.0]);
        assert_eq!(sizes[2], [0.0, 0.0, 595.0, 842.0]);
        assert_eq!(sizes[5], [0.0, 0.0, 300.0, 400.0]);
    }

    #[test]
    fn test_merge_carries_inherited_resources() {
        let merged = merge_documents(&[sample_pdf(1, 612, 792), sample_pdf(1, 612, 792)]).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        for page_id in doc.get_pages().into_values() {
            assert!(pdf::resources(&doc, page_id).unwrap().has(b"Font"));
        }
    }

    #[test]
    fn test_merge_carries_inherited_rotation() {
        let mut source = Document::load_mem(&sample_pdf(1, 612, 792)).unwrap();
        let tree_id = source.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        source
            .get_object_mut(tree_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Rotate", Object::Integer(90));
        let mut rotated = Vec::new();
        source.save_to(&mut rotated).unwrap();

        let merged = merge_documents(&[sample_pdf(1, 612, 792), rotated]).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        let rotations: Vec<i64> = doc
            .get_pages()
            .into_values()
            .map(|id| pdf::rotation(&doc, id).unwrap())
            .collect();
        assert_eq!(rotations, vec![0, 90]);
    }

    #[test]
    fn test_merge_nothing() {
        assert!(matches!(merge_documents(&[]), Err(Error::Merge(_))));
    }

    #[test]
    fn test_merge_invalid_input() {
        let err = merge_documents(&[sample_pdf(1, 612, 792), b"garbage".to_vec()]).unwrap_err();
        assert!(err.to_string().contains("input 2"));
    }

    #[tokio::test]
    async fn test_merge_files_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        std::fs::write(&a, sample_pdf(2, 612, 792)).unwrap();
        std::fs::write(&b, sample_pdf(1, 612, 792)).unwrap();
        let output = dir.path().join("merged.pdf");

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let pages = merge_files(vec![a, b], output.clone(), tx).await.unwrap();
        assert_eq!(pages, 3);

        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        assert_eq!(
            messages,
            vec![
                MergeProgress::Loaded { index: 0, total: 2 },
                MergeProgress::Loaded { index: 1, total: 2 },
                MergeProgress::Saving,
                MergeProgress::Done { pages: 3 },
            ]
        );
        assert_eq!(page_sizes(&std::fs::read(output).unwrap()).len(), 3);
    }

    #[tokio::test]
    async fn test_merge_files_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let result = merge_files(vec![dir.path().join("nope.pdf")], dir.path().join("out.pdf"), tx).await;
        assert!(matches!(result, Err(Error::Merge(_))));
        assert!(!dir.path().join("out.pdf").exists());
    }
}
