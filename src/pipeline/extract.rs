//! Text extraction: every page of every document, joined into one blob.
//!
//! ## Layout of the combined text
//!
//! Documents are visited in order; within a document, pages in order. Pages
//! that yield text are joined with a blank line and the document is
//! terminated by a blank line:
//!
//! ```text
//! doc1.page1 \n\n doc1.page2 \n\n  doc2.page1 \n\n
//! ```
//!
//! A page with no text layer contributes nothing, not even a separator.
//!
//! pdfium sits behind FFI and is not async-aware; extraction runs on tokio's
//! blocking pool.

use crate::error::PodcastError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Page-text source for one document.
///
/// The production implementation is [`PdfiumReader`]; tests substitute an
/// in-memory reader.
pub trait DocumentReader: Send + Sync {
    /// Text of each page, in page order. A page without extractable text is
    /// an empty string. Failing to open the document is an error.
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, PodcastError>;
}

/// Reads the text layer through pdfium.
///
/// Binds to the library named by `PDFIUM_LIB_PATH` (a file, or a directory
/// containing the platform library) and falls back to the system library.
#[derive(Debug, Default, Clone)]
pub struct PdfiumReader;

impl PdfiumReader {
    fn bind() -> Result<Pdfium, PodcastError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(p) if !p.trim().is_empty() => {
                let mut lib = PathBuf::from(p);
                if lib.is_dir() {
                    lib = lib.join(format!(
                        "{}pdfium{}",
                        std::env::consts::DLL_PREFIX,
                        std::env::consts::DLL_SUFFIX
                    ));
                }
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(lib.as_path())
            }
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PodcastError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Pdfium::new(bindings))
    }
}

impl DocumentReader for PdfiumReader {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, PodcastError> {
        let pdfium = Self::bind()?;

        let document =
            pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| PodcastError::ExtractionFailed {
                    path: path.to_path_buf(),
                    detail: format!("{e:?}"),
                })?;

        let pages = document.pages();
        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => texts.push(text.all()),
                Err(e) => {
                    warn!("{}: page {} has no readable text layer: {:?}", path.display(), idx + 1, e);
                    texts.push(String::new());
                }
            }
        }

        debug!("{}: {} pages", path.display(), texts.len());
        Ok(texts)
    }
}

/// Join per-document page texts into the combined text.
pub fn combine_page_texts<I>(documents: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut combined = String::new();
    for pages in documents {
        let text = pages
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        combined.push_str(&text);
        combined.push_str("\n\n");
    }
    combined
}

/// Extract and combine the text of `paths`, in order.
///
/// The first unreadable document fails the whole extraction; no partial
/// text is returned.
pub async fn extract_text(
    paths: &[PathBuf],
    reader: Arc<dyn DocumentReader>,
) -> Result<String, PodcastError> {
    let paths = paths.to_vec();

    let combined = tokio::task::spawn_blocking(move || {
        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            documents.push(reader.page_texts(path)?);
        }
        Ok::<_, PodcastError>(combine_page_texts(documents))
    })
    .await
    .map_err(|e| PodcastError::Internal(format!("Extraction task panicked: {e}")))??;

    info!("Extracted {} characters", combined.chars().count());
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapReader(HashMap<PathBuf, Vec<String>>);

    impl DocumentReader for MapReader {
        fn page_texts(&self, path: &Path) -> Result<Vec<String>, PodcastError> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| PodcastError::ExtractionFailed {
                    path: path.to_path_buf(),
                    detail: "unparseable".into(),
                })
        }
    }

    fn reader(docs: Vec<(&str, Vec<&str>)>) -> Arc<dyn DocumentReader> {
        Arc::new(MapReader(
            docs.into_iter()
                .map(|(p, pages)| {
                    (
                        PathBuf::from(p),
                        pages.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        ))
    }

    #[tokio::test]
    async fn two_single_page_documents() {
        let r = reader(vec![("a.pdf", vec!["A"]), ("b.pdf", vec!["B"])]);
        let text = extract_text(&[PathBuf::from("a.pdf"), PathBuf::from("b.pdf")], r)
            .await
            .unwrap();
        assert_eq!(text, "A\n\nB\n\n");
    }

    #[test]
    fn empty_pages_add_no_separator() {
        let combined = combine_page_texts(vec![vec![
            "one".to_string(),
            String::new(),
            "three".to_string(),
        ]]);
        assert_eq!(combined, "one\n\nthree\n\n");
    }

    #[test]
    fn document_major_page_minor_order() {
        let combined = combine_page_texts(vec![
            vec!["1a".to_string(), "1b".to_string()],
            vec!["2a".to_string()],
        ]);
        assert_eq!(combined, "1a\n\n1b\n\n2a\n\n");
    }

    #[tokio::test]
    async fn unreadable_document_fails_whole_extraction() {
        let r = reader(vec![("good.pdf", vec!["fine"])]);
        let err = extract_text(&[PathBuf::from("good.pdf"), PathBuf::from("bad.pdf")], r)
            .await
            .unwrap_err();
        match err {
            PodcastError::ExtractionFailed { path, .. } => assert_eq!(path, PathBuf::from("bad.pdf")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
