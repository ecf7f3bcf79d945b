//! Extraction dispatch: uploaded document → text + images.
//!
//! Extraction never fails. Text and images are read independently (a deck
//! whose media is broken still yields its text) and any failure is recorded
//! as a warning next to whatever content was recovered.

use crate::error::ExtractError;
use crate::pipeline::input::{DocumentKind, UploadedDocument};
use crate::pipeline::{pdf, pptx};
use std::sync::Arc;
use tracing::{debug, warn};

/// One embedded picture, as stored in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Text and images read from a document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub text: String,
    pub images: Vec<ExtractedImage>,
}

/// Extracted content plus the non-fatal problems met along the way.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub content: ExtractedContent,
    pub warnings: Vec<ExtractError>,
}

/// Extract text and images from `document`.
///
/// A slide deck is read by two concurrent passes on the blocking pool. A PDF
/// is read by one blocking task holding a single pdfium binding.
pub async fn extract(document: &UploadedDocument) -> Extraction {
    let (text, images) = match &document.kind {
        DocumentKind::Pptx => {
            let bytes: Arc<[u8]> = Arc::from(document.bytes.as_slice());
            let text_bytes = Arc::clone(&bytes);
            tokio::join!(
                run_blocking(move || pptx::extract_text(&text_bytes[..])),
                run_blocking(move || pptx::extract_images(&bytes[..])),
            )
        }
        DocumentKind::Pdf => {
            let bytes = document.bytes.clone();
            match run_blocking(move || Ok(pdf::extract(&bytes))).await {
                Ok(both) => both,
                Err(e) => (Err(e.clone()), Err(e)),
            }
        }
        DocumentKind::Unsupported(ext) => {
            warn!("{}: unsupported file type '{}'", document.name, ext);
            return Extraction {
                content: ExtractedContent::default(),
                warnings: vec![ExtractError::UnsupportedFormat {
                    extension: ext.clone(),
                }],
            };
        }
    };

    let mut extraction = Extraction::default();
    match text {
        Ok(text) => extraction.content.text = text,
        Err(e) => {
            warn!("{}: text extraction failed: {}", document.name, e);
            extraction.warnings.push(e);
        }
    }
    match images {
        Ok(images) => extraction.content.images = images,
        Err(e) => {
            // A broken file fails both passes the same way; report it once.
            let duplicate = extraction
                .warnings
                .iter()
                .any(|w| w.to_string() == e.to_string());
            if !duplicate {
                warn!("{}: image extraction failed: {}", document.name, e);
                extraction.warnings.push(e);
            }
        }
    }

    debug!(
        "{}: {} chars of text, {} images, {} warnings",
        document.name,
        extraction.content.text.chars().count(),
        extraction.content.images.len(),
        extraction.warnings.len()
    );
    extraction
}

async fn run_blocking<T, F>(f: F) -> Result<T, ExtractError>
where
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))?
}
