//! PDF extraction via pdfium: page text and embedded image objects.
//!
//! ## One binding per document
//!
//! A [`Pdfium`] handle initialises the process-wide library when created and
//! destroys it when dropped, so two live handles must never overlap. [`extract`]
//! binds once, loads the document once and reads both text and images from
//! it. Every call blocks; [`crate::pipeline::extract`] runs it on the
//! blocking pool.
//!
//! ## Binding
//!
//! `PDFIUM_LIB_PATH` may name an existing libpdfium; otherwise the platform
//! library is looked up on the system search path. Binding never panics: a
//! missing library becomes [`ExtractError::PdfiumUnavailable`].

use crate::error::ExtractError;
use crate::pipeline::encode::encode_png;
use crate::pipeline::extract::ExtractedImage;
use crate::pipeline::{IMAGE_SCAN_PAGES, MAX_IMAGES, MAX_IMAGE_BYTES, MAX_TEXT_PAGES};
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

#[cfg(test)]
pub(crate) static BIND_ATTEMPTS: std::sync::atomic::AtomicUsize =
    std::sync::atomic::AtomicUsize::new(0);

/// Bind to libpdfium, preferring `PDFIUM_LIB_PATH`.
fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    #[cfg(test)]
    BIND_ATTEMPTS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.trim().is_empty() => Pdfium::bind_to_library(&path).or_else(|e| {
            warn!("PDFIUM_LIB_PATH '{}' unusable ({:?}); trying system library", path, e);
            Pdfium::bind_to_system_library()
        }),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn load<'a>(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ExtractError::CorruptPdf(format!("{:?}", e)))
}

/// Text and images of one PDF.
///
/// A binding or load failure is reported on both sides; once the document is
/// open, unreadable pages and image objects are skipped.
pub fn extract(
    bytes: &[u8],
) -> (
    Result<String, ExtractError>,
    Result<Vec<ExtractedImage>, ExtractError>,
) {
    let pdfium = match bind_pdfium() {
        Ok(pdfium) => pdfium,
        Err(e) => return (Err(e.clone()), Err(e)),
    };
    let document = match load(&pdfium, bytes) {
        Ok(document) => document,
        Err(e) => return (Err(e.clone()), Err(e)),
    };
    info!("PDF loaded: {} pages", document.pages().len());

    (Ok(page_text(&document)), Ok(image_objects(&document)))
}

/// Text of the first [`MAX_TEXT_PAGES`] pages, one page per line block.
fn page_text(document: &PdfDocument<'_>) -> String {
    let mut texts = Vec::new();
    for (idx, page) in document.pages().iter().enumerate().take(MAX_TEXT_PAGES) {
        match page.text() {
            Ok(text) => texts.push(text.all()),
            Err(e) => {
                // An unreadable page contributes an empty block, like a blank one.
                warn!("Page {}: text unavailable: {:?}", idx + 1, e);
                texts.push(String::new());
            }
        }
    }
    texts.join("\n")
}

/// Up to [`MAX_IMAGES`] image objects from the first [`IMAGE_SCAN_PAGES`] pages.
///
/// Each image object is decoded by pdfium and re-encoded as PNG; encodings of
/// [`MAX_IMAGE_BYTES`] or more are skipped.
fn image_objects(document: &PdfDocument<'_>) -> Vec<ExtractedImage> {
    let mut images = Vec::new();

    'pages: for (idx, page) in document.pages().iter().enumerate().take(IMAGE_SCAN_PAGES) {
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };

            let raw = match image_object.get_raw_image() {
                Ok(img) => img,
                Err(e) => {
                    debug!("Page {}: image object not decodable: {:?}", idx + 1, e);
                    continue;
                }
            };

            let png = match encode_png(&raw) {
                Ok(png) => png,
                Err(e) => {
                    debug!("Page {}: PNG encoding failed: {}", idx + 1, e);
                    continue;
                }
            };
            if png.len() >= MAX_IMAGE_BYTES {
                debug!("Page {}: skipping {} byte image", idx + 1, png.len());
                continue;
            }

            images.push(ExtractedImage {
                bytes: png,
                mime_type: "image/png",
            });
            if images.len() >= MAX_IMAGES {
                break 'pages;
            }
        }
    }

    debug!("PDF: {} images extracted", images.len());
    images
}
