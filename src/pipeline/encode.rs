//! Image encoding helpers shared by the extractors and the captioner.
//!
//! * PDF image objects come out of pdfium as decoded bitmaps and are
//!   re-encoded to PNG so every extracted image is a self-contained file.
//! * Slide-deck media is passed through untouched, but only if its magic
//!   bytes identify a raster format a vision model can read (no EMF/WMF).
//! * Caption requests carry the image as base64 with a hard size budget.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Base64 payload for one caption request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionPayload {
    pub base64: String,
    /// `true` when the encoding exceeded the budget and was cut.
    pub truncated: bool,
}

/// Base64-encode `bytes`, hard-truncating the encoding at `limit` characters.
pub fn encode_for_caption(bytes: &[u8], limit: usize) -> CaptionPayload {
    let mut b64 = STANDARD.encode(bytes);
    let truncated = b64.len() > limit;
    if truncated {
        // base64 output is pure ASCII, so any byte index is a char boundary.
        b64.truncate(limit);
    }
    debug!(
        "Encoded image: {} bytes → {} base64 chars (truncated: {})",
        bytes.len(),
        b64.len(),
        truncated
    );
    CaptionPayload {
        base64: b64,
        truncated,
    }
}

/// Encode a decoded bitmap as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Identify a raster image by its magic bytes.
pub fn sniff_raster_mime(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    if bytes.starts_with(PNG) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        Some("image/tiff")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}
