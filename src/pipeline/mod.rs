//! Pipeline stages for a presentation review.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ caption ──▶ assemble ──▶ llm ──▶ (present)
//! (bytes)   (pptx/pdf)  (vision)    (prompt)     (JSON)
//! ```
//!
//! 1. [`input`]    — wrap the uploaded bytes and classify them by extension
//! 2. [`extract`]  — dispatch to [`pptx`] or [`pdf`]; never fails, only warns
//! 3. [`caption`]  — caption up to [`MAX_IMAGES`] images, two at a time
//! 4. [`assemble`] — join fragments, cut document text, wrap in the template
//! 5. [`llm`]      — the single analysis call, cleaned by [`postprocess`]
//!
//! The caps below bound latency and request size no matter how large the
//! uploaded file is.

pub mod assemble;
pub mod caption;
pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod pdf;
pub mod postprocess;
pub mod pptx;

/// Maximum number of images passed on to the captioner.
pub const MAX_IMAGES: usize = 3;

/// Images must be strictly smaller than this many bytes.
pub const MAX_IMAGE_BYTES: usize = 500_000;

/// Only the first this-many slides or pages are scanned for images.
pub const IMAGE_SCAN_PAGES: usize = 6;

/// Only the first this-many PDF pages contribute text.
pub const MAX_TEXT_PAGES: usize = 10;

/// Base64 payload budget per caption request, in characters.
pub const CAPTION_PAYLOAD_LIMIT: usize = 15_000;

/// Caption requests in flight at once.
pub const CAPTION_WORKERS: usize = 2;
