//! Error types for the deck-coach library.
//!
//! Three error types match the three ways a review can degrade:
//!
//! * [`DeckCoachError`] — **Fatal** for the current request: nothing to
//!   analyse, no backend configured, or the analysis call itself failed.
//!   Returned as `Err(DeckCoachError)` from [`crate::review::review`].
//!
//! * [`ExtractError`] — **Non-fatal**: the uploaded file could not be read
//!   (unsupported, corrupt, missing parts). Extraction yields empty content
//!   and the error is kept as a warning in [`crate::review::ReviewOutput`].
//!
//! * [`AnalysisError`] — the single chat-completion call failed. Wrapped into
//!   [`DeckCoachError::Analysis`] by the pipeline, which halts and asks the
//!   user to retry.
//!
//! Captioning failures have no error type of their own: they become a
//! placeholder caption for the affected image.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the deck-coach library.
#[derive(Debug, Error)]
pub enum DeckCoachError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Presentation file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read into memory.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the document nor the notes produced any text.
    #[error("Nothing to analyse: upload a presentation or enter some text.")]
    NothingToAnalyze,

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No chat backend could be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The analysis call failed; the user should retry later.
    #[error("Analysis failed: {0}\nCheck the API key and try again later.")]
    Analysis(#[from] AnalysisError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal extraction failure.
///
/// The extractor never propagates these; it records them next to whatever
/// (possibly empty) content it managed to read.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractError {
    /// The declared extension is neither `.pptx` nor `.pdf`.
    #[error("Unsupported file type '{extension}' (expected .pptx or .pdf)")]
    UnsupportedFormat { extension: String },

    /// The slide deck is not a readable ZIP container.
    #[error("Could not open the presentation archive: {0}")]
    Archive(String),

    /// A part the slide deck refers to is missing from the archive.
    #[error("Presentation part '{part}' is missing or unreadable: {detail}")]
    MissingPart { part: String, detail: String },

    /// Slide XML could not be parsed.
    #[error("Malformed slide XML in '{part}': {detail}")]
    Xml { part: String, detail: String },

    /// No pdfium library could be bound.
    #[error("PDF engine unavailable: {0}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium.")]
    PdfiumUnavailable(String),

    /// pdfium rejected the document.
    #[error("Could not read the PDF: {0}")]
    CorruptPdf(String),

    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Failure of the single analysis (or caption) chat call.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// Connection, TLS or timeout failure before a response arrived.
    #[error("request to '{backend}' failed: {detail}")]
    Transport { backend: String, detail: String },

    /// HTTP 401/403 — the key is wrong or lacks access.
    #[error("authentication rejected by '{backend}': {detail}")]
    Auth { backend: String, detail: String },

    /// HTTP 429.
    #[error("rate limit exceeded for '{backend}'")]
    RateLimited { backend: String },

    /// Any other non-success response.
    #[error("'{backend}' returned HTTP {status}: {detail}")]
    Api {
        backend: String,
        status: u16,
        detail: String,
    },

    /// The response carried no message content.
    #[error("'{backend}' returned an empty reply")]
    EmptyReply { backend: String },

    /// The reply (or its message content) is not the expected JSON.
    #[error("could not decode the model reply as JSON: {detail}")]
    Decode { detail: String },
}
