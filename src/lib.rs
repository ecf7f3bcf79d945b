//! # deck-coach
//!
//! Rehearse a project defense: feed in a slide deck or PDF plus talk notes,
//! get back strengths, weaknesses, a fact-check table, a three-part speech
//! script and the questions a jury is likely to ask.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .pptx / .pdf + notes
//!  │
//!  ├─ 1. Input     wrap the upload, classify by extension
//!  ├─ 2. Extract   slide runs / page text + up to 3 embedded images
//!  ├─ 3. Caption   vision model, two requests in flight, ordered join
//!  ├─ 4. Assemble  captions + text (cut to 10 000 chars) + notes → prompt
//!  ├─ 5. Analyse   one JSON-mode chat call, reply cleaned and typed
//!  └─ 6. Present   four Markdown sections, placeholders for gaps
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deck_coach::{review, AnalysisClient, AnalysisConfig, Submission, Tone, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from DEEPSEEK_API_KEY.
//!     let config = AnalysisConfig::default();
//!     let client = AnalysisClient::from_config(&config)?;
//!
//!     let deck = UploadedDocument::from_path("talk.pptx")?;
//!     let submission = Submission::new(Some(deck), "").with_tone(Tone::Formal);
//!
//!     let output = review(&submission, &client, &config).await?;
//!     println!("{}", output.report.to_markdown());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deck-coach` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! PDF support needs libpdfium at runtime: set `PDFIUM_LIB_PATH` or install
//! it on the system library path. Slide decks need nothing extra.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod prompts;
pub mod review;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{AnalysisResult, FactCheckEntry, FactCheckItem, Field, Script, Verdict};
pub use backend::{
    ChatBackend, ChatReply, ChatRequest, ChatTurn, InlineImage, OpenAiCompatBackend,
    ProviderBackend, Role,
};
pub use client::AnalysisClient;
pub use config::{AnalysisConfig, AnalysisConfigBuilder, Tone};
pub use error::{AnalysisError, DeckCoachError, ExtractError};
pub use pipeline::extract::{ExtractedContent, ExtractedImage, Extraction};
pub use pipeline::input::{DocumentKind, UploadedDocument};
pub use present::{render, Report, Section};
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback, Stage};
pub use review::{
    review, review_to_file, write_report, ExtractionSummary, ReviewOutput, ReviewStats,
    Submission,
};
