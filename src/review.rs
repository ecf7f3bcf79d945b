//! Top-level review orchestration.
//!
//! [`review`] runs the whole pipeline for one submission: extraction,
//! captioning, prompt assembly, the analysis call and rendering. Extraction
//! and captioning only degrade; the analysis call is the one step whose
//! failure ends the request with an error.

use crate::analysis::AnalysisResult;
use crate::client::AnalysisClient;
use crate::config::{AnalysisConfig, Tone};
use crate::error::{DeckCoachError, ExtractError};
use crate::pipeline::assemble::build_prompt;
use crate::pipeline::extract::{extract, Extraction};
use crate::pipeline::input::{DocumentKind, UploadedDocument};
use crate::present::{render, Report};
use crate::progress::Stage;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the user handed in for one review.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// The uploaded presentation, if any.
    pub document: Option<UploadedDocument>,
    /// Free-typed talk notes; may be empty.
    pub notes: String,
    /// Overrides [`AnalysisConfig::tone`] for this request.
    pub tone: Option<Tone>,
}

impl Submission {
    pub fn new(document: Option<UploadedDocument>, notes: impl Into<String>) -> Self {
        Self {
            document,
            notes: notes.into(),
            tone: None,
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }
}

/// What extraction produced, without the bytes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionSummary {
    pub document: Option<String>,
    pub kind: Option<String>,
    pub text_chars: usize,
    pub images_found: usize,
    pub images_captioned: usize,
}

/// Per-stage timings and counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewStats {
    pub tone: Tone,
    pub extraction: ExtractionSummary,
    pub prompt_chars: usize,
    pub extraction_ms: u64,
    pub captioning_ms: u64,
    pub analysis_ms: u64,
    pub total_ms: u64,
}

/// Everything one review produced.
#[derive(Debug, Clone)]
pub struct ReviewOutput {
    pub analysis: AnalysisResult,
    /// The parsed JSON reply, as returned by the model.
    pub raw: Value,
    pub report: Report,
    /// The assembled prompt that was sent.
    pub prompt: String,
    /// Caption lines, empty when no image was captioned.
    pub captions: String,
    pub warnings: Vec<ExtractError>,
    pub stats: ReviewStats,
}

/// Review one submission.
///
/// # Errors
/// * [`DeckCoachError::NothingToAnalyze`] when neither the document nor the
///   notes yield any text.
/// * [`DeckCoachError::Analysis`] when the analysis call fails.
pub async fn review(
    submission: &Submission,
    client: &AnalysisClient,
    config: &AnalysisConfig,
) -> Result<ReviewOutput, DeckCoachError> {
    let total_start = Instant::now();
    let tone = submission.tone.unwrap_or(config.tone);
    let mut stats = ReviewStats {
        tone,
        ..Default::default()
    };

    // ── Extraction ──────────────────────────────────────────────────────────
    let extraction = match &submission.document {
        Some(document) => {
            stats.extraction.document = Some(document.name.clone());
            stats.extraction.kind = Some(kind_label(&document.kind));
            let (extraction, elapsed) =
                timed_stage(config, Stage::Extraction, extract(document)).await;
            stats.extraction_ms = elapsed.as_millis() as u64;
            extraction
        }
        None => Extraction::default(),
    };
    for warning in &extraction.warnings {
        if let Some(cb) = &config.progress_callback {
            cb.on_warning(&warning.to_string());
        }
    }
    let Extraction { content, warnings } = extraction;
    stats.extraction.text_chars = content.text.chars().count();
    stats.extraction.images_found = content.images.len();

    // ── Captioning ──────────────────────────────────────────────────────────
    let captions = if config.caption_images && !content.images.is_empty() {
        let (captions, elapsed) = timed_stage(
            config,
            Stage::Captioning,
            client.caption(&content.images, config),
        )
        .await;
        stats.captioning_ms = elapsed.as_millis() as u64;
        stats.extraction.images_captioned = content.images.len();
        captions
    } else {
        if !content.images.is_empty() {
            debug!("Captioning disabled; {} images ignored", content.images.len());
        }
        String::new()
    };

    // ── Prompt ──────────────────────────────────────────────────────────────
    let prompt = build_prompt(
        &captions,
        &content.text,
        &submission.notes,
        config.text_char_limit,
        tone,
    )
    .ok_or(DeckCoachError::NothingToAnalyze)?;
    stats.prompt_chars = prompt.chars().count();
    debug!("Prompt assembled: {} chars", stats.prompt_chars);

    // ── Analysis ────────────────────────────────────────────────────────────
    let (result, elapsed) =
        timed_stage(config, Stage::Analysis, client.analyze(&prompt, config)).await;
    stats.analysis_ms = elapsed.as_millis() as u64;
    let (analysis, raw) = result.map_err(|e| {
        warn!("Analysis failed: {}", e);
        DeckCoachError::from(e)
    })?;

    let report = render(&analysis, tone);
    stats.total_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Review complete in {}ms ({} warnings)",
        stats.total_ms,
        warnings.len()
    );

    Ok(ReviewOutput {
        analysis,
        raw,
        report,
        prompt,
        captions,
        warnings,
        stats,
    })
}

/// Review a submission and write the Markdown report to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn review_to_file(
    submission: &Submission,
    client: &AnalysisClient,
    config: &AnalysisConfig,
    output_path: impl AsRef<Path>,
) -> Result<ReviewOutput, DeckCoachError> {
    let output = review(submission, client, config).await?;
    write_report(output_path, &output.report.to_markdown()).await?;
    Ok(output)
}

/// Atomically write `contents` to `path`, creating parent directories.
pub async fn write_report(path: impl AsRef<Path>, contents: &str) -> Result<(), DeckCoachError> {
    let path = path.as_ref();
    let write_err = |e| DeckCoachError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

async fn timed_stage<F, T>(config: &AnalysisConfig, stage: Stage, fut: F) -> (T, Duration)
where
    F: std::future::Future<Output = T>,
{
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    info!("{} took {:.1}s", stage, elapsed.as_secs_f64());
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_complete(stage, elapsed);
    }
    (out, elapsed)
}

fn kind_label(kind: &DocumentKind) -> String {
    match kind {
        DocumentKind::Pptx => "pptx".to_string(),
        DocumentKind::Pdf => "pdf".to_string(),
        DocumentKind::Unsupported(ext) => format!("unsupported ({ext})"),
    }
}
