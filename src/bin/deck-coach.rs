//! CLI binary for deck-coach.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig` and a `Submission`, then prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use deck_coach::prompts::EXAMPLE_NOTES;
use deck_coach::{
    review, write_report, AnalysisClient, AnalysisConfig, ProgressCallback,
    ReviewProgressCallback, Stage, Submission, Tone, UploadedDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one timing line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        let (prefix, msg) = match stage {
            Stage::Extraction => ("Reading", "extracting text and images…"),
            Stage::Captioning => ("Looking", "captioning images…"),
            Stage::Analysis => ("Analysing", "waiting for the model…"),
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn on_stage_complete(&self, stage: Stage, elapsed: Duration) {
        self.bar.println(format!(
            "  {} {}",
            dim("⏱"),
            dim(&format!("{stage} took {:.1}s", elapsed.as_secs_f64()))
        ));
    }

    fn on_caption_complete(&self, index: usize, total: usize, ok: bool) {
        let mark = if ok { green("✓") } else { yellow("⚠") };
        self.bar
            .println(format!("  {mark} image {index}/{total}"));
    }

    fn on_warning(&self, message: &str) {
        self.bar.println(format!("  {} {}", yellow("⚠"), message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review a slide deck (Markdown on stdout)
  deck-coach talk.pptx

  # Deck plus talk notes, formal script, report to a file
  deck-coach talk.pdf --notes-file speech.txt --tone formal -o review.md

  # Notes only
  deck-coach --notes "Our robot picks up objects."

  # Try it with the built-in example talk
  deck-coach --example

  # Raw JSON reply plus stats
  deck-coach talk.pptx --json > review.json

  # Any OpenAI-compatible endpoint
  deck-coach talk.pptx --base-url http://localhost:8000/v1/ --model my-model

  # A named provider instead (key read by the provider, e.g. OPENAI_API_KEY)
  deck-coach talk.pptx --provider openai --model gpt-4.1-mini --caption-model gpt-4.1-mini

ENVIRONMENT VARIABLES:
  DEEPSEEK_API_KEY        API key for the OpenAI-compatible endpoint
  DECK_COACH_*            Defaults for most flags (see --help for each)
  PDFIUM_LIB_PATH         Path to libpdfium, needed for .pdf input
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Review a project presentation with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "deck-coach",
    version,
    about = "Review a project presentation: strengths, fact-checks, a speech script and tricky questions",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Presentation to review (.pptx or .pdf).
    file: Option<PathBuf>,

    /// Talk notes typed on the command line.
    #[arg(long, env = "DECK_COACH_NOTES", conflicts_with = "notes_file")]
    notes: Option<String>,

    /// Read talk notes from a text file.
    #[arg(long, env = "DECK_COACH_NOTES_FILE")]
    notes_file: Option<PathBuf>,

    /// Use the built-in example talk as notes.
    #[arg(long, conflicts_with_all = ["notes", "notes_file"])]
    example: bool,

    /// Style of the speech script.
    #[arg(long, env = "DECK_COACH_TONE", value_enum, default_value = "inspiring")]
    tone: ToneArg,

    /// Model that writes the analysis.
    #[arg(long, env = "DECK_COACH_MODEL")]
    model: Option<String>,

    /// Vision model that captions images.
    #[arg(long, env = "DECK_COACH_CAPTION_MODEL")]
    caption_model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "DECK_COACH_BASE_URL")]
    base_url: Option<String>,

    /// Named provider (openai, anthropic, gemini, ollama, …), used when no
    /// endpoint key is set.
    #[arg(long, env = "DECK_COACH_PROVIDER")]
    provider: Option<String>,

    /// Skip image captioning.
    #[arg(long, env = "DECK_COACH_NO_CAPTIONS")]
    no_captions: bool,

    /// Sampling temperature of the analysis call.
    #[arg(long, env = "DECK_COACH_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    /// Output-token ceiling of the analysis call.
    #[arg(long, env = "DECK_COACH_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// HTTP request timeout in seconds (default: none).
    #[arg(long, env = "DECK_COACH_TIMEOUT")]
    timeout: Option<u64>,

    /// Print the raw JSON reply and stats instead of Markdown.
    #[arg(long, env = "DECK_COACH_JSON")]
    json: bool,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "DECK_COACH_OUTPUT")]
    output: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DECK_COACH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DECK_COACH_QUIET")]
    quiet: bool,

    /// Disable the spinner.
    #[arg(long, env = "DECK_COACH_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ToneArg {
    Inspiring,
    Formal,
    PopularScience,
}

impl From<ToneArg> for Tone {
    fn from(v: ToneArg) -> Self {
        match v {
            ToneArg::Inspiring => Tone::Inspiring,
            ToneArg::Formal => Tone::Formal,
            ToneArg::PopularScience => Tone::PopularScience,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inputs ───────────────────────────────────────────────────────────
    let document = match &cli.file {
        Some(path) => Some(
            UploadedDocument::from_path(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => None,
    };
    let notes = read_notes(&cli).await?;
    if document.is_none() && notes.trim().is_empty() {
        anyhow::bail!("Nothing to review: pass a .pptx/.pdf file, --notes, --notes-file or --example");
    }

    // ── Config + client ──────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ReviewProgressCallback>),
    )?;
    let client = AnalysisClient::from_config(&config).context("No LLM backend available")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let submission = Submission::new(document, notes).with_tone(cli.tone.into());
    let result = review(&submission, &client, &config).await;
    if let Some(cb) = &progress {
        cb.finish();
    }
    let output = result.context("Review failed")?;

    let rendered = if cli.json {
        let json = serde_json::json!({
            "analysis": output.raw,
            "captions": output.captions,
            "warnings": output.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
            "stats": output.stats,
        });
        let mut s = serde_json::to_string_pretty(&json).context("Failed to serialise output")?;
        s.push('\n');
        s
    } else {
        output.report.to_markdown()
    };

    if let Some(ref path) = cli.output {
        write_report(path, &rendered)
            .await
            .context("Failed to write report")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}ms  →  {}",
                green("✔"),
                output.stats.total_ms,
                bold(&path.display().to_string())
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !show_progress && !output.warnings.is_empty() {
        for w in &output.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
    }

    Ok(())
}

/// Notes from `--notes`, `--notes-file` or `--example`, in that order.
async fn read_notes(cli: &Cli) -> Result<String> {
    if let Some(ref notes) = cli.notes {
        return Ok(notes.clone());
    }
    if let Some(ref path) = cli.notes_file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read notes from {:?}", path));
    }
    if cli.example {
        return Ok(EXAMPLE_NOTES.to_string());
    }
    Ok(String::new())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .tone(cli.tone.into())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .caption_images(!cli.no_captions);

    if let Some(ref model) = cli.model {
        builder = builder.analysis_model(model);
    }
    if let Some(ref model) = cli.caption_model {
        builder = builder.caption_model(model);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
