//! Configuration types for a presentation review.
//!
//! Every knob of the pipeline lives in [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. The near-duplicate variants of this tool used
//! slightly different model names, token ceilings and thresholds; here they
//! are plain defaults that callers may override.
//!
//! Extraction caps (images, image size, pages scanned) are not configurable:
//! they bound latency and payload size regardless of input, see
//! [`crate::pipeline`].

use crate::backend::ChatBackend;
use crate::error::DeckCoachError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// OpenAI-compatible endpoint used when no base URL is given.
pub const DEFAULT_BASE_URL: &str = "https://api.studio.nebius.ai/v1/";

/// Environment variable holding the API key for [`DEFAULT_BASE_URL`].
pub const DEFAULT_API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Text model that produces the JSON analysis.
pub const DEFAULT_ANALYSIS_MODEL: &str = "deepseek-ai/DeepSeek-V3";

/// Vision model that captions embedded images.
pub const DEFAULT_CAPTION_MODEL: &str = "google/gemma-3-27b-it";

/// Character ceiling applied to extracted document text.
pub const DEFAULT_TEXT_CHAR_LIMIT: usize = 10_000;

/// Configuration for one review run.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use deck_coach::{AnalysisConfig, Tone};
///
/// let config = AnalysisConfig::builder()
///     .tone(Tone::Formal)
///     .max_tokens(2500)
///     .caption_images(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.tone, Tone::Formal);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model that writes the analysis. Default: [`DEFAULT_ANALYSIS_MODEL`].
    pub analysis_model: String,

    /// Vision model used for image captions. Default: [`DEFAULT_CAPTION_MODEL`].
    pub caption_model: String,

    /// Base URL of the OpenAI-compatible endpoint. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Explicit API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,

    /// Name of the environment variable read when `api_key` is `None`.
    pub api_key_env: String,

    /// Named `edgequake-llm` provider (e.g. "openai", "ollama"), used when
    /// no API key for the compatible endpoint is available.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over everything else.
    pub backend: Option<Arc<dyn ChatBackend>>,

    /// Sampling temperature for the analysis call. Default: 0.5.
    pub temperature: f32,

    /// Nucleus sampling for the analysis call. Default: 0.8.
    pub top_p: f32,

    /// Output-token ceiling for the analysis call. Default: 2000.
    ///
    /// The five-section JSON for a typical school project stays well under
    /// this; a lower value risks a reply cut off mid-object.
    pub max_tokens: usize,

    /// Sampling temperature for captions. Default: 0.3.
    pub caption_temperature: f32,

    /// Output-token ceiling per caption. Default: 150.
    pub caption_max_tokens: usize,

    /// Caption embedded images before analysis. Default: true.
    pub caption_images: bool,

    /// Character ceiling for extracted document text. Default: 10 000.
    pub text_char_limit: usize,

    /// Narrative tone of the speech script. Default: [`Tone::Inspiring`].
    pub tone: Tone,

    /// Per-request timeout for the HTTP backend. Default: none (library default).
    pub request_timeout_secs: Option<u64>,

    /// Optional stage-progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            caption_model: DEFAULT_CAPTION_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            provider_name: None,
            backend: None,
            temperature: 0.5,
            top_p: 0.8,
            max_tokens: 2000,
            caption_temperature: 0.3,
            caption_max_tokens: 150,
            caption_images: true,
            text_char_limit: DEFAULT_TEXT_CHAR_LIMIT,
            tone: Tone::default(),
            request_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("analysis_model", &self.analysis_model)
            .field("caption_model", &self.caption_model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("caption_images", &self.caption_images)
            .field("text_char_limit", &self.text_char_limit)
            .field("tone", &self.tone)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API key for the compatible endpoint, if one is configured.
    ///
    /// Empty strings count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn analysis_model(mut self, model: impl Into<String>) -> Self {
        self.config.analysis_model = model.into();
        self
    }

    pub fn caption_model(mut self, model: impl Into<String>) -> Self {
        self.config.caption_model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.api_key_env = var.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn caption_temperature(mut self, t: f32) -> Self {
        self.config.caption_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn caption_max_tokens(mut self, n: usize) -> Self {
        self.config.caption_max_tokens = n;
        self
    }

    pub fn caption_images(mut self, v: bool) -> Self {
        self.config.caption_images = v;
        self
    }

    pub fn text_char_limit(mut self, n: usize) -> Self {
        self.config.text_char_limit = n;
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.config.tone = tone;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, DeckCoachError> {
        let c = &self.config;
        if c.max_tokens == 0 || c.caption_max_tokens == 0 {
            return Err(DeckCoachError::InvalidConfig(
                "Token ceilings must be ≥ 1".into(),
            ));
        }
        if c.text_char_limit == 0 {
            return Err(DeckCoachError::InvalidConfig(
                "Text character limit must be ≥ 1".into(),
            ));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(DeckCoachError::InvalidConfig(format!(
                "Base URL must be HTTP or HTTPS, got '{}'",
                c.base_url
            )));
        }
        if c.analysis_model.trim().is_empty() {
            return Err(DeckCoachError::InvalidConfig(
                "Analysis model must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Narrative style of the generated speech script.
///
/// The tone only changes the phrasing instructions in the prompt; the JSON
/// schema the model is asked for is identical for every tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    /// Vivid, energetic, aimed at winning the audience. (default)
    #[default]
    Inspiring,
    /// Restrained, precise, suited to a jury or committee.
    Formal,
    /// Accessible explanations for a non-specialist audience.
    PopularScience,
}

impl Tone {
    /// All tones, in selector order.
    pub const ALL: [Tone; 3] = [Tone::Inspiring, Tone::Formal, Tone::PopularScience];

    /// Human-readable label, as shown in the style selector.
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Inspiring => "Inspiring",
            Tone::Formal => "Formal",
            Tone::PopularScience => "Popular science",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = DeckCoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match norm.as_str() {
            "inspiring" => Ok(Tone::Inspiring),
            "formal" => Ok(Tone::Formal),
            "popularscience" | "popular" => Ok(Tone::PopularScience),
            _ => Err(DeckCoachError::InvalidConfig(format!(
                "Unknown tone '{}': expected inspiring, formal or popular-science",
                s
            ))),
        }
    }
}
