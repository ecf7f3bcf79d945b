//! The analysis client: backend selection plus the two model calls.
//!
//! An [`AnalysisClient`] is built once from an [`AnalysisConfig`] and passed
//! to [`crate::review::review`] for every request. Building it is the only
//! place credentials are looked at, so a missing key surfaces as
//! [`DeckCoachError::ProviderNotConfigured`] before any work is done.

use crate::analysis::AnalysisResult;
use crate::backend::{ChatBackend, OpenAiCompatBackend, ProviderBackend};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, DeckCoachError};
use crate::pipeline::caption::caption_images;
use crate::pipeline::extract::ExtractedImage;
use crate::pipeline::llm::run_analysis;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Chat backends for the analysis call and for captions.
///
/// Both point at the same backend unless a named provider is used, since
/// those are bound to one model each.
#[derive(Clone)]
pub struct AnalysisClient {
    analysis: Arc<dyn ChatBackend>,
    captions: Arc<dyn ChatBackend>,
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("analysis", &self.analysis.name())
            .field("captions", &self.captions.name())
            .finish()
    }
}

impl AnalysisClient {
    /// Use one backend for both calls.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            analysis: Arc::clone(&backend),
            captions: backend,
        }
    }

    /// Pick a backend, most specific first:
    ///
    /// 1. `config.backend`
    /// 2. the OpenAI-compatible endpoint, when an API key resolves
    /// 3. the named `edgequake-llm` provider in `config.provider_name`
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, DeckCoachError> {
        if let Some(backend) = &config.backend {
            info!("Using injected backend '{}'", backend.name());
            return Ok(Self::new(Arc::clone(backend)));
        }

        if let Some(key) = config.resolve_api_key() {
            let backend =
                OpenAiCompatBackend::new(&config.base_url, key, config.request_timeout_secs)?;
            info!("Using OpenAI-compatible endpoint {}", backend.endpoint());
            return Ok(Self::new(Arc::new(backend)));
        }

        if let Some(name) = &config.provider_name {
            let analysis = ProviderBackend::from_name(name, &config.analysis_model)?;
            let captions = ProviderBackend::from_name(name, &config.caption_model)?;
            info!("Using provider '{}'", name);
            return Ok(Self {
                analysis: Arc::new(analysis),
                captions: Arc::new(captions),
            });
        }

        Err(DeckCoachError::ProviderNotConfigured {
            provider: config.base_url.clone(),
            hint: format!(
                "Set {} to an API key for the endpoint, or choose a provider with --provider.",
                config.api_key_env
            ),
        })
    }

    /// The backend used for the analysis call.
    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.analysis
    }

    /// Run the single analysis call on an assembled prompt.
    pub async fn analyze(
        &self,
        prompt: &str,
        config: &AnalysisConfig,
    ) -> Result<(AnalysisResult, Value), AnalysisError> {
        run_analysis(self.analysis.as_ref(), prompt, config).await
    }

    /// Caption `images`; never fails.
    pub async fn caption(&self, images: &[ExtractedImage], config: &AnalysisConfig) -> String {
        caption_images(self.captions.as_ref(), images, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChatReply, ChatRequest};
    use async_trait::async_trait;

    struct Named;

    #[async_trait]
    impl ChatBackend for Named {
        fn name(&self) -> &str {
            "named"
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<ChatReply, AnalysisError> {
            Ok(ChatReply::default())
        }
    }

    #[test]
    fn injected_backend_wins() {
        let config = AnalysisConfig::builder()
            .api_key("sk-test")
            .backend(Arc::new(Named))
            .build()
            .unwrap();
        let client = AnalysisClient::from_config(&config).unwrap();
        assert_eq!(client.backend().name(), "named");
    }

    #[test]
    fn api_key_selects_http_backend() {
        let config = AnalysisConfig::builder()
            .api_key("sk-test")
            .build()
            .unwrap();
        let client = AnalysisClient::from_config(&config).unwrap();
        assert_eq!(client.backend().name(), "openai-compatible");
    }

    #[test]
    fn nothing_configured_is_an_error() {
        let config = AnalysisConfig::builder()
            .api_key_env("DECK_COACH_TEST_KEY_THAT_IS_NEVER_SET")
            .build()
            .unwrap();
        let err = AnalysisClient::from_config(&config).unwrap_err();
        assert!(matches!(err, DeckCoachError::ProviderNotConfigured { .. }));
        assert!(err.to_string().contains("DECK_COACH_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
