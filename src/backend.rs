//! Chat-completion backends.
//!
//! [`ChatBackend`] is the one seam between the pipeline and the network: the
//! captioner and the analysis client both speak to it, and tests swap in a
//! scripted implementation. Two production backends exist:
//!
//! * [`OpenAiCompatBackend`] — a direct `POST {base_url}/chat/completions`
//!   over reqwest, sending `response_format: {"type": "json_object"}` for
//!   JSON-mode requests.
//! * [`ProviderBackend`] — any `edgequake-llm` provider (OpenAI, Anthropic,
//!   Gemini, Ollama, …) chosen by name. JSON mode travels as
//!   `CompletionOptions::response_format`; providers without JSON mode
//!   ignore it.

use crate::error::{AnalysisError, DeckCoachError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// An image attached to a chat turn, already base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub base64: String,
    pub mime_type: &'static str,
}

impl InlineImage {
    /// Render as a `data:` URL for OpenAI-style `image_url` parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// One message of a chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub image: Option<InlineImage>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            image: None,
        }
    }

    pub fn user_with_image(text: impl Into<String>, image: InlineImage) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            image: Some(image),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            image: None,
        }
    }
}

/// A single chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: usize,
    /// Ask the endpoint for a JSON object reply.
    pub json_mode: bool,
}

/// The text content of a chat-completion reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Anything that can perform one chat completion.
///
/// Implementations must not retry: one call in, one result out.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, AnalysisError>;
}

// ── OpenAI-compatible HTTP backend ─────────────────────────────────────────

/// Direct client for any endpoint implementing the OpenAI chat-completions API.
pub struct OpenAiCompatBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiCompatBackend {
    /// Build a backend for `base_url` (e.g. `https://api.studio.nebius.ai/v1/`).
    ///
    /// `timeout_secs = None` keeps reqwest's default (no overall timeout).
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, DeckCoachError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| DeckCoachError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: completions_url(base_url),
            api_key: api_key.into(),
        })
    }

    /// The full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, AnalysisError> {
        let body = request_body(request);
        debug!(
            "POST {} model={} max_tokens={} json_mode={}",
            self.endpoint, request.model, request.max_tokens, request.json_mode
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport {
                backend: self.name().to_string(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| AnalysisError::Transport {
            backend: self.name().to_string(),
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(classify_status(self.name(), status.as_u16(), &text));
        }

        parse_completion(self.name(), &text)
    }
}

/// Join the base URL and the chat-completions path without doubling slashes.
fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Build the JSON request body for the OpenAI chat-completions API.
fn request_body(request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::System => "system",
                Role::User => "user",
            };
            let content = match &turn.image {
                None => Value::String(turn.text.clone()),
                Some(img) => json!([
                    { "type": "text", "text": turn.text },
                    { "type": "image_url", "image_url": { "url": img.data_url() } }
                ]),
            };
            json!({ "role": role, "content": content })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if let Some(top_p) = request.top_p {
        body["top_p"] = json!(top_p);
    }
    if request.json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

/// Map a non-success HTTP status to an [`AnalysisError`].
fn classify_status(backend: &str, status: u16, body: &str) -> AnalysisError {
    let detail = error_detail(body);
    match status {
        401 | 403 => AnalysisError::Auth {
            backend: backend.to_string(),
            detail,
        },
        429 => AnalysisError::RateLimited {
            backend: backend.to_string(),
        },
        _ => AnalysisError::Api {
            backend: backend.to_string(),
            status,
            detail,
        },
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.chars().count() > 200 {
                format!("{}…", trimmed.chars().take(200).collect::<String>())
            } else {
                trimmed.to_string()
            }
        })
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// Decode a chat-completions response body into a [`ChatReply`].
fn parse_completion(backend: &str, body: &str) -> Result<ChatReply, AnalysisError> {
    let parsed: CompletionBody =
        serde_json::from_str(body).map_err(|e| AnalysisError::Decode {
            detail: format!("response body: {e}"),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AnalysisError::EmptyReply {
            backend: backend.to_string(),
        })?;

    let (prompt_tokens, completion_tokens) = parsed
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((None, None));

    Ok(ChatReply {
        content,
        prompt_tokens,
        completion_tokens,
    })
}

// ── edgequake-llm provider backend ─────────────────────────────────────────

/// Adapter over an `edgequake-llm` provider.
///
/// The provider is bound to one model at construction time, so
/// `ChatRequest::model` is ignored here.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    /// Instantiate a named provider; its API key is read from the environment
    /// by `edgequake-llm` (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …).
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, DeckCoachError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            DeckCoachError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, provider_name))
    }
}

fn completion_options(request: &ChatRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        top_p: request.top_p,
        max_tokens: Some(request.max_tokens),
        response_format: request.json_mode.then(|| "json_object".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, AnalysisError> {
        let messages: Vec<ChatMessage> = request
            .messages
            .iter()
            .map(|turn| match (turn.role, &turn.image) {
                (Role::System, _) => ChatMessage::system(turn.text.as_str()),
                (Role::User, Some(img)) => ChatMessage::user_with_images(
                    turn.text.as_str(),
                    vec![ImageData::new(img.base64.clone(), img.mime_type)],
                ),
                (Role::User, None) => ChatMessage::user(turn.text.as_str()),
            })
            .collect();

        let options = completion_options(request);
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| AnalysisError::Transport {
                backend: self.label.clone(),
                detail: e.to_string(),
            })?;

        if response.content.trim().is_empty() {
            return Err(AnalysisError::EmptyReply {
                backend: self.label.clone(),
            });
        }

        Ok(ChatReply {
            content: response.content,
            prompt_tokens: Some(response.prompt_tokens as u64),
            completion_tokens: Some(response.completion_tokens as u64),
        })
    }
}
