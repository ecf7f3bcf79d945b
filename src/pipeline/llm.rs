//! The analysis call: one JSON-mode chat completion, parsed and typed.
//!
//! This module is intentionally thin: the wording lives in
//! [`crate::prompts`], reply cleanup in [`super::postprocess`]. There is no
//! retry; a failed call is reported to the caller, who asks the user to try
//! again.

use crate::analysis::AnalysisResult;
use crate::backend::{ChatBackend, ChatRequest, ChatTurn};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::pipeline::postprocess::parse_reply;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

/// Build the analysis request: the whole prompt as a single user turn.
pub fn analysis_request(prompt: &str, config: &AnalysisConfig) -> ChatRequest {
    ChatRequest {
        model: config.analysis_model.clone(),
        messages: vec![ChatTurn::user(prompt)],
        temperature: config.temperature,
        top_p: Some(config.top_p),
        max_tokens: config.max_tokens,
        json_mode: true,
    }
}

/// Send `prompt` and return the typed result with the raw JSON it came from.
pub async fn run_analysis(
    backend: &dyn ChatBackend,
    prompt: &str,
    config: &AnalysisConfig,
) -> Result<(AnalysisResult, Value), AnalysisError> {
    let request = analysis_request(prompt, config);
    let start = Instant::now();

    let reply = backend.complete(&request).await?;
    debug!(
        "Analysis: {:?} input tokens, {:?} output tokens, {:?}",
        reply.prompt_tokens,
        reply.completion_tokens,
        start.elapsed()
    );
    if reply.content.trim().is_empty() {
        return Err(AnalysisError::EmptyReply {
            backend: backend.name().to_string(),
        });
    }

    let value = parse_reply(&reply.content)?;
    let result = AnalysisResult::from_value(&value);
    info!(
        "Analysis parsed via {} ({} of 5 fields complete)",
        backend.name(),
        [
            result.strengths.is_present(),
            result.weaknesses.is_present(),
            result.fact_check.is_present(),
            result.storytelling_script.is_present(),
            result.tricky_questions.is_present(),
        ]
        .iter()
        .filter(|p| **p)
        .count()
    );
    Ok((result, value))
}
