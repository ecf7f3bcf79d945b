//! Post-processing: deterministic cleanup of the model's JSON reply.
//!
//! JSON mode is a request, not a guarantee. Reasoning models prepend a
//! `<think>…</think>` block, some providers wrap the object in a ```` ```json ````
//! fence, and a few add a sentence of prose before or after it. These rules
//! remove exactly that packaging and never touch the object itself.
//!
//! ## Rule Order
//!
//! Invisible characters go first (a leading BOM defeats the fence regex),
//! then reasoning blocks, then fences. Falling back to the outermost brace
//! span is a parse-time decision, made only when the cleaned text is not
//! valid JSON on its own.

use crate::error::AnalysisError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Apply all cleanup rules to a raw reply.
pub fn clean_reply(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = strip_think_blocks(&s);
    strip_code_fences(&s)
}

/// Clean `raw` and parse it as JSON.
///
/// When the cleaned text does not parse, the outermost `{…}` span is tried
/// before giving up with [`AnalysisError::Decode`].
pub fn parse_reply(raw: &str) -> Result<Value, AnalysisError> {
    let cleaned = clean_reply(raw);
    let first_err = match serde_json::from_str::<Value>(&cleaned) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    if let Some(span) = outer_object_span(&cleaned) {
        if span.len() != cleaned.len() {
            if let Ok(v) = serde_json::from_str::<Value>(span) {
                debug!(
                    "Reply parsed after dropping {} chars of surrounding text",
                    cleaned.len() - span.len()
                );
                return Ok(v);
            }
        }
    }

    Err(AnalysisError::Decode {
        detail: first_err.to_string(),
    })
}

// ── Rule 1: Strip invisible characters ──────────────────────────────────────

/// Zero-width spaces, BOM and similar characters that break parsing.
static RE_INVISIBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{200B}\u{200C}\u{200D}\u{FEFF}\u{2060}]").expect("static regex")
});

fn remove_invisible_chars(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, "").to_string()
}

// ── Rule 2: Strip reasoning blocks ──────────────────────────────────────────

static RE_THINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex"));

fn strip_think_blocks(input: &str) -> String {
    let s = RE_THINK.replace_all(input, "");
    // An unterminated block means the reply was cut while still reasoning.
    match s.find("<think>") {
        Some(pos) => s[..pos].to_string(),
        None => s.into_owned(),
    }
}

// ── Rule 3: Strip outer code fences ─────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").expect("static regex")
});

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        caps[1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

// ── Fallback: outermost object ──────────────────────────────────────────────

fn outer_object_span(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (end > start).then(|| &input[start..=end])
}
