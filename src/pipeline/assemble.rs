//! Prompt assembly: captions + document text + notes → analysis prompt.

use crate::config::Tone;
use crate::prompts::analysis_prompt;
use tracing::debug;

/// Appended to document text cut at the character ceiling.
pub const TRUNCATION_MARKER: &str = "\n... (text truncated to speed up processing)";

/// Separator between the project-text fragments.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Cut `text` to `limit` characters and append [`TRUNCATION_MARKER`].
///
/// Characters are Unicode scalar values; text at or under the limit is
/// returned unchanged.
pub fn truncate_document_text(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => {
            debug!("Document text cut to {} chars", limit);
            format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER)
        }
        None => text.to_string(),
    }
}

/// Join the non-empty fragments in order: captions, document text, notes.
///
/// A fragment of only whitespace counts as empty.
pub fn combine_fragments(captions: &str, document_text: &str, notes: &str) -> String {
    [captions, document_text, notes]
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

/// Build the full analysis prompt.
///
/// Only the document text is subject to `text_char_limit`; captions and
/// notes are passed through whole. Returns `None` when there is nothing to
/// analyse.
pub fn build_prompt(
    captions: &str,
    document_text: &str,
    notes: &str,
    text_char_limit: usize,
    tone: Tone,
) -> Option<String> {
    let document_text = truncate_document_text(document_text, text_char_limit);
    let project_text = combine_fragments(captions, &document_text, notes);
    if project_text.is_empty() {
        return None;
    }
    Some(analysis_prompt(&project_text, tone))
}
