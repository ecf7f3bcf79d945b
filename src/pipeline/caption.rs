//! Image captioning: one short vision-model description per image.
//!
//! Images are captioned concurrently, [`CAPTION_WORKERS`] at a time, through
//! `futures::StreamExt::buffered`, which yields results in submission order.
//! Each request owns its failure: an error becomes that image's placeholder
//! line and never reaches the join, so N images always produce N lines.

use crate::backend::{ChatBackend, ChatRequest, ChatTurn, InlineImage};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::pipeline::encode::encode_for_caption;
use crate::pipeline::extract::ExtractedImage;
use crate::pipeline::{CAPTION_PAYLOAD_LIMIT, CAPTION_WORKERS, MAX_IMAGES};
use crate::prompts::caption_prompt;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// Caption body used when the request for an image fails.
pub const CAPTION_FAILED: &str = "processing failed";

/// Note appended to the caption prompt when the payload had to be cut.
pub const TRUNCATED_NOTE: &str = " (truncated)";

/// Caption up to [`MAX_IMAGES`] images.
///
/// Returns `"Image #i: <caption>"` lines joined by `\n`, in image order, or
/// an empty string when there are no images.
pub async fn caption_images(
    backend: &dyn ChatBackend,
    images: &[ExtractedImage],
    config: &AnalysisConfig,
) -> String {
    let images = &images[..images.len().min(MAX_IMAGES)];
    if images.is_empty() {
        return String::new();
    }
    let total = images.len();

    let lines: Vec<String> = stream::iter(images.iter().enumerate())
        .map(|(i, image)| async move {
            let index = i + 1;
            let result = caption_one(backend, image, index, config).await;
            if let Some(cb) = &config.progress_callback {
                cb.on_caption_complete(index, total, result.is_ok());
            }
            match result {
                Ok(caption) => format!("Image #{index}: {caption}"),
                Err(e) => {
                    warn!("Caption for image #{} failed: {}", index, e);
                    format!("Image #{index}: {CAPTION_FAILED}")
                }
            }
        })
        .buffered(CAPTION_WORKERS)
        .collect()
        .await;

    lines.join("\n")
}

async fn caption_one(
    backend: &dyn ChatBackend,
    image: &ExtractedImage,
    index: usize,
    config: &AnalysisConfig,
) -> Result<String, AnalysisError> {
    let payload = encode_for_caption(&image.bytes, CAPTION_PAYLOAD_LIMIT);

    // A cut base64 string is not a decodable image; send the prompt alone.
    let turn = if payload.truncated {
        ChatTurn::user(caption_prompt(index, TRUNCATED_NOTE))
    } else {
        ChatTurn::user_with_image(
            caption_prompt(index, ""),
            InlineImage {
                base64: payload.base64,
                mime_type: image.mime_type,
            },
        )
    };

    let request = ChatRequest {
        model: config.caption_model.clone(),
        messages: vec![turn],
        temperature: config.caption_temperature,
        top_p: None,
        max_tokens: config.caption_max_tokens,
        json_mode: false,
    };

    let reply = backend.complete(&request).await?;
    let caption = reply.content.trim();
    if caption.is_empty() {
        return Err(AnalysisError::EmptyReply {
            backend: backend.name().to_string(),
        });
    }
    debug!("Image #{}: {} char caption", index, caption.chars().count());
    Ok(caption.to_string())
}
