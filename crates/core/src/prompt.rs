//! Prompt construction for poster generation requests.

use crate::queue_item::{MediaKind, QueueItem};

/// Poster canvas width in pixels (2:3 one-sheet aspect).
pub const POSTER_WIDTH: u32 = 1024;
/// Poster canvas height in pixels.
pub const POSTER_HEIGHT: u32 = 1536;

/// Inference steps per generation. The SD service runs a turbo-class
/// model; four steps is its native operating point.
pub const INFERENCE_STEPS: u32 = 4;
/// Guidance scale. Turbo-class models are trained for ~1.0.
pub const GUIDANCE_SCALE: f64 = 1.0;

/// Fixed negative prompt listing the usual generation artifacts.
pub const NEGATIVE_PROMPT: &str = "blurry, low quality, low resolution, jpeg artifacts, \
     watermark, text, words, letters, logo, signature, border, frame, \
     deformed, disfigured, bad anatomy, extra limbs, duplicate, ugly";

/// Build the positive prompt for one media item.
///
/// Wording depends on the media kind ("film" vs "TV series") and the
/// job's style identifier. The year is included when known. The
/// trailing no-text clauses matter: poster models love to hallucinate
/// typography, and the media server overlays its own titles anyway.
pub fn build_prompt(item: &QueueItem, style: &str) -> String {
    let kind = match item.media_kind {
        MediaKind::Movie => "film",
        MediaKind::Show => "TV series",
    };

    let subject = match (&item.title, item.year) {
        (Some(title), Some(year)) => format!("{title} ({year})"),
        (Some(title), None) => title.clone(),
        (None, _) => format!("media item {}", item.rating_key),
    };

    format!(
        "alternative {kind} poster artwork for {subject}, {style} style, \
         dramatic composition, high contrast lighting, cinematic atmosphere, \
         bold color palette, professional key art, detailed illustration, \
         no text, no logos, no watermarks, no typography"
    )
}
