//! Video transcript helpers.
//!
//! Transcripts arrive as text; these helpers turn a video URL into a stable
//! identifier and flatten segmented transcripts into one string.

use crate::error::{GrunnError, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            # Full YouTube URLs
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:[^&]*&)*v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        # Bare video ID (11 characters)
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex")
});

/// Extract a video ID from a YouTube URL or bare ID.
pub fn parse_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID.captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Flatten transcript segments into one text.
///
/// A single segment is returned unchanged; several are joined by one space.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    match segments {
        [only] => only.as_ref().to_string(),
        many => many
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[derive(Deserialize)]
struct TimedSegment {
    text: String,
}

/// Parse a transcript file.
///
/// Accepts a JSON array of `{"text": ...}` segments (extra fields such as
/// `start` and `duration` are ignored) or plain text.
pub fn parse_transcript(raw: &str) -> Result<String> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        let segments: Vec<TimedSegment> = serde_json::from_str(trimmed).map_err(|e| {
            GrunnError::Load(format!("transcript looks like JSON but is not a segment list: {}", e))
        })?;
        let texts: Vec<&str> = segments.iter().map(|s| s.text.trim()).collect();
        return Ok(join_segments(&texts));
    }
    Ok(raw.to_string())
}
