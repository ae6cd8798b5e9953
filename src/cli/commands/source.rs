//! Turning a command-line source into an index.

use crate::cli::{Output, SourceArgs};
use crate::error::{GrunnError, Result};
use crate::loader::transcript::{parse_transcript, parse_video_id};
use crate::loader::{ContentMode, SourceContent};
use crate::orchestrator::Orchestrator;
use crate::vector_store::VectorIndex;
use std::path::Path;

/// An index ready for questions.
pub(crate) struct OpenedSource {
    pub id: String,
    pub mode: ContentMode,
    pub index: VectorIndex,
}

/// Read a transcript file for a video.
pub(crate) fn read_transcript(video: &str, path: &Path) -> Result<SourceContent> {
    let video_id = parse_video_id(video).ok_or_else(|| {
        GrunnError::InvalidInput(format!("'{}' is not a YouTube URL or video ID", video))
    })?;

    let raw = std::fs::read_to_string(path).map_err(|e| {
        GrunnError::Load(format!("Failed to read transcript {}: {}", path.display(), e))
    })?;
    let text = parse_transcript(&raw)?;

    Ok(SourceContent::transcript(&video_id, &text))
}

/// Build or fetch the index for `args`.
///
/// A file is indexed on the spot. A video needs `--transcript` unless its
/// transcript was ingested before.
pub(crate) async fn open(orchestrator: &Orchestrator, args: &SourceArgs) -> Result<OpenedSource> {
    let path = Path::new(&args.source);

    let content = if path.is_file() {
        SourceContent::from_path(path)?
    } else if let Some(transcript) = &args.transcript {
        read_transcript(&args.source, transcript)?
    } else {
        let video_id = parse_video_id(&args.source).ok_or_else(|| {
            GrunnError::InvalidInput(format!(
                "'{}' is neither a file nor a YouTube URL or video ID",
                args.source
            ))
        })?;

        let index = orchestrator.cached_index(&video_id)?.ok_or_else(|| {
            GrunnError::InvalidInput(format!(
                "No transcript indexed for {}. Run: grunn ingest --video {} --transcript <file>",
                video_id, video_id
            ))
        })?;

        return Ok(OpenedSource {
            id: video_id,
            mode: ContentMode::VideoTranscript,
            index,
        });
    };

    let spinner = Output::spinner(&format!("Indexing {}...", content.identifier));
    let outcome = orchestrator.get_or_build(&content).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if outcome.index.is_empty() {
        Output::warning(&format!("{} contains no text", content.identifier));
    }

    Ok(OpenedSource {
        id: content.identifier.clone(),
        mode: content.mode(),
        index: outcome.index,
    })
}
