//! Ingest command implementation.

use super::source::read_transcript;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::loader::SourceContent;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the ingest command.
pub async fn run_ingest(
    file: Option<PathBuf>,
    video: Option<String>,
    transcript: Option<PathBuf>,
    force: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let content = match (file, video, transcript) {
        (Some(path), _, _) => SourceContent::from_path(&path)?,
        (None, Some(video), Some(transcript)) => read_transcript(&video, &transcript)?,
        _ => anyhow::bail!("Give a file, or --video together with --transcript"),
    };

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Indexing {}...", content.identifier));
    let result = if force {
        orchestrator.rebuild(&content).await
    } else {
        orchestrator.get_or_build(&content).await
    };
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            if outcome.cache_hit {
                Output::success(&format!(
                    "{} is already indexed ({} chunks)",
                    content.identifier,
                    outcome.index.len()
                ));
            } else {
                Output::success(&format!(
                    "Indexed {} ({} chunks)",
                    content.identifier,
                    outcome.index.len()
                ));
            }
            Output::kv("Cache file", &outcome.path.display().to_string());
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
