//! Search command implementation.

use super::source;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SourceArgs};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::ContextChunk;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    source: &SourceArgs,
    query: &str,
    limit: usize,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let opened = source::open(&orchestrator, source).await?;

    if opened.index.is_empty() {
        Output::warning("No results found matching your query.");
        return Ok(());
    }

    let spinner = Output::spinner("Searching...");
    let embedding = orchestrator.embedder().embed(query).await;
    spinner.finish_and_clear();

    let embedding = match embedding {
        Ok(embedding) => embedding,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    let chunks: Vec<ContextChunk> = opened
        .index
        .search(&embedding, limit.max(1))?
        .into_iter()
        .map(ContextChunk::from)
        .collect();

    Output::success(&format!("Found {} results in {}", chunks.len(), opened.id));
    for chunk in &chunks {
        Output::source_result(chunk, 200);
    }

    Ok(())
}
