//! Summarize command implementation.

use super::{build_engine, source};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SourceArgs};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{EventSink, RagEvent};
use anyhow::Result;
use indicatif::ProgressBar;
use std::sync::Arc;

/// Shows summarizing progress on the spinner.
struct SpinnerSink(ProgressBar);

impl EventSink for SpinnerSink {
    fn emit(&self, event: &RagEvent) {
        if let RagEvent::PartSummarized { part, total } = event {
            self.0.set_message(format!("Summarizing part {} of {}...", part, total));
        }
    }
}

/// Run the summarize command.
pub async fn run_summarize(source: &SourceArgs, model: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Summarize, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings.clone())?;
    let opened = source::open(&orchestrator, source).await?;

    if opened.index.is_empty() {
        Output::warning(&format!("{} has no text to summarize", opened.id));
        return Ok(());
    }

    let spinner = Output::spinner("Summarizing...");
    let engine = build_engine(&settings, &orchestrator, model)?
        .with_event_sink(Arc::new(SpinnerSink(spinner.clone())));
    let result = engine.summarize(&opened.index).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            Output::header(&format!("Summary of {}", opened.id));
            println!("{}\n", summary.text);
            Output::kv("Parts", &summary.parts.to_string());
            if let Some(usage) = summary.usage {
                Output::kv("Tokens", &usage.total_tokens.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to summarize: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
