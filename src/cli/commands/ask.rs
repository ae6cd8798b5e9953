//! Ask command implementation.

use super::{build_engine, source};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SourceArgs};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::session::Session;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    source: &SourceArgs,
    question: &str,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings.clone())?;
    let opened = source::open(&orchestrator, source).await?;
    let engine = build_engine(&settings, &orchestrator, model)?;

    let mut session = Session::new();
    session.attach_index(&opened.id, opened.index, opened.mode);

    let spinner = Output::spinner("Thinking...");
    let result = session.ask(&engine, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);

            if !response.sources.is_empty() {
                Output::header("Sources");
                for chunk in &response.sources {
                    Output::source_result(chunk, 100);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
