//! Interactive chat command.

use super::{build_engine, source};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SourceArgs};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{EventSink, RagEvent};
use crate::session::Session;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Prints retrieval steps under the prompt.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: &RagEvent) {
        Output::step(&event.to_string());
    }
}

/// Run the interactive chat command.
pub async fn run_chat(
    source: &SourceArgs,
    model: Option<String>,
    show_steps: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings.clone())?;
    let opened = source::open(&orchestrator, source).await?;

    let mut engine = build_engine(&settings, &orchestrator, model)?;
    if show_steps {
        engine = engine.with_event_sink(Arc::new(ConsoleSink));
    }

    let mut session = Session::new();
    let chunk_count = opened.index.len();
    session.attach_index(&opened.id, opened.index, opened.mode);

    println!("\n{}", style("Grunn Chat").bold().cyan());
    println!(
        "{}",
        style(format!("Asking about {} ({} chunks).", opened.id, chunk_count)).dim()
    );
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.reset();
            Output::info("Conversation history cleared.");
            continue;
        }

        match session.ask(&engine, input).await {
            Ok(response) => {
                println!("\n{} {}\n", style("Grunn:").cyan().bold(), response.answer);
                if show_steps && !response.sources.is_empty() {
                    for chunk in &response.sources {
                        Output::source_result(chunk, 80);
                    }
                    println!();
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
