//! CLI command implementations.

mod ask;
mod cache;
mod chat;
mod config;
mod ingest;
mod search;
mod source;
mod summarize;

pub use ask::run_ask;
pub use cache::run_cache;
pub use chat::run_chat;
pub use config::run_config;
pub use ingest::run_ingest;
pub use search::run_search;
pub use summarize::run_summarize;

use crate::config::{Prompts, Settings};
use crate::orchestrator::Orchestrator;
use crate::rag::{OpenAIChatModel, RagEngine};
use std::sync::Arc;

/// Build the answer engine, optionally with a different chat model.
fn build_engine(
    settings: &Settings,
    orchestrator: &Orchestrator,
    model: Option<String>,
) -> crate::error::Result<RagEngine> {
    let mut settings = settings.clone();
    if let Some(model) = model {
        settings.rag.model = model;
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let chat_model = Arc::new(OpenAIChatModel::from_settings(&settings)?);

    Ok(RagEngine::from_settings(&settings, chat_model, orchestrator.embedder()).with_prompts(prompts))
}
