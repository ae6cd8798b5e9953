//! Grunn CLI entry point.

use anyhow::Result;
use clap::Parser;
use grunn::cache::EmbeddingCache;
use grunn::cli::{commands, Cli, Commands};
use grunn::config::Settings;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("grunn={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let mut settings = Settings::load_from(config_path.as_ref())?;
    if let Some(key) = &cli.api_key {
        settings.openai.api_key = Some(key.clone());
    }

    if settings.cache.clear_on_start && !matches!(cli.command, Commands::Config { .. }) {
        let removed = EmbeddingCache::new(settings.cache_dir())?.clear()?;
        info!("Cleared {} cached indexes on start", removed);
    }

    // Execute command
    match cli.command {
        Commands::Ingest {
            file,
            video,
            transcript,
            force,
        } => {
            commands::run_ingest(file, video, transcript, force, settings).await?;
        }

        Commands::Ask {
            source,
            question,
            model,
        } => {
            commands::run_ask(&source, &question, model, settings).await?;
        }

        Commands::Chat {
            source,
            model,
            show_steps,
        } => {
            commands::run_chat(&source, model, show_steps, settings).await?;
        }

        Commands::Search {
            source,
            query,
            limit,
        } => {
            commands::run_search(&source, &query, limit, settings).await?;
        }

        Commands::Summarize { source, model } => {
            commands::run_summarize(&source, model, settings).await?;
        }

        Commands::Cache { action } => {
            commands::run_cache(&action, settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}
