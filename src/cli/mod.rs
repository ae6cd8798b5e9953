//! CLI module for Grunn.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Grunn - Ask questions about your documents and videos
///
/// Index a PDF, text or CSV file, or a YouTube video's transcript, and get
/// answers grounded in its content.
#[derive(Parser, Debug)]
#[command(name = "grunn")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// OpenAI API key (overrides the config file)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Content to work with: a file, or a video and its transcript.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// File (.pdf, .txt, .csv), or a YouTube URL or video ID
    pub source: String,

    /// Transcript file for a video source (plain text or JSON segments)
    #[arg(long)]
    pub transcript: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a file or a video transcript
    Ingest {
        /// File to index (.pdf, .txt, .csv)
        #[arg(required_unless_present = "video", conflicts_with = "video")]
        file: Option<PathBuf>,

        /// YouTube URL or video ID
        #[arg(long, requires = "transcript")]
        video: Option<String>,

        /// Transcript of the video (plain text or JSON segments)
        #[arg(long, requires = "video")]
        transcript: Option<PathBuf>,

        /// Rebuild even if a cached index exists
        #[arg(short, long)]
        force: bool,
    },

    /// Ask one question about a file or video
    Ask {
        #[command(flatten)]
        source: SourceArgs,

        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start an interactive chat about a file or video
    Chat {
        #[command(flatten)]
        source: SourceArgs,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Print each retrieval step as it happens
        #[arg(long)]
        show_steps: bool,
    },

    /// Search a file or video for relevant passages
    Search {
        #[command(flatten)]
        source: SourceArgs,

        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value = "4")]
        limit: usize,
    },

    /// Summarize a whole file or video
    Summarize {
        #[command(flatten)]
        source: SourceArgs,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Manage the embedding cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached indexes
    List,

    /// Delete every cached index, or only one
    Clear {
        /// File name or video ID to remove
        source: Option<String>,
    },

    /// Show the cache directory
    Path,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_parses_source_and_question() {
        let cli = Cli::try_parse_from(["grunn", "ask", "report.pdf", "What is it about?"]).unwrap();
        match cli.command {
            Commands::Ask { source, question, .. } => {
                assert_eq!(source.source, "report.pdf");
                assert!(source.transcript.is_none());
                assert_eq!(question, "What is it about?");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_ingest_video_requires_transcript() {
        assert!(Cli::try_parse_from(["grunn", "ingest", "--video", "dQw4w9WgXcQ"]).is_err());
        assert!(Cli::try_parse_from(["grunn", "ingest"]).is_err());

        let cli = Cli::try_parse_from([
            "grunn",
            "ingest",
            "--video",
            "dQw4w9WgXcQ",
            "--transcript",
            "talk.txt",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Ingest { video: Some(_), .. }));
    }

    #[test]
    fn test_summarize_parses_video_and_transcript() {
        let cli = Cli::try_parse_from([
            "grunn",
            "summarize",
            "https://youtu.be/dQw4w9WgXcQ",
            "--transcript",
            "talk.json",
            "-m",
            "gpt-4o",
        ])
        .unwrap();
        match cli.command {
            Commands::Summarize { source, model } => {
                assert_eq!(source.source, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(source.transcript, Some(PathBuf::from("talk.json")));
                assert_eq!(model.as_deref(), Some("gpt-4o"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_search_limit_flag() {
        let cli = Cli::try_parse_from(["grunn", "search", "notes.txt", "budget", "-k", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Search { limit: 2, .. }));
    }
}
