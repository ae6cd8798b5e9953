//! Grunn - Ask questions about your documents and videos
//!
//! A CLI tool and library that indexes an uploaded file or a video transcript
//! and answers questions about it with a language model, grounded in the
//! retrieved passages.
//!
//! The name "Grunn" is Norwegian for "ground", as in grounding answers in
//! their source.
//!
//! # Overview
//!
//! Grunn allows you to:
//! - Index PDF, plain text and CSV uploads, or a YouTube video's transcript
//! - Reuse embeddings from a local cache when the same content comes back
//! - Hold a conversation about the content, with sources for every answer
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `loader` - Turning uploads and transcripts into documents
//! - `chunking` - Fixed-size overlapping chunks
//! - `embedding` - Embedding generation
//! - `vector_store` - In-memory similarity index
//! - `cache` - On-disk index cache
//! - `orchestrator` - Load, split, embed and cache in one call
//! - `rag` - Conversational retrieval and answer generation
//! - `session` - One conversation over one index
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use grunn::config::Settings;
//! use grunn::loader::SourceContent;
//! use grunn::orchestrator::Orchestrator;
//! use grunn::rag::{OpenAIChatModel, RagEngine};
//! use grunn::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings.clone())?;
//!
//!     let source = SourceContent::from_path("report.pdf".as_ref())?;
//!     let outcome = orchestrator.get_or_build(&source).await?;
//!
//!     let model = Arc::new(OpenAIChatModel::from_settings(&settings)?);
//!     let engine = RagEngine::from_settings(&settings, model, orchestrator.embedder());
//!
//!     let mut session = Session::new();
//!     session.attach_index(&source.identifier, outcome.index, source.mode());
//!     let response = session.ask(&engine, "What is the report about?").await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod loader;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod session;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{GrunnError, Result};
