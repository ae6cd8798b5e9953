//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Answers questions about one indexed upload or transcript, grounding the
//! language model in the retrieved chunks and the conversation so far.

pub mod context;
mod events;
mod history;
mod llm;
mod response;

pub use events::{EventSink, RagEvent, TracingSink};
pub use history::{ChatHistory, Turn};
pub use llm::{ChatMessage, ChatModel, Completion, OpenAIChatModel, Role, TokenUsage};
pub use response::{RagEngine, RagResponse, Summary};

use crate::vector_store::SearchResult;

/// A retrieved chunk formatted for prompts and display.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Source label, e.g. "report.pdf (page 3)".
    pub source: String,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
    /// Order of the chunk in its index.
    pub order: usize,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            source: result.chunk.source.to_string(),
            content: result.chunk.content,
            score: result.score,
            order: result.chunk.order,
        }
    }
}
