//! Typed progress events from the retrieval loop and summarizer.

use tracing::debug;

/// A step the retrieval loop took while answering.
#[derive(Debug, Clone, PartialEq)]
pub enum RagEvent {
    /// A follow-up was rewritten into a standalone question.
    QuestionCondensed { original: String, standalone: String },
    /// Chunks came back from the index.
    ChunksRetrieved { count: usize, top_score: Option<f32> },
    /// Low-scoring chunks were dropped to fit the context budget.
    ContextTrimmed { kept: usize, dropped: usize },
    /// The prompt is ready to send.
    PromptBuilt { chars: usize, history_turns: usize },
    /// The model answered.
    AnswerGenerated { chars: usize, total_tokens: Option<u32> },
    /// One chunk of a summary was written.
    PartSummarized { part: usize, total: usize },
}

impl std::fmt::Display for RagEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RagEvent::QuestionCondensed { standalone, .. } => {
                write!(f, "rephrased as: {}", standalone)
            }
            RagEvent::ChunksRetrieved { count, top_score } => match top_score {
                Some(score) => write!(f, "retrieved {} chunks (best score {:.2})", count, score),
                None => write!(f, "retrieved {} chunks", count),
            },
            RagEvent::ContextTrimmed { kept, dropped } => {
                write!(f, "kept {} chunks, dropped {} to fit the context", kept, dropped)
            }
            RagEvent::PromptBuilt { chars, history_turns } => {
                write!(f, "prompt of {} chars with {} earlier turns", chars, history_turns)
            }
            RagEvent::AnswerGenerated { chars, total_tokens } => match total_tokens {
                Some(tokens) => write!(f, "answered in {} chars ({} tokens)", chars, tokens),
                None => write!(f, "answered in {} chars", chars),
            },
            RagEvent::PartSummarized { part, total } => {
                write!(f, "summarized part {} of {}", part, total)
            }
        }
    }
}

/// Receives events as the loop runs.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RagEvent);
}

/// Logs events at debug level.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RagEvent) {
        debug!(event = ?event, "{}", event);
    }
}
