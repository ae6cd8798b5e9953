//! One user's conversation: the loaded index and the history asked against it.

use crate::error::{GrunnError, Result};
use crate::loader::ContentMode;
use crate::rag::{ChatHistory, RagEngine, RagResponse};
use crate::vector_store::VectorIndex;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// The index a session is answering from.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub source_id: String,
    pub mode: ContentMode,
    pub index: VectorIndex,
}

/// Conversation state. Starts without an index; `attach_index` makes it
/// ready and `detach` returns it to having none.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    loaded: Option<LoadedIndex>,
    history: ChatHistory,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            loaded: None,
            history: ChatHistory::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn loaded(&self) -> Option<&LoadedIndex> {
        self.loaded.as_ref()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Answer from a new index. A different source starts a fresh history.
    pub fn attach_index(&mut self, source_id: &str, index: VectorIndex, mode: ContentMode) {
        let same_source = self
            .loaded
            .as_ref()
            .is_some_and(|l| l.source_id == source_id);
        if !same_source {
            self.history.clear();
        }

        info!(session = %self.id, "Attached {} ({} chunks)", source_id, index.len());
        self.loaded = Some(LoadedIndex {
            source_id: source_id.to_string(),
            mode,
            index,
        });
    }

    /// Ask a question against the attached index.
    pub async fn ask(&mut self, engine: &RagEngine, query: &str) -> Result<RagResponse> {
        let loaded = self.loaded.as_ref().ok_or(GrunnError::NoIndex)?;
        engine
            .ask(query, &mut self.history, &loaded.index, loaded.mode)
            .await
    }

    /// Forget the conversation. The index stays attached.
    pub fn reset(&mut self) {
        info!(session = %self.id, "Session reset");
        self.history.clear();
    }

    /// Forget the conversation and the index.
    pub fn detach(&mut self) {
        self.reset();
        self.loaded = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;
    use crate::testing::{HashEmbedder, ScriptedChatModel};
    use std::sync::Arc;

    fn engine(replies: &[&str]) -> RagEngine {
        RagEngine::new(
            Arc::new(ScriptedChatModel::new(replies.iter().copied())),
            Arc::new(HashEmbedder::new(8)),
        )
    }

    #[tokio::test]
    async fn test_ask_without_index() {
        let mut session = Session::new();
        let err = session.ask(&engine(&["unused"]), "Hello?").await.unwrap_err();

        assert!(matches!(err, GrunnError::NoIndex));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_ready_session_records_turns() {
        let mut session = Session::new();
        session.attach_index("notes.txt", VectorIndex::default(), ContentMode::Documents);
        assert!(session.is_ready());

        let engine = engine(&["I don't know."]);
        let response = session.ask(&engine, "What is X?").await.unwrap();

        assert_eq!(response.answer, "I don't know.");
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_and_detach() {
        let mut session = Session::new();
        session.attach_index("notes.txt", VectorIndex::default(), ContentMode::Documents);
        session.ask(&engine(&["a"]), "q").await.unwrap();

        session.reset();
        assert!(session.is_ready());
        assert!(session.history().is_empty());

        session.detach();
        assert!(!session.is_ready());
        let err = session.ask(&engine(&["b"]), "q").await.unwrap_err();
        assert!(matches!(err, GrunnError::NoIndex));
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_index() {
        let mut session = Session::new();
        session.attach_index("notes.txt", VectorIndex::default(), ContentMode::Documents);
        let engine = RagEngine::new(
            Arc::new(ScriptedChatModel::failing(ServiceErrorKind::Timeout)),
            Arc::new(HashEmbedder::new(8)),
        );

        assert!(session.ask(&engine, "q").await.is_err());
        assert!(session.is_ready());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_switching_source_clears_history() {
        let mut session = Session::new();
        session.attach_index("a.txt", VectorIndex::default(), ContentMode::Documents);
        session.ask(&engine(&["a"]), "q").await.unwrap();

        session.attach_index("a.txt", VectorIndex::default(), ContentMode::Documents);
        assert_eq!(session.history().len(), 1);

        session.attach_index("dQw4w9WgXcQ", VectorIndex::default(), ContentMode::VideoTranscript);
        assert!(session.history().is_empty());
        assert_eq!(session.loaded().unwrap().mode, ContentMode::VideoTranscript);
    }
}
