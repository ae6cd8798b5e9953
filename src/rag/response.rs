//! RAG response generation.

use super::context::{fit_to_budget, format_context_for_prompt};
use super::{
    ChatHistory, ChatMessage, ChatModel, ContextChunk, EventSink, RagEvent, TokenUsage,
    TracingSink,
};
use crate::chunking::Chunk;
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{GrunnError, Result};
use crate::loader::ContentMode;
use crate::vector_store::{VectorIndex, DEFAULT_TOP_K};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default budget for retrieved text in one prompt.
const DEFAULT_MAX_CONTEXT_CHARS: usize = 16_000;

/// RAG engine for question answering.
pub struct RagEngine {
    model: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    prompts: Prompts,
    top_k: usize,
    max_context_chars: usize,
    condense_question: bool,
    max_history_turns: Option<usize>,
    events: Arc<dyn EventSink>,
}

impl RagEngine {
    /// Create a new RAG engine with default retrieval settings.
    pub fn new(model: Arc<dyn ChatModel>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            model,
            embedder,
            prompts: Prompts::default(),
            top_k: DEFAULT_TOP_K,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            condense_question: false,
            max_history_turns: None,
            events: Arc::new(TracingSink),
        }
    }

    /// Create an engine configured from the `[rag]` settings.
    pub fn from_settings(
        settings: &Settings,
        model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self::new(model, embedder)
            .with_top_k(settings.rag.top_k)
            .with_max_context_chars(settings.rag.max_context_chars)
            .with_condense_question(settings.rag.condense_question)
            .with_max_history_turns(settings.rag.max_history_turns)
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_max_context_chars(mut self, max_chars: usize) -> Self {
        self.max_context_chars = max_chars;
        self
    }

    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub fn with_condense_question(mut self, enabled: bool) -> Self {
        self.condense_question = enabled;
        self
    }

    /// Send at most this many earlier turns to the model.
    pub fn with_max_history_turns(mut self, turns: Option<usize>) -> Self {
        self.max_history_turns = turns;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Retrieve the chunks most similar to `question`, best first.
    ///
    /// An empty index returns nothing without calling the embedding service.
    #[instrument(skip(self, index), fields(entries = index.len()))]
    pub async fn retrieve(&self, question: &str, index: &VectorIndex) -> Result<Vec<ContextChunk>> {
        if index.is_empty() {
            debug!("Index is empty, skipping query embedding");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(question).await?;
        let chunks: Vec<ContextChunk> = index
            .search(&query_embedding, self.top_k)?
            .into_iter()
            .map(ContextChunk::from)
            .collect();

        Ok(chunks)
    }

    /// Answer one question against `index`, using and extending `history`.
    ///
    /// The turn is appended to `history` only when an answer was produced.
    #[instrument(skip(self, history, index), fields(query = %query, turns = history.len()))]
    pub async fn ask(
        &self,
        query: &str,
        history: &mut ChatHistory,
        index: &VectorIndex,
        mode: ContentMode,
    ) -> Result<RagResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GrunnError::InvalidInput("Question is empty".to_string()));
        }

        info!("Processing question: {}", query);

        let mut usage = None;
        let standalone = if self.condense_question && !history.is_empty() {
            let (rewritten, condense_usage) = self.condense(query, history).await?;
            usage = condense_usage;
            self.events.emit(&RagEvent::QuestionCondensed {
                original: query.to_string(),
                standalone: rewritten.clone(),
            });
            Some(rewritten)
        } else {
            None
        };
        let search_query = standalone.as_deref().unwrap_or(query);

        let retrieved = self.retrieve(search_query, index).await?;
        self.events.emit(&RagEvent::ChunksRetrieved {
            count: retrieved.len(),
            top_score: retrieved.first().map(|c| c.score),
        });

        let (sources, dropped) = fit_to_budget(retrieved, self.max_context_chars);
        if dropped > 0 {
            self.events.emit(&RagEvent::ContextTrimmed {
                kept: sources.len(),
                dropped,
            });
        }

        let prompt = self.render_question(search_query, &sources, mode);
        let messages = self.build_messages(&prompt, history);
        self.events.emit(&RagEvent::PromptBuilt {
            chars: messages.iter().map(|m| m.content.len()).sum(),
            history_turns: (messages.len() - 2) / 2,
        });

        let completion = self.model.complete(&messages).await?;
        let answer = completion.content.trim().to_string();
        usage = merge_usage(usage, completion.usage);

        self.events.emit(&RagEvent::AnswerGenerated {
            chars: answer.len(),
            total_tokens: usage.map(|u| u.total_tokens),
        });

        history.push(query, &answer);
        debug!("Generated response with {} sources", sources.len());

        Ok(RagResponse {
            answer,
            sources,
            standalone_question: standalone,
            usage,
        })
    }

    /// Summarize everything in `index`.
    ///
    /// Each chunk is summarized on its own, in content order, and the partial
    /// summaries are then combined into one. A single chunk needs no combining.
    #[instrument(skip(self, index), fields(entries = index.len()))]
    pub async fn summarize(&self, index: &VectorIndex) -> Result<Summary> {
        if index.is_empty() {
            return Err(GrunnError::InvalidInput("Nothing to summarize".to_string()));
        }

        let mut chunks: Vec<&Chunk> = index.entries().iter().map(|e| &e.chunk).collect();
        chunks.sort_by_key(|c| c.order);
        let total = chunks.len();

        let mut usage = None;
        let mut parts = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let mut vars = HashMap::new();
            vars.insert("text".to_string(), chunk.content.clone());
            let prompt = self
                .prompts
                .render_with_custom(&self.prompts.rag.summarize_map, &vars);

            let completion = self.model.complete(&[ChatMessage::user(prompt)]).await?;
            usage = merge_usage(usage, completion.usage);
            parts.push(completion.content.trim().to_string());
            self.events.emit(&RagEvent::PartSummarized {
                part: i + 1,
                total,
            });
        }

        let text = if parts.len() == 1 {
            parts.remove(0)
        } else {
            info!("Combining {} partial summaries", parts.len());
            let mut vars = HashMap::new();
            vars.insert("summaries".to_string(), parts.join("\n\n"));
            let prompt = self
                .prompts
                .render_with_custom(&self.prompts.rag.summarize_reduce, &vars);

            let completion = self.model.complete(&[ChatMessage::user(prompt)]).await?;
            usage = merge_usage(usage, completion.usage);
            completion.content.trim().to_string()
        };

        Ok(Summary {
            text,
            parts: total,
            usage,
        })
    }

    fn render_question(&self, question: &str, sources: &[ContextChunk], mode: ContentMode) -> String {
        let template = match mode {
            ContentMode::Documents => &self.prompts.rag.documents,
            ContentMode::VideoTranscript => &self.prompts.rag.video,
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(sources));

        self.prompts.render_with_custom(template, &vars)
    }

    /// System message, earlier turns as alternating user/assistant messages,
    /// then the grounded question.
    fn build_messages(&self, prompt: &str, history: &ChatHistory) -> Vec<ChatMessage> {
        let earlier = history.recent(self.max_history_turns);
        let mut messages = Vec::with_capacity(earlier.len() * 2 + 2);

        messages.push(ChatMessage::system(self.prompts.rag.system.clone()));
        for turn in earlier {
            messages.push(ChatMessage::user(turn.query.clone()));
            messages.push(ChatMessage::assistant(turn.answer.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        messages
    }

    async fn condense(
        &self,
        query: &str,
        history: &ChatHistory,
    ) -> Result<(String, Option<TokenUsage>)> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), query.to_string());
        vars.insert(
            "chat_history".to_string(),
            history.transcript(self.max_history_turns),
        );
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.rag.condense, &vars);

        let completion = self.model.complete(&[ChatMessage::user(prompt)]).await?;
        let rewritten = completion.content.trim();

        let standalone = if rewritten.is_empty() {
            query.to_string()
        } else {
            rewritten.to_string()
        };
        debug!("Condensed question: {}", standalone);

        Ok((standalone, completion.usage))
    }
}

fn merge_usage(a: Option<TokenUsage>, b: Option<TokenUsage>) -> Option<TokenUsage> {
    match (a, b) {
        (Some(a), Some(b)) => Some(TokenUsage {
            prompt_tokens: a.prompt_tokens + b.prompt_tokens,
            completion_tokens: a.completion_tokens + b.completion_tokens,
            total_tokens: a.total_tokens + b.total_tokens,
        }),
        (a, b) => a.or(b),
    }
}

/// A summary of a whole index.
#[derive(Debug, Clone)]
pub struct Summary {
    pub text: String,
    /// Number of chunks that were summarized.
    pub parts: usize,
    /// Tokens spent across every request, when the service reported them.
    pub usage: Option<TokenUsage>,
}

/// Response from the RAG engine.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Chunks used to generate the answer, best first.
    pub sources: Vec<ContextChunk>,
    /// The rewritten question, when condensing ran.
    pub standalone_question: Option<String>,
    /// Tokens spent on this turn, when the service reported them.
    pub usage: Option<TokenUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SourceRef;
    use crate::error::ServiceErrorKind;
    use crate::rag::Role;
    use crate::testing::{HashEmbedder, RecordingSink, ScriptedChatModel};

    fn chunk(content: &str, order: usize) -> Chunk {
        Chunk {
            content: content.to_string(),
            source: SourceRef {
                source_id: "notes.txt".to_string(),
                marker: None,
            },
            position: order,
            order,
        }
    }

    async fn index_of(embedder: &HashEmbedder, texts: &[&str]) -> VectorIndex {
        let chunks: Vec<Chunk> = texts.iter().enumerate().map(|(i, t)| chunk(t, i)).collect();
        let contents: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed_batch(&contents).await.unwrap();
        VectorIndex::build(chunks, vectors).unwrap()
    }

    #[tokio::test]
    async fn test_empty_index_declines_without_embedding() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let model = Arc::new(ScriptedChatModel::new(["I don't know."]));
        let engine = RagEngine::new(model.clone(), embedder.clone());

        let mut history = ChatHistory::new();
        let response = engine
            .ask("What is X?", &mut history, &VectorIndex::default(), ContentMode::Documents)
            .await
            .unwrap();

        assert_eq!(response.answer, "I don't know.");
        assert!(response.sources.is_empty());
        assert_eq!(history.len(), 1);
        assert_eq!(embedder.calls(), 0);

        let sent = model.requests();
        let prompt = &sent[0].last().unwrap().content;
        assert!(prompt.contains(crate::rag::context::NO_CONTEXT));
        assert!(prompt.contains("don't know"));
        assert!(prompt.contains("What is X?"));
    }

    #[tokio::test]
    async fn test_history_sent_as_alternating_turns() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["alpha facts", "beta facts"]).await;
        let model = Arc::new(ScriptedChatModel::new(["first", "second"]));
        let engine = RagEngine::new(model.clone(), embedder);

        let mut history = ChatHistory::new();
        engine
            .ask("Tell me about alpha", &mut history, &index, ContentMode::Documents)
            .await
            .unwrap();
        engine
            .ask("And beta?", &mut history, &index, ContentMode::Documents)
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[1].answer, "second");

        let second = &model.requests()[1];
        let roles: Vec<Role> = second.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(second[1].content, "Tell me about alpha");
        assert_eq!(second[2].content, "first");
        assert!(second[3].content.contains("And beta?"));
    }

    #[tokio::test]
    async fn test_history_window() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["alpha"]).await;
        let model = Arc::new(ScriptedChatModel::new(["a3"]));
        let engine = RagEngine::new(model.clone(), embedder).with_max_history_turns(Some(1));

        let mut history = ChatHistory::new();
        history.push("q1", "a1");
        history.push("q2", "a2");
        engine
            .ask("q3", &mut history, &index, ContentMode::Documents)
            .await
            .unwrap();

        let sent = &model.requests()[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1].content, "q2");
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["alpha"]).await;
        let model = Arc::new(ScriptedChatModel::failing(ServiceErrorKind::Timeout));
        let engine = RagEngine::new(model, embedder);

        let mut history = ChatHistory::new();
        history.push("earlier", "answer");
        let err = engine
            .ask("What now?", &mut history, &index, ContentMode::Documents)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GrunnError::Generation {
                kind: ServiceErrorKind::Timeout,
                ..
            }
        ));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_video_mode_uses_video_template() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["the speaker said hello"]).await;
        let model = Arc::new(ScriptedChatModel::new(["hello"]));
        let engine = RagEngine::new(model.clone(), embedder);

        let mut history = ChatHistory::new();
        engine
            .ask("What was said?", &mut history, &index, ContentMode::VideoTranscript)
            .await
            .unwrap();

        let sent = model.requests();
        let prompt = &sent[0].last().unwrap().content;
        assert!(prompt.contains("Transcript excerpts"));
        assert!(prompt.contains("the speaker said hello"));
    }

    #[tokio::test]
    async fn test_condense_rewrites_follow_up() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["alpha", "beta"]).await;
        let model = Arc::new(ScriptedChatModel::new(["What is beta?", "Beta is second."]));
        let sink = Arc::new(RecordingSink::default());
        let engine = RagEngine::new(model.clone(), embedder)
            .with_condense_question(true)
            .with_event_sink(sink.clone());

        let mut history = ChatHistory::new();
        history.push("What is alpha?", "Alpha is first.");
        let response = engine
            .ask("And the other one?", &mut history, &index, ContentMode::Documents)
            .await
            .unwrap();

        assert_eq!(response.standalone_question.as_deref(), Some("What is beta?"));
        assert_eq!(response.answer, "Beta is second.");
        assert_eq!(history.turns()[1].query, "And the other one?");

        let requests = model.requests();
        assert!(requests[0][0].content.contains("Human: What is alpha?"));
        assert!(requests[1].last().unwrap().content.contains("What is beta?"));

        let events = sink.events();
        assert!(matches!(events[0], RagEvent::QuestionCondensed { .. }));
    }

    #[tokio::test]
    async fn test_context_trimmed_to_budget() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]).await;
        let model = Arc::new(ScriptedChatModel::new(["ok"]));
        let sink = Arc::new(RecordingSink::default());
        let engine = RagEngine::new(model, embedder)
            .with_max_context_chars(15)
            .with_event_sink(sink.clone());

        let mut history = ChatHistory::new();
        let response = engine
            .ask("letters", &mut history, &index, ContentMode::Documents)
            .await
            .unwrap();

        assert_eq!(response.sources.len(), 1);
        assert!(sink
            .events()
            .contains(&RagEvent::ContextTrimmed { kept: 1, dropped: 2 }));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let model = Arc::new(ScriptedChatModel::new(["unused"]));
        let engine = RagEngine::new(model.clone(), embedder);

        let mut history = ChatHistory::new();
        let err = engine
            .ask("   ", &mut history, &VectorIndex::default(), ContentMode::Documents)
            .await
            .unwrap_err();

        assert!(matches!(err, GrunnError::InvalidInput(_)));
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_maps_in_order_then_combines() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let chunks = vec![chunk("third part", 2), chunk("first part", 0), chunk("second part", 1)];
        let vectors = embedder
            .embed_batch(&chunks.iter().map(|c| c.content.clone()).collect::<Vec<_>>())
            .await
            .unwrap();
        let index = VectorIndex::build(chunks, vectors).unwrap();

        let model = Arc::new(ScriptedChatModel::new(["s1", "s2", "s3", "The whole talk."]));
        let sink = Arc::new(RecordingSink::default());
        let engine = RagEngine::new(model.clone(), embedder).with_event_sink(sink.clone());

        let summary = engine.summarize(&index).await.unwrap();
        assert_eq!(summary.text, "The whole talk.");
        assert_eq!(summary.parts, 3);
        assert_eq!(summary.usage.unwrap().total_tokens, 60);

        let sent = model.requests();
        assert_eq!(sent.len(), 4);
        assert!(sent[0][0].content.contains("first part"));
        assert!(sent[1][0].content.contains("second part"));
        assert!(sent[2][0].content.contains("third part"));
        assert!(sent[3][0].content.contains("s1\n\ns2\n\ns3"));

        assert_eq!(
            sink.events().last(),
            Some(&RagEvent::PartSummarized { part: 3, total: 3 })
        );
    }

    #[tokio::test]
    async fn test_summarize_single_chunk_skips_combining() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["a short clip"]).await;
        let model = Arc::new(ScriptedChatModel::new(["A short clip."]));
        let engine = RagEngine::new(model.clone(), embedder);

        let summary = engine.summarize(&index).await.unwrap();
        assert_eq!(summary.text, "A short clip.");
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_summarize_empty_index_rejected() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let model = Arc::new(ScriptedChatModel::new(["unused"]));
        let engine = RagEngine::new(model.clone(), embedder);

        let err = engine.summarize(&VectorIndex::default()).await.unwrap_err();
        assert!(matches!(err, GrunnError::InvalidInput(_)));
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_failure_is_reported() {
        let embedder = Arc::new(HashEmbedder::new(8));
        let index = index_of(&embedder, &["alpha", "beta"]).await;
        let model = Arc::new(ScriptedChatModel::failing(ServiceErrorKind::RateLimited));
        let engine = RagEngine::new(model, embedder);

        let err = engine.summarize(&index).await.unwrap_err();
        assert!(matches!(
            err,
            GrunnError::Generation {
                kind: ServiceErrorKind::RateLimited,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_query_embedding_must_match_index() {
        let index = index_of(&HashEmbedder::new(8), &["alpha"]).await;
        let model = Arc::new(ScriptedChatModel::new(["unused"]));
        let engine = RagEngine::new(model.clone(), Arc::new(HashEmbedder::new(16)));

        let mut history = ChatHistory::new();
        let err = engine
            .ask("alpha?", &mut history, &index, ContentMode::Documents)
            .await
            .unwrap_err();

        assert!(matches!(err, GrunnError::InvalidIndexInput(_)));
        assert!(model.requests().is_empty());
        assert!(history.is_empty());
    }

    #[test]
    fn test_merge_usage() {
        let a = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 2,
            total_tokens: 12,
        };
        assert_eq!(merge_usage(None, None), None);
        assert_eq!(merge_usage(Some(a), None), Some(a));
        assert_eq!(merge_usage(Some(a), Some(a)).unwrap().total_tokens, 24);
    }
}
