//! In-process fakes for the embedding service, chat model and loaders.

use crate::embedding::Embedder;
use crate::error::{GrunnError, Result, ServiceErrorKind};
use crate::loader::{Document, Loader};
use crate::rag::{ChatMessage, ChatModel, Completion, EventSink, RagEvent, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Deterministic embedder: hashes bytes into a fixed-size vector.
pub struct HashEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    texts: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        }
    }

    /// Number of requests made, single or batch.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of texts embedded.
    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimensions];
        for (i, b) in text.bytes().enumerate() {
            v[(i + b as usize) % self.dimensions] += (b as f32) / 255.0;
        }
        v[0] += 1.0;
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        "hash-embedder"
    }
}

/// Returns one vector fewer than asked for.
pub struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model(&self) -> &str {
        "short-embedder"
    }
}

/// Fails every request with the given kind.
pub struct FailingEmbedder(pub ServiceErrorKind);

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(GrunnError::EmbeddingService {
            kind: self.0,
            message: "service refused".to_string(),
        })
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(GrunnError::EmbeddingService {
            kind: self.0,
            message: "service refused".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model(&self) -> &str {
        "failing-embedder"
    }
}

/// Replies from a script and records every request.
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<String>>,
    failure: Option<ServiceErrorKind>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: ServiceErrorKind) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            failure: Some(kind),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        self.requests.lock().unwrap().push(messages.to_vec());

        if let Some(kind) = self.failure {
            return Err(GrunnError::Generation {
                kind,
                message: "scripted failure".to_string(),
            });
        }

        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "no more replies".to_string());

        Ok(Completion {
            content,
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Collects emitted events.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RagEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RagEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &RagEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Emits one document per page from a fixed list, ignoring the bytes.
pub struct PagedLoader {
    pages: Vec<String>,
}

impl PagedLoader {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }
}

impl Loader for PagedLoader {
    fn load(&self, source_id: &str, _bytes: &[u8]) -> Result<Vec<Document>> {
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                Document::new(
                    source_id,
                    page.clone(),
                    Some(crate::loader::SegmentMarker::Page(i as u32 + 1)),
                )
            })
            .collect())
    }
}

/// Wraps a loader and counts calls.
pub struct CountingLoader {
    inner: Arc<dyn Loader>,
    calls: AtomicUsize,
}

impl CountingLoader {
    pub fn new(inner: Arc<dyn Loader>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Loader for CountingLoader {
    fn load(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load(source_id, bytes)
    }
}
