//! In-memory vector index over embedded chunks.
//!
//! Search is exact: every entry is scored by cosine similarity against the
//! query, which is plenty for the few hundred chunks a single upload produces.

use crate::chunking::Chunk;
use crate::error::{GrunnError, Result};
use serde::{Deserialize, Serialize};

/// Number of chunks retrieved when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// A chunk paired with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Searchable collection of embedded chunks. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from parallel chunk and vector sequences.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(GrunnError::InvalidIndexInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors.first().map(|v| v.len()).unwrap_or(0);
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return Err(GrunnError::InvalidIndexInput(format!(
                "vector {} has {} dimensions, expected {}",
                i,
                v.len(),
                dimensions
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        Ok(Self {
            dimensions,
            entries,
        })
    }

    /// Return the `k` most similar chunks, best first.
    ///
    /// Equal scores keep insertion order. A query whose length differs from
    /// the indexed vectors is rejected with `InvalidIndexInput`.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if !self.entries.is_empty() && query_embedding.len() != self.dimensions {
            return Err(GrunnError::InvalidIndexInput(format!(
                "query has {} dimensions, index has {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        // sort_by is stable, so ties stay in insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
