//! Content chunking for embedding.
//!
//! Splitting is purely length based: each document is walked in fixed-size
//! character windows that overlap by a fixed amount.

use crate::error::{GrunnError, Result};
use crate::loader::{Document, SegmentMarker};
use serde::{Deserialize, Serialize};

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Default number of characters shared by consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Points a chunk back at the document it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_id: String,
    pub marker: Option<SegmentMarker>,
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.marker {
            Some(marker) => write!(f, "{} ({})", self.source_id, marker),
            None => write!(f, "{}", self.source_id),
        }
    }
}

/// A bounded slice of source text prepared for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk.
    pub content: String,
    /// The document this chunk came from.
    pub source: SourceRef,
    /// Character offset of this chunk inside its document.
    pub position: usize,
    /// Order of this chunk across the whole run.
    pub order: usize,
}

impl Chunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Fixed-window character splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. The overlap must be smaller than the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(GrunnError::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(GrunnError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text into window strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.windows(text)
            .into_iter()
            .map(|(_, window)| window.to_string())
            .collect()
    }

    /// Split documents into chunks. Chunks never span two documents.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            for (position, window) in self.windows(&doc.content) {
                chunks.push(Chunk {
                    content: window.to_string(),
                    source: SourceRef {
                        source_id: doc.source_id.clone(),
                        marker: doc.marker,
                    },
                    position,
                    order: chunks.len(),
                });
            }
        }

        chunks
    }

    /// Windows of `chunk_size` chars advancing by `chunk_size - chunk_overlap`,
    /// paired with their char offset. Stops after the window reaching the end.
    fn windows<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the text.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_len = boundaries.len();
        boundaries.push(text.len());

        let stride = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::with_capacity(char_len / stride + 1);
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(char_len);
            windows.push((start, &text[boundaries[start]..boundaries[end]]));
            if end == char_len {
                break;
            }
            start += stride;
        }

        windows
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
