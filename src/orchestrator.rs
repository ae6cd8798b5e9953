//! Pipeline orchestrator for Grunn.
//!
//! Turns an upload or transcript into a searchable index, reusing the cached
//! index when the same content was embedded before.

use crate::cache::{fingerprint, CacheEntry, EmbeddingCache};
use crate::chunking::TextSplitter;
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{GrunnError, Result};
use crate::loader::{ContentKind, Loader, LoaderSet, SourceContent};
use crate::vector_store::VectorIndex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of `get_or_build`.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub index: VectorIndex,
    /// True when the index came from the cache.
    pub cache_hit: bool,
    /// The cache file holding the index.
    pub path: PathBuf,
}

/// The main orchestrator for the Grunn pipeline.
pub struct Orchestrator {
    settings: Settings,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    cache: EmbeddingCache,
    loaders: LoaderSet,
}

impl Orchestrator {
    /// Create a new orchestrator backed by OpenAI embeddings.
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings)?);
        let cache = EmbeddingCache::new(settings.cache_dir())?;
        Self::with_components(settings, embedder, cache)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        cache: EmbeddingCache,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(
            settings.splitter.chunk_size,
            settings.splitter.chunk_overlap,
        )?;

        if !settings.cache.verify_content {
            warn!("cache.verify_content is off: changed content under a known name will reuse the old index");
        }

        Ok(Self {
            settings,
            splitter,
            embedder,
            cache,
            loaders: LoaderSet::new(),
        })
    }

    /// Replace the loader used for one content kind.
    pub fn with_loader(mut self, kind: ContentKind, loader: Arc<dyn Loader>) -> Self {
        self.loaders = self.loaders.with_loader(kind, loader);
        self
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Return the index for `source`, building and caching it when needed.
    ///
    /// Any failure while building is reported as `GrunnError::Build` naming
    /// the source. Nothing is cached for a failed build.
    #[instrument(skip(self, source), fields(source = %source.identifier, kind = %source.kind))]
    pub async fn get_or_build(&self, source: &SourceContent) -> Result<BuildOutcome> {
        let id = source.identifier.as_str();
        let fingerprint = self.fingerprint(source);

        match self.cache.load(id).map_err(|e| e.for_source(id))? {
            Some(entry) if !self.matches_embedder(&entry.index) => {
                info!("Cached index for {} was built with other embedding settings, rebuilding", id)
            }
            Some(entry) if entry.fingerprint == fingerprint || !self.settings.cache.verify_content => {
                info!("Using cached index for {} ({} chunks)", id, entry.index.len());
                return Ok(BuildOutcome {
                    index: entry.index,
                    cache_hit: true,
                    path: self.cache.entry_path(id),
                });
            }
            Some(_) => info!("Content of {} changed since it was cached, rebuilding", id),
            None => debug!("No cached index for {}", id),
        }

        self.build_and_store(source, fingerprint).await
    }

    /// Build `source` and replace its cache entry, ignoring what is cached.
    ///
    /// The previous entry stays in place until the new one is written, so a
    /// failed rebuild leaves it usable.
    #[instrument(skip(self, source), fields(source = %source.identifier, kind = %source.kind))]
    pub async fn rebuild(&self, source: &SourceContent) -> Result<BuildOutcome> {
        let fingerprint = self.fingerprint(source);
        self.build_and_store(source, fingerprint).await
    }

    /// The cached index for an identifier, whatever content it was built from.
    ///
    /// Used when only the identifier is known, such as a video id whose
    /// transcript was ingested earlier. An index whose vectors do not match
    /// the current embedder cannot be searched and is an error.
    pub fn cached_index(&self, source_id: &str) -> Result<Option<VectorIndex>> {
        let Some(entry) = self.cache.load(source_id)? else {
            return Ok(None);
        };

        if !self.matches_embedder(&entry.index) {
            return Err(GrunnError::InvalidIndexInput(format!(
                "cached index for {} has {} dimensions but {} produces {}; ingest it again",
                source_id,
                entry.index.dimensions(),
                self.embedder.model(),
                self.embedder.dimensions()
            )));
        }

        Ok(Some(entry.index))
    }

    fn fingerprint(&self, source: &SourceContent) -> String {
        fingerprint(
            source,
            &self.splitter,
            self.embedder.model(),
            self.embedder.dimensions(),
        )
    }

    /// Empty indexes match any embedder.
    fn matches_embedder(&self, index: &VectorIndex) -> bool {
        index.is_empty() || index.dimensions() == self.embedder.dimensions()
    }

    async fn build_and_store(&self, source: &SourceContent, fingerprint: String) -> Result<BuildOutcome> {
        let id = source.identifier.as_str();
        let index = self.build_index(source).await.map_err(|e| e.for_source(id))?;

        let entry = CacheEntry::new(id, fingerprint, index);
        let path = self.cache.store(&entry).map_err(|e| e.for_source(id))?;

        Ok(BuildOutcome {
            index: entry.index,
            cache_hit: false,
            path,
        })
    }

    /// Load, split and embed `source` without touching the cache.
    #[instrument(skip(self, source), fields(source = %source.identifier))]
    pub async fn build_index(&self, source: &SourceContent) -> Result<VectorIndex> {
        info!("Loading {}", source.identifier);
        let documents = self.loaders.load(source)?;

        let chunks = self.splitter.split_documents(&documents);
        info!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        if chunks.is_empty() {
            warn!("{} has no text to index", source.identifier);
            return Ok(VectorIndex::default());
        }

        info!("Embedding {} chunks...", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let index = VectorIndex::build(chunks, vectors)?;
        if index.dimensions() != self.embedder.dimensions() {
            return Err(GrunnError::InvalidIndexInput(format!(
                "embedder returned {} dimensions, expected {}",
                index.dimensions(),
                self.embedder.dimensions()
            )));
        }

        Ok(index)
    }
}
