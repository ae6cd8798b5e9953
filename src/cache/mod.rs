//! Disk cache of built vector indexes.
//!
//! One JSON file per source identifier lives in the cache directory. Each
//! entry records a fingerprint of the content and settings it was built from,
//! so a different upload under the same name is detected instead of being
//! served stale.
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so readers never see a half-written entry. Two processes building
//! the same identifier at once still race; the last rename wins.

use crate::chunking::TextSplitter;
use crate::error::{GrunnError, Result};
use crate::loader::SourceContent;
use crate::vector_store::VectorIndex;
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bumped whenever the entry layout changes; older entries are rebuilt.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const ENTRY_EXTENSION: &str = "json";

/// A persisted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub format_version: u32,
    pub source_id: String,
    /// Hex SHA-256 of the content and index settings.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub index: VectorIndex,
}

impl CacheEntry {
    pub fn new(source_id: &str, fingerprint: String, index: VectorIndex) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            source_id: source_id.to_string(),
            fingerprint,
            created_at: Utc::now(),
            index,
        }
    }
}

/// Listing information for one cache entry.
#[derive(Debug, Clone)]
pub struct CacheSummary {
    pub source_id: String,
    pub chunk_count: usize,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct EntryHeader {
    source_id: String,
    created_at: DateTime<Utc>,
    index: IndexHeader,
}

#[derive(Deserialize)]
struct IndexHeader {
    entries: Vec<IgnoredAny>,
}

/// Identity of an index: the raw content plus every setting that changes
/// what gets built from it.
pub fn fingerprint(
    source: &SourceContent,
    splitter: &TextSplitter,
    embedding_model: &str,
    dimensions: usize,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.kind.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(&source.bytes);
    hasher.update([0u8]);
    hasher.update(
        format!(
            "{}:{}:{}:{}",
            splitter.chunk_size(),
            splitter.chunk_overlap(),
            embedding_model,
            dimensions
        )
        .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}

/// Turn an identifier into a safe file stem.
fn sanitize(source_id: &str) -> String {
    let cleaned: String = source_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Never produce "", "." or ".." (or a hidden file).
    if cleaned.trim_start_matches('.').is_empty() || cleaned.starts_with('.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// File stem for an identifier.
///
/// Identifiers that are already safe are used as is. Anything sanitize had
/// to change gets a short hash of the original, so distinct identifiers
/// never share a file.
fn file_stem(source_id: &str) -> String {
    let cleaned = sanitize(source_id);
    if cleaned == source_id {
        return cleaned;
    }
    let digest = Sha256::digest(source_id.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", cleaned, suffix)
}

fn cache_io(action: &str, path: &Path, err: impl std::fmt::Display) -> GrunnError {
    GrunnError::CacheIo(format!("failed to {} {}: {}", action, path.display(), err))
}

/// Directory of cached indexes.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: PathBuf,
}

impl EmbeddingCache {
    /// Open the cache, creating the directory if absent.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| cache_io("create", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file an identifier is stored in.
    pub fn entry_path(&self, source_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem(source_id), ENTRY_EXTENSION))
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.entry_path(source_id).is_file()
    }

    /// Read the entry for an identifier.
    ///
    /// A missing entry is `None`. So is an unreadable or outdated one: it is
    /// logged and will be overwritten by the next build.
    pub fn load(&self, source_id: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(source_id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(cache_io("read", &path, e)),
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        if entry.source_id != source_id {
            warn!(
                "Cache entry {} belongs to {}, not {}",
                path.display(),
                entry.source_id,
                source_id
            );
            return Ok(None);
        }

        if entry.format_version != CACHE_FORMAT_VERSION {
            info!(
                "Ignoring cache entry {} with format version {}",
                path.display(),
                entry.format_version
            );
            return Ok(None);
        }

        debug!("Loaded cache entry {} ({} chunks)", path.display(), entry.index.len());
        Ok(Some(entry))
    }

    /// Write an entry, replacing any previous one for the same identifier.
    pub fn store(&self, entry: &CacheEntry) -> Result<PathBuf> {
        let path = self.entry_path(&entry.source_id);

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| cache_io("create a temporary file in", &self.dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, entry)
                .map_err(|e| cache_io("serialize", &path, e))?;
            writer.flush().map_err(|e| cache_io("write", &path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| cache_io("sync", &path, e))?;
        tmp.persist(&path)
            .map_err(|e| cache_io("write", &path, e.error))?;

        info!("Stored {} chunks for {} in {}", entry.index.len(), entry.source_id, path.display());
        Ok(path)
    }

    /// Delete the entry for an identifier. Returns whether one existed.
    ///
    /// An entry recorded under another identifier is left alone. Unreadable
    /// entries are removed.
    pub fn remove(&self, source_id: &str) -> Result<bool> {
        let path = self.entry_path(source_id);
        match std::fs::read(&path) {
            Ok(bytes) => {
                if let Ok(header) = serde_json::from_slice::<EntryHeader>(&bytes) {
                    if header.source_id != source_id {
                        warn!(
                            "Not removing {}: it belongs to {}",
                            path.display(),
                            header.source_id
                        );
                        return Ok(false);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(cache_io("read", &path, e)),
        }

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(cache_io("remove", &path, e)),
        }
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let read_dir = std::fs::read_dir(&self.dir).map_err(|e| cache_io("list", &self.dir, e))?;

        let mut files = Vec::new();
        for item in read_dir {
            let path = item.map_err(|e| cache_io("list", &self.dir, e))?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Summaries of every readable entry, newest first.
    pub fn list(&self) -> Result<Vec<CacheSummary>> {
        let mut summaries = Vec::new();

        for path in self.entry_files()? {
            let bytes = std::fs::read(&path).map_err(|e| cache_io("read", &path, e))?;
            match serde_json::from_slice::<EntryHeader>(&bytes) {
                Ok(header) => summaries.push(CacheSummary {
                    source_id: header.source_id,
                    chunk_count: header.index.entries.len(),
                    size_bytes: bytes.len() as u64,
                    created_at: header.created_at,
                    path,
                }),
                Err(e) => warn!("Skipping unreadable cache entry {}: {}", path.display(), e),
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    /// Delete every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files()? {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Deleted {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
            }
        }
        info!("Cleared {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }
}
