//! Cache command implementation.

use crate::cache::EmbeddingCache;
use crate::cli::{CacheAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the cache command.
pub fn run_cache(action: &CacheAction, settings: Settings) -> Result<()> {
    let cache = EmbeddingCache::new(settings.cache_dir())?;

    match action {
        CacheAction::List => {
            let entries = cache.list()?;
            if entries.is_empty() {
                Output::info("Nothing cached yet. Use 'grunn ingest <file>' to add content.");
            } else {
                Output::header(&format!("Cached Indexes ({})", entries.len()));
                println!();
                for entry in &entries {
                    Output::cache_entry(entry);
                }

                let total_chunks: usize = entries.iter().map(|e| e.chunk_count).sum();
                println!();
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }

        CacheAction::Clear { source: Some(source) } => {
            if cache.remove(source)? {
                Output::success(&format!("Removed cached index for {}", source));
            } else {
                Output::warning(&format!("No cached index for {}", source));
            }
        }

        CacheAction::Clear { source: None } => {
            let removed = cache.clear()?;
            Output::success(&format!("Removed {} cached indexes", removed));
        }

        CacheAction::Path => {
            println!("{}", cache.dir().display());
        }
    }

    Ok(())
}
