//! Configuration settings for Grunn.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub splitter: SplitterSettings,
    pub embedding: EmbeddingSettings,
    pub cache: CacheSettings,
    pub rag: RagSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.grunn".to_string(),
        }
    }
}

/// OpenAI API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Falls back to the `OPENAI_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Chunk splitter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            chunk_size: crate::chunking::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::chunking::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Texts per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 100,
        }
    }
}

/// Embedding cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding one serialized index per source.
    /// Defaults to `embeddings` under `general.data_dir`.
    pub dir: Option<String>,
    /// Rebuild when the content under a cached name has changed.
    ///
    /// Turning this off serves whatever is cached under the name, even if the
    /// uploaded content differs.
    pub verify_content: bool,
    /// Delete every cache entry when the CLI starts.
    pub clear_on_start: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            verify_content: true,
            clear_on_start: false,
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Number of chunks to retrieve per question.
    pub top_k: usize,
    /// Upper bound on the retrieved context placed in the prompt, in characters.
    pub max_context_chars: usize,
    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub condense_question: bool,
    /// Only send the most recent N turns of history to the model.
    pub max_history_turns: Option<usize>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            top_k: crate::vector_store::DEFAULT_TOP_K,
            max_context_chars: 16_000,
            condense_question: false,
            max_history_turns: None,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GrunnError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grunn")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded cache directory path.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache.dir {
            Some(dir) => Self::expand_path(dir),
            None => self.data_dir().join("embeddings"),
        }
    }

    /// The API key from config or environment, if any.
    pub fn api_key(&self) -> Option<String> {
        self.openai
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}
