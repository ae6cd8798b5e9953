//! Error types for Grunn.

use thiserror::Error;

/// Why a remote model call failed.
///
/// Lets callers tell a bad credential apart from a service that is down or a
/// request the service rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Missing, invalid or revoked API key.
    Authentication,
    /// Rate limit or quota exhausted.
    RateLimited,
    /// The request did not complete in time.
    Timeout,
    /// Network failure or a server-side error.
    Unavailable,
    /// The service rejected the request as invalid.
    MalformedRequest,
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceErrorKind::Authentication => write!(f, "authentication"),
            ServiceErrorKind::RateLimited => write!(f, "rate limited"),
            ServiceErrorKind::Timeout => write!(f, "timeout"),
            ServiceErrorKind::Unavailable => write!(f, "service unavailable"),
            ServiceErrorKind::MalformedRequest => write!(f, "malformed request"),
        }
    }
}

/// Library-level error type for Grunn operations.
#[derive(Error, Debug)]
pub enum GrunnError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to load content: {0}")]
    Load(String),

    #[error("Invalid index input: {0}")]
    InvalidIndexInput(String),

    #[error("Embedding service error ({kind}): {message}")]
    EmbeddingService {
        kind: ServiceErrorKind,
        message: String,
    },

    #[error("Generation failed ({kind}): {message}")]
    Generation {
        kind: ServiceErrorKind,
        message: String,
    },

    #[error("Cache IO error: {0}")]
    CacheIo(String),

    #[error("Failed to build index for '{source_id}': {cause}")]
    Build {
        source_id: String,
        cause: Box<GrunnError>,
    },

    #[error("No index is loaded for this session. Ingest a document or transcript first.")]
    NoIndex,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl GrunnError {
    /// Attach the source identifier to an error raised while building its index.
    pub fn for_source(self, source_id: &str) -> Self {
        match self {
            already @ GrunnError::Build { .. } => already,
            other => GrunnError::Build {
                source_id: source_id.to_string(),
                cause: Box::new(other),
            },
        }
    }

    /// The underlying error, with any `Build` wrappers removed.
    pub fn root_cause(&self) -> &GrunnError {
        match self {
            GrunnError::Build { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for Grunn operations.
pub type Result<T> = std::result::Result<T, GrunnError>;
