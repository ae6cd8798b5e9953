//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{GrunnError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Building an index calls the embedding service.
    Ingest,
    /// Asking questions calls the embedding and chat services.
    Ask,
    /// Search embeds the query.
    Search,
    /// Summarizing calls the chat service, and the embedding service when
    /// it has to build the index first.
    Summarize,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Ask | Operation::Search | Operation::Summarize => {
            check_api_key(settings)
        }
    }
}

/// Check that an OpenAI API key is configured.
fn check_api_key(settings: &Settings) -> Result<()> {
    match settings.api_key() {
        Some(_) => Ok(()),
        None => Err(GrunnError::Config(
            "No OpenAI API key. Set it with: export OPENAI_API_KEY='sk-...', pass --api-key, or add openai.api_key to the config file".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_key_passes() {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-test".to_string());
        assert!(check(Operation::Ask, &settings).is_ok());
        assert!(check(Operation::Summarize, &settings).is_ok());
    }

    #[test]
    fn test_missing_key_fails() {
        // api_key() falls back to the environment
        if std::env::var("OPENAI_API_KEY").map_or(true, |k| k.trim().is_empty()) {
            assert!(matches!(
                check(Operation::Ingest, &Settings::default()),
                Err(GrunnError::Config(_))
            ));
        }
    }
}
