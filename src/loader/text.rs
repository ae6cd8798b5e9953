//! Plain text loader, also used for transcripts.

use super::{Document, Loader};
use crate::error::{GrunnError, Result};

/// Loads the whole input as a single document.
pub struct TextLoader;

impl Loader for TextLoader {
    fn load(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<Document>> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            GrunnError::Load(format!("{} is not valid UTF-8: {}", source_id, e))
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        Ok(vec![Document::new(source_id, text.to_string(), None)])
    }
}
