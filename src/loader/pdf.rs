//! PDF loader: one document per page.

use super::{Document, Loader, SegmentMarker};
use crate::error::{GrunnError, Result};
use tracing::{debug, warn};

/// Extracts the text of every page that has any.
pub struct PdfLoader;

impl Loader for PdfLoader {
    fn load(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(bytes)
            .map_err(|e| GrunnError::Load(format!("{}: not a readable PDF: {}", source_id, e)))?;

        if pdf.is_encrypted() {
            return Err(GrunnError::Load(format!(
                "{} is password protected or encrypted",
                source_id
            )));
        }

        let mut documents = Vec::new();
        for page_number in pdf.get_pages().into_keys() {
            let text = pdf.extract_text(&[page_number]).map_err(|e| {
                GrunnError::Load(format!(
                    "{}: failed to extract text from page {}: {}",
                    source_id, page_number, e
                ))
            })?;

            if text.trim().is_empty() {
                debug!("Skipping blank page {} of {}", page_number, source_id);
                continue;
            }

            documents.push(Document::new(
                source_id,
                text,
                Some(SegmentMarker::Page(page_number)),
            ));
        }

        if documents.is_empty() {
            warn!(
                "{} has no extractable text; it may be scanned or made of images",
                source_id
            );
        }

        Ok(documents)
    }
}
