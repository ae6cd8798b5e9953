//! CSV loader: one document per data row.

use super::{Document, Loader, SegmentMarker};
use crate::error::{GrunnError, Result};
use tracing::debug;

/// Loads each CSV row as `header: value` lines.
pub struct CsvLoader;

impl Loader for CsvLoader {
    fn load(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<Document>> {
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| GrunnError::Load(format!("{}: unreadable CSV header: {}", source_id, e)))?
            .clone();

        let mut documents = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                GrunnError::Load(format!("{}: bad CSV row {}: {}", source_id, row, e))
            })?;

            let content = record
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let header = headers.get(i).unwrap_or_default();
                    format!("{}: {}", header.trim(), value.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");

            documents.push(Document::new(source_id, content, Some(SegmentMarker::Row(row))));
        }

        debug!("Loaded {} CSV rows from {}", documents.len(), source_id);
        Ok(documents)
    }
}
