//! Content loading for uploaded files and video transcripts.
//!
//! Each [`ContentKind`] has its own [`Loader`] that turns raw bytes into an
//! ordered list of [`Document`]s.

mod csv;
mod pdf;
mod text;
pub mod transcript;

pub use self::csv::CsvLoader;
pub use self::pdf::PdfLoader;
pub use self::text::TextLoader;

use crate::error::{GrunnError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Where inside its source a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMarker {
    /// 1-based PDF page number.
    Page(u32),
    /// 0-based CSV data row.
    Row(usize),
}

impl std::fmt::Display for SegmentMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentMarker::Page(n) => write!(f, "page {}", n),
            SegmentMarker::Row(n) => write!(f, "row {}", n),
        }
    }
}

/// A unit of source text produced by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier of the upload or video this text came from.
    pub source_id: String,
    /// The text.
    pub content: String,
    /// Page or row marker, when the format has one.
    pub marker: Option<SegmentMarker>,
}

impl Document {
    pub fn new(source_id: &str, content: String, marker: Option<SegmentMarker>) -> Self {
        Self {
            source_id: source_id.to_string(),
            content,
            marker,
        }
    }
}

/// The kinds of content Grunn can index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Pdf,
    Txt,
    Csv,
    Transcript,
}

impl ContentKind {
    /// Pick a kind from a filename's extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| {
                GrunnError::UnsupportedFormat(format!(
                    "'{}' has no file extension (expected pdf, txt or csv)",
                    filename
                ))
            })?;

        match ext.as_str() {
            "pdf" => Ok(ContentKind::Pdf),
            "txt" => Ok(ContentKind::Txt),
            "csv" => Ok(ContentKind::Csv),
            other => Err(GrunnError::UnsupportedFormat(format!(
                ".{} files are not supported (expected pdf, txt or csv)",
                other
            ))),
        }
    }

    /// Which prompt template answers questions about this kind.
    pub fn mode(&self) -> ContentMode {
        match self {
            ContentKind::Transcript => ContentMode::VideoTranscript,
            _ => ContentMode::Documents,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Pdf => write!(f, "pdf"),
            ContentKind::Txt => write!(f, "txt"),
            ContentKind::Csv => write!(f, "csv"),
            ContentKind::Transcript => write!(f, "transcript"),
        }
    }
}

/// Selects the question template used by the retrieval loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    Documents,
    VideoTranscript,
}

/// Raw content waiting to be indexed.
#[derive(Debug, Clone)]
pub struct SourceContent {
    /// Cache key: the original filename or the video id.
    pub identifier: String,
    pub kind: ContentKind,
    pub bytes: Vec<u8>,
}

impl SourceContent {
    /// An uploaded file. The kind comes from the filename's extension.
    pub fn from_upload(filename: &str, bytes: Vec<u8>) -> Result<Self> {
        let kind = ContentKind::from_filename(filename)?;
        Ok(Self {
            identifier: filename.to_string(),
            kind,
            bytes,
        })
    }

    /// Read an uploaded file from disk, keyed by its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| GrunnError::InvalidInput(format!("Not a file path: {}", path.display())))?;
        // Fail on the extension before reading a potentially large file.
        ContentKind::from_filename(filename)?;
        let bytes = std::fs::read(path)?;
        Self::from_upload(filename, bytes)
    }

    /// A video transcript keyed by its video id.
    pub fn transcript(video_id: &str, text: &str) -> Self {
        Self {
            identifier: video_id.to_string(),
            kind: ContentKind::Transcript,
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn mode(&self) -> ContentMode {
        self.kind.mode()
    }
}

/// Turns raw bytes into documents.
pub trait Loader: Send + Sync {
    fn load(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<Document>>;
}

/// The loader used for each content kind.
#[derive(Clone)]
pub struct LoaderSet {
    pdf: Arc<dyn Loader>,
    txt: Arc<dyn Loader>,
    csv: Arc<dyn Loader>,
    transcript: Arc<dyn Loader>,
}

impl LoaderSet {
    pub fn new() -> Self {
        Self {
            pdf: Arc::new(PdfLoader),
            txt: Arc::new(TextLoader),
            csv: Arc::new(CsvLoader),
            transcript: Arc::new(TextLoader),
        }
    }

    /// Replace the loader for one kind.
    pub fn with_loader(mut self, kind: ContentKind, loader: Arc<dyn Loader>) -> Self {
        match kind {
            ContentKind::Pdf => self.pdf = loader,
            ContentKind::Txt => self.txt = loader,
            ContentKind::Csv => self.csv = loader,
            ContentKind::Transcript => self.transcript = loader,
        }
        self
    }

    pub fn for_kind(&self, kind: ContentKind) -> &dyn Loader {
        match kind {
            ContentKind::Pdf => self.pdf.as_ref(),
            ContentKind::Txt => self.txt.as_ref(),
            ContentKind::Csv => self.csv.as_ref(),
            ContentKind::Transcript => self.transcript.as_ref(),
        }
    }

    /// Load a source with the loader registered for its kind.
    pub fn load(&self, source: &SourceContent) -> Result<Vec<Document>> {
        self.for_kind(source.kind)
            .load(&source.identifier, &source.bytes)
    }
}

impl Default for LoaderSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_filename() {
        assert_eq!(ContentKind::from_filename("report.PDF").unwrap(), ContentKind::Pdf);
        assert_eq!(ContentKind::from_filename("notes.txt").unwrap(), ContentKind::Txt);
        assert_eq!(ContentKind::from_filename("a.b.csv").unwrap(), ContentKind::Csv);

        assert!(matches!(
            ContentKind::from_filename("sheet.xlsx"),
            Err(GrunnError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ContentKind::from_filename("README"),
            Err(GrunnError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_modes() {
        assert_eq!(ContentKind::Pdf.mode(), ContentMode::Documents);
        assert_eq!(ContentKind::Csv.mode(), ContentMode::Documents);
        assert_eq!(ContentKind::Transcript.mode(), ContentMode::VideoTranscript);
    }

    #[test]
    fn test_loader_set_dispatch() {
        let loaders = LoaderSet::new();

        let txt = SourceContent::from_upload("notes.txt", b"plain notes".to_vec()).unwrap();
        let docs = loaders.load(&txt).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "notes.txt");

        let csv = SourceContent::from_upload("t.csv", b"a,b\n1,2\n3,4\n".to_vec()).unwrap();
        assert_eq!(loaders.load(&csv).unwrap().len(), 2);

        let video = SourceContent::transcript("dQw4w9WgXcQ", "never gonna");
        let docs = loaders.load(&video).unwrap();
        assert_eq!(docs[0].source_id, "dQw4w9WgXcQ");
        assert_eq!(docs[0].content, "never gonna");
    }

    #[test]
    fn test_from_path_rejects_extension_first() {
        let err = SourceContent::from_path(Path::new("/nonexistent/slides.pptx")).unwrap_err();
        assert!(matches!(err, GrunnError::UnsupportedFormat(_)));
    }
}
