//! Input resolution: wrap an uploaded file as an in-memory document.
//!
//! Extraction works entirely on byte buffers (pdfium loads from a slice, the
//! PPTX reader wraps a `Cursor`), so a file path is only ever read once,
//! here. The declared extension decides which extractor runs; the bytes are
//! not sniffed, matching an upload form that accepts `.pptx` and `.pdf`.

use crate::error::DeckCoachError;
use std::path::Path;
use tracing::debug;

/// Container format, decided by the declared file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// Zipped OOXML slide deck.
    Pptx,
    /// Page-oriented PDF document.
    Pdf,
    /// Anything else; carries the lower-cased extension (may be empty).
    Unsupported(String),
}

impl DocumentKind {
    /// Classify a file name by its extension, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pptx" => DocumentKind::Pptx,
            "pdf" => DocumentKind::Pdf,
            _ => DocumentKind::Unsupported(ext),
        }
    }
}

/// An uploaded file: raw bytes plus the name it was uploaded under.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Wrap bytes received from a form upload, a database or a socket.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = DocumentKind::from_name(&name);
        Self { name, kind, bytes }
    }

    /// Read a local file completely into memory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DeckCoachError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DeckCoachError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => DeckCoachError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => DeckCoachError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read {} ({} bytes)", name, bytes.len());

        Ok(Self::from_bytes(name, bytes))
    }
}
