use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::docx::DocxPackage;

/// Tagged format variant carried alongside every source document; page
/// copying dispatches on it instead of inspecting the file again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// Classification of a single page, derived once per run and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    Signature,
    Ordinary,
}

/// One page of a loaded document.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number within its document.
    pub number: u32,
    /// Extracted text, line breaks normalized to `\n`. Empty for pages
    /// with no text layer (scanned images); that is expected, not an error.
    pub text: String,
    pub class: PageClass,
}

/// Loaded, format-specific representation kept alive so page copying can
/// reuse the parse instead of reopening the file.
pub enum DocumentBackend {
    Pdf(lopdf::Document),
    Docx(DocxPackage),
}

impl std::fmt::Debug for DocumentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentBackend::Pdf(_) => f.write_str("DocumentBackend::Pdf"),
            DocumentBackend::Docx(_) => f.write_str("DocumentBackend::Docx"),
        }
    }
}

/// A fully loaded input document. Immutable once constructed; owned by the
/// run that loaded it.
#[derive(Debug)]
pub struct SourceDocument {
    /// File name used in tables and progress messages.
    pub name: String,
    pub path: PathBuf,
    /// Position in the caller-supplied input ordering; packet page order
    /// sorts on this before the page number.
    pub order: usize,
    pub format: DocumentFormat,
    pub pages: Vec<Page>,
    pub backend: DocumentBackend,
}

impl SourceDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn signature_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages
            .iter()
            .filter(|p| p.class == PageClass::Signature)
    }
}
