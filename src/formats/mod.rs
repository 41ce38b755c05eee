//! Format-specific document backends and the capability seam between the
//! grouping logic and page copying.

pub mod docx;
pub mod pdf;

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::heuristics::classify_page;
use crate::types::{DocumentBackend, DocumentFormat, Page, SourceDocument};

/// Loads one input document, extracts every page's text, and caches each
/// page's classification. Any parse failure is a document-local error the
/// run reports as a warning and skips.
pub fn load_source(path: &Path, order: usize, cfg: &EngineConfig) -> Result<SourceDocument> {
    let format = DocumentFormat::from_path(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let (texts, backend) = match format {
        DocumentFormat::Pdf => {
            let doc = pdf::load(path)?;
            (pdf::extract_pages_text(&doc), DocumentBackend::Pdf(doc))
        }
        DocumentFormat::Docx => {
            let package = docx::DocxPackage::load(path)
                .map_err(|e| Error::unreadable(path, e))?;
            let texts = (0..package.page_count())
                .map(|i| package.page_text(i).to_string())
                .collect();
            (texts, DocumentBackend::Docx(package))
        }
    };

    let pages = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            number: (i + 1) as u32,
            class: classify_page(&text, &cfg.classifier),
            text,
        })
        .collect::<Vec<_>>();

    debug!("loaded {} ({} pages)", name, pages.len());
    Ok(SourceDocument {
        name,
        path: path.to_path_buf(),
        order,
        format,
        pages,
        backend,
    })
}

/// A run of pages to copy out of one source document, in output order.
pub struct PacketPart<'a> {
    pub source: &'a SourceDocument,
    /// 1-based page numbers.
    pub pages: Vec<u32>,
}

/// Format-specific page copying. One implementation per
/// [`DocumentFormat`]; the assembler dispatches through this trait instead
/// of inspecting formats at copy time.
pub trait PageCopier {
    /// Copies the given pages, in order, into a single new document at
    /// `dest`. Returns the output page count. The write must be atomic:
    /// on error no file may remain at `dest`.
    fn copy_pages(&self, parts: &[PacketPart<'_>], dest: &Path) -> Result<usize>;
}

pub fn copier_for(format: DocumentFormat) -> Box<dyn PageCopier + Send + Sync> {
    match format {
        DocumentFormat::Pdf => Box::new(PdfPageCopier),
        DocumentFormat::Docx => Box::new(DocxPageCopier),
    }
}

pub struct PdfPageCopier;

impl PageCopier for PdfPageCopier {
    fn copy_pages(&self, parts: &[PacketPart<'_>], dest: &Path) -> Result<usize> {
        let pulls: Vec<pdf::PagePull<'_>> = parts
            .iter()
            .map(|part| match &part.source.backend {
                DocumentBackend::Pdf(doc) => Ok(pdf::PagePull {
                    document: doc,
                    pages: part.pages.clone(),
                }),
                DocumentBackend::Docx(_) => Err(Error::Internal(format!(
                    "format mismatch: {} is not a PDF",
                    part.source.name
                ))),
            })
            .collect::<Result<_>>()?;

        let mut assembled = pdf::assemble_pages(&pulls)?;
        let count = pdf::page_count(&assembled);

        let mut bytes = Vec::new();
        assembled.save_to(&mut bytes)?;
        write_atomic(dest, &bytes)?;
        Ok(count)
    }
}

pub struct DocxPageCopier;

impl PageCopier for DocxPageCopier {
    fn copy_pages(&self, parts: &[PacketPart<'_>], dest: &Path) -> Result<usize> {
        let mut pages: Vec<&docx::DocxPage> = Vec::new();
        let mut styles: Option<&[u8]> = None;
        for part in parts {
            let DocumentBackend::Docx(package) = &part.source.backend else {
                return Err(Error::Internal(format!(
                    "format mismatch: {} is not a DOCX",
                    part.source.name
                )));
            };
            if styles.is_none() {
                styles = package.styles();
            }
            for &number in &part.pages {
                let page = package.page((number - 1) as usize).ok_or_else(|| {
                    Error::Internal(format!(
                        "page {number} out of range for {}",
                        part.source.name
                    ))
                })?;
                pages.push(page);
            }
        }
        if pages.is_empty() {
            return Err(Error::Internal("no pages selected for assembly".into()));
        }

        let count = pages.len();
        let bytes = docx::page_document_bytes(&pages, styles)?;
        write_atomic(dest, &bytes)?;
        Ok(count)
    }
}

/// Writes through a temporary file in the destination directory and renames
/// into place, so cancellation or failure never leaves a truncated output.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| Error::Internal(format!("no parent directory for {}", dest.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(dest)
        .map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Unsafe-for-paths characters replaced when a derived name becomes a file
/// name (the signer key or a stripped document title).
pub fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect()
}
