//! Per-document scanning: runs the heuristic pipeline over one loaded
//! document and produces an immutable partial result.
//!
//! Scan tasks are read-only over their own document and share nothing;
//! partial results are merged by a single collector (see `index`).

use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::heuristics::extract_signers;
use crate::types::{ObligationRef, SourceDocument};

/// The partial result of scanning one document.
#[derive(Debug, Clone)]
pub struct DocumentScan {
    /// Position of the document in the input ordering.
    pub order: usize,
    pub document: String,
    pub refs: Vec<ObligationRef>,
}

/// Walks the signature-classified pages of one document and extracts
/// obligation references. Pure over the loaded document; no I/O.
#[instrument(skip_all, fields(document = %source.name))]
pub fn scan_document(source: &SourceDocument, cfg: &EngineConfig) -> DocumentScan {
    let mut refs = Vec::new();
    for page in source.signature_pages() {
        let signers = extract_signers(&page.text, &cfg.extractor, &cfg.entity_filter);
        for signer in signers {
            refs.push(ObligationRef {
                signer,
                doc_order: source.order,
                document: source.name.clone(),
                page: page.number,
            });
        }
    }
    debug!("{} obligation refs", refs.len());
    DocumentScan {
        order: source.order,
        document: source.name.clone(),
        refs,
    }
}
