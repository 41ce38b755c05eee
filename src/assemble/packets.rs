//! Per-signer packet assembly.
//!
//! A signer's pages come out ordered by (input-document order, page
//! index). Pages from different format families never share a file:
//! each family gets its own packet, distinguished by extension.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::formats::{copier_for, sanitize_file_stem, PacketPart};
use crate::types::{DocumentFormat, ObligationRef, SourceDocument};

/// One written packet file, as reported in the job result.
#[derive(Debug, Clone, Serialize)]
pub struct PacketRecord {
    pub name: String,
    pub pages: usize,
    pub path: String,
}

/// Assembles every packet for one signer into `packets_dir`.
///
/// An empty page list yields no file and an empty record list. With
/// mixed-format inputs a signer may produce up to one packet per
/// format family.
#[instrument(skip_all, fields(signer = %signer))]
pub fn assemble_signer_packets(
    signer: &str,
    refs: &[ObligationRef],
    sources: &HashMap<usize, Arc<SourceDocument>>,
    packets_dir: &Path,
) -> Result<Vec<PacketRecord>> {
    let mut sorted: Vec<&ObligationRef> = refs.iter().collect();
    sorted.sort_by_key(|r| r.packet_key());

    let mut records = Vec::new();
    for format in [DocumentFormat::Pdf, DocumentFormat::Docx] {
        let parts = collect_parts(&sorted, sources, format)?;
        if parts.is_empty() {
            continue;
        }

        let file_name = format!(
            "signature_packet - {}.{}",
            sanitize_file_stem(signer),
            format.extension()
        );
        let dest = packets_dir.join(&file_name);
        let pages = copier_for(format).copy_pages(&parts, &dest)?;
        debug!("wrote {} ({pages} pages)", dest.display());
        records.push(PacketRecord {
            name: signer.to_string(),
            pages,
            path: dest.to_string_lossy().into_owned(),
        });
    }
    Ok(records)
}

/// Groups one format family's refs into consecutive per-document runs,
/// preserving the sorted packet order.
fn collect_parts<'a>(
    sorted: &[&ObligationRef],
    sources: &'a HashMap<usize, Arc<SourceDocument>>,
    format: DocumentFormat,
) -> Result<Vec<PacketPart<'a>>> {
    let mut parts: Vec<PacketPart<'a>> = Vec::new();
    let mut current_order: Option<usize> = None;

    for r in sorted {
        let source = sources
            .get(&r.doc_order)
            .ok_or_else(|| Error::Internal(format!("unknown source document {}", r.document)))?;
        if source.format != format {
            continue;
        }
        if current_order == Some(r.doc_order) {
            let part = parts.last_mut().unwrap();
            if part.pages.last() != Some(&r.page) {
                part.pages.push(r.page);
            }
        } else {
            parts.push(PacketPart {
                source: source.as_ref(),
                pages: vec![r.page],
            });
            current_order = Some(r.doc_order);
        }
    }
    Ok(parts)
}
