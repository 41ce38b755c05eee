//! Signer index: the single mutable aggregate of a packet job.
//!
//! Built by folding per-document scan results in input order, so the
//! page lists it hands to assembly are already deterministic.

use std::collections::BTreeMap;

use tracing::debug;

use crate::scanner::DocumentScan;
use crate::types::ObligationRef;

/// Maps normalized signer names to every page on which an obligation
/// for that signer was found.
#[derive(Debug, Default)]
pub struct PageIndex {
    by_signer: BTreeMap<String, Vec<ObligationRef>>,
}

impl PageIndex {
    /// Folds scan results into an index. Scans are sorted by input
    /// order first so concurrent completion order cannot leak into
    /// the output.
    pub fn from_scans(mut scans: Vec<DocumentScan>) -> Self {
        scans.sort_by_key(|s| s.order);
        let mut index = PageIndex::default();
        for scan in scans {
            for r in scan.refs {
                index.by_signer.entry(r.signer.clone()).or_default().push(r);
            }
        }
        debug!(signers = index.by_signer.len(), "index built");
        index
    }

    pub fn is_empty(&self) -> bool {
        self.by_signer.is_empty()
    }

    pub fn signer_count(&self) -> usize {
        self.by_signer.len()
    }

    /// Signer names in lexicographic order.
    pub fn signers(&self) -> impl Iterator<Item = &str> {
        self.by_signer.keys().map(|s| s.as_str())
    }

    pub fn refs_for(&self, signer: &str) -> &[ObligationRef] {
        self.by_signer
            .get(signer)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every obligation reference, sorted by signer, then document
    /// name, then page number. This is the master table ordering.
    pub fn master_rows(&self) -> Vec<&ObligationRef> {
        let mut rows: Vec<&ObligationRef> =
            self.by_signer.values().flatten().collect();
        rows.sort_by(|a, b| a.table_key().cmp(&b.table_key()));
        rows
    }
}
