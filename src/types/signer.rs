use serde::Serialize;

/// One page a signer is obligated to sign: (signer, document, page).
/// Many signers may reference one page and one signer many pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObligationRef {
    /// Normalized signer key.
    pub signer: String,
    /// Position of the source document in the input ordering.
    #[serde(skip)]
    pub doc_order: usize,
    /// Source document file name.
    pub document: String,
    /// 1-based page number within the source document.
    pub page: u32,
}

impl ObligationRef {
    /// Packet ordering: input-document order first, then page number.
    pub fn packet_key(&self) -> (usize, u32) {
        (self.doc_order, self.page)
    }

    /// Tracking-table ordering: signer, then document name, then page.
    pub fn table_key(&self) -> (&str, &str, u32) {
        (&self.signer, &self.document, self.page)
    }
}
