//! Tracking tables: a master signature index plus one filtered table per
//! signer, written as plain CSV next to the packets.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::formats::{sanitize_file_stem, write_atomic};
use crate::index::PageIndex;
use crate::types::ObligationRef;

const MASTER_TABLE_NAME: &str = "MASTER_SIGNATURE_INDEX.csv";
const HEADER: &str = "Signer,Document,Page";

/// Writes the master index and the per-signer tables into `tables_dir`.
/// Rows are sorted by signer, then document name, then page, so repeated
/// runs over the same inputs produce byte-identical tables.
#[instrument(skip_all)]
pub fn write_tables(index: &PageIndex, tables_dir: &Path) -> Result<()> {
    let master = render_rows(index.master_rows().into_iter());
    write_atomic(&tables_dir.join(MASTER_TABLE_NAME), master.as_bytes())?;

    for signer in index.signers() {
        let mut rows: Vec<&ObligationRef> = index.refs_for(signer).iter().collect();
        rows.sort_by(|a, b| a.table_key().cmp(&b.table_key()));
        let body = render_rows(rows.into_iter());
        let name = format!("signature_packet - {}.csv", sanitize_file_stem(signer));
        write_atomic(&tables_dir.join(name), body.as_bytes())?;
    }
    debug!(signers = index.signer_count(), "tracking tables written");
    Ok(())
}

fn render_rows<'a>(rows: impl Iterator<Item = &'a ObligationRef>) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for r in rows {
        out.push_str(&csv_field(&r.signer));
        out.push(',');
        out.push_str(&csv_field(&r.document));
        out.push(',');
        out.push_str(&r.page.to_string());
        out.push('\n');
    }
    out
}

/// Quotes a field when it contains a delimiter, quote, or newline;
/// embedded quotes are doubled.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('"');
        for c in value.chars() {
            if c == '"' {
                quoted.push('"');
            }
            quoted.push(c);
        }
        quoted.push('"');
        quoted
    } else {
        value.to_string()
    }
}
