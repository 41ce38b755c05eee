//! Signer name canonicalization.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[.,]").expect("static regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static regex");
}

/// Canonicalizes a raw candidate into a stable signer key: uppercase,
/// strip `.` and `,`, collapse whitespace runs, trim. Total and idempotent;
/// an empty result means "no candidate", never an error.
pub fn normalize_name(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let stripped = PUNCTUATION.replace_all(&upper, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}
