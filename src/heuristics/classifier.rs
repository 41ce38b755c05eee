//! Page classifier: keyword-density rule deciding whether a page is worth
//! searching for signers.

use crate::config::ClassifierConfig;
use crate::types::PageClass;

/// Classifies one page of text. A page is `Signature` iff at least
/// `min_distinct_keywords` distinct markers are present (case-insensitive),
/// counting a long underscore run as one marker. A single stray "Date:" in
/// a cover letter therefore never classifies; missing an unusual block is
/// preferred over fabricating a packet for a non-signer.
pub fn classify_page(text: &str, cfg: &ClassifierConfig) -> PageClass {
    let haystack = text.to_uppercase();

    let mut distinct = 0usize;
    for keyword in &cfg.keywords {
        if haystack.contains(&keyword.to_uppercase()) {
            distinct += 1;
            if distinct >= cfg.min_distinct_keywords {
                return PageClass::Signature;
            }
        }
    }
    if cfg.min_underscore_run > 0 && has_underscore_run(&haystack, cfg.min_underscore_run) {
        distinct += 1;
    }

    if distinct >= cfg.min_distinct_keywords {
        PageClass::Signature
    } else {
        PageClass::Ordinary
    }
}

fn has_underscore_run(text: &str, min_len: usize) -> bool {
    let mut run = 0usize;
    for b in text.bytes() {
        if b == b'_' {
            run += 1;
            if run >= min_len {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    fn is_signature(text: &str) -> bool {
        classify_page(text, &cfg()) == PageClass::Signature
    }

    #[test]
    fn two_distinct_keywords_classify() {
        assert!(is_signature("By: ____________\nName: John Smith"));
        assert!(is_signature("IN WITNESS WHEREOF, the parties...\nTitle: CEO"));
    }

    #[test]
    fn single_keyword_does_not_classify() {
        // Common false positive: a stray Date: on a cover letter.
        assert!(!is_signature("Date: January 1, 2025\nDear Counsel,"));
        assert!(!is_signature("Delivered by: courier"));
    }

    #[test]
    fn repeated_keyword_counts_once() {
        assert!(!is_signature("By: one\nBy: two\nBy: three"));
    }

    #[test]
    fn underscore_run_counts_as_a_marker() {
        assert!(is_signature("Signature\n________________"));
        // Short runs do not.
        assert!(!is_signature("Signature\n___"));
    }

    #[test]
    fn case_insensitive() {
        assert!(is_signature("by: acme\nname: John Smith"));
    }

    #[test]
    fn empty_page_is_ordinary() {
        assert!(!is_signature(""));
    }
}
