//! Two-tier signer-name extraction from signature-classified pages.

use crate::config::{EntityFilterConfig, ExtractorConfig};
use crate::heuristics::{is_probable_person, normalize_name};

/// Extracts distinct normalized signer names from one page of text.
///
/// The page is split into trimmed, non-empty lines. Each line containing
/// the anchor (`BY:` by default, case-insensitive) opens a forward window
/// of `cfg.window` lines:
///
/// 1. Tier 1: the first line beginning `NAME:` (a space before the colon is
///    tolerated) supplies the candidate and ends the scan for this anchor.
/// 2. Tier 2: failing that, the first normalized line passing the
///    probable-person test supplies the candidate.
///
/// An anchor yielding neither is silently skipped. Anchors near the end of
/// the page get a shorter effective window.
pub fn extract_signers(
    text: &str,
    cfg: &ExtractorConfig,
    entity_cfg: &EntityFilterConfig,
) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let anchor = cfg.anchor.to_uppercase();

    let mut signers: Vec<String> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !line.to_uppercase().contains(&anchor) {
            continue;
        }
        let window = &lines[(i + 1).min(lines.len())..(i + 1 + cfg.window).min(lines.len())];

        let candidate = tier_one(window).or_else(|| tier_two(window, entity_cfg));
        if let Some(name) = candidate {
            if !signers.contains(&name) {
                signers.push(name);
            }
        }
    }
    signers
}

/// Tier 1: explicit `NAME:` field.
fn tier_one(window: &[&str]) -> Option<String> {
    for line in window {
        if let Some(rest) = split_name_field(line) {
            let name = normalize_name(rest);
            // An empty NAME: field falls through to Tier 2.
            if !name.is_empty() {
                return Some(name);
            }
            return None;
        }
    }
    None
}

/// Tier 2: first probable person name in the window.
fn tier_two(window: &[&str], entity_cfg: &EntityFilterConfig) -> Option<String> {
    window.iter().find_map(|line| {
        let candidate = normalize_name(line);
        (!candidate.is_empty() && is_probable_person(&candidate, entity_cfg))
            .then_some(candidate)
    })
}

/// Matches a line starting with `NAME:` (case-insensitive, optional space
/// before the colon) and returns the substring after the colon.
fn split_name_field(line: &str) -> Option<&str> {
    let upper = line.to_uppercase();
    let trimmed = upper.trim_start();
    let stripped = trimmed.strip_prefix("NAME")?;
    let stripped = stripped.trim_start();
    if !stripped.starts_with(':') {
        return None;
    }
    // Index the original line at the first colon; prefix length equals the
    // uppercased prefix length since ASCII is involved.
    let colon = line.find(':')?;
    Some(&line[colon + 1..])
}
