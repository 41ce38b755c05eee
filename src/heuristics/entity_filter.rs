//! Entity filter: suppresses candidates that are organizations rather than
//! individuals.

use crate::config::EntityFilterConfig;

/// "Probable person" test over a normalized candidate. Rejects anything
/// containing a legal-entity suffix as a substring, then accepts iff the
/// whitespace token count falls inside the configured bounds (2..=4 by
/// default). A heuristic, not a grammar; known to misfire on unusual names.
pub fn is_probable_person(candidate: &str, cfg: &EntityFilterConfig) -> bool {
    if cfg
        .entity_suffixes
        .iter()
        .any(|term| candidate.contains(term.as_str()))
    {
        return false;
    }
    let tokens = candidate.split_whitespace().count();
    tokens >= cfg.min_name_tokens && tokens <= cfg.max_name_tokens
}
