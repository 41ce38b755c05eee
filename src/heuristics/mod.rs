//! Text heuristics: small pure functions, each independently testable and
//! replaceable without touching grouping or assembly.
//!
//! Pipeline order: classifier -> signer extractor -> entity filter ->
//! normalizer.

pub mod classifier;
pub mod entity_filter;
pub mod normalize;
pub mod signer_extractor;

pub use classifier::classify_page;
pub use entity_filter::is_probable_person;
pub use normalize::normalize_name;
pub use signer_extractor::extract_signers;
