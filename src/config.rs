//! Configuration types and validation for the engine.
//!
//! Every heuristic constant the engine relies on (signature keywords,
//! anchor window, entity suffixes) is carried here rather than hard-coded,
//! so callers retuning against different document templates can override
//! them through the JSON job object.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for the page classifier's keyword co-occurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Case-insensitive markers scanned for on every page.
    pub keywords: Vec<String>,
    /// A page is a signature page iff at least this many distinct
    /// keywords are present. Deliberately precision-biased at 2.
    pub min_distinct_keywords: usize,
    /// Minimum length of an underscore run counted as a signature line.
    pub min_underscore_run: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "BY:".into(),
                "NAME:".into(),
                "TITLE:".into(),
                "DATE:".into(),
                "SIGNATURE".into(),
                "IN WITNESS WHEREOF".into(),
            ],
            min_distinct_keywords: 2,
            min_underscore_run: 8,
        }
    }
}

/// Configuration for the two-tier signer extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Anchor token marking a signature line.
    pub anchor: String,
    /// How many lines after an anchor are searched for a name.
    pub window: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            anchor: "BY:".into(),
            window: 6,
        }
    }
}

/// Configuration for the entity filter ("probable person" test).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFilterConfig {
    /// Legal-entity suffixes; any substring match rejects the candidate.
    pub entity_suffixes: Vec<String>,
    /// Inclusive bounds on the whitespace token count of a person name.
    pub min_name_tokens: usize,
    pub max_name_tokens: usize,
}

impl Default for EntityFilterConfig {
    fn default() -> Self {
        Self {
            entity_suffixes: vec![
                "LLC".into(),
                "INC".into(),
                "CORP".into(),
                "CORPORATION".into(),
                "LP".into(),
                "LLP".into(),
                "TRUST".into(),
                "HOLDINGS".into(),
                "PARTNERS".into(),
                "FUND".into(),
                "CAPITAL".into(),
            ],
            min_name_tokens: 2,
            max_name_tokens: 4,
        }
    }
}

/// Output format policy for packet jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Packets match the format family of their sources; mixed inputs run
    /// as independent per-format sub-runs.
    #[default]
    Preserve,
    /// All inputs must already be PDF.
    Pdf,
    /// All inputs must already be DOCX.
    Docx,
}

/// Global engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub extractor: ExtractorConfig,
    pub entity_filter: EntityFilterConfig,
    /// Upper bound on concurrently scanned documents. Zero means one
    /// worker per logical CPU.
    pub max_concurrent_documents: usize,
}

impl EngineConfig {
    /// Rejects configurations the heuristics cannot run under.
    pub fn validate(&self) -> Result<()> {
        if self.classifier.keywords.is_empty() {
            return Err(Error::InvalidConfiguration(
                "classifier keyword list is empty".into(),
            ));
        }
        if self.classifier.min_distinct_keywords == 0 {
            return Err(Error::InvalidConfiguration(
                "min_distinct_keywords must be at least 1".into(),
            ));
        }
        if self.extractor.window == 0 {
            return Err(Error::InvalidConfiguration(
                "extractor window must be at least 1".into(),
            ));
        }
        if self.extractor.anchor.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "extractor anchor must be non-empty".into(),
            ));
        }
        if self.entity_filter.min_name_tokens > self.entity_filter.max_name_tokens {
            return Err(Error::InvalidConfiguration(format!(
                "name token bounds are inverted: {} > {}",
                self.entity_filter.min_name_tokens, self.entity_filter.max_name_tokens
            )));
        }
        Ok(())
    }

    /// Effective scan worker count.
    pub fn scan_workers(&self) -> usize {
        if self.max_concurrent_documents == 0 {
            num_cpus::get()
        } else {
            self.max_concurrent_documents
        }
    }
}
