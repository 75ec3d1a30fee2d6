//! Embedded Thai prompt content.
//!
//! Role descriptions, cultural-context blocks and fallback texts live in
//! `th.json`, embedded at compile time and parsed once into a typed catalog.
//! Parsing into typed fields means a missing key is caught the first time any
//! test touches the catalog, not in production at prompt-composition time.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::types::DivinationType;

/// Raw Thai prompt catalog JSON, embedded at compile time.
pub const TH_JSON: &str = include_str!("th.json");

/// One string per divination type.
#[derive(Debug, Clone, Deserialize)]
pub struct PerTypeText {
    pub tarot: String,
    pub spirit: String,
    pub numerology: String,
    pub chat: String,
}

impl PerTypeText {
    /// Select the text for a divination type.
    pub fn get(&self, divination_type: DivinationType) -> &str {
        match divination_type {
            DivinationType::Tarot => &self.tarot,
            DivinationType::Spirit => &self.spirit,
            DivinationType::Numerology => &self.numerology,
            DivinationType::Chat => &self.chat,
        }
    }
}

/// Canned texts used by fallback synthesis and the baseline readings.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackText {
    /// Generic advice line injected when a response must be synthesized.
    pub advice: String,
    /// Generic caution line injected when a response must be synthesized.
    pub caution: String,
    pub baseline_tarot: String,
    pub baseline_spirit: String,
    pub baseline_numerology: String,
    pub baseline_chat: String,
}

impl FallbackText {
    /// The precomputed baseline reading for a divination type.
    pub fn baseline(&self, divination_type: DivinationType) -> &str {
        match divination_type {
            DivinationType::Tarot => &self.baseline_tarot,
            DivinationType::Spirit => &self.baseline_spirit,
            DivinationType::Numerology => &self.baseline_numerology,
            DivinationType::Chat => &self.baseline_chat,
        }
    }
}

/// Formatting labels for the few-shot block.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogLabels {
    /// Header line opening the few-shot section.
    pub few_shot_header: String,
    /// Prefix for numbered few-shot items.
    pub few_shot_item: String,
}

/// The parsed prompt catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptCatalog {
    /// Fortune-teller persona per divination type.
    pub roles: PerTypeText,
    /// Thai cultural-context block per divination type.
    pub cultural_context: PerTypeText,
    /// Fallback and baseline texts.
    pub fallback: FallbackText,
    /// Few-shot formatting labels.
    pub labels: CatalogLabels,
}

static CATALOG: OnceLock<PromptCatalog> = OnceLock::new();

/// The process-wide prompt catalog, parsed from the embedded JSON on first
/// use.
pub fn catalog() -> &'static PromptCatalog {
    CATALOG.get_or_init(|| {
        serde_json::from_str(TH_JSON).expect("embedded th.json prompt catalog must parse")
    })
}
