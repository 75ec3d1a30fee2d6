//! Structural repair and fallback synthesis.
//!
//! Best-effort repair, not a semantic guarantee: the goal is that every user
//! receives a reading with the three expected sections, even when the model
//! returned nothing usable or the upstream call failed outright.

use crate::prompts::catalog::catalog;
use crate::types::DivinationType;
use crate::validation::{ResponseValidator, REQUIRED_SECTION_LABELS};

impl ResponseValidator {
    /// Ensure `raw` is a structured reading, repairing or synthesizing as
    /// needed.
    ///
    /// - Blank `raw`: synthesize a full three-section reading from `summary`
    ///   plus the generic advice/caution texts, and record a fallback usage.
    /// - `raw` already contains at least one required label: returned
    ///   unchanged (applying this function to its own output is a no-op).
    /// - Non-blank but unlabeled `raw`: keep the original text as the
    ///   overview body and inject the generic sections around it, also
    ///   recording a fallback usage.
    pub fn ensure_fortune_structure(
        &self,
        raw: &str,
        summary: &str,
        divination_type: Option<DivinationType>,
    ) -> String {
        let fallback = &catalog().fallback;

        if raw.trim().is_empty() {
            self.metrics().record_fallback();
            tracing::info!(
                divination_type = divination_type.map(|t| t.as_str()).unwrap_or("unknown"),
                "synthesizing reading from empty response"
            );
            return format!(
                "{}: {}\n{}: {}\n{}: {}",
                REQUIRED_SECTION_LABELS[0],
                summary,
                REQUIRED_SECTION_LABELS[1],
                fallback.advice,
                REQUIRED_SECTION_LABELS[2],
                fallback.caution
            );
        }

        if REQUIRED_SECTION_LABELS
            .iter()
            .any(|label| raw.contains(label))
        {
            return raw.to_string();
        }

        self.metrics().record_fallback();
        tracing::info!(
            divination_type = divination_type.map(|t| t.as_str()).unwrap_or("unknown"),
            "wrapping unlabeled response with section labels"
        );
        format!(
            "{}: {}\n{}: {}\n{}: {}",
            REQUIRED_SECTION_LABELS[0],
            raw.trim(),
            REQUIRED_SECTION_LABELS[1],
            fallback.advice,
            REQUIRED_SECTION_LABELS[2],
            fallback.caution
        )
    }
}

/// Precomputed baseline reading served when the upstream call fails even
/// after its retry. Already structured and long enough to pass validation.
pub fn baseline_reading(divination_type: DivinationType) -> String {
    catalog().fallback.baseline(divination_type).to_string()
}
