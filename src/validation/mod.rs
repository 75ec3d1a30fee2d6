//! Response validation.
//!
//! Guards AI output quality before anything reaches the user: a Thai-aware
//! length floor, a structural-label check, and non-blocking depth warnings.
//! Failures are counted in the injected [`MetricsRegistry`] and logged to the
//! injected [`ErrorLog`]; the caller then repairs or synthesizes a response
//! via [`fallback`], so a validation failure never surfaces as a user error.

pub mod error_log;
pub mod fallback;
pub mod metrics;

pub use error_log::{ErrorLog, ErrorLogEntry};
pub use fallback::baseline_reading;
pub use metrics::{MetricsRegistry, MetricsSnapshot};

use serde::{Deserialize, Serialize};

use crate::types::DivinationType;
use crate::utilities::errors::ErrorType;
use crate::utilities::text::thai_char_count;

/// Section labels every structured reading must contain.
pub const REQUIRED_SECTION_LABELS: [&str; 3] = ["ภาพรวม", "คำแนะนำ", "ข้อควรระวัง"];

/// Discourse connectives whose presence marks an answer as reasoned rather
/// than a bare assertion.
const DEPTH_CONNECTIVES: [&str; 6] =
    ["เพราะ", "เนื่องจาก", "ทำให้", "ส่งผล", "ดังนั้น", "อย่างไรก็ตาม"];

/// Minimum Thai character floor for a divination type.
pub fn min_thai_chars(divination_type: DivinationType) -> usize {
    match divination_type {
        DivinationType::Tarot => 80,
        DivinationType::Spirit => 60,
        DivinationType::Numerology => 60,
        DivinationType::Chat => 25,
    }
}

/// Whether `text` carries at least `min_chars` Thai code points.
///
/// Only the Thai block counts; Latin card names, digits and punctuation are
/// ignored. Blank text is always invalid, even at a floor of zero.
pub fn validate_minimum_length(text: &str, min_chars: usize) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    thai_char_count(text) >= min_chars
}

/// Whether every required label appears in `text` as a literal substring.
/// Order is not enforced.
pub fn validate_structure_sections(text: &str, required_labels: &[&str]) -> bool {
    required_labels.iter().all(|label| text.contains(label))
}

/// Non-blocking depth check: an answer with no discourse connective at all
/// reads like a bare assertion. Never affects validity.
pub fn depth_warnings(text: &str) -> Vec<String> {
    let connective_count = DEPTH_CONNECTIVES
        .iter()
        .filter(|word| text.contains(**word))
        .count();
    if connective_count == 0 {
        vec!["response contains no discourse connectives; reasoning may be shallow".to_string()]
    } else {
        Vec::new()
    }
}

/// Outcome of validating one AI response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the response satisfies the length and structure contracts.
    pub is_valid: bool,
    /// Blocking problems found.
    pub errors: Vec<String>,
    /// Non-blocking observations; never flip `is_valid`.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no findings.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Validates AI responses against the structural contract, recording
/// outcomes in the injected metrics and log services.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    metrics: MetricsRegistry,
    log: ErrorLog,
}

impl ResponseValidator {
    /// Create a validator over the given services.
    pub fn new(metrics: MetricsRegistry, log: ErrorLog) -> Self {
        Self { metrics, log }
    }

    /// The metrics registry this validator records into.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// The error log this validator records into.
    pub fn error_log(&self) -> &ErrorLog {
        &self.log
    }

    /// Validate a raw AI response for a divination type.
    ///
    /// Runs the Thai length floor and the structural-label check, updates the
    /// metrics counters, and appends an error-log entry only on failure.
    /// Depth warnings are attached either way and never affect validity.
    pub fn validate_ai_response(
        &self,
        response: Option<&str>,
        divination_type: DivinationType,
    ) -> ValidationResult {
        let text = response.unwrap_or("");
        let mut errors = Vec::new();

        let floor = min_thai_chars(divination_type);
        let thai_chars = thai_char_count(text);
        if !validate_minimum_length(text, floor) {
            errors.push(format!(
                "response has {} Thai characters, below the {} floor",
                thai_chars, floor
            ));
        }

        for label in REQUIRED_SECTION_LABELS {
            if !text.contains(label) {
                errors.push(format!("missing required section label: {}", label));
            }
        }

        let is_valid = errors.is_empty();
        self.metrics.record_validation(is_valid);

        if !is_valid {
            self.metrics
                .record_error(ErrorType::Validation, divination_type);
            self.log.append(
                ErrorLogEntry::new(
                    ErrorType::Validation,
                    divination_type,
                    errors.join("; "),
                )
                .with_context("thai_chars", thai_chars.to_string()),
            );
            tracing::warn!(
                divination_type = %divination_type,
                thai_chars,
                error_count = errors.len(),
                "AI response failed validation"
            );
        }

        ValidationResult {
            is_valid,
            errors,
            warnings: depth_warnings(text),
        }
    }
}
