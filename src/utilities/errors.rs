//! Error taxonomy for the divination pipeline.
//!
//! Three failure families exist: template composition problems, response
//! validation failures, and upstream API failures. Validation failures are
//! always absorbed into a synthesized response before they reach a caller;
//! API failures are retried once and then replaced with a baseline reading.
//! Only genuinely unexpected errors propagate out of the crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised inside the prompt/retrieval/validation pipeline.
#[derive(Debug, Error)]
pub enum DivinationError {
    /// Malformed prompt composition, e.g. a missing catalog key.
    #[error("template error: {message}")]
    Template { message: String },

    /// An AI response failed structural or length checks.
    #[error("response validation failed: {message}")]
    Validation { message: String },

    /// The upstream completion call returned non-OK or failed in transport.
    #[error("upstream completion error: {message}")]
    Api { message: String },
}

impl DivinationError {
    /// Build a template error.
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Build an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// The log/metrics key for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Template { .. } => ErrorType::Template,
            Self::Validation { .. } => ErrorType::Validation,
            Self::Api { .. } => ErrorType::Api,
        }
    }
}

impl From<reqwest::Error> for DivinationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Api {
            message: err.to_string(),
        }
    }
}

/// Key form of the error taxonomy, used by the metrics maps and the error log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// Prompt/template composition failure.
    Template,
    /// Response validation failure.
    Validation,
    /// Upstream API failure.
    Api,
}

impl ErrorType {
    /// Wire form of the error type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Validation => "validation",
            Self::Api => "api",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
