//! Validation metrics service.
//!
//! A cloneable registry of process counters, injected into the validator and
//! the reading service rather than reached through a global. Isolated tests
//! construct their own registry, so parallel test runs never cross-contaminate
//! counts. The handle is `Arc`-backed and safe to share across async tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::DivinationType;
use crate::utilities::errors::ErrorType;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    total_validations: u64,
    passed_validations: u64,
    failed_validations: u64,
    fallback_usages: u64,
}

#[derive(Debug, Default)]
struct MetricsInner {
    counters: Mutex<Counters>,
    errors_by_type: DashMap<ErrorType, u64>,
    errors_by_divination_type: DashMap<DivinationType, u64>,
}

/// Shared handle to the validation counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

impl MetricsRegistry {
    /// Create a fresh registry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one validation outcome.
    pub fn record_validation(&self, passed: bool) {
        let mut counters = self.inner.counters.lock();
        counters.total_validations += 1;
        if passed {
            counters.passed_validations += 1;
        } else {
            counters.failed_validations += 1;
        }
    }

    /// Record one fallback synthesis or repair.
    pub fn record_fallback(&self) {
        self.inner.counters.lock().fallback_usages += 1;
    }

    /// Record an error against both keyed maps.
    pub fn record_error(&self, error_type: ErrorType, divination_type: DivinationType) {
        *self.inner.errors_by_type.entry(error_type).or_insert(0) += 1;
        *self
            .inner
            .errors_by_divination_type
            .entry(divination_type)
            .or_insert(0) += 1;
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = *self.inner.counters.lock();
        let errors_by_type = self
            .inner
            .errors_by_type
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        let errors_by_divination_type = self
            .inner
            .errors_by_divination_type
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        MetricsSnapshot {
            total_validations: counters.total_validations,
            passed_validations: counters.passed_validations,
            failed_validations: counters.failed_validations,
            fallback_usages: counters.fallback_usages,
            errors_by_type,
            errors_by_divination_type,
        }
    }

    /// Zero every counter. Exists for test isolation only; production flow
    /// never calls this.
    pub fn reset(&self) {
        *self.inner.counters.lock() = Counters::default();
        self.inner.errors_by_type.clear();
        self.inner.errors_by_divination_type.clear();
    }
}

/// Point-in-time copy of the metrics, shaped for the operator dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_validations: u64,
    pub passed_validations: u64,
    pub failed_validations: u64,
    pub fallback_usages: u64,
    /// Error counts keyed by taxonomy entry. Sorted keys keep the dashboard
    /// output stable.
    pub errors_by_type: BTreeMap<ErrorType, u64>,
    /// Error counts keyed by divination type.
    pub errors_by_divination_type: BTreeMap<DivinationType, u64>,
}

impl MetricsSnapshot {
    /// Share of validations that passed, in 0.0..=1.0. Returns 1.0 when no
    /// validation has run yet.
    pub fn pass_rate(&self) -> f64 {
        if self.total_validations == 0 {
            return 1.0;
        }
        self.passed_validations as f64 / self.total_validations as f64
    }
}
