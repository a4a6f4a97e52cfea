//! Execution analytics for orchestrator runs
//!
//! Owned by whoever composes the orchestrator and passed in explicitly, so
//! tests get a fresh instance per run.

use crate::offer::Offer;
use crate::pipeline::Mode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// One recorded orchestration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub mode: Mode,
    pub duration_ms: u64,
    /// The offer was fully generated, no stage fell back.
    pub success: bool,
    pub complexity: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregates over every recorded run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub total_executions: usize,
    pub successful: usize,
    /// Runs where at least one stage fell back.
    pub failed: usize,
    /// Percentage, 0-100.
    pub success_rate: f64,
    pub average_duration_ms: f64,
    pub average_complexity: f64,
}

#[derive(Default)]
pub struct PerformanceMonitor {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, mode: Mode, duration: Duration, offer: &Offer) {
        let record = ExecutionRecord {
            mode,
            duration_ms: duration.as_millis().min(u128::from(u64::MAX)) as u64,
            success: offer.ai_generated,
            complexity: complexity(offer),
            recorded_at: Utc::now(),
        };
        tracing::debug!(
            mode = %mode,
            duration_ms = record.duration_ms,
            success = record.success,
            "execution recorded"
        );
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn analytics(&self) -> Analytics {
        let records = self.records();
        let total = records.len();
        let successful = records.iter().filter(|r| r.success).count();
        let mean = |f: fn(&ExecutionRecord) -> f64| {
            if total == 0 {
                0.0
            } else {
                records.iter().map(f).sum::<f64>() / total as f64
            }
        };

        Analytics {
            total_executions: total,
            successful,
            failed: total - successful,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64 * 100.0
            },
            average_duration_ms: mean(|r| r.duration_ms as f64),
            average_complexity: mean(|r| r.complexity),
        }
    }
}

/// Rough effort score for an offer, in [0, 1].
pub fn complexity(offer: &Offer) -> f64 {
    let mut score = (offer.features.len() as f64 / 10.0).min(0.3);
    score += (offer.description.chars().count() as f64 / 1000.0).min(0.3);

    if offer.price.amount > 5000.0 {
        score += 0.2;
    } else if offer.price.amount > 1000.0 {
        score += 0.1;
    }
    // brand colours are always present on an assembled offer
    score += 0.1;
    if offer.target_audience.is_some() {
        score += 0.1;
    }
    score.min(1.0)
}
