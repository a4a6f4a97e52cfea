//! The finished offer and its execution trace

use super::model::{BrandPersonality, HexColor, Pricing, Stage, Template};
use super::stages::{QualityReport, Typography, ValidationIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Fallback,
}

/// One execution-trace entry, appended as each stage ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: Stage,
    pub status: StageStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandColors {
    pub primary: HexColor,
    pub secondary: HexColor,
    pub accent: HexColor,
}

/// Reasoning carried over from the stages for display and review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_reasoning: Option<String>,
    /// Overall design rationale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub power_words: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<Typography>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub template_scores: BTreeMap<Template, f64>,
}

/// Threshold above which an offer is considered ready to publish.
pub const READY_THRESHOLD: f64 = 0.8;

/// Field-presence summary of an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completeness {
    pub score: f64,
    /// `score` as a whole percentage.
    pub percentage: u32,
    pub filled: usize,
    pub total: usize,
    /// Names of the core fields without content.
    pub missing: Vec<String>,
    pub ready_to_use: bool,
}

/// A complete sales offer. Every field is populated, whatever the stages did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub price: Pricing,
    pub features: Vec<String>,
    pub call_to_action: String,
    pub template: Template,
    pub brand_colors: BrandColors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub brand_personality: BrandPersonality,
    #[serde(default)]
    pub insights: Insights,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_report: Option<QualityReport>,
    pub execution_log: Vec<TraceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_notes: Vec<ValidationIssue>,
    pub generated_at: DateTime<Utc>,
    /// True only when every stage completed without fallback.
    pub ai_generated: bool,
    /// True when the whole pipeline was replaced by the deterministic offer.
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub redesigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Offer {
    /// Every stage that ran in this offer's pipeline ended `Completed`.
    pub fn all_stages_completed(&self) -> bool {
        !self.execution_log.is_empty()
            && self
                .execution_log
                .iter()
                .all(|e| e.status == StageStatus::Completed)
    }

    /// Stages that fell back, in trace order.
    pub fn fallback_stages(&self) -> Vec<Stage> {
        self.execution_log
            .iter()
            .filter(|e| e.status == StageStatus::Fallback)
            .map(|e| e.stage)
            .collect()
    }

    /// Whether the offer satisfies its structural invariants.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.call_to_action.trim().is_empty()
            && self.price.amount > 0.0
            && !self.features.is_empty()
    }

    /// Fraction of the core presentation fields that carry content.
    pub fn completeness(&self) -> Completeness {
        let checks = [
            ("title", !self.title.trim().is_empty()),
            ("description", !self.description.trim().is_empty()),
            ("price", self.price.amount > 0.0),
            ("features", !self.features.is_empty()),
            // template is always set
            ("template", true),
        ];
        let filled = checks.iter().filter(|(_, ok)| *ok).count();
        let total = checks.len();
        let score = filled as f64 / total as f64;
        Completeness {
            score,
            percentage: (score * 100.0).round() as u32,
            filled,
            total,
            missing: checks
                .iter()
                .filter(|(_, ok)| !*ok)
                .map(|(name, _)| name.to_string())
                .collect(),
            ready_to_use: score >= READY_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{fallback, OfferRequest};
    use crate::offer::RawInput;

    fn offer() -> Offer {
        fallback::whole_pipeline(
            &OfferRequest::Create(RawInput::new().with("service_name", "Tutoring")),
            Vec::new(),
            "test".into(),
        )
    }

    #[test]
    fn filled_offer_is_ready_to_use() {
        let c = offer().completeness();
        assert_eq!(c.filled, c.total);
        assert_eq!(c.percentage, 100);
        assert!(c.missing.is_empty());
        assert!(c.ready_to_use);
    }

    #[test]
    fn missing_fields_are_named() {
        let mut o = offer();
        o.description.clear();
        o.features.clear();

        let c = o.completeness();
        assert_eq!(c.missing, vec!["description", "features"]);
        assert_eq!(c.percentage, 60);
        assert!(!c.ready_to_use);
        assert!(!o.is_well_formed());
    }

    #[test]
    fn empty_trace_is_not_all_completed() {
        let o = offer();
        assert!(o.execution_log.is_empty());
        assert!(!o.all_stages_completed());
        assert!(o.fallback_stages().is_empty());
    }
}
