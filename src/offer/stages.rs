//! Structured stage results
//!
//! Each record is read leniently from an extracted JSON object: fields that
//! are missing stay empty, fields that are present but violate the stage's
//! constraints are dropped or clamped and reported as a `ValidationIssue`.
//! ASSEMBLE later substitutes defaults for anything left empty.

use super::fields::{list_field, number_field, str_field, truncate_chars, value_as_text};
use super::model::{
    is_currency_code, BrandPersonality, EmotionalAngle, HexColor, Interval, Pricing,
    Recommendation, Severity, Stage, Template,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const MAX_FEATURES: usize = 10;
pub const MIN_FEATURES: usize = 3;
pub const MAX_HEADLINE_CHARS: usize = 60;
pub const MAX_SUBTITLE_CHARS: usize = 120;
pub const MIN_DESCRIPTION_WORDS: usize = 150;
pub const MAX_DESCRIPTION_WORDS: usize = 400;
pub const MIN_BULLETS: usize = 5;
pub const MAX_BULLETS: usize = 7;

/// A structured field that parsed but broke a stage constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub stage: Stage,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub(crate) fn new(stage: Stage, field: &str, message: impl Into<String>) -> Self {
        Self {
            stage,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.stage, self.field, self.message)
    }
}

// ---------------------------------------------------------------------------
// Stage 1: gathered information
// ---------------------------------------------------------------------------

/// Structured extraction of the user's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatheredInfo {
    pub service_name: Option<String>,
    pub service_type: Option<String>,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub problem_solved: Option<String>,
    pub transformation: Option<String>,
    pub pricing: Option<Pricing>,
    pub features: Vec<String>,
    pub value_proposition: Option<String>,
    pub guarantees: Vec<String>,
    pub bonuses: Vec<String>,
    pub brand_personality: Option<BrandPersonality>,
    pub industry: Option<String>,
    /// In [0, 1].
    pub completeness_score: f64,
    pub missing_info: Vec<String>,
}

impl GatheredInfo {
    pub fn from_record(record: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) -> Self {
        const STAGE: Stage = Stage::Gather;

        let mut features = list_field(record, "features");
        if features.len() > MAX_FEATURES {
            issues.push(ValidationIssue::new(
                STAGE,
                "features",
                format!("{} features, keeping the first {}", features.len(), MAX_FEATURES),
            ));
            features.truncate(MAX_FEATURES);
        } else if !features.is_empty() && features.len() < MIN_FEATURES {
            issues.push(ValidationIssue::new(
                STAGE,
                "features",
                format!("only {} features", features.len()),
            ));
        }

        let brand_personality = str_field(record, &["brand_personality"]).and_then(|text| {
            let parsed = BrandPersonality::parse_lenient(&text);
            if parsed.is_none() {
                issues.push(ValidationIssue::new(
                    STAGE,
                    "brand_personality",
                    format!("unknown personality '{}'", text),
                ));
            }
            parsed
        });

        let completeness_score = match record.get("completeness_score").and_then(number_field) {
            Some(score) if (0.0..=1.0).contains(&score) => score,
            Some(score) => {
                issues.push(ValidationIssue::new(
                    STAGE,
                    "completeness_score",
                    format!("{} outside [0, 1]", score),
                ));
                score.clamp(0.0, 1.0)
            }
            None => 1.0,
        };

        let mut missing_info = list_field(record, "missing_critical_info");
        if missing_info.is_empty() {
            missing_info = list_field(record, "missing_info");
        }

        Self {
            service_name: str_field(record, &["service_name", "title"]),
            service_type: str_field(record, &["service_type"]),
            description: str_field(record, &["description"]),
            target_audience: str_field(record, &["target_audience"]),
            problem_solved: str_field(record, &["problem_solved"]),
            transformation: str_field(record, &["transformation"]),
            pricing: record
                .get("pricing")
                .or_else(|| record.get("price"))
                .and_then(|v| parse_pricing(STAGE, v, issues)),
            features,
            value_proposition: str_field(
                record,
                &["unique_value_proposition", "value_proposition"],
            ),
            guarantees: list_field(record, "guarantees"),
            bonuses: list_field(record, "bonuses"),
            brand_personality,
            industry: str_field(record, &["industry"]),
            completeness_score,
            missing_info,
        }
    }
}

/// Read a pricing object (or a bare amount). Returns `None`, with an issue,
/// when the amount is missing or not positive.
fn parse_pricing(stage: Stage, value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Pricing> {
    let (amount, obj) = match value {
        Value::Object(obj) => (obj.get("amount").and_then(number_field), Some(obj)),
        other => (number_field(other), None),
    };

    let amount = match amount {
        Some(a) if a.is_finite() && a > 0.0 => a,
        Some(a) => {
            issues.push(ValidationIssue::new(
                stage,
                "pricing.amount",
                format!("{} is not a positive amount", a),
            ));
            return None;
        }
        None => {
            issues.push(ValidationIssue::new(stage, "pricing.amount", "missing"));
            return None;
        }
    };

    let mut pricing = Pricing::one_time(amount);

    if let Some(obj) = obj {
        if let Some(currency) = str_field(obj, &["currency"]) {
            let code = currency.to_uppercase();
            if is_currency_code(&code) {
                pricing.currency = code;
            } else {
                issues.push(ValidationIssue::new(
                    stage,
                    "pricing.currency",
                    format!("'{}' is not an ISO currency code", currency),
                ));
            }
        }
        if let Some(interval) = str_field(obj, &["interval"]) {
            match Interval::parse_lenient(&interval) {
                Some(i) => pricing.interval = i,
                None => issues.push(ValidationIssue::new(
                    stage,
                    "pricing.interval",
                    format!("unknown interval '{}'", interval),
                )),
            }
        }
    }

    Some(pricing)
}

// ---------------------------------------------------------------------------
// Stage 2: copy
// ---------------------------------------------------------------------------

/// Persuasive copy written from the gathered information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopyBlock {
    pub headline: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub feature_bullets: Vec<String>,
    pub call_to_action: Option<String>,
    pub power_words: Vec<String>,
    pub emotional_angle: Option<EmotionalAngle>,
}

impl CopyBlock {
    pub fn from_record(record: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) -> Self {
        const STAGE: Stage = Stage::Copy;

        let headline = str_field(record, &["headline"])
            .map(|h| bounded_text(STAGE, "headline", h, MAX_HEADLINE_CHARS, issues));
        let subtitle = str_field(record, &["subtitle"])
            .map(|s| bounded_text(STAGE, "subtitle", s, MAX_SUBTITLE_CHARS, issues));

        let description = str_field(record, &["description"]);
        if let Some(text) = &description {
            let words = text.split_whitespace().count();
            if !(MIN_DESCRIPTION_WORDS..=MAX_DESCRIPTION_WORDS).contains(&words) {
                issues.push(ValidationIssue::new(
                    STAGE,
                    "description",
                    format!(
                        "{} words, expected {}-{}",
                        words, MIN_DESCRIPTION_WORDS, MAX_DESCRIPTION_WORDS
                    ),
                ));
            }
        }

        let mut feature_bullets = list_field(record, "feature_bullets");
        if feature_bullets.len() > MAX_BULLETS {
            issues.push(ValidationIssue::new(
                STAGE,
                "feature_bullets",
                format!("{} bullets, keeping the first {}", feature_bullets.len(), MAX_BULLETS),
            ));
            feature_bullets.truncate(MAX_BULLETS);
        } else if !feature_bullets.is_empty() && feature_bullets.len() < MIN_BULLETS {
            issues.push(ValidationIssue::new(
                STAGE,
                "feature_bullets",
                format!("only {} bullets", feature_bullets.len()),
            ));
        }

        let emotional_angle = str_field(record, &["emotional_angle"]).and_then(|text| {
            let parsed = EmotionalAngle::parse_lenient(&text);
            if parsed.is_none() {
                issues.push(ValidationIssue::new(
                    STAGE,
                    "emotional_angle",
                    format!("unknown angle '{}'", text),
                ));
            }
            parsed
        });

        Self {
            headline,
            subtitle,
            description,
            feature_bullets,
            call_to_action: str_field(record, &["call_to_action", "cta"]),
            power_words: list_field(record, "power_words_used"),
            emotional_angle,
        }
    }
}

fn bounded_text(
    stage: Stage,
    field: &str,
    text: String,
    max: usize,
    issues: &mut Vec<ValidationIssue>,
) -> String {
    let len = text.chars().count();
    if len <= max {
        return text;
    }
    issues.push(ValidationIssue::new(
        stage,
        field,
        format!("{} characters, truncated to {}", len, max),
    ));
    truncate_chars(&text, max)
}

// ---------------------------------------------------------------------------
// Stage 3: design
// ---------------------------------------------------------------------------

/// One palette colour with the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorChoice {
    pub hex: HexColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ColorChoice {
    pub fn plain(hex: HexColor) -> Self {
        Self {
            hex,
            name: None,
            rationale: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Typography {
    pub headline_style: Option<String>,
    pub body_style: Option<String>,
    pub size_hierarchy: Option<String>,
}

impl Typography {
    fn is_empty(&self) -> bool {
        self.headline_style.is_none() && self.body_style.is_none() && self.size_hierarchy.is_none()
    }
}

/// Visual recommendation for the offer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignStrategy {
    pub template: Option<Template>,
    /// Fit score per template, 0-10.
    pub template_scores: BTreeMap<Template, f64>,
    pub primary: Option<ColorChoice>,
    pub secondary: Option<ColorChoice>,
    pub accent: Option<ColorChoice>,
    pub typography: Option<Typography>,
    pub template_reasoning: Option<String>,
    pub color_reasoning: Option<String>,
    pub reasoning_summary: Option<String>,
}

impl DesignStrategy {
    pub fn from_record(record: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) -> Self {
        const STAGE: Stage = Stage::Design;

        let mut template_scores = BTreeMap::new();
        if let Some(Value::Object(scores)) = record.get("template_scores") {
            for (name, score) in scores {
                match (Template::parse(name), number_field(score)) {
                    (Some(t), Some(s)) => {
                        template_scores.insert(t, s.clamp(0.0, 10.0));
                    }
                    _ => issues.push(ValidationIssue::new(
                        STAGE,
                        "template_scores",
                        format!("ignored entry '{}'", name),
                    )),
                }
            }
        }

        let template = match str_field(record, &["recommended_template", "template"]) {
            Some(name) => match Template::parse(&name) {
                Some(t) => Some(t),
                None => {
                    issues.push(ValidationIssue::new(
                        STAGE,
                        "recommended_template",
                        format!("unknown template '{}'", name),
                    ));
                    None
                }
            },
            // Without an explicit pick, the best-scoring template wins.
            None => template_scores
                .iter()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(t, _)| *t),
        };

        let palette = record
            .get("color_palette")
            .or_else(|| record.get("brand_colors"))
            .and_then(Value::as_object);
        let mut color = |slot: &str| {
            let value = palette.and_then(|p| p.get(slot))?;
            let parsed = parse_color(value);
            if parsed.is_none() {
                issues.push(ValidationIssue::new(
                    STAGE,
                    &format!("color_palette.{}", slot),
                    "missing or invalid hex value",
                ));
            }
            parsed
        };
        let primary = color("primary");
        let secondary = color("secondary");
        let accent = color("accent");

        let typography = record
            .get("typography_recommendations")
            .or_else(|| record.get("typography"))
            .and_then(Value::as_object)
            .map(|t| Typography {
                headline_style: str_field(t, &["headline_style"]),
                body_style: str_field(t, &["body_style"]),
                size_hierarchy: str_field(t, &["size_hierarchy"]),
            })
            .filter(|t| !t.is_empty());

        Self {
            template,
            template_scores,
            primary,
            secondary,
            accent,
            typography,
            template_reasoning: str_field(record, &["template_reasoning"]),
            color_reasoning: str_field(record, &["color_reasoning"]),
            reasoning_summary: str_field(record, &["reasoning_summary", "reasoning"]),
        }
    }
}

/// A palette entry given as `{"hex": ...}` or as a bare hex string.
fn parse_color(value: &Value) -> Option<ColorChoice> {
    match value {
        Value::String(s) => HexColor::parse(s).map(ColorChoice::plain),
        Value::Object(obj) => {
            let hex = obj.get("hex").and_then(Value::as_str).and_then(HexColor::parse)?;
            Some(ColorChoice {
                hex,
                name: str_field(obj, &["name"]),
                rationale: str_field(obj, &["rationale", "psychology"]),
            })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Stage 4: audit
// ---------------------------------------------------------------------------

/// A score bounded by its category maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: u32,
    pub max: u32,
}

impl CategoryScore {
    pub fn new(score: u32, max: u32) -> Self {
        Self {
            score: score.min(max),
            max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub completeness: CategoryScore,
    pub copy_quality: CategoryScore,
    pub persuasiveness: CategoryScore,
    pub brand_consistency: CategoryScore,
    pub technical_correctness: CategoryScore,
}

/// Category names with their fixed maxima; they sum to 50.
pub const CATEGORY_MAXIMA: [(&str, u32); 5] = [
    ("completeness", 10),
    ("copy_quality", 15),
    ("persuasiveness", 15),
    ("brand_consistency", 5),
    ("technical_correctness", 5),
];

impl CategoryScores {
    fn iter(&self) -> impl Iterator<Item = &CategoryScore> {
        [
            &self.completeness,
            &self.copy_quality,
            &self.persuasiveness,
            &self.brand_consistency,
            &self.technical_correctness,
        ]
        .into_iter()
    }

    pub fn total(&self) -> u32 {
        self.iter().map(|c| c.score).sum()
    }

    pub fn possible(&self) -> u32 {
        self.iter().map(|c| c.max).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub location: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

/// Advisory audit of an assembled offer. Never gates the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_scores: Option<CategoryScores>,
    pub total_score: u32,
    pub total_possible: u32,
    pub percentage: u32,
    pub assessment: String,
    pub issues: Vec<Issue>,
    pub strengths: Vec<String>,
    /// Ordered, most important first.
    pub improvement_priorities: Vec<String>,
    pub recommendation: Recommendation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Assessment label for a percentage score.
pub fn assessment_for(percentage: u32) -> &'static str {
    if percentage >= 90 {
        "Excellent"
    } else if percentage >= 75 {
        "Good"
    } else if percentage >= 60 {
        "Acceptable"
    } else {
        "Needs Revision"
    }
}

impl QualityReport {
    /// A report with only a summary score.
    pub fn summary(
        total_score: u32,
        total_possible: u32,
        recommendation: Recommendation,
        reasoning: Option<String>,
    ) -> Self {
        let percentage = percentage_of(total_score, total_possible);
        Self {
            category_scores: None,
            total_score,
            total_possible,
            percentage,
            assessment: assessment_for(percentage).to_string(),
            issues: Vec::new(),
            strengths: Vec::new(),
            improvement_priorities: Vec::new(),
            recommendation,
            reasoning,
        }
    }

    pub fn from_record(record: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) -> Self {
        const STAGE: Stage = Stage::Audit;

        let category_scores = record
            .get("category_scores")
            .and_then(Value::as_object)
            .map(|cats| {
                let mut read = |name: &str, max: u32| {
                    let raw = cats.get(name).and_then(|v| match v {
                        Value::Object(o) => o.get("score").and_then(number_field),
                        other => number_field(other),
                    });
                    let score = match raw {
                        Some(s) if s >= 0.0 && s <= f64::from(max) => s.round() as u32,
                        Some(s) => {
                            issues.push(ValidationIssue::new(
                                STAGE,
                                &format!("category_scores.{}", name),
                                format!("{} outside [0, {}]", s, max),
                            ));
                            s.clamp(0.0, f64::from(max)).round() as u32
                        }
                        None => {
                            issues.push(ValidationIssue::new(
                                STAGE,
                                &format!("category_scores.{}", name),
                                "missing",
                            ));
                            0
                        }
                    };
                    CategoryScore::new(score, max)
                };
                let [c, q, p, b, t] = CATEGORY_MAXIMA;
                CategoryScores {
                    completeness: read(c.0, c.1),
                    copy_quality: read(q.0, q.1),
                    persuasiveness: read(p.0, p.1),
                    brand_consistency: read(b.0, b.1),
                    technical_correctness: read(t.0, t.1),
                }
            });

        let (total_score, total_possible) = match &category_scores {
            Some(cats) => (cats.total(), cats.possible()),
            None => {
                let summary = record.get("audit_summary").and_then(Value::as_object);
                let percentage = summary
                    .and_then(|s| s.get("percentage"))
                    .and_then(number_field);
                match percentage {
                    Some(p) => (p.clamp(0.0, 100.0).round() as u32, 100),
                    None => {
                        issues.push(ValidationIssue::new(STAGE, "category_scores", "missing"));
                        (0, 100)
                    }
                }
            }
        };
        let percentage = percentage_of(total_score, total_possible);

        let final_rec = record.get("final_recommendation");
        let recommendation = final_rec
            .and_then(|v| match v {
                Value::Object(o) => str_field(o, &["status"]),
                other => value_as_text(other),
            })
            .and_then(|s| Recommendation::parse_lenient(&s))
            .unwrap_or_else(|| Recommendation::for_percentage(percentage));
        let reasoning = final_rec
            .and_then(Value::as_object)
            .and_then(|o| str_field(o, &["reasoning"]));

        let report_issues = record
            .get("issues")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|o| {
                        let description = str_field(o, &["issue", "description"])?;
                        let severity = str_field(o, &["severity"])
                            .and_then(|s| Severity::parse_lenient(&s))
                            .unwrap_or(Severity::Minor);
                        Some(Issue {
                            severity,
                            location: str_field(o, &["location"])
                                .unwrap_or_else(|| "offer".to_string()),
                            description,
                            suggested_fix: str_field(o, &["suggested_fix"]),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            category_scores,
            total_score,
            total_possible,
            percentage,
            assessment: assessment_for(percentage).to_string(),
            issues: report_issues,
            strengths: list_field(record, "strengths"),
            improvement_priorities: ranked_priorities(record),
            recommendation,
            reasoning,
        }
    }
}

fn percentage_of(score: u32, possible: u32) -> u32 {
    if possible == 0 {
        0
    } else {
        ((f64::from(score) / f64::from(possible)) * 100.0).round() as u32
    }
}

/// Improvement priorities sorted by their `priority` rank.
fn ranked_priorities(record: &Map<String, Value>) -> Vec<String> {
    let Some(items) = record.get("improvement_priorities").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut ranked: Vec<(u64, String)> = items
        .iter()
        .enumerate()
        .filter_map(|(pos, item)| match item {
            Value::Object(o) => {
                let text = str_field(o, &["recommendation", "issue"])?;
                let rank = o
                    .get("priority")
                    .and_then(Value::as_u64)
                    .unwrap_or(pos as u64 + 1);
                Some((rank, text))
            }
            other => value_as_text(other).map(|t| (pos as u64 + 1, t)),
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, text)| text).collect()
}
