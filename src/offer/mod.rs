//! Offer data model: raw input, per-stage records, the assembled offer

mod fields;
mod input;
mod model;
mod record;
mod stages;

pub(crate) use fields::{list_field, truncate_chars};
pub(crate) use input::{AUDIENCE_KEYS, DESCRIPTION_KEYS, PRICE_KEYS, SERVICE_KEYS};
pub use input::RawInput;
pub use model::{
    BrandPersonality, EmotionalAngle, HexColor, Interval, Pricing, Recommendation, Severity,
    Stage, Template, DEFAULT_CURRENCY, DEFAULT_PRICE,
};
pub use record::{
    BrandColors, Completeness, Insights, Offer, StageStatus, TraceEntry, READY_THRESHOLD,
};
pub use stages::{
    assessment_for, CategoryScore, CategoryScores, ColorChoice, CopyBlock, DesignStrategy,
    GatheredInfo, Issue, QualityReport, Typography, ValidationIssue, CATEGORY_MAXIMA, MAX_BULLETS,
    MAX_FEATURES, MAX_HEADLINE_CHARS, MAX_SUBTITLE_CHARS,
};
