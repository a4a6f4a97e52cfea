//! Closed vocabularies and validated value types used across offer records

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Gather,
    Copy,
    Design,
    Audit,
}

impl Stage {
    /// Pipeline order.
    pub const ALL: [Stage; 4] = [Stage::Gather, Stage::Copy, Stage::Design, Stage::Audit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Gather => "gather",
            Stage::Copy => "copy",
            Stage::Design => "design",
            Stage::Audit => "audit",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual template. Closed set; anything unrecognised becomes `Modern`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Modern,
    Bold,
    Elegant,
    Vibrant,
}

impl Template {
    pub const ALL: [Template; 4] = [
        Template::Modern,
        Template::Bold,
        Template::Elegant,
        Template::Vibrant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Modern => "modern",
            Template::Bold => "bold",
            Template::Elegant => "elegant",
            Template::Vibrant => "vibrant",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Parse, defaulting to `Modern` for unrecognised names.
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `#rrggbb` colour, stored lowercase. `#rgb` input is expanded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text.trim().strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded = match digits.len() {
            6 => digits.to_lowercase(),
            3 => digits
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_lowercase(),
            _ => return None,
        };
        Some(Self(format!("#{}", expanded)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A colour from a compile-time literal known to be valid.
    pub(crate) fn literal(hex: &'static str) -> Self {
        Self(hex.to_string())
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid hex color: {}", value))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Billing interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interval {
    #[default]
    OneTime,
    Monthly,
    Annually,
}

impl Interval {
    /// Accepts the canonical names plus common phrasings.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let t = text.trim().to_lowercase().replace(&['_', ' '][..], "-");
        match t.as_str() {
            "one-time" | "onetime" | "once" | "single" | "lifetime" => Some(Self::OneTime),
            "monthly" | "month" | "per-month" | "mo" | "/mo" => Some(Self::Monthly),
            "annually" | "annual" | "yearly" | "year" | "per-year" => Some(Self::Annually),
            _ => None,
        }
    }
}

/// A price. Amount is positive, currency an ISO 4217 code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub amount: f64,
    pub currency: String,
    pub interval: Interval,
}

/// Price used when no stage produced a valid one.
pub const DEFAULT_PRICE: f64 = 997.0;
pub const DEFAULT_CURRENCY: &str = "USD";

impl Default for Pricing {
    fn default() -> Self {
        Self {
            amount: DEFAULT_PRICE,
            currency: DEFAULT_CURRENCY.to_string(),
            interval: Interval::OneTime,
        }
    }
}

impl Pricing {
    pub fn one_time(amount: f64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }
}

/// Whether `code` looks like an ISO 4217 currency code.
pub(crate) fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandPersonality {
    #[default]
    Professional,
    Friendly,
    Bold,
    Luxurious,
    Technical,
}

impl BrandPersonality {
    pub fn parse_lenient(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "professional" => Some(Self::Professional),
            "friendly" | "casual" | "warm" => Some(Self::Friendly),
            "bold" => Some(Self::Bold),
            "luxurious" | "luxury" | "premium" => Some(Self::Luxurious),
            "technical" => Some(Self::Technical),
            _ => None,
        }
    }
}

/// Dominant emotional angle of the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmotionalAngle {
    LossAversion,
    GainSeeking,
    Status,
    TimeFreedom,
}

impl EmotionalAngle {
    /// Accepts canonical names and the descriptive phrasings models tend to use
    /// ("Fear of loss", "Desire for gain", "Social status", "Time freedom").
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let t = text.to_lowercase();
        if t.contains("loss") || t.contains("fear") {
            Some(Self::LossAversion)
        } else if t.contains("gain") || t.contains("desire") {
            Some(Self::GainSeeking)
        } else if t.contains("status") {
            Some(Self::Status)
        } else if t.contains("time") || t.contains("freedom") {
            Some(Self::TimeFreedom)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub fn parse_lenient(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "minor" | "low" => Some(Self::Minor),
            "major" | "medium" => Some(Self::Major),
            "critical" | "high" | "blocker" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Final recommendation of a quality audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    Approve,
    ApproveWithMinorChanges,
    Revise,
    /// Produced by the fallback audit when any stage fell back, and for the
    /// whole-pipeline fallback offer.
    NeedsReview,
}

impl Recommendation {
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let t = text.trim().to_lowercase().replace(&['_', ' '][..], "-");
        match t.as_str() {
            "approve" | "approved" => Some(Self::Approve),
            "approve-with-minor-changes" | "approve-with-changes" => {
                Some(Self::ApproveWithMinorChanges)
            }
            "revise" | "revise-and-resubmit" | "reject" => Some(Self::Revise),
            "needs-review" => Some(Self::NeedsReview),
            _ => None,
        }
    }

    /// Recommendation implied by a percentage score.
    pub fn for_percentage(percentage: u32) -> Self {
        if percentage >= 85 {
            Self::Approve
        } else if percentage >= 70 {
            Self::ApproveWithMinorChanges
        } else {
            Self::Revise
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_validate_and_normalise() {
        assert_eq!(HexColor::parse("#3B82F6").unwrap().as_str(), "#3b82f6");
        assert_eq!(HexColor::parse("#abc").unwrap().as_str(), "#aabbcc");
        assert!(HexColor::parse("3b82f6").is_none());
        assert!(HexColor::parse("#3b82f").is_none());
        assert!(HexColor::parse("#zzzzzz").is_none());
    }

    #[test]
    fn hex_color_deserialization_rejects_garbage() {
        let ok: HexColor = serde_json::from_str("\"#10b981\"").unwrap();
        assert_eq!(ok.as_str(), "#10b981");
        assert!(serde_json::from_str::<HexColor>("\"blue\"").is_err());
    }

    #[test]
    fn unknown_template_falls_back_to_modern() {
        assert_eq!(Template::parse_or_default("Elegant"), Template::Elegant);
        assert_eq!(Template::parse_or_default("brutalist"), Template::Modern);
        assert_eq!(
            serde_json::to_string(&Template::Vibrant).unwrap(),
            "\"vibrant\""
        );
    }

    #[test]
    fn lenient_vocabularies() {
        assert_eq!(Interval::parse_lenient("per month"), Some(Interval::Monthly));
        assert_eq!(Interval::parse_lenient("One Time"), Some(Interval::OneTime));
        assert_eq!(Interval::parse_lenient("weekly"), None);
        assert_eq!(
            EmotionalAngle::parse_lenient("Fear of loss"),
            Some(EmotionalAngle::LossAversion)
        );
        assert_eq!(
            Recommendation::parse_lenient("APPROVE_WITH_MINOR_CHANGES"),
            Some(Recommendation::ApproveWithMinorChanges)
        );
        assert_eq!(
            Recommendation::parse_lenient("REVISE_AND_RESUBMIT"),
            Some(Recommendation::Revise)
        );
        assert_eq!(Severity::parse_lenient("MAJOR"), Some(Severity::Major));
    }

    #[test]
    fn recommendation_thresholds() {
        assert_eq!(Recommendation::for_percentage(90), Recommendation::Approve);
        assert_eq!(
            Recommendation::for_percentage(75),
            Recommendation::ApproveWithMinorChanges
        );
        assert_eq!(Recommendation::for_percentage(40), Recommendation::Revise);
    }

    #[test]
    fn interval_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Interval::OneTime).unwrap(),
            "\"one-time\""
        );
    }
}
