//! Stage fallback policies
//!
//! One total function per stage. Each builds a structurally valid record
//! from whatever upstream data exists, using literal defaults for the rest.
//! They are invoked when a stage's generation call fails or its output
//! cannot be extracted. `whole_pipeline` is the outermost net: an offer
//! built from the request alone, bypassing every stage.

use super::{Mode, OfferRequest};
use crate::offer::{
    list_field, truncate_chars, BrandColors, BrandPersonality, ColorChoice, CopyBlock,
    DesignStrategy, GatheredInfo, HexColor, Insights, Offer, Pricing, QualityReport, RawInput,
    Recommendation, Template, TraceEntry, AUDIENCE_KEYS, DEFAULT_PRICE, DESCRIPTION_KEYS,
    MAX_HEADLINE_CHARS, MAX_SUBTITLE_CHARS, SERVICE_KEYS,
};
use chrono::Utc;
use serde_json::{Map, Value};

pub const DEFAULT_SERVICE: &str = "Professional Service";
pub const DEFAULT_TITLE: &str = "Professional Service Offer";
pub const DEFAULT_SUBTITLE: &str = "Transform your business with our proven solution";
pub const REDESIGN_SUBTITLE: &str = "Redesigned and enhanced for maximum impact";
pub const DEFAULT_DESCRIPTION: &str = "A comprehensive solution designed to help you achieve your goals. We provide expert guidance and support to ensure your success.";
pub const DEFAULT_CTA: &str = "Get started today and transform your results";
pub const DEFAULT_AUDIENCE: &str = "businesses";
pub const DEFAULT_FEATURES: [&str; 3] = [
    "Professional service delivery",
    "Expert support and guidance",
    "Proven results and outcomes",
];

/// Whole-pipeline fallback score, out of 100.
pub const FALLBACK_SCORE: u32 = 50;
/// Audit fallback score when every earlier stage completed.
pub const AUDIT_FALLBACK_SCORE: u32 = 75;

const MAX_INPUT_FEATURES: usize = 10;
const MAX_DOCUMENT_FEATURES: usize = 7;
const MAX_PROSE_FEATURES: usize = 5;
const MAX_TITLE_CHARS: usize = 60;
const DOCUMENT_DESCRIPTION_LINES: usize = 5;
const DOCUMENT_DESCRIPTION_CHARS: usize = 400;

/// A template with its three-colour palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub template: Template,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
}

pub const MODERN_PALETTE: Palette = Palette {
    template: Template::Modern,
    primary: "#3b82f6",
    secondary: "#8b5cf6",
    accent: "#10b981",
};

pub const BOLD_PALETTE: Palette = Palette {
    template: Template::Bold,
    primary: "#7c3aed",
    secondary: "#c084fc",
    accent: "#f97316",
};

pub const ELEGANT_PALETTE: Palette = Palette {
    template: Template::Elegant,
    primary: "#1e3a8a",
    secondary: "#eab308",
    accent: "#dc2626",
};

impl Palette {
    pub fn colors(&self) -> BrandColors {
        BrandColors {
            primary: HexColor::literal(self.primary),
            secondary: HexColor::literal(self.secondary),
            accent: HexColor::literal(self.accent),
        }
    }
}

/// Palette tier for a price: premium prices read as elegant, mid-range as bold.
pub fn palette_for_price(amount: f64) -> Palette {
    if amount >= 5000.0 {
        ELEGANT_PALETTE
    } else if amount >= 1000.0 {
        BOLD_PALETTE
    } else {
        MODERN_PALETTE
    }
}

pub fn default_features() -> Vec<String> {
    DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Per-stage policies
// ---------------------------------------------------------------------------

/// GATHER fallback, read straight from the request.
pub fn gather(request: &OfferRequest) -> GatheredInfo {
    match request {
        OfferRequest::Create(input) => gather_from_input(input),
        OfferRequest::Redesign { document, metadata } => {
            gather_from_document(document, metadata.as_ref())
        }
    }
}

fn gather_from_input(input: &RawInput) -> GatheredInfo {
    let service_name = input.text(SERVICE_KEYS);
    let description = input.text(DESCRIPTION_KEYS);
    let target_audience = input.text(AUDIENCE_KEYS);
    let price = input.price_amount().filter(|a| a.is_finite() && *a > 0.0);

    let mut features = list_field(input.as_map(), "features");
    features.truncate(MAX_INPUT_FEATURES);

    let checks = [
        ("service name", service_name.is_some()),
        ("price", price.is_some()),
        ("features", !features.is_empty()),
        ("description", description.is_some()),
        ("target audience", target_audience.is_some()),
    ];
    let present = checks.iter().filter(|(_, ok)| *ok).count();
    let missing_info = checks
        .iter()
        .filter(|(_, ok)| !*ok)
        .map(|(name, _)| name.to_string())
        .collect();

    if features.is_empty() {
        features = default_features();
    }

    GatheredInfo {
        service_name,
        description,
        target_audience,
        pricing: Some(price.map(Pricing::one_time).unwrap_or_default()),
        features,
        brand_personality: input
            .text(&["brand_personality"])
            .and_then(|p| BrandPersonality::parse_lenient(&p)),
        industry: input.text(&["industry"]),
        completeness_score: present as f64 / checks.len() as f64,
        missing_info,
        ..GatheredInfo::default()
    }
}

/// Heuristic read of an existing offer document.
fn gather_from_document(document: &str, metadata: Option<&Map<String, Value>>) -> GatheredInfo {
    let lines: Vec<&str> = document
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let price = lines
        .iter()
        .filter(|l| l.contains('$'))
        .find_map(|l| dollar_amount(l))
        .unwrap_or(DEFAULT_PRICE);

    let title = lines
        .first()
        .map(|l| truncate_chars(l, MAX_TITLE_CHARS))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let mut features = Vec::new();
    for line in &lines {
        if let Some(rest) = line.strip_prefix(&['•', '-', '*'][..]) {
            let item = rest.trim();
            if !item.is_empty() {
                features.push(item.to_string());
            }
        } else if line.split_whitespace().count() > 3 && features.len() < MAX_PROSE_FEATURES {
            features.push(line.to_string());
        }
    }
    if features.is_empty() {
        features = default_features();
    }
    features.truncate(MAX_DOCUMENT_FEATURES);

    let description = if lines.len() > DOCUMENT_DESCRIPTION_LINES {
        lines[..DOCUMENT_DESCRIPTION_LINES].join(" ")
    } else {
        document
            .trim()
            .chars()
            .take(DOCUMENT_DESCRIPTION_CHARS)
            .collect()
    };

    let industry = metadata.and_then(|m| m.get("industry")).and_then(|v| v.as_str());

    GatheredInfo {
        service_name: Some(title),
        description: Some(description).filter(|d| !d.is_empty()),
        pricing: Some(Pricing::one_time(price)),
        features,
        industry: industry.map(str::to_string),
        completeness_score: 0.0,
        ..GatheredInfo::default()
    }
}

/// The number following the first `$` in a line, if it parses.
fn dollar_amount(line: &str) -> Option<f64> {
    let after = line.split('$').nth(1)?;
    let token = after.split_whitespace().next()?;
    token
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a > 0.0)
}

/// COPY fallback, built from gathered facts.
pub fn copy(info: &GatheredInfo, mode: Mode) -> CopyBlock {
    let service = info.service_name.as_deref().unwrap_or(DEFAULT_SERVICE);
    let features = if info.features.is_empty() {
        default_features()
    } else {
        info.features.clone()
    };

    match mode {
        Mode::Create => {
            let audience = info.target_audience.as_deref().unwrap_or(DEFAULT_AUDIENCE);
            CopyBlock {
                headline: Some(truncate_chars(
                    &format!("Transform Your Business with {}", service),
                    MAX_HEADLINE_CHARS,
                )),
                subtitle: Some(truncate_chars(
                    &format!(
                        "The proven solution for {} who want exceptional results",
                        audience
                    ),
                    MAX_SUBTITLE_CHARS,
                )),
                description: Some(info.description.clone().unwrap_or_else(|| {
                    "A comprehensive solution designed to help you achieve your goals.".to_string()
                })),
                feature_bullets: features,
                call_to_action: Some(DEFAULT_CTA.to_string()),
                ..CopyBlock::default()
            }
        }
        Mode::Redesign => CopyBlock {
            headline: Some(truncate_chars(service, MAX_HEADLINE_CHARS)),
            subtitle: Some("Enhanced and optimized for maximum impact".to_string()),
            description: info.description.clone(),
            feature_bullets: features,
            call_to_action: Some(DEFAULT_CTA.to_string()),
            ..CopyBlock::default()
        },
    }
}

/// DESIGN fallback: template and palette by price tier. Redesigns keep the
/// neutral modern look.
pub fn design(info: &GatheredInfo, mode: Mode) -> DesignStrategy {
    let palette = match mode {
        Mode::Create => palette_for_price(
            info.pricing
                .as_ref()
                .map(|p| p.amount)
                .unwrap_or(DEFAULT_PRICE),
        ),
        Mode::Redesign => MODERN_PALETTE,
    };

    DesignStrategy {
        template: Some(palette.template),
        primary: Some(ColorChoice::plain(HexColor::literal(palette.primary))),
        secondary: Some(ColorChoice::plain(HexColor::literal(palette.secondary))),
        accent: Some(ColorChoice::plain(HexColor::literal(palette.accent))),
        template_reasoning: Some(format!("{} template selected by price tier", palette.template)),
        ..DesignStrategy::default()
    }
}

/// AUDIT fallback: an advisory report derived from the offer and the trace.
pub fn audit(offer: &Offer) -> QualityReport {
    let fell_back = offer.fallback_stages();
    let mut report = if fell_back.is_empty() {
        QualityReport::summary(
            AUDIT_FALLBACK_SCORE,
            100,
            Recommendation::Approve,
            Some("Automated audit unavailable; every generation stage completed".to_string()),
        )
    } else {
        QualityReport::summary(
            FALLBACK_SCORE,
            100,
            Recommendation::NeedsReview,
            Some("One or more stages used default content".to_string()),
        )
    };

    report.improvement_priorities = fell_back
        .iter()
        .map(|stage| format!("Review the {} output, it was filled with defaults", stage))
        .collect();
    let completeness = offer.completeness();
    if !completeness.ready_to_use {
        report.improvement_priorities.push(format!(
            "Complete the offer ({} of {} core fields)",
            completeness.filled, completeness.total
        ));
    }
    report
}

/// The whole-pipeline fallback: a minimal offer built from the request alone.
pub fn whole_pipeline(request: &OfferRequest, trace: Vec<TraceEntry>, failure: String) -> Offer {
    let mode = request.mode();
    let info = gather(request);

    let mut quality = QualityReport::summary(
        FALLBACK_SCORE,
        100,
        Recommendation::NeedsReview,
        Some("Generated using fallback method due to a processing error".to_string()),
    );
    quality.assessment = "Needs Review".to_string();

    Offer {
        title: info
            .service_name
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        subtitle: match mode {
            Mode::Create => DEFAULT_SUBTITLE,
            Mode::Redesign => REDESIGN_SUBTITLE,
        }
        .to_string(),
        description: info
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        price: info.pricing.clone().unwrap_or_default(),
        features: info.features.clone(),
        call_to_action: DEFAULT_CTA.to_string(),
        template: MODERN_PALETTE.template,
        brand_colors: MODERN_PALETTE.colors(),
        target_audience: info.target_audience.clone(),
        industry: info.industry.clone(),
        brand_personality: info.brand_personality.unwrap_or_default(),
        insights: Insights::default(),
        quality_report: Some(quality),
        execution_log: trace,
        validation_notes: Vec::new(),
        generated_at: Utc::now(),
        ai_generated: false,
        fallback: true,
        redesigned: mode == Mode::Redesign,
        failure: Some(failure),
    }
}
