//! ASSEMBLE: merge the three stage records into an offer
//!
//! Pure. Copy wins over gathered facts for presentation fields, and every
//! field absent from all sources gets a literal default, so the result is
//! always well-formed whatever the stages produced.

use super::fallback::{
    default_features, DEFAULT_CTA, DEFAULT_DESCRIPTION, DEFAULT_SERVICE, DEFAULT_SUBTITLE,
    MODERN_PALETTE,
};
use crate::offer::{
    BrandColors, ColorChoice, CopyBlock, DesignStrategy, GatheredInfo, HexColor, Insights, Offer,
};
use chrono::Utc;

/// Merge gathered facts, copy and design into an offer. The trace, quality
/// report and status flags are left for the orchestrator to fill in.
pub fn assemble(info: &GatheredInfo, copy: &CopyBlock, design: &DesignStrategy) -> Offer {
    let features = [&copy.feature_bullets, &info.features]
        .into_iter()
        .find(|list| !list.is_empty())
        .cloned()
        .unwrap_or_else(default_features);

    let pick = |choice: &Option<ColorChoice>, default: &'static str| {
        choice
            .as_ref()
            .map(|c| c.hex.clone())
            .unwrap_or_else(|| HexColor::literal(default))
    };

    Offer {
        title: copy
            .headline
            .clone()
            .or_else(|| info.service_name.clone())
            .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
        subtitle: copy
            .subtitle
            .clone()
            .unwrap_or_else(|| DEFAULT_SUBTITLE.to_string()),
        description: copy
            .description
            .clone()
            .or_else(|| info.description.clone())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        price: info.pricing.clone().unwrap_or_default(),
        features,
        call_to_action: copy
            .call_to_action
            .clone()
            .unwrap_or_else(|| DEFAULT_CTA.to_string()),
        template: design.template.unwrap_or_default(),
        brand_colors: BrandColors {
            primary: pick(&design.primary, MODERN_PALETTE.primary),
            secondary: pick(&design.secondary, MODERN_PALETTE.secondary),
            accent: pick(&design.accent, MODERN_PALETTE.accent),
        },
        target_audience: info.target_audience.clone(),
        industry: info.industry.clone(),
        brand_personality: info.brand_personality.unwrap_or_default(),
        insights: Insights {
            template_reasoning: design.template_reasoning.clone(),
            color_reasoning: design.color_reasoning.clone(),
            design_reasoning: design.reasoning_summary.clone(),
            copy_strategy: copy.emotional_angle.map(|a| {
                serde_json::to_value(a)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            }),
            power_words: copy.power_words.clone(),
            completeness_score: Some(info.completeness_score),
            typography: design.typography.clone(),
            template_scores: design.template_scores.clone(),
        },
        quality_report: None,
        execution_log: Vec::new(),
        validation_notes: Vec::new(),
        generated_at: Utc::now(),
        ai_generated: false,
        fallback: false,
        redesigned: false,
        failure: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{EmotionalAngle, Pricing, Template};

    #[test]
    fn empty_records_assemble_into_well_formed_offer() {
        let offer = assemble(
            &GatheredInfo::default(),
            &CopyBlock::default(),
            &DesignStrategy::default(),
        );
        assert!(offer.is_well_formed());
        assert_eq!(offer.title, DEFAULT_SERVICE);
        assert_eq!(offer.price, Pricing::default());
        assert_eq!(offer.template, Template::Modern);
        assert_eq!(offer.brand_colors.accent.as_str(), "#10b981");
        assert_eq!(offer.features.len(), 3);
    }

    #[test]
    fn copy_wins_over_gathered_facts() {
        let info = GatheredInfo {
            service_name: Some("Bookkeeping".into()),
            description: Some("We do books".into()),
            features: vec!["Monthly reconciliation".into()],
            pricing: Some(Pricing::one_time(300.0)),
            ..GatheredInfo::default()
        };
        let copy = CopyBlock {
            headline: Some("Never Dread Tax Season Again".into()),
            feature_bullets: vec!["Sleep well at night".into(), "Always audit-ready".into()],
            emotional_angle: Some(EmotionalAngle::LossAversion),
            ..CopyBlock::default()
        };

        let offer = assemble(&info, &copy, &DesignStrategy::default());
        assert_eq!(offer.title, "Never Dread Tax Season Again");
        assert_eq!(offer.description, "We do books");
        assert_eq!(offer.features, copy.feature_bullets);
        assert_eq!(offer.price.amount, 300.0);
        assert_eq!(offer.insights.copy_strategy.as_deref(), Some("loss-aversion"));
    }

    #[test]
    fn missing_palette_slot_gets_default() {
        let design = DesignStrategy {
            template: Some(Template::Vibrant),
            primary: Some(ColorChoice::plain(HexColor::parse("#ff0066").unwrap())),
            ..DesignStrategy::default()
        };
        let offer = assemble(&GatheredInfo::default(), &CopyBlock::default(), &design);
        assert_eq!(offer.template, Template::Vibrant);
        assert_eq!(offer.brand_colors.primary.as_str(), "#ff0066");
        assert_eq!(offer.brand_colors.secondary.as_str(), "#8b5cf6");
    }

    #[test]
    fn design_reasoning_reaches_insights() {
        let mut issues = Vec::new();
        let record = serde_json::json!({
            "recommended_template": "bold",
            "template_reasoning": "High-energy audience",
            "reasoning_summary": "Bold contrast suits a launch offer"
        });
        let design = DesignStrategy::from_record(record.as_object().unwrap(), &mut issues);

        let offer = assemble(&GatheredInfo::default(), &CopyBlock::default(), &design);
        assert_eq!(
            offer.insights.design_reasoning.as_deref(),
            Some("Bold contrast suits a launch offer")
        );
        assert_eq!(offer.insights.template_reasoning.as_deref(), Some("High-energy audience"));
    }
}
