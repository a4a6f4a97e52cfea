//! Shared fixtures for offercraft integration tests

#![allow(dead_code)]

use offercraft::{MockClient, OfferOrchestrator, RawInput, RoleSet};
use serde_json::json;
use std::sync::Arc;

/// A client whose every stage answers with well-formed output.
pub fn scripted_client() -> MockClient {
    MockClient::new()
        .with_response(
            "gather",
            json!({
                "service_name": "Bookkeeping",
                "target_audience": "freelance designers",
                "industry": "finance",
                "pricing": {"amount": 350, "currency": "USD", "interval": "monthly"},
                "features": ["Monthly reconciliation", "Quarterly tax prep", "Receipt capture"],
                "completeness_score": 0.85
            })
            .to_string(),
        )
        .with_response(
            "copy",
            json!({
                "headline": "Books Done While You Design",
                "subtitle": "Bookkeeping built for freelancers",
                "description": "We keep your books clean so you can focus on clients.",
                "feature_bullets": [
                    "Reconciled every month",
                    "Tax-ready each quarter",
                    "Snap a receipt and forget it",
                    "A named accountant",
                    "Plain-English reports"
                ],
                "call_to_action": "Start this month",
                "emotional_angle": "time freedom"
            })
            .to_string(),
        )
        .with_response(
            "design",
            json!({
                "recommended_template": "elegant",
                "color_palette": {
                    "primary": {"hex": "#111827"},
                    "secondary": {"hex": "#6b7280"},
                    "accent": {"hex": "#f59e0b"}
                }
            })
            .to_string(),
        )
        .with_response(
            "audit",
            json!({
                "audit_summary": {"percentage": 82},
                "final_recommendation": {"status": "APPROVE"}
            })
            .to_string(),
        )
}

/// A client that answers every stage with text holding no JSON object.
pub fn unparseable_client() -> MockClient {
    ["gather", "copy", "design", "audit"]
        .into_iter()
        .fold(MockClient::new(), |client, role| {
            client.with_response(role, "Sorry, I can't help with that right now.")
        })
}

pub fn orchestrator(client: MockClient) -> (Arc<MockClient>, OfferOrchestrator) {
    let client = Arc::new(client);
    let roles = RoleSet::builtin().expect("built-in roles parse");
    (client.clone(), OfferOrchestrator::new(client, roles))
}

pub fn sample_input() -> RawInput {
    RawInput::new()
        .with("service_name", "Social Media Management")
        .with("price", 500)
}

pub fn sample_document() -> &'static str {
    "Growth Coaching Intensive\n\
     A twelve week program for founders who want to scale.\n\
     Investment: $2,400 per seat\n\
     - Weekly one-on-one calls\n\
     - Private community access\n\
     - Quarterly strategy review\n"
}
