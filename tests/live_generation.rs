//! Runs the pipeline against a live endpoint.
//!
//! Enabled with `--features real_llm`; reads the same settings as the CLI.

#![cfg(feature = "real_llm")]

use offercraft::config::{default_config_path, Settings};
use offercraft::{HttpClient, OfferOrchestrator, RawInput};
use std::sync::Arc;

#[tokio::test]
async fn live_endpoint_produces_a_well_formed_offer() {
    let settings = Settings::load(&default_config_path()).unwrap();
    let generation = &settings.generation;
    let client = HttpClient::new(&generation.endpoint, &generation.model, generation.api_key()).unwrap();
    let orch = OfferOrchestrator::new(Arc::new(client), settings.roles().unwrap())
        .with_stage_timeout(settings.stage_timeout());

    let offer = orch
        .create(
            RawInput::new()
                .with("service_name", "Social Media Management")
                .with("target_audience", "independent restaurants")
                .with("price", 1500),
        )
        .await;

    assert!(offer.is_well_formed());
    assert_eq!(offer.execution_log.len(), 4);
    for entry in &offer.execution_log {
        eprintln!("{} {:?} {:?}", entry.stage, entry.status, entry.detail);
    }
}
