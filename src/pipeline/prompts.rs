//! Stage context builders
//!
//! Each stage's prompt body is a JSON payload plus short task instructions.
//! The persona and response contract travel separately in the role config.
//! Data flow is fixed: COPY sees only the gathered record, DESIGN sees the
//! gathered record merged with the copy, AUDIT sees the assembled offer.

use super::{Mode, OfferRequest, PipelineError, PipelineResult};
use crate::offer::{
    CopyBlock, GatheredInfo, Offer, RawInput, AUDIENCE_KEYS, DESCRIPTION_KEYS, PRICE_KEYS,
    SERVICE_KEYS,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

const REDESIGN_INSTRUCTIONS: &str = "This is an EXISTING offer document. Extract all components \
(service name, price, features, description). Identify what is working well and what is weak.";

const ENHANCE_INSTRUCTIONS: &str = "This is a redesign. Keep the core service intact but improve \
the headline, turn features into benefit-driven statements, and raise overall persuasiveness. \
Preserve the original pricing and core offering.";

fn to_json<T: Serialize>(what: &'static str, value: &T) -> PipelineResult<Value> {
    serde_json::to_value(value).map_err(|source| PipelineError::Context { what, source })
}

fn render(what: &'static str, payload: &Value) -> PipelineResult<String> {
    serde_json::to_string_pretty(payload).map_err(|source| PipelineError::Context { what, source })
}

/// GATHER context: the user's input and which essentials it already covers,
/// or the existing document in redesign mode.
pub fn gather_context(request: &OfferRequest) -> PipelineResult<String> {
    let payload = match request {
        OfferRequest::Create(input) => json!({
            "user_provided_input": input,
            "information_already_present": presence(input),
        }),
        OfferRequest::Redesign { document, metadata } => {
            let mut payload = json!({
                "mode": Mode::Redesign,
                "raw_content": document,
                "instructions": REDESIGN_INSTRUCTIONS,
            });
            if let Some(meta) = metadata {
                payload["metadata"] = Value::Object(meta.clone());
            }
            payload
        }
    };
    render("gather input", &payload)
}

fn presence(input: &RawInput) -> Value {
    json!({
        "service_name": input.has_any(SERVICE_KEYS),
        "pricing": input.has_any(PRICE_KEYS),
        "features": input.has_any(&["features"]),
        "description": input.has_any(DESCRIPTION_KEYS),
        "target_audience": input.has_any(AUDIENCE_KEYS),
    })
}

/// COPY context: the gathered record only.
pub fn copy_context(info: &GatheredInfo, mode: Mode) -> PipelineResult<String> {
    let mut payload = json!({ "gathered_information": to_json("gathered information", info)? });
    if mode == Mode::Redesign {
        payload["instructions"] = Value::String(ENHANCE_INSTRUCTIONS.to_string());
    }
    render("copy input", &payload)
}

/// DESIGN context: the gathered record with the copy merged over it.
pub fn design_context(info: &GatheredInfo, copy: &CopyBlock, mode: Mode) -> PipelineResult<String> {
    let mut merged = as_object(to_json("gathered information", info)?);
    merged.extend(as_object(to_json("copy", copy)?));
    if mode == Mode::Redesign {
        merged.insert("redesign_mode".to_string(), Value::Bool(true));
    }
    render("design input", &Value::Object(merged))
}

/// AUDIT context: the assembled offer.
pub fn audit_context(offer: &Offer) -> PipelineResult<String> {
    let payload = json!({ "complete_offer": to_json("assembled offer", offer)? });
    render("audit input", &payload)
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
