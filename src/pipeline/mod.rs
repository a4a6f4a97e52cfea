//! The four-stage offer pipeline
//!
//! GATHER → COPY → DESIGN → ASSEMBLE → AUDIT → DONE. Each generation stage
//! either yields a structured record through the extractor or is replaced by
//! its fallback policy; ASSEMBLE is a pure merge. The orchestrator catches
//! anything that escapes the staged run and substitutes the whole-pipeline
//! fallback, so a caller always receives a well-formed `Offer`.

pub mod assemble;
pub mod extract;
pub mod fallback;
pub mod orchestrator;
pub mod plan;
pub mod prompts;

pub use assemble::assemble;
pub use extract::{extract, extract_value, Extraction, ExtractionFailure};
pub use orchestrator::{OfferOrchestrator, StageTrial, SystemStats, DEFAULT_STAGE_TIMEOUT};
pub use plan::{dry_run, plan, DryRun, PlanStep};

use crate::offer::RawInput;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Whether the pipeline builds a fresh offer or reworks an existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Create,
    Redesign,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Create => "create",
            Mode::Redesign => "redesign",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline is asked to work from.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferRequest {
    /// Fresh user input.
    Create(RawInput),
    /// Previously authored offer text, with optional file metadata.
    Redesign {
        document: String,
        metadata: Option<Map<String, Value>>,
    },
}

impl OfferRequest {
    pub fn mode(&self) -> Mode {
        match self {
            OfferRequest::Create(_) => Mode::Create,
            OfferRequest::Redesign { .. } => Mode::Redesign,
        }
    }
}

/// Unanticipated failures inside a staged run. Never returned to callers;
/// the orchestrator converts them into the whole-pipeline fallback.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to serialize {what} for stage context: {source}")]
    Context {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("staged run panicked: {0}")]
    Panicked(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
