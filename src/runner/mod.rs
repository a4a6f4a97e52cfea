//! Fan-out over many independent pipeline runs
//!
//! - `batch`: bounded-concurrency processing of an ordered list of inputs
//! - `jobs`: asynchronous jobs with status tracking and webhook notification

pub mod batch;
pub mod jobs;

pub use batch::{BatchItem, BatchRunner, DEFAULT_CONCURRENCY};
pub use jobs::{
    JobError, JobNotifier, JobRunner, JobSnapshot, JobStatus, NotifyError, WebhookNotifier,
    WebhookPayload, DEFAULT_WEBHOOK_TIMEOUT,
};

use crate::offer::{Offer, RawInput};
use crate::pipeline::OfferOrchestrator;
use async_trait::async_trait;
use thiserror::Error;

/// Why a run produced no offer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error("offer generation failed: {0}")]
    Failed(String),
    #[error("offer generation panicked: {0}")]
    Panicked(String),
}

/// Something that turns raw input into an offer. The orchestrator is the
/// production implementation; runners are generic over it.
#[async_trait]
pub trait OfferGenerator: Send + Sync {
    async fn generate(&self, input: RawInput) -> Result<Offer, RunnerError>;
}

#[async_trait]
impl OfferGenerator for OfferOrchestrator {
    async fn generate(&self, input: RawInput) -> Result<Offer, RunnerError> {
        Ok(self.create(input).await)
    }
}
