//! Offercraft: staged generation of structured sales offers
//!
//! Free-form business input goes through four generation stages
//! (gather, copy, design, audit) plus a deterministic assembly step.
//! Every stage has a fallback, so a run always yields a well-formed
//! [`Offer`], flagged as degraded when any stage fell back.
//!
//! # Core Concepts
//!
//! - **Stages**: one role-configured generation each, bounded by a timeout
//! - **Extraction**: lenient recovery of a JSON record from model text
//! - **Fallbacks**: deterministic substitutes derived from the input
//! - **Runners**: bounded-concurrency batches and asynchronous jobs
//!
//! # Example
//!
//! ```no_run
//! use offercraft::{MockClient, OfferOrchestrator, RawInput, RoleSet};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = OfferOrchestrator::new(Arc::new(MockClient::new()), RoleSet::builtin()?);
//! let offer = orchestrator
//!     .create(RawInput::new().with("service", "Bookkeeping"))
//!     .await;
//! assert!(!offer.features.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod generation;
pub mod monitor;
pub mod offer;
pub mod pipeline;
pub mod quota;
pub mod roles;
pub mod runner;

pub use cache::{fingerprint, CacheStats, OfferCache};
pub use config::{ConfigError, GenerationSettings, Settings};
pub use generation::{GenerationClient, GenerationError, GenerationOutput, HttpClient, MockClient};
pub use monitor::{Analytics, PerformanceMonitor};
pub use offer::{Offer, RawInput, Stage, StageStatus, TraceEntry};
pub use pipeline::{DryRun, Mode, OfferOrchestrator, OfferRequest, StageTrial, SystemStats};
pub use quota::{AccountTier, QuotaError};
pub use roles::{RoleConfig, RoleError, RoleSet};
pub use runner::{BatchItem, BatchRunner, JobRunner, JobStatus, OfferGenerator, RunnerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
