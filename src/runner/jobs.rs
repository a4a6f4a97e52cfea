//! Asynchronous jobs with status tracking
//!
//! A job moves pending → processing → completed | failed, each transition
//! exactly once. Status change and result write happen under the job
//! table's per-entry lock. When a job reaches a terminal state and a
//! callback target was given, a best-effort webhook is sent; a failed
//! notification is logged and never changes the job's status.
//!
//! Jobs live in memory for the lifetime of the runner.

use super::{OfferGenerator, RunnerError};
use crate::offer::{Offer, RawInput};
use crate::pipeline::orchestrator::panic_message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error("job {id} already {status}")]
    AlreadyStarted { id: Uuid, status: JobStatus },
}

struct JobRecord {
    /// Taken when processing starts.
    input: Option<RawInput>,
    callback: Option<String>,
    status: JobStatus,
    result: Option<Offer>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Offer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Body posted to a job's callback target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Offer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait JobNotifier: Send + Sync {
    async fn notify(&self, target: &str, payload: &WebhookPayload) -> Result<(), NotifyError>;
}

/// Posts the payload as JSON with a short timeout.
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JobNotifier for WebhookNotifier {
    async fn notify(&self, target: &str, payload: &WebhookPayload) -> Result<(), NotifyError> {
        let response = self.client.post(target).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status))
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct JobRunner {
    generator: Arc<dyn OfferGenerator>,
    notifier: Option<Arc<dyn JobNotifier>>,
    jobs: DashMap<Uuid, JobRecord>,
}

impl JobRunner {
    pub fn new(generator: Arc<dyn OfferGenerator>) -> Self {
        Self {
            generator,
            notifier: None,
            jobs: DashMap::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn JobNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Register a pending job.
    pub fn create_job(&self, input: RawInput, callback: Option<String>) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.jobs.insert(
            id,
            JobRecord {
                input: Some(input),
                callback,
                status: JobStatus::Pending,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        info!(job_id = %id, status = "pending", "job created");
        id
    }

    /// Create a job and process it in the background.
    pub fn submit(self: &Arc<Self>, input: RawInput, callback: Option<String>) -> Uuid {
        let id = self.create_job(input, callback);
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = runner.process_job(id).await {
                warn!(job_id = %id, error = %e, "background job not processed");
            }
        });
        id
    }

    /// Run a pending job to its terminal state and return that state.
    pub async fn process_job(&self, id: Uuid) -> Result<JobStatus, JobError> {
        let (input, callback) = {
            let mut job = self.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
            if job.status != JobStatus::Pending {
                return Err(JobError::AlreadyStarted {
                    id,
                    status: job.status,
                });
            }
            job.status = JobStatus::Processing;
            job.updated_at = Utc::now();
            (job.input.take().unwrap_or_default(), job.callback.clone())
        };
        info!(job_id = %id, status = "processing", "job started");

        let result = AssertUnwindSafe(self.generator.generate(input))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(RunnerError::Panicked(panic_message(payload.as_ref()))));

        let payload = {
            let mut job = self.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
            match result {
                Ok(offer) => {
                    job.status = JobStatus::Completed;
                    job.result = Some(offer);
                }
                Err(e) => {
                    job.status = JobStatus::Failed;
                    job.error = Some(e.to_string());
                }
            }
            job.updated_at = Utc::now();
            WebhookPayload {
                job_id: id,
                status: job.status,
                result: job.result.clone(),
                error: job.error.clone(),
            }
        };
        info!(job_id = %id, status = %payload.status, "job finished");

        if let (Some(target), Some(notifier)) = (callback, &self.notifier) {
            match notifier.notify(&target, &payload).await {
                Ok(()) => info!(job_id = %id, target = %target, "webhook delivered"),
                Err(e) => warn!(job_id = %id, target = %target, error = %e, "webhook failed"),
            }
        }

        Ok(payload.status)
    }

    pub fn get_status(&self, id: Uuid) -> Option<JobSnapshot> {
        self.jobs.get(&id).map(|job| JobSnapshot {
            job_id: id,
            status: job.status,
            result: job.result.clone(),
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{fallback, OfferRequest};
    use std::sync::Mutex;

    struct Echo;

    #[async_trait]
    impl OfferGenerator for Echo {
        async fn generate(&self, input: RawInput) -> Result<Offer, RunnerError> {
            if input.get("fail").is_some() {
                return Err(RunnerError::Failed("scripted failure".into()));
            }
            Ok(fallback::whole_pipeline(
                &OfferRequest::Create(input),
                Vec::new(),
                "test".into(),
            ))
        }
    }

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, WebhookPayload)>>,
    }

    #[async_trait]
    impl JobNotifier for Recording {
        async fn notify(&self, target: &str, payload: &WebhookPayload) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((target.to_string(), payload.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn job_moves_from_pending_to_completed_once() {
        let runner = JobRunner::new(Arc::new(Echo));
        let id = runner.create_job(RawInput::new().with("service_name", "Coaching"), None);
        assert_eq!(runner.get_status(id).unwrap().status, JobStatus::Pending);

        assert_eq!(runner.process_job(id).await, Ok(JobStatus::Completed));
        let first = runner.get_status(id).unwrap();
        assert_eq!(first.result.as_ref().unwrap().title, "Coaching");

        // a second run is refused and the stored result is unchanged
        assert_eq!(
            runner.process_job(id).await,
            Err(JobError::AlreadyStarted {
                id,
                status: JobStatus::Completed
            })
        );
        assert_eq!(runner.get_status(id).unwrap(), first);
    }

    #[tokio::test]
    async fn failed_generation_marks_job_failed() {
        let runner = JobRunner::new(Arc::new(Echo));
        let id = runner.create_job(RawInput::new().with("fail", true), None);

        assert_eq!(runner.process_job(id).await, Ok(JobStatus::Failed));
        let snapshot = runner.get_status(id).unwrap();
        assert!(snapshot.result.is_none());
        assert!(snapshot.error.unwrap().contains("scripted failure"));
    }

    #[tokio::test]
    async fn unknown_job() {
        let runner = JobRunner::new(Arc::new(Echo));
        let id = Uuid::new_v4();
        assert_eq!(runner.process_job(id).await, Err(JobError::NotFound(id)));
        assert!(runner.get_status(id).is_none());
    }

    #[tokio::test]
    async fn terminal_state_notifies_callback() {
        let recorder = Arc::new(Recording::default());
        let runner = JobRunner::new(Arc::new(Echo)).with_notifier(recorder.clone());

        let with_hook = runner.create_job(RawInput::new(), Some("http://hooks.local/a".into()));
        let without_hook = runner.create_job(RawInput::new(), None);
        runner.process_job(with_hook).await.unwrap();
        runner.process_job(without_hook).await.unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "http://hooks.local/a");
        assert_eq!(sent[0].1.job_id, with_hook);
        assert_eq!(sent[0].1.status, JobStatus::Completed);
        assert!(sent[0].1.result.is_some());
    }

    #[tokio::test]
    async fn unreachable_webhook_keeps_terminal_status() {
        let notifier = WebhookNotifier::new(Duration::from_millis(500)).unwrap();
        let runner = JobRunner::new(Arc::new(Echo)).with_notifier(Arc::new(notifier));

        // nothing listens on the discard port
        let id = runner.create_job(RawInput::new(), Some("http://127.0.0.1:9/hook".into()));
        assert_eq!(runner.process_job(id).await, Ok(JobStatus::Completed));
        assert_eq!(runner.get_status(id).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn submitted_job_completes_in_background() {
        let runner = Arc::new(JobRunner::new(Arc::new(Echo)));
        let id = runner.submit(RawInput::new(), None);

        let mut status = runner.get_status(id).unwrap().status;
        for _ in 0..100 {
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = runner.get_status(id).unwrap().status;
        }
        assert_eq!(status, JobStatus::Completed);
        assert_eq!(runner.len(), 1);
    }
}
