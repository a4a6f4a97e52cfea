//! Batch processing with bounded concurrency
//!
//! Up to `concurrency` generations run at once. Results come back in input
//! order regardless of completion order, and one item's failure (even a
//! panic) never affects its siblings.

use super::{OfferGenerator, RunnerError};
use crate::offer::{Offer, RawInput};
use crate::pipeline::orchestrator::panic_message;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 3;

/// Outcome for one input of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    /// Position of the input in the submitted batch.
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Offer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn from_result(index: usize, result: Result<Offer, RunnerError>) -> Self {
        match result {
            Ok(offer) => Self {
                index,
                success: true,
                offer: Some(offer),
                error: None,
            },
            Err(e) => Self {
                index,
                success: false,
                offer: None,
                error: Some(e.to_string()),
            },
        }
    }
}

pub struct BatchRunner {
    generator: Arc<dyn OfferGenerator>,
    concurrency: usize,
}

impl BatchRunner {
    pub fn new(generator: Arc<dyn OfferGenerator>) -> Self {
        Self {
            generator,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit simultaneous generations (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every input; `result[i].index == i`.
    pub async fn process_batch(&self, inputs: Vec<RawInput>) -> Vec<BatchItem> {
        let total = inputs.len();
        info!(total, concurrency = self.concurrency, "batch started");

        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = FuturesUnordered::new();

        for (index, input) in inputs.into_iter().enumerate() {
            let sem = sem.clone();
            let generator = self.generator.clone();

            tasks.push(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = sem.acquire_owned().await.ok();
                debug!(index, total, "batch item started");
                let result = AssertUnwindSafe(generator.generate(input))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(RunnerError::Panicked(panic_message(payload.as_ref())))
                    });
                (index, result)
            });
        }

        let mut slots: Vec<Option<BatchItem>> = vec![None; total];
        while let Some((index, result)) = tasks.next().await {
            if let Err(e) = &result {
                warn!(index, error = %e, "batch item failed");
            } else {
                debug!(index, "batch item finished");
            }
            slots[index] = Some(BatchItem::from_result(index, result));
        }

        let items: Vec<BatchItem> = slots.into_iter().flatten().collect();
        let succeeded = items.iter().filter(|i| i.success).count();
        info!(total, succeeded, "batch finished");
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{fallback, OfferRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Sleeps for the input's "delay_ms", fails on "fail", panics on "panic".
    struct Scripted {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OfferGenerator for Scripted {
        async fn generate(&self, input: RawInput) -> Result<Offer, RunnerError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = input.get("delay_ms").and_then(|v| v.as_u64()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if input.get("fail").is_some() {
                return Err(RunnerError::Failed("scripted failure".into()));
            }
            if input.get("panic").is_some() {
                panic!("scripted panic");
            }
            Ok(fallback::whole_pipeline(
                &OfferRequest::Create(input),
                Vec::new(),
                "test".into(),
            ))
        }
    }

    fn item(delay_ms: u64) -> RawInput {
        RawInput::new().with("delay_ms", delay_ms)
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let runner = BatchRunner::new(Arc::new(Scripted::new())).with_concurrency(5);
        // item 3 finishes first
        let inputs = vec![item(80), item(60), item(40), item(1), item(50)];

        let results = runner.process_batch(inputs).await;
        assert_eq!(results.len(), 5);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.index, i);
            assert!(r.success);
        }
    }

    #[tokio::test]
    async fn failures_stay_local() {
        let runner = BatchRunner::new(Arc::new(Scripted::new()));
        let inputs = vec![
            item(5),
            item(1).with("fail", true),
            item(5),
            item(1).with("panic", true),
            item(5),
        ];

        let results = runner.process_batch(inputs).await;
        let flags: Vec<bool> = results.iter().map(|r| r.success).collect();
        assert_eq!(flags, vec![true, false, true, false, true]);
        assert!(results[1].error.as_deref().unwrap().contains("scripted failure"));
        assert!(results[3].error.as_deref().unwrap().contains("scripted panic"));
    }

    #[tokio::test]
    async fn concurrency_limit_is_respected() {
        let generator = Arc::new(Scripted::new());
        let runner = BatchRunner::new(generator.clone()).with_concurrency(2);

        runner.process_batch((0..6).map(|_| item(20)).collect()).await;
        assert_eq!(generator.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_batch() {
        let runner = BatchRunner::new(Arc::new(Scripted::new()));
        assert!(runner.process_batch(Vec::new()).await.is_empty());
    }
}
