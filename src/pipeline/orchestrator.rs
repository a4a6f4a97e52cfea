//! Pipeline orchestrator
//!
//! Sequences GATHER → COPY → DESIGN → ASSEMBLE → AUDIT, wiring each stage's
//! structured result into the next stage's context. A stage whose
//! generation call fails, times out, or returns unextractable output is
//! replaced by its fallback policy and the run continues. Errors and panics
//! escaping the staged run are caught here and turned into the
//! whole-pipeline fallback offer.
//!
//! Stages are strictly sequential within one run. Concurrency across runs
//! belongs to the runners.

use super::extract::{extract, Extraction, ExtractionFailure};
use super::{assemble, fallback, prompts, Mode, OfferRequest, PipelineError, PipelineResult};
use crate::cache::{CacheStats, OfferCache};
use crate::generation::{GenerationClient, GenerationError, GenerationOutput};
use crate::monitor::{Analytics, PerformanceMonitor};
use crate::offer::{
    CopyBlock, DesignStrategy, GatheredInfo, Offer, QualityReport, RawInput, Stage, StageStatus,
    TraceEntry, ValidationIssue,
};
use crate::roles::RoleSet;
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Bound on a single generation attempt. A stage makes up to its role's
/// `max_iterations` attempts, so the stage as a whole is bounded by
/// `timeout * max_iterations` (6 minutes for a 3-attempt role at the default).
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Why a stage produced no record.
#[derive(Debug)]
enum StageFailure {
    Port(GenerationError),
    Extraction(ExtractionFailure),
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageFailure::Port(e) => write!(f, "{}", e),
            StageFailure::Extraction(e) => write!(f, "extraction failed: {}", e),
        }
    }
}

/// Position in the pipeline, carrying what the next transition consumes.
enum PipelineState {
    Gather,
    Copy(GatheredInfo),
    Design(GatheredInfo, CopyBlock),
    Assemble(GatheredInfo, CopyBlock, DesignStrategy),
    Audit(Box<Offer>),
    Done(Box<Offer>),
}

/// Trace and validation notes accumulated during one run. Lives outside the
/// staged future so a partial trace survives a panic.
#[derive(Default)]
struct RunLog {
    trace: Vec<TraceEntry>,
    issues: Vec<ValidationIssue>,
}

impl RunLog {
    fn push(&mut self, stage: Stage, status: StageStatus, detail: Option<String>) {
        match status {
            StageStatus::Completed => info!(stage = %stage, status = "completed", "stage finished"),
            StageStatus::Fallback => warn!(
                stage = %stage,
                status = "fallback",
                reason = detail.as_deref().unwrap_or_default(),
                "stage fell back"
            ),
        }
        self.trace.push(TraceEntry {
            stage,
            status,
            timestamp: Utc::now(),
            detail,
        });
    }
}

/// Outcome of one stage run in isolation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTrial {
    pub stage: Stage,
    /// What the port returned, if the call succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<GenerationOutput>,
    /// The record the extractor recovered from `raw`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cache and monitor figures for one orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Analytics>,
}

/// Runs the offer pipeline against a generation client.
///
/// Cache and monitor are optional, explicitly injected collaborators.
pub struct OfferOrchestrator {
    client: Arc<dyn GenerationClient>,
    roles: RoleSet,
    stage_timeout: Duration,
    cache: Option<Arc<OfferCache>>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl OfferOrchestrator {
    pub fn new(client: Arc<dyn GenerationClient>, roles: RoleSet) -> Self {
        Self {
            client,
            roles,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            cache: None,
            monitor: None,
        }
    }

    /// Bound each generation attempt. See [`DEFAULT_STAGE_TIMEOUT`] for the
    /// resulting per-stage bound.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: Arc<OfferCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn cache(&self) -> Option<&Arc<OfferCache>> {
        self.cache.as_ref()
    }

    pub fn monitor(&self) -> Option<&Arc<PerformanceMonitor>> {
        self.monitor.as_ref()
    }

    pub fn stage_timeout(&self) -> Duration {
        self.stage_timeout
    }

    pub fn system_stats(&self) -> SystemStats {
        SystemStats {
            cache: self.cache.as_ref().map(|c| c.stats()),
            performance: self.monitor.as_ref().map(|m| m.analytics()),
        }
    }

    /// Empty the result cache, if one is attached.
    pub fn clear_caches(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            info!("caches cleared");
        }
    }

    /// Call one stage's role once with `context` and extract its record.
    /// No fallback, retry, cache or monitor is involved.
    pub async fn try_stage(&self, stage: Stage, context: &str) -> StageTrial {
        let role = self.roles.get(stage);
        let call = tokio::time::timeout(self.stage_timeout, self.client.generate(role, context));
        let mut trial = StageTrial {
            stage,
            raw: None,
            record: None,
            error: None,
        };
        match call.await {
            Ok(Ok(output)) => {
                match extract(&output) {
                    Extraction::Record(record) => trial.record = Some(record),
                    Extraction::Failed(f) => {
                        trial.error = Some(StageFailure::Extraction(f).to_string())
                    }
                }
                trial.raw = Some(output);
            }
            Ok(Err(e)) => trial.error = Some(e.to_string()),
            Err(_) => trial.error = Some(GenerationError::Timeout(self.stage_timeout).to_string()),
        }
        debug!(stage = %stage, ok = trial.record.is_some(), "stage trial finished");
        trial
    }

    /// Build an offer from fresh user input.
    pub async fn create(&self, input: RawInput) -> Offer {
        self.run(OfferRequest::Create(input)).await
    }

    /// Rework an existing offer document.
    pub async fn redesign(
        &self,
        document: impl Into<String>,
        metadata: Option<Map<String, Value>>,
    ) -> Offer {
        self.run(OfferRequest::Redesign {
            document: document.into(),
            metadata,
        })
        .await
    }

    /// Run the pipeline. Always returns a well-formed offer.
    pub async fn run(&self, request: OfferRequest) -> Offer {
        let started = Instant::now();
        let mode = request.mode();

        if let (Some(cache), OfferRequest::Create(input)) = (&self.cache, &request) {
            if let Some(hit) = cache.get(input) {
                info!(mode = %mode, "returning cached offer");
                return hit;
            }
        }

        let mut log = RunLog::default();
        let outcome = AssertUnwindSafe(self.run_stages(&request, &mut log))
            .catch_unwind()
            .await;

        let offer = match outcome {
            Ok(Ok(offer)) => offer,
            Ok(Err(e)) => self.recover(&request, log, e),
            Err(payload) => {
                let e = PipelineError::Panicked(panic_message(payload.as_ref()));
                self.recover(&request, log, e)
            }
        };

        if let (Some(cache), OfferRequest::Create(input)) = (&self.cache, &request) {
            if offer.ai_generated {
                cache.set(input, offer.clone());
            }
        }
        if let Some(monitor) = &self.monitor {
            monitor.record(mode, started.elapsed(), &offer);
        }

        info!(
            mode = %mode,
            ai_generated = offer.ai_generated,
            fallback = offer.fallback,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "offer ready"
        );
        offer
    }

    fn recover(&self, request: &OfferRequest, log: RunLog, e: PipelineError) -> Offer {
        error!(
            mode = %request.mode(),
            error = %e,
            completed_stages = log.trace.len(),
            "pipeline failed, using fallback offer"
        );
        fallback::whole_pipeline(request, log.trace, e.to_string())
    }

    async fn run_stages(&self, request: &OfferRequest, log: &mut RunLog) -> PipelineResult<Offer> {
        let mode = request.mode();
        let mut state = PipelineState::Gather;

        loop {
            state = match state {
                PipelineState::Gather => {
                    let context = prompts::gather_context(request)?;
                    let info = self
                        .stage(
                            Stage::Gather,
                            &context,
                            log,
                            GatheredInfo::from_record,
                            || fallback::gather(request),
                        )
                        .await;
                    PipelineState::Copy(info)
                }

                PipelineState::Copy(info) => {
                    let context = prompts::copy_context(&info, mode)?;
                    let copy = self
                        .stage(Stage::Copy, &context, log, CopyBlock::from_record, || {
                            fallback::copy(&info, mode)
                        })
                        .await;
                    PipelineState::Design(info, copy)
                }

                PipelineState::Design(info, copy) => {
                    let context = prompts::design_context(&info, &copy, mode)?;
                    let design = self
                        .stage(
                            Stage::Design,
                            &context,
                            log,
                            DesignStrategy::from_record,
                            || fallback::design(&info, mode),
                        )
                        .await;
                    PipelineState::Assemble(info, copy, design)
                }

                PipelineState::Assemble(info, copy, design) => {
                    let mut offer = assemble(&info, &copy, &design);
                    offer.redesigned = mode == Mode::Redesign;
                    offer.execution_log = log.trace.clone();
                    debug!(title = %offer.title, template = %offer.template, "offer assembled");
                    PipelineState::Audit(Box::new(offer))
                }

                PipelineState::Audit(mut offer) => {
                    let context = prompts::audit_context(&offer)?;
                    let report = self
                        .stage(
                            Stage::Audit,
                            &context,
                            log,
                            QualityReport::from_record,
                            || fallback::audit(&offer),
                        )
                        .await;

                    offer.quality_report = Some(report);
                    offer.execution_log = log.trace.clone();
                    offer.validation_notes = std::mem::take(&mut log.issues);
                    offer.ai_generated = offer.all_stages_completed();
                    PipelineState::Done(offer)
                }

                PipelineState::Done(offer) => return Ok(*offer),
            };
        }
    }

    /// Run one generation stage: a parsed record on success, the stage's
    /// fallback otherwise. Appends exactly one trace entry.
    async fn stage<T>(
        &self,
        stage: Stage,
        context: &str,
        log: &mut RunLog,
        parse: impl FnOnce(&Map<String, Value>, &mut Vec<ValidationIssue>) -> T,
        fallback: impl FnOnce() -> T,
    ) -> T {
        match self.generate(stage, context).await {
            Ok(record) => {
                let value = parse(&record, &mut log.issues);
                log.push(stage, StageStatus::Completed, None);
                value
            }
            Err(failure) => {
                let value = fallback();
                log.push(stage, StageStatus::Fallback, Some(failure.to_string()));
                value
            }
        }
    }

    /// Call the port for `stage` within its iteration budget, each attempt
    /// bounded by the stage timeout. An unavailable backend is not retried.
    async fn generate(&self, stage: Stage, context: &str) -> Result<Map<String, Value>, StageFailure> {
        let role = self.roles.get(stage);
        let attempts = role.max_iterations.max(1);
        let mut last = StageFailure::Port(GenerationError::Unavailable("no attempt made".into()));

        for attempt in 1..=attempts {
            debug!(stage = %stage, attempt, "generation started");
            let call = tokio::time::timeout(self.stage_timeout, self.client.generate(role, context));
            let failure = match call.await {
                Ok(Ok(output)) => match extract(&output) {
                    Extraction::Record(record) => return Ok(record),
                    Extraction::Failed(f) => StageFailure::Extraction(f),
                },
                Ok(Err(e @ GenerationError::Unavailable(_))) => return Err(StageFailure::Port(e)),
                Ok(Err(e)) => StageFailure::Port(e),
                Err(_) => StageFailure::Port(GenerationError::Timeout(self.stage_timeout)),
            };
            debug!(stage = %stage, attempt, error = %failure, "generation attempt failed");
            last = failure;
        }
        Err(last)
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockClient;
    use crate::offer::{Recommendation, Template};
    use serde_json::json;

    fn gather_json() -> String {
        json!({
            "service_name": "Social Media Management",
            "target_audience": "local restaurants",
            "pricing": {"amount": 1500, "currency": "USD", "interval": "monthly"},
            "features": ["Content calendar", "Daily posting", "Monthly analytics report"],
            "completeness_score": 0.9
        })
        .to_string()
    }

    fn scripted() -> MockClient {
        MockClient::new()
            .with_response("gather", format!("```json\n{}\n```", gather_json()))
            .with_response(
                "copy",
                "Here is the copy: {\"headline\": \"Fill Every Table, Every Night\", \
                 \"subtitle\": \"Social media that brings diners in\", \
                 \"feature_bullets\": [\"One\", \"Two\", \"Three\", \"Four\", \"Five\"], \
                 \"call_to_action\": \"Book a call\"}",
            )
            .with_structured(
                "design",
                json!({
                    "recommended_template": "vibrant",
                    "color_palette": {
                        "primary": {"hex": "#ff5722"},
                        "secondary": {"hex": "#ffc107"},
                        "accent": {"hex": "#4caf50"}
                    }
                }),
            )
            .with_response(
                "audit",
                json!({"audit_summary": {"percentage": 88}, "final_recommendation": {"status": "APPROVE"}})
                    .to_string(),
            )
    }

    fn orchestrator(client: MockClient) -> (Arc<MockClient>, OfferOrchestrator) {
        let client = Arc::new(client);
        let orch = OfferOrchestrator::new(client.clone(), RoleSet::builtin().unwrap());
        (client, orch)
    }

    #[tokio::test]
    async fn all_stages_completing_yields_ai_generated_offer() {
        let (_, orch) = orchestrator(scripted());
        let offer = orch.create(RawInput::new().with("service_name", "SMM")).await;

        assert!(offer.ai_generated);
        assert!(!offer.fallback);
        assert_eq!(offer.title, "Fill Every Table, Every Night");
        assert_eq!(offer.price.amount, 1500.0);
        assert_eq!(offer.template, Template::Vibrant);
        assert_eq!(offer.brand_colors.primary.as_str(), "#ff5722");
        assert_eq!(offer.quality_report.unwrap().percentage, 88);

        let stages: Vec<Stage> = offer.execution_log.iter().map(|e| e.stage).collect();
        assert_eq!(stages, Stage::ALL.to_vec());
        assert!(offer
            .execution_log
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn stage_contexts_follow_data_flow() {
        let (client, orch) = orchestrator(scripted());
        orch.create(RawInput::new().with("service_name", "SMM").with("secret_note", "raw-only"))
            .await;

        let calls = client.calls();
        let roles: Vec<&str> = calls.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(roles, vec!["gather", "copy", "design", "audit"]);

        assert!(calls[0].context.contains("raw-only"));
        // copy sees gathered info, not the raw input
        assert!(calls[1].context.contains("local restaurants"));
        assert!(!calls[1].context.contains("raw-only"));
        // design sees gathered info merged with copy
        assert!(calls[2].context.contains("local restaurants"));
        assert!(calls[2].context.contains("Fill Every Table"));
        // audit sees the assembled offer
        assert!(calls[3].context.contains("complete_offer"));
        assert!(calls[3].context.contains("#ff5722"));
    }

    #[tokio::test]
    async fn unavailable_backend_falls_back_at_every_stage() {
        let (client, orch) = orchestrator(MockClient::new());
        let offer = orch.create(RawInput::new()).await;

        assert!(offer.is_well_formed());
        assert!(!offer.ai_generated);
        assert!(!offer.fallback);
        assert_eq!(offer.fallback_stages(), Stage::ALL.to_vec());
        assert_eq!(client.calls().len(), 4);
        assert_eq!(
            offer.quality_report.unwrap().recommendation,
            Recommendation::NeedsReview
        );
    }

    #[tokio::test]
    async fn unparseable_output_is_retried_within_budget() {
        let client = MockClient::new().with_response("gather", "I could not do it, sorry.");
        let (client, orch) = orchestrator(client);
        let offer = orch.create(RawInput::new().with("price", 500)).await;

        let gather_calls = client.calls().iter().filter(|c| c.role == "gather").count();
        assert_eq!(gather_calls, orch.roles().gather.max_iterations as usize);
        assert_eq!(offer.price.amount, 500.0);
        let detail = offer.execution_log[0].detail.clone().unwrap();
        assert!(detail.contains("extraction failed"));
    }

    #[tokio::test]
    async fn slow_stage_times_out_into_fallback() {
        let client = scripted().with_delay(Duration::from_millis(200));
        let (_, orch) = orchestrator(client);
        let orch = orch.with_stage_timeout(Duration::from_millis(10));

        let offer = orch.create(RawInput::new()).await;
        assert_eq!(offer.fallback_stages().len(), 4);
        assert!(offer.execution_log[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[tokio::test]
    async fn panic_inside_stage_yields_whole_pipeline_fallback() {
        let client = scripted().with_panic("copy");
        let (_, orch) = orchestrator(client);
        let offer = orch
            .create(RawInput::new().with("service_name", "Bookkeeping").with("price", 250))
            .await;

        assert!(offer.fallback);
        assert!(!offer.ai_generated);
        assert_eq!(offer.title, "Bookkeeping");
        assert_eq!(offer.price.amount, 250.0);
        assert_eq!(offer.quality_report.as_ref().unwrap().percentage, 50);
        // the gather entry recorded before the panic survives
        assert_eq!(offer.execution_log.len(), 1);
        assert_eq!(offer.execution_log[0].stage, Stage::Gather);
        assert!(offer.failure.unwrap().contains("mock panic"));
    }

    #[tokio::test]
    async fn invalid_fields_are_noted_and_defaulted() {
        let client = scripted().with_response(
            "design",
            "{\"recommended_template\": \"retro\", \"color_palette\": {\"primary\": \"red\"}}",
        );
        let (_, orch) = orchestrator(client);
        let offer = orch.create(RawInput::new()).await;

        assert_eq!(offer.template, Template::Modern);
        assert_eq!(offer.brand_colors.primary.as_str(), "#3b82f6");
        assert!(offer.validation_notes.iter().any(|n| n.stage == Stage::Design));
        // the stage still completed: its record parsed
        assert!(offer.ai_generated);
    }

    #[tokio::test]
    async fn redesign_marks_offer_and_uses_document_heuristics() {
        let (client, orch) = orchestrator(MockClient::new());
        let offer = orch
            .redesign("Premium Dog Training\nOnly $1,200 for six weeks\n- Leash skills", None)
            .await;

        assert!(offer.redesigned);
        assert_eq!(offer.title, "Premium Dog Training");
        assert_eq!(offer.price.amount, 1200.0);
        assert_eq!(offer.template, Template::Modern);
        assert!(client.calls()[0].context.contains("EXISTING offer document"));
    }

    #[tokio::test]
    async fn cached_offer_skips_generation() {
        let cache = Arc::new(OfferCache::new(10));
        let (client, orch) = orchestrator(scripted());
        let orch = orch.with_cache(cache.clone());
        let input = RawInput::new().with("service_name", "SMM").with("price", 1500);

        let first = orch.create(input.clone()).await;
        let second = orch.create(input).await;

        assert_eq!(first, second);
        assert_eq!(client.calls().len(), 4);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn degraded_offers_are_not_cached() {
        let cache = Arc::new(OfferCache::new(10));
        let (client, orch) = orchestrator(MockClient::new());
        let orch = orch.with_cache(cache.clone());

        orch.create(RawInput::new()).await;
        orch.create(RawInput::new()).await;
        assert_eq!(client.calls().len(), 8);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn monitor_records_each_run() {
        let monitor = Arc::new(PerformanceMonitor::new());
        let (_, orch) = orchestrator(scripted());
        let orch = orch.with_monitor(monitor.clone());

        orch.create(RawInput::new()).await;
        orch.redesign("Old offer", None).await;

        let stats = monitor.analytics();
        assert_eq!(stats.total_executions, 2);
        assert_eq!(monitor.records()[1].mode, Mode::Redesign);
    }

    #[tokio::test]
    async fn audit_fallback_after_clean_stages_approves() {
        let (_, orch) = orchestrator(scripted().with_failure("audit"));
        let offer = orch.create(RawInput::new().with("service_name", "SMM")).await;

        let report = offer.quality_report.as_ref().unwrap();
        assert_eq!(report.percentage, 75);
        assert_eq!(report.recommendation, Recommendation::Approve);
        assert_eq!(offer.fallback_stages(), vec![Stage::Audit]);
        assert!(!offer.ai_generated);
    }

    #[tokio::test]
    async fn hung_stage_is_bounded_by_timeout_times_attempts() {
        let (client, orch) = orchestrator(scripted().with_delay(Duration::from_secs(5)));
        let orch = orch.with_stage_timeout(Duration::from_millis(20));

        let started = Instant::now();
        let offer = orch.create(RawInput::new()).await;
        let elapsed = started.elapsed();

        // gather 3 + copy 2 + design 2 + audit 1 attempts, 20ms each
        let attempts: u32 = Stage::ALL
            .iter()
            .map(|s| orch.roles().get(*s).max_iterations)
            .sum();
        assert_eq!(client.calls().len(), attempts as usize);
        assert!(elapsed < Duration::from_secs(5));
        assert_eq!(offer.fallback_stages().len(), 4);
    }

    #[tokio::test]
    async fn try_stage_reports_raw_output_and_record() {
        let (client, orch) = orchestrator(scripted());
        let trial = orch.try_stage(Stage::Gather, "{\"service\": \"SMM\"}").await;

        assert_eq!(trial.stage, Stage::Gather);
        assert!(matches!(trial.raw, Some(GenerationOutput::Text(_))));
        assert_eq!(
            trial.record.unwrap()["target_audience"],
            Value::String("local restaurants".into())
        );
        assert!(trial.error.is_none());
        assert_eq!(client.calls().len(), 1);
        assert!(client.calls()[0].context.contains("SMM"));
    }

    #[tokio::test]
    async fn try_stage_surfaces_extraction_and_port_errors() {
        let client = MockClient::new()
            .with_response("copy", "no json here")
            .with_failure("design");
        let (client, orch) = orchestrator(client);

        let copy = orch.try_stage(Stage::Copy, "ctx").await;
        assert!(copy.raw.is_some());
        assert!(copy.record.is_none());
        assert!(copy.error.unwrap().contains("extraction failed"));

        let design = orch.try_stage(Stage::Design, "ctx").await;
        assert!(design.raw.is_none());
        assert!(design.error.unwrap().contains("mock failure"));
        // one attempt each, no retries
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn system_stats_combine_cache_and_monitor() {
        let cache = Arc::new(OfferCache::new(10));
        let monitor = Arc::new(PerformanceMonitor::new());
        let (_, orch) = orchestrator(scripted());
        let orch = orch.with_cache(cache.clone()).with_monitor(monitor);

        let input = RawInput::new().with("service_name", "SMM");
        orch.create(input.clone()).await;
        orch.create(input).await;

        let stats = orch.system_stats();
        let cache_stats = stats.cache.unwrap();
        assert_eq!(cache_stats.size, 1);
        assert_eq!(cache_stats.hits, 1);
        // the cache hit returns before the monitor records
        assert_eq!(stats.performance.unwrap().total_executions, 1);

        orch.clear_caches();
        assert!(cache.is_empty());
        assert_eq!(orch.system_stats().cache.unwrap().hits, 1);
    }

    #[test]
    fn bare_orchestrator_has_no_stats() {
        let (_, orch) = orchestrator(MockClient::new());
        let stats = orch.system_stats();
        assert!(stats.cache.is_none());
        assert!(stats.performance.is_none());
        orch.clear_caches();
    }
}
