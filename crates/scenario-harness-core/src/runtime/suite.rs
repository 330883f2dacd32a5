// crates/scenario-harness-core/src/runtime/suite.rs
// ============================================================================
// Module: Suite Runner
// Description: Concurrent scenario orchestration with isolation and cancellation.
// Purpose: Run a suite end to end: provision, drive, verify, release, compare.
// Dependencies: crate::{core, interfaces, runtime}, tokio
// ============================================================================

//! ## Overview
//! Scenarios run concurrently on a worker pool bounded by a semaphore; turns
//! inside a scenario stay sequential. Each scenario gets its own
//! environment, and the environment lease stays with the orchestrating task
//! while the run itself executes in an inner task, so release happens on
//! every exit path: success, rule failure, timeout, cancellation, or panic.
//! A suite timeout fires the shared [`CancelSignal`]; a run still going
//! after a short grace period is aborted, and its runtime subscription is
//! detached before the environment is released. Baselines are read
//! under shared access during the run and written only after every
//! scenario has settled, under exclusive access.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task;
use tokio::task::JoinSet;

use crate::core::Baseline;
use crate::core::BaselineAction;
use crate::core::BaselineMode;
use crate::core::ComparisonReport;
use crate::core::ComparisonStatus;
use crate::core::MetricPolicy;
use crate::core::RunResult;
use crate::core::Scenario;
use crate::core::ScenarioId;
use crate::core::Timestamp;
use crate::core::default_metric_policies;
use crate::interfaces::AgentRuntime;
use crate::interfaces::BaselineStore;
use crate::interfaces::ModelGrader;
use crate::interfaces::PluginFactory;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::comparator::BaselineComparator;
use crate::runtime::driver::ActorDriver;
use crate::runtime::events::HarnessEvent;
use crate::runtime::events::HarnessEventKind;
use crate::runtime::events::HarnessEventSink;
use crate::runtime::events::NoopEventSink;
use crate::runtime::provisioner::ArtifactPluginFactory;
use crate::runtime::provisioner::Provisioner;
use crate::runtime::reporter::ScenarioReport;
use crate::runtime::reporter::ScenarioStatus;
use crate::runtime::reporter::SuiteReport;
use crate::runtime::store::SharedBaselineStore;
use crate::runtime::verification::VerificationConfig;
use crate::runtime::verification::VerificationEngine;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Suite runner configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteConfig {
    /// Maximum scenarios running at once.
    pub workers: usize,
    /// Suite-level timeout.
    pub timeout: Duration,
    /// Turn timeout when a turn declares none.
    pub default_turn_timeout: Duration,
    /// Parent directory for environment working directories.
    pub workdir_root: Option<PathBuf>,
    /// Baseline handling.
    pub baseline_mode: BaselineMode,
    /// Tracked metric policies.
    pub metric_policies: Vec<MetricPolicy>,
    /// Verification engine configuration.
    pub verification: VerificationConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout: Duration::from_millis(600_000),
            default_turn_timeout: Duration::from_millis(30_000),
            workdir_root: None,
            baseline_mode: BaselineMode::Compare,
            metric_policies: default_metric_policies(),
            verification: VerificationConfig::default(),
        }
    }
}

// ============================================================================
// SECTION: Suite Runner
// ============================================================================

/// Collaborators shared by every scenario task.
struct SuiteContext {
    /// Environment provisioner.
    provisioner: Provisioner,
    /// Actor driver.
    driver: ActorDriver,
    /// Verification engine.
    verifier: VerificationEngine,
    /// Baseline comparator reading through the shared store.
    comparator: BaselineComparator,
    /// Event sink.
    events: Arc<dyn HarnessEventSink>,
    /// Baseline handling.
    baseline_mode: BaselineMode,
}

/// Runs scenario suites.
pub struct SuiteRunner {
    /// Shared scenario collaborators.
    context: Arc<SuiteContext>,
    /// Baseline store with its reader/writer gate.
    store: SharedBaselineStore,
    /// Runner configuration.
    config: SuiteConfig,
}

/// Builder for [`SuiteRunner`].
pub struct SuiteRunnerBuilder {
    /// Agent runtime collaborator.
    runtime: Arc<dyn AgentRuntime>,
    /// Model-grading collaborator.
    grader: Arc<dyn ModelGrader>,
    /// Baseline store.
    store: SharedBaselineStore,
    /// Plugin factory.
    plugins: Arc<dyn PluginFactory>,
    /// Event sink.
    events: Arc<dyn HarnessEventSink>,
    /// Runner configuration.
    config: SuiteConfig,
}

impl SuiteRunnerBuilder {
    /// Creates a builder with default configuration, plugin factory, and a
    /// no-op event sink.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        grader: Arc<dyn ModelGrader>,
        store: SharedBaselineStore,
    ) -> Self {
        Self {
            runtime,
            grader,
            store,
            plugins: Arc::new(ArtifactPluginFactory),
            events: Arc::new(NoopEventSink),
            config: SuiteConfig::default(),
        }
    }

    /// Sets the runner configuration.
    #[must_use]
    pub fn config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the plugin factory.
    #[must_use]
    pub fn plugin_factory(mut self, plugins: Arc<dyn PluginFactory>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn events(mut self, events: Arc<dyn HarnessEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Builds the runner.
    #[must_use]
    pub fn build(self) -> SuiteRunner {
        let config = self.config;
        let provisioner = Provisioner::new(
            config.workdir_root.clone(),
            self.plugins,
            Arc::clone(&self.events),
        );
        let driver = ActorDriver::new(
            self.runtime,
            Arc::clone(&self.events),
            config.default_turn_timeout,
        );
        let verifier = VerificationEngine::new(
            self.grader,
            Arc::clone(&self.events),
            config.verification.clone(),
        );
        let shared: Arc<dyn BaselineStore + Send + Sync> = Arc::new(self.store.clone());
        let comparator = BaselineComparator::new(shared, config.metric_policies.clone());
        SuiteRunner {
            context: Arc::new(SuiteContext {
                provisioner,
                driver,
                verifier,
                comparator,
                events: self.events,
                baseline_mode: config.baseline_mode,
            }),
            store: self.store,
            config,
        }
    }
}

impl SuiteRunner {
    /// Returns the runner configuration.
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Runs every scenario and aggregates the suite report.
    pub async fn run(&self, scenarios: Vec<Scenario>) -> SuiteReport {
        let cancel = CancelSignal::new();
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let metadata: Vec<ScenarioMeta> = scenarios.iter().map(ScenarioMeta::from).collect();
        let mut tasks = JoinSet::new();
        let mut task_slots: HashMap<task::Id, usize> = HashMap::new();

        for (index, scenario) in scenarios.into_iter().enumerate() {
            let context = Arc::clone(&self.context);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let handle = tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let report = match permit {
                    Some(_permit) => context.run_scenario(scenario, &cancel).await,
                    None => ScenarioMeta::from(&scenario).cancelled_report("suite cancelled"),
                };
                (index, report)
            });
            task_slots.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<ScenarioReport>> = vec![None; metadata.len()];
        let timer = tokio::time::sleep(self.config.timeout);
        tokio::pin!(timer);
        let mut timed_out = false;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, report))) => {
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(report);
                        }
                    }
                    Some(Err(err)) => {
                        let index = task_slots.get(&err.id()).copied();
                        if let Some(index) = index
                            && let Some(slot) = slots.get_mut(index)
                            && let Some(meta) = metadata.get(index)
                        {
                            let message = format!("scenario task failed: {err}");
                            *slot = Some(meta.errored_report(message));
                        }
                    }
                },
                () = &mut timer, if !timed_out => {
                    timed_out = true;
                    cancel.cancel();
                    let timeout_ms =
                        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
                    self.context.events.record(&HarnessEvent::now(
                        HarnessEventKind::SuiteCancelled {
                            timeout_ms,
                        },
                    ));
                }
            }
        }

        let mut reports: Vec<ScenarioReport> = slots
            .into_iter()
            .zip(&metadata)
            .map(|(slot, meta)| {
                slot.unwrap_or_else(|| meta.errored_report("scenario task did not report"))
            })
            .collect();
        self.write_baselines(&mut reports, &metadata);

        let report = SuiteReport::build(reports, self.config.baseline_mode, timed_out);
        self.context.events.record(&HarnessEvent::now(HarnessEventKind::SuiteFinished {
            total: report.summary.total,
            passed: report.summary.passed,
            exit_code: report.exit_code,
        }));
        report
    }

    /// Seeds or promotes baselines for passing scenarios under exclusive access.
    fn write_baselines(&self, reports: &mut [ScenarioReport], metadata: &[ScenarioMeta]) {
        let mode = self.config.baseline_mode;
        if mode == BaselineMode::Skip {
            return;
        }
        let events = &self.context.events;
        let outcome = self.store.with_exclusive(|store| {
            for (report, meta) in reports.iter_mut().zip(metadata) {
                if report.status != ScenarioStatus::Passed
                    || report.comparison.status == ComparisonStatus::Error
                {
                    continue;
                }
                let Some(result) = &report.result else {
                    continue;
                };
                let existing = match store.load(&report.scenario_id) {
                    Ok(existing) => existing,
                    Err(err) => {
                        report.comparison = ComparisonReport::failed(
                            report.scenario_id.clone(),
                            format!("baseline lookup failed: {err}"),
                        );
                        continue;
                    }
                };
                let action = match (mode, existing) {
                    (BaselineMode::Compare | BaselineMode::Promote, None) => BaselineAction::Seeded,
                    (BaselineMode::Promote, Some(_)) => BaselineAction::Promoted,
                    _ => continue,
                };
                let baseline = baseline_from_result(result, meta);
                if let Err(err) = store.save(&baseline) {
                    report.comparison = ComparisonReport::failed(
                        report.scenario_id.clone(),
                        format!("baseline write failed: {err}"),
                    );
                    continue;
                }
                report.baseline_action = Some(action);
                let scenario_id = report.scenario_id.to_string();
                events.record(&HarnessEvent::now(match action {
                    BaselineAction::Seeded => HarnessEventKind::BaselineSeeded {
                        scenario_id,
                    },
                    BaselineAction::Promoted => HarnessEventKind::BaselinePromoted {
                        scenario_id,
                    },
                }));
            }
            Ok(())
        });
        if let Err(err) = outcome {
            for report in reports.iter_mut() {
                if report.status == ScenarioStatus::Passed && report.baseline_action.is_none() {
                    report.comparison = ComparisonReport::failed(
                        report.scenario_id.clone(),
                        format!("baseline store unavailable: {err}"),
                    );
                }
            }
        }
    }
}

impl SuiteContext {
    /// Runs one scenario end to end; never panics and always releases.
    async fn run_scenario(
        self: Arc<Self>,
        scenario: Scenario,
        cancel: &CancelSignal,
    ) -> ScenarioReport {
        let meta = ScenarioMeta::from(&scenario);
        if cancel.is_cancelled() {
            return meta.cancelled_report("suite cancelled before start");
        }
        let lease = match self.provisioner.acquire(&scenario) {
            Ok(lease) => lease,
            Err(err) => return meta.errored_report(err.to_string()),
        };
        self.events.record(&HarnessEvent::now(HarnessEventKind::ScenarioStarted {
            scenario_id: meta.id.to_string(),
            run_id: lease.run_id().to_string(),
        }));

        let environment = lease.environment().clone();
        let run_id = lease.run_id().clone();
        let inner_context = Arc::clone(&self);
        let inner_cancel = cancel.clone();
        let mut inner = tokio::spawn(async move {
            let record = inner_context
                .driver
                .run(&scenario, &environment, run_id, &inner_cancel)
                .await
                .map_err(|err| err.to_string())?;
            let record = Arc::new(record);
            let verdict = inner_context
                .verifier
                .verify(&scenario, Arc::clone(&record), &inner_cancel)
                .await
                .map_err(|err| err.to_string())?;
            let record = Arc::try_unwrap(record).unwrap_or_else(|shared| (*shared).clone());
            Ok::<RunResult, String>(RunResult::from_parts(record, verdict))
        });
        let joined = tokio::select! {
            joined = &mut inner => Some(joined),
            () = cancelled_with_grace(cancel) => None,
        };
        let outcome = match joined {
            Some(Ok(outcome)) => RunOutcome::Finished(outcome),
            Some(Err(err)) => RunOutcome::Finished(Err(format!("scenario run crashed: {err}"))),
            None => {
                inner.abort();
                let _ = inner.await;
                RunOutcome::Aborted
            }
        };
        self.driver.detach(lease.environment()).await;
        let release_error = self.provisioner.release(lease).err().map(|err| err.to_string());

        let mut report = match outcome {
            RunOutcome::Aborted => {
                meta.cancelled_report("scenario run aborted after suite cancellation")
            }
            RunOutcome::Finished(Ok(result)) => {
                let status = if result.cancelled {
                    ScenarioStatus::Cancelled
                } else if result.passed {
                    ScenarioStatus::Passed
                } else {
                    ScenarioStatus::Failed
                };
                let comparison = if status == ScenarioStatus::Cancelled
                    || self.baseline_mode == BaselineMode::Skip
                {
                    ComparisonReport::empty(meta.id.clone(), ComparisonStatus::Skipped)
                } else {
                    self.comparator.compare(&meta.id, &result.metrics)
                };
                ScenarioReport {
                    status,
                    result: Some(result),
                    comparison,
                    ..meta.base_report()
                }
            }
            RunOutcome::Finished(Err(error)) => meta.errored_report(error),
        };
        report.release_error = release_error;
        self.events.record(&HarnessEvent::now(HarnessEventKind::ScenarioFinished {
            scenario_id: meta.id.to_string(),
            outcome: report.status.label().to_string(),
            aggregate_score: report.result.as_ref().map(|result| result.aggregate_score),
        }));
        report
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Time a cancelled run gets to wind down before its task is aborted.
const CANCEL_GRACE: Duration = Duration::from_millis(100);

/// How the inner run task ended.
enum RunOutcome {
    /// The task returned or panicked.
    Finished(Result<RunResult, String>),
    /// The task outlived the cancellation grace period and was aborted.
    Aborted,
}

/// Resolves once cancellation fired and the grace period elapsed.
async fn cancelled_with_grace(cancel: &CancelSignal) {
    cancel.cancelled().await;
    tokio::time::sleep(CANCEL_GRACE).await;
}

/// Scenario identity retained for reporting after the scenario moves into a task.
#[derive(Debug, Clone)]
struct ScenarioMeta {
    /// Scenario identifier.
    id: ScenarioId,
    /// Scenario name.
    name: String,
    /// Scenario category.
    category: String,
    /// Canonical scenario hash.
    hash: Option<String>,
}

impl From<&Scenario> for ScenarioMeta {
    fn from(scenario: &Scenario) -> Self {
        Self {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            category: scenario.category.clone(),
            hash: scenario.digest.as_ref().map(|digest| digest.value.clone()),
        }
    }
}

impl ScenarioMeta {
    /// Builds a report skeleton with comparison skipped.
    fn base_report(&self) -> ScenarioReport {
        ScenarioReport {
            scenario_id: self.id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            status: ScenarioStatus::Errored,
            result: None,
            error: None,
            release_error: None,
            comparison: ComparisonReport::empty(self.id.clone(), ComparisonStatus::Skipped),
            baseline_action: None,
        }
    }

    /// Builds an errored report.
    fn errored_report(&self, error: impl Into<String>) -> ScenarioReport {
        ScenarioReport {
            error: Some(error.into()),
            ..self.base_report()
        }
    }

    /// Builds a cancelled report.
    fn cancelled_report(&self, reason: &str) -> ScenarioReport {
        ScenarioReport {
            status: ScenarioStatus::Cancelled,
            error: Some(reason.to_string()),
            ..self.base_report()
        }
    }
}

/// Builds a baseline record from a passing run.
fn baseline_from_result(result: &RunResult, meta: &ScenarioMeta) -> Baseline {
    Baseline {
        scenario_id: result.scenario_id.clone(),
        stored_metrics: result.metrics.clone(),
        stored_at: Timestamp::now(),
        run_id: Some(result.run_id.clone()),
        scenario_hash: meta.hash.clone(),
    }
}
