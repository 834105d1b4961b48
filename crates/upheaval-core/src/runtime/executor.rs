// crates/upheaval-core/src/runtime/executor.rs
// ============================================================================
// Module: Upheaval Executor
// Description: Barrier-synchronized run engine interleaving checks and
//              disruptions.
// Purpose: Drive a scenario plan against selected checks and produce a run
//          report.
// Dependencies: crate::{core, interfaces, runtime}, tokio
// ============================================================================

//! ## Overview
//! The executor is the single canonical execution path for a harness run. Its
//! control loop is single-threaded and moves through
//! `CollectingChecks → Initializing → Running(slot) → Validating →
//! Aggregating`; concurrency exists only at the barriers, where every live
//! check's phase call for the current slot fans out as a task and the loop
//! joins all of them before proceeding. Disruptions are strictly serialized:
//! no phase call is in flight while a disruption executes, and dropping the
//! task set cancels any residue when a run-fatal abort cuts the plan short.
//!
//! Check-local failures (including phase timeouts) isolate the failing check
//! and never affect siblings. Disruption failures abort the whole run: every
//! still-live check is reported indeterminate because its validate phase
//! never ran.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::core::AbortCause;
use crate::core::CheckOutcome;
use crate::core::CheckReport;
use crate::core::DisruptionAction;
use crate::core::DisruptionSpec;
use crate::core::FailureCause;
use crate::core::HashAlgorithm;
use crate::core::Phase;
use crate::core::PhaseFailure;
use crate::core::PlanError;
use crate::core::RunId;
use crate::core::RunReport;
use crate::core::ScenarioSpec;
use crate::core::ScenarioSpecError;
use crate::core::Script;
use crate::core::Selection;
use crate::core::Slot;
use crate::core::Timestamp;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::now_unix_millis;
use crate::interfaces::Orchestrator;
use crate::interfaces::ScriptExecutor;
use crate::interfaces::ScriptOutcome;
use crate::interfaces::SystemProbe;
use crate::runtime::events::EventSink;
use crate::runtime::events::NullEventSink;
use crate::runtime::events::RunEvent;
use crate::runtime::events::RunEventRecord;
use crate::runtime::state::ExecutionState;

// ============================================================================
// SECTION: Executor Configuration
// ============================================================================

/// Configuration for the run executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Deadline for a single phase call, in milliseconds.
    pub phase_timeout_ms: u64,
    /// Interval between health probes while awaiting recovery, in
    /// milliseconds.
    pub health_poll_interval_ms: u64,
    /// Budget for confirming health before the validate barrier, in
    /// milliseconds.
    pub settle_timeout_ms: u64,
    /// Additional manipulate rounds beyond the longest check.
    pub extra_rounds: usize,
    /// Hash algorithm for the plan digest.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            phase_timeout_ms: 60_000,
            health_poll_interval_ms: 1_000,
            settle_timeout_ms: 60_000,
            extra_rounds: 0,
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
        }
    }
}

// ============================================================================
// SECTION: Phase Call Results
// ============================================================================

/// Result of one phase call after deadline enforcement.
enum PhaseCall {
    /// The executor ran the script to completion.
    Completed(ScriptOutcome),
    /// The executor could not run the script.
    Transport(String),
    /// The call exceeded its deadline.
    TimedOut,
}

// ============================================================================
// SECTION: Check Plans
// ============================================================================

/// Prefetched scripts for one admitted check.
///
/// Phase constructors run exactly once, at collection time; the executor owns
/// every script for the rest of the run.
struct CheckPlan {
    /// Initialize script.
    init: Script,
    /// Manipulate steps in declaration order.
    steps: Vec<Script>,
    /// Validate script.
    validate: Script,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Barrier-synchronized run engine.
pub struct Executor<E, P, O> {
    /// Scenario being executed.
    scenario: ScenarioSpec,
    /// Opaque script executor collaborator.
    script_executor: Arc<E>,
    /// Health probe collaborator.
    probe: P,
    /// Orchestration collaborator.
    orchestrator: O,
    /// Event sink for the structured run log.
    sink: Arc<dyn EventSink>,
    /// Executor configuration.
    config: ExecutorConfig,
}

impl<E, P, O> Executor<E, P, O>
where
    E: ScriptExecutor + 'static,
    P: SystemProbe,
    O: Orchestrator,
{
    /// Creates a new executor for the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidScenario`] when the scenario fails
    /// validation.
    pub fn new(
        scenario: ScenarioSpec,
        script_executor: E,
        probe: P,
        orchestrator: O,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutorError> {
        scenario.validate().map_err(ExecutorError::InvalidScenario)?;
        Ok(Self {
            scenario,
            script_executor: Arc::new(script_executor),
            probe,
            orchestrator,
            sink: Arc::new(NullEventSink),
            config,
        })
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Executes the scenario against the selected checks.
    ///
    /// A run-fatal abort is not an error: the returned report carries the
    /// abort cause and marks still-live checks indeterminate. Errors are
    /// reserved for harness-level failures (invalid plans, hashing, task
    /// join failures).
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the plan violates its invariants or a
    /// spawned phase task cannot be joined.
    pub async fn run(
        &self,
        run_id: RunId,
        selection: Selection,
    ) -> Result<RunReport, ExecutorError> {
        let started_at = now_unix_millis();

        // CollectingChecks: prefetch every phase script and seed the
        // per-check records. Phase constructors run exactly once.
        let mut states = Vec::with_capacity(selection.admitted.len());
        let mut plans = Vec::with_capacity(selection.admitted.len());
        for check in &selection.admitted {
            let metadata = check.metadata();
            let plan = CheckPlan {
                init: check.initialize(),
                steps: check.manipulate(),
                validate: check.validate(),
            };
            states.push(ExecutionState::pending(metadata.name, plan.steps.len()));
            plans.push(plan);
        }

        let rounds = plans.iter().map(|plan| plan.steps.len()).max().unwrap_or(0)
            + self.config.extra_rounds;
        let plan = self.scenario.plan(rounds);
        plan.verify(&self.scenario)?;
        let plan_hash = hash_canonical_json(self.config.hash_algorithm, &plan)?;

        self.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            scenario_id: self.scenario.scenario_id.clone(),
            plan_hash: plan_hash.clone(),
            rounds,
            admitted: selection.admitted.len(),
            skipped: selection.skipped.len(),
        });
        for check_id in &selection.skipped {
            self.emit(RunEvent::CheckSkipped {
                check_id: check_id.clone(),
            });
        }

        // Initializing: every pending check's initialize phase, one barrier.
        self.run_phase_barrier(&mut states, &plans, Phase::Initialize).await?;

        // Running(slot): manipulate rounds fan out, disruptions serialize.
        let mut abort = None;
        let mut round_index = 0;
        for slot in &plan.slots {
            match slot {
                Slot::ManipulateRound => {
                    let dispatching = states
                        .iter()
                        .filter(|state| state.is_live() && state.has_pending_steps())
                        .count();
                    self.emit(RunEvent::RoundStarted {
                        round: round_index,
                        dispatching,
                    });
                    round_index += 1;
                    self.run_phase_barrier(&mut states, &plans, Phase::Manipulate).await?;
                }
                Slot::Disruption(index) => {
                    let disruption = &self.scenario.disruptions[*index];
                    if let Some(cause) = self.run_disruption(disruption).await {
                        abort = Some(cause);
                        break;
                    }
                }
            }
        }

        // Validating: confirm health, then every live check's validate phase.
        if abort.is_none() {
            if self.await_healthy(self.config.settle_timeout_ms).await {
                self.emit(RunEvent::HealthConfirmed {
                    disruption_id: None,
                });
                self.run_phase_barrier(&mut states, &plans, Phase::Validate).await?;
            } else {
                abort = Some(AbortCause::UnhealthyBeforeValidate {
                    timeout_ms: self.config.settle_timeout_ms,
                });
            }
        }

        // Aggregating: fold states and skips into the final report.
        let aborted = abort.is_some();
        let mut checks: Vec<CheckReport> =
            states.into_iter().map(|state| state.into_report(aborted)).collect();
        for check_id in selection.skipped {
            checks.push(CheckReport {
                check_id,
                outcome: CheckOutcome::Skipped,
                failure: None,
                completions: Vec::new(),
            });
        }
        let outcome = RunReport::outcome_of(&checks, abort.as_ref());
        self.emit(RunEvent::RunFinished {
            run_id: run_id.clone(),
            outcome,
            abort: abort.clone(),
        });

        Ok(RunReport {
            run_id,
            scenario_id: self.scenario.scenario_id.clone(),
            plan_hash,
            started_at,
            finished_at: now_unix_millis(),
            checks,
            abort,
            outcome,
        })
    }

    /// Fans out one phase call per eligible live check and joins all of them.
    ///
    /// For the manipulate phase each check dispatches its next unconsumed
    /// step; checks whose steps are exhausted sit the round out. Failures are
    /// recorded per check and never stop the barrier.
    async fn run_phase_barrier(
        &self,
        states: &mut [ExecutionState],
        plans: &[CheckPlan],
        phase: Phase,
    ) -> Result<(), ExecutorError> {
        let budget = Duration::from_millis(self.config.phase_timeout_ms);
        let mut join: JoinSet<(usize, PhaseCall)> = JoinSet::new();

        for (index, state) in states.iter().enumerate() {
            if !state.is_live() {
                continue;
            }
            let script = match phase {
                Phase::Initialize => plans[index].init.clone(),
                Phase::Manipulate => {
                    if !state.has_pending_steps() {
                        continue;
                    }
                    plans[index].steps[state.next_step].clone()
                }
                Phase::Validate => plans[index].validate.clone(),
            };
            let executor = Arc::clone(&self.script_executor);
            join.spawn(async move {
                let call = match timeout(budget, executor.execute(&script)).await {
                    Ok(Ok(outcome)) => PhaseCall::Completed(outcome),
                    Ok(Err(err)) => PhaseCall::Transport(err.to_string()),
                    Err(_) => PhaseCall::TimedOut,
                };
                (index, call)
            });
        }

        while let Some(joined) = join.join_next().await {
            let (index, call) = joined.map_err(|err| ExecutorError::TaskJoin(err.to_string()))?;
            let state = &mut states[index];
            let step = (phase == Phase::Manipulate).then_some(state.next_step);
            let at = now_unix_millis();
            match call {
                PhaseCall::Completed(outcome) if outcome.success => {
                    state.record_completion(phase, step, at);
                    self.emit(RunEvent::PhaseCompleted {
                        check_id: state.check_id.clone(),
                        phase,
                        step,
                    });
                }
                PhaseCall::Completed(outcome) => {
                    self.record_phase_failure(
                        state,
                        phase,
                        step,
                        FailureCause::Script {
                            captured: outcome.captured,
                        },
                        at,
                    );
                }
                PhaseCall::Transport(message) => {
                    self.record_phase_failure(
                        state,
                        phase,
                        step,
                        FailureCause::Transport { message },
                        at,
                    );
                }
                PhaseCall::TimedOut => {
                    self.record_phase_failure(
                        state,
                        phase,
                        step,
                        FailureCause::Timeout {
                            budget_ms: self.config.phase_timeout_ms,
                        },
                        at,
                    );
                }
            }
        }
        Ok(())
    }

    /// Records a check-local phase failure and emits its event.
    fn record_phase_failure(
        &self,
        state: &mut ExecutionState,
        phase: Phase,
        step: Option<usize>,
        cause: FailureCause,
        at: Timestamp,
    ) {
        self.emit(RunEvent::PhaseFailed {
            check_id: state.check_id.clone(),
            phase,
            step,
        });
        state.record_failure(PhaseFailure {
            phase,
            step,
            cause,
            at,
        });
    }

    /// Executes one disruption slot: precondition, apply, await healthy.
    ///
    /// Returns the abort cause when the disruption fails fatally, or `None`
    /// when the run may continue.
    async fn run_disruption(&self, disruption: &DisruptionSpec) -> Option<AbortCause> {
        self.emit(RunEvent::DisruptionStarted {
            disruption_id: disruption.disruption_id.clone(),
            action: disruption.action.as_str().to_string(),
        });

        if let Some(reason) = self.precondition_violation(&disruption.action).await {
            if disruption.mandatory {
                return Some(AbortCause::DisruptionPrecondition {
                    disruption_id: disruption.disruption_id.clone(),
                    reason,
                });
            }
            self.emit(RunEvent::DisruptionSkipped {
                disruption_id: disruption.disruption_id.clone(),
                reason,
            });
            return None;
        }

        let mut result = self.orchestrator.apply(&disruption.action).await;
        if result.is_err() && disruption.retryable() {
            // One transparent retry for idempotent actions only.
            result = self.orchestrator.apply(&disruption.action).await;
        }
        if let Err(err) = result {
            return Some(AbortCause::Orchestration {
                disruption_id: disruption.disruption_id.clone(),
                message: err.to_string(),
            });
        }

        if self.await_healthy(disruption.recovery_timeout_ms).await {
            self.emit(RunEvent::HealthConfirmed {
                disruption_id: Some(disruption.disruption_id.clone()),
            });
            None
        } else {
            Some(AbortCause::DisruptionRecoveryTimeout {
                disruption_id: disruption.disruption_id.clone(),
                timeout_ms: disruption.recovery_timeout_ms,
            })
        }
    }

    /// Evaluates a disruption's precondition, returning a violation reason.
    ///
    /// Every action requires a healthy system; a rolling upgrade additionally
    /// requires that the system is not already running the target version
    /// (when the deployment exposes one).
    async fn precondition_violation(&self, action: &DisruptionAction) -> Option<String> {
        if !self.probe.is_healthy().await {
            return Some("system is not healthy before disruption".to_string());
        }
        if let DisruptionAction::RollingUpgrade { target_version } = action {
            if self.probe.running_version().await.as_deref() == Some(target_version.as_str()) {
                return Some(format!("system already runs target version {target_version}"));
            }
        }
        None
    }

    /// Polls the health probe until it reports healthy or the budget elapses.
    async fn await_healthy(&self, budget_ms: u64) -> bool {
        let deadline = Duration::from_millis(budget_ms);
        let interval = Duration::from_millis(self.config.health_poll_interval_ms.max(1));
        let poll = async {
            loop {
                if self.probe.is_healthy().await {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        };
        timeout(deadline, poll).await.is_ok()
    }

    /// Emits an event record stamped with the current wall-clock time.
    fn emit(&self, event: RunEvent) {
        self.sink.emit(&RunEventRecord::new(now_unix_millis(), event));
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Harness-level executor errors.
///
/// # Invariants
/// - Run-fatal aborts are not errors; they are reported in the run report.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Scenario declaration failed validation.
    #[error("invalid scenario: {0}")]
    InvalidScenario(#[from] ScenarioSpecError),
    /// Expanded plan violated its invariants.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// Plan hashing failed.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// A spawned phase task could not be joined.
    #[error("phase task join failure: {0}")]
    TaskJoin(String),
}
