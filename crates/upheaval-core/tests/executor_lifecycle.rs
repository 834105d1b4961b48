// crates/upheaval-core/tests/executor_lifecycle.rs
// ============================================================================
// Module: Executor Lifecycle Tests
// Description: Tests for barriers, failure isolation, and abort semantics.
// ============================================================================
//! ## Overview
//! Validates the executor state machine end to end against sandbox
//! collaborators: phase ordering across barriers, per-check failure
//! isolation, disruption retry rules, and run-fatal abort reporting.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use upheaval_core::AbortCause;
use upheaval_core::Check;
use upheaval_core::CheckMetadata;
use upheaval_core::CheckOutcome;
use upheaval_core::DisruptionAction;
use upheaval_core::DisruptionSpec;
use upheaval_core::Executor;
use upheaval_core::ExecutorConfig;
use upheaval_core::FailureCause;
use upheaval_core::Phase;
use upheaval_core::PlacementPolicy;
use upheaval_core::RecordingOrchestrator;
use upheaval_core::RunId;
use upheaval_core::RunOutcome;
use upheaval_core::SandboxExecutor;
use upheaval_core::SandboxProbe;
use upheaval_core::SandboxResponse;
use upheaval_core::ScenarioId;
use upheaval_core::ScenarioParams;
use upheaval_core::ScenarioSpec;
use upheaval_core::ScriptOutcome;
use upheaval_core::Script;
use upheaval_core::Selection;
use upheaval_core::builtin_scenario;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Data-only check with predictable script texts.
struct StaticCheck {
    name: &'static str,
    steps: usize,
}

impl StaticCheck {
    fn new(name: &'static str, steps: usize) -> Arc<dyn Check> {
        Arc::new(Self { name, steps })
    }
}

impl Check for StaticCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::named(self.name)
    }

    fn initialize(&self) -> Script {
        Script::initialize(format!("init {}", self.name))
    }

    fn manipulate(&self) -> Vec<Script> {
        (0 .. self.steps).map(|step| Script::manipulate(format!("step {step} {}", self.name))).collect()
    }

    fn validate(&self) -> Script {
        Script::validate(format!("validate {}", self.name))
    }
}

/// Selection admitting the given checks with nothing skipped.
fn admit(checks: Vec<Arc<dyn Check>>) -> Selection {
    Selection {
        admitted: checks,
        skipped: Vec::new(),
    }
}

/// Executor configuration with short deadlines for tests.
fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        phase_timeout_ms: 200,
        health_poll_interval_ms: 10,
        settle_timeout_ms: 500,
        ..ExecutorConfig::default()
    }
}

/// Builtin scenario lookup with default parameters.
fn scenario(name: &str) -> ScenarioSpec {
    builtin_scenario(name, &ScenarioParams::default()).unwrap()
}

// ============================================================================
// SECTION: Happy Path
// ============================================================================

/// Tests a zero-disruption run where every check passes.
#[tokio::test]
async fn zero_disruption_run_passes() {
    let sandbox = SandboxExecutor::passing();
    let executor = Executor::new(
        scenario("no-disruption"),
        sandbox.clone(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = admit(vec![StaticCheck::new("alpha", 2), StaticCheck::new("beta", 2)]);
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
    assert!(report.abort.is_none());
    assert_eq!(report.checks.len(), 2);
    for check in &report.checks {
        assert_eq!(check.outcome, CheckOutcome::Passed);
        assert!(check.failure.is_none());
        // initialize + two steps + validate
        assert_eq!(check.completions.len(), 4);
    }

    // 2 inits + 4 steps + 2 validates.
    assert_eq!(sandbox.executed_count(), 8);
}

/// Tests phase ordering: no check enters a phase before every live check
/// finished the previous barrier, and a check's own steps never reorder.
#[tokio::test]
async fn barriers_order_phases() {
    let sandbox = SandboxExecutor::passing();
    let executor = Executor::new(
        scenario("no-disruption"),
        sandbox.clone(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = admit(vec![StaticCheck::new("alpha", 2), StaticCheck::new("beta", 2)]);
    executor.run(RunId::new("run-1"), selection).await.unwrap();

    let journal = sandbox.executed();
    let phases: Vec<Phase> = journal.iter().map(Script::phase).collect();
    assert_eq!(
        phases,
        vec![
            Phase::Initialize,
            Phase::Initialize,
            Phase::Manipulate,
            Phase::Manipulate,
            Phase::Manipulate,
            Phase::Manipulate,
            Phase::Validate,
            Phase::Validate,
        ],
    );

    let alpha_steps: Vec<&str> =
        journal.iter().map(Script::text).filter(|text| text.ends_with("alpha") && text.starts_with("step")).collect();
    assert_eq!(alpha_steps, vec!["step 0 alpha", "step 1 alpha"]);
}

/// Tests that repeated runs of the same scenario yield identical verdicts.
#[tokio::test]
async fn repeated_runs_are_deterministic() {
    let executor = Executor::new(
        scenario("no-disruption"),
        SandboxExecutor::passing(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let first = executor
        .run(RunId::new("run-1"), admit(vec![StaticCheck::new("alpha", 2)]))
        .await
        .unwrap();
    let second = executor
        .run(RunId::new("run-2"), admit(vec![StaticCheck::new("alpha", 2)]))
        .await
        .unwrap();

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.plan_hash, second.plan_hash);
    assert_eq!(first.checks[0].outcome, second.checks[0].outcome);
}

// ============================================================================
// SECTION: Failure Isolation
// ============================================================================

/// Tests that an initialize failure drops the check from every later phase
/// and terminates it as failed, never skipped.
#[tokio::test]
async fn initialize_failure_isolates_check() {
    let sandbox = SandboxExecutor::passing().with_response(
        "init bad",
        SandboxResponse::Outcome(ScriptOutcome::failure("boom")),
    );
    let executor = Executor::new(
        scenario("no-disruption"),
        sandbox.clone(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = admit(vec![StaticCheck::new("bad", 2), StaticCheck::new("good", 2)]);
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    let bad = report.checks.iter().find(|check| check.check_id.as_str() == "bad").unwrap();
    assert_eq!(bad.outcome, CheckOutcome::Failed);
    let failure = bad.failure.as_ref().unwrap();
    assert_eq!(failure.phase, Phase::Initialize);
    assert!(matches!(&failure.cause, FailureCause::Script { captured } if captured == "boom"));

    let good = report.checks.iter().find(|check| check.check_id.as_str() == "good").unwrap();
    assert_eq!(good.outcome, CheckOutcome::Passed);

    // The failed check never reached manipulate or validate.
    let bad_later = sandbox
        .executed()
        .iter()
        .filter(|script| script.text().ends_with("bad") && script.phase() != Phase::Initialize)
        .count();
    assert_eq!(bad_later, 0);
}

/// Tests that a manipulate failure is recorded with its step index and does
/// not affect siblings.
#[tokio::test]
async fn manipulate_failure_is_check_local() {
    let sandbox = SandboxExecutor::passing().with_response(
        "step 1 flaky",
        SandboxResponse::Outcome(ScriptOutcome::failure("unexpected row count")),
    );
    let executor = Executor::new(
        scenario("no-disruption"),
        sandbox.clone(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = admit(vec![StaticCheck::new("flaky", 2), StaticCheck::new("steady", 2)]);
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    let flaky = report.checks.iter().find(|check| check.check_id.as_str() == "flaky").unwrap();
    assert_eq!(flaky.outcome, CheckOutcome::Failed);
    let failure = flaky.failure.as_ref().unwrap();
    assert_eq!(failure.phase, Phase::Manipulate);
    assert_eq!(failure.step, Some(1));

    let steady = report.checks.iter().find(|check| check.check_id.as_str() == "steady").unwrap();
    assert_eq!(steady.outcome, CheckOutcome::Passed);
}

/// Tests that a validate failure carries the captured output.
#[tokio::test]
async fn validate_failure_carries_captured_output() {
    let sandbox = SandboxExecutor::passing().with_response(
        "validate drift",
        SandboxResponse::Outcome(ScriptOutcome::failure("9999 10000 19999")),
    );
    let executor = Executor::new(
        scenario("no-disruption"),
        sandbox,
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let report = executor
        .run(RunId::new("run-1"), admit(vec![StaticCheck::new("drift", 1)]))
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    let failure = report.checks[0].failure.as_ref().unwrap();
    assert_eq!(failure.phase, Phase::Validate);
    assert!(
        matches!(&failure.cause, FailureCause::Script { captured } if captured == "9999 10000 19999")
    );
}

/// Tests that a transport error fails the check without stopping the run.
#[tokio::test]
async fn transport_error_is_check_local() {
    let sandbox = SandboxExecutor::passing()
        .with_response("step 0 lost", SandboxResponse::Error("connection reset".to_string()));
    let executor = Executor::new(
        scenario("no-disruption"),
        sandbox,
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = admit(vec![StaticCheck::new("lost", 1), StaticCheck::new("fine", 1)]);
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    let lost = report.checks.iter().find(|check| check.check_id.as_str() == "lost").unwrap();
    assert!(matches!(
        &lost.failure.as_ref().unwrap().cause,
        FailureCause::Transport { message } if message.contains("connection reset")
    ));
    let fine = report.checks.iter().find(|check| check.check_id.as_str() == "fine").unwrap();
    assert_eq!(fine.outcome, CheckOutcome::Passed);
}

/// Tests that a hanging phase call is cut off at the deadline and recorded
/// as a timeout, isolated to the slow check.
#[tokio::test]
async fn phase_timeout_is_check_local() {
    let sandbox = SandboxExecutor::passing().with_response("step 0 slow", SandboxResponse::Hang);
    let executor = Executor::new(
        scenario("no-disruption"),
        sandbox,
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = admit(vec![StaticCheck::new("slow", 1), StaticCheck::new("quick", 1)]);
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    let slow = report.checks.iter().find(|check| check.check_id.as_str() == "slow").unwrap();
    assert_eq!(slow.outcome, CheckOutcome::Failed);
    assert!(matches!(
        slow.failure.as_ref().unwrap().cause,
        FailureCause::Timeout { budget_ms: 200 }
    ));
    let quick = report.checks.iter().find(|check| check.check_id.as_str() == "quick").unwrap();
    assert_eq!(quick.outcome, CheckOutcome::Passed);
}

// ============================================================================
// SECTION: Disruptions
// ============================================================================

/// Tests a restart scenario where the system recovers and all checks pass.
#[tokio::test]
async fn restart_scenario_recovers_and_passes() {
    let orchestrator = RecordingOrchestrator::new();
    let executor = Executor::new(
        scenario("restart"),
        SandboxExecutor::passing(),
        SandboxProbe::healthy(),
        orchestrator.clone(),
        fast_config(),
    )
    .unwrap();

    let report = executor
        .run(RunId::new("run-1"), admit(vec![StaticCheck::new("alpha", 2)]))
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
    assert_eq!(orchestrator.applied(), vec![DisruptionAction::Restart]);
}

/// Tests that recovery timeout aborts the run and every live check is
/// reported indeterminate, never failed or passed.
#[tokio::test]
async fn recovery_timeout_aborts_with_indeterminate_checks() {
    let mut restart = scenario("restart");
    restart.disruptions[0].recovery_timeout_ms = 100;
    // Healthy for the precondition probe only; never recovers afterwards.
    let probe = SandboxProbe::healthy_for(1);

    let sandbox = SandboxExecutor::passing();
    let executor = Executor::new(
        restart,
        sandbox.clone(),
        probe,
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = admit(vec![StaticCheck::new("alpha", 2), StaticCheck::new("beta", 2)]);
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert!(matches!(
        report.abort,
        Some(AbortCause::DisruptionRecoveryTimeout { timeout_ms: 100, .. })
    ));
    for check in &report.checks {
        assert_eq!(check.outcome, CheckOutcome::Indeterminate);
    }

    // Validate never ran for anyone.
    let validates =
        sandbox.executed().iter().filter(|script| script.phase() == Phase::Validate).count();
    assert_eq!(validates, 0);
}

/// Tests that an idempotent disruption is retried once transparently.
#[tokio::test]
async fn idempotent_disruption_is_retried() {
    let orchestrator = RecordingOrchestrator::failing_first(1);
    let executor = Executor::new(
        scenario("restart"),
        SandboxExecutor::passing(),
        SandboxProbe::healthy(),
        orchestrator.clone(),
        fast_config(),
    )
    .unwrap();

    let report = executor
        .run(RunId::new("run-1"), admit(vec![StaticCheck::new("alpha", 1)]))
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
    assert_eq!(orchestrator.applied().len(), 2);
}

/// Tests that a non-idempotent disruption is never retried and its failure
/// aborts the run.
#[tokio::test]
async fn non_idempotent_disruption_is_not_retried() {
    let orchestrator = RecordingOrchestrator::failing_first(1);
    let executor = Executor::new(
        scenario("rolling-upgrade"),
        SandboxExecutor::passing(),
        SandboxProbe::healthy(),
        orchestrator.clone(),
        fast_config(),
    )
    .unwrap();

    let report = executor
        .run(RunId::new("run-1"), admit(vec![StaticCheck::new("alpha", 1)]))
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert!(matches!(report.abort, Some(AbortCause::Orchestration { .. })));
    assert_eq!(orchestrator.applied().len(), 1);
    assert_eq!(report.checks[0].outcome, CheckOutcome::Indeterminate);
}

/// Tests that a mandatory precondition failure aborts the run.
#[tokio::test]
async fn mandatory_precondition_failure_aborts() {
    // The system already runs the upgrade target, so the precondition fails.
    let probe = SandboxProbe::healthy().with_version("next");
    let executor = Executor::new(
        scenario("rolling-upgrade"),
        SandboxExecutor::passing(),
        probe,
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let report = executor
        .run(RunId::new("run-1"), admit(vec![StaticCheck::new("alpha", 1)]))
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert!(matches!(report.abort, Some(AbortCause::DisruptionPrecondition { .. })));
}

/// Tests that an optional disruption with a failed precondition is skipped
/// and the run continues to a verdict.
#[tokio::test]
async fn optional_precondition_failure_skips_disruption() {
    let optional_upgrade = ScenarioSpec {
        scenario_id: ScenarioId::new("optional-upgrade"),
        tags: Vec::new(),
        disruptions: vec![
            DisruptionSpec::new(
                "upgrade-1",
                DisruptionAction::RollingUpgrade {
                    target_version: "next".to_string(),
                },
            )
            .optional(),
        ],
        placement: PlacementPolicy::Spread,
    };
    let probe = SandboxProbe::healthy().with_version("next");
    let orchestrator = RecordingOrchestrator::new();
    let executor = Executor::new(
        optional_upgrade,
        SandboxExecutor::passing(),
        probe,
        orchestrator.clone(),
        fast_config(),
    )
    .unwrap();

    let report = executor
        .run(RunId::new("run-1"), admit(vec![StaticCheck::new("alpha", 1)]))
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
    assert!(orchestrator.applied().is_empty());
}

// ============================================================================
// SECTION: Skipped Checks
// ============================================================================

/// Tests that skipped checks appear in the report without any invocation.
#[tokio::test]
async fn skipped_checks_are_reported_but_never_invoked() {
    let sandbox = SandboxExecutor::passing();
    let executor = Executor::new(
        scenario("restart"),
        sandbox.clone(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();

    let selection = Selection {
        admitted: vec![StaticCheck::new("alpha", 1)],
        skipped: vec!["legacy".into()],
    };
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
    let legacy = report.checks.iter().find(|check| check.check_id.as_str() == "legacy").unwrap();
    assert_eq!(legacy.outcome, CheckOutcome::Skipped);
    assert!(legacy.completions.is_empty());
    assert!(
        sandbox.executed().iter().all(|script| !script.text().contains("legacy")),
        "skipped check must never be invoked"
    );
}
