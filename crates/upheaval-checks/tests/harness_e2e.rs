// crates/upheaval-checks/tests/harness_e2e.rs
// ============================================================================
// Module: Catalog Harness Tests
// Description: End-to-end runs of the builtin catalog through the executor.
// ============================================================================
//! ## Overview
//! Drives the shipped checks through full scenario runs against sandbox
//! collaborators: zero-disruption convergence, restart survival, and
//! legacy-check gating across the selection boundary.

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

use upheaval_checks::UpsertInsert;
use upheaval_checks::builtin_registry;
use upheaval_core::Check;
use upheaval_core::CheckOutcome;
use upheaval_core::Executor;
use upheaval_core::ExecutorConfig;
use upheaval_core::Phase;
use upheaval_core::RecordingOrchestrator;
use upheaval_core::RunId;
use upheaval_core::RunOutcome;
use upheaval_core::SandboxExecutor;
use upheaval_core::SandboxProbe;
use upheaval_core::SandboxResponse;
use upheaval_core::ScenarioParams;
use upheaval_core::ScriptOutcome;
use upheaval_core::SelectionCriteria;
use upheaval_core::builtin_scenario;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Executor configuration with short deadlines for tests.
fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        phase_timeout_ms: 500,
        health_poll_interval_ms: 10,
        settle_timeout_ms: 500,
        ..ExecutorConfig::default()
    }
}

// ============================================================================
// SECTION: Runs
// ============================================================================

/// Tests that a zero-disruption run reports the whole catalog as passed,
/// except the legacy check which is skipped outside migrations.
#[tokio::test]
async fn zero_disruption_run_passes_catalog() {
    let params = ScenarioParams::default();
    let scenario = builtin_scenario("no-disruption", &params).unwrap();
    let registry = builtin_registry().unwrap();
    let selection = registry.select(&SelectionCriteria::default(), &scenario);

    let sandbox = SandboxExecutor::passing();
    let executor = Executor::new(
        scenario,
        sandbox.clone(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
    for check in &report.checks {
        let expected = if check.check_id.as_str() == "upsert-legacy" {
            CheckOutcome::Skipped
        } else {
            CheckOutcome::Passed
        };
        assert_eq!(check.outcome, expected, "{}", check.check_id);
    }

    // Three admitted checks, each: initialize + 2 steps + validate.
    assert_eq!(sandbox.executed_count(), 12);
    assert!(
        sandbox.executed().iter().all(|script| !script.text().contains("upsert-legacy-syntax")),
        "legacy scripts must never reach the executor outside migrations"
    );
}

/// Tests that the catalog passes a restart scenario with a recovering
/// system.
#[tokio::test]
async fn restart_run_passes_catalog() {
    let params = ScenarioParams::default();
    let scenario = builtin_scenario("restart", &params).unwrap();
    let registry = builtin_registry().unwrap();
    let selection = registry.select(&SelectionCriteria::default(), &scenario);

    let executor = Executor::new(
        scenario,
        SandboxExecutor::passing(),
        SandboxProbe::healthy_after(0),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
}

/// Tests that the legacy check participates in rolling upgrades and its
/// phases execute in lifecycle order.
#[tokio::test]
async fn rolling_upgrade_admits_legacy_check() {
    let params = ScenarioParams::default();
    let scenario = builtin_scenario("rolling-upgrade", &params).unwrap();
    let registry = builtin_registry().unwrap();
    let selection = registry.select(&SelectionCriteria::default(), &scenario);

    let sandbox = SandboxExecutor::passing();
    let executor = Executor::new(
        scenario,
        sandbox.clone(),
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Passed);
    assert_eq!(report.checks.len(), 4);
    assert!(report.checks.iter().all(|check| check.outcome == CheckOutcome::Passed));

    let legacy_phases: Vec<Phase> = sandbox
        .executed()
        .iter()
        .filter(|script| script.text().contains("upsert-legacy-syntax"))
        .map(upheaval_core::Script::phase)
        .collect();
    assert_eq!(
        legacy_phases,
        vec![Phase::Initialize, Phase::Manipulate, Phase::Manipulate, Phase::Validate],
    );
}

/// Tests that a validate mismatch surfaces the captured values for the
/// failing check only.
#[tokio::test]
async fn validate_mismatch_fails_only_that_check() {
    let params = ScenarioParams::default();
    let scenario = builtin_scenario("no-disruption", &params).unwrap();
    let registry = builtin_registry().unwrap();
    let selection = registry.select(&SelectionCriteria::default(), &scenario);

    let sandbox = SandboxExecutor::passing().with_response(
        UpsertInsert.validate().text().to_string(),
        SandboxResponse::Outcome(ScriptOutcome::failure("9999 9999 9999")),
    );
    let executor = Executor::new(
        scenario,
        sandbox,
        SandboxProbe::healthy(),
        RecordingOrchestrator::new(),
        fast_config(),
    )
    .unwrap();
    let report = executor.run(RunId::new("run-1"), selection).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    for check in &report.checks {
        match check.check_id.as_str() {
            "upsert-insert" => assert_eq!(check.outcome, CheckOutcome::Failed),
            "upsert-legacy" => assert_eq!(check.outcome, CheckOutcome::Skipped),
            _ => assert_eq!(check.outcome, CheckOutcome::Passed),
        }
    }
}
