// crates/upheaval-core/src/core/verdict.rs
// ============================================================================
// Module: Upheaval Verdicts
// Description: Per-check outcomes, failure diagnostics, and run reports.
// Purpose: Capture the structured result of a harness run for reporting.
// Dependencies: crate::core::{hashing, identifiers, script, time}, serde
// ============================================================================

//! ## Overview
//! A run produces one [`RunReport`]: a terminal outcome per check plus a
//! scenario-level outcome. Check-local failures carry the failing phase and
//! the captured executor output so the report can show observed values
//! against the expectation encoded in the script. A run-fatal abort is
//! recorded once at the report level, and every check whose validate phase
//! never ran is marked [`CheckOutcome::Indeterminate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::CheckId;
use crate::core::identifiers::DisruptionId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::ScenarioId;
use crate::core::script::Phase;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Check Outcomes
// ============================================================================

/// Terminal outcome of one check within a run.
///
/// # Invariants
/// - Variants are stable for serialization and exit-status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Validate phase succeeded.
    Passed,
    /// A phase failed; the failure is check-local.
    Failed,
    /// The check was inapplicable to the scenario and never invoked.
    Skipped,
    /// A run-fatal abort occurred before the check's validate phase ran.
    Indeterminate,
}

impl CheckOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Indeterminate => "indeterminate",
        }
    }
}

// ============================================================================
// SECTION: Failure Diagnostics
// ============================================================================

/// Cause of a check-local phase failure.
///
/// # Invariants
/// - `Script` carries the captured executor output for the report.
/// - `Timeout` is recorded with the exceeded budget; at the check level it is
///   not distinguished further from a script logic failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// The executor ran the script and reported failure.
    Script {
        /// Output captured by the executor.
        captured: String,
    },
    /// The executor could not run the script at all.
    Transport {
        /// Collaborator error message.
        message: String,
    },
    /// The phase call exceeded its deadline.
    Timeout {
        /// Deadline that was exceeded, in milliseconds.
        budget_ms: u64,
    },
}

/// One check-local phase failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFailure {
    /// Phase that failed.
    pub phase: Phase,
    /// Manipulate step index when the phase is a manipulate step.
    pub step: Option<usize>,
    /// Failure cause and diagnostics.
    pub cause: FailureCause,
    /// When the failure was recorded.
    pub at: Timestamp,
}

/// Completion record for one phase call.
///
/// # Invariants
/// - `step` is set only for manipulate-phase completions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCompletion {
    /// Phase that completed.
    pub phase: Phase,
    /// Manipulate step index when applicable.
    pub step: Option<usize>,
    /// When the phase completed.
    pub at: Timestamp,
}

// ============================================================================
// SECTION: Abort Causes
// ============================================================================

/// Run-fatal abort cause.
///
/// # Invariants
/// - Any abort invalidates every not-yet-validated check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortCause {
    /// A mandatory disruption's precondition did not hold.
    DisruptionPrecondition {
        /// Disruption whose precondition failed.
        disruption_id: DisruptionId,
        /// Human-readable precondition diagnostic.
        reason: String,
    },
    /// The system never reported healthy within the recovery budget.
    DisruptionRecoveryTimeout {
        /// Disruption after which recovery timed out.
        disruption_id: DisruptionId,
        /// Recovery budget that elapsed, in milliseconds.
        timeout_ms: u64,
    },
    /// The orchestration layer failed to perform the disruptive action.
    Orchestration {
        /// Disruption whose action failed.
        disruption_id: DisruptionId,
        /// Collaborator error message.
        message: String,
    },
    /// Health could not be confirmed before the validate barrier.
    UnhealthyBeforeValidate {
        /// Confirmation budget that elapsed, in milliseconds.
        timeout_ms: u64,
    },
}

// ============================================================================
// SECTION: Run Report
// ============================================================================

/// Report entry for one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Check identifier.
    pub check_id: CheckId,
    /// Terminal outcome.
    pub outcome: CheckOutcome,
    /// Failure diagnostics when the outcome is `Failed`.
    pub failure: Option<PhaseFailure>,
    /// Phase completion timestamps in execution order.
    pub completions: Vec<PhaseCompletion>,
}

/// Scenario-level outcome of a run.
///
/// # Invariants
/// - `Passed` requires no abort and every live check passing validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every live check passed and no abort occurred.
    Passed,
    /// At least one live check failed a phase.
    Failed,
    /// A run-fatal abort stopped the scenario.
    Aborted,
}

/// Structured result of one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Scenario that was executed.
    pub scenario_id: ScenarioId,
    /// Canonical digest of the executed plan.
    pub plan_hash: HashDigest,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run finished.
    pub finished_at: Timestamp,
    /// Per-check reports in selection order.
    pub checks: Vec<CheckReport>,
    /// Abort cause when the run was stopped.
    pub abort: Option<AbortCause>,
    /// Scenario-level outcome.
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Computes the scenario-level outcome from check entries and abort state.
    ///
    /// Checks reported `Skipped` do not count against the verdict; a `Failed`
    /// check makes the run fail; any abort dominates.
    #[must_use]
    pub fn outcome_of(checks: &[CheckReport], abort: Option<&AbortCause>) -> RunOutcome {
        if abort.is_some() {
            return RunOutcome::Aborted;
        }
        let any_failed = checks.iter().any(|check| check.outcome == CheckOutcome::Failed);
        if any_failed { RunOutcome::Failed } else { RunOutcome::Passed }
    }
}
