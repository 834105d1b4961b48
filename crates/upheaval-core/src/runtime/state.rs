// crates/upheaval-core/src/runtime/state.rs
// ============================================================================
// Module: Upheaval Execution State
// Description: Per-check lifecycle records owned by the executor.
// Purpose: Track phase progress, failures, and completion timestamps per run.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The executor owns one [`ExecutionState`] per selected check. Checks never
//! observe or mutate this state; it exists so the executor can decide which
//! checks are still live at each barrier and so the final report can show
//! when each phase completed. Records are append-only within a run and
//! discarded with it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::CheckId;
use crate::core::CheckOutcome;
use crate::core::CheckReport;
use crate::core::CheckState;
use crate::core::Phase;
use crate::core::PhaseCompletion;
use crate::core::PhaseFailure;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Execution State
// ============================================================================

/// Per-check lifecycle record for one run.
///
/// # Invariants
/// - Owned exclusively by the executor; never shared with checks.
/// - `next_step` only grows, and never beyond `total_steps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Check this record tracks.
    pub check_id: CheckId,
    /// Current lifecycle state.
    pub state: CheckState,
    /// Index of the next unconsumed manipulate step.
    pub next_step: usize,
    /// Total number of manipulate steps the check declared.
    pub total_steps: usize,
    /// First failure recorded for the check, if any.
    pub failure: Option<PhaseFailure>,
    /// Phase completion timestamps in execution order.
    pub completions: Vec<PhaseCompletion>,
}

impl ExecutionState {
    /// Creates a pending record for a check with the given step count.
    #[must_use]
    pub const fn pending(check_id: CheckId, total_steps: usize) -> Self {
        Self {
            check_id,
            state: CheckState::Pending,
            next_step: 0,
            total_steps,
            failure: None,
            completions: Vec::new(),
        }
    }

    /// Returns whether the check still participates in upcoming phases.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.state.is_live()
    }

    /// Returns whether the check has unconsumed manipulate steps.
    #[must_use]
    pub const fn has_pending_steps(&self) -> bool {
        self.next_step < self.total_steps
    }

    /// Records a successful phase completion and advances the lifecycle.
    pub fn record_completion(&mut self, phase: Phase, step: Option<usize>, at: Timestamp) {
        self.completions.push(PhaseCompletion { phase, step, at });
        match phase {
            Phase::Initialize => self.state = CheckState::Initialized,
            Phase::Manipulate => {
                self.next_step += 1;
                self.state = CheckState::Manipulating;
            }
            Phase::Validate => self.state = CheckState::Validated,
        }
    }

    /// Records a phase failure and moves the check to its terminal state.
    ///
    /// Only the first failure is kept; a check cannot fail twice because it
    /// is excluded from all later phases.
    pub fn record_failure(&mut self, failure: PhaseFailure) {
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
        self.state = CheckState::Failed;
    }

    /// Converts the record into its report entry.
    ///
    /// Live checks at conversion time were cut off by a run-fatal abort and
    /// are reported as indeterminate.
    #[must_use]
    pub fn into_report(self, aborted: bool) -> CheckReport {
        let outcome = match self.state {
            CheckState::Validated => CheckOutcome::Passed,
            CheckState::Failed => CheckOutcome::Failed,
            CheckState::Pending | CheckState::Initialized | CheckState::Manipulating => {
                debug_assert!(aborted, "live check converted without an abort");
                CheckOutcome::Indeterminate
            }
        };
        CheckReport {
            check_id: self.check_id,
            outcome,
            failure: self.failure,
            completions: self.completions,
        }
    }
}
