// crates/upheaval-core/src/runtime/events.rs
// ============================================================================
// Module: Upheaval Run Events
// Description: Structured run events and pluggable sinks.
// Purpose: Emit a machine-readable run log without hard logging dependencies.
// Dependencies: crate::core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! This module defines the structured events the executor emits while a run
//! progresses, and the sinks that receive them. It is intentionally
//! lightweight so deployments can route events to their preferred logging
//! pipeline without redesign: the JSONL sink appends one JSON object per
//! line, and the null sink discards everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::AbortCause;
use crate::core::CheckId;
use crate::core::DisruptionId;
use crate::core::HashDigest;
use crate::core::Phase;
use crate::core::RunId;
use crate::core::RunOutcome;
use crate::core::ScenarioId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Event Payloads
// ============================================================================

/// Structured run event payload.
///
/// # Invariants
/// - Variants are stable for downstream log consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run started executing its plan.
    RunStarted {
        /// Run identifier.
        run_id: RunId,
        /// Scenario being executed.
        scenario_id: ScenarioId,
        /// Canonical digest of the expanded plan.
        plan_hash: HashDigest,
        /// Number of manipulate rounds in the plan.
        rounds: usize,
        /// Number of checks admitted to the run.
        admitted: usize,
        /// Number of checks skipped as inapplicable.
        skipped: usize,
    },
    /// A check was skipped without any phase invocation.
    CheckSkipped {
        /// Skipped check.
        check_id: CheckId,
    },
    /// A phase call completed successfully for a check.
    PhaseCompleted {
        /// Check whose phase completed.
        check_id: CheckId,
        /// Completed phase.
        phase: Phase,
        /// Manipulate step index when applicable.
        step: Option<usize>,
    },
    /// A phase call failed for a check (check-local).
    PhaseFailed {
        /// Check whose phase failed.
        check_id: CheckId,
        /// Failed phase.
        phase: Phase,
        /// Manipulate step index when applicable.
        step: Option<usize>,
    },
    /// A manipulate round started.
    RoundStarted {
        /// Zero-based round index.
        round: usize,
        /// Number of checks dispatching a step this round.
        dispatching: usize,
    },
    /// A disruption is about to be applied.
    DisruptionStarted {
        /// Disruption position identifier.
        disruption_id: DisruptionId,
        /// Stable action label.
        action: String,
    },
    /// A disruption's precondition rejected it and it was skipped.
    DisruptionSkipped {
        /// Disruption position identifier.
        disruption_id: DisruptionId,
        /// Precondition diagnostic.
        reason: String,
    },
    /// The system reported healthy after a disruption.
    HealthConfirmed {
        /// Disruption the system recovered from, when tied to one.
        disruption_id: Option<DisruptionId>,
    },
    /// The run finished with a terminal outcome.
    RunFinished {
        /// Run identifier.
        run_id: RunId,
        /// Scenario-level outcome.
        outcome: RunOutcome,
        /// Abort cause when the run was stopped.
        abort: Option<AbortCause>,
    },
}

/// Envelope pairing an event with its emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEventRecord {
    /// Emission timestamp.
    pub at: Timestamp,
    /// RFC 3339 rendering of the timestamp when it is wall-clock time.
    pub at_rfc3339: Option<String>,
    /// Event payload.
    #[serde(flatten)]
    pub event: RunEvent,
}

impl RunEventRecord {
    /// Wraps an event with the given emission timestamp.
    #[must_use]
    pub fn new(at: Timestamp, event: RunEvent) -> Self {
        let at_rfc3339 = at.as_unix_millis().and_then(|millis| {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .ok()
                .and_then(|datetime| datetime.format(&Rfc3339).ok())
        });
        Self {
            at,
            at_rfc3339,
            event,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink receiving run events.
///
/// Sinks must not fail the run: emission errors are swallowed at the sink
/// boundary so observability problems never change verdicts.
pub trait EventSink: Send + Sync {
    /// Receives one event record.
    fn emit(&self, record: &RunEventRecord);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _record: &RunEventRecord) {}
}

/// Sink appending one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlEventSink {
    /// Open file handle protected by a mutex.
    file: Mutex<File>,
}

impl JsonlEventSink {
    /// Opens (or creates) the file at `path` in append mode.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] when the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for JsonlEventSink {
    fn emit(&self, record: &RunEventRecord) {
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        if let Ok(mut guard) = self.file.lock() {
            let _ = writeln!(guard, "{line}");
        }
    }
}
