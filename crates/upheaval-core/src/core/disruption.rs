// crates/upheaval-core/src/core/disruption.rs
// ============================================================================
// Module: Upheaval Disruption Model
// Description: Disruptive operational events injected between manipulate rounds.
// Purpose: Describe restart, upgrade, and failover actions as inspectable data.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A disruption describes one disruptive operational event: what the
//! orchestration layer should do, whether repeating it is safe, how long the
//! system is expected to be unavailable, and how long recovery may take
//! before the run is aborted. Disruptions are pure data here; the executor
//! sequences them and the external orchestrator performs them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DisruptionId;

// ============================================================================
// SECTION: Disruption Actions
// ============================================================================

/// Concrete disruptive action requested from the orchestration layer.
///
/// # Invariants
/// - Variants are stable for serialization and report labeling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisruptionAction {
    /// Stop and restart the database process on the same version.
    Restart,
    /// Upgrade the database to the target version via a rolling restart.
    RollingUpgrade {
        /// Version the system should run after the upgrade.
        target_version: String,
    },
    /// Fail over from the active replica to a standby.
    ReplicaFailover {
        /// Replica that should become active.
        promote_replica: String,
    },
    /// Deliberate no-op between rounds (health re-confirmation only).
    NoOp,
}

impl DisruptionAction {
    /// Returns a stable label for the action kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Restart => "restart",
            Self::RollingUpgrade { .. } => "rolling-upgrade",
            Self::ReplicaFailover { .. } => "replica-failover",
            Self::NoOp => "no-op",
        }
    }

    /// Returns whether repeating the action is safe.
    ///
    /// Restart and no-op may be re-applied transparently; an upgrade or a
    /// failover changes system identity and is never retried automatically.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        matches!(self, Self::Restart | Self::NoOp)
    }
}

// ============================================================================
// SECTION: Disruption Specification
// ============================================================================

/// One disruption position within a scenario.
///
/// # Invariants
/// - Executed exactly once per scenario position; never reused across runs.
/// - After completion the system must report healthy before any subsequent
///   phase runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptionSpec {
    /// Identifier for this disruption position.
    pub disruption_id: DisruptionId,
    /// Action requested from the orchestration layer.
    pub action: DisruptionAction,
    /// Window the system is expected to be unavailable, in milliseconds.
    pub expected_unavailability_ms: u64,
    /// Budget for the system to report healthy again, in milliseconds.
    pub recovery_timeout_ms: u64,
    /// Whether a failed precondition aborts the run.
    pub mandatory: bool,
}

impl DisruptionSpec {
    /// Creates a mandatory disruption with the given identifier and action.
    #[must_use]
    pub fn new(disruption_id: impl Into<DisruptionId>, action: DisruptionAction) -> Self {
        Self {
            disruption_id: disruption_id.into(),
            action,
            expected_unavailability_ms: DEFAULT_UNAVAILABILITY_MS,
            recovery_timeout_ms: DEFAULT_RECOVERY_TIMEOUT_MS,
            mandatory: true,
        }
    }

    /// Overrides the expected unavailability window.
    #[must_use]
    pub const fn with_expected_unavailability_ms(mut self, millis: u64) -> Self {
        self.expected_unavailability_ms = millis;
        self
    }

    /// Overrides the recovery timeout budget.
    #[must_use]
    pub const fn with_recovery_timeout_ms(mut self, millis: u64) -> Self {
        self.recovery_timeout_ms = millis;
        self
    }

    /// Marks the disruption as optional (failed precondition skips it).
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    /// Returns whether the executor may retry a failed apply transparently.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        self.action.is_idempotent()
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default expected unavailability window in milliseconds.
pub const DEFAULT_UNAVAILABILITY_MS: u64 = 10_000;
/// Default recovery timeout budget in milliseconds.
pub const DEFAULT_RECOVERY_TIMEOUT_MS: u64 = 120_000;
