// crates/upheaval-core/src/interfaces/mod.rs
// ============================================================================
// Module: Upheaval Interfaces
// Description: Backend-agnostic interfaces for script execution, health, and
//              orchestration.
// Purpose: Define the contract surfaces the harness uses to reach the system
//          under test.
// Dependencies: crate::core, async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how Upheaval reaches the system under test without
//! embedding backend-specific details. The harness treats every collaborator
//! as a black box: scripts are executed, not parsed; health is a boolean
//! probe; disruptive actions are requested, not performed. Implementations
//! must be safe for concurrent use, since phase calls within a round fan out
//! in parallel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::DisruptionAction;
use crate::core::Script;

// ============================================================================
// SECTION: Script Executor
// ============================================================================

/// Outcome of executing one script.
///
/// # Invariants
/// - `captured` is opaque diagnostic output; the harness never inspects it
///   beyond carrying it into reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    /// Whether the script's embedded expectations held.
    pub success: bool,
    /// Output captured by the executor.
    pub captured: String,
}

impl ScriptOutcome {
    /// Creates a successful outcome with the given captured output.
    #[must_use]
    pub fn success(captured: impl Into<String>) -> Self {
        Self {
            success: true,
            captured: captured.into(),
        }
    }

    /// Creates a failed outcome with the given captured output.
    #[must_use]
    pub fn failure(captured: impl Into<String>) -> Self {
        Self {
            success: false,
            captured: captured.into(),
        }
    }
}

/// Script executor errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The executor could not run the script.
    #[error("script executor error: {0}")]
    Executor(String),
}

/// Opaque executor running workload scripts against the system under test.
///
/// Implementations must tolerate concurrent calls; phase invocations within
/// a round run in parallel against the shared database.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Executes a script and returns its pass/fail outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] when the script could not be run at all;
    /// expectation mismatches are reported via [`ScriptOutcome::success`]
    /// instead.
    async fn execute(&self, script: &Script) -> Result<ScriptOutcome, ScriptError>;
}

// ============================================================================
// SECTION: System Probe
// ============================================================================

/// Health and identity probe for the system under test.
#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// Returns whether the system currently reports healthy.
    async fn is_healthy(&self) -> bool;

    /// Returns the running version when the deployment exposes one.
    async fn running_version(&self) -> Option<String> {
        None
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Orchestration errors for disruptive actions.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The orchestration layer reported an error.
    #[error("orchestration error: {0}")]
    ActionFailed(String),
}

/// Process/container orchestration layer performing disruptive actions.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Performs the requested disruptive action.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError`] when the action could not be performed.
    async fn apply(&self, action: &DisruptionAction) -> Result<(), OrchestrationError>;
}
