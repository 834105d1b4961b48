// crates/upheaval-core/src/runtime/sandbox.rs
// ============================================================================
// Module: Upheaval Sandbox Collaborators
// Description: In-memory collaborator implementations for tests and drills.
// Purpose: Provide deterministic executor, probe, and orchestrator doubles
//          without external deps.
// Dependencies: crate::{core, interfaces}, async-trait, tokio
// ============================================================================

//! ## Overview
//! This module provides simple in-memory implementations of the collaborator
//! interfaces for tests and rehearsal runs. The sandbox executor replays
//! queued outcomes per script text and journals every execution; the probe
//! and orchestrator are scriptable in the same spirit. None of these are
//! intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::DisruptionAction;
use crate::core::Script;
use crate::interfaces::OrchestrationError;
use crate::interfaces::Orchestrator;
use crate::interfaces::ScriptError;
use crate::interfaces::ScriptExecutor;
use crate::interfaces::ScriptOutcome;
use crate::interfaces::SystemProbe;

// ============================================================================
// SECTION: Sandbox Executor
// ============================================================================

/// Scripted response for one script text.
#[derive(Debug, Clone)]
pub enum SandboxResponse {
    /// Return the outcome immediately.
    Outcome(ScriptOutcome),
    /// Fail with an executor transport error.
    Error(String),
    /// Never complete (used to exercise phase deadlines).
    Hang,
}

/// In-memory script executor replaying queued outcomes.
///
/// # Invariants
/// - Unmatched scripts receive the default outcome.
/// - Every execution is journaled in call order.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    /// Outcome returned when no override matches.
    default: ScriptOutcome,
    /// Per-script-text response overrides.
    overrides: Arc<Mutex<BTreeMap<String, SandboxResponse>>>,
    /// Journal of executed scripts in call order.
    journal: Arc<Mutex<Vec<Script>>>,
}

impl SandboxExecutor {
    /// Creates an executor where every script succeeds.
    #[must_use]
    pub fn passing() -> Self {
        Self {
            default: ScriptOutcome::success("ok"),
            overrides: Arc::new(Mutex::new(BTreeMap::new())),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates an executor where every script fails with the given output.
    #[must_use]
    pub fn failing(captured: impl Into<String>) -> Self {
        Self {
            default: ScriptOutcome::failure(captured),
            overrides: Arc::new(Mutex::new(BTreeMap::new())),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Overrides the response for scripts whose text equals `text`.
    #[must_use]
    pub fn with_response(self, text: impl Into<String>, response: SandboxResponse) -> Self {
        if let Ok(mut guard) = self.overrides.lock() {
            guard.insert(text.into(), response);
        }
        self
    }

    /// Returns the journal of executed scripts in call order.
    #[must_use]
    pub fn executed(&self) -> Vec<Script> {
        self.journal.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns how many scripts were executed.
    #[must_use]
    pub fn executed_count(&self) -> usize {
        self.journal.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ScriptExecutor for SandboxExecutor {
    async fn execute(&self, script: &Script) -> Result<ScriptOutcome, ScriptError> {
        if let Ok(mut guard) = self.journal.lock() {
            guard.push(script.clone());
        }
        let response = self
            .overrides
            .lock()
            .ok()
            .and_then(|guard| guard.get(script.text()).cloned());
        match response {
            None => Ok(self.default.clone()),
            Some(SandboxResponse::Outcome(outcome)) => Ok(outcome),
            Some(SandboxResponse::Error(message)) => Err(ScriptError::Executor(message)),
            Some(SandboxResponse::Hang) => {
                // Far beyond any test deadline; the caller's timeout wins.
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Ok(self.default.clone())
            }
        }
    }
}

// ============================================================================
// SECTION: Sandbox Probe
// ============================================================================

/// Health behavior over successive probe calls.
#[derive(Debug, Clone, Copy)]
enum ProbeMode {
    /// Every probe reports healthy.
    Always,
    /// No probe ever reports healthy.
    Never,
    /// The first `polls` probes report unhealthy, later ones healthy.
    HealthyAfter,
    /// The first `polls` probes report healthy, later ones unhealthy.
    HealthyFor,
}

/// Scriptable health probe.
///
/// # Invariants
/// - Counted modes consume one budget unit per probe call.
#[derive(Debug, Clone)]
pub struct SandboxProbe {
    /// Health behavior over successive probe calls.
    mode: ProbeMode,
    /// Probe calls remaining in the counted modes.
    polls: Arc<AtomicU64>,
    /// Version reported by the deployment, when any.
    version: Option<String>,
}

impl SandboxProbe {
    /// Creates a probe with the given mode and poll budget.
    fn with_mode(mode: ProbeMode, polls: u64) -> Self {
        Self {
            mode,
            polls: Arc::new(AtomicU64::new(polls)),
            version: None,
        }
    }

    /// Creates a probe that always reports healthy.
    #[must_use]
    pub fn healthy() -> Self {
        Self::with_mode(ProbeMode::Always, 0)
    }

    /// Creates a probe that never reports healthy.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::with_mode(ProbeMode::Never, 0)
    }

    /// Creates a probe that reports healthy after `polls` unhealthy probes.
    #[must_use]
    pub fn healthy_after(polls: u64) -> Self {
        Self::with_mode(ProbeMode::HealthyAfter, polls)
    }

    /// Creates a probe that reports healthy for the first `polls` probes and
    /// unhealthy forever after (a system that never recovers).
    #[must_use]
    pub fn healthy_for(polls: u64) -> Self {
        Self::with_mode(ProbeMode::HealthyFor, polls)
    }

    /// Sets the version the deployment reports.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Consumes one poll from the budget, returning whether any remained.
    fn consume_poll(&self) -> bool {
        let remaining = self.polls.load(Ordering::SeqCst);
        if remaining == 0 {
            return false;
        }
        self.polls.fetch_sub(1, Ordering::SeqCst);
        true
    }
}

#[async_trait]
impl SystemProbe for SandboxProbe {
    async fn is_healthy(&self) -> bool {
        match self.mode {
            ProbeMode::Always => true,
            ProbeMode::Never => false,
            ProbeMode::HealthyAfter => !self.consume_poll(),
            ProbeMode::HealthyFor => self.consume_poll(),
        }
    }

    async fn running_version(&self) -> Option<String> {
        self.version.clone()
    }
}

// ============================================================================
// SECTION: Recording Orchestrator
// ============================================================================

/// Orchestrator double journaling every requested action.
///
/// # Invariants
/// - The first `fail_first` applies fail; later applies succeed.
#[derive(Debug, Clone, Default)]
pub struct RecordingOrchestrator {
    /// Applies remaining before the orchestrator starts succeeding.
    fail_first: Arc<AtomicU64>,
    /// Journal of requested actions in call order.
    actions: Arc<Mutex<Vec<DisruptionAction>>>,
}

impl RecordingOrchestrator {
    /// Creates an orchestrator where every action succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the first `count` applies fail before succeeding.
    #[must_use]
    pub fn failing_first(count: u64) -> Self {
        Self {
            fail_first: Arc::new(AtomicU64::new(count)),
            actions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the journal of requested actions in call order.
    #[must_use]
    pub fn applied(&self) -> Vec<DisruptionAction> {
        self.actions.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Orchestrator for RecordingOrchestrator {
    async fn apply(&self, action: &DisruptionAction) -> Result<(), OrchestrationError> {
        if let Ok(mut guard) = self.actions.lock() {
            guard.push(action.clone());
        }
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.fetch_sub(1, Ordering::SeqCst);
            return Err(OrchestrationError::ActionFailed("injected failure".to_string()));
        }
        Ok(())
    }
}
