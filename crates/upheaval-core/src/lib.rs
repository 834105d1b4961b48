// crates/upheaval-core/src/lib.rs
// ============================================================================
// Module: Upheaval Core Library
// Description: Public API surface for the Upheaval harness core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Upheaval core drives convergence checks against a live streaming database
//! while operational disruptions (restarts, upgrades, failovers) land between
//! rounds of ongoing data mutation. It is backend-agnostic and reaches the
//! system under test only through explicit collaborator interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::Orchestrator;
pub use interfaces::OrchestrationError;
pub use interfaces::ScriptError;
pub use interfaces::ScriptExecutor;
pub use interfaces::ScriptOutcome;
pub use interfaces::SystemProbe;
pub use runtime::EventSink;
pub use runtime::Executor;
pub use runtime::ExecutorConfig;
pub use runtime::ExecutorError;
pub use runtime::ExecutionState;
pub use runtime::JsonlEventSink;
pub use runtime::NullEventSink;
pub use runtime::RecordingOrchestrator;
pub use runtime::RunEvent;
pub use runtime::RunEventRecord;
pub use runtime::SandboxExecutor;
pub use runtime::SandboxProbe;
pub use runtime::SandboxResponse;
