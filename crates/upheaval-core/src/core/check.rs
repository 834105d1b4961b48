// crates/upheaval-core/src/core/check.rs
// ============================================================================
// Module: Upheaval Check Contract
// Description: Three-phase correctness checks and their lifecycle states.
// Purpose: Define the unit of verification driven by the executor.
// Dependencies: crate::core::{identifiers, script}, serde
// ============================================================================

//! ## Overview
//! A check encapsulates one correctness property as three phases: initialize
//! creates the observed objects, manipulate mutates the underlying data in
//! independently schedulable steps, and validate asserts the eventually-stable
//! postcondition. Checks are data-only declarations; all orchestration
//! (ordering, barriers, disruption placement) lives in the executor. Checks
//! must not share mutable state with each other, and the validate phase must
//! hold regardless of how many manipulate steps or disruptions ran before it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CheckId;
use crate::core::script::Script;

// ============================================================================
// SECTION: Applicability
// ============================================================================

/// Explicit predicate deciding whether a check participates in a run.
///
/// # Invariants
/// - Applicability is evaluated against the active scenario's declared tags
///   only; selection never probes the running system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Applicability {
    /// The check participates in every scenario.
    Always,
    /// The check participates only when the scenario declares the tag.
    RequiresScenarioTag(String),
}

impl Applicability {
    /// Returns whether a scenario with the given tags admits this check.
    #[must_use]
    pub fn admits(&self, scenario_tags: &[String]) -> bool {
        match self {
            Self::Always => true,
            Self::RequiresScenarioTag(tag) => scenario_tags.iter().any(|have| have == tag),
        }
    }
}

// ============================================================================
// SECTION: Check Metadata
// ============================================================================

/// Declarative metadata attached to a check.
///
/// # Invariants
/// - `name` is unique within a registry.
/// - `tags` are free-form labels used by selection criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckMetadata {
    /// Unique check name.
    pub name: CheckId,
    /// Free-form labels for selection filtering.
    pub tags: Vec<String>,
    /// Predicate deciding participation per scenario.
    pub applicability: Applicability,
}

impl CheckMetadata {
    /// Creates metadata for an always-applicable, untagged check.
    #[must_use]
    pub fn named(name: impl Into<CheckId>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            applicability: Applicability::Always,
        }
    }

    /// Adds a selection tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Replaces the applicability predicate.
    #[must_use]
    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }
}

// ============================================================================
// SECTION: Check Contract
// ============================================================================

/// One correctness property expressed as three phases.
///
/// Implementations are pure declarations: phase constructors build scripts
/// and must not touch the database or any shared harness state themselves.
pub trait Check: Send + Sync {
    /// Returns the check's declarative metadata.
    fn metadata(&self) -> CheckMetadata;

    /// Builds the one-time setup script.
    ///
    /// After execution the observed objects exist but are not yet assumed
    /// correct.
    fn initialize(&self) -> Script;

    /// Builds the ordered sequence of mutation steps.
    ///
    /// Steps are independently schedulable; the executor may split them
    /// around disruptions but never reorders them relative to each other.
    fn manipulate(&self) -> Vec<Script>;

    /// Builds the final convergence assertion.
    ///
    /// The assertion must hold regardless of how many manipulate steps or
    /// disruptions completed since initialize.
    fn validate(&self) -> Script;
}

// ============================================================================
// SECTION: Lifecycle States
// ============================================================================

/// Lifecycle state of a check within a single run.
///
/// # Invariants
/// - Transitions are monotone: `Pending → Initialized → Manipulating →
///   Validated`, with `Failed` reachable from any phase.
/// - State is owned exclusively by the executor; checks never observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    /// Constructed but not yet initialized.
    Pending,
    /// Initialize phase completed.
    Initialized,
    /// At least one manipulate step completed.
    Manipulating,
    /// Validate phase completed successfully.
    Validated,
    /// A phase failed; the check is excluded from further phases.
    Failed,
}

impl CheckState {
    /// Returns whether the check still participates in upcoming phases.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Initialized | Self::Manipulating)
    }
}
