// crates/upheaval-core/src/core/script.rs
// ============================================================================
// Module: Upheaval Script Payloads
// Description: Opaque workload payloads handed to the external script executor.
// Purpose: Carry immutable phase payloads without interpreting their contents.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Script`] is the unit of work Upheaval hands to the external script
//! executor. The harness never parses the payload text; expected results are
//! encoded inside the payload by convention of the executor contract. Scripts
//! are immutable after creation and tagged with the lifecycle [`Phase`] they
//! belong to.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Phase Kinds
// ============================================================================

/// Lifecycle phase a script belongs to.
///
/// # Invariants
/// - Variants are stable for serialization and report labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// One-time setup that creates the observed objects.
    Initialize,
    /// One step of ongoing data mutation.
    Manipulate,
    /// Final convergence assertion.
    Validate,
}

impl Phase {
    /// Returns a stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Manipulate => "manipulate",
            Self::Validate => "validate",
        }
    }
}

// ============================================================================
// SECTION: Script Payload
// ============================================================================

/// Immutable workload payload executed by the external script executor.
///
/// # Invariants
/// - `text` is opaque to the harness; it is never parsed or rewritten.
/// - A script's phase never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Lifecycle phase the script implements.
    phase: Phase,
    /// Opaque payload text in the executor's workload language.
    text: String,
}

impl Script {
    /// Creates a new script for the given phase.
    #[must_use]
    pub fn new(phase: Phase, text: impl Into<String>) -> Self {
        Self {
            phase,
            text: text.into(),
        }
    }

    /// Creates an initialize-phase script.
    #[must_use]
    pub fn initialize(text: impl Into<String>) -> Self {
        Self::new(Phase::Initialize, text)
    }

    /// Creates a manipulate-phase script.
    #[must_use]
    pub fn manipulate(text: impl Into<String>) -> Self {
        Self::new(Phase::Manipulate, text)
    }

    /// Creates a validate-phase script.
    #[must_use]
    pub fn validate(text: impl Into<String>) -> Self {
        Self::new(Phase::Validate, text)
    }

    /// Returns the phase this script implements.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the opaque payload text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}
