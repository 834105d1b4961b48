// crates/upheaval-core/src/core/registry.rs
// ============================================================================
// Module: Upheaval Check Registry
// Description: Explicit registration, discovery, and selection of checks.
// Purpose: Decide which checks participate in a concrete run, in stable order.
// Dependencies: crate::core::{check, identifiers, scenario}, thiserror
// ============================================================================

//! ## Overview
//! Checks register explicitly (a registration table, never runtime
//! reflection). The registry is the single place deciding which subset of
//! checks is relevant to a run: callers narrow by name or tag, and the
//! scenario's declared tags are matched against each check's applicability
//! predicate. Selection returns a stable order (declaration order, then
//! lexicographic by name) so repeated runs are reproducible, and never
//! mutates check state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::check::Check;
use crate::core::identifiers::CheckId;
use crate::core::scenario::ScenarioSpec;

// ============================================================================
// SECTION: Selection Criteria
// ============================================================================

/// Caller-supplied narrowing applied before applicability matching.
///
/// # Invariants
/// - Empty `names`/`tags` mean "no narrowing" for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Explicit check names to include; empty admits all.
    pub names: Vec<CheckId>,
    /// Tags to include (any-match); empty admits all.
    pub tags: Vec<String>,
}

impl SelectionCriteria {
    /// Returns whether the criteria admit a check with the given metadata.
    fn admits(&self, name: &CheckId, tags: &[String]) -> bool {
        let name_ok = self.names.is_empty() || self.names.contains(name);
        let tag_ok =
            self.tags.is_empty() || self.tags.iter().any(|wanted| tags.contains(wanted));
        name_ok && tag_ok
    }
}

/// Result of selecting checks for a scenario.
///
/// # Invariants
/// - `admitted` preserves registration order, then lexicographic name order.
/// - `skipped` checks were narrowed in by criteria but rejected by their
///   applicability predicate; they must never be invoked.
#[derive(Clone)]
pub struct Selection {
    /// Checks participating in the run.
    pub admitted: Vec<Arc<dyn Check>>,
    /// Checks reported as skipped without any phase invocation.
    pub skipped: Vec<CheckId>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registration entry pairing a check with its declaration index.
struct Registration {
    /// Declaration index assigned at registration time.
    index: usize,
    /// Registered check.
    check: Arc<dyn Check>,
}

/// Explicit check registration table.
#[derive(Default)]
pub struct CheckRegistry {
    /// Registered checks in declaration order.
    entries: Vec<Registration>,
    /// Names seen so far, for duplicate detection.
    names: BTreeSet<CheckId>,
}

impl CheckRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check, assigning it the next declaration index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateCheckName`] when a check with the
    /// same name is already registered.
    pub fn register(&mut self, check: Arc<dyn Check>) -> Result<(), RegistryError> {
        let name = check.metadata().name;
        if !self.names.insert(name.clone()) {
            return Err(RegistryError::DuplicateCheckName(name.to_string()));
        }
        self.entries.push(Registration {
            index: self.entries.len(),
            check,
        });
        Ok(())
    }

    /// Registers every check from an iterator.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateCheckName`] on the first duplicate.
    pub fn register_all(
        &mut self,
        checks: impl IntoIterator<Item = Arc<dyn Check>>,
    ) -> Result<(), RegistryError> {
        for check in checks {
            self.register(check)?;
        }
        Ok(())
    }

    /// Returns every registered check in stable order.
    #[must_use]
    pub fn discover(&self) -> Vec<Arc<dyn Check>> {
        let mut ordered: Vec<&Registration> = self.entries.iter().collect();
        ordered.sort_by(|a, b| {
            a.index.cmp(&b.index).then_with(|| a.check.metadata().name.cmp(&b.check.metadata().name))
        });
        ordered.into_iter().map(|entry| Arc::clone(&entry.check)).collect()
    }

    /// Selects the checks relevant to a scenario, in stable order.
    ///
    /// Checks narrowed out by `criteria` are omitted entirely; checks whose
    /// applicability predicate rejects the scenario are returned in
    /// `skipped` so the run can report them without invoking them.
    #[must_use]
    pub fn select(&self, criteria: &SelectionCriteria, scenario: &ScenarioSpec) -> Selection {
        let mut admitted = Vec::new();
        let mut skipped = Vec::new();
        for check in self.discover() {
            let metadata = check.metadata();
            if !criteria.admits(&metadata.name, &metadata.tags) {
                continue;
            }
            if metadata.applicability.admits(&scenario.tags) {
                admitted.push(check);
            } else {
                skipped.push(metadata.name);
            }
        }
        Selection { admitted, skipped }
    }

    /// Returns the number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A check with the same name is already registered.
    #[error("duplicate check name: {0}")]
    DuplicateCheckName(String),
}
