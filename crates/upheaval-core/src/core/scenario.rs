// crates/upheaval-core/src/core/scenario.rs
// ============================================================================
// Module: Upheaval Scenario Planning
// Description: Ordered disruption plans and their placement policies.
// Purpose: Produce deterministic, inspectable slot sequences for the executor.
// Dependencies: crate::core::{disruption, identifiers}, rand, serde
// ============================================================================

//! ## Overview
//! A scenario declares which disruptions happen during a run and how they are
//! placed relative to manipulate rounds. Planning is separated from
//! execution: [`ScenarioSpec::plan`] expands the declaration into a flat slot
//! sequence that can be inspected, hashed, and replayed before anything
//! touches the system under test. The initialize and validate barriers are
//! implicit; they are never part of the slot sequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::disruption::DisruptionAction;
use crate::core::disruption::DisruptionSpec;
use crate::core::identifiers::ScenarioId;

// ============================================================================
// SECTION: Placement Policy
// ============================================================================

/// Policy placing disruptions relative to manipulate rounds.
///
/// # Invariants
/// - Every policy preserves declared disruption order and count.
/// - `Random` placements are fully determined by the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Distribute disruptions evenly between rounds.
    Spread,
    /// Run every disruption before the first manipulate round.
    LeadingEdge,
    /// Run every disruption after the last manipulate round.
    TrailingEdge,
    /// Seeded random interleaving; reproducible per seed.
    Random {
        /// Seed driving the interleaving.
        seed: u64,
    },
}

// ============================================================================
// SECTION: Scenario Specification
// ============================================================================

/// Declarative scenario: disruptions, placement, and selection tags.
///
/// # Invariants
/// - A scenario references disruptions and a policy; it never owns checks.
/// - `tags` feed check applicability predicates (e.g. `version-migration`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Tags matched against check applicability predicates.
    pub tags: Vec<String>,
    /// Disruptions in declared execution order.
    pub disruptions: Vec<DisruptionSpec>,
    /// Placement policy relative to manipulate rounds.
    pub placement: PlacementPolicy,
}

impl ScenarioSpec {
    /// Validates structural invariants of the scenario declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioSpecError`] when the identifier is empty or two
    /// disruption positions share an identifier.
    pub fn validate(&self) -> Result<(), ScenarioSpecError> {
        if self.scenario_id.as_str().is_empty() {
            return Err(ScenarioSpecError::EmptyScenarioId);
        }
        for (index, disruption) in self.disruptions.iter().enumerate() {
            let duplicate = self.disruptions[.. index]
                .iter()
                .any(|prior| prior.disruption_id == disruption.disruption_id);
            if duplicate {
                return Err(ScenarioSpecError::DuplicateDisruptionId(
                    disruption.disruption_id.to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Expands the scenario into a flat slot sequence for `rounds` manipulate
    /// rounds.
    ///
    /// The returned plan satisfies: every round appears exactly once, and
    /// disruptions appear in declared order and count.
    #[must_use]
    pub fn plan(&self, rounds: usize) -> Plan {
        let insertion_points = match self.placement {
            PlacementPolicy::Spread => spread_points(rounds, self.disruptions.len()),
            PlacementPolicy::LeadingEdge => vec![0; self.disruptions.len()],
            PlacementPolicy::TrailingEdge => vec![rounds; self.disruptions.len()],
            PlacementPolicy::Random { seed } => random_points(rounds, self.disruptions.len(), seed),
        };

        let mut slots = Vec::with_capacity(rounds + self.disruptions.len());
        let mut next_disruption = 0;
        for round in 0 ..= rounds {
            while next_disruption < insertion_points.len()
                && insertion_points[next_disruption] == round
            {
                slots.push(Slot::Disruption(next_disruption));
                next_disruption += 1;
            }
            if round < rounds {
                slots.push(Slot::ManipulateRound);
            }
        }

        Plan {
            scenario_id: self.scenario_id.clone(),
            rounds,
            slots,
        }
    }
}

/// Scenario declaration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ScenarioSpecError {
    /// Scenario identifier is empty.
    #[error("scenario identifier is empty")]
    EmptyScenarioId,
    /// Two disruption positions share an identifier.
    #[error("duplicate disruption identifier: {0}")]
    DuplicateDisruptionId(String),
}

// ============================================================================
// SECTION: Plan
// ============================================================================

/// One slot in an expanded scenario plan.
///
/// # Invariants
/// - `Disruption` carries the index into the scenario's declared disruptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Slot {
    /// Dispatch each live check's next unconsumed manipulate step.
    ManipulateRound,
    /// Execute the scenario's disruption at the given declared index.
    Disruption(usize),
}

/// Expanded, inspectable slot sequence for one run.
///
/// # Invariants
/// - `slots` contains exactly `rounds` manipulate entries.
/// - Disruption indices appear in ascending declared order, each once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Scenario this plan was expanded from.
    pub scenario_id: ScenarioId,
    /// Number of manipulate rounds in the plan.
    pub rounds: usize,
    /// Flat slot sequence between the implicit barriers.
    pub slots: Vec<Slot>,
}

impl Plan {
    /// Verifies the plan invariants against the owning scenario.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when rounds are missing or disruptions are out
    /// of declared order or count.
    pub fn verify(&self, scenario: &ScenarioSpec) -> Result<(), PlanError> {
        let round_count = self.slots.iter().filter(|slot| matches!(slot, Slot::ManipulateRound)).count();
        if round_count != self.rounds {
            return Err(PlanError::RoundCountMismatch {
                expected: self.rounds,
                actual: round_count,
            });
        }
        let disruption_order: Vec<usize> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::ManipulateRound => None,
                Slot::Disruption(index) => Some(*index),
            })
            .collect();
        let expected: Vec<usize> = (0 .. scenario.disruptions.len()).collect();
        if disruption_order != expected {
            return Err(PlanError::DisruptionOrderViolation);
        }
        Ok(())
    }
}

/// Plan invariant violations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The plan does not contain the expected number of manipulate rounds.
    #[error("plan round count mismatch: expected {expected}, found {actual}")]
    RoundCountMismatch {
        /// Rounds the plan should contain.
        expected: usize,
        /// Rounds the plan actually contains.
        actual: usize,
    },
    /// Disruptions are missing, duplicated, or out of declared order.
    #[error("plan violates declared disruption order or count")]
    DisruptionOrderViolation,
}

// ============================================================================
// SECTION: Placement Helpers
// ============================================================================

/// Evenly spaced insertion points for `count` disruptions across `rounds`.
///
/// Each value is the number of manipulate rounds that precede the disruption.
fn spread_points(rounds: usize, count: usize) -> Vec<usize> {
    (0 .. count).map(|index| ((index + 1) * rounds) / (count + 1)).collect()
}

/// Seeded random insertion points, sorted to preserve declared order.
fn random_points(rounds: usize, count: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points: Vec<usize> = (0 .. count).map(|_| rng.gen_range(0 ..= rounds)).collect();
    points.sort_unstable();
    points
}

// ============================================================================
// SECTION: Builtin Catalog
// ============================================================================

/// Scenario tag admitting legacy-syntax checks.
pub const VERSION_MIGRATION_TAG: &str = "version-migration";

/// Parameters feeding the builtin scenario catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Target version for upgrade scenarios.
    pub target_version: String,
    /// Replica promoted by failover scenarios.
    pub promote_replica: String,
    /// Seed for randomized placement.
    pub seed: u64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            target_version: "next".to_string(),
            promote_replica: "replica-1".to_string(),
            seed: 0,
        }
    }
}

/// Names of the builtin scenarios in catalog order.
pub const BUILTIN_SCENARIO_NAMES: &[&str] =
    &["no-disruption", "restart", "rolling-upgrade", "replica-failover"];

/// Builds a builtin scenario by name, or `None` for unknown names.
#[must_use]
pub fn builtin_scenario(name: &str, params: &ScenarioParams) -> Option<ScenarioSpec> {
    match name {
        "no-disruption" => Some(ScenarioSpec {
            scenario_id: ScenarioId::new("no-disruption"),
            tags: Vec::new(),
            disruptions: Vec::new(),
            placement: PlacementPolicy::Spread,
        }),
        "restart" => Some(ScenarioSpec {
            scenario_id: ScenarioId::new("restart"),
            tags: Vec::new(),
            disruptions: vec![DisruptionSpec::new("restart-1", DisruptionAction::Restart)],
            placement: PlacementPolicy::Spread,
        }),
        "rolling-upgrade" => Some(ScenarioSpec {
            scenario_id: ScenarioId::new("rolling-upgrade"),
            tags: vec![VERSION_MIGRATION_TAG.to_string()],
            disruptions: vec![DisruptionSpec::new(
                "upgrade-1",
                DisruptionAction::RollingUpgrade {
                    target_version: params.target_version.clone(),
                },
            )],
            placement: PlacementPolicy::Spread,
        }),
        "replica-failover" => Some(ScenarioSpec {
            scenario_id: ScenarioId::new("replica-failover"),
            tags: Vec::new(),
            disruptions: vec![DisruptionSpec::new(
                "failover-1",
                DisruptionAction::ReplicaFailover {
                    promote_replica: params.promote_replica.clone(),
                },
            )],
            placement: PlacementPolicy::Spread,
        }),
        _ => None,
    }
}
