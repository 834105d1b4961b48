// crates/upheaval-checks/src/lib.rs
// ============================================================================
// Module: Upheaval Builtin Checks
// Description: The builtin catalog of convergence checks.
// Purpose: Register the shipped checks into a registry in declaration order.
// Dependencies: upheaval-core
// ============================================================================

//! ## Overview
//! The builtin catalog is an explicit registration table: every shipped check
//! is listed once, in declaration order, and registered into a
//! [`CheckRegistry`](upheaval_core::CheckRegistry) on demand. There is no
//! runtime discovery; adding a check means adding it to
//! [`builtin_checks`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod common;
pub mod upsert;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use upheaval_core::Check;
use upheaval_core::CheckRegistry;
use upheaval_core::RegistryError;

pub use upsert::UpsertDelete;
pub use upsert::UpsertInsert;
pub use upsert::UpsertLegacy;
pub use upsert::UpsertUpdate;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Returns every builtin check in declaration order.
#[must_use]
pub fn builtin_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(UpsertInsert),
        Arc::new(UpsertUpdate),
        Arc::new(UpsertDelete),
        Arc::new(UpsertLegacy),
    ]
}

/// Builds a registry preloaded with the builtin catalog.
///
/// # Errors
///
/// Returns [`RegistryError`] when the catalog contains duplicate names,
/// which would indicate a defective catalog edit.
pub fn builtin_registry() -> Result<CheckRegistry, RegistryError> {
    let mut registry = CheckRegistry::new();
    registry.register_all(builtin_checks())?;
    Ok(registry)
}
