// crates/upheaval-core/src/core/time.rs
// ============================================================================
// Module: Upheaval Time Model
// Description: Canonical timestamp representations for run records and events.
// Purpose: Provide deterministic, replayable time values across Upheaval records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Upheaval embeds explicit time values in execution records and run events so
//! reports stay replayable. Data-model types never read wall-clock time
//! themselves; the runtime stamps records at its observability boundary via
//! [`now_unix_millis`], and tests use logical time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in Upheaval execution records and run events.
///
/// # Invariants
/// - Values are explicitly provided by callers; data-model types never read
///   wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}

// ============================================================================
// SECTION: Wall-Clock Helper
// ============================================================================

/// Returns the current wall-clock time as a [`Timestamp::UnixMillis`] value.
///
/// Clamps to zero when the system clock reports a time before the unix epoch.
#[must_use]
pub fn now_unix_millis() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    Timestamp::UnixMillis(millis)
}
