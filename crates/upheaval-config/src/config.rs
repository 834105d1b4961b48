// crates/upheaval-config/src/config.rs
// ============================================================================
// Module: Upheaval Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml, upheaval-core
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and range
//! limits. A missing file yields defaults; an invalid file fails closed.
//! Timeout ranges are bounded so a typo cannot turn a five-second budget
//! into a five-day hang.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use upheaval_core::CheckId;
use upheaval_core::DEFAULT_RECOVERY_TIMEOUT_MS;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "upheaval.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "UPHEAVAL_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Minimum allowed phase deadline in milliseconds.
pub(crate) const MIN_PHASE_TIMEOUT_MS: u64 = 100;
/// Maximum allowed phase deadline in milliseconds.
pub(crate) const MAX_PHASE_TIMEOUT_MS: u64 = 3_600_000;
/// Minimum allowed recovery budget in milliseconds.
pub(crate) const MIN_RECOVERY_TIMEOUT_MS: u64 = 1_000;
/// Maximum allowed recovery budget in milliseconds.
pub(crate) const MAX_RECOVERY_TIMEOUT_MS: u64 = 3_600_000;
/// Minimum allowed health poll interval in milliseconds.
pub(crate) const MIN_HEALTH_POLL_INTERVAL_MS: u64 = 10;
/// Maximum allowed health poll interval in milliseconds.
pub(crate) const MAX_HEALTH_POLL_INTERVAL_MS: u64 = 60_000;
/// Maximum allowed extra manipulate rounds.
pub(crate) const MAX_EXTRA_ROUNDS: usize = 64;
/// Default phase deadline in milliseconds.
pub(crate) const DEFAULT_PHASE_TIMEOUT_MS: u64 = 60_000;
/// Default health poll interval in milliseconds.
pub(crate) const DEFAULT_HEALTH_POLL_INTERVAL_MS: u64 = 1_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Phase and recovery deadlines.
///
/// # Invariants
/// - All values are validated against the module's min/max constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TimeoutConfig {
    /// Deadline for a single phase call, in milliseconds.
    pub phase_ms: u64,
    /// Budget for post-disruption recovery, in milliseconds.
    pub recovery_ms: u64,
    /// Interval between health probes, in milliseconds.
    pub health_poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            phase_ms: DEFAULT_PHASE_TIMEOUT_MS,
            recovery_ms: DEFAULT_RECOVERY_TIMEOUT_MS,
            health_poll_interval_ms: DEFAULT_HEALTH_POLL_INTERVAL_MS,
        }
    }
}

/// Check selection narrowing.
///
/// # Invariants
/// - Empty lists mean "no narrowing" for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SelectionConfig {
    /// Explicit check names to include.
    pub checks: Vec<CheckId>,
    /// Tags to include (any-match).
    pub tags: Vec<String>,
}

/// Scenario selection and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScenarioConfig {
    /// Builtin scenario name.
    pub name: String,
    /// Target version for upgrade scenarios.
    pub target_version: String,
    /// Replica promoted by failover scenarios.
    pub promote_replica: String,
    /// Seed for randomized placement.
    pub seed: u64,
    /// Additional manipulate rounds beyond the longest check.
    pub extra_rounds: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "no-disruption".to_string(),
            target_version: "next".to_string(),
            promote_replica: "replica-1".to_string(),
            seed: 0,
            extra_rounds: 0,
        }
    }
}

/// Report and event log destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReportConfig {
    /// Path receiving the JSONL run event log, when set.
    pub events_path: Option<PathBuf>,
}

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HarnessConfig {
    /// Phase and recovery deadlines.
    pub timeouts: TimeoutConfig,
    /// Check selection narrowing.
    pub selection: SelectionConfig,
    /// Scenario selection and parameters.
    pub scenario: ScenarioConfig,
    /// Report destinations.
    pub report: ReportConfig,
}

impl HarnessConfig {
    /// Validates every range-bounded field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first field outside its
    /// allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        range_check(
            "timeouts.phase_ms",
            self.timeouts.phase_ms,
            MIN_PHASE_TIMEOUT_MS,
            MAX_PHASE_TIMEOUT_MS,
        )?;
        range_check(
            "timeouts.recovery_ms",
            self.timeouts.recovery_ms,
            MIN_RECOVERY_TIMEOUT_MS,
            MAX_RECOVERY_TIMEOUT_MS,
        )?;
        range_check(
            "timeouts.health_poll_interval_ms",
            self.timeouts.health_poll_interval_ms,
            MIN_HEALTH_POLL_INTERVAL_MS,
            MAX_HEALTH_POLL_INTERVAL_MS,
        )?;
        if self.scenario.extra_rounds > MAX_EXTRA_ROUNDS {
            return Err(ConfigError::OutOfRange {
                field: "scenario.extra_rounds",
                value: self.scenario.extra_rounds as u64,
                min: 0,
                max: MAX_EXTRA_ROUNDS as u64,
            });
        }
        if self.scenario.name.is_empty() {
            return Err(ConfigError::EmptyScenarioName);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {path}: {message}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Config file exceeds the size limit.
    #[error("config file {path} exceeds {MAX_CONFIG_FILE_SIZE} bytes")]
    TooLarge {
        /// Path that exceeded the limit.
        path: PathBuf,
    },
    /// Config file failed to parse.
    #[error("failed to parse config file {path}: {message}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Parser error message.
        message: String,
    },
    /// A numeric field is outside its allowed range.
    #[error("config field {field} = {value} outside allowed range {min}..={max}")]
    OutOfRange {
        /// Dotted field path.
        field: &'static str,
        /// Rejected value.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// Scenario name is empty.
    #[error("scenario name is empty")]
    EmptyScenarioName,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads harness configuration.
///
/// Resolution order: explicit `path` argument, then the `UPHEAVAL_CONFIG`
/// environment variable, then `upheaval.toml` in the working directory. A
/// missing file yields validated defaults; an unreadable, oversized, or
/// invalid file fails closed.
///
/// # Errors
///
/// Returns [`ConfigError`] when the resolved file exists but cannot be
/// loaded, parsed, or validated.
pub fn load_config(path: Option<&Path>) -> Result<HarnessConfig, ConfigError> {
    let resolved: PathBuf = path.map_or_else(
        || env::var(CONFIG_ENV_VAR).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from),
        Path::to_path_buf,
    );

    if !resolved.exists() {
        let config = HarnessConfig::default();
        config.validate()?;
        return Ok(config);
    }

    let raw = fs::read_to_string(&resolved).map_err(|err| ConfigError::Io {
        path: resolved.clone(),
        message: err.to_string(),
    })?;
    if raw.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge { path: resolved });
    }
    let config: HarnessConfig = toml::from_str(&raw).map_err(|err| ConfigError::Parse {
        path: resolved,
        message: err.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects values outside the inclusive range.
fn range_check(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
