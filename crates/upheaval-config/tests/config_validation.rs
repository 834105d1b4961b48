// crates/upheaval-config/tests/config_validation.rs
// ============================================================================
// Module: Configuration Validation Tests
// Description: Tests for fail-closed parsing and range validation.
// ============================================================================
//! ## Overview
//! Validates default resolution, TOML parsing, unknown-field rejection, and
//! range enforcement.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;

use upheaval_config::ConfigError;
use upheaval_config::HarnessConfig;
use upheaval_config::load_config;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a config file into a temp dir and loads it.
fn load_from(contents: &str) -> Result<HarnessConfig, ConfigError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upheaval.toml");
    fs::write(&path, contents).unwrap();
    load_config(Some(&path))
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Tests that a missing file yields validated defaults.
#[test]
fn missing_file_yields_defaults() {
    let config = load_config(Some(Path::new("/nonexistent/upheaval.toml"))).unwrap();
    assert_eq!(config, HarnessConfig::default());
    assert_eq!(config.scenario.name, "no-disruption");
    config.validate().unwrap();
}

/// Tests that an empty file is equivalent to defaults.
#[test]
fn empty_file_yields_defaults() {
    let config = load_from("").unwrap();
    assert_eq!(config, HarnessConfig::default());
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Tests that a well-formed file overrides defaults per section.
#[test]
fn sections_override_defaults() {
    let config = load_from(
        r#"
[timeouts]
phase_ms = 5000
recovery_ms = 30000

[selection]
checks = ["upsert-insert"]
tags = ["upsert"]

[scenario]
name = "rolling-upgrade"
target_version = "v99"
seed = 7

[report]
events_path = "events.jsonl"
"#,
    )
    .unwrap();

    assert_eq!(config.timeouts.phase_ms, 5_000);
    assert_eq!(config.timeouts.recovery_ms, 30_000);
    assert_eq!(config.selection.tags, vec!["upsert".to_string()]);
    assert_eq!(config.scenario.name, "rolling-upgrade");
    assert_eq!(config.scenario.target_version, "v99");
    assert_eq!(config.scenario.seed, 7);
    assert!(config.report.events_path.is_some());
}

/// Tests that unknown fields fail closed.
#[test]
fn unknown_fields_are_rejected() {
    let err = load_from("[timeouts]\nphase_msx = 5000\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

/// Tests that malformed TOML fails closed.
#[test]
fn malformed_toml_is_rejected() {
    let err = load_from("not toml at all [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

// ============================================================================
// SECTION: Range Validation
// ============================================================================

/// Tests that an out-of-range phase deadline is rejected.
#[test]
fn out_of_range_phase_timeout_is_rejected() {
    let err = load_from("[timeouts]\nphase_ms = 5\n").unwrap_err();
    assert!(
        matches!(err, ConfigError::OutOfRange { field, .. } if field == "timeouts.phase_ms")
    );
}

/// Tests that an absurd recovery budget is rejected.
#[test]
fn out_of_range_recovery_timeout_is_rejected() {
    let err = load_from("[timeouts]\nrecovery_ms = 999999999\n").unwrap_err();
    assert!(
        matches!(err, ConfigError::OutOfRange { field, .. } if field == "timeouts.recovery_ms")
    );
}

/// Tests that an empty scenario name is rejected.
#[test]
fn empty_scenario_name_is_rejected() {
    let err = load_from("[scenario]\nname = \"\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::EmptyScenarioName));
}

/// Tests that excessive extra rounds are rejected.
#[test]
fn excessive_extra_rounds_are_rejected() {
    let err = load_from("[scenario]\nextra_rounds = 1000\n").unwrap_err();
    assert!(
        matches!(err, ConfigError::OutOfRange { field, .. } if field == "scenario.extra_rounds")
    );
}
