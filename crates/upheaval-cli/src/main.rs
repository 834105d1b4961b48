// crates/upheaval-cli/src/main.rs
// ============================================================================
// Module: Upheaval CLI Entry Point
// Description: Command dispatcher for listing, planning, and running checks.
// Purpose: Provide the operator surface for harness runs with stable exit
//          codes.
// Dependencies: clap, serde_json, thiserror, tokio, upheaval-checks,
//               upheaval-config, upheaval-core
// ============================================================================

//! ## Overview
//! The `upheaval` binary lists the builtin check and scenario catalogs,
//! expands scenario plans for inspection, and drives runs. Exit status is the
//! verdict surface: 0 when the run passed, 1 when any check failed, 2 on
//! aborts and configuration errors. The shipped driver is the in-memory
//! sandbox used for plan rehearsal; real deployments embed the library and
//! provide their own collaborators.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;
use upheaval_checks::builtin_registry;
use upheaval_config::HarnessConfig;
use upheaval_config::load_config;
use upheaval_core::BUILTIN_SCENARIO_NAMES;
use upheaval_core::CheckId;
use upheaval_core::EventSink;
use upheaval_core::Executor;
use upheaval_core::ExecutorConfig;
use upheaval_core::FailureCause;
use upheaval_core::JsonlEventSink;
use upheaval_core::NullEventSink;
use upheaval_core::RecordingOrchestrator;
use upheaval_core::RunId;
use upheaval_core::RunOutcome;
use upheaval_core::RunReport;
use upheaval_core::SandboxExecutor;
use upheaval_core::SandboxProbe;
use upheaval_core::ScenarioParams;
use upheaval_core::ScenarioSpec;
use upheaval_core::SelectionCriteria;
use upheaval_core::builtin_scenario;
use upheaval_core::now_unix_millis;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Perturbation-testing harness for streaming databases.
#[derive(Debug, Parser)]
#[command(name = "upheaval", version, about)]
struct Cli {
    /// Path to the harness configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Lists the builtin checks.
    ListChecks {
        /// Only list checks carrying this tag.
        #[arg(long)]
        tag: Option<String>,
    },
    /// Lists the builtin scenarios.
    ListScenarios,
    /// Expands and prints a scenario plan without running it.
    Plan {
        /// Builtin scenario name.
        #[arg(long)]
        scenario: String,
        /// Number of manipulate rounds to plan for.
        #[arg(long, default_value_t = 2)]
        rounds: usize,
        /// Seed for randomized placement policies.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Runs a scenario against the selected checks.
    Run {
        /// Builtin scenario name; overrides the configured scenario.
        #[arg(long)]
        scenario: Option<String>,
        /// Restrict the run to these checks (repeatable).
        #[arg(long = "check")]
        checks: Vec<String>,
        /// Restrict the run to checks carrying these tags (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Report format.
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// Path receiving the JSONL run event log.
        #[arg(long)]
        events: Option<PathBuf>,
        /// Collaborator driver for the run.
        #[arg(long, value_enum, default_value_t = DriverArg::Sandbox)]
        driver: DriverArg,
    },
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    /// Human-readable text summary.
    Text,
    /// Full report as JSON.
    Json,
}

/// Collaborator driver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverArg {
    /// In-memory sandbox collaborators (rehearsal mode).
    Sandbox,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a printable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Exit code for aborted runs and configuration errors.
const EXIT_ABORTED: u8 = 2;
/// Exit code for runs where at least one check failed.
const EXIT_CHECK_FAILED: u8 = 1;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("configuration error: {err}")))?;

    match cli.command {
        Commands::ListChecks { tag } => command_list_checks(tag.as_deref()),
        Commands::ListScenarios => command_list_scenarios(&config),
        Commands::Plan {
            scenario,
            rounds,
            seed,
        } => command_plan(&config, &scenario, rounds, seed),
        Commands::Run {
            scenario,
            checks,
            tags,
            format,
            events,
            driver,
        } => command_run(&config, scenario.as_deref(), checks, tags, format, events, driver).await,
    }
}

// ============================================================================
// SECTION: List Commands
// ============================================================================

/// Prints the builtin check catalog.
fn command_list_checks(tag: Option<&str>) -> CliResult<ExitCode> {
    let mut output = String::new();
    for check in upheaval_checks::builtin_checks() {
        let metadata = check.metadata();
        if let Some(wanted) = tag {
            if !metadata.tags.iter().any(|have| have == wanted) {
                continue;
            }
        }
        let steps = check.manipulate().len();
        output.push_str(&format!(
            "{} tags=[{}] steps={steps}\n",
            metadata.name,
            metadata.tags.join(","),
        ));
    }
    write_stdout(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the builtin scenario catalog.
fn command_list_scenarios(config: &HarnessConfig) -> CliResult<ExitCode> {
    let params = scenario_params(config);
    let mut output = String::new();
    for name in BUILTIN_SCENARIO_NAMES {
        if let Some(scenario) = builtin_scenario(name, &params) {
            let actions: Vec<&str> =
                scenario.disruptions.iter().map(|d| d.action.as_str()).collect();
            output.push_str(&format!(
                "{name} disruptions=[{}] tags=[{}]\n",
                actions.join(","),
                scenario.tags.join(","),
            ));
        }
    }
    write_stdout(&output)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Plan Command
// ============================================================================

/// Expands and prints a scenario plan.
fn command_plan(
    config: &HarnessConfig,
    scenario_name: &str,
    rounds: usize,
    seed: Option<u64>,
) -> CliResult<ExitCode> {
    let mut params = scenario_params(config);
    if let Some(seed) = seed {
        params.seed = seed;
    }
    let scenario = resolve_scenario(scenario_name, &params)?;
    let plan = scenario.plan(rounds);
    let rendered = serde_json::to_string_pretty(&plan)
        .map_err(|err| CliError::new(format!("failed to render plan: {err}")))?;
    write_stdout(&format!("{rendered}\n"))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes a run and prints its report.
async fn command_run(
    config: &HarnessConfig,
    scenario_name: Option<&str>,
    checks: Vec<String>,
    tags: Vec<String>,
    format: ReportFormat,
    events: Option<PathBuf>,
    driver: DriverArg,
) -> CliResult<ExitCode> {
    let params = scenario_params(config);
    let name = scenario_name.unwrap_or(&config.scenario.name);
    let mut scenario = resolve_scenario(name, &params)?;
    for disruption in &mut scenario.disruptions {
        disruption.recovery_timeout_ms = config.timeouts.recovery_ms;
    }

    let criteria = selection_criteria(config, checks, tags);
    let registry = builtin_registry()
        .map_err(|err| CliError::new(format!("builtin catalog error: {err}")))?;
    let selection = registry.select(&criteria, &scenario);

    let executor_config = ExecutorConfig {
        phase_timeout_ms: config.timeouts.phase_ms,
        health_poll_interval_ms: config.timeouts.health_poll_interval_ms,
        settle_timeout_ms: config.timeouts.recovery_ms,
        extra_rounds: config.scenario.extra_rounds,
        ..ExecutorConfig::default()
    };

    let sink: Arc<dyn EventSink> = match events.or_else(|| config.report.events_path.clone()) {
        Some(path) => Arc::new(
            JsonlEventSink::open(&path)
                .map_err(|err| CliError::new(format!("failed to open event log: {err}")))?,
        ),
        None => Arc::new(NullEventSink),
    };

    let report = match driver {
        DriverArg::Sandbox => {
            let executor = Executor::new(
                scenario,
                SandboxExecutor::passing(),
                SandboxProbe::healthy(),
                RecordingOrchestrator::new(),
                executor_config,
            )
            .map_err(|err| CliError::new(format!("executor setup error: {err}")))?
            .with_sink(sink);
            executor
                .run(fresh_run_id(), selection)
                .await
                .map_err(|err| CliError::new(format!("run error: {err}")))?
        }
    };

    match format {
        ReportFormat::Text => write_stdout(&render_report_text(&report))?,
        ReportFormat::Json => {
            let rendered = serde_json::to_string_pretty(&report)
                .map_err(|err| CliError::new(format!("failed to render report: {err}")))?;
            write_stdout(&format!("{rendered}\n"))?;
        }
    }
    Ok(exit_code_for(report.outcome))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds scenario parameters from the configuration.
fn scenario_params(config: &HarnessConfig) -> ScenarioParams {
    ScenarioParams {
        target_version: config.scenario.target_version.clone(),
        promote_replica: config.scenario.promote_replica.clone(),
        seed: config.scenario.seed,
    }
}

/// Resolves a builtin scenario by name.
fn resolve_scenario(name: &str, params: &ScenarioParams) -> CliResult<ScenarioSpec> {
    builtin_scenario(name, params).ok_or_else(|| {
        CliError::new(format!(
            "unknown scenario {name}; builtin scenarios: {}",
            BUILTIN_SCENARIO_NAMES.join(", ")
        ))
    })
}

/// Merges configured and flag-supplied selection narrowing.
fn selection_criteria(
    config: &HarnessConfig,
    checks: Vec<String>,
    tags: Vec<String>,
) -> SelectionCriteria {
    let names: Vec<CheckId> = if checks.is_empty() {
        config.selection.checks.clone()
    } else {
        checks.into_iter().map(CheckId::new).collect()
    };
    let tags = if tags.is_empty() { config.selection.tags.clone() } else { tags };
    SelectionCriteria { names, tags }
}

/// Allocates a run identifier from the current wall-clock time.
fn fresh_run_id() -> RunId {
    let millis = now_unix_millis().as_unix_millis().unwrap_or(0);
    RunId::new(format!("run-{millis}"))
}

/// Maps a run outcome to the process exit code.
fn exit_code_for(outcome: RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Passed => ExitCode::SUCCESS,
        RunOutcome::Failed => ExitCode::from(EXIT_CHECK_FAILED),
        RunOutcome::Aborted => ExitCode::from(EXIT_ABORTED),
    }
}

/// Renders the human-readable report summary.
fn render_report_text(report: &RunReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "run {} scenario {}: {}\n",
        report.run_id,
        report.scenario_id,
        outcome_label(report.outcome),
    ));
    output.push_str(&format!("plan {}\n", report.plan_hash.value));
    if let Some(abort) = &report.abort {
        output.push_str(&format!("abort: {}\n", abort_label(abort)));
    }
    for check in &report.checks {
        output.push_str(&format!("  {:<24} {}\n", check.check_id.as_str(), check.outcome.as_str()));
        if let Some(failure) = &check.failure {
            output.push_str(&format!(
                "    {} failed: {}\n",
                failure.phase.as_str(),
                failure_label(&failure.cause),
            ));
        }
    }
    output
}

/// Returns a stable label for the scenario-level outcome.
const fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Passed => "PASSED",
        RunOutcome::Failed => "FAILED",
        RunOutcome::Aborted => "ABORTED",
    }
}

/// Renders an abort cause for the text report.
fn abort_label(abort: &upheaval_core::AbortCause) -> String {
    match abort {
        upheaval_core::AbortCause::DisruptionPrecondition {
            disruption_id,
            reason,
        } => format!("disruption {disruption_id} precondition failed: {reason}"),
        upheaval_core::AbortCause::DisruptionRecoveryTimeout {
            disruption_id,
            timeout_ms,
        } => format!("disruption {disruption_id} recovery timed out after {timeout_ms}ms"),
        upheaval_core::AbortCause::Orchestration {
            disruption_id,
            message,
        } => format!("disruption {disruption_id} orchestration failed: {message}"),
        upheaval_core::AbortCause::UnhealthyBeforeValidate {
            timeout_ms,
        } => format!("health not confirmed before validate within {timeout_ms}ms"),
    }
}

/// Renders a failure cause for the text report.
fn failure_label(cause: &FailureCause) -> String {
    match cause {
        FailureCause::Script { captured } => format!("captured output: {captured}"),
        FailureCause::Transport { message } => format!("executor error: {message}"),
        FailureCause::Timeout { budget_ms } => format!("deadline exceeded ({budget_ms}ms)"),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a message to stdout.
fn write_stdout(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(message.as_bytes())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a message to stderr and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::from(EXIT_ABORTED)
}
