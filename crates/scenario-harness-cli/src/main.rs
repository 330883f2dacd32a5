// crates/scenario-harness-cli/src/main.rs
// ============================================================================
// Module: Scenario Harness CLI Entry Point
// Description: Command dispatcher for suite runs and scenario tooling.
// Purpose: Run, validate, and inspect scenario suites from the shell.
// Dependencies: clap, scenario-harness-config, scenario-harness-core, tokio
// ============================================================================

//! ## Overview
//! `scenario-harness` loads scenario files, runs them against the configured
//! agent runtime, and prints a suite report. Exit codes: `0` when every
//! scenario passed without blocking regressions, `1` for failures,
//! regressions, cancellations, or release failures, and `2` for
//! configuration or load errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use scenario_harness_cli::wiring::build_baseline_store;
use scenario_harness_cli::wiring::build_runner;
use scenario_harness_config::ConfigOverrides;
use scenario_harness_config::HarnessConfig;
use scenario_harness_core::Baseline;
use scenario_harness_core::BaselineMode;
use scenario_harness_core::Scenario;
use scenario_harness_core::ScenarioId;
use scenario_harness_core::runtime::EXIT_CONFIGURATION;
use scenario_harness_core::runtime::load_paths;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "scenario-harness", version, about = "Scenario execution and verification harness")]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scenario suites and report results.
    Run(RunCommand),
    /// Load and validate scenario files without running them.
    Validate(PathsCommand),
    /// List scenario ids, names, and categories.
    List(PathsCommand),
    /// Inspect stored baselines.
    Baseline {
        /// Selected baseline subcommand.
        #[command(subcommand)]
        command: BaselineCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Scenario files or glob patterns.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<String>,
    /// Config file path (defaults to `SCENARIO_HARNESS_CONFIG` or
    /// `./scenario-harness.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Suite timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,
    /// Maximum scenarios running at once.
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
    /// Baseline handling for this run.
    #[arg(long, value_enum, value_name = "MODE")]
    baseline_mode: Option<BaselineModeArg>,
    /// Report output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Only run scenarios in these categories.
    #[arg(long = "category", value_name = "NAME")]
    categories: Vec<String>,
}

/// Arguments for commands that only read scenario files.
#[derive(Args, Debug)]
struct PathsCommand {
    /// Scenario files or glob patterns.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<String>,
}

/// Baseline subcommands.
#[derive(Subcommand, Debug)]
enum BaselineCommand {
    /// Show the stored baseline for a scenario.
    Show {
        /// Scenario identifier.
        scenario_id: String,
        /// Config file path.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate {
        /// Config file path.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Report output formats.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Baseline modes accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BaselineModeArg {
    /// Compare and seed missing baselines.
    Compare,
    /// Compare, then overwrite baselines of passing scenarios.
    Promote,
    /// Do not read or write baselines.
    Skip,
}

impl From<BaselineModeArg> for BaselineMode {
    fn from(value: BaselineModeArg) -> Self {
        match value {
            BaselineModeArg::Compare => Self::Compare,
            BaselineModeArg::Promote => Self::Promote,
            BaselineModeArg::Skip => Self::Skip,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper; always reported with the configuration exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

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
    match cli.command {
        Commands::Run(command) => command_run(command).await,
        Commands::Validate(command) => command_validate(&command),
        Commands::List(command) => command_list(&command),
        Commands::Baseline {
            command:
                BaselineCommand::Show {
                    scenario_id,
                    config,
                    format,
                },
        } => command_baseline_show(&scenario_id, config, format),
        Commands::Config {
            command:
                ConfigCommand::Validate {
                    config,
                },
        } => command_config_validate(config),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the selected scenarios and prints the suite report.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let mut config = load_config(command.config.as_ref())?;
    config
        .apply_overrides(&ConfigOverrides {
            workers: command.workers,
            timeout_ms: command.timeout,
            baseline_mode: command.baseline_mode.map(BaselineMode::from),
        })
        .map_err(|err| CliError::new(err.to_string()))?;
    let scenarios = load_scenarios(&command.paths)?;
    let scenarios = filter_categories(scenarios, &command.categories);
    if scenarios.is_empty() {
        return Err(CliError::new(format!(
            "no scenarios match categories: {}",
            command.categories.join(", ")
        )));
    }
    let runner = build_runner(&config).map_err(|err| CliError::new(err.to_string()))?;
    let report = runner.run(scenarios).await;
    match command.format {
        OutputFormat::Text => write_stdout(&report.render_text())?,
        OutputFormat::Json => write_stdout_line(&to_json(&report)?)?,
    }
    Ok(exit_code(report.exit_code))
}

/// Loads scenario files and reports what was found.
fn command_validate(command: &PathsCommand) -> CliResult<ExitCode> {
    let scenarios = load_scenarios(&command.paths)?;
    for scenario in &scenarios {
        let hash = scenario.digest.as_ref().map_or("-", |digest| digest.short(12));
        write_stdout_line(&format!("ok {} {hash}", scenario.id))?;
    }
    write_stdout_line(&format!("validated {} scenarios", scenarios.len()))?;
    Ok(ExitCode::SUCCESS)
}

/// Lists scenario ids, names, and categories.
fn command_list(command: &PathsCommand) -> CliResult<ExitCode> {
    let scenarios = load_scenarios(&command.paths)?;
    for scenario in &scenarios {
        write_stdout_line(&format!("{}\t{}\t{}", scenario.id, scenario.name, scenario.category))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints the stored baseline for one scenario.
fn command_baseline_show(
    scenario_id: &str,
    config: Option<PathBuf>,
    format: OutputFormat,
) -> CliResult<ExitCode> {
    let config = load_config(config.as_ref())?;
    let store = build_baseline_store(&config.baseline.store)
        .map_err(|err| CliError::new(err.to_string()))?;
    let baseline =
        store.load(&ScenarioId::new(scenario_id)).map_err(|err| CliError::new(err.to_string()))?;
    let Some(baseline) = baseline else {
        write_stdout_line(&format!("no baseline stored for {scenario_id}"))?;
        return Ok(ExitCode::FAILURE);
    };
    match format {
        OutputFormat::Text => write_stdout(&render_baseline(&baseline))?,
        OutputFormat::Json => write_stdout_line(&to_json(&baseline)?)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Validates the configuration file.
fn command_config_validate(config: Option<PathBuf>) -> CliResult<ExitCode> {
    let config = load_config(config.as_ref())?;
    let source = config
        .source_path
        .as_ref()
        .map_or_else(|| "built-in defaults".to_string(), |path| path.display().to_string());
    write_stdout_line(&format!("config ok: {source}"))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads the harness configuration.
fn load_config(path: Option<&PathBuf>) -> CliResult<HarnessConfig> {
    HarnessConfig::load(path.map(PathBuf::as_path)).map_err(|err| CliError::new(err.to_string()))
}

/// Loads scenarios from paths or glob patterns.
fn load_scenarios(paths: &[String]) -> CliResult<Vec<Scenario>> {
    load_paths(paths).map_err(|err| CliError::new(err.to_string()))
}

/// Keeps scenarios whose category was requested; no request keeps all.
fn filter_categories(scenarios: Vec<Scenario>, categories: &[String]) -> Vec<Scenario> {
    if categories.is_empty() {
        return scenarios;
    }
    scenarios
        .into_iter()
        .filter(|scenario| categories.iter().any(|category| *category == scenario.category))
        .collect()
}

/// Renders a baseline as text.
fn render_baseline(baseline: &Baseline) -> String {
    let stored_at = baseline
        .stored_at
        .to_rfc3339()
        .unwrap_or_else(|| baseline.stored_at.as_unix_millis().to_string());
    let mut lines = vec![format!("baseline {}", baseline.scenario_id), format!("stored at: {stored_at}")];
    if let Some(run_id) = &baseline.run_id {
        lines.push(format!("run: {run_id}"));
    }
    if let Some(hash) = &baseline.scenario_hash {
        lines.push(format!("scenario hash: {hash}"));
    }
    lines.extend(baseline.stored_metrics.iter().map(|(name, value)| format!("  {name} = {value}")));
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Serializes a value as pretty JSON.
fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))
}

/// Converts a report exit code into a process exit code.
fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}

/// Writes text to stdout as-is.
fn write_stdout(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(message.as_bytes())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns the configuration exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    exit_code(EXIT_CONFIGURATION)
}

