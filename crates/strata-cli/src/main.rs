// crates/strata-cli/src/main.rs
// ============================================================================
// Module: Strata CLI Entry Point
// Description: Command dispatcher for running jobs and reading stores.
// Purpose: Drive a job from a TOML file and list or inspect store objects.
// Dependencies: clap, serde, serde_json, strata-cli, strata-config
// ============================================================================

//! ## Overview
//! `strata run` loads a job file, installs logging at the job's level (or
//! `--log-level`, with `RUST_LOG` taking precedence), and runs the job.
//! `strata list` and `strata inspect` read a store's catalog. Every command
//! prints text by default or JSON with `--format json`. A job that aborts
//! still prints its report and exits with a failure code.

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
use serde::Serialize;
use strata_cli::CliError;
use strata_cli::LogCapture;
use strata_cli::commands;
use strata_cli::error::CliResult;
use strata_cli::logging;
use strata_config::JobConfig;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Block-parallel batch jobs over an object store")]
struct Cli {
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a job described by a TOML file.
    Run(RunCommand),
    /// List store objects by name prefix and suffix.
    List(ListCommand),
    /// Describe one store object.
    Inspect(InspectCommand),
}

/// Output format.
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Store location shared by catalog commands.
#[derive(Args, Debug)]
struct StoreArgs {
    /// Directory holding the store.
    #[arg(long, value_name = "DIR")]
    store_path: PathBuf,
    /// Store name.
    #[arg(long, default_value = "strata")]
    store_name: String,
    /// Store uuid.
    #[arg(long, value_name = "UUID")]
    store_id: String,
}

/// `strata run`
#[derive(Args, Debug)]
struct RunCommand {
    /// Job file; defaults to `STRATA_CONFIG` or `strata.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Store the job's log output as a log object.
    #[arg(long)]
    persist_log: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

/// `strata list`
#[derive(Args, Debug)]
struct ListCommand {
    /// Store location.
    #[command(flatten)]
    store: StoreArgs,
    /// Object name prefix, such as a dataset uuid.
    #[arg(long, default_value = "")]
    prefix: String,
    /// Object name suffix, such as `arrow` or `log`.
    #[arg(long, default_value = "")]
    suffix: String,
    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

/// `strata inspect`
#[derive(Args, Debug)]
struct InspectCommand {
    /// Store location.
    #[command(flatten)]
    store: StoreArgs,
    /// Object uuid.
    id: String,
    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(&command, cli.log_level.as_deref()),
        Commands::List(command) => {
            logging::init(cli.log_level.as_deref().unwrap_or("warn"), None)?;
            let list = commands::list_objects(
                &command.store.store_path,
                &command.store.store_name,
                &command.store.store_id,
                &command.prefix,
                &command.suffix,
            )?;
            emit(&list, command.format, &list.render_text())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Inspect(command) => {
            logging::init(cli.log_level.as_deref().unwrap_or("warn"), None)?;
            let report = commands::inspect_object(
                &command.store.store_path,
                &command.store.store_name,
                &command.store.store_id,
                &command.id,
            )?;
            emit(&report, command.format, &report.render_text())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes `strata run`.
fn command_run(command: &RunCommand, log_level: Option<&str>) -> CliResult<ExitCode> {
    let config = JobConfig::load(command.config.as_deref())?;
    let capture = command.persist_log.then(LogCapture::new);
    logging::init(log_level.unwrap_or(&config.job.loglevel), capture.clone())?;
    let report = commands::run_job(&config, capture.as_ref())?;
    emit(&report, command.format, &report.render_text())?;
    Ok(if report.succeeded() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Prints `value` as JSON or `text`.
fn emit<T: Serialize>(value: &T, format: OutputFormat, text: &str) -> CliResult<()> {
    let rendered = match format {
        OutputFormat::Text => text.to_string(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.to_string()))?;
            json.push('\n');
            json
        }
    };
    let mut stdout = std::io::stdout();
    stdout.write_all(rendered.as_bytes()).map_err(|err| CliError::Output(err.to_string()))
}

/// Writes `message` to stderr and returns a failure code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "strata: {message}");
    ExitCode::FAILURE
}
