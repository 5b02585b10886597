// crates/dataprep-cli/src/main.rs
// ============================================================================
// Module: Dataprep CLI Entry Point
// Description: Command dispatcher for analysis workers and dataset admin.
// Purpose: Run workers, enqueue requests, and inspect stored metadata.
// Dependencies: clap, dataprep-cli, dataprep-config, dataprep-core, tokio
// ============================================================================

//! ## Overview
//! `dataprep-analysis` runs the schema and quality workers against the
//! configured `SQLite` database, either as a long-lived consumer pool that
//! stops on Ctrl-C or as a one-shot drain. Administrative subcommands register
//! datasets, publish analysis requests, and print stored metadata. Blocking
//! work runs on the tokio blocking pool so the signal listener stays live.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use dataprep_cli::AnalysisRuntime;
use dataprep_cli::StageSelection;
use dataprep_cli::wiring::open_channel;
use dataprep_cli::wiring::open_store;
use dataprep_config::DataprepConfig;
use dataprep_config::config_toml_example;
use dataprep_core::AnalysisRequest;
use dataprep_core::DatasetId;
use dataprep_core::DatasetMetadata;
use dataprep_core::Destination;
use dataprep_core::MessageChannel;
use dataprep_core::MetadataStore;
use dataprep_core::Timestamp;
use dataprep_store_sqlite::SqliteMetadataStore;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default message cap for `worker --once`.
const DEFAULT_DRAIN_LIMIT: usize = 10_000;
/// Maximum dataset identifier length accepted from the command line.
const MAX_DATASET_ID_LENGTH: usize = 255;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "dataprep-analysis", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run analysis workers.
    Worker(WorkerCommand),
    /// Publish an analysis request for a dataset.
    Enqueue(EnqueueCommand),
    /// Dataset metadata utilities.
    Dataset {
        /// Selected dataset subcommand.
        #[command(subcommand)]
        command: DatasetCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Shared config file selection.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Optional config file path (defaults to dataprep-analysis.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `worker` command.
#[derive(Args, Debug)]
struct WorkerCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Stages to consume.
    #[arg(long, value_enum, default_value_t = StageArg::All)]
    stage: StageArg,
    /// Handle visible messages on the current thread and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    once: bool,
    /// Maximum messages handled by `--once`.
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_DRAIN_LIMIT)]
    limit: usize,
}

/// Arguments for the `enqueue` command.
#[derive(Args, Debug)]
struct EnqueueCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Dataset identifier.
    #[arg(long, value_name = "ID")]
    dataset: String,
    /// Destination queue.
    #[arg(long, value_enum, default_value_t = DestinationArg::Schema)]
    stage: DestinationArg,
}

/// Dataset subcommands.
#[derive(Subcommand, Debug)]
enum DatasetCommand {
    /// Register a dataset record with no completed stages.
    Register(DatasetRegisterCommand),
    /// Print stored metadata as JSON.
    Show(DatasetIdCommand),
    /// Remove a dataset record and its history.
    Remove(DatasetIdCommand),
    /// List stored dataset identifiers.
    List(ConfigArgs),
}

/// Arguments for `dataset register`.
#[derive(Args, Debug)]
struct DatasetRegisterCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Dataset identifier; also the content key.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Display name (defaults to the identifier).
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
    /// Field delimiter of the raw content.
    #[arg(long, value_name = "CHAR")]
    delimiter: Option<char>,
    /// Publish a schema analysis request after registering.
    #[arg(long, action = ArgAction::SetTrue)]
    enqueue: bool,
}

/// Arguments for dataset commands addressing one record.
#[derive(Args, Debug)]
struct DatasetIdCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Dataset identifier.
    #[arg(long, value_name = "ID")]
    id: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigArgs),
    /// Print a canonical example config.
    Example,
}

/// Stage selection for `worker`.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum StageArg {
    /// Schema inference only.
    Schema,
    /// Quality analysis only.
    Quality,
    /// Both stages.
    All,
}

impl From<StageArg> for StageSelection {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::Schema => Self::Schema,
            StageArg::Quality => Self::Quality,
            StageArg::All => Self::All,
        }
    }
}

/// Destination selection for `enqueue`.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum DestinationArg {
    /// `SCHEMA_ANALYSIS` queue.
    Schema,
    /// `QUALITY_ANALYSIS` queue.
    Quality,
}

impl From<DestinationArg> for Destination {
    fn from(value: DestinationArg) -> Self {
        match value {
            DestinationArg::Schema => Self::SchemaAnalysis,
            DestinationArg::Quality => Self::QualityAnalysis,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
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
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("dataprep-analysis {version}"))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    match command {
        Commands::Worker(command) => command_worker(command).await,
        Commands::Enqueue(command) => command_enqueue(&command),
        Commands::Dataset {
            command,
        } => command_dataset(command),
        Commands::Config {
            command,
        } => command_config(&command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("")
}

// ============================================================================
// SECTION: Worker Command
// ============================================================================

/// Executes the `worker` command.
async fn command_worker(command: WorkerCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let stages = StageSelection::from(command.stage);
    let runtime = tokio::task::spawn_blocking(move || AnalysisRuntime::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("worker init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("worker init failed: {err}")))?;

    if command.once {
        let limit = command.limit;
        let handled = tokio::task::spawn_blocking(move || runtime.drain(stages, limit))
            .await
            .map_err(|err| CliError::new(format!("worker join failed: {err}")))?;
        write_stdout_line(&format!("handled {handled} messages"))?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut pool = runtime.start(stages).map_err(|err| CliError::new(format!("worker start failed: {err}")))?;
    let signal = tokio::signal::ctrl_c().await;
    let panicked = tokio::task::spawn_blocking(move || pool.shutdown())
        .await
        .map_err(|err| CliError::new(format!("worker shutdown join failed: {err}")))?;
    signal.map_err(|err| CliError::new(format!("signal listener failed: {err}")))?;
    if panicked > 0 {
        return Err(CliError::new(format!("{panicked} worker threads panicked")));
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Enqueue Command
// ============================================================================

/// Executes the `enqueue` command.
fn command_enqueue(command: &EnqueueCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let id = parse_dataset_id(&command.dataset)?;
    let store = open_admin_store(&config)?;
    let destination = Destination::from(command.stage);
    publish(&store, &config, destination, &id)?;
    write_stdout_line(&format!("enqueued {} for {}", destination.as_str(), id.as_str()))?;
    Ok(ExitCode::SUCCESS)
}

/// Publishes one analysis request on the configured channel.
fn publish(
    store: &SqliteMetadataStore,
    config: &DataprepConfig,
    destination: Destination,
    id: &DatasetId,
) -> CliResult<()> {
    open_channel(store, &config.channel)
        .publish(&AnalysisRequest::for_dataset(destination, id))
        .map(|_| ())
        .map_err(|err| CliError::new(format!("publish failed: {err}")))
}

// ============================================================================
// SECTION: Dataset Commands
// ============================================================================

/// Dispatches dataset subcommands.
fn command_dataset(command: DatasetCommand) -> CliResult<ExitCode> {
    match command {
        DatasetCommand::Register(command) => command_dataset_register(&command),
        DatasetCommand::Show(command) => command_dataset_show(&command),
        DatasetCommand::Remove(command) => command_dataset_remove(&command),
        DatasetCommand::List(command) => command_dataset_list(&command),
    }
}

/// Executes `dataset register`.
fn command_dataset_register(command: &DatasetRegisterCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let id = parse_dataset_id(&command.id)?;
    let store = open_admin_store(&config)?;
    if store.get(&id).map_err(|err| CliError::new(format!("store read failed: {err}")))?.is_some() {
        return Err(CliError::new(format!("dataset already registered: {}", id.as_str())));
    }
    let name = command.name.clone().unwrap_or_else(|| id.as_str().to_string());
    let mut metadata = DatasetMetadata::new(id.clone(), name, Timestamp::now());
    if let Some(delimiter) = command.delimiter {
        metadata.delimiter = delimiter;
    }
    store.add(&metadata).map_err(|err| CliError::new(format!("store write failed: {err}")))?;
    write_stdout_line(&format!("registered {}", id.as_str()))?;
    if command.enqueue {
        publish(&store, &config, Destination::SchemaAnalysis, &id)?;
        write_stdout_line(&format!("enqueued {} for {}", Destination::SchemaAnalysis.as_str(), id.as_str()))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `dataset show`.
fn command_dataset_show(command: &DatasetIdCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let id = parse_dataset_id(&command.id)?;
    let store = open_admin_store(&config)?;
    let Some(metadata) = store.get(&id).map_err(|err| CliError::new(format!("store read failed: {err}")))? else {
        return Err(CliError::new(format!("dataset not found: {}", id.as_str())));
    };
    let text = serde_json::to_string_pretty(&metadata)
        .map_err(|err| CliError::new(format!("metadata serialization failed: {err}")))?;
    write_stdout_line(&text)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `dataset remove`.
fn command_dataset_remove(command: &DatasetIdCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let id = parse_dataset_id(&command.id)?;
    let store = open_admin_store(&config)?;
    let removed = store.remove(&id).map_err(|err| CliError::new(format!("store delete failed: {err}")))?;
    if !removed {
        return Err(CliError::new(format!("dataset not found: {}", id.as_str())));
    }
    write_stdout_line(&format!("removed {}", id.as_str()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `dataset list`.
fn command_dataset_list(command: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(command)?;
    let store = open_admin_store(&config)?;
    let ids = store.list().map_err(|err| CliError::new(format!("store read failed: {err}")))?;
    for id in ids {
        write_stdout_line(id.as_str())?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => {
            let config = load_config(args)?;
            let source = config.source_path.as_ref().map_or_else(String::new, |path| path.display().to_string());
            write_stdout_line(&format!("config ok: {source}"))?;
        }
        ConfigCommand::Example => write_stdout_line(config_toml_example().trim_end())?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<DataprepConfig> {
    DataprepConfig::load(args.config.as_deref()).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Opens the metadata store for administrative commands.
fn open_admin_store(config: &DataprepConfig) -> CliResult<SqliteMetadataStore> {
    open_store(&config.store).map_err(|err| CliError::new(err.to_string()))
}

/// Validates a dataset identifier supplied on the command line.
fn parse_dataset_id(raw: &str) -> CliResult<DatasetId> {
    let id = DatasetId::new(raw);
    if id.is_blank() {
        return Err(CliError::new("dataset id must be non-empty".to_string()));
    }
    if raw.len() > MAX_DATASET_ID_LENGTH {
        return Err(CliError::new(format!("dataset id exceeds {MAX_DATASET_ID_LENGTH} bytes")));
    }
    if raw.chars().any(char::is_control) {
        return Err(CliError::new("dataset id must not contain control characters".to_string()));
    }
    Ok(id)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
