//! Argument parsing and command dispatch for the Jettison CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, TelemetryEmitter, parse_url};
use crate::commands;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parses CLI arguments, executes the requested command, and handles
/// user-facing telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    init_logging();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let telemetry = TelemetryEmitter::from_env();

    let result = dispatch(cli).await;

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                command_name,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = AppContext::from_cli(&cli)?;
    match cli.command {
        Command::Scan(args) => commands::scan::handle_scan(&ctx, args, cli.output).await,
        Command::Analyze(args) => commands::analyze::handle_analyze(&ctx, args, cli.output).await,
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "jettison",
    about = "Client for the Jettison Dockerfile optimization service"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "JETTISON_ENDPOINT",
        value_parser = parse_url,
        default_value = DEFAULT_ENDPOINT
    )]
    pub(crate) endpoint: Url,
    #[arg(
        long,
        global = true,
        env = "JETTISON_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scan a repository for optimization targets, optimize them, and
    /// optionally publish the results as a pull request.
    Scan(ScanArgs),
    /// Optimize a local Dockerfile without a repository session.
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
pub(crate) struct ScanArgs {
    /// Repository source, e.g. github.com/owner/repo.
    pub(crate) source: String,
    /// Optimize one specific target path inside the repository.
    #[arg(long)]
    pub(crate) path: Option<String>,
    /// Optimize every discovered target.
    #[arg(long, conflicts_with = "path")]
    pub(crate) all: bool,
    /// Publish the optimized target(s) back as a pull request.
    #[arg(long)]
    pub(crate) push: bool,
}

#[derive(Args)]
pub(crate) struct AnalyzeArgs {
    /// Dockerfile to optimize; reads stdin when omitted.
    pub(crate) file: Option<PathBuf>,
}

/// Output format for commands that render structured data.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Scan(_) => "scan",
        Command::Analyze(_) => "analyze",
    }
}
