//! CLI entry point for gh_distribute_secrets.
//!
//! Reads the secret distribution config, resolves every vault reference with
//! the 1Password CLI and sets the secrets on each repository with the GitHub
//! CLI (or only checks the repositories in dry-run mode).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gh_distribute_secrets::{
    config::{Configuration, DEFAULT_CONFIG_PATH},
    distribute::Distributor,
    output::{ReferenceDisplay, log_summary, print_json, render_dump},
    repo::select_writer,
    runner::ProcessRunner,
    vault::OnePasswordReader,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Exit code for a run where at least one secret was not applied.
const PARTIAL_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "gh_distribute_secrets")]
#[command(about = "Distribute 1Password secrets to GitHub repositories", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Secret distribution config (YAML, or JSON with a .json extension)
    #[arg(short, long, env = "GH_DISTRIBUTE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Only check that every repository is reachable, do not set secrets
    #[arg(long, env = "GH_DISTRIBUTE_DRY_RUN")]
    dry_run: bool,

    /// Print the merged configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Show vault references unmasked in the dump
    #[arg(long, requires = "dump_config")]
    show_references: bool,

    /// Owner prepended to repository names that have none (e.g. "octo")
    #[arg(long, env = "GH_DISTRIBUTE_OWNER")]
    owner: Option<String>,

    /// Number of repositories processed at the same time
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: u16,

    /// Timeout in seconds for every op/gh invocation
    #[arg(
        long,
        default_value_t = ProcessRunner::DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    /// 1Password CLI executable
    #[arg(long, env = "OP_BIN", default_value = "op")]
    op_bin: String,

    /// GitHub CLI executable
    #[arg(long, env = "GH_BIN", default_value = "gh")]
    gh_bin: String,

    /// Log the run outcome as JSON when finished
    #[arg(long)]
    json_summary: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gh_distribute_secrets.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gh_distribute_secrets.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info")?);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug")?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let configuration = Configuration::load(&cli.config)
        .with_context(|| format!("cannot start without a configuration ({})", cli.config.display()))?;
    info!(
        config = %cli.config.display(),
        repositories = configuration.repositories().len(),
        references = configuration.distinct_references(),
        "Configuration loaded"
    );

    if cli.dump_config {
        let display = if cli.show_references {
            ReferenceDisplay::Show
        } else {
            ReferenceDisplay::Masked
        };
        print!("{}", render_dump(&configuration, display)?);
        return Ok(ExitCode::SUCCESS);
    }
    debug!(
        "Merged configuration:\n{}",
        render_dump(&configuration, ReferenceDisplay::Masked)?
    );

    if cli.dry_run {
        warn!("RUNNING IN DRY-RUN MODE - Will not change anything!");
    }

    let runner = ProcessRunner::new(Duration::from_secs(cli.timeout));
    let reader = Arc::new(OnePasswordReader::new(runner.clone(), cli.op_bin));
    let writer = select_writer(cli.dry_run, runner, cli.gh_bin, cli.owner);

    let distributor =
        Distributor::new(reader, writer).with_concurrency(usize::from(cli.concurrency));
    let outcome = distributor.run(&configuration).await;

    log_summary(&outcome);
    if cli.json_summary {
        print_json(&outcome)?;
    }

    if outcome.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("Not all configuration was applied successfully!");
        Ok(ExitCode::from(PARTIAL_FAILURE))
    }
}

/// Builds a filter from `var` on top of the baseline `default` directive.
fn env_filter(var: &str, default: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_env(var).add_directive(default.parse()?))
}
