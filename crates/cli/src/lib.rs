//! Themegate CLI library
//!
//! This library contains all the CLI logic for themegate, making it reusable
//! for testing and integration with other tools.

pub mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use themegate_config::{Config, logging};
use themegate_engine::supervise::{Supervisor, Verdict};
use themegate_engine::PreflightGate;

/// Themegate - gate commits on theme dev server health
#[derive(Parser)]
#[command(name = "themegate")]
#[command(about = "Commit-msg hook that gates commits on theme validation")]
#[command(version)]
#[command(long_about = "Commit-msg hook that gates commits on theme validation

Starts the theme dev server, watches its output for failure signatures
during a bounded monitoring window, and runs the theme check when the
window passes clean. The commit proceeds only when everything passes.

Bypass with --skip-theme-check or --no-verify in the commit message.")]
pub struct Cli {
    /// Path to the commit message file (passed by git to the commit-msg hook)
    #[arg(value_name = "COMMIT_MSG_FILE")]
    pub message_file: PathBuf,

    /// Path to the config file (default: ./themegate.toml)
    #[arg(long, env = "THEMEGATE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to a file (useful for debugging)
    #[arg(long, env = "THEMEGATE_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Main entry point for the CLI logic
///
/// # Errors
///
/// Returns an error if:
/// - Logging initialization fails
/// - Configuration loading fails
/// - The commit message file is missing or unreadable
/// - Either supervised task fails to launch
pub fn run(cli: Cli) -> Result<Verdict> {
    // Initialize logging based on verbosity
    logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config_path = cli
        .config
        .unwrap_or_else(themegate_config::default_config_path);
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let gate = PreflightGate::new(&config.gate);
    let message = gate.read_message(&cli.message_file)?;

    report::print_commit_message(&message);

    // Bypass path: write the sentinel for the pre-commit stage and allow
    if let Some(flag) = gate.skip_flag(&message) {
        tracing::info!(flag, "Skip flag found in commit message");
        report::print_skip_notice(flag);
        gate.write_marker().context("Failed to write skip marker")?;
        return Ok(Verdict::Allowed);
    }

    report::print_validation_start(&config);

    let supervisor = Supervisor::new(&config)?;
    let outcome = supervisor.run()?;

    report::print_outcome(&outcome, &config);
    Ok(outcome.verdict)
}
