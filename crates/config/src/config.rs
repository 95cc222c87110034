//! Configuration structures for themegate
//!
//! Every knob has a default equal to the stock hook behavior, so a repository
//! without a `themegate.toml` gets exactly the historical constants: dev server
//! watched on port 9292 for 30 seconds, output scanned every 200 ms, commits
//! bypassed with `--skip-theme-check` or `--no-verify`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use themegate_core::{Error, Result};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "themegate.toml";

/// Resolve the default config path relative to the working directory
#[must_use]
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Commands for the primary and secondary tasks
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Monitoring window, poll interval, and port
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Commit message gate (bypass flags and sentinel path)
    #[serde(default)]
    pub gate: GateConfig,

    /// Failure signatures scanned for in dev server output
    #[serde(default)]
    pub signatures: SignaturesConfig,
}

/// Commands for the two supervised tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandsConfig {
    /// Primary task: the long-lived dev server under observation
    #[serde(default = "default_dev_command")]
    pub dev: String,

    /// Secondary task: the finite static check run after a clean window
    #[serde(default = "default_check_command")]
    pub check: String,
}

/// Supervision timing and port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Port the dev server binds; reaped as a kill backstop
    #[serde(default = "default_port")]
    pub port: u16,

    /// Monitoring window in milliseconds; expiry without errors is a pass
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Poll interval for the output-scan backstop, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Grace period after an error-triggered kill, letting cleanup land
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

/// Commit message gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Literal substrings that bypass validation (case-sensitive)
    #[serde(default = "default_skip_flags")]
    pub skip_flags: Vec<String>,

    /// Sentinel file written when a bypass flag is found, read by the
    /// pre-commit stage
    #[serde(default = "default_marker_path")]
    pub marker_path: PathBuf,
}

/// Failure signature configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignaturesConfig {
    /// Regex fragments OR-ed into one case-insensitive pattern
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

fn default_dev_command() -> String {
    "npm run dev2".to_string()
}

fn default_check_command() -> String {
    "shopify theme check".to_string()
}

const fn default_port() -> u16 {
    9292
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_poll_interval_ms() -> u64 {
    200
}

const fn default_grace_ms() -> u64 {
    2_000
}

fn default_skip_flags() -> Vec<String> {
    vec!["--skip-theme-check".to_string(), "--no-verify".to_string()]
}

fn default_marker_path() -> PathBuf {
    PathBuf::from(".git/SKIP_THEME_CHECK")
}

fn default_patterns() -> Vec<String> {
    vec![
        "error".to_string(),
        "To run this command, log in to Shopify".to_string(),
        "EADDRINUSE".to_string(),
        "address already in use".to_string(),
    ]
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            dev: default_dev_command(),
            check: default_check_command(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            grace_ms: default_grace_ms(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            skip_flags: default_skip_flags(),
            marker_path: default_marker_path(),
        }
    }
}

impl Default for SignaturesConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the defaults. An unreadable or invalid file is a
    /// configuration error: a repository that ships a broken `themegate.toml`
    /// should not silently fall back to stock behavior.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {e}")))
    }
}
