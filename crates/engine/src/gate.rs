//! Preflight gate over the commit message
//!
//! Decides whether supervision runs at all. A commit message carrying one of
//! the bypass flags short-circuits the whole validation; the decision is
//! signalled to the later pre-commit stage through a sentinel file, since that
//! stage never sees the commit message itself.

use std::fs;
use std::path::Path;
use themegate_config::GateConfig;
use themegate_core::{Error, Result};

/// Content written into the skip sentinel
///
/// The pre-commit stage only checks for existence; any non-empty value works.
pub const MARKER_CONTENT: &str = "skip";

/// Inspects the commit message and manages the skip sentinel
pub struct PreflightGate<'a> {
    config: &'a GateConfig,
}

impl<'a> PreflightGate<'a> {
    pub fn new(config: &'a GateConfig) -> Self {
        Self { config }
    }

    /// Read the commit message file
    ///
    /// A missing or unreadable file is a configuration error, not a validation
    /// failure: the hook was invoked wrong, so nothing is validated.
    pub fn read_message(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Commit message file not found: {}",
                path.display()
            )));
        }

        fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read commit message file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Check the message for a bypass flag (case-sensitive literal match)
    ///
    /// Returns the first matching flag for logging.
    #[must_use]
    pub fn skip_flag(&self, message: &str) -> Option<&'a str> {
        self.config
            .skip_flags
            .iter()
            .find(|flag| message.contains(flag.as_str()))
            .map(String::as_str)
    }

    /// Write the skip sentinel for the pre-commit stage
    ///
    /// Only called on the bypass path. One writer per commit attempt, so this
    /// is a plain overwrite, not a lock.
    pub fn write_marker(&self) -> Result<()> {
        let path = &self.config.marker_path;
        fs::write(path, MARKER_CONTENT).map_err(|e| {
            Error::Config(format!(
                "Failed to write skip marker {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %path.display(), "Skip marker written");
        Ok(())
    }
}
