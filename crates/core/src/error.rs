//! Base error types for themegate
//!
//! This module provides the foundation error types that all crates can use.

use thiserror::Error;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad or missing configuration (CLI arguments, message file, config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A task could not be spawned at all
    ///
    /// Distinct from a task that started and exited nonzero.
    #[error("Failed to launch {task}: {source}")]
    Launch {
        /// Task name for diagnostics ("dev server", "theme check")
        task: String,
        /// The underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
