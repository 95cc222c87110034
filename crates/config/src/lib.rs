//! Configuration management for themegate
//!
//! Loads the optional `themegate.toml` and provides the defaults that match
//! the stock hook behavior (port 9292, 30 second monitoring window, the two
//! bypass flags). Also owns logging initialization.

pub mod config;
pub mod logging;

pub use config::{
    CommandsConfig, Config, GateConfig, MonitorConfig, SignaturesConfig, default_config_path,
};
pub use themegate_core::{Error, Result};
