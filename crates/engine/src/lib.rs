//! # Themegate Engine
//!
//! The two working components of the commit gate:
//!
//! - [`gate`] — the preflight gate that inspects the commit message for bypass
//!   flags and writes the skip sentinel for the pre-commit stage.
//! - [`supervise`] — the bounded supervision core: runs the dev server under a
//!   monitoring window, scans its merged output for failure signatures, and
//!   chains the theme check only when the window passes clean.
//!
//! Supporting modules: [`signatures`] (the failure pattern set) and [`process`]
//! (the platform capability interface for spawning and port reaping).

pub mod gate;
pub mod process;
pub mod signatures;
pub mod supervise;

pub use gate::PreflightGate;
pub use process::{ProcessControl, platform_control};
pub use signatures::SignatureSet;
pub use supervise::{Outcome, Supervisor, Verdict};
pub use themegate_core::{Error, Result};
