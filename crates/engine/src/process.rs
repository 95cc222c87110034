//! Platform capability interface for process control
//!
//! The supervision core is platform-agnostic; the two things that differ per
//! OS live behind [`ProcessControl`]: how a configured command line becomes a
//! spawnable expression, and how "kill whatever holds the port" is carried
//! out. Unix resolves port ownership with `lsof`; Windows parses `netstat`
//! and drives `taskkill`.
//!
//! Port reaping is deliberately a second, independent cleanup action next to
//! killing the task handle: dev servers fork children the handle kill does
//! not reach.

use themegate_core::platform::CURRENT_PLATFORM;
use themegate_core::{Error, Result};

/// Capabilities that differ between process-termination models
pub trait ProcessControl: Send + Sync {
    /// Build a spawnable expression from a configured command line
    ///
    /// The command line is split with shell quoting rules; no shell is
    /// involved in the Unix spawn itself.
    fn command(&self, cmdline: &str) -> Result<duct::Expression>;

    /// Kill every process bound to the given listening port
    ///
    /// Best-effort by contract: callers log failures and move on.
    fn kill_by_port(&self, port: u16) -> Result<()>;
}

/// Select the control implementation for the current platform
#[must_use]
pub fn platform_control() -> Box<dyn ProcessControl> {
    if CURRENT_PLATFORM.is_windows() {
        Box::new(WindowsProcessControl)
    } else {
        Box::new(UnixProcessControl)
    }
}

fn split_cmdline(cmdline: &str) -> Result<Vec<String>> {
    let parts = shell_words::split(cmdline)
        .map_err(|e| Error::Config(format!("Failed to parse command '{cmdline}': {e}")))?;

    if parts.is_empty() {
        return Err(Error::Config("Empty command".to_string()));
    }

    Ok(parts)
}

/// Direct spawn; `lsof` port lookup
pub struct UnixProcessControl;

impl ProcessControl for UnixProcessControl {
    fn command(&self, cmdline: &str) -> Result<duct::Expression> {
        let parts = split_cmdline(cmdline)?;
        Ok(duct::cmd(&parts[0], &parts[1..]))
    }

    fn kill_by_port(&self, port: u16) -> Result<()> {
        tracing::debug!(port, "Reaping processes on port (lsof)");

        // lsof exits nonzero when the port is free; unchecked treats that as
        // "nothing to reap". kill with an empty pid list fails the same way.
        let script = format!("lsof -ti:{port} | xargs kill -9");
        duct::cmd("sh", ["-c", script.as_str()])
            .stdout_null()
            .stderr_null()
            .unchecked()
            .run()?;

        Ok(())
    }
}

/// `cmd.exe /c` wrapper; `netstat` port lookup plus `taskkill`
pub struct WindowsProcessControl;

impl ProcessControl for WindowsProcessControl {
    fn command(&self, cmdline: &str) -> Result<duct::Expression> {
        let parts = split_cmdline(cmdline)?;

        // npm and shopify are .cmd shims on Windows; they need the
        // command interpreter in front.
        let mut args = Vec::with_capacity(parts.len() + 1);
        args.push("/c".to_string());
        args.extend(parts);

        Ok(duct::cmd("cmd.exe", args))
    }

    fn kill_by_port(&self, port: u16) -> Result<()> {
        tracing::debug!(port, "Reaping processes on port (netstat)");

        let lookup = format!("netstat -ano | findstr :{port}");
        let listing = duct::cmd("cmd.exe", ["/c", lookup.as_str()])
            .stdout_capture()
            .stderr_null()
            .unchecked()
            .read()?;

        for pid in owning_pids(&listing) {
            let pid_arg = pid.to_string();
            let result = duct::cmd("taskkill", ["/F", "/PID", pid_arg.as_str()])
                .stdout_null()
                .stderr_null()
                .unchecked()
                .run();

            match result {
                Ok(_) => tracing::debug!(pid, "Killed process on port"),
                Err(e) => tracing::debug!(pid, "taskkill failed: {e}"),
            }
        }

        Ok(())
    }
}

/// Extract owning PIDs from `netstat -ano` lines (last column), deduplicated
fn owning_pids(netstat_output: &str) -> Vec<u32> {
    let mut pids = Vec::new();

    for line in netstat_output.lines() {
        if let Some(pid) = line
            .split_whitespace()
            .next_back()
            .and_then(|token| token.parse::<u32>().ok())
        {
            // PID 0 is the idle process; never a valid kill target
            if pid != 0 && !pids.contains(&pid) {
                pids.push(pid);
            }
        }
    }

    pids
}
