//! Bounded supervision of the dev server startup and the chained theme check
//!
//! The primary task (dev server) is observed through one merged output stream
//! for at most the configured window. A reader thread drains the stream and
//! forwards chunks over a channel; the supervising thread waits on that
//! channel with the poll interval as its timeout, so the event-driven scan,
//! the poll backstop, and the deadline check all funnel through a single
//! loop. Terminal transitions go through one site on [`SupervisedTask`],
//! which is what makes error detection single-fire: once the task has left
//! `Running`, a late poll or a duplicate signature match cannot re-trigger
//! kill logic.
//!
//! Timeout expiry is a pass, not a failure: a dev server that survived the
//! whole window without emitting a failure signature is considered healthy,
//! killed, and followed by the theme check.

use std::io::Read;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use duct::ReaderHandle;
use themegate_config::Config;
use themegate_core::{Error, Result};

use crate::process::{self, ProcessControl};
use crate::signatures::SignatureSet;

/// Final decision for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Commit may proceed
    Allowed,
    /// A failure signature appeared in the dev server output
    BlockedByError,
    /// The dev server exited nonzero without a signature match
    BlockedByExitCode(i32),
    /// The theme check exited nonzero
    BlockedBySecondaryCheck(Option<i32>),
}

impl Verdict {
    /// Whether the commit is allowed to proceed
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Verdict plus the diagnostic lines to show the operator
///
/// For signature errors the diagnostics are only the matching lines; for a
/// failed theme check they are its full buffered output.
#[derive(Debug)]
pub struct Outcome {
    /// The final decision
    pub verdict: Verdict,
    /// Lines to print for the operator before exiting
    pub diagnostics: Vec<String>,
}

/// Primary task states
///
/// `Running` is the only non-terminal state; every terminal state is reached
/// through [`SupervisedTask::transition`] exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Running,
    ErrorDetected,
    TimedOut,
    ExitedClean,
    ExitedNonZero(i32),
}

impl TaskState {
    fn describe(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::ErrorDetected => "error detected",
            Self::TimedOut => "monitoring window expired",
            Self::ExitedClean => "exited clean",
            Self::ExitedNonZero(_) => "exited nonzero",
        }
    }
}

/// One externally spawned process under observation
struct SupervisedTask {
    state: TaskState,
    output: String,
}

impl SupervisedTask {
    fn new() -> Self {
        Self {
            state: TaskState::Running,
            output: String::new(),
        }
    }

    fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    fn append(&mut self, chunk: &str) {
        self.output.push_str(chunk);
    }

    /// Single transition site; the latch behind the single-fire guarantee
    ///
    /// Returns false when the task already reached a terminal state, in which
    /// case the caller must not act.
    fn transition(&mut self, next: TaskState) -> bool {
        if !self.is_running() {
            tracing::trace!(
                current = self.state.describe(),
                ignored = next.describe(),
                "Transition after terminal state ignored"
            );
            return false;
        }

        tracing::debug!(to = next.describe(), "Dev server state transition");
        self.state = next;
        true
    }
}

enum ReaderEvent {
    Chunk(String),
    Eof,
}

/// Runs the primary task under a bounded window, then the secondary task
pub struct Supervisor<'a> {
    config: &'a Config,
    signatures: SignatureSet,
    control: Box<dyn ProcessControl>,
}

impl<'a> Supervisor<'a> {
    /// Create a supervisor with the platform process control
    pub fn new(config: &'a Config) -> Result<Self> {
        Self::with_control(config, process::platform_control())
    }

    /// Create a supervisor with explicit process control (used by tests)
    pub fn with_control(config: &'a Config, control: Box<dyn ProcessControl>) -> Result<Self> {
        let signatures = SignatureSet::from_patterns(&config.signatures.patterns)?;
        Ok(Self {
            config,
            signatures,
            control,
        })
    }

    /// Run the full supervision sequence and produce one verdict
    #[tracing::instrument(skip(self))]
    pub fn run(&self) -> Result<Outcome> {
        // Sweep the port before launch; a stale dev server left over from a
        // previous attempt would trip the address-in-use signature instantly.
        self.reap_port();

        let task = self.watch_primary()?;

        match task.state {
            TaskState::ErrorDetected => {
                let lines = self.signatures.matching_lines(&task.output);
                tracing::error!(
                    matches = lines.len(),
                    "Failure signature detected in dev server output"
                );
                Ok(Outcome {
                    verdict: Verdict::BlockedByError,
                    diagnostics: lines,
                })
            }
            TaskState::ExitedNonZero(code) => {
                tracing::error!(code, "Dev server exited nonzero");
                Ok(Outcome {
                    verdict: Verdict::BlockedByExitCode(code),
                    // Full buffered output; there was no signature to filter by
                    diagnostics: task.output.lines().map(str::to_string).collect(),
                })
            }
            TaskState::TimedOut | TaskState::ExitedClean => {
                tracing::info!(
                    outcome = task.state.describe(),
                    "Dev server check passed, running theme check"
                );
                self.run_secondary()
            }
            TaskState::Running => {
                unreachable!("watch_primary only returns terminal states")
            }
        }
    }

    /// Observe the primary task until a terminal state is reached
    ///
    /// Detection triggers: chunk arrival (event-driven), the poll interval
    /// (backstop for coalesced or delayed chunk delivery), the deadline, and
    /// stream end. Whichever fires first wins the transition; the rest are
    /// no-ops against the latch.
    #[tracing::instrument(skip(self), fields(cmd = %self.config.commands.dev))]
    fn watch_primary(&self) -> Result<SupervisedTask> {
        let expression = self
            .control
            .command(&self.config.commands.dev)?
            .stderr_to_stdout()
            .unchecked();

        let handle = Arc::new(expression.reader().map_err(|e| Error::Launch {
            task: "dev server".to_string(),
            source: e,
        })?);

        let (tx, rx) = mpsc::channel();
        let drain_handle = Arc::clone(&handle);
        let drain = thread::spawn(move || drain_output(&drain_handle, &tx));

        let poll = Duration::from_millis(self.config.monitor.poll_interval_ms);
        let deadline = Instant::now() + Duration::from_millis(self.config.monitor.timeout_ms);

        let mut task = SupervisedTask::new();

        while task.is_running() {
            match rx.recv_timeout(poll) {
                Ok(ReaderEvent::Chunk(chunk)) => {
                    task.append(&chunk);
                    if self.signatures.is_match(&task.output) {
                        task.transition(TaskState::ErrorDetected);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Poll backstop: rescan the buffer even without new data
                    if self.signatures.is_match(&task.output) {
                        task.transition(TaskState::ErrorDetected);
                    }
                }
                Ok(ReaderEvent::Eof) | Err(RecvTimeoutError::Disconnected) => {
                    match self.await_exit(&handle, deadline)? {
                        Some(status) => task.transition(classify_exit(status)),
                        // Output closed but the process outlived the window
                        None => task.transition(TaskState::TimedOut),
                    };
                }
            }

            if task.is_running() && Instant::now() >= deadline {
                task.transition(TaskState::TimedOut);
            }
        }

        // Terminal actions. The kill of the task handle and the port reap are
        // independent cleanup attempts; the reap also catches children the
        // handle kill did not reach.
        match task.state {
            TaskState::ErrorDetected => {
                self.kill_handle(&handle);
                self.reap_port();
                // Let the kills land before the hook exits and git resumes
                thread::sleep(Duration::from_millis(self.config.monitor.grace_ms));
            }
            TaskState::TimedOut => {
                self.kill_handle(&handle);
                self.reap_port();
            }
            TaskState::ExitedClean | TaskState::ExitedNonZero(_) => {}
            TaskState::Running => unreachable!("loop exits only on terminal states"),
        }

        // The drain thread can stay blocked in read() for as long as any
        // descendant of the primary holds the pipe's write end; the handle
        // kill reaches only the direct child. Detach instead of joining so
        // the gate returns when the window closes, not when the pipe does.
        drop(rx);
        drop(drain);

        Ok(task)
    }

    /// Run the theme check to natural completion; its exit code is the verdict
    ///
    /// No window and no incremental scanning here: only the exit code and the
    /// buffered output matter.
    #[tracing::instrument(skip(self), fields(cmd = %self.config.commands.check))]
    fn run_secondary(&self) -> Result<Outcome> {
        let output = self
            .control
            .command(&self.config.commands.check)?
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()
            .map_err(|e| Error::Launch {
                task: "theme check".to_string(),
                source: e,
            })?;

        if output.status.success() {
            tracing::info!("Theme check passed");
            return Ok(Outcome {
                verdict: Verdict::Allowed,
                diagnostics: Vec::new(),
            });
        }

        let code = output.status.code();
        tracing::error!(code, "Theme check failed");

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(Outcome {
            verdict: Verdict::BlockedBySecondaryCheck(code),
            diagnostics: text.lines().map(str::to_string).collect(),
        })
    }

    /// Wait for the exit status after the output stream closed
    ///
    /// Returns None if the process is still not reaped at the deadline (a
    /// detached child keeping no stdout would do this).
    fn await_exit(&self, handle: &ReaderHandle, deadline: Instant) -> Result<Option<ExitStatus>> {
        loop {
            if let Some(output) = handle.try_wait()? {
                return Ok(Some(output.status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Forcibly kill the primary task handle (non-graceful)
    fn kill_handle(&self, handle: &ReaderHandle) {
        match handle.kill() {
            Ok(()) => tracing::debug!("Dev server process killed"),
            Err(e) => tracing::debug!("Dev server already terminated: {e}"),
        }
    }

    /// Best-effort port reap; failures are logged, never escalated
    fn reap_port(&self) {
        let port = self.config.monitor.port;
        if let Err(e) = self.control.kill_by_port(port) {
            tracing::debug!(port, "Port reap failed (best-effort): {e}");
        }
    }
}

/// Map an exit status to a terminal state
///
/// Absence of a code (killed by signal) counts as clean: only an explicit
/// nonzero exit blocks the commit.
fn classify_exit(status: ExitStatus) -> TaskState {
    match status.code() {
        Some(0) | None => TaskState::ExitedClean,
        Some(code) => TaskState::ExitedNonZero(code),
    }
}

/// Reader-thread body: forward output chunks until EOF or kill
///
/// Send failures mean the supervising side already returned; nothing to do
/// but exit.
fn drain_output(handle: &Arc<ReaderHandle>, tx: &mpsc::Sender<ReaderEvent>) {
    let mut reader: &ReaderHandle = handle;
    let mut buf = [0u8; 4096];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                let _ = tx.send(ReaderEvent::Eof);
                return;
            }
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                if tx.send(ReaderEvent::Chunk(chunk)).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(_) => {
                // Killed or stream torn down; report end of output
                let _ = tx.send(ReaderEvent::Eof);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_is_single_fire() {
        let mut task = SupervisedTask::new();

        assert!(task.transition(TaskState::ErrorDetected));
        // Late poll, duplicate match, and timeout all lose the race
        assert!(!task.transition(TaskState::ErrorDetected));
        assert!(!task.transition(TaskState::TimedOut));
        assert!(!task.transition(TaskState::ExitedClean));

        assert_eq!(task.state, TaskState::ErrorDetected);
    }

    #[test]
    fn test_verdict_allowed_check() {
        assert!(Verdict::Allowed.is_allowed());
        assert!(!Verdict::BlockedByError.is_allowed());
        assert!(!Verdict::BlockedByExitCode(3).is_allowed());
        assert!(!Verdict::BlockedBySecondaryCheck(Some(1)).is_allowed());
    }

    #[cfg(unix)]
    #[test]
    fn test_classify_exit_codes() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(
            classify_exit(ExitStatus::from_raw(0)),
            TaskState::ExitedClean
        );
        // Raw wait status 0x0300 = exit code 3
        assert_eq!(
            classify_exit(ExitStatus::from_raw(3 << 8)),
            TaskState::ExitedNonZero(3)
        );
        // Raw wait status 9 = killed by SIGKILL, no exit code
        assert_eq!(classify_exit(ExitStatus::from_raw(9)), TaskState::ExitedClean);
    }
}
