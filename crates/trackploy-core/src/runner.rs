//! Subprocess execution with a wall-clock timeout.
//!
//! Every external program trackploy starts (git, ssh, rsync, `sh -c`) goes
//! through [`CommandRunner`], so that callers see one failure shape:
//! [`CommandError`]. A command that exits non-zero, is killed by a signal, or
//! outlives the timeout is a failure. Nothing is ever retried here.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Default timeout for a single command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by [`CommandRunner`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (missing binary, bad working directory).
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The command exited with a non-zero status or was killed by a signal.
    #[error("command `{command}` failed (exit code {code:?}): {}", summarize(stderr, stdout))]
    Failed {
        /// The command line that was run.
        command: String,
        /// Exit code, or `None` if the process was terminated by a signal.
        code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The command did not finish before the timeout and was killed.
    #[error("command `{command}` timed out after {} seconds", timeout.as_secs())]
    TimedOut {
        /// The command line that was run.
        command: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

impl CommandError {
    /// The exit code of a [`CommandError::Failed`] command.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Prefer stderr for error messages, falling back to stdout.
fn summarize<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    }
}

/// A specialized `Result` type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Standard output with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs commands with a fixed timeout.
///
/// The runner is cheap to clone and carries no state besides the timeout, so
/// each component that spawns processes holds its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRunner {
    timeout: Duration,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl CommandRunner {
    /// Create a runner that kills commands running longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a shell command line through `sh -c`.
    ///
    /// # Errors
    ///
    /// See [`CommandRunner::run`].
    pub fn shell(&self, command: &str, cwd: Option<&Path>) -> Result<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        self.execute(cmd, command.to_string())
    }

    /// Run `program` with `args`, optionally inside `cwd`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the program cannot be started,
    /// [`CommandError::Failed`] on a non-zero exit and
    /// [`CommandError::TimedOut`] if the timeout elapses first.
    pub fn run<I, S>(&self, program: &str, args: I, cwd: Option<&Path>) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let command_line = display_command(&cmd);
        self.execute(cmd, command_line)
    }

    fn execute(&self, mut cmd: Command, command_line: String) -> Result<CommandOutput> {
        debug!(command = %command_line, cwd = ?cmd.get_current_dir().map(PathBuf::from), "running command");

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.wait(&mut child) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                // The drain threads are left detached: a grandchild may still
                // hold the pipes open.
                debug!(command = %command_line, "command timed out");
                return Err(CommandError::TimedOut {
                    command: command_line,
                    timeout: self.timeout,
                });
            }
            Err(source) => {
                return Err(CommandError::Spawn {
                    command: command_line,
                    source,
                });
            }
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            debug!(command = %command_line, code = ?status.code(), "command failed");
            return Err(CommandError::Failed {
                command: command_line,
                code: status.code(),
                stdout,
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    /// Poll the child until it exits. `Ok(None)` means the timeout elapsed.
    fn wait(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn display_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Quote a string for safe interpolation into a POSIX shell command line.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
