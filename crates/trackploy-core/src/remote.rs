//! Local and remote shell handles.
//!
//! A [`RemoteHandle`] answers two questions about a host: does a path exist,
//! and can these commands be run there. [`LocalHandle`] runs against the local
//! filesystem, [`SshHandle`] against a remote host through the `ssh` binary.
//! Both report failures through [`CommandError`] with the same exit-status
//! contract as [`CommandRunner`].

use std::path::Path;

use tracing::debug;

use crate::runner::{CommandError, CommandOutput, CommandRunner, Result, shell_quote};

/// Capabilities shared by local and remote shells.
pub trait RemoteHandle {
    /// Human-readable name of the host this handle talks to.
    fn describe(&self) -> String;

    /// Whether `path` exists on the host.
    ///
    /// # Errors
    ///
    /// Returns an error only when the host could not be asked (for example an
    /// unreachable SSH host); a missing path is `Ok(false)`.
    fn path_exists(&self, path: &Path) -> Result<bool>;

    /// Run `commands` in order, stopping at the first failure.
    ///
    /// When `cwd` is given the commands run inside that directory.
    fn run_commands(&self, commands: &[&str], cwd: Option<&Path>) -> Result<CommandOutput>;
}

/// Joins commands into one shell line that fails on the first failing command.
fn script(commands: &[&str], cwd: Option<&Path>) -> String {
    let mut parts = Vec::with_capacity(commands.len() + 1);
    if let Some(dir) = cwd {
        parts.push(format!("cd {}", shell_quote(&dir.to_string_lossy())));
    }
    parts.extend(commands.iter().map(|c| c.to_string()));
    parts.join(" && ")
}

// ---------------------------------------------------------------------------
// Local
// ---------------------------------------------------------------------------

/// Handle for the machine trackploy runs on.
#[derive(Debug, Clone, Default)]
pub struct LocalHandle {
    runner: CommandRunner,
}

impl LocalHandle {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

impl RemoteHandle for LocalHandle {
    fn describe(&self) -> String {
        "localhost".to_string()
    }

    fn path_exists(&self, path: &Path) -> Result<bool> {
        Ok(path.exists())
    }

    fn run_commands(&self, commands: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        self.runner.shell(&script(commands, None), cwd)
    }
}

// ---------------------------------------------------------------------------
// SSH
// ---------------------------------------------------------------------------

/// Handle for a remote host reached with `ssh user@host`.
#[derive(Debug, Clone)]
pub struct SshHandle {
    destination: String,
    options: Vec<String>,
    runner: CommandRunner,
}

impl SshHandle {
    /// Create a handle for `user@host`, passing `options` to every `ssh` call.
    pub fn new(user: &str, host: &str, options: Vec<String>, runner: CommandRunner) -> Self {
        Self {
            destination: format!("{user}@{host}"),
            options,
            runner,
        }
    }

    /// The SSH destination (`user@host`).
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The full argument list handed to `ssh` for a remote command line.
    fn ssh_args(&self, remote_command: String) -> Vec<String> {
        let mut args = self.options.clone();
        args.push(self.destination.clone());
        args.push(remote_command);
        args
    }
}

impl RemoteHandle for SshHandle {
    fn describe(&self) -> String {
        self.destination.clone()
    }

    fn path_exists(&self, path: &Path) -> Result<bool> {
        let check = format!("test -e {}", shell_quote(&path.to_string_lossy()));
        match self.runner.run("ssh", self.ssh_args(check), None) {
            Ok(_) => Ok(true),
            // `test` exits 1 for a missing path; ssh itself uses 255.
            Err(CommandError::Failed { code: Some(1), .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn run_commands(&self, commands: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let line = script(commands, cwd);
        debug!(destination = %self.destination, command = %line, "remote exec");
        self.runner.run("ssh", self.ssh_args(line), None)
    }
}
