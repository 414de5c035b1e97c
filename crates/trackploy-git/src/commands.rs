//! Git command execution wrappers.
//!
//! Provides a thin wrapper around `git` subprocess invocation so that the
//! rest of the codebase does not need to build argument lists for the
//! [`CommandRunner`] directly. Every call inherits the runner's timeout.

use std::path::Path;

use trackploy_core::runner::{CommandRunner, Result};

/// Execute a `git` command with the given arguments and working directory.
///
/// Returns the trimmed contents of stdout on success.
///
/// # Errors
///
/// Returns [`CommandError::Spawn`](trackploy_core::CommandError::Spawn) if
/// `git` cannot be started, and the runner's `Failed`/`TimedOut` variants for
/// a non-zero exit or a timeout.
///
/// # Examples
///
/// ```no_run
/// use trackploy_core::CommandRunner;
/// use trackploy_git::commands::git_command;
/// use std::path::Path;
///
/// let runner = CommandRunner::default();
/// let branch = git_command(&runner, &["rev-parse", "--abbrev-ref", "HEAD"], Path::new(".")).unwrap();
/// println!("Current branch: {branch}");
/// ```
pub fn git_command(runner: &CommandRunner, args: &[&str], cwd: &Path) -> Result<String> {
    let output = runner.run("git", args, Some(cwd))?;
    Ok(output.trimmed().to_string())
}

/// Like [`git_command`], but with `-c key=value` options placed before the
/// subcommand.
pub fn git_command_with_config(
    runner: &CommandRunner,
    config: &[(&str, &str)],
    args: &[&str],
    cwd: &Path,
) -> Result<String> {
    let pairs: Vec<String> = config.iter().map(|(k, v)| format!("{k}={v}")).collect();
    let mut full: Vec<&str> = Vec::with_capacity(pairs.len() * 2 + args.len());
    for pair in &pairs {
        full.push("-c");
        full.push(pair);
    }
    full.extend_from_slice(args);
    git_command(runner, &full, cwd)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
