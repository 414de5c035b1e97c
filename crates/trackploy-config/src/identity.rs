//! Identity of the deploying user and host.
//!
//! Resolved once at start-up and passed around as a plain value; nothing
//! below the binary reads `$USER` or the hostname on its own.

use std::env;
use std::time::Duration;

use trackploy_core::CommandRunner;

/// Upper bound for the `hostname` fallback.
const HOSTNAME_TIMEOUT: Duration = Duration::from_secs(5);

/// The user and host a deployment runs as. Recorded in every commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployIdentity {
    pub user: String,
    pub host: String,
}

impl DeployIdentity {
    /// Resolve the current user and host from the environment.
    ///
    /// User: `$USER` > `$USERNAME` > `$LOGNAME` > `"unknown"`.
    /// Host: `$HOSTNAME` > `/etc/hostname` > `hostname` > `"localhost"`.
    pub fn resolve() -> Self {
        Self::resolve_with(&CommandRunner::new(HOSTNAME_TIMEOUT))
    }

    /// Like [`resolve`](Self::resolve), running the `hostname` fallback
    /// through `runner`.
    pub fn resolve_with(runner: &CommandRunner) -> Self {
        Self {
            user: resolve_user(),
            host: resolve_host(runner),
        }
    }
}

fn resolve_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn resolve_host(runner: &CommandRunner) -> String {
    // 1. HOSTNAME env (set by most interactive shells, rarely exported)
    if let Ok(host) = env::var("HOSTNAME") {
        if !host.is_empty() {
            return host;
        }
    }

    // 2. /etc/hostname
    if let Ok(host) = std::fs::read_to_string("/etc/hostname") {
        let host = host.trim();
        if !host.is_empty() {
            return host.to_string();
        }
    }

    // 3. hostname command
    if let Some(host) = hostname_command(runner) {
        return host;
    }

    // 4. Fallback
    "localhost".to_string()
}

fn hostname_command(runner: &CommandRunner) -> Option<String> {
    let output = runner.run("hostname", std::iter::empty::<&str>(), None).ok()?;
    let host = output.trimmed();
    (!host.is_empty()).then(|| host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_produces_non_empty_identity() {
        let identity = DeployIdentity::resolve();
        assert!(!identity.user.is_empty());
        assert!(!identity.host.is_empty());
        assert!(!identity.host.contains('\n'));
    }

    #[test]
    fn hostname_command_runs_through_runner() {
        let runner = CommandRunner::new(Duration::from_secs(2));
        let started = std::time::Instant::now();
        if let Some(host) = hostname_command(&runner) {
            assert_eq!(host.trim(), host);
            assert!(!host.is_empty());
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
