//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds all the state a command handler needs: the
//! global flags, the deploying identity and the configuration file to load.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use trackploy_config::config_file::locate_config_file;
use trackploy_config::{DeployConfig, DeployIdentity, DeploySettings, load_config};
use trackploy_core::{CommandRunner, LocalHandle, SshHandle};
use trackploy_git::{CommitAuthor, RepoSpec, RepositorySet};

use crate::cli::{GlobalArgs, TargetArgs};

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Explicit configuration file (`--config` or `TRACKPLOY_CONFIG`).
    pub config_path: Option<PathBuf>,

    /// The user and host this run deploys as.
    pub identity: DeployIdentity,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            config_path: global.config.clone(),
            identity: DeployIdentity::resolve(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// Load `trackploy.yaml` and the environment, then apply `overrides`.
    pub fn load_config(&self, overrides: &TargetArgs) -> Result<DeployConfig> {
        let cwd = env::current_dir().context("cannot determine the current directory")?;
        let file = locate_config_file(self.config_path.as_deref(), &cwd)?;
        tracing::debug!(file = ?file, "loading configuration");
        let mut config = load_config(file.as_deref())?;
        apply_overrides(&mut config, overrides);
        Ok(config)
    }

    /// Load and validate the settings for one run.
    pub fn settings(&self, overrides: &TargetArgs) -> Result<DeploySettings> {
        Ok(self.load_config(overrides)?.resolve(&self.identity)?)
    }

    /// Whether progress lines should be printed.
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Copy every flag that was given onto `config`.
pub fn apply_overrides(config: &mut DeployConfig, args: &TargetArgs) {
    if let Some(stage) = &args.stage {
        config.stage = Some(stage.clone());
    }
    if let Some(local) = &args.local {
        config.local = Some(local.clone());
    }
    if let Some(target) = &args.target {
        config.target = Some(target.clone());
    }
    if let Some(url) = &args.target_url {
        config.target_url = Some(url.clone());
    }
    if let Some(backup) = &args.backup {
        config.backup = Some(backup.clone());
    }
    if let Some(host) = &args.host {
        config.host = Some(host.clone());
    }
    if let Some(user) = &args.user {
        config.user = Some(user.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(mirror) = args.mirror {
        config.mirror = mirror;
    }
}

/// Command runner honouring the configured timeout.
pub fn runner(settings: &DeploySettings) -> CommandRunner {
    CommandRunner::new(settings.timeout)
}

/// Shell handle for the machine trackploy runs on.
pub fn local_handle(settings: &DeploySettings) -> LocalHandle {
    LocalHandle::new(runner(settings))
}

/// Shell handle for the target host.
pub fn ssh_handle(settings: &DeploySettings) -> SshHandle {
    SshHandle::new(
        &settings.target_user,
        &settings.target_host,
        settings.ssh_options.clone(),
        runner(settings),
    )
}

/// Open (or create) the local clone described by `settings`.
pub fn open_repository(ctx: &RuntimeContext, settings: &DeploySettings) -> Result<RepositorySet> {
    let spec = RepoSpec {
        local_dir: settings.local_dir.clone(),
        target_locator: settings.target_locator.clone(),
        backup_locator: settings.backup_locator.clone(),
        user: ctx.identity.user.clone(),
        host: ctx.identity.host.clone(),
        staging_dir: settings.staging_dir.clone(),
        author: settings
            .author
            .as_ref()
            .map(|(name, email)| CommitAuthor {
                name: name.clone(),
                email: email.clone(),
            }),
    };
    RepositorySet::open(spec, runner(settings))
        .with_context(|| format!("cannot open local clone {}", settings.local_dir.display()))
}
