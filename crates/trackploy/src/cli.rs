//! Clap CLI definitions for the `trackploy` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use trackploy_core::MirrorMethod;

/// trackploy -- deploy a staged tree to git-backed targets.
///
/// The staged tree is mirrored into a persistent local clone, committed, and
/// pushed to the target repository and its optional backup. Every copy must
/// agree before and after the write.
#[derive(Parser, Debug)]
#[command(
    name = "trackploy",
    about = "Deploy a staged tree to git-backed targets",
    long_about = "Deploy a staged tree to git-backed targets. The local clone, the target and the backup must agree on the same commit before and after every deployment.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (default: nearest trackploy.yaml above the current directory).
    #[arg(long, global = true, env = "TRACKPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync the local clone and show what a deployment would change; with
    /// --push, deploy it.
    Deploy(DeployArgs),

    /// Sync the local clone and show the staged changes.
    Diff(DiffArgs),

    /// Show the tips of the local clone, target and backup.
    Status(TargetArgs),

    /// Check that the staging directory and the target repository exist.
    Check(TargetArgs),

    /// Show or write the configuration.
    Config(ConfigArgs),

    /// Print version information.
    Version,

    /// Generate shell completions.
    Completion(CompletionArgs),
}

/// Per-run overrides of `trackploy.yaml`.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Staging directory to deploy.
    #[arg(long, value_name = "DIR")]
    pub stage: Option<PathBuf>,

    /// Persistent local clone.
    #[arg(long, value_name = "DIR")]
    pub local: Option<PathBuf>,

    /// Path of the target repository on the target host.
    #[arg(long, value_name = "PATH")]
    pub target: Option<String>,

    /// Full git URL of the target (replaces the ssh:// locator).
    #[arg(long, value_name = "URL")]
    pub target_url: Option<String>,

    /// Git URL of the backup repository.
    #[arg(long, value_name = "URL")]
    pub backup: Option<String>,

    /// Target host (default: this host).
    #[arg(long)]
    pub host: Option<String>,

    /// Target user (default: the current user).
    #[arg(long)]
    pub user: Option<String>,

    /// Timeout for each external command, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// How the staged tree is copied into the local clone.
    #[arg(long, value_parser = parse_mirror)]
    pub mirror: Option<MirrorMethod>,
}

fn parse_mirror(s: &str) -> Result<MirrorMethod, String> {
    s.parse()
}

/// Arguments for `trackploy deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Commit and push the staged tree (otherwise only show the changes).
    #[arg(long)]
    pub push: bool,

    /// Do not ask for confirmation before pushing.
    #[arg(short = 'y', long, requires = "push")]
    pub yes: bool,

    /// Text appended to the deployment commit message.
    #[arg(short = 'm', long)]
    pub message: Option<String>,
}

/// Arguments for `trackploy diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print only the change counts.
    #[arg(long)]
    pub stat: bool,
}

/// Arguments for `trackploy config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (file, environment and flags merged).
    Show(TargetArgs),

    /// Write a trackploy.yaml in the current directory.
    Init(ConfigInitArgs),
}

/// Arguments for `trackploy config init`.
#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `trackploy completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}
