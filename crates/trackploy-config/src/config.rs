//! Configuration types and loading for trackploy.
//!
//! The main entry point is [`DeployConfig`], the contents of
//! `trackploy.yaml` layered with `TRACKPLOY_*` environment variables. A
//! loaded config is turned into validated [`DeploySettings`] with
//! [`DeployConfig::resolve`] once command-line overrides have been applied.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trackploy_core::MirrorMethod;

use crate::identity::DeployIdentity;

/// Prefix of environment variables that override configuration keys.
pub const ENV_PREFIX: &str = "TRACKPLOY_";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file or environment contained invalid values.
    #[error("failed to load configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A required value was given neither in the file nor on the command line.
    #[error("missing required setting '{key}' (set it in trackploy.yaml or pass --{key})")]
    Missing {
        /// The configuration key.
        key: &'static str,
    },

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Git-related configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GitConfig {
    /// Commit author name for deployment commits.
    #[serde(default)]
    pub author_name: Option<String>,

    /// Commit author email for deployment commits.
    #[serde(default)]
    pub author_email: Option<String>,
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full trackploy configuration, corresponding to `trackploy.yaml`.
///
/// Every field has a default so that a partial file deserializes cleanly;
/// required values are enforced later by [`DeployConfig::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct DeployConfig {
    /// Staging directory holding the tree to deploy.
    #[serde(default)]
    pub stage: Option<PathBuf>,

    /// Path of the persistent local clone.
    #[serde(default)]
    pub local: Option<PathBuf>,

    /// Path of the target repository on the target host.
    #[serde(default)]
    pub target: Option<String>,

    /// Full git URL of the target, replacing the `ssh://` locator built from
    /// `user`, `host` and `target`.
    #[serde(default)]
    pub target_url: Option<String>,

    /// Git URL of the backup repository.
    #[serde(default)]
    pub backup: Option<String>,

    /// Target host (default: the deploying host).
    #[serde(default)]
    pub host: Option<String>,

    /// Target user (default: the deploying user).
    #[serde(default)]
    pub user: Option<String>,

    /// Text appended to every deployment commit message.
    #[serde(default)]
    pub message: Option<String>,

    /// Timeout for each external command, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How the staged tree is copied into the local clone.
    #[serde(default)]
    pub mirror: MirrorMethod,

    /// Extra arguments passed to every `ssh` invocation.
    #[serde(default)]
    pub ssh_options: Vec<String>,

    /// Git-related configuration.
    #[serde(default)]
    pub git: GitConfig,
}

fn default_timeout_secs() -> u64 {
    trackploy_core::runner::DEFAULT_TIMEOUT.as_secs()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            stage: None,
            local: None,
            target: None,
            target_url: None,
            backup: None,
            host: None,
            user: None,
            message: None,
            timeout_secs: default_timeout_secs(),
            mirror: MirrorMethod::default(),
            ssh_options: Vec::new(),
            git: GitConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Validated settings for one deployment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub staging_dir: PathBuf,
    pub local_dir: PathBuf,
    /// Git URL of the target remote.
    pub target_locator: String,
    /// User and host used for SSH access to the target.
    pub target_user: String,
    pub target_host: String,
    /// Path of the target repository on its host, when known.
    pub target_path: Option<String>,
    pub backup_locator: Option<String>,
    pub message: Option<String>,
    pub timeout: Duration,
    pub mirror: MirrorMethod,
    pub ssh_options: Vec<String>,
    /// `(name, email)` for deployment commits, when configured.
    pub author: Option<(String, String)>,
}

impl DeployConfig {
    /// Validate the configuration and fill in defaults from `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `stage`, `local`, or both of
    /// `target` and `target-url` are absent, and
    /// [`ConfigError::InvalidValue`] for a zero timeout or a half-specified
    /// commit author.
    pub fn resolve(&self, identity: &DeployIdentity) -> Result<DeploySettings> {
        let staging_dir = self.stage.clone().ok_or(ConfigError::Missing { key: "stage" })?;
        let local_dir = self.local.clone().ok_or(ConfigError::Missing { key: "local" })?;

        let target_user = non_empty(&self.user).unwrap_or(&identity.user).to_string();
        let target_host = non_empty(&self.host).unwrap_or(&identity.host).to_string();

        let target_locator = match (non_empty(&self.target_url), non_empty(&self.target)) {
            (Some(url), _) => url.to_string(),
            (None, Some(path)) => ssh_locator(&target_user, &target_host, path),
            (None, None) => return Err(ConfigError::Missing { key: "target" }),
        };

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout-secs".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let author = match (non_empty(&self.git.author_name), non_empty(&self.git.author_email)) {
            (Some(name), Some(email)) => Some((name.to_string(), email.to_string())),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "git".into(),
                    reason: "author-name and author-email must be set together".into(),
                });
            }
        };

        Ok(DeploySettings {
            staging_dir,
            local_dir,
            target_locator,
            target_user,
            target_host,
            target_path: non_empty(&self.target).map(str::to_string),
            backup_locator: non_empty(&self.backup).map(str::to_string),
            message: non_empty(&self.message).map(str::to_string),
            timeout: Duration::from_secs(self.timeout_secs),
            mirror: self.mirror,
            ssh_options: self.ssh_options.clone(),
            author,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Build the SSH locator of a target repository: `ssh://user@host:/path`.
pub fn ssh_locator(user: &str, host: &str, path: &str) -> String {
    format!("ssh://{user}@{host}:{path}")
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from `file` (if any), layered with `TRACKPLOY_*`
/// environment variables.
///
/// Environment keys map to file keys by lowercasing and replacing `_` with
/// `-`; `__` descends into a section (`TRACKPLOY_GIT__AUTHOR_NAME`).
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the file is not valid YAML or a value
/// has the wrong type.
pub fn load_config(file: Option<&Path>) -> Result<DeployConfig> {
    let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));
    if let Some(path) = file {
        figment = figment.merge(Yaml::file(path));
    }
    figment = figment.merge(
        Env::prefixed(ENV_PREFIX)
            .ignore(&["config"])
            .map(|key| {
                key.as_str()
                    .to_ascii_lowercase()
                    .replace("__", ".")
                    .replace('_', "-")
                    .into()
            }),
    );
    figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
}

/// Parse configuration from a YAML string, without environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the text is not a valid config.
pub fn parse_config(yaml: &str) -> Result<DeployConfig> {
    Figment::from(Serialized::defaults(DeployConfig::default()))
        .merge(Yaml::string(yaml))
        .extract()
        .map_err(|e| ConfigError::Invalid(Box::new(e)))
}

/// Save configuration as YAML to `path`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the config cannot be serialized
/// or written.
pub fn save_config(path: &Path, config: &DeployConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::InvalidValue {
        key: "<root>".into(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, yaml).map_err(|e| ConfigError::InvalidValue {
        key: path.display().to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
