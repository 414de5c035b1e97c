//! Configuration management for trackploy.
//!
//! This crate loads `trackploy.yaml` (layered with `TRACKPLOY_*` environment
//! variables), discovers the file by walking up the directory tree, and
//! resolves the identity of the deploying user and host.

pub mod config;
pub mod config_file;
pub mod identity;

pub use config::{ConfigError, DeployConfig, DeploySettings, load_config};
pub use identity::DeployIdentity;
