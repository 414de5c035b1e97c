//! The trackploy deployment protocol.
//!
//! A [`Deployer`] drives one "sync, verify, mirror, commit, verify, push"
//! cycle over a [`RepositorySet`](trackploy_git::RepositorySet). Agreement
//! between the local clone and its remotes is checked with fresh hashes
//! before and after the write; any disagreement aborts without rollback.

pub mod error;
pub mod orchestrator;

pub use error::{DeployError, Result};
pub use orchestrator::{DeployOutcome, DeployReport, Deployer, Phase, PhaseObserver};
