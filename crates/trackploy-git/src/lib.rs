//! Git integration for trackploy.
//!
//! This crate wraps `git` subprocess calls and exposes the
//! [`RepositorySet`]: the persistent local clone together with its `target`
//! and `backup` remotes, and the hash checks that keep them in agreement.

pub mod commands;
pub mod error;
pub mod gitdir;
pub mod repo;

pub use error::{Endpoint, RepoError, Result};
pub use repo::{
    BACKUP_REMOTE, CommitAuthor, CommitOutcome, DEPLOY_BRANCH, RepoSpec, RepositorySet,
    TARGET_REMOTE, TipSnapshot,
};
