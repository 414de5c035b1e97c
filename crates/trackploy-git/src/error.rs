use std::fmt;
use std::path::PathBuf;

use trackploy_core::CommandError;

/// One side of a hash comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The local clone at this path.
    Local(PathBuf),
    /// A named remote of the local clone.
    Remote(String),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "local clone {}", path.display()),
            Self::Remote(name) => write!(f, "remote '{name}'"),
        }
    }
}

/// Errors raised by [`RepositorySet`](crate::RepositorySet).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("remote '{remote}' has no branch '{branch}'")]
    MissingBranch { remote: String, branch: String },

    #[error("{} has no remote named '{remote}'", path.display())]
    MissingRemote { path: PathBuf, remote: String },

    #[error("{} exists but is not the root of a git clone", .0.display())]
    NotARepository(PathBuf),

    #[error("out of sync: {left} is at {left_hash} but {right} is at {right_hash}")]
    OutOfSync {
        left: Endpoint,
        left_hash: String,
        right: Endpoint,
        right_hash: String,
    },

    #[error("push to '{remote}' was rejected: {source}")]
    PushRejected {
        remote: String,
        #[source]
        source: CommandError,
    },

    #[error("cannot create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RepoError>;
