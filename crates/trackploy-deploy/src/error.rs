//! Deployment error types.

use std::path::PathBuf;

use trackploy_core::MirrorError;
use trackploy_git::RepoError;

/// Errors that end a deployment.
///
/// Nothing is rolled back when one of these is returned: the local clone,
/// the target and the backup are left exactly as the failing step left them.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A git operation or hash check failed.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// The target moved between the pre-flight check and the push.
    #[error(
        "target changed during deployment: expected {expected}, found {actual}; \
         local commit {commit} was not pushed"
    )]
    RaceDetected {
        /// Target tip recorded before staging.
        expected: String,
        /// Target tip found after committing.
        actual: String,
        /// The local commit left unpushed.
        commit: String,
    },

    /// The staging directory does not exist.
    #[error("staging directory {} does not exist", .0.display())]
    StagingMissing(PathBuf),

    /// Comparing the staged tree with the clone failed.
    #[error("cannot compare staged tree: {0}")]
    Diff(#[source] std::io::Error),

    /// Copying the staged tree onto the clone failed.
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// The operator refused the confirmation prompt.
    #[error("deployment declined")]
    Declined,

    /// The target was updated but the backup push failed.
    #[error("target is at {commit} but pushing the backup failed: {source}")]
    BackupStale {
        /// The commit now on the target.
        commit: String,
        /// Why the backup push failed.
        #[source]
        source: RepoError,
    },
}

/// Convenience result type for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;
