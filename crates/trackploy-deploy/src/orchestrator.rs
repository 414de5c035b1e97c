//! Sequencing of the deployment protocol.
//!
//! ```text
//! Idle -> Syncing -> Staging -> Committing -> Verifying
//!      -> PushingTarget -> PushingBackup -> Done
//! ```
//!
//! `Aborted` is reachable from every state. Nothing is rolled back on abort.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use trackploy_core::{ChangeSet, CommandRunner, MirrorMethod, MirrorStats, diff_trees, mirror_tree};
use trackploy_git::{BACKUP_REMOTE, CommitOutcome, RepositorySet, TARGET_REMOTE};

use crate::error::{DeployError, Result};

/// Where a [`Deployer`] is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    Syncing,
    Staging,
    Committing,
    Verifying,
    PushingTarget,
    PushingBackup,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Staging => "staging",
            Self::Committing => "committing",
            Self::Verifying => "verifying",
            Self::PushingTarget => "pushing target",
            Self::PushingBackup => "pushing backup",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// How a successful deployment ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum DeployOutcome {
    /// The staged tree already matched the target.
    NothingToCommit,
    /// A commit was created and pushed to every configured remote.
    Deployed { commit: String, pushed: Vec<String> },
}

/// Summary of one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Target tip the deployment was based on.
    pub base: String,
    pub changes: ChangeSet,
    pub mirror: MirrorStats,
    #[serde(flatten)]
    pub outcome: DeployOutcome,
}

/// Called with each phase as it is entered.
pub type PhaseObserver = Box<dyn FnMut(Phase)>;

/// Drives one deployment over a [`RepositorySet`].
pub struct Deployer {
    repo: RepositorySet,
    staging_dir: PathBuf,
    mirror: MirrorMethod,
    runner: CommandRunner,
    phase: Phase,
    observer: Option<PhaseObserver>,
}

impl fmt::Debug for Deployer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployer")
            .field("repo", &self.repo)
            .field("staging_dir", &self.staging_dir)
            .field("mirror", &self.mirror)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl Deployer {
    pub fn new(
        repo: RepositorySet,
        staging_dir: impl Into<PathBuf>,
        mirror: MirrorMethod,
        runner: CommandRunner,
    ) -> Self {
        Self {
            repo,
            staging_dir: staging_dir.into(),
            mirror,
            runner,
            phase: Phase::Idle,
            observer: None,
        }
    }

    /// Report every phase transition to `observer`.
    pub fn with_observer(mut self, observer: impl FnMut(Phase) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn repo(&self) -> &RepositorySet {
        &self.repo
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = %self.phase, to = %phase, "deploy phase");
        self.phase = phase;
        if let Some(observer) = self.observer.as_mut() {
            observer(phase);
        }
    }

    fn abort(&mut self, err: &DeployError) {
        warn!(phase = %self.phase, error = %err, "deployment aborted");
        self.phase = Phase::Aborted;
        if let Some(observer) = self.observer.as_mut() {
            observer(Phase::Aborted);
        }
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.abort(err);
        }
        result
    }

    /// Bring the local clone up to the target and check that every copy
    /// agrees. Returns the common hash.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Repo`] wrapping `OutOfSync` when the clone,
    /// target or backup disagree after the pull.
    pub fn sync(&mut self) -> Result<String> {
        self.enter(Phase::Syncing);
        let result = self.sync_inner();
        self.track(result)
    }

    fn sync_inner(&self) -> Result<String> {
        self.repo.pull(TARGET_REMOTE)?;
        let hash = self.repo.verify_local_matches_remote(TARGET_REMOTE)?;
        if self.repo.has_backup() {
            self.repo.verify_local_matches_remote(BACKUP_REMOTE)?;
            self.repo.verify_remotes_match(TARGET_REMOTE, BACKUP_REMOTE)?;
        }
        Ok(hash)
    }

    /// Compare the staging directory with the files of the clone's `master`
    /// tip, which after [`sync`](Self::sync) is the target's tip.
    ///
    /// Read-only. The tip is exported to a scratch directory, so an
    /// uncommitted mirror left behind by an interrupted run still shows up
    /// as pending changes.
    pub fn preview(&self) -> Result<ChangeSet> {
        if !self.staging_dir.is_dir() {
            return Err(DeployError::StagingMissing(self.staging_dir.clone()));
        }
        let tip = tempfile::Builder::new()
            .prefix("trackploy-tip")
            .tempdir()
            .map_err(DeployError::Diff)?;
        self.repo.export_tip(tip.path())?;
        diff_trees(&self.staging_dir, tip.path()).map_err(DeployError::Diff)
    }

    /// Run the full protocol.
    ///
    /// `confirm` sees the pending changes and may refuse them, in which case
    /// nothing has been modified. It is not called when there is nothing to
    /// change.
    ///
    /// # Errors
    ///
    /// - [`DeployError::Declined`] if `confirm` returns `false`.
    /// - [`DeployError::RaceDetected`] if the target moved after staging; the
    ///   local commit is kept and nothing is pushed.
    /// - [`DeployError::BackupStale`] if the target push succeeded but the
    ///   backup push did not.
    pub fn deploy<F>(&mut self, message: Option<&str>, confirm: F) -> Result<DeployReport>
    where
        F: FnMut(&ChangeSet) -> bool,
    {
        let result = self.deploy_inner(message, confirm);
        self.track(result)
    }

    fn deploy_inner<F>(&mut self, message: Option<&str>, mut confirm: F) -> Result<DeployReport>
    where
        F: FnMut(&ChangeSet) -> bool,
    {
        self.enter(Phase::Syncing);
        self.sync_inner()?;

        let changes = self.preview()?;
        if !changes.is_empty() && !confirm(&changes) {
            return Err(DeployError::Declined);
        }

        self.enter(Phase::Staging);
        let base = self.repo.verify_local_matches_remote(TARGET_REMOTE)?;
        let mirror = mirror_tree(
            &self.staging_dir,
            self.repo.local_dir(),
            self.mirror,
            self.runner,
        )?;

        self.enter(Phase::Committing);
        let commit = match self.repo.commit(message)? {
            CommitOutcome::Committed(hash) => hash,
            CommitOutcome::NothingToCommit => {
                self.enter(Phase::Done);
                return Ok(DeployReport {
                    base,
                    changes,
                    mirror,
                    outcome: DeployOutcome::NothingToCommit,
                });
            }
        };

        self.enter(Phase::Verifying);
        let actual = self.repo.remote_tip_hash(TARGET_REMOTE)?;
        if actual != base {
            return Err(DeployError::RaceDetected {
                expected: base,
                actual,
                commit,
            });
        }

        self.enter(Phase::PushingTarget);
        self.repo.push(TARGET_REMOTE)?;
        let mut pushed = vec![TARGET_REMOTE.to_string()];

        if self.repo.has_backup() {
            self.enter(Phase::PushingBackup);
            let backup = self
                .repo
                .push(BACKUP_REMOTE)
                .and_then(|()| self.repo.verify_local_matches_remote(BACKUP_REMOTE));
            if let Err(source) = backup {
                warn!(%commit, "backup is behind the target");
                return Err(DeployError::BackupStale { commit, source });
            }
            pushed.push(BACKUP_REMOTE.to_string());
        }

        self.enter(Phase::Done);
        Ok(DeployReport {
            base,
            changes,
            mirror,
            outcome: DeployOutcome::Deployed { commit, pushed },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn phase_display() {
        assert_eq!(Phase::PushingTarget.to_string(), "pushing target");
        assert_eq!(Phase::Aborted.to_string(), "aborted");
    }

    #[test]
    fn report_serializes_flat() {
        let report = DeployReport {
            base: "abc".into(),
            changes: ChangeSet::default(),
            mirror: MirrorStats::default(),
            outcome: DeployOutcome::NothingToCommit,
        };
        let value = serde_json::to_string(&report).unwrap();
        assert!(value.contains("\"outcome\":\"nothing-to-commit\""), "{value}");
        assert!(value.contains("\"base\":\"abc\""), "{value}");
    }
}
