//! The local clone and its two remotes.
//!
//! A [`RepositorySet`] is the persistent local clone plus the remotes it is
//! kept in agreement with: `target` (the deployed repository) and, when
//! configured, `backup`. Every hash comparison asks the remote directly with
//! `git ls-remote`, so a stale remote-tracking ref never decides anything.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use trackploy_core::CommandRunner;

use crate::commands::{git_command, git_command_with_config};
use crate::error::{Endpoint, RepoError, Result};
use crate::gitdir::{is_repo_root, parse_ls_remote, parse_remote_names};

/// Remote name of the deployed repository.
pub const TARGET_REMOTE: &str = "target";

/// Remote name of the optional mirror repository.
pub const BACKUP_REMOTE: &str = "backup";

/// The only branch trackploy reads or writes.
pub const DEPLOY_BRANCH: &str = "master";

/// Name and email recorded on deployment commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Everything needed to open (or create) a [`RepositorySet`].
#[derive(Debug, Clone)]
pub struct RepoSpec {
    /// Path of the persistent local clone.
    pub local_dir: PathBuf,
    /// Git URL of the `target` remote.
    pub target_locator: String,
    /// Git URL of the `backup` remote, if any.
    pub backup_locator: Option<String>,
    /// Deploying user, recorded in the commit message.
    pub user: String,
    /// Deploying host, recorded in the commit message.
    pub host: String,
    /// Staging directory, recorded in the commit message.
    pub staging_dir: PathBuf,
    /// Overrides git's own identity lookup when set.
    pub author: Option<CommitAuthor>,
}

/// Result of [`RepositorySet::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A commit was created; holds its hash.
    Committed(String),
    /// The working tree already matched the tip.
    NothingToCommit,
}

/// Tips of every copy of the repository at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TipSnapshot {
    pub local: String,
    pub target: String,
    /// `None` when no backup is configured.
    pub backup: Option<String>,
}

impl TipSnapshot {
    /// Whether every configured copy is at the same commit.
    pub fn in_sync(&self) -> bool {
        self.local == self.target && self.backup.as_ref().is_none_or(|b| *b == self.target)
    }
}

/// A local clone with its `target` and optional `backup` remotes.
#[derive(Debug)]
pub struct RepositorySet {
    spec: RepoSpec,
    runner: CommandRunner,
}

impl RepositorySet {
    /// Open the clone at `spec.local_dir`, cloning it from the target first
    /// if the directory is absent or empty.
    ///
    /// When a backup locator is given and the clone has no `backup` remote
    /// yet, the remote is added and checked against `target` straight away.
    ///
    /// # Errors
    ///
    /// - [`RepoError::NotARepository`] if the directory holds something else.
    /// - [`RepoError::MissingRemote`] if an existing clone lacks `target`.
    /// - [`RepoError::MissingBranch`] if target (or a new backup) has no
    ///   `master`.
    /// - [`RepoError::OutOfSync`] if a new backup disagrees with target.
    pub fn open(spec: RepoSpec, runner: CommandRunner) -> Result<Self> {
        let set = Self { spec, runner };

        if set.needs_clone()? {
            set.clone_target()?;
        } else if !is_repo_root(&set.runner, &set.spec.local_dir) {
            return Err(RepoError::NotARepository(set.spec.local_dir.clone()));
        }

        let remotes = set.remote_names()?;
        if !remotes.iter().any(|r| r == TARGET_REMOTE) {
            return Err(RepoError::MissingRemote {
                path: set.spec.local_dir.clone(),
                remote: TARGET_REMOTE.to_string(),
            });
        }

        if let Some(locator) = set.spec.backup_locator.clone() {
            if remotes.iter().any(|r| r == BACKUP_REMOTE) {
                let current = set.remote_url(BACKUP_REMOTE)?;
                if current != locator {
                    warn!(old = %current, new = %locator, "backup remote URL changed");
                    set.git(&["remote", "set-url", BACKUP_REMOTE, &locator])?;
                }
            } else {
                info!(url = %locator, "adding backup remote");
                set.git(&["remote", "add", BACKUP_REMOTE, &locator])?;
                set.verify_remotes_match(TARGET_REMOTE, BACKUP_REMOTE)?;
            }
        }

        Ok(set)
    }

    fn needs_clone(&self) -> Result<bool> {
        let dir = &self.spec.local_dir;
        if !dir.exists() {
            return Ok(true);
        }
        if !dir.is_dir() {
            return Ok(false);
        }
        let mut entries = fs::read_dir(dir).map_err(|source| RepoError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(entries.next().is_none())
    }

    fn clone_target(&self) -> Result<()> {
        let dir = &self.spec.local_dir;
        let locator = &self.spec.target_locator;

        // Cloning an empty or branchless target would leave a clone without
        // a master to deploy onto.
        let heads = git_command(
            &self.runner,
            &["ls-remote", "--heads", locator, DEPLOY_BRANCH],
            Path::new("."),
        )?;
        if parse_ls_remote(&heads, DEPLOY_BRANCH).is_none() {
            return Err(RepoError::MissingBranch {
                remote: TARGET_REMOTE.to_string(),
                branch: DEPLOY_BRANCH.to_string(),
            });
        }

        let parent = match dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| RepoError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

        info!(from = %locator, into = %dir.display(), "cloning target");
        let dest = dir.to_string_lossy();
        git_command(
            &self.runner,
            &[
                "clone",
                "--quiet",
                "--origin",
                TARGET_REMOTE,
                "--branch",
                DEPLOY_BRANCH,
                locator,
                &*dest,
            ],
            Path::new("."),
        )?;
        Ok(())
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        Ok(git_command(&self.runner, args, &self.spec.local_dir)?)
    }

    fn remote_names(&self) -> Result<Vec<String>> {
        Ok(parse_remote_names(&self.git(&["remote"])?))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn local_dir(&self) -> &Path {
        &self.spec.local_dir
    }

    pub fn has_backup(&self) -> bool {
        self.spec.backup_locator.is_some()
    }

    /// The configured URL of remote `name`.
    pub fn remote_url(&self, name: &str) -> Result<String> {
        self.git(&["remote", "get-url", name])
    }

    /// The remotes a deployment must keep in agreement, in push order.
    pub fn remotes(&self) -> Vec<&'static str> {
        if self.has_backup() {
            vec![TARGET_REMOTE, BACKUP_REMOTE]
        } else {
            vec![TARGET_REMOTE]
        }
    }

    // -----------------------------------------------------------------------
    // Hashes
    // -----------------------------------------------------------------------

    /// Tip of `master` on `remote`, asked of the remote itself.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::MissingBranch`] if the remote has no `master`.
    pub fn remote_tip_hash(&self, remote: &str) -> Result<String> {
        let output = self.git(&["ls-remote", "--heads", remote, DEPLOY_BRANCH])?;
        let hash = parse_ls_remote(&output, DEPLOY_BRANCH).ok_or_else(|| {
            RepoError::MissingBranch {
                remote: remote.to_string(),
                branch: DEPLOY_BRANCH.to_string(),
            }
        })?;
        debug!(remote, %hash, "remote tip");
        Ok(hash)
    }

    /// Tip of the local `master` branch.
    pub fn local_tip_hash(&self) -> Result<String> {
        self.git(&["rev-parse", "--verify", &format!("refs/heads/{DEPLOY_BRANCH}")])
    }

    /// Write the files of the local `master` tip into the existing
    /// directory `dest`. The working tree and index are left alone, so
    /// leftovers of an interrupted run do not show up here.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Command`] if `git archive` or `tar` fails.
    pub fn export_tip(&self, dest: &Path) -> Result<()> {
        let archive = dest.join(".trackploy-tip.tar");
        let archive_arg = archive.to_string_lossy();
        let tip = format!("refs/heads/{DEPLOY_BRANCH}");
        self.git(&["archive", "--format=tar", "-o", &*archive_arg, &tip])?;
        self.runner.run(
            "tar",
            [
                OsStr::new("-xf"),
                archive.as_os_str(),
                OsStr::new("-C"),
                dest.as_os_str(),
            ],
            None,
        )?;
        fs::remove_file(&archive).map_err(|source| RepoError::Io {
            path: archive.clone(),
            source,
        })?;
        debug!(dest = %dest.display(), "exported tip");
        Ok(())
    }

    pub fn fetch(&self, remote: &str) -> Result<()> {
        self.git(&["fetch", "--quiet", remote])?;
        Ok(())
    }

    /// Fetch `remote` and check that its tip equals the local tip.
    ///
    /// Returns the common hash.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::OutOfSync`] naming the local path, the remote and
    /// both hashes when they differ.
    pub fn verify_local_matches_remote(&self, remote: &str) -> Result<String> {
        self.fetch(remote)?;
        let remote_hash = self.remote_tip_hash(remote)?;
        let local_hash = self.local_tip_hash()?;
        if local_hash != remote_hash {
            return Err(RepoError::OutOfSync {
                left: Endpoint::Local(self.spec.local_dir.clone()),
                left_hash: local_hash,
                right: Endpoint::Remote(remote.to_string()),
                right_hash: remote_hash,
            });
        }
        Ok(local_hash)
    }

    /// Fetch both remotes and check that their tips agree.
    ///
    /// Returns the common hash.
    pub fn verify_remotes_match(&self, a: &str, b: &str) -> Result<String> {
        self.fetch(a)?;
        self.fetch(b)?;
        let a_hash = self.remote_tip_hash(a)?;
        let b_hash = self.remote_tip_hash(b)?;
        if a_hash != b_hash {
            return Err(RepoError::OutOfSync {
                left: Endpoint::Remote(a.to_string()),
                left_hash: a_hash,
                right: Endpoint::Remote(b.to_string()),
                right_hash: b_hash,
            });
        }
        Ok(a_hash)
    }

    /// Current tips of local, target and backup. Nothing is fetched or
    /// pulled.
    pub fn snapshot(&self) -> Result<TipSnapshot> {
        let backup = if self.has_backup() {
            Some(self.remote_tip_hash(BACKUP_REMOTE)?)
        } else {
            None
        };
        Ok(TipSnapshot {
            local: self.local_tip_hash()?,
            target: self.remote_tip_hash(TARGET_REMOTE)?,
            backup,
        })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Fast-forward the local `master` to the remote's.
    pub fn pull(&self, remote: &str) -> Result<()> {
        debug!(remote, "pulling");
        self.git(&["pull", "--quiet", "--ff-only", remote, DEPLOY_BRANCH])?;
        Ok(())
    }

    /// The message recorded on a deployment commit.
    pub fn commit_message(&self, message: Option<&str>) -> String {
        let mut text = format!(
            "deployed by {} from {}:{}\n",
            self.spec.user,
            self.spec.host,
            self.spec.staging_dir.display()
        );
        if let Some(extra) = message.filter(|m| !m.trim().is_empty()) {
            text.push_str(extra);
        }
        text
    }

    /// Stage the whole working tree and commit it if anything changed.
    pub fn commit(&self, message: Option<&str>) -> Result<CommitOutcome> {
        self.git(&["add", "--all"])?;
        let staged = self.git(&["diff", "--cached", "--name-only"])?;
        if staged.is_empty() {
            debug!("index matches tip, nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }

        let text = self.commit_message(message);
        let args = ["commit", "--quiet", "-m", text.as_str()];
        match &self.spec.author {
            Some(author) => {
                let name = author.name.as_str();
                let email = author.email.as_str();
                git_command_with_config(
                    &self.runner,
                    &[("user.name", name), ("user.email", email)],
                    &args,
                    &self.spec.local_dir,
                )?;
            }
            None => {
                self.git(&args)?;
            }
        }

        let hash = self.local_tip_hash()?;
        info!(%hash, files = staged.lines().count(), "committed");
        Ok(CommitOutcome::Committed(hash))
    }

    /// Push `master` to `remote`.
    ///
    /// # Errors
    ///
    /// Any failure becomes [`RepoError::PushRejected`] naming the remote.
    pub fn push(&self, remote: &str) -> Result<()> {
        info!(remote, "pushing");
        git_command(
            &self.runner,
            &["push", "--quiet", remote, DEPLOY_BRANCH],
            &self.spec.local_dir,
        )
        .map_err(|source| RepoError::PushRejected {
            remote: remote.to_string(),
            source,
        })?;
        Ok(())
    }
}
