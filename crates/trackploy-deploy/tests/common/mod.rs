//! Fixtures for protocol tests: bare repositories for target and backup, a
//! staging tree, and a path for the local clone.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use trackploy_core::{CommandRunner, MirrorMethod};
use trackploy_deploy::Deployer;
use trackploy_git::commands::{git_command, git_command_with_config};
use trackploy_git::{CommitAuthor, RepoSpec, RepositorySet};

pub const AUTHOR: (&str, &str) = ("Test Deployer", "deployer@example.com");

pub fn runner() -> CommandRunner {
    CommandRunner::default()
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    git_command(&runner(), args, dir).unwrap()
}

pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Commit `files` onto `bare`'s master from a scratch clone under `root`,
/// the way an independent deployer would.
pub fn push_commit(root: &Path, bare: &Path, scratch: &str, files: &[(&str, &str)]) {
    let work = root.join(scratch);
    let url = bare.to_string_lossy();
    if !work.exists() {
        fs::create_dir_all(&work).unwrap();
        git(&work, &["init", "--quiet"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    }
    if !git(&work, &["ls-remote", "--heads", &*url, "master"]).is_empty() {
        git(&work, &["pull", "--quiet", "--ff-only", &*url, "master"]);
    }
    write_tree(&work, files);
    git(&work, &["add", "--all"]);
    git_command_with_config(
        &runner(),
        &[("user.name", AUTHOR.0), ("user.email", AUTHOR.1)],
        &["commit", "--quiet", "-m", scratch],
        &work,
    )
    .unwrap();
    git(&work, &["push", "--quiet", &*url, "HEAD:refs/heads/master"]);
}

pub struct Fixture {
    pub root: TempDir,
    pub target: PathBuf,
    pub backup: Option<PathBuf>,
}

impl Fixture {
    /// Target seeded with one commit; backup (if asked for) a copy of it.
    pub fn new(with_backup: bool) -> Self {
        let root = TempDir::new().unwrap();
        let target = bare(root.path(), "target.git");
        push_commit(root.path(), &target, "seed", &[("README", "deployed suites\n")]);
        let backup = with_backup.then(|| {
            let backup = bare(root.path(), "backup.git");
            let url = backup.to_string_lossy().into_owned();
            git(&target, &["push", "--quiet", &url, "master"]);
            backup
        });
        fs::create_dir_all(root.path().join("staging")).unwrap();
        Self {
            root,
            target,
            backup,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    pub fn staging(&self) -> PathBuf {
        self.path("staging")
    }

    pub fn clone_dir(&self) -> PathBuf {
        self.path("clone")
    }

    pub fn stage(&self, files: &[(&str, &str)]) {
        write_tree(&self.staging(), files);
    }

    pub fn tip(bare: &Path) -> String {
        git(bare, &["rev-parse", "refs/heads/master"])
    }

    pub fn target_tip(&self) -> String {
        Self::tip(&self.target)
    }

    pub fn backup_tip(&self) -> String {
        Self::tip(self.backup.as_deref().unwrap())
    }

    pub fn spec(&self) -> RepoSpec {
        RepoSpec {
            local_dir: self.clone_dir(),
            target_locator: self.target.to_string_lossy().into_owned(),
            backup_locator: self
                .backup
                .as_ref()
                .map(|b| b.to_string_lossy().into_owned()),
            user: "alice".into(),
            host: "buildhost".into(),
            staging_dir: self.staging(),
            author: Some(CommitAuthor {
                name: AUTHOR.0.into(),
                email: AUTHOR.1.into(),
            }),
        }
    }

    pub fn deployer(&self) -> Deployer {
        let repo = RepositorySet::open(self.spec(), runner()).unwrap();
        Deployer::new(repo, self.staging(), MirrorMethod::Native, runner())
    }
}

pub fn bare(root: &Path, name: &str) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(&path).unwrap();
    git(&path, &["init", "--quiet", "--bare"]);
    git(&path, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    path
}

/// Make every push to `bare` fail.
#[cfg(unix)]
pub fn reject_pushes(bare: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let hook = bare.join("hooks").join("pre-receive");
    fs::create_dir_all(hook.parent().unwrap()).unwrap();
    fs::write(&hook, "#!/bin/sh\necho 'backup is read-only' >&2\nexit 1\n").unwrap();
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
pub fn accept_pushes(bare: &Path) {
    fs::remove_file(bare.join("hooks").join("pre-receive")).unwrap();
}
