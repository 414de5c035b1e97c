//! Throwaway git fixtures: bare repositories standing in for the target and
//! backup remotes.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use trackploy_core::CommandRunner;
use trackploy_git::commands::{git_command, git_command_with_config};
use trackploy_git::{CommitAuthor, RepoSpec};

pub const AUTHOR: (&str, &str) = ("Test Deployer", "deployer@example.com");

pub fn runner() -> CommandRunner {
    CommandRunner::default()
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    git_command(&runner(), args, dir).unwrap()
}

fn git_as_author(dir: &Path, args: &[&str]) -> String {
    git_command_with_config(
        &runner(),
        &[("user.name", AUTHOR.0), ("user.email", AUTHOR.1)],
        args,
        dir,
    )
    .unwrap()
}

/// A scratch area holding bare repositories and a local clone path.
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Create an empty bare repository whose HEAD is `master`.
    pub fn bare(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        fs::create_dir_all(&path).unwrap();
        git(&path, &["init", "--quiet", "--bare"]);
        git(&path, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        path
    }

    /// Create a bare repository with one commit holding `files`.
    pub fn seeded(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let bare = self.bare(name);
        self.push_commit(&bare, &format!("{name}-seed"), files, "seed");
        bare
    }

    /// Create a bare repository whose `master` is a copy of `source`'s.
    pub fn mirror_of(&self, name: &str, source: &Path) -> PathBuf {
        let bare = self.bare(name);
        let url = bare.to_string_lossy();
        git(source, &["push", "--quiet", &*url, "master"]);
        bare
    }

    /// Commit `files` on top of `bare`'s master from an independent scratch
    /// clone and push it, as another deployer would.
    pub fn push_commit(&self, bare: &Path, scratch: &str, files: &[(&str, &str)], message: &str) {
        let work = self.path(scratch);
        let url = bare.to_string_lossy();
        if work.exists() {
            git(&work, &["pull", "--quiet", "--ff-only", &*url, "master"]);
        } else {
            fs::create_dir_all(&work).unwrap();
            git(&work, &["init", "--quiet"]);
            git(&work, &["symbolic-ref", "HEAD", "refs/heads/master"]);
            let has_master = !git(&work, &["ls-remote", "--heads", &*url, "master"]).is_empty();
            if has_master {
                git(&work, &["pull", "--quiet", "--ff-only", &*url, "master"]);
            }
        }
        for (rel, content) in files {
            let path = work.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        git(&work, &["add", "--all"]);
        git_as_author(&work, &["commit", "--quiet", "-m", message]);
        git(&work, &["push", "--quiet", &*url, "HEAD:refs/heads/master"]);
    }

    pub fn tip(&self, bare: &Path) -> String {
        git(bare, &["rev-parse", "refs/heads/master"])
    }

    pub fn spec(&self, target: &Path, backup: Option<&Path>) -> RepoSpec {
        RepoSpec {
            local_dir: self.path("clone"),
            target_locator: target.to_string_lossy().into_owned(),
            backup_locator: backup.map(|b| b.to_string_lossy().into_owned()),
            user: "alice".into(),
            host: "buildhost".into(),
            staging_dir: self.path("staging"),
            author: Some(CommitAuthor {
                name: AUTHOR.0.into(),
                email: AUTHOR.1.into(),
            }),
        }
    }
}
