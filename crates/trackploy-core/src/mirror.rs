//! Destructive one-way sync of a staged tree onto a working tree.
//!
//! After [`mirror_tree`] returns, `dest` contains exactly the files of
//! `source` (plus any version-control metadata it already had). Files that
//! exist only in `dest` are deleted. Version-control directories are never
//! copied from `source` and never removed from `dest`.
//!
//! The operation is not git-aware: committing the result is the caller's job.

use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::{VCS_DIRS, files_differ, is_vcs_dir};
use crate::remote::{LocalHandle, RemoteHandle};
use crate::runner::{CommandError, CommandRunner, shell_quote};

/// How the staged tree is copied onto the local clone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorMethod {
    /// Walk and copy in-process.
    #[default]
    Native,
    /// Shell out to `rsync -a --delete`.
    Rsync,
}

impl FromStr for MirrorMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Self::Native),
            "rsync" => Ok(Self::Rsync),
            other => Err(format!("unknown mirror method '{other}' (expected native or rsync)")),
        }
    }
}

/// Errors raised while mirroring.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("mirror I/O error on {path}: {source}")]
    Io {
        path: String,
        source: io::Error,
    },

    #[error("rsync failed: {0}")]
    Rsync(#[from] CommandError),
}

/// What a native mirror pass changed. Rsync runs report zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorStats {
    pub copied: usize,
    pub deleted: usize,
}

/// Make `dest` an exact copy of `source`.
///
/// `dest` is created if it does not exist.
///
/// # Errors
///
/// Returns [`MirrorError::Io`] for filesystem failures and
/// [`MirrorError::Rsync`] if the `rsync` command fails.
pub fn mirror_tree(
    source: &Path,
    dest: &Path,
    method: MirrorMethod,
    runner: CommandRunner,
) -> Result<MirrorStats, MirrorError> {
    debug!(source = %source.display(), dest = %dest.display(), ?method, "mirroring tree");
    match method {
        MirrorMethod::Native => {
            let mut stats = MirrorStats::default();
            fs::create_dir_all(dest).map_err(io_err(dest))?;
            mirror_dir(source, dest, &mut stats)?;
            Ok(stats)
        }
        MirrorMethod::Rsync => {
            let excludes: String = VCS_DIRS.iter().map(|d| format!(" --exclude {d}")).collect();
            let command = format!(
                "rsync -a --delete{excludes} {}/ {}/",
                shell_quote(&source.to_string_lossy()),
                shell_quote(&dest.to_string_lossy())
            );
            LocalHandle::new(runner).run_commands(&[&command], None)?;
            Ok(MirrorStats::default())
        }
    }
}

fn io_err(path: &Path) -> impl Fn(io::Error) -> MirrorError + '_ {
    move |source| MirrorError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn mirror_dir(source: &Path, dest: &Path, stats: &mut MirrorStats) -> Result<(), MirrorError> {
    // Pass 1: remove what the source no longer has, or has with another type.
    for entry in fs::read_dir(dest).map_err(io_err(dest))? {
        let entry = entry.map_err(io_err(dest))?;
        let name = entry.file_name();
        let target = entry.path();
        let is_dir = entry.file_type().map_err(io_err(&target))?.is_dir();
        if is_dir && is_vcs_dir(&name.to_string_lossy()) {
            continue;
        }

        let counterpart = source.join(&name);
        let keep = match fs::metadata(&counterpart) {
            Ok(meta) => meta.is_dir() == is_dir,
            Err(_) => false,
        };
        if !keep {
            if is_dir {
                fs::remove_dir_all(&target).map_err(io_err(&target))?;
            } else {
                fs::remove_file(&target).map_err(io_err(&target))?;
            }
            stats.deleted += 1;
        }
    }

    // Pass 2: copy new and changed entries.
    for entry in fs::read_dir(source).map_err(io_err(source))? {
        let entry = entry.map_err(io_err(source))?;
        let name = entry.file_name();
        let from = entry.path();
        let to = dest.join(&name);
        let is_dir = fs::metadata(&from).map_err(io_err(&from))?.is_dir();

        if is_dir {
            if is_vcs_dir(&name.to_string_lossy()) {
                continue;
            }
            fs::create_dir_all(&to).map_err(io_err(&to))?;
            mirror_dir(&from, &to, stats)?;
        } else if !to.exists() || files_differ(&from, &to).map_err(io_err(&to))? {
            fs::copy(&from, &to).map_err(io_err(&to))?;
            stats.copied += 1;
        }
    }
    Ok(())
}
