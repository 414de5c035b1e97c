//! Repository detection and parsing of git plumbing output.
//!
//! The local clone lives at a fixed, configured path. Unlike discovery that
//! walks up the tree, a directory only counts as the clone if it is itself
//! the top level of a working tree: a clone path nested inside some other
//! repository must not be mistaken for that repository.

use std::path::{Path, PathBuf};

use trackploy_core::CommandRunner;

use crate::commands::git_command;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Returns `true` if `path` is the top-level directory of a git working tree.
///
/// Does not walk up: a subdirectory of a repository returns `false`.
pub fn is_repo_root(runner: &CommandRunner, path: &Path) -> bool {
    if !path.join(".git").exists() {
        return false;
    }

    let Ok(toplevel) = git_command(runner, &["rev-parse", "--show-toplevel"], path) else {
        return false;
    };
    let toplevel = PathBuf::from(normalize_git_path(&toplevel));

    match (toplevel.canonicalize(), path.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Extract the hash of `refs/heads/{branch}` from `git ls-remote` output.
///
/// Lines look like `<hash>\t<ref>`. Only the exact ref matches, so
/// `refs/heads/feature/master` is not mistaken for `master`.
pub fn parse_ls_remote(output: &str, branch: &str) -> Option<String> {
    let wanted = format!("refs/heads/{branch}");
    output.lines().find_map(|line| {
        let (hash, reference) = line.split_once('\t')?;
        (reference.trim() == wanted).then(|| hash.trim().to_string())
    })
}

/// Split `git remote` output into remote names.
pub fn parse_remote_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Normalize git paths for Windows compatibility.
///
/// Git on Windows may return MSYS-style paths like `/c/Users/...` or forward-
/// slash paths like `C:/Users/...`. This function converts them to native
/// format.
fn normalize_git_path(path: &str) -> String {
    // On non-Windows, return as-is.
    if std::path::MAIN_SEPARATOR != '\\' {
        return path.to_string();
    }

    let path = path.trim();

    // Convert /c/Users/... to C:\Users\...
    if path.len() >= 3
        && path.as_bytes()[0] == b'/'
        && path.as_bytes()[2] == b'/'
        && path.as_bytes()[1].is_ascii_alphabetic()
    {
        let drive = path.as_bytes()[1].to_ascii_uppercase() as char;
        let rest = &path[2..];
        return format!("{drive}:{}", rest.replace('/', "\\"));
    }

    // Convert C:/Users/... to C:\Users\...
    path.replace('/', "\\")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
