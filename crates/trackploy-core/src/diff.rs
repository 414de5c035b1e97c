//! Structural comparison of a staged tree against a deployed tree.
//!
//! [`diff_trees`] walks both roots side by side and classifies every file path
//! as added, removed or modified. Paths are relative to their root, so trees
//! living at different absolute locations compare cleanly. A directory that
//! exists on one side only is expanded into the files it contains.
//!
//! The comparison is read-only and used for reporting; it never decides
//! whether a deployment proceeds.

use std::cmp::Ordering;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

/// Version-control metadata directories skipped by every tree operation.
pub const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Returns `true` if `name` is a version-control metadata directory name.
pub fn is_vcs_dir(name: &str) -> bool {
    VCS_DIRS.contains(&name)
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// Result of one diff pass. Each list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl ChangeSet {
    /// Returns `true` if the two trees were identical.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// The three buckets with their display labels, in report order.
    pub fn sections(&self) -> [(&'static str, &[PathBuf]); 3] {
        [
            ("Removed", &self.removed),
            ("Added", &self.added),
            ("Modified", &self.modified),
        ]
    }

    fn sort(&mut self) {
        self.added.sort();
        self.removed.sort();
        self.modified.sort();
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No changes.");
        }
        for (label, paths) in self.sections() {
            if paths.is_empty() {
                continue;
            }
            writeln!(f, "{label}:")?;
            for path in paths {
                writeln!(f, "  - {}", path.display())?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Dir,
}

/// Compare `staged` against `deployed`.
///
/// A missing `deployed` root counts as an empty tree, so a first deployment
/// reports every staged file as added.
///
/// # Errors
///
/// Returns an I/O error if `staged` does not exist or any entry cannot be
/// read.
pub fn diff_trees(staged: &Path, deployed: &Path) -> io::Result<ChangeSet> {
    if !staged.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("staging directory {} does not exist", staged.display()),
        ));
    }

    let mut changes = ChangeSet::default();
    if deployed.is_dir() {
        compare_dirs(staged, deployed, Path::new(""), &mut changes)?;
    } else {
        expand_into(staged, Path::new(""), &mut changes.added)?;
    }
    changes.sort();
    Ok(changes)
}

fn compare_dirs(left: &Path, right: &Path, rel: &Path, changes: &mut ChangeSet) -> io::Result<()> {
    let left_entries = list_dir(&left.join(rel))?;
    let right_entries = list_dir(&right.join(rel))?;

    let (mut i, mut j) = (0, 0);
    while i < left_entries.len() || j < right_entries.len() {
        let order = match (left_entries.get(i), right_entries.get(j)) {
            (Some((ln, _)), Some((rn, _))) => ln.cmp(rn),
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Greater,
        };

        match order {
            Ordering::Less => {
                let (name, kind) = &left_entries[i];
                record_one_side(left, &rel.join(name), *kind, &mut changes.added)?;
                i += 1;
            }
            Ordering::Greater => {
                let (name, kind) = &right_entries[j];
                record_one_side(right, &rel.join(name), *kind, &mut changes.removed)?;
                j += 1;
            }
            Ordering::Equal => {
                let (name, lk) = &left_entries[i];
                let rk = right_entries[j].1;
                let path = rel.join(name);
                match (*lk, rk) {
                    (Kind::Dir, Kind::Dir) => compare_dirs(left, right, &path, changes)?,
                    (Kind::File, Kind::File) => {
                        if files_differ(&left.join(&path), &right.join(&path))? {
                            changes.modified.push(path);
                        }
                    }
                    // A file replaced by a directory (or the reverse).
                    (lk, rk) => {
                        record_one_side(right, &path, rk, &mut changes.removed)?;
                        record_one_side(left, &path, lk, &mut changes.added)?;
                    }
                }
                i += 1;
                j += 1;
            }
        }
    }
    Ok(())
}

fn record_one_side(root: &Path, rel: &Path, kind: Kind, out: &mut Vec<PathBuf>) -> io::Result<()> {
    match kind {
        Kind::File => out.push(rel.to_path_buf()),
        Kind::Dir => expand_into(root, rel, out)?,
    }
    Ok(())
}

/// Push every file below `root/rel` onto `out`, relative to `root`.
fn expand_into(root: &Path, rel: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let walker = WalkDir::new(root.join(rel))
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && is_vcs_dir(&e.file_name().to_string_lossy())));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?;
        out.push(relative.to_path_buf());
    }
    Ok(())
}

/// Sorted `(name, kind)` entries of `dir`, without version-control metadata.
fn list_dir(dir: &Path) -> io::Result<Vec<(String, Kind)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follow symlinks the way the walker does.
        let kind = if fs::metadata(entry.path())?.is_dir() {
            Kind::Dir
        } else {
            Kind::File
        };
        if kind == Kind::Dir && is_vcs_dir(&name) {
            continue;
        }
        entries.push((name, kind));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Byte-for-byte comparison, short-circuiting on length and on the
/// executable bit (the only permission git records).
pub(crate) fn files_differ(a: &Path, b: &Path) -> io::Result<bool> {
    let (meta_a, meta_b) = (fs::metadata(a)?, fs::metadata(b)?);
    if meta_a.len() != meta_b.len() || is_executable(&meta_a) != is_executable(&meta_b) {
        return Ok(true);
    }

    let mut ra = BufReader::new(File::open(a)?);
    let mut rb = BufReader::new(File::open(b)?);
    let mut ba = [0u8; 8192];
    let mut bb = [0u8; 8192];
    loop {
        let na = read_full(&mut ra, &mut ba)?;
        let nb = read_full(&mut rb, &mut bb)?;
        if na != nb || ba[..na] != bb[..nb] {
            return Ok(true);
        }
        if na == 0 {
            return Ok(false);
        }
    }
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            write(dir.path(), rel, content);
        }
        dir
    }

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    const SUITE: &[(&str, &str)] = &[
        ("suite.def", "suite s\nendsuite\n"),
        ("family/a.ecf", "echo a\n"),
        ("family/b.ecf", "echo b\n"),
        ("include/head.h", "#!/bin/sh\n"),
    ];

    #[test]
    fn identical_trees_produce_empty_changeset() {
        let a = tree(SUITE);
        let b = tree(SUITE);
        let changes = diff_trees(a.path(), b.path()).unwrap();
        assert!(changes.is_empty());
        assert_eq!(changes.len(), 0);
    }

    #[test]
    fn tree_compared_with_itself_is_empty() {
        let a = tree(SUITE);
        assert_eq!(diff_trees(a.path(), a.path()).unwrap(), ChangeSet::default());
    }

    #[test]
    fn single_content_change_is_modified_only() {
        let staged = tree(SUITE);
        let deployed = tree(SUITE);
        write(staged.path(), "family/b.ecf", "echo B\n");

        let changes = diff_trees(staged.path(), deployed.path()).unwrap();
        assert_eq!(
            changes,
            ChangeSet {
                modified: paths(&["family/b.ecf"]),
                ..Default::default()
            }
        );
    }

    #[test]
    fn new_directory_expands_to_its_files() {
        let staged = tree(SUITE);
        let deployed = tree(SUITE);
        write(staged.path(), "extra/one.ecf", "1");
        write(staged.path(), "extra/nested/two.ecf", "2");
        write(staged.path(), "extra/nested/three.ecf", "3");

        let changes = diff_trees(staged.path(), deployed.path()).unwrap();
        assert_eq!(
            changes.added,
            paths(&["extra/nested/three.ecf", "extra/nested/two.ecf", "extra/one.ecf"])
        );
        assert!(changes.removed.is_empty());
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn directory_only_in_deployed_expands_to_removed_files() {
        let staged = tree(&[("suite.def", "x")]);
        let deployed = tree(&[("suite.def", "x"), ("old/a.ecf", "a"), ("old/deep/b.ecf", "b")]);

        let changes = diff_trees(staged.path(), deployed.path()).unwrap();
        assert_eq!(changes.removed, paths(&["old/a.ecf", "old/deep/b.ecf"]));
        assert!(changes.added.is_empty());
    }

    #[test]
    fn every_path_lands_in_exactly_one_bucket() {
        let staged = tree(&[("keep", "same"), ("edit", "new"), ("fresh", "1"), ("swap/inner", "d")]);
        let deployed = tree(&[("keep", "same"), ("edit", "old"), ("gone", "0"), ("swap", "f")]);

        let changes = diff_trees(staged.path(), deployed.path()).unwrap();
        assert_eq!(changes.added, paths(&["fresh", "swap/inner"]));
        assert_eq!(changes.removed, paths(&["gone", "swap"]));
        assert_eq!(changes.modified, paths(&["edit"]));

        let mut all: Vec<_> = changes
            .added
            .iter()
            .chain(&changes.removed)
            .chain(&changes.modified)
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn vcs_metadata_is_ignored() {
        let staged = tree(&[("suite.def", "x")]);
        let deployed = tree(&[("suite.def", "x"), (".git/HEAD", "ref: refs/heads/master")]);
        write(staged.path(), "family/.git/config", "[core]");

        let changes = diff_trees(staged.path(), deployed.path()).unwrap();
        assert!(changes.is_empty(), "unexpected changes: {changes:?}");
    }

    #[test]
    fn missing_deployed_root_reports_everything_added() {
        let staged = tree(&[("a", "1"), ("dir/b", "2"), ("dir/c", "3")]);
        let missing = staged.path().join("does-not-exist");

        let changes = diff_trees(staged.path(), &missing).unwrap();
        assert_eq!(changes.added, paths(&["a", "dir/b", "dir/c"]));
    }

    #[test]
    fn missing_staged_root_is_an_error() {
        let deployed = tree(&[("a", "1")]);
        let err = diff_trees(&deployed.path().join("nope"), deployed.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn same_length_different_bytes_are_detected() {
        let a = tree(&[("f", "abcd")]);
        let b = tree(&[("f", "abce")]);
        assert!(files_differ(&a.path().join("f"), &b.path().join("f")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_change_is_modified() {
        use std::os::unix::fs::PermissionsExt;

        let staged = tree(&[("s/run.ecf", "echo hi")]);
        let deployed = tree(&[("s/run.ecf", "echo hi")]);
        let script = staged.path().join("s/run.ecf");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let changes = diff_trees(staged.path(), deployed.path()).unwrap();
        assert_eq!(changes.modified, paths(&["s/run.ecf"]));
    }

    #[test]
    fn display_lists_sections_in_report_order() {
        let changes = ChangeSet {
            added: paths(&["new.ecf"]),
            removed: paths(&["old.ecf"]),
            modified: paths(&["suite.def", "family/a.ecf"]),
        };
        insta::assert_snapshot!(changes.to_string(), @r"
        Removed:
          - old.ecf
        Added:
          - new.ecf
        Modified:
          - suite.def
          - family/a.ecf
        ");
    }

    #[test]
    fn display_of_empty_changeset() {
        assert_eq!(ChangeSet::default().to_string(), "No changes.\n");
    }
}
