//! Discovery of the `trackploy.yaml` configuration file.
//!
//! A deployment is usually run from inside (or below) the directory that
//! holds its `trackploy.yaml`, so the file is found by walking up from the
//! working directory, the same way git finds `.git`.

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "trackploy.yaml";

/// Walk up the directory tree from `start` looking for `trackploy.yaml`.
///
/// Returns the path to the file if found, or `None` if the filesystem root
/// is reached without finding one.
///
/// # Examples
///
/// ```no_run
/// use trackploy_config::config_file::find_config_file;
/// use std::path::Path;
///
/// if let Some(path) = find_config_file(Path::new(".")) {
///     println!("Using {}", path.display());
/// }
/// ```
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    // Canonicalize the start path so we get absolute paths.
    let start = start.canonicalize().ok()?;

    let mut current = start.as_path();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent;
            }
            _ => break, // Reached filesystem root.
        }
    }

    None
}

/// Pick the configuration file to load.
///
/// An explicit path must exist. Without one, the directory tree above
/// `start` is searched and a missing file is not an error.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if `explicit` names a file that does
/// not exist.
pub fn locate_config_file(
    explicit: Option<&Path>,
    start: &Path,
) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(ConfigError::NotFound(path.to_path_buf())),
        None => Ok(find_config_file(start)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
