//! Paging of long change sets.
//!
//! A diff over a large suite can list thousands of paths. A change set
//! taller than the terminal is handed to a pager; anything else, and all
//! output that is not going to a terminal, is printed as is.

use std::env;
use std::io::Write;
use std::process::{Command, Stdio};

use trackploy_core::ChangeSet;

use crate::styles::render_change_set;
use crate::terminal::{is_tty, terminal_height};

/// Set to any value to never page.
pub const NO_PAGER_ENV: &str = "TRACKPLOY_NO_PAGER";

/// Pager command line, taking precedence over `$PAGER`.
pub const PAGER_ENV: &str = "TRACKPLOY_PAGER";

/// Used when neither variable names a pager. `-F` quits at once when the
/// text fits after all, `-R` keeps the colours, `-X` leaves it on screen.
const DEFAULT_PAGER: &[&str] = &["less", "-FRX"];

/// Where a rendered change set is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    /// Program and arguments of the pager.
    Pager(Vec<String>),
}

/// Rows `changes` occupies once rendered: a header per non-empty section and
/// a row per path, or the single "No changes." row.
pub fn rendered_rows(changes: &ChangeSet) -> usize {
    if changes.is_empty() {
        return 1;
    }
    changes
        .sections()
        .iter()
        .filter(|(_, paths)| !paths.is_empty())
        .map(|(_, paths)| paths.len() + 1)
        .sum()
}

/// Pick the destination for `rows` rows of output.
///
/// `screen_rows` is `None` when stdout is not a terminal or its size is
/// unknown. One row is left for the shell prompt.
pub fn destination(
    rows: usize,
    screen_rows: Option<usize>,
    disabled: bool,
    pager: Option<&str>,
) -> Destination {
    let fits = match screen_rows {
        Some(height) if height > 0 => rows < height,
        _ => true,
    };
    if disabled || fits {
        return Destination::Stdout;
    }

    let argv: Vec<String> = match pager.map(str::split_whitespace) {
        Some(words) => words.map(str::to_string).collect(),
        None => Vec::new(),
    };
    if argv.is_empty() {
        Destination::Pager(DEFAULT_PAGER.iter().map(|s| s.to_string()).collect())
    } else {
        Destination::Pager(argv)
    }
}

/// Print `changes`, through a pager when it does not fit on screen.
pub fn page_change_set(changes: &ChangeSet) {
    let screen_rows = is_tty().then(terminal_height);
    let pager = env::var(PAGER_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .or_else(|| env::var("PAGER").ok());
    let target = destination(
        rendered_rows(changes),
        screen_rows,
        env::var_os(NO_PAGER_ENV).is_some(),
        pager.as_deref(),
    );

    let text = render_change_set(changes);
    match target {
        Destination::Stdout => print!("{text}"),
        Destination::Pager(argv) => {
            if !run_pager(&argv, &text) {
                print!("{text}");
            }
        }
    }
}

/// Feed `text` to the pager. Returns `false` if it could not be started.
fn run_pager(argv: &[String], text: &str) -> bool {
    let Some((program, args)) = argv.split_first() else {
        return false;
    };
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn();
    let Ok(mut child) = child else {
        return false;
    };
    if let Some(mut stdin) = child.stdin.take() {
        // The user may quit before reading everything.
        let _ = stdin.write_all(text.as_bytes());
    }
    let _ = child.wait();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn changes(added: usize, removed: usize) -> ChangeSet {
        ChangeSet {
            added: (0..added).map(|i| PathBuf::from(format!("a{i}.ecf"))).collect(),
            removed: (0..removed).map(|i| PathBuf::from(format!("r{i}.ecf"))).collect(),
            modified: Vec::new(),
        }
    }

    #[test]
    fn rows_match_plain_rendering() {
        for set in [changes(0, 0), changes(3, 0), changes(2, 5)] {
            assert_eq!(rendered_rows(&set), set.to_string().lines().count());
        }
    }

    #[test]
    fn short_change_set_goes_to_stdout() {
        assert_eq!(destination(10, Some(40), false, None), Destination::Stdout);
    }

    #[test]
    fn no_terminal_never_pages() {
        assert_eq!(destination(10_000, None, false, None), Destination::Stdout);
        assert_eq!(destination(10_000, Some(0), false, None), Destination::Stdout);
    }

    #[test]
    fn disabled_never_pages() {
        assert_eq!(destination(100, Some(20), true, Some("more")), Destination::Stdout);
    }

    #[test]
    fn tall_change_set_uses_configured_pager() {
        assert_eq!(
            destination(100, Some(20), false, Some("most -s")),
            Destination::Pager(vec!["most".into(), "-s".into()])
        );
    }

    #[test]
    fn blank_pager_falls_back_to_less() {
        assert_eq!(
            destination(20, Some(20), false, Some("  ")),
            Destination::Pager(vec!["less".into(), "-FRX".into()])
        );
    }
}
