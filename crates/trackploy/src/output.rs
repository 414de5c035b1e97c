//! Output formatting helpers for the `trackploy` CLI.
//!
//! Provides JSON output, simple tables, and human-readable change sets.

use std::io::{self, Write};

use serde::Serialize;
use trackploy_core::ChangeSet;
use trackploy_deploy::Phase;
use trackploy_ui::pager::page_change_set;
use trackploy_ui::styles::render_muted;

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple table with headers and rows.
///
/// Column widths are computed from the data for alignment. Cells must not
/// contain escape sequences, or the padding will be off.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = write!(handle, "{}", format_table(headers, rows, &widths));
}

fn format_table(headers: &[&str], rows: &[Vec<String>], widths: &[usize]) -> String {
    let separators: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = format_row(headers.iter().copied(), widths);
    out.push_str(&format_row(separators.iter().map(String::as_str), widths));
    for row in rows {
        out.push_str(&format_row(row.iter().map(String::as_str), widths));
    }
    out
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let parts: Vec<String> = cells
        .enumerate()
        .map(|(i, cell)| match widths.get(i) {
            Some(w) => format!("{:<width$}", cell, width = *w),
            None => cell.to_string(),
        })
        .collect();
    format!("{}\n", parts.join("  ").trim_end())
}

/// Print a change set, paging it when it does not fit on screen.
pub fn print_change_set(changes: &ChangeSet) {
    page_change_set(changes);
}

/// Print one progress line for a protocol phase to stderr.
pub fn print_phase(phase: Phase) {
    eprintln!("{}", render_muted(&format!("==> {phase}")));
}
