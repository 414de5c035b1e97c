//! Colour theme and render helpers for trackploy output.
//!
//! Uses the Ayu Dark palette. Only states that need attention get colour:
//! removals and failures are red, additions and passing checks green,
//! modifications and warnings yellow. Everything else is plain text.

use owo_colors::OwoColorize;
use trackploy_core::ChangeSet;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_WARN: &str = "\u{26A0}"; // ⚠
pub const ICON_FAIL: &str = "\u{2716}"; // ✖

/// Length of abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Helper: apply truecolor only when color is supported
// ---------------------------------------------------------------------------

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Core semantic render helpers
// ---------------------------------------------------------------------------

pub fn render_pass(s: &str) -> String {
    color_str(s, PASS)
}

pub fn render_warn(s: &str) -> String {
    color_str(s, WARN)
}

pub fn render_fail(s: &str) -> String {
    color_str(s, FAIL)
}

pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED)
}

pub fn render_accent(s: &str) -> String {
    color_str(s, ACCENT)
}

/// Renders text in bold.
pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// Renders a section header in accent color and bold.
pub fn render_header(s: &str) -> String {
    color_bold_str(s, ACCENT)
}

pub fn render_pass_icon() -> String {
    color_str(ICON_PASS, PASS)
}

pub fn render_warn_icon() -> String {
    color_str(ICON_WARN, WARN)
}

pub fn render_fail_icon() -> String {
    color_str(ICON_FAIL, FAIL)
}

// ---------------------------------------------------------------------------
// Domain rendering
// ---------------------------------------------------------------------------

/// Abbreviate a commit hash and mute it.
pub fn render_hash(hash: &str) -> String {
    let short: String = hash.chars().take(SHORT_HASH_LEN).collect();
    render_muted(&short)
}

/// One line per check result: icon, then the label.
pub fn render_check(passed: bool, label: &str) -> String {
    if passed {
        format!("{} {}", render_pass_icon(), label)
    } else {
        format!("{} {}", render_fail_icon(), render_fail(label))
    }
}

/// Render a change set grouped by section, coloured by kind.
///
/// Without colour support the output equals the change set's `Display`.
pub fn render_change_set(changes: &ChangeSet) -> String {
    if changes.is_empty() {
        return format!("{}\n", render_muted("No changes."));
    }

    let mut out = String::new();
    for (label, paths) in changes.sections() {
        if paths.is_empty() {
            continue;
        }
        let paint: fn(&str) -> String = match label {
            "Removed" => render_fail,
            "Added" => render_pass,
            _ => render_warn,
        };
        out.push_str(&render_header(&format!("{label}:")));
        out.push('\n');
        for path in paths {
            out.push_str("  - ");
            out.push_str(&paint(&path.display().to_string()));
            out.push('\n');
        }
    }
    out
}

/// One-line count summary, e.g. `2 added, 1 removed, 0 modified`.
pub fn render_change_summary(changes: &ChangeSet) -> String {
    format!(
        "{} added, {} removed, {} modified",
        changes.added.len(),
        changes.removed.len(),
        changes.modified.len()
    )
}
