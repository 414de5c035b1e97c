//! `trackploy status` -- tips of the local clone, target and backup.
//!
//! Nothing is pulled or cloned, and the working tree is left alone. Opening
//! the clone may still register or re-point its `backup` remote, which
//! fetches both remotes to check that they agree.

use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use serde::Serialize;
use trackploy_git::TipSnapshot;
use trackploy_ui::styles::{render_accent, render_pass_icon, render_warn, render_warn_icon};

use crate::cli::TargetArgs;
use crate::context::{RuntimeContext, open_repository};
use crate::output::{output_json, output_table};

#[derive(Serialize)]
struct StatusView<'a> {
    #[serde(flatten)]
    tips: &'a TipSnapshot,
    in_sync: bool,
}

/// A missing or empty directory would make opening the set clone into it.
fn has_clone(local_dir: &Path) -> bool {
    fs::read_dir(local_dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Execute the `trackploy status` command.
pub fn run(ctx: &RuntimeContext, args: &TargetArgs) -> Result<()> {
    let settings = ctx.settings(args)?;
    if !has_clone(&settings.local_dir) {
        bail!(
            "local clone {} has not been created yet\nHint: run 'trackploy diff' to create it",
            settings.local_dir.display()
        );
    }

    let repo = open_repository(ctx, &settings)?;
    let tips = repo.snapshot()?;
    let in_sync = tips.in_sync();

    if ctx.json {
        output_json(&StatusView {
            tips: &tips,
            in_sync,
        });
        return Ok(());
    }

    let mut rows = vec![
        vec!["local".to_string(), tips.local.clone(), repo.local_dir().display().to_string()],
        vec!["target".to_string(), tips.target.clone(), settings.target_locator.clone()],
    ];
    if let (Some(hash), Some(url)) = (&tips.backup, &settings.backup_locator) {
        rows.push(vec!["backup".to_string(), hash.clone(), url.clone()]);
    }
    output_table(&["COPY", "COMMIT", "LOCATION"], &rows);
    println!();

    if in_sync {
        println!("{} all copies at the same commit", render_pass_icon());
    } else {
        println!(
            "{} {}; the next deployment will {}",
            render_warn_icon(),
            render_warn("copies disagree"),
            render_accent("pull the target and re-check")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_directory_is_not_a_clone() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_clone(&dir.path().join("absent")));
        assert!(!has_clone(dir.path()));

        fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(has_clone(dir.path()));
    }
}
