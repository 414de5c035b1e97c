//! `trackploy deploy` -- sync, show the staged changes, and with `--push`
//! run the full deployment.

use anyhow::Result;
use serde::Serialize;
use trackploy_config::DeploySettings;
use trackploy_core::ChangeSet;
use trackploy_deploy::{DeployOutcome, DeployReport, Deployer};
use trackploy_ui::prompt::confirm;
use trackploy_ui::styles::{render_bold, render_change_summary, render_hash, render_pass_icon};

use crate::cli::DeployArgs;
use crate::context::{RuntimeContext, open_repository, runner};
use crate::output::{output_json, print_change_set, print_phase};

/// JSON shape of a dry run.
#[derive(Serialize)]
struct Preview<'a> {
    base: &'a str,
    changes: &'a ChangeSet,
    pushed: bool,
}

/// Execute the `trackploy deploy` command.
pub fn run(ctx: &RuntimeContext, args: &DeployArgs) -> Result<()> {
    let settings = ctx.settings(&args.target)?;
    let mut deployer = build_deployer(ctx, &settings)?;

    if !args.push {
        let base = deployer.sync()?;
        let changes = deployer.preview()?;
        if ctx.json {
            output_json(&Preview {
                base: &base,
                changes: &changes,
                pushed: false,
            });
        } else if !ctx.quiet {
            print_change_set(&changes);
            if !changes.is_empty() {
                println!();
                println!("Run with --push to deploy these changes.");
            }
        }
        return Ok(());
    }

    let message = args.message.as_deref().or(settings.message.as_deref());
    let question = confirm_question(&settings);
    let interactive = !args.yes;
    let report = deployer.deploy(message, |changes| {
        if !interactive {
            return true;
        }
        // Keep stdout clean for the JSON report.
        if ctx.json {
            eprint!("{changes}");
        } else {
            print_change_set(changes);
        }
        eprintln!();
        // A prompt that cannot be read counts as a refusal.
        confirm(&question).unwrap_or(false)
    })?;

    if ctx.json {
        output_json(&report);
    } else if !ctx.quiet {
        print_report(&report);
    }
    Ok(())
}

/// Open the clone and wrap it in a deployer that reports progress.
pub fn build_deployer(ctx: &RuntimeContext, settings: &DeploySettings) -> Result<Deployer> {
    let repo = open_repository(ctx, settings)?;
    let deployer = Deployer::new(
        repo,
        settings.staging_dir.clone(),
        settings.mirror,
        runner(settings),
    );
    Ok(if ctx.show_progress() {
        deployer.with_observer(print_phase)
    } else {
        deployer
    })
}

fn confirm_question(settings: &DeploySettings) -> String {
    match &settings.backup_locator {
        Some(backup) => format!(
            "Push these changes to {} and {}?",
            settings.target_locator, backup
        ),
        None => format!("Push these changes to {}?", settings.target_locator),
    }
}

fn print_report(report: &DeployReport) {
    match &report.outcome {
        DeployOutcome::NothingToCommit => {
            println!(
                "Nothing to commit; target already matches the staged tree at {}.",
                render_hash(&report.base)
            );
        }
        DeployOutcome::Deployed { commit, pushed } => {
            println!(
                "{} Deployed {} ({}) to {}",
                render_pass_icon(),
                render_bold(&render_hash(commit)),
                render_change_summary(&report.changes),
                pushed.join(", ")
            );
        }
    }
}
