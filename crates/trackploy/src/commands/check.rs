//! `trackploy check` -- confirm the deployment endpoints exist before a run.

use std::path::Path;

use anyhow::{Result, bail};
use serde::Serialize;
use trackploy_config::DeploySettings;
use trackploy_core::RemoteHandle;
use trackploy_git::DEPLOY_BRANCH;
use trackploy_git::commands::git_command;
use trackploy_git::gitdir::parse_ls_remote;
use trackploy_ui::styles::render_check;

use crate::cli::TargetArgs;
use crate::context::{RuntimeContext, local_handle, runner, ssh_handle};
use crate::output::output_json;

/// Result of a single check.
#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    passed: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    detail: String,
}

impl CheckResult {
    fn new(name: impl Into<String>, outcome: Result<bool, String>, failure: &str) -> Self {
        let (passed, detail) = match outcome {
            Ok(true) => (true, String::new()),
            Ok(false) => (false, failure.to_string()),
            Err(e) => (false, e),
        };
        Self {
            name: name.into(),
            passed,
            detail,
        }
    }
}

/// Overall check results.
#[derive(Serialize)]
struct CheckReport {
    checks: Vec<CheckResult>,
    passed: bool,
    summary: String,
}

/// Execute the `trackploy check` command.
pub fn run(ctx: &RuntimeContext, args: &TargetArgs) -> Result<()> {
    let settings = ctx.settings(args)?;
    let checks = run_checks(&settings);

    let passed_count = checks.iter().filter(|c| c.passed).count();
    let passed = passed_count == checks.len();
    let summary = format!("{passed_count}/{} checks passed", checks.len());

    if ctx.json {
        output_json(&CheckReport {
            checks,
            passed,
            summary: summary.clone(),
        });
    } else {
        for check in &checks {
            println!("{}", render_check(check.passed, &check.name));
            if !check.detail.is_empty() {
                for line in check.detail.lines() {
                    println!("    {line}");
                }
            }
        }
        if !ctx.quiet {
            println!();
            println!("{summary}");
        }
    }

    if !passed {
        bail!("{summary}");
    }
    Ok(())
}

fn run_checks(settings: &DeploySettings) -> Vec<CheckResult> {
    let local = local_handle(settings);
    let mut checks = vec![CheckResult::new(
        format!("staging directory {}", settings.staging_dir.display()),
        local.path_exists(&settings.staging_dir).map_err(|e| e.to_string()),
        "does not exist",
    )];

    // The SSH check only applies to a target addressed by host and path.
    if let (Some(path), None) = (&settings.target_path, target_url_override(settings)) {
        let ssh = ssh_handle(settings);
        let git_dir = Path::new(path).join(".git");
        checks.push(CheckResult::new(
            format!("git repository {path} on {}", ssh.describe()),
            ssh.path_exists(&git_dir).map_err(|e| e.to_string()),
            "no .git directory at that path",
        ));
    }

    checks.push(branch_check("target", &settings.target_locator, settings));
    if let Some(backup) = &settings.backup_locator {
        checks.push(branch_check("backup", backup, settings));
    }
    checks
}

/// The target URL when it does not come from the ssh locator.
fn target_url_override(settings: &DeploySettings) -> Option<&str> {
    let built = settings.target_path.as_deref().map(|path| {
        trackploy_config::config::ssh_locator(&settings.target_user, &settings.target_host, path)
    });
    (built.as_deref() != Some(settings.target_locator.as_str()))
        .then_some(settings.target_locator.as_str())
}

fn branch_check(name: &str, locator: &str, settings: &DeploySettings) -> CheckResult {
    let cwd = std::env::temp_dir();
    let outcome = git_command(
        &runner(settings),
        &["ls-remote", "--heads", locator, DEPLOY_BRANCH],
        &cwd,
    )
    .map(|out| parse_ls_remote(&out, DEPLOY_BRANCH).is_some())
    .map_err(|e| e.to_string());
    CheckResult::new(
        format!("{name} {locator} has branch {DEPLOY_BRANCH}"),
        outcome,
        "branch not found",
    )
}
