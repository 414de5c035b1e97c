//! End-to-end CLI integration tests for the `trackploy` binary.
//!
//! Each test builds its own temporary directory holding a bare repository
//! that stands in for the target, a staging tree, and a `trackploy.yaml`,
//! then runs the binary as a subprocess via `assert_cmd`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a `Command` targeting the cargo-built `trackploy` binary.
fn trackploy(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("trackploy").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("TRACKPLOY_CONFIG");
    cmd
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A project directory with a seeded bare target and a staging tree.
struct Project {
    dir: TempDir,
    target: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.git");
        fs::create_dir_all(&target).unwrap();
        git(&target, &["init", "--quiet", "--bare"]);
        git(&target, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        let seed = dir.path().join("seed");
        fs::create_dir_all(&seed).unwrap();
        git(&seed, &["init", "--quiet"]);
        git(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        write(&seed, "README", "deployed suites\n");
        git(&seed, &["add", "--all"]);
        git(
            &seed,
            &[
                "-c",
                "user.name=Seed",
                "-c",
                "user.email=seed@example.com",
                "commit",
                "--quiet",
                "-m",
                "seed",
            ],
        );
        let url = target.to_string_lossy().into_owned();
        git(&seed, &["push", "--quiet", &url, "HEAD:refs/heads/master"]);

        let staging = dir.path().join("staging");
        write(&staging, "suite.def", "suite s\n");
        write(&staging, "s/family/task.ecf", "echo hi\n");

        let config = format!(
            "stage: {}\nlocal: {}\ntarget-url: {}\ngit:\n  author-name: CI Deployer\n  author-email: ci@example.com\n",
            staging.display(),
            dir.path().join("clone").display(),
            target.display()
        );
        fs::write(dir.path().join("trackploy.yaml"), config).unwrap();

        Self { dir, target }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        trackploy(self.path())
    }

    fn target_tip(&self) -> String {
        git(&self.target, &["rev-parse", "refs/heads/master"])
    }
}

// ---------------------------------------------------------------------------
// Basics
// ---------------------------------------------------------------------------

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    trackploy(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn version_prints_name() {
    let tmp = TempDir::new().unwrap();
    trackploy(tmp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("trackploy version"));
}

#[test]
fn completion_generates_script() {
    let tmp = TempDir::new().unwrap();
    trackploy(tmp.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trackploy"));
}

#[test]
fn missing_settings_are_reported() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("empty.yaml");
    fs::write(&config, "message: nightly\n").unwrap();
    trackploy(tmp.path())
        .args(["--config", config.to_str().unwrap(), "diff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required setting 'stage'"));
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    trackploy(tmp.path())
        .args(["--config", "nope.yaml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn json_errors_are_objects() {
    let tmp = TempDir::new().unwrap();
    let output = trackploy(tmp.path())
        .args(["--json", "--config", "nope.yaml", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(json["error"].as_str().unwrap().contains("nope.yaml"));
}

// ---------------------------------------------------------------------------
// Deployment flow
// ---------------------------------------------------------------------------

#[test]
fn dry_run_shows_changes_without_pushing() {
    let project = Project::new();
    let before = project.target_tip();

    project
        .cmd()
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("Added:"))
        .stdout(predicate::str::contains("s/family/task.ecf"))
        .stdout(predicate::str::contains("Removed:"))
        .stdout(predicate::str::contains("Run with --push"));

    assert_eq!(project.target_tip(), before);
    assert!(project.path().join("clone/README").is_file());
}

#[test]
fn push_deploys_then_nothing_to_commit() {
    let project = Project::new();
    let before = project.target_tip();

    project
        .cmd()
        .args(["deploy", "--push", "--yes", "-m", "first rollout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deployed"));

    let after = project.target_tip();
    assert_ne!(after, before);
    let message = git(&project.target, &["log", "-1", "--format=%B", "master"]);
    assert!(message.starts_with("deployed by "), "{message}");
    assert!(message.ends_with("first rollout"), "{message}");
    let author = git(&project.target, &["log", "-1", "--format=%an <%ae>", "master"]);
    assert_eq!(author, "CI Deployer <ci@example.com>");

    let output = project
        .cmd()
        .args(["--json", "deploy", "--push", "--yes"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"], "nothing-to-commit");
    assert_eq!(report["base"], after.as_str());
    assert_eq!(project.target_tip(), after);
}

#[test]
fn declining_the_prompt_aborts() {
    let project = Project::new();
    let before = project.target_tip();

    project
        .cmd()
        .args(["deploy", "--push"])
        .write_stdin("y\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("deployment declined"));

    assert_eq!(project.target_tip(), before);
}

#[test]
fn accepting_the_prompt_deploys() {
    let project = Project::new();
    let before = project.target_tip();

    project
        .cmd()
        .args(["deploy", "--push"])
        .write_stdin("Y\n")
        .assert()
        .success();

    assert_ne!(project.target_tip(), before);
}

#[test]
fn diff_json_lists_buckets() {
    let project = Project::new();
    let output = project.cmd().args(["--json", "diff"]).output().unwrap();
    assert!(output.status.success());
    let changes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        changes["added"],
        serde_json::json!(["s/family/task.ecf", "suite.def"])
    );
    assert_eq!(changes["removed"], serde_json::json!(["README"]));
    assert_eq!(changes["modified"], serde_json::json!([]));
}

#[test]
fn status_reports_agreement() {
    let project = Project::new();
    project.cmd().arg("diff").assert().success();

    let output = project.cmd().args(["--json", "status"]).output().unwrap();
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["in_sync"], true);
    assert_eq!(status["target"], project.target_tip().as_str());
}

#[test]
fn status_without_clone_is_an_error() {
    let project = Project::new();
    project
        .cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has not been created yet"));

    let clone = project.path().join("clone");
    fs::create_dir_all(&clone).unwrap();
    project
        .cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has not been created yet"));
    assert_eq!(fs::read_dir(&clone).unwrap().count(), 0);
}

#[test]
fn out_of_sync_target_is_caught() {
    let project = Project::new();
    project.cmd().arg("diff").assert().success();

    // Someone rewrites the clone's history locally: the clone is now ahead
    // of the target, which a pull cannot fix.
    let clone = project.path().join("clone");
    write(&clone, "local-only", "x");
    git(&clone, &["add", "--all"]);
    git(
        &clone,
        &[
            "-c",
            "user.name=Someone",
            "-c",
            "user.email=someone@example.com",
            "commit",
            "--quiet",
            "-m",
            "local only",
        ],
    );

    project
        .cmd()
        .args(["deploy", "--push", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of sync"));
}

#[test]
fn check_passes_for_reachable_target() {
    let project = Project::new();
    project
        .cmd()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("2/2 checks passed"));
}

#[test]
fn check_fails_for_missing_staging() {
    let project = Project::new();
    fs::remove_dir_all(project.path().join("staging")).unwrap();
    project
        .cmd()
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("does not exist"));
}

#[test]
fn config_init_and_show() {
    let tmp = TempDir::new().unwrap();
    trackploy(tmp.path())
        .args(["config", "init", "--stage", "/data/stage", "--target", "/srv/suite"])
        .assert()
        .success();
    assert!(tmp.path().join("trackploy.yaml").is_file());

    trackploy(tmp.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    trackploy(tmp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stage: /data/stage"))
        .stdout(predicate::str::contains("timeout-secs: 300"));
}
