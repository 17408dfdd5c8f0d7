//! # CLI Tests / 命令行测试
//!
//! Runs the `matlab-runner` binary the way a CI job would and checks exit
//! codes and console output.
//!
//! 以 CI 作业的方式运行 `matlab-runner` 二进制文件，检查退出码和控制台输出。

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn runner() -> Command {
    let mut cmd = Command::cargo_bin("matlab-runner").unwrap();
    cmd.arg("--lang").arg("en").env_remove("MATLAB_ROOT");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    runner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("command"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_help_follows_the_language_flag() {
    Command::cargo_bin("matlab-runner")
        .unwrap()
        .args(["--lang", "zh-CN", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("创建新的流水线文件"));
}

#[test]
fn test_init_writes_a_runnable_template() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("ci").join("matlab-pipeline.toml");

    runner()
        .args(["init", "--non-interactive", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created pipeline file"));

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("runMATLABCommand"));
    assert!(written.contains("runMATLABTests"));

    // A second run must not clobber the file.
    runner()
        .args(["init", "--non-interactive", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempdir().unwrap();
    runner()
        .args(["run", "--config"])
        .arg(dir.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read pipeline file"));
}

#[test]
fn test_unknown_step_fails_with_dsl_message() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pipeline.toml");
    fs::write(&config, "[[steps]]\nstep = \"runMatlabCommand\"\ncommand = \"version\"\n").unwrap();

    runner()
        .args(["run", "--config"])
        .arg(&config)
        .arg("--workspace")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("No such DSL method 'runMatlabCommand'"))
        .stderr(predicate::str::contains("Pipeline failed"));
}

#[test]
fn test_empty_pipeline_succeeds() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pipeline.toml");
    fs::write(&config, "language = \"en\"\n").unwrap();

    runner()
        .args(["run", "--config"])
        .arg(&config)
        .arg("--workspace")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No steps to run."));
}

#[cfg(unix)]
#[test]
fn test_run_with_reports() {
    let matlab = common::current_matlab();
    let ws = common::workspace();
    let config = ws.path().join("matlab-pipeline.toml");
    fs::write(
        &config,
        format!(
            "matlabRoot = \"{}\"\n\n[[steps]]\nstep = \"runMATLABCommand\"\ncommand = \"disp('from ci')\"\n",
            matlab.root_str()
        ),
    )
    .unwrap();
    let html = ws.path().join("report.html");
    let json = ws.path().join("report.json");

    runner()
        .current_dir(ws.path())
        .args(["run", "--html"])
        .arg(&html)
        .arg("--json")
        .arg(&json)
        .assert()
        .success()
        .stdout(predicate::str::contains("disp('from ci')"))
        .stdout(predicate::str::contains("All steps passed!"));

    assert!(fs::read_to_string(&html).unwrap().contains("runMATLABCommand"));
    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["records"][0]["status"], "Success");
}

#[cfg(unix)]
#[test]
fn test_command_subcommand_uses_matlab_root_variable() {
    let matlab = common::current_matlab();
    let ws = common::workspace();

    runner()
        .args(["command", "apple", "--workspace"])
        .arg(ws.path())
        .env("MATLAB_ROOT", matlab.root())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unrecognized function or variable 'apple'."));

    runner()
        .args(["command", "version", "--matlab-root"])
        .arg(matlab.root())
        .arg("--workspace")
        .arg(ws.path())
        .assert()
        .success();
}
