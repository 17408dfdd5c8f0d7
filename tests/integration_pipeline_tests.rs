//! # Pipeline Integration Tests / 流水线集成测试
//!
//! Runs whole pipeline files: step ordering, stop-on-failure, parse errors
//! and cancellation between steps.
//!
//! 运行完整的流水线文件：步骤顺序、失败即停止、解析错误和取消。
#![cfg(unix)]

mod common;

use common::{current_matlab, workspace};
use matlab_runner::config::parse_pipeline;
use matlab_runner::core::{ErrorCategory, StepRecord, run_pipeline};
use matlab_runner::infra::log::MemoryLog;
use matlab_runner::reporting::{html::render_html_report, json::render_json_report};
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn pipeline(root: &str, steps: &str) -> matlab_runner::config::PipelineFile {
    let text = format!("matlabRoot = \"{}\"\n\n{}", root, steps);
    parse_pipeline(&text, Path::new("pipeline.toml")).unwrap()
}

#[tokio::test]
async fn test_steps_run_in_order() {
    let matlab = current_matlab();
    let ws = workspace();
    let file = pipeline(
        &matlab.root_str(),
        r#"
[[steps]]
step = "runMATLABCommand"
command = "disp('first')"

[[steps]]
step = "runMATLABCommand"
command = "disp('second')"
"#,
    );
    let mut log = MemoryLog::new();

    let outcome = run_pipeline(&file, ws.path(), &mut log, None).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.records.len(), 2);

    let lines = log.lines();
    let first = lines.iter().position(|l| l.contains("disp('first')")).unwrap();
    let second = lines.iter().position(|l| l.contains("disp('second')")).unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_first_failure_skips_the_rest() {
    let matlab = current_matlab();
    let ws = workspace();
    let file = pipeline(
        &matlab.root_str(),
        r#"
[[steps]]
step = "runMATLABCommand"
command = "apple"

[[steps]]
step = "runMATLABTests"
"#,
    );
    let mut log = MemoryLog::new();

    let outcome = run_pipeline(&file, ws.path(), &mut log, None).await;
    assert!(!outcome.is_success());
    assert_eq!(outcome.records.len(), 2);
    assert!(matches!(outcome.records[0], StepRecord::Completed(_)));
    assert!(matches!(&outcome.records[1], StepRecord::Skipped { step } if step == "runMATLABTests"));

    let html = render_html_report(&outcome, "en").into_string();
    assert!(html.contains("runMATLABTests"));
    assert!(html.contains("Unrecognized function or variable"));
    let json = render_json_report(&outcome).unwrap();
    assert!(json.contains("\"state\": \"skipped\""));
}

#[tokio::test]
async fn test_misspelled_step_fails_before_anything_runs() {
    let matlab = current_matlab();
    let ws = workspace();
    let file = pipeline(
        &matlab.root_str(),
        r#"
[[steps]]
step = "runMATLABCommand"
command = "disp('never')"

[[steps]]
step = "runMatlabCommand"
command = "version"
"#,
    );
    let mut log = MemoryLog::new();

    let outcome = run_pipeline(&file, ws.path(), &mut log, None).await;
    assert!(!outcome.is_success());
    assert!(matches!(outcome.records[0], StepRecord::Skipped { .. }));
    let failed = outcome.records[1].outcome().unwrap();
    assert_eq!(failed.step, "runMatlabCommand");
    let failure = failed.failure.as_ref().unwrap();
    assert_eq!(failure.category, ErrorCategory::Configuration);
    assert!(failure.message.contains("No such DSL method 'runMatlabCommand'"));
    assert!(!log.contains("disp('never')"));
}

#[tokio::test]
async fn test_unknown_parameter_is_a_configuration_error() {
    let ws = workspace();
    let file = pipeline(
        "/nonexistent",
        r#"
[[steps]]
step = "runMATLABTests"
testResultsPdf = "report.pdf"
"#,
    );

    let outcome = run_pipeline(&file, ws.path(), &mut MemoryLog::new(), None).await;
    let failure = outcome.records[0].outcome().unwrap().failure.clone().unwrap();
    assert_eq!(failure.category, ErrorCategory::Configuration);
    assert!(failure.message.contains("runMATLABTests"));
}

#[tokio::test]
async fn test_duplicate_tool_names_fail_the_pipeline() {
    let ws = workspace();
    let text = r#"
[[tools]]
name = "MATLAB"
home = "/opt/a"

[[tools]]
name = "MATLAB"
home = "/opt/b"

[[steps]]
step = "runMATLABCommand"
command = "version"
"#;
    let file = parse_pipeline(text, Path::new("pipeline.toml")).unwrap();

    let outcome = run_pipeline(&file, ws.path(), &mut MemoryLog::new(), None).await;
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].step(), "pipeline");
    assert!(matches!(outcome.records[1], StepRecord::Skipped { .. }));
}

#[tokio::test]
async fn test_cancelled_pipeline_skips_every_step() {
    let matlab = current_matlab();
    let ws = workspace();
    let file = pipeline(
        &matlab.root_str(),
        r#"
[[steps]]
step = "runMATLABCommand"
command = "version"
"#,
    );
    let token = CancellationToken::new();
    token.cancel();

    let outcome = run_pipeline(&file, ws.path(), &mut MemoryLog::new(), Some(token)).await;
    assert!(!outcome.is_success());
    assert!(matches!(outcome.records[0], StepRecord::Skipped { .. }));
}
