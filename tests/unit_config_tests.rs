//! # Configuration and Validation Unit Tests / 配置与验证单元测试
//!
//! Tests pipeline file parsing, step construction and parameter validation
//! without launching MATLAB.
//!
//! 测试流水线文件解析、步骤构建和参数验证，不启动 MATLAB。

use matlab_runner::config::{DEFAULT_PIPELINE_FILE, load_pipeline, parse_pipeline};
use matlab_runner::core::{
    Error, ErrorCategory, Step,
    steps::StepKind,
    validation::{validate_command, validate_tests},
};
use matlab_runner::infra::fs::TargetOs;
use matlab_runner::models::{ArtifactKind, OutputArtifactSpec, Selector};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn step(text: &str) -> Result<Step, Error> {
    let table: toml::Table = toml::from_str(text).unwrap();
    Step::from_table(&table)
}

#[test]
fn test_full_pipeline_file_parses() {
    let text = r#"
language = "zh-CN"
matlabRoot = "/opt/matlab/R2023a"
tool = "MATLAB_R2023a"

[environment]
LM_LICENSE_FILE = "27000@license"

[[tools]]
name = "MATLAB_R2023a"
home = "/opt/matlab/R2023a"

[settings]
logTailLines = 50
failureMarkers = ["No such DSL method", "License checkout failed"]
extraMarkers = ["tmp_driver"]

[[steps]]
step = "runMATLABTests"
sourceFolder = ["src"]
selectByTag = "Unit"
testResultsJUnit = "results.xml"
"#;
    let file = parse_pipeline(text, Path::new("pipeline.toml")).unwrap();
    assert_eq!(file.language, "zh-CN");
    assert_eq!(file.tools.len(), 1);
    assert_eq!(file.settings.log_tail_lines, 50);
    assert_eq!(file.environment["LM_LICENSE_FILE"], "27000@license");
    assert!(file.settings.internal_markers().contains(&"tmp_driver".to_string()));
    assert!(file.settings.internal_markers().contains(&"runner_".to_string()));
    assert_eq!(file.steps.len(), 1);
}

#[test]
fn test_unknown_top_level_keys_are_rejected() {
    let err = parse_pipeline("matlab_root = \"/opt\"", Path::new("pipeline.toml")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("pipeline.toml"));
}

#[test]
fn test_missing_pipeline_file_is_reported() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join(DEFAULT_PIPELINE_FILE);
    let err = load_pipeline(&missing).unwrap_err();
    assert!(matches!(err, Error::PipelineParse { .. }));

    fs::write(&missing, "[[steps]]\nstep = \"runMATLABCommand\"\ncommand = \"ver\"\n").unwrap();
    assert_eq!(load_pipeline(&missing).unwrap().steps.len(), 1);
}

#[test]
fn test_step_names_are_case_sensitive() {
    let err = step("step = \"runMatlabCommand\"\ncommand = \"ver\"").unwrap_err();
    assert!(err.to_string().starts_with("No such DSL method 'runMatlabCommand'"));
    assert!(err.to_string().contains("runMATLABCommand"));
    assert!(StepKind::lookup("runMATLABTests").is_ok());
}

#[test]
fn test_command_step_requires_a_command() {
    assert!(step("step = \"runMATLABCommand\"").is_err());
    assert!(validate_command("   ").is_err());
    assert!(validate_command("disp(1)").is_ok());
}

#[test]
fn test_tests_step_collects_selectors_and_outputs() {
    let parsed = step(
        r#"
step = "runMATLABTests"
sourceFolder = ["src", "lib"]
selectByFolder = ["tests/unit"]
selectByClass = ["pkg.MyTest"]
selectByProcedure = ["pkg.MyTest/testOne"]
selectByTag = "Fast"
testResultsPDF = "reports/report.pdf"
codeCoverageCobertura = "coverage.xml"
testResultsTAP = "results.tap"
"#,
    )
    .unwrap();
    let Step::RunTests(tests) = parsed else {
        panic!("expected runMATLABTests");
    };

    let selector = tests.test_selector();
    assert_eq!(selector.source_folders.len(), 2);
    assert!(selector.selectors.contains(&Selector::Tag("Fast".into())));
    assert!(!selector.runs_all());

    let kinds: Vec<ArtifactKind> = tests.artifacts().iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![ArtifactKind::Tap, ArtifactKind::Pdf, ArtifactKind::CoberturaCode]
    );
}

#[test]
fn test_validation_is_repeatable() {
    let ws = tempdir().unwrap();
    let Step::RunTests(tests) = step(
        r#"
step = "runMATLABTests"
selectByFile = ["tests/testSquare.m"]
testResultsJUnit = "out/results.xml"
"#,
    )
    .unwrap() else {
        panic!("expected runMATLABTests");
    };

    let first = validate_tests(&tests.test_selector(), &tests.artifacts(), ws.path(), TargetOs::Unix).unwrap();
    let second = validate_tests(&tests.test_selector(), &tests.artifacts(), ws.path(), TargetOs::Unix).unwrap();
    assert_eq!(first, second);
    assert!(!ws.path().join("out").exists());
}

#[test]
fn test_extension_rules() {
    let ws = tempdir().unwrap();
    let check = |kind: ArtifactKind, target: &str| {
        validate_tests(
            &Default::default(),
            &[OutputArtifactSpec::new(kind, target)],
            ws.path(),
            TargetOs::Unix,
        )
    };

    let err = check(ArtifactKind::Pdf, "report").unwrap_err();
    assert!(err.to_string().starts_with("File extension missing. Expected '.pdf'"));
    let err = check(ArtifactKind::JUnitXml, "results.XML").unwrap_err();
    assert!(matches!(err, Error::InvalidFileExtension { .. }));
    assert!(check(ArtifactKind::SimulinkTestResults, "results.mldatx").is_ok());
    assert!(check(ArtifactKind::Tap, "results").is_ok());
}

#[test]
fn test_file_names_follow_the_target_os() {
    let ws = tempdir().unwrap();
    let spec = [OutputArtifactSpec::new(ArtifactKind::Pdf, "abc/x?.pdf")];
    assert!(validate_tests(&Default::default(), &spec, ws.path(), TargetOs::Unix).is_ok());
    let err = validate_tests(&Default::default(), &spec, ws.path(), TargetOs::Windows).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ArtifactValidation);
}

#[test]
fn test_targets_under_a_file_are_unwritable() {
    let ws = tempdir().unwrap();
    fs::write(ws.path().join("blocker"), "").unwrap();
    let spec = [OutputArtifactSpec::new(ArtifactKind::JUnitXml, "blocker/results.xml")];
    let err = validate_tests(&Default::default(), &spec, ws.path(), TargetOs::Unix).unwrap_err();
    assert!(matches!(err, Error::UnwritableTarget { .. }));
}

#[test]
fn test_selectors_must_stay_in_the_workspace() {
    let ws = tempdir().unwrap();
    let err = step("step = \"runMATLABTests\"\nselectByFolder = [\"../elsewhere\"]")
        .map(|s| match s {
            Step::RunTests(t) => validate_tests(&t.test_selector(), &[], ws.path(), TargetOs::Unix),
            Step::RunCommand(_) => unreachable!(),
        })
        .unwrap()
        .unwrap_err();
    assert!(err.to_string().contains("selectByFolder"));
}
