//! # Step Execution Engine Module / 步骤执行引擎模块
//!
//! Runs build steps end to end: validate parameters, resolve the MATLAB
//! installation, generate the driver, launch MATLAB with its output
//! streamed into the build log, classify the result and ingest the declared
//! artifacts. Every failure along the way is written to the build log and
//! turned into a `Failure` outcome; nothing is retried.
//!
//! A pipeline is a list of steps run one after another. The first failing
//! step stops it and the remaining steps are reported as skipped.
//!
//! 端到端运行构建步骤：验证参数、解析 MATLAB 安装、生成驱动脚本、
//! 启动 MATLAB 并流式输出日志、判定结果并摄取声明的产物。

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{PipelineFile, Settings},
        errors::{Error, Result},
        installation::{InstallationResolver, ToolRegistry, check_artifact_support},
        models::{BuildOutcome, OutputArtifactSpec, ProducedArtifact, StepStatus},
        scriptgen::DriverScriptGenerator,
        steps::Step,
        validation::{validate_command, validate_tests},
    },
    infra::{
        command::{self, ExitState, StreamedRun},
        fs::TargetOs,
        log::{BuildLog, LogSink},
        t,
    },
    ingest::{ArtifactTracker, ResultIngestor},
};

/// Everything a step needs besides its own parameters.
/// 步骤除自身参数外所需的一切。
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Absolute workspace folder; MATLAB runs from here.
    pub workspace: PathBuf,
    pub tools: ToolRegistry,
    /// Pipeline-wide explicit root.
    pub matlab_root: Option<String>,
    /// Pipeline-wide tool name, overridden by a step's own `tool`.
    pub tool: Option<String>,
    /// Variables set for MATLAB on top of the runner's own environment.
    pub environment: BTreeMap<String, String>,
    pub settings: Settings,
    /// Filename rules output targets are checked against.
    pub os: TargetOs,
}

impl StepContext {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            workspace: std::path::absolute(&workspace).unwrap_or(workspace),
            tools: ToolRegistry::default(),
            matlab_root: None,
            tool: None,
            environment: BTreeMap::new(),
            settings: Settings::default(),
            os: TargetOs::current(),
        }
    }

    pub fn from_pipeline(file: &PipelineFile, workspace: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            tools: ToolRegistry::new(file.tools.clone())?,
            matlab_root: file.matlab_root.clone(),
            tool: file.tool.clone(),
            environment: file.environment.clone(),
            settings: file.settings.clone(),
            ..Self::new(workspace)
        })
    }

    /// `matlabRoot`, falling back to a `MATLAB_ROOT` environment entry.
    fn explicit_root(&self) -> Option<&str> {
        self.matlab_root
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.environment.get("MATLAB_ROOT").map(String::as_str))
    }

    fn path_var(&self) -> Option<OsString> {
        self.environment.get("PATH").map(OsString::from)
    }
}

/// Runs one step and returns its outcome. Never panics on bad input and
/// never returns an error: failures are part of the outcome.
///
/// 运行一个步骤并返回其结果。失败是结果的一部分。
pub async fn run_step(
    step: &Step,
    ctx: &StepContext,
    sink: &mut dyn LogSink,
    stop_token: Option<CancellationToken>,
) -> BuildOutcome {
    let started_at = Utc::now();
    let mut log = BuildLog::new(sink, ctx.settings.log_tail_lines);
    log.info(&t!("step.starting", step = step.describe()));

    let mut tracker = ArtifactTracker::default();
    let result = execute(step, ctx, &mut log, stop_token, &mut tracker).await;
    match result {
        Ok(artifacts) => {
            log.info(&t!("step.succeeded", step = step.name()));
            BuildOutcome {
                step: step.name().to_string(),
                status: StepStatus::Success,
                log_excerpt: log.into_excerpt(),
                artifacts,
                failure: None,
                started_at,
                finished_at: Utc::now(),
            }
        }
        Err(err) => failed(step.name(), &err, log, started_at),
    }
}

fn failed(
    step: &str,
    err: &Error,
    mut log: BuildLog<'_>,
    started_at: chrono::DateTime<Utc>,
) -> BuildOutcome {
    log.error(&format!("{}: {}", err.category(), err));
    log.error(&t!("step.failed", step = step));
    BuildOutcome {
        step: step.to_string(),
        status: StepStatus::Failure,
        log_excerpt: log.into_excerpt(),
        artifacts: Vec::new(),
        failure: Some(err.into()),
        started_at,
        finished_at: Utc::now(),
    }
}

/// Runs the step with `tracker` holding its declared outputs. Every output
/// still pending when the step fails is rejected.
async fn execute(
    step: &Step,
    ctx: &StepContext,
    log: &mut BuildLog<'_>,
    stop_token: Option<CancellationToken>,
    tracker: &mut ArtifactTracker,
) -> Result<Vec<ProducedArtifact>> {
    let result = launch(step, ctx, log, stop_token, tracker).await;
    if let Err(err) = &result {
        tracker.reject_pending(&err.to_string());
    }
    result
}

async fn launch(
    step: &Step,
    ctx: &StepContext,
    log: &mut BuildLog<'_>,
    stop_token: Option<CancellationToken>,
    tracker: &mut ArtifactTracker,
) -> Result<Vec<ProducedArtifact>> {
    // Validation comes first so bad parameters fail without touching MATLAB.
    let tests = match step {
        Step::RunCommand(s) => {
            validate_command(&s.command)?;
            None
        }
        Step::RunTests(s) => Some(validate_tests(
            &s.test_selector(),
            &s.artifacts(),
            &ctx.workspace,
            ctx.os,
        )?),
    };
    let declared: &[OutputArtifactSpec] = tests.as_ref().map_or(&[][..], |t| t.artifacts.as_slice());
    let ingestor = ResultIngestor::new(&ctx.workspace, ctx.settings.internal_markers());
    *tracker = ingestor.declare(declared);
    tracker
        .mark_validated()
        .map_err(|e| Error::config(step.name(), e.to_string()))?;

    let resolver = InstallationResolver::new(&ctx.tools, ctx.path_var(), &ctx.workspace);
    let tool = step.tool().or(ctx.tool.as_deref());
    let root = step
        .matlab_root()
        .filter(|r| !r.trim().is_empty())
        .or_else(|| ctx.explicit_root());
    let installation = resolver.resolve(root, tool)?;
    log.info(&t!(
        "step.using_matlab",
        version = installation.display_name(),
        root = installation.root.display()
    ));
    check_artifact_support(&installation, &tracker.kinds())?;

    let generator = DriverScriptGenerator::new(&ctx.workspace);
    let script = match (step, &tests) {
        (Step::RunCommand(s), _) => generator.for_command(&s.command)?,
        (Step::RunTests(_), Some(tests)) => generator.for_tests(tests)?,
        (Step::RunTests(_), None) => return Err(Error::config(step.name(), "missing test selection")),
    };
    let args = script.launch_args(&installation, step.startup_options())?;
    log.info(&format!(
        "{} {} {}",
        t!("step.command_prefix"),
        installation.executable.display(),
        shlex::try_join(args.iter().map(String::as_str)).unwrap_or_else(|_| args.join(" "))
    ));

    let mut cmd = tokio::process::Command::new(&installation.executable);
    cmd.args(&args)
        .current_dir(&ctx.workspace)
        .envs(&ctx.environment)
        .env(
            "PATH",
            command::prepend_to_path(&installation.bin_dir(), ctx.path_var()),
        );

    let run = command::spawn_and_stream(cmd, log, &ctx.settings.failure_markers, stop_token)
        .await
        .map_err(|source| Error::Spawn {
            executable: installation.executable.clone(),
            source,
        })?;
    // The driver folder goes away before any output is read back.
    drop(script);

    if let Err(err) = classify(&run, step) {
        // A driver that ran to completion (failing tests included) still
        // wrote its outputs; they are parsed and scrubbed all the same.
        if matches!(run.exit, ExitState::Exited(_)) {
            salvage_outputs(&ingestor, tracker, log);
        }
        return Err(err);
    }
    ingestor.ingest(tracker)
}

/// Ingests what a failed run left behind, logging each report and each
/// problem found. The run's own error stays the step's failure.
fn salvage_outputs(ingestor: &ResultIngestor, tracker: &mut ArtifactTracker, log: &mut BuildLog<'_>) {
    let (produced, problems) = ingestor.ingest_each(tracker);
    for artifact in &produced {
        log.info(&format!(
            "{}: {} ({})",
            artifact.kind.label(),
            artifact.path.display(),
            artifact.report.headline()
        ));
    }
    for problem in &problems {
        log.error(&format!("{}: {}", problem.category(), problem));
    }
}

/// Maps how MATLAB ended to success or the matching execution error.
pub fn classify(run: &StreamedRun, step: &Step) -> Result<()> {
    match run.exit {
        ExitState::Cancelled => Err(Error::Cancelled),
        ExitState::Exited(code) if code != 0 => Err(Error::ExitCode {
            code,
            command: step.describe(),
        }),
        ExitState::Signaled => Err(Error::Terminated {
            command: step.describe(),
        }),
        ExitState::Exited(_) => match &run.marker {
            Some(marker) => Err(Error::FailureMarker {
                marker: marker.clone(),
                command: step.describe(),
            }),
            None => Ok(()),
        },
    }
}

/// A step's place in a pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum StepRecord {
    Completed(BuildOutcome),
    /// Not run because an earlier step failed or the run was aborted.
    Skipped { step: String },
}

impl StepRecord {
    pub fn step(&self) -> &str {
        match self {
            StepRecord::Completed(outcome) => &outcome.step,
            StepRecord::Skipped { step } => step,
        }
    }

    pub fn outcome(&self) -> Option<&BuildOutcome> {
        match self {
            StepRecord::Completed(outcome) => Some(outcome),
            StepRecord::Skipped { .. } => None,
        }
    }
}

/// The result of running a whole pipeline file.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub records: Vec<StepRecord>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.outcome().is_some_and(BuildOutcome::is_success))
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.records.iter().filter_map(StepRecord::outcome)
    }
}

/// Runs every step of `file` in order against `workspace`.
///
/// All step tables are parsed before anything runs, so a misspelled step
/// name late in the file fails the pipeline without launching MATLAB.
pub async fn run_pipeline(
    file: &PipelineFile,
    workspace: &Path,
    sink: &mut dyn LogSink,
    stop_token: Option<CancellationToken>,
) -> PipelineOutcome {
    let names: Vec<String> = file
        .steps
        .iter()
        .map(|table| {
            table
                .get("step")
                .and_then(|v| v.as_str())
                .unwrap_or("<unnamed>")
                .to_string()
        })
        .collect();
    let skipped_from = |start: usize| {
        names[start..]
            .iter()
            .map(|name| StepRecord::Skipped { step: name.clone() })
            .collect::<Vec<_>>()
    };

    let tail = file.settings.log_tail_lines;
    let ctx = match StepContext::from_pipeline(file, workspace) {
        Ok(ctx) => ctx,
        Err(err) => return rejected_pipeline(&names, None, &err, sink, tail),
    };
    let mut steps = Vec::with_capacity(file.steps.len());
    for (index, table) in file.steps.iter().enumerate() {
        match Step::from_table(table) {
            Ok(step) => steps.push(step),
            Err(err) => return rejected_pipeline(&names, Some(index), &err, sink, tail),
        }
    }

    let token = stop_token.unwrap_or_default();
    let mut records = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        if token.is_cancelled() {
            records.extend(skipped_from(index));
            break;
        }
        let outcome = run_step(step, &ctx, sink, Some(token.clone())).await;
        let success = outcome.is_success();
        records.push(StepRecord::Completed(outcome));
        if !success {
            records.extend(skipped_from(index + 1));
            break;
        }
    }
    PipelineOutcome { records }
}

/// Outcome of a pipeline that failed before any step ran. The failure is
/// attributed to the offending step, or to the pipeline itself.
fn rejected_pipeline(
    names: &[String],
    failing: Option<usize>,
    err: &Error,
    sink: &mut dyn LogSink,
    tail: usize,
) -> PipelineOutcome {
    let name = failing
        .and_then(|i| names.get(i))
        .map_or("pipeline", String::as_str);
    let log = BuildLog::new(sink, tail);
    let mut failure = Some(StepRecord::Completed(failed(name, err, log, Utc::now())));
    let mut records = Vec::with_capacity(names.len() + 1);
    if failing.is_none() {
        records.extend(failure.take());
    }
    for (index, step) in names.iter().enumerate() {
        if Some(index) == failing {
            records.extend(failure.take());
        } else {
            records.push(StepRecord::Skipped { step: step.clone() });
        }
    }
    PipelineOutcome { records }
}
