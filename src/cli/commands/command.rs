//! # Command Module / 命令模块
//!
//! This module implements the `command` subcommand: a one-off
//! `runMATLABCommand` step without a pipeline file.
//!
//! 此模块实现了 `command` 子命令：无需流水线文件的一次性 `runMATLABCommand` 步骤。

use anyhow::{Context, Result};
use colored::*;
use std::{fs, path::PathBuf};

use crate::{
    cli::commands::run::setup_signal_handler,
    core::{
        execution::{PipelineOutcome, StepContext, StepRecord, run_step},
        steps::{RunCommandStep, Step},
    },
    infra::{log::ConsoleLog, t},
    reporting::console::{print_failure_details, print_summary},
};

pub async fn execute(
    command: String,
    workspace: PathBuf,
    matlab_root: Option<String>,
    startup_options: Option<String>,
    locale: &str,
) -> Result<()> {
    let workspace = fs::canonicalize(&workspace).with_context(|| {
        t!("workspace_not_found", locale = locale, path = workspace.display()).to_string()
    })?;

    let step = Step::RunCommand(RunCommandStep {
        command,
        startup_options,
        ..Default::default()
    });
    let mut ctx = StepContext::new(workspace);
    ctx.matlab_root = matlab_root;
    if let Ok(root) = std::env::var("MATLAB_ROOT") {
        ctx.environment.insert("MATLAB_ROOT".to_string(), root);
    }

    let stop_token = setup_signal_handler(locale);
    let mut sink = ConsoleLog;
    let outcome = run_step(&step, &ctx, &mut sink, Some(stop_token)).await;
    let outcome = PipelineOutcome {
        records: vec![StepRecord::Completed(outcome)],
    };

    print_summary(&outcome, locale);
    if outcome.is_success() {
        println!("\n{}", t!("all_steps_passed", locale = locale).green().bold());
        Ok(())
    } else {
        print_failure_details(&outcome, locale);
        anyhow::bail!(t!("pipeline_failed", locale = locale).to_string());
    }
}
