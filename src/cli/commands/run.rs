//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command, which executes the steps of a
//! pipeline file in order and reports the outcome.
//!
//! 此模块实现了 `run` 命令，按顺序执行流水线文件中的步骤并报告结果。

use anyhow::{Context, Result};
use colored::*;
use std::{fs, path::PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{config, execution::run_pipeline},
    infra::{log::ConsoleLog, t},
    reporting::{
        console::{print_failure_details, print_summary},
        html::generate_html_report,
        json::generate_json_report,
    },
};

/// Executes the run command with the provided arguments.
///
/// # Arguments
/// * `config` - Path to the pipeline file
/// * `workspace` - Folder MATLAB runs in and outputs are resolved against
/// * `html` - Optional path for an HTML report
/// * `json` - Optional path for a JSON report
/// * `explicit_language` - `--lang`, which wins over the pipeline's `language`
pub async fn execute(
    config: PathBuf,
    workspace: PathBuf,
    html: Option<PathBuf>,
    json: Option<PathBuf>,
    explicit_language: Option<String>,
) -> Result<()> {
    let config_path = fs::canonicalize(&config)
        .with_context(|| t!("config_read_failed_path", path = config.display()).to_string())?;
    let mut pipeline = config::load_pipeline(&config_path)
        .with_context(|| t!("config_parse_failed").to_string())?;
    if let Ok(root) = std::env::var("MATLAB_ROOT") {
        pipeline.environment.entry("MATLAB_ROOT".to_string()).or_insert(root);
    }

    let locale = explicit_language.unwrap_or_else(|| pipeline.language.clone());
    rust_i18n::set_locale(&locale);

    let workspace = fs::canonicalize(&workspace).with_context(|| {
        t!("workspace_not_found", locale = locale, path = workspace.display()).to_string()
    })?;

    println!(
        "{}",
        t!("loading_pipeline", locale = locale, path = config_path.display())
    );
    println!(
        "{}",
        t!("workspace_detected", locale = locale, path = workspace.display())
    );
    println!(
        "{}",
        t!("steps_found", locale = locale, count = pipeline.steps.len()).cyan()
    );

    if pipeline.steps.is_empty() {
        println!("{}", t!("no_steps_to_run", locale = locale).green());
        return Ok(());
    }

    let stop_token = setup_signal_handler(&locale);
    let mut sink = ConsoleLog;
    let outcome = run_pipeline(&pipeline, &workspace, &mut sink, Some(stop_token)).await;

    print_summary(&outcome, &locale);

    if let Some(report_path) = &html {
        println!(
            "\n{}",
            t!("html_report_generating", locale = locale, path = report_path.display())
        );
        if let Err(e) = generate_html_report(&outcome, report_path, &locale) {
            eprintln!("{} {:#}", t!("html_report_failed", locale = locale).red(), e);
        }
    }
    if let Some(report_path) = &json {
        println!(
            "{}",
            t!("json_report_generating", locale = locale, path = report_path.display())
        );
        if let Err(e) = generate_json_report(&outcome, report_path) {
            eprintln!("{} {:#}", t!("json_report_failed", locale = locale).red(), e);
        }
    }

    if outcome.is_success() {
        println!("\n{}", t!("all_steps_passed", locale = locale).green().bold());
        Ok(())
    } else {
        print_failure_details(&outcome, &locale);
        anyhow::bail!(t!("pipeline_failed", locale = locale).to_string());
    }
}

/// Sets up a Ctrl-C handler that aborts the running step.
pub fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}
