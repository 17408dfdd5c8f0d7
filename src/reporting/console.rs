//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the end-of-run summary of a pipeline: one line per
//! step with its status and duration, the artifacts each successful step
//! produced, and the retained build log of every failed step.
//!
//! 此模块打印流水线运行结束时的摘要：每个步骤一行，包含状态和持续时间，
//! 成功步骤生成的产物，以及失败步骤保留的构建日志。

use colored::*;

use crate::core::execution::{PipelineOutcome, StepRecord};
use crate::core::models::BuildOutcome;
use crate::infra::t;

/// Localized status label of a pipeline record.
pub fn status_label(record: &StepRecord, locale: &str) -> String {
    match record.outcome() {
        Some(outcome) if outcome.is_success() => t!("status.passed", locale = locale).to_string(),
        Some(_) => t!("status.failed", locale = locale).to_string(),
        None => t!("status.skipped", locale = locale).to_string(),
    }
}

pub fn format_duration(outcome: &BuildOutcome) -> String {
    let millis = outcome.duration().num_milliseconds().max(0);
    format!("{:.2}s", millis as f64 / 1000.0)
}

/// Prints a formatted summary of a pipeline run.
///
/// 在控制台打印格式化的流水线运行摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Build Summary ---
///   - Passed   | runMATLABCommand        |      3.21s
///       JUnit XML: results/junit.xml (12 tests, 0 failed, 0 errors, 1 skipped)
///   - Failed   | runMATLABTests          |     10.02s
///   - Skipped  | runMATLABCommand        |        N/A
/// ```
pub fn print_summary(outcome: &PipelineOutcome, locale: &str) {
    println!("\n{}", t!("summary_banner", locale = locale).bold());

    for record in &outcome.records {
        let status = status_label(record, locale);
        let status_colored = match record.outcome() {
            Some(o) if o.is_success() => status.green(),
            Some(_) => status.red(),
            None => status.dimmed(),
        };
        let duration = record
            .outcome()
            .map(format_duration)
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "  - {:<10} | {:<24} | {:>10}",
            status_colored,
            record.step(),
            duration
        );

        if let Some(o) = record.outcome() {
            for artifact in &o.artifacts {
                println!(
                    "      {}: {} ({})",
                    artifact.kind.label().cyan(),
                    artifact.path.display(),
                    artifact.report.headline()
                );
            }
        }
    }
}

/// Prints the retained log and the failure reason of every failed step.
///
/// 打印每个失败步骤保留的日志和失败原因。
pub fn print_failure_details(outcome: &PipelineOutcome, locale: &str) {
    let failures: Vec<&BuildOutcome> = outcome.outcomes().filter(|o| !o.is_success()).collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, failed) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report_header_failure", locale = locale).red(),
            failed.step.cyan()
        );
        if let Some(failure) = &failed.failure {
            println!("{} {}", failure.category.to_string().yellow(), failure.message);
        }
        println!("\n--- {} ---\n", t!("build_log", locale = locale).yellow());
        for line in &failed.log_excerpt {
            println!("{}", line);
        }
        println!("\n{}", "-".repeat(80));
    }
}
