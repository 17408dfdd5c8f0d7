//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders a pipeline outcome as a standalone HTML page with
//! summary counts, one row per step, the artifacts each step produced and
//! a collapsible build log for failures. Markup is built with `maud`, which
//! escapes all interpolated text.
//!
//! 此模块将流水线结果渲染为独立的 HTML 页面。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::execution::PipelineOutcome;
use crate::infra::t;
use crate::reporting::console::{format_duration, status_label};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const HTML_SCRIPT: &str = include_str!("assets/report.js");

pub fn render_html_report(outcome: &PipelineOutcome, locale: &str) -> Markup {
    let total = outcome.records.len();
    let passed = outcome.outcomes().filter(|o| o.is_success()).count();
    let failed = outcome.outcomes().filter(|o| !o.is_success()).count();
    let skipped = total - passed - failed;

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale).to_string()) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale).to_string()) }
                div class="summary-container" {
                    (summary_item(total, "", &t!("html_report.summary.total", locale = locale)))
                    (summary_item(passed, "passed-text", &t!("html_report.summary.passed", locale = locale)))
                    (summary_item(failed, "failed-text", &t!("html_report.summary.failed", locale = locale)))
                    (summary_item(skipped, "skipped-text", &t!("html_report.summary.skipped", locale = locale)))
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.step", locale = locale).to_string()) }
                            th class="status-col" { (t!("html_report.table.header.status", locale = locale).to_string()) }
                            th class="duration-cell" { (t!("html_report.table.header.duration", locale = locale).to_string()) }
                            th { (t!("html_report.table.header.artifacts", locale = locale).to_string()) }
                        }
                    }
                    tbody {
                        @for (i, record) in outcome.records.iter().enumerate() {
                            @let output_id = format!("output-{}", i);
                            @let status_class = match record.outcome() {
                                Some(o) if o.is_success() => "passed",
                                Some(_) => "failed",
                                None => "skipped",
                            };
                            tr {
                                td { (record.step()) }
                                td class="status-col" {
                                    div class={ "status-cell " (status_class) } { (status_label(record, locale)) }
                                    @if status_class == "failed" {
                                        div class="output-toggle" onclick={ "toggleOutput('" (output_id) "')" } {
                                            (t!("html_report.toggle_output", locale = locale).to_string())
                                        }
                                    }
                                }
                                td class="duration-cell" {
                                    (record.outcome().map(format_duration).unwrap_or_else(|| "N/A".to_string()))
                                }
                                td {
                                    @if let Some(o) = record.outcome() {
                                        ul class="artifact-list" {
                                            @for artifact in &o.artifacts {
                                                li {
                                                    strong { (artifact.kind.label()) }
                                                    ": " (artifact.path.display().to_string()) " (" (artifact.report.headline()) ")"
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                            @if let Some(o) = record.outcome().filter(|o| !o.is_success()) {
                                tr id=(output_id) style="display:none;" {
                                    td colspan="4" {
                                        pre class="output-content" {
                                            @if let Some(failure) = &o.failure {
                                                (failure.category.to_string()) ": " (failure.message) "\n\n"
                                            }
                                            (o.log_excerpt.join("\n"))
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    }
}

fn summary_item(count: usize, class: &str, label: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

/// Writes the HTML report for `outcome` to `output_path`.
///
/// 将 `outcome` 的 HTML 报告写入 `output_path`。
pub fn generate_html_report(outcome: &PipelineOutcome, output_path: &Path, locale: &str) -> Result<()> {
    let markup = render_html_report(outcome, locale);
    fs::write(output_path, markup.into_string())
        .with_context(|| format!("Failed to write HTML report to {}", output_path.display()))
}
