//! # JSON Reporting Module / JSON 报告模块
//!
//! Serializes the pipeline outcome for hosts that consume build results
//! programmatically.
//!
//! 为以编程方式使用构建结果的宿主序列化流水线结果。

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::core::execution::PipelineOutcome;

pub fn render_json_report(outcome: &PipelineOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("Failed to serialize build outcome")
}

pub fn generate_json_report(outcome: &PipelineOutcome, output_path: &Path) -> Result<()> {
    let json = render_json_report(outcome)?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))
}
