//! # Pipeline Configuration Module / 流水线配置模块
//!
//! The pipeline file is a TOML document listing named MATLAB tools, the
//! environment handed to MATLAB, runner settings and an ordered list of
//! steps. Steps stay as raw tables here; `core::steps` turns them into typed
//! step handlers so an unknown step name is reported the same way whether it
//! comes from a file or from code.
//!
//! 流水线文件是一个 TOML 文档。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::errors::{Error, Result};
use crate::core::scriptgen;

/// Default file name looked up by `run` and written by `init`.
pub const DEFAULT_PIPELINE_FILE: &str = "matlab-pipeline.toml";

/// A MATLAB installation registered under a name, like a CI tool entry.
/// 以名称注册的 MATLAB 安装，类似于 CI 工具条目。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NamedTool {
    pub name: String,
    /// Root folder of the installation; `~` and `$VAR` are expanded.
    pub home: String,
}

/// Runner behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Lines of build log kept on the outcome.
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,
    /// Output substrings that fail a step even when MATLAB exits with 0.
    #[serde(default = "default_failure_markers")]
    pub failure_markers: Vec<String>,
    /// Driver identifiers to scrub from coverage reports, on top of the
    /// generator's own naming markers.
    #[serde(default)]
    pub extra_markers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_tail_lines: default_log_tail_lines(),
            failure_markers: default_failure_markers(),
            extra_markers: Vec::new(),
        }
    }
}

impl Settings {
    /// Every marker that must not survive into an emitted coverage report.
    pub fn internal_markers(&self) -> Vec<String> {
        let mut markers: Vec<String> = scriptgen::internal_markers()
            .iter()
            .map(|m| m.to_string())
            .collect();
        for extra in &self.extra_markers {
            if !extra.is_empty() && !markers.contains(extra) {
                markers.push(extra.clone());
            }
        }
        markers
    }
}

fn default_log_tail_lines() -> usize {
    200
}

fn default_failure_markers() -> Vec<String> {
    vec!["No such DSL method".to_string()]
}

fn default_language() -> String {
    "en".to_string()
}

/// The pipeline file as written on disk.
/// 磁盘上的流水线文件。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineFile {
    /// The language for the runner's messages (e.g., "en", "zh-CN").
    #[serde(default = "default_language")]
    pub language: String,

    /// Explicit MATLAB root for every step.
    #[serde(default)]
    pub matlab_root: Option<String>,

    /// Name of a `[[tools]]` entry to use for every step.
    #[serde(default)]
    pub tool: Option<String>,

    /// Variables set for MATLAB. `MATLAB_ROOT` and `PATH` also take part in
    /// installation lookup.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub tools: Vec<NamedTool>,

    #[serde(default)]
    pub settings: Settings,

    /// Raw step tables, each with a `step` key naming the step.
    #[serde(default)]
    pub steps: Vec<toml::Table>,
}

impl Default for PipelineFile {
    fn default() -> Self {
        Self {
            language: default_language(),
            matlab_root: None,
            tool: None,
            environment: BTreeMap::new(),
            tools: Vec::new(),
            settings: Settings::default(),
            steps: Vec::new(),
        }
    }
}

/// Parses pipeline TOML text.
pub fn parse_pipeline(text: &str, origin: &Path) -> Result<PipelineFile> {
    toml::from_str(text).map_err(|e| Error::PipelineParse {
        path: origin.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reads and parses a pipeline file.
pub fn load_pipeline(path: &Path) -> Result<PipelineFile> {
    let text = fs::read_to_string(path).map_err(|e| Error::PipelineParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_pipeline(&text, path)
}
