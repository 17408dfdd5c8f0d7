//! # Pipeline Initialization Module / 流水线初始化模块
//!
//! This module implements the `init` command, which writes a starter
//! pipeline file. Interactively it asks for the MATLAB root, the command to
//! run and which test outputs to produce; non-interactively it writes a
//! commented template.
//!
//! 此模块实现了 `init` 命令，用于写出初始流水线文件。
//!
//! ## Features / 功能特性
//!
//! - **Interactive Wizard**: Step-by-step guidance for pipeline setup
//! - **Output Selection**: Pick the test and coverage artifacts to produce
//! - **Overwrite Protection**: Confirmation prompt before replacing a file
//!
//! - **交互式向导**: 流水线设置的逐步指导
//! - **输出选择**: 选择要生成的测试和覆盖率产物
//! - **覆盖保护**: 替换文件前的确认提示

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::core::config::{PipelineFile, parse_pipeline};
use crate::core::models::ArtifactKind;
use crate::infra::t;

const DEFAULT_PIPELINE: &str = r#"# MATLAB pipeline / MATLAB 流水线

# Language for runner messages / 运行器消息的语言
language = "en"

# MATLAB installation. Leave unset to use MATLAB_ROOT or the first `matlab`
# on PATH. / MATLAB 安装目录。未设置时使用 MATLAB_ROOT 或 PATH 中的 `matlab`。
# matlabRoot = "/usr/local/MATLAB/R2023b"

# Named installations, selected with `tool = "<name>"`.
# 命名安装，通过 `tool = "<name>"` 选择。
# [[tools]]
# name = "MATLAB_R2023b"
# home = "/usr/local/MATLAB/R2023b"

[settings]
logTailLines = 200
failureMarkers = ["No such DSL method"]

[[steps]]
step = "runMATLABCommand"
command = "disp('Hello from MATLAB'); version"

[[steps]]
step = "runMATLABTests"
sourceFolder = ["src"]
testResultsJUnit = "test-results/results.xml"
codeCoverageCobertura = "code-coverage/coverage.xml"
"#;

/// Default output path for each artifact kind the wizard offers.
fn default_target(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Tap => "test-results/results.tap",
        ArtifactKind::JUnitXml => "test-results/results.xml",
        ArtifactKind::SimulinkTestResults => "test-results/simulinktest.mldatx",
        ArtifactKind::Pdf => "test-results/testreport.pdf",
        ArtifactKind::CoberturaCode => "code-coverage/coverage.xml",
        ArtifactKind::CoberturaModel => "model-coverage/coverage.xml",
    }
}

/// Runs the interactive wizard (or writes the template) to create a
/// pipeline file at `config_path`.
///
/// 运行交互式向导（或写出模板）以在 `config_path` 创建流水线文件。
pub fn run_init_wizard(config_path: &Path, language: &str, non_interactive: bool) -> Result<()> {
    if non_interactive {
        if config_path.exists() {
            anyhow::bail!(
                t!("init_file_exists", locale = language, path = config_path.display()).to_string()
            );
        }
        return write_config(config_path, DEFAULT_PIPELINE, language);
    }

    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init_wizard_welcome", locale = language).cyan().bold());
    println!("{}", t!("init_wizard_description", locale = language));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init_overwrite_prompt", locale = language, path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init_aborted", locale = language));
            return Ok(());
        }
    }

    let mut pipeline = PipelineFile {
        language: language.to_string(),
        ..PipelineFile::default()
    };

    let matlab_root: String = Input::with_theme(&theme)
        .with_prompt(t!("init_matlab_root_prompt", locale = language))
        .allow_empty(true)
        .interact_text()
        .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
    if !matlab_root.trim().is_empty() {
        pipeline.matlab_root = Some(matlab_root.trim().to_string());
    }

    let command: String = Input::with_theme(&theme)
        .with_prompt(t!("init_command_prompt", locale = language))
        .allow_empty(true)
        .interact_text()
        .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
    if !command.trim().is_empty() {
        let mut step = toml::Table::new();
        step.insert("step".into(), "runMATLABCommand".into());
        step.insert("command".into(), command.trim().into());
        pipeline.steps.push(step);
    }

    let run_tests = Confirm::with_theme(&theme)
        .with_prompt(t!("init_run_tests_prompt", locale = language))
        .default(true)
        .interact()
        .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
    if run_tests {
        let labels: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.label()).collect();
        let selections = MultiSelect::with_theme(&theme)
            .with_prompt(t!("init_outputs_prompt", locale = language))
            .items(&labels)
            .interact()
            .context(t!("init_user_confirmation_failed", locale = language).to_string())?;

        let mut step = toml::Table::new();
        step.insert("step".into(), "runMATLABTests".into());
        for i in selections {
            let kind = ArtifactKind::ALL[i];
            step.insert(kind.parameter().into(), default_target(kind).into());
        }
        pipeline.steps.push(step);
    }

    if pipeline.steps.is_empty() {
        println!("{}", t!("init_no_steps_selected", locale = language).yellow());
    }

    let text = toml::to_string_pretty(&pipeline).context("Failed to serialize pipeline file")?;
    write_config(config_path, &text, language)
}

fn write_config(config_path: &Path, text: &str, language: &str) -> Result<()> {
    // Never write something `run` would refuse to read.
    parse_pipeline(text, config_path)?;

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            t!("init_create_parent_dir_failed", locale = language, path = parent.display()).to_string()
        })?;
    }
    fs::write(config_path, text).with_context(|| {
        t!("init_write_failed", locale = language, path = config_path.display()).to_string()
    })?;

    println!(
        "{}",
        t!("init_success", locale = language, path = config_path.display()).green()
    );
    println!("{}", t!("init_next_steps", locale = language));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_a_valid_pipeline() {
        let file = parse_pipeline(DEFAULT_PIPELINE, Path::new("template.toml")).unwrap();
        assert_eq!(file.steps.len(), 2);
        assert!(file.matlab_root.is_none());
    }

    #[test]
    fn default_targets_carry_the_required_extension() {
        for kind in ArtifactKind::ALL {
            if let Some(ext) = kind.required_extension() {
                assert!(default_target(kind).ends_with(ext));
            }
        }
    }
}
