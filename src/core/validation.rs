//! # Parameter Validation Module / 参数验证模块
//!
//! Checks test selections and declared outputs before anything else
//! happens: no installation lookup, no script generation, no file writes.
//! Validation is a pure function of its inputs (plus read-only metadata
//! lookups for the writability probe), so running it twice gives the same
//! answer.
//!
//! 在任何其他操作之前检查测试选择和声明的输出。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::errors::{Error, Result};
use crate::core::models::{OutputArtifactSpec, Selector, TestSelector};
use crate::infra::fs::{self as pathfs, TargetOs};

/// A selection and output set that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTests {
    pub selector: TestSelector,
    pub artifacts: Vec<OutputArtifactSpec>,
}

pub fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(Error::config("command", "command must not be empty"));
    }
    Ok(())
}

/// Validates a full `runMATLABTests` configuration.
pub fn validate_tests(
    selector: &TestSelector,
    artifacts: &[OutputArtifactSpec],
    workspace: &Path,
    os: TargetOs,
) -> Result<ValidatedTests> {
    validate_selector(selector, os)?;
    validate_artifacts(artifacts, workspace, os)?;
    Ok(ValidatedTests {
        selector: selector.clone(),
        artifacts: artifacts.to_vec(),
    })
}

pub fn validate_selector(selector: &TestSelector, os: TargetOs) -> Result<()> {
    for folder in &selector.source_folders {
        check_workspace_path("sourceFolder", folder, os)?;
    }

    let mut tags = 0;
    for entry in &selector.selectors {
        let parameter = entry.parameter();
        match entry {
            Selector::Folder(path) | Selector::File(path) => {
                check_workspace_path(parameter, path, os)?;
            }
            Selector::Class(name) => {
                if !is_qualified_name(name) {
                    return Err(Error::config(
                        parameter,
                        format!("'{}' is not a valid test class name", name),
                    ));
                }
            }
            Selector::Procedure(name) => {
                let valid = name
                    .split_once('/')
                    .is_some_and(|(class, method)| is_qualified_name(class) && is_identifier(method));
                if !valid {
                    return Err(Error::config(
                        parameter,
                        format!("'{}' must be written as ClassName/methodName", name),
                    ));
                }
            }
            Selector::Tag(tag) => {
                tags += 1;
                if tag.trim().is_empty() {
                    return Err(Error::config(parameter, "tag must not be empty"));
                }
            }
        }
    }
    if tags > 1 {
        return Err(Error::config("selectByTag", "only one tag can be selected"));
    }
    Ok(())
}

pub fn validate_artifacts(
    artifacts: &[OutputArtifactSpec],
    workspace: &Path,
    os: TargetOs,
) -> Result<()> {
    let mut kinds = HashSet::new();
    let mut targets: HashSet<PathBuf> = HashSet::new();
    for spec in artifacts {
        let parameter = spec.kind.parameter();
        if !kinds.insert(spec.kind) {
            return Err(Error::config(parameter, "declared more than once"));
        }
        check_artifact_target(spec, workspace, os)?;
        let resolved = pathfs::resolve_in(workspace, &spec.target);
        let key = pathfs::normalize_lexically(&resolved).unwrap_or(resolved);
        if !targets.insert(key) {
            return Err(Error::config(
                parameter,
                format!(
                    "'{}' is already the target of another output",
                    spec.target.display()
                ),
            ));
        }
    }
    Ok(())
}

/// Extension and writability checks for one declared output.
pub fn check_artifact_target(
    spec: &OutputArtifactSpec,
    workspace: &Path,
    os: TargetOs,
) -> Result<()> {
    let parameter = spec.kind.parameter();
    let display = spec.target.display().to_string();
    if display.trim().is_empty() {
        return Err(Error::config(parameter, "file path must not be empty"));
    }

    if let Some(expected) = spec.kind.required_extension() {
        match spec.target.extension() {
            None => {
                return Err(Error::FileExtensionMissing {
                    parameter: parameter.to_string(),
                    path: display,
                    expected: expected.to_string(),
                });
            }
            Some(ext) => {
                let found = format!(".{}", ext.to_string_lossy());
                if found != expected {
                    return Err(Error::InvalidFileExtension {
                        parameter: parameter.to_string(),
                        path: display,
                        expected: expected.to_string(),
                        found,
                    });
                }
            }
        }
    }

    let unwritable = |reason: String| Error::UnwritableTarget {
        parameter: parameter.to_string(),
        path: display.clone(),
        reason,
    };
    if let Some(reason) = pathfs::illegal_path(&spec.target, os) {
        return Err(unwritable(reason));
    }
    let resolved = pathfs::resolve_in(workspace, &spec.target);
    pathfs::probe_writable(&resolved).map_err(unwritable)
}

fn check_workspace_path(parameter: &str, path: &Path, os: TargetOs) -> Result<()> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(Error::config(parameter, "path must not be empty"));
    }
    if !pathfs::stays_within(path) {
        return Err(Error::config(
            parameter,
            format!(
                "'{}' must be relative to the workspace and stay inside it",
                path.display()
            ),
        ));
    }
    if let Some(reason) = pathfs::illegal_path(path, os) {
        return Err(Error::config(parameter, format!("'{}' {}", path.display(), reason)));
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `pkg.sub.ClassName`
fn is_qualified_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}
