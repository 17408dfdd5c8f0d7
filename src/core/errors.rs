//! # Error Types Module / 错误类型模块
//!
//! Every failure a build step can hit, grouped into the five categories the
//! build log reports. Messages carry the literal context (parameter name,
//! expected extension, tool identifier, failing command) a user needs to fix
//! the problem without reading the source.
//!
//! 构建步骤可能遇到的所有失败，按构建日志报告的五个类别分组。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate's `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse grouping of errors, reported alongside the message.
/// 错误的粗粒度分组，与消息一起报告。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Bad parameters, caught before any process launch.
    Configuration,
    /// MATLAB not found, invalid, or too old.
    Installation,
    /// Non-zero exit, failure marker in the log, or cancellation.
    Execution,
    /// Bad extension or unwritable target, caught before launch.
    ArtifactValidation,
    /// Post-execution artifact missing, malformed, or leaking driver names.
    ArtifactParse,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Configuration => "ConfigurationError",
            ErrorCategory::Installation => "InstallationError",
            ErrorCategory::Execution => "ExecutionError",
            ErrorCategory::ArtifactValidation => "ArtifactValidationError",
            ErrorCategory::ArtifactParse => "ArtifactParseError",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // === Configuration ===
    #[error("Invalid value for parameter '{parameter}': {reason}")]
    Configuration { parameter: String, reason: String },

    #[error("No such DSL method '{name}' found among steps [{available}]")]
    NoSuchStep { name: String, available: String },

    #[error("Failed to parse pipeline file {path}: {reason}")]
    PipelineParse { path: PathBuf, reason: String },

    // === Installation ===
    #[error(
        "Unable to locate MATLAB. Set MATLAB_ROOT to the MATLAB installation folder, \
         select a configured MATLAB tool, or add '<MATLAB_ROOT>/bin' to PATH"
    )]
    InstallationNotFound,

    #[error("Tool type \"matlab\" does not have an install of \"{tool}\" configured (available: [{available}])")]
    ToolNotConfigured { tool: String, available: String },

    #[error("Invalid MATLAB installation at '{root}': {reason}")]
    InstallationInvalid { root: PathBuf, reason: String },

    #[error("MATLAB {found} is not supported{feature}; {minimum} or later is required")]
    IncompatibleVersion {
        found: String,
        minimum: String,
        feature: String,
    },

    // === Execution ===
    #[error("Failed to launch MATLAB '{executable}': {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("MATLAB exited with code {code} while running {command}")]
    ExitCode { code: i32, command: String },

    #[error("MATLAB was terminated by a signal while running {command}")]
    Terminated { command: String },

    #[error("Build log contains failure marker '{marker}' while running {command}")]
    FailureMarker { marker: String, command: String },

    #[error("Build step was aborted; MATLAB process terminated")]
    Cancelled,

    // === Artifact validation ===
    #[error("File extension missing. Expected '{expected}' (parameter '{parameter}', path '{path}')")]
    FileExtensionMissing {
        parameter: String,
        path: String,
        expected: String,
    },

    #[error("Invalid file extension '{found}'. Expected '{expected}' (parameter '{parameter}', path '{path}')")]
    InvalidFileExtension {
        parameter: String,
        path: String,
        expected: String,
        found: String,
    },

    #[error("Unable to write to file '{path}' (parameter '{parameter}'): {reason}")]
    UnwritableTarget {
        parameter: String,
        path: String,
        reason: String,
    },

    // === Artifact parse ===
    #[error("Expected {kind} output was not produced at '{path}'")]
    ArtifactMissing { kind: String, path: PathBuf },

    #[error("Unable to parse {kind} output '{path}': {reason}")]
    ArtifactParse {
        kind: String,
        path: PathBuf,
        reason: String,
    },

    #[error("{kind} output '{path}' still references internal driver identifier '{marker}'")]
    ArtifactLeak {
        kind: String,
        path: PathBuf,
        marker: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Shorthand for a configuration error naming the offending parameter.
    pub fn config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration { .. } | Error::NoSuchStep { .. } | Error::PipelineParse { .. } => {
                ErrorCategory::Configuration
            }
            Error::InstallationNotFound
            | Error::ToolNotConfigured { .. }
            | Error::InstallationInvalid { .. }
            | Error::IncompatibleVersion { .. } => ErrorCategory::Installation,
            Error::Spawn { .. }
            | Error::ExitCode { .. }
            | Error::Terminated { .. }
            | Error::FailureMarker { .. }
            | Error::Cancelled
            | Error::Io(_) => ErrorCategory::Execution,
            Error::FileExtensionMissing { .. }
            | Error::InvalidFileExtension { .. }
            | Error::UnwritableTarget { .. } => ErrorCategory::ArtifactValidation,
            Error::ArtifactMissing { .. } | Error::ArtifactParse { .. } | Error::ArtifactLeak { .. } => {
                ErrorCategory::ArtifactParse
            }
        }
    }
}
