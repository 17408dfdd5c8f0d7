//! # Data Models Module / 数据模型模块
//!
//! Core data structures shared by the resolver, the script generator, the
//! process runner and the ingestor: installations and versions, test
//! selections, declared output artifacts and the final build outcome.
//!
//! 解析器、脚本生成器、进程运行器和结果摄取器共享的核心数据结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::core::errors::{Error, ErrorCategory};
use crate::ingest::Report;

/// A MATLAB version number as found in `VersionInfo.xml`, compared on
/// major/minor only. Patch and build numbers do not affect compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatlabVersion {
    pub major: u32,
    pub minor: u32,
}

impl MatlabVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses `"9.9.0.1467703"`, `"9.9"` or `"9"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        // Remaining components must still be numeric.
        if parts.any(|p| p.parse::<u64>().is_err()) {
            return None;
        }
        Some(Self { major, minor })
    }
}

impl fmt::Display for MatlabVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A named release paired with its version, used for minimum-version checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatlabRelease {
    pub name: &'static str,
    pub version: MatlabVersion,
}

impl MatlabRelease {
    pub const fn new(name: &'static str, major: u32, minor: u32) -> Self {
        Self {
            name,
            version: MatlabVersion::new(major, minor),
        }
    }
}

impl fmt::Display for MatlabRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

pub const R2013B: MatlabRelease = MatlabRelease::new("R2013b", 8, 2);
pub const R2014A: MatlabRelease = MatlabRelease::new("R2014a", 8, 3);
pub const R2015B: MatlabRelease = MatlabRelease::new("R2015b", 8, 6);
pub const R2017A: MatlabRelease = MatlabRelease::new("R2017a", 9, 2);
pub const R2017B: MatlabRelease = MatlabRelease::new("R2017b", 9, 3);
pub const R2018B: MatlabRelease = MatlabRelease::new("R2018b", 9, 5);
pub const R2019A: MatlabRelease = MatlabRelease::new("R2019a", 9, 6);

/// Oldest release any build step will run against.
pub const MINIMUM_RELEASE: MatlabRelease = R2013B;

/// First release that understands `-batch`.
pub const BATCH_RELEASE: MatlabRelease = R2019A;

/// A resolved, validated MATLAB installation. Produced once per step.
/// 一个已解析并验证的 MATLAB 安装。每个步骤生成一次。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installation {
    /// The MATLAB root folder (the one containing `bin/` and `VersionInfo.xml`).
    pub root: PathBuf,
    pub version: MatlabVersion,
    /// Release name such as `R2020b`, if `VersionInfo.xml` carried one.
    pub release: Option<String>,
    /// Absolute path of the `matlab` launcher under `root/bin`.
    pub executable: PathBuf,
}

impl Installation {
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn supports_batch(&self) -> bool {
        self.version >= BATCH_RELEASE.version
    }

    pub fn display_name(&self) -> String {
        match &self.release {
            Some(release) => format!("{} ({})", release, self.version),
            None => self.version.to_string(),
        }
    }
}

/// One entry of a test selection.
/// 测试选择中的一项。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Every test file under a workspace-relative folder (recursively).
    Folder(PathBuf),
    /// A single test file.
    File(PathBuf),
    /// A test class by (possibly package-qualified) name.
    Class(String),
    /// A single test procedure, written `Class/method`.
    Procedure(String),
    /// Keep only tests carrying this tag.
    Tag(String),
}

impl Selector {
    /// The DSL parameter the selector was declared under.
    pub fn parameter(&self) -> &'static str {
        match self {
            Selector::Folder(_) => "selectByFolder",
            Selector::File(_) => "selectByFile",
            Selector::Class(_) => "selectByClass",
            Selector::Procedure(_) => "selectByProcedure",
            Selector::Tag(_) => "selectByTag",
        }
    }

    /// Whether this selector picks tests (as opposed to filtering them).
    pub fn is_source(&self) -> bool {
        !matches!(self, Selector::Tag(_))
    }
}

/// What tests to run and which folders to put on the MATLAB path.
/// An empty selector list means every test under the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSelector {
    pub source_folders: Vec<PathBuf>,
    pub selectors: Vec<Selector>,
}

impl TestSelector {
    pub fn runs_all(&self) -> bool {
        !self.selectors.iter().any(Selector::is_source)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().filter_map(|s| match s {
            Selector::Tag(tag) => Some(tag.as_str()),
            _ => None,
        })
    }
}

/// The structured output formats MATLAB can be asked to produce.
/// MATLAB 可以生成的结构化输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    JUnitXml,
    Tap,
    CoberturaCode,
    CoberturaModel,
    SimulinkTestResults,
    Pdf,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Tap,
        ArtifactKind::JUnitXml,
        ArtifactKind::SimulinkTestResults,
        ArtifactKind::Pdf,
        ArtifactKind::CoberturaCode,
        ArtifactKind::CoberturaModel,
    ];

    /// The DSL parameter that declares this artifact.
    pub fn parameter(self) -> &'static str {
        match self {
            ArtifactKind::JUnitXml => "testResultsJUnit",
            ArtifactKind::Tap => "testResultsTAP",
            ArtifactKind::CoberturaCode => "codeCoverageCobertura",
            ArtifactKind::CoberturaModel => "modelCoverageCobertura",
            ArtifactKind::SimulinkTestResults => "testResultsSimulinkTest",
            ArtifactKind::Pdf => "testResultsPDF",
        }
    }

    /// Extension the target must carry, compared case-sensitively.
    /// TAP output is plain text and accepts any name.
    pub fn required_extension(self) -> Option<&'static str> {
        match self {
            ArtifactKind::JUnitXml | ArtifactKind::CoberturaCode | ArtifactKind::CoberturaModel => {
                Some(".xml")
            }
            ArtifactKind::SimulinkTestResults => Some(".mldatx"),
            ArtifactKind::Pdf => Some(".pdf"),
            ArtifactKind::Tap => None,
        }
    }

    pub fn minimum_release(self) -> MatlabRelease {
        match self {
            ArtifactKind::Tap => R2014A,
            ArtifactKind::JUnitXml => R2015B,
            ArtifactKind::Pdf => R2017A,
            ArtifactKind::CoberturaCode => R2017B,
            ArtifactKind::CoberturaModel => R2018B,
            ArtifactKind::SimulinkTestResults => R2019A,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::JUnitXml => "JUnit XML",
            ArtifactKind::Tap => "TAP",
            ArtifactKind::CoberturaCode => "Cobertura code coverage",
            ArtifactKind::CoberturaModel => "Cobertura model coverage",
            ArtifactKind::SimulinkTestResults => "Simulink Test results",
            ArtifactKind::Pdf => "PDF test report",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A declared output: which format, and where (workspace-relative or absolute).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputArtifactSpec {
    pub kind: ArtifactKind,
    pub target: PathBuf,
}

impl OutputArtifactSpec {
    pub fn new(kind: ArtifactKind, target: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

/// Final status of a build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Success,
    Failure,
}

/// Why a step failed, as written to the build log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&Error> for StepFailure {
    fn from(err: &Error) -> Self {
        Self {
            category: err.category(),
            message: err.to_string(),
        }
    }
}

/// An artifact that was produced, parsed, sanitized and accepted.
#[derive(Debug, Clone, Serialize)]
pub struct ProducedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub report: Report,
}

/// The immutable result of one build step.
/// 一个构建步骤的不可变结果。
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    /// DSL name of the step, e.g. `runMATLABTests`.
    pub step: String,
    pub status: StepStatus,
    /// The last lines of the build log, error message included.
    pub log_excerpt: Vec<String>,
    /// Empty unless the step succeeded.
    pub artifacts: Vec<ProducedArtifact>,
    pub failure: Option<StepFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    pub fn log_contains(&self, needle: &str) -> bool {
        self.log_excerpt.iter().any(|line| line.contains(needle))
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
