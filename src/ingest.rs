//! # Result Ingestion Module / 结果摄取模块
//!
//! Parsers and validators for everything MATLAB can be asked to write:
//! JUnit XML, TAP, Cobertura coverage, PDF reports and Simulink Test result
//! containers. Each parsed file becomes a [`Report`] attached to the
//! step's outcome.
//!
//! JUnit XML、TAP、Cobertura 覆盖率、PDF 报告和 Simulink Test 结果的解析与验证。

pub mod artifact;
pub mod binary;
pub mod cobertura;
pub mod junit;
pub mod tap;

use serde::Serialize;

pub use artifact::{ArtifactState, ArtifactTracker, ResultIngestor, TrackedArtifact};
pub use binary::{ContainerSummary, PdfSummary};
pub use cobertura::CoverageSummary;
pub use junit::JUnitSummary;
pub use tap::TapSummary;

/// The parsed content of one produced artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "format", rename_all = "camelCase")]
pub enum Report {
    JUnit(JUnitSummary),
    Tap(TapSummary),
    Coverage(CoverageSummary),
    SimulinkTest(ContainerSummary),
    Pdf(PdfSummary),
}

impl Report {
    /// One-line summary for the console and HTML report.
    pub fn headline(&self) -> String {
        match self {
            Report::JUnit(s) => format!(
                "{} tests, {} passed, {} failed, {} errors, {} skipped",
                s.tests,
                s.passed(),
                s.failures,
                s.errors,
                s.skipped
            ),
            Report::Tap(s) => format!(
                "{} tests, {} passed, {} failed, {} skipped",
                s.planned, s.passed, s.failed, s.skipped
            ),
            Report::Coverage(s) => format!(
                "line rate {:.1}% ({}/{} lines, {} classes)",
                s.line_rate * 100.0,
                s.lines_covered,
                s.lines_valid,
                s.classes.len()
            ),
            Report::SimulinkTest(s) => format!("{} entries, {} bytes", s.entries, s.bytes),
            Report::Pdf(s) => format!("{} bytes", s.bytes),
        }
    }
}
