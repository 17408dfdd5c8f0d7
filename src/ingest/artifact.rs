//! # Artifact Ingestion Module / 产物摄取模块
//!
//! Tracks each declared output through its lifecycle and turns the files
//! MATLAB wrote into [`Report`]s:
//!
//! ```text
//! Declared → PathValidated → FileLocated → Parsed → Sanitized → Accepted
//!                      (any non-terminal state) → Rejected
//! ```
//!
//! `Sanitized` only applies to Cobertura reports; other kinds go straight
//! from `Parsed` to `Accepted`.
//!
//! 跟踪每个声明输出的生命周期，并将 MATLAB 写出的文件转换为报告。

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{Error, Result};
use crate::core::models::{ArtifactKind, OutputArtifactSpec, ProducedArtifact};
use crate::infra::fs::resolve_in;
use crate::infra::xml::Document;
use crate::ingest::{Report, binary, cobertura, junit, tap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArtifactState {
    Declared,
    PathValidated,
    FileLocated,
    Parsed,
    Sanitized,
    Accepted,
    Rejected(String),
}

impl ArtifactState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ArtifactState::Accepted | ArtifactState::Rejected(_))
    }

    pub fn can_advance_to(&self, next: &ArtifactState) -> bool {
        use ArtifactState::*;
        match (self, next) {
            (from, Rejected(_)) => !from.is_terminal(),
            (Declared, PathValidated)
            | (PathValidated, FileLocated)
            | (FileLocated, Parsed)
            | (Parsed, Sanitized)
            | (Parsed, Accepted)
            | (Sanitized, Accepted) => true,
            _ => false,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ArtifactState::Declared => "Declared",
            ArtifactState::PathValidated => "PathValidated",
            ArtifactState::FileLocated => "FileLocated",
            ArtifactState::Parsed => "Parsed",
            ArtifactState::Sanitized => "Sanitized",
            ArtifactState::Accepted => "Accepted",
            ArtifactState::Rejected(_) => "Rejected",
        }
    }
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("artifact cannot move from {from} to {to}")]
pub struct IllegalTransition {
    pub from: String,
    pub to: String,
}

/// One declared output and where it is in its lifecycle.
#[derive(Debug, Clone)]
pub struct TrackedArtifact {
    pub spec: OutputArtifactSpec,
    /// `spec.target` resolved against the workspace.
    pub path: PathBuf,
    state: ArtifactState,
}

impl TrackedArtifact {
    pub fn state(&self) -> &ArtifactState {
        &self.state
    }

    pub fn advance(&mut self, next: ArtifactState) -> std::result::Result<(), IllegalTransition> {
        if !self.state.can_advance_to(&next) {
            return Err(IllegalTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    fn reject(&mut self, err: &Error) {
        if !self.state.is_terminal() {
            self.state = ArtifactState::Rejected(err.to_string());
        }
    }
}

/// All declared outputs of one step.
#[derive(Debug, Clone, Default)]
pub struct ArtifactTracker {
    entries: Vec<TrackedArtifact>,
}

impl ArtifactTracker {
    pub fn entries(&self) -> &[TrackedArtifact] {
        &self.entries
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.entries.iter().map(|e| e.spec.kind).collect()
    }

    /// Moves every `Declared` entry to `PathValidated`. Called once the
    /// pre-launch checks have passed.
    pub fn mark_validated(&mut self) -> std::result::Result<(), IllegalTransition> {
        for entry in &mut self.entries {
            entry.advance(ArtifactState::PathValidated)?;
        }
        Ok(())
    }

    /// Rejects every entry that has not reached a terminal state.
    pub fn reject_pending(&mut self, reason: &str) {
        for entry in &mut self.entries {
            if !entry.state.is_terminal() {
                entry.state = ArtifactState::Rejected(reason.to_string());
            }
        }
    }
}

/// Turns produced files into reports, scrubbing driver identifiers from
/// coverage output.
#[derive(Debug, Clone)]
pub struct ResultIngestor {
    workspace: PathBuf,
    markers: Vec<String>,
}

impl ResultIngestor {
    pub fn new(workspace: impl Into<PathBuf>, markers: Vec<String>) -> Self {
        Self {
            workspace: workspace.into(),
            markers,
        }
    }

    pub fn declare(&self, specs: &[OutputArtifactSpec]) -> ArtifactTracker {
        ArtifactTracker {
            entries: specs
                .iter()
                .map(|spec| TrackedArtifact {
                    spec: spec.clone(),
                    path: resolve_in(&self.workspace, &spec.target),
                    state: ArtifactState::Declared,
                })
                .collect(),
        }
    }

    /// Ingests every validated entry in declaration order. The first
    /// failure rejects the remaining entries and is returned.
    pub fn ingest(&self, tracker: &mut ArtifactTracker) -> Result<Vec<ProducedArtifact>> {
        let mut produced = Vec::with_capacity(tracker.entries.len());
        for index in 0..tracker.entries.len() {
            let entry = &mut tracker.entries[index];
            match self.ingest_one(entry) {
                Ok(artifact) => produced.push(artifact),
                Err(err) => {
                    entry.reject(&err);
                    tracker.reject_pending(&format!("not ingested: {}", err));
                    return Err(err);
                }
            }
        }
        Ok(produced)
    }

    /// Ingests every validated entry independently, so one missing or
    /// malformed file does not stop the others from being parsed and
    /// sanitized. Failed entries are rejected.
    pub fn ingest_each(&self, tracker: &mut ArtifactTracker) -> (Vec<ProducedArtifact>, Vec<Error>) {
        let mut produced = Vec::new();
        let mut problems = Vec::new();
        for entry in &mut tracker.entries {
            if entry.state != ArtifactState::PathValidated {
                continue;
            }
            match self.ingest_one(entry) {
                Ok(artifact) => produced.push(artifact),
                Err(err) => {
                    entry.reject(&err);
                    problems.push(err);
                }
            }
        }
        (produced, problems)
    }

    pub fn ingest_one(&self, entry: &mut TrackedArtifact) -> Result<ProducedArtifact> {
        let kind = entry.spec.kind;
        let path = entry.path.clone();
        let parse_error = |reason: String| Error::ArtifactParse {
            kind: kind.label().to_string(),
            path: path.clone(),
            reason,
        };
        let step = |entry: &mut TrackedArtifact, next: ArtifactState| {
            entry.advance(next).map_err(|e| parse_error(e.to_string()))
        };

        if !path.is_file() {
            return Err(Error::ArtifactMissing {
                kind: kind.label().to_string(),
                path: path.clone(),
            });
        }
        step(entry, ArtifactState::FileLocated)?;

        let report = match kind {
            ArtifactKind::Tap => {
                let text = fs::read_to_string(&path)?;
                Report::Tap(tap::parse(&text).map_err(parse_error)?)
            }
            ArtifactKind::JUnitXml => {
                let doc = read_xml(&path).map_err(parse_error)?;
                Report::JUnit(junit::summarize(&doc).map_err(parse_error)?)
            }
            ArtifactKind::Pdf => Report::Pdf(binary::inspect_pdf(&path).map_err(parse_error)?),
            ArtifactKind::SimulinkTestResults => {
                Report::SimulinkTest(binary::inspect_container(&path).map_err(parse_error)?)
            }
            ArtifactKind::CoberturaCode | ArtifactKind::CoberturaModel => {
                let mut doc = read_xml(&path).map_err(parse_error)?;
                cobertura::summarize(&doc, 0).map_err(parse_error)?;
                step(entry, ArtifactState::Parsed)?;

                let removed = cobertura::sanitize(&mut doc, &self.markers);
                if let Some(marker) = cobertura::find_leak(&doc, &self.markers) {
                    return Err(Error::ArtifactLeak {
                        kind: kind.label().to_string(),
                        path: path.clone(),
                        marker,
                    });
                }
                if removed > 0 {
                    let xml = doc.to_xml().map_err(|e| parse_error(e.to_string()))?;
                    fs::write(&path, xml)?;
                }
                step(entry, ArtifactState::Sanitized)?;
                Report::Coverage(cobertura::summarize(&doc, removed).map_err(parse_error)?)
            }
        };

        if entry.state == ArtifactState::FileLocated {
            step(entry, ArtifactState::Parsed)?;
        }
        step(entry, ArtifactState::Accepted)?;
        Ok(ProducedArtifact {
            kind,
            path: entry.path.clone(),
            report,
        })
    }
}

fn read_xml(path: &Path) -> std::result::Result<Document, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    Document::parse(&text).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_lifecycle() {
        use ArtifactState::*;
        assert!(Declared.can_advance_to(&PathValidated));
        assert!(Parsed.can_advance_to(&Accepted));
        assert!(!Declared.can_advance_to(&Parsed));
        assert!(!Accepted.can_advance_to(&Rejected("late".into())));
        assert!(FileLocated.can_advance_to(&Rejected("bad".into())));
    }

    #[test]
    fn missing_files_reject_the_entry() {
        let ws = tempfile::tempdir().unwrap();
        let ingestor = ResultIngestor::new(ws.path(), vec!["runner_".into()]);
        let mut tracker = ingestor.declare(&[
            OutputArtifactSpec::new(ArtifactKind::Tap, "results.tap"),
            OutputArtifactSpec::new(ArtifactKind::Pdf, "report.pdf"),
        ]);
        tracker.mark_validated().unwrap();
        let err = ingestor.ingest(&mut tracker).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing { .. }));
        assert!(
            tracker
                .entries()
                .iter()
                .all(|e| matches!(e.state(), ArtifactState::Rejected(_)))
        );
    }

    #[test]
    fn each_entry_is_ingested_on_its_own() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::write(
            ws.path().join("coverage.xml"),
            r#"<coverage><sources><source>/tmp/genscript_x</source></sources><packages/></coverage>"#,
        )
        .unwrap();
        let ingestor = ResultIngestor::new(ws.path(), vec!["genscript".into()]);
        let mut tracker = ingestor.declare(&[
            OutputArtifactSpec::new(ArtifactKind::JUnitXml, "results.xml"),
            OutputArtifactSpec::new(ArtifactKind::CoberturaCode, "coverage.xml"),
        ]);
        tracker.mark_validated().unwrap();

        let (produced, problems) = ingestor.ingest_each(&mut tracker);
        assert_eq!(produced.len(), 1);
        assert_eq!(problems.len(), 1);
        assert!(matches!(tracker.entries()[0].state(), ArtifactState::Rejected(_)));
        assert_eq!(tracker.entries()[1].state(), &ArtifactState::Accepted);
        let written = std::fs::read_to_string(ws.path().join("coverage.xml")).unwrap();
        assert!(!written.contains("genscript"));
    }

    #[test]
    fn leaked_markers_fail_loudly() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::write(
            ws.path().join("coverage.xml"),
            r#"<coverage><packages><package name="p"><classes><class name="c" filename="c.m"><methods><method name="runner_x"/></methods></class></classes></package></packages></coverage>"#,
        )
        .unwrap();
        let ingestor = ResultIngestor::new(ws.path(), vec!["runner_".into()]);
        let mut tracker =
            ingestor.declare(&[OutputArtifactSpec::new(ArtifactKind::CoberturaCode, "coverage.xml")]);
        tracker.mark_validated().unwrap();
        let err = ingestor.ingest(&mut tracker).unwrap_err();
        assert!(matches!(err, Error::ArtifactLeak { ref marker, .. } if marker == "runner_"));
    }
}
