//! # Step Registry Module / 步骤注册模块
//!
//! The closed set of build steps a pipeline may call, looked up by their DSL
//! name. Each step's parameters are deserialized into a typed struct that
//! rejects unknown parameters.
//!
//! 流水线可以调用的封闭步骤集合，按 DSL 名称查找。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::errors::{Error, Result};
use crate::core::models::{ArtifactKind, OutputArtifactSpec, Selector, TestSelector};

/// Which step handler a DSL name maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    RunCommand,
    RunTests,
}

/// DSL name → handler. Lookup is exact and case-sensitive.
pub const STEP_REGISTRY: &[(&str, StepKind)] = &[
    ("runMATLABCommand", StepKind::RunCommand),
    ("runMATLABTests", StepKind::RunTests),
];

impl StepKind {
    pub fn lookup(name: &str) -> Result<Self> {
        STEP_REGISTRY
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| Error::NoSuchStep {
                name: name.to_string(),
                available: STEP_REGISTRY
                    .iter()
                    .map(|(n, _)| *n)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    pub fn dsl_name(self) -> &'static str {
        match self {
            StepKind::RunCommand => "runMATLABCommand",
            StepKind::RunTests => "runMATLABTests",
        }
    }
}

/// `runMATLABCommand`: run one MATLAB statement or script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunCommandStep {
    pub command: String,
    /// Extra MATLAB startup options, e.g. `-nojvm -logfile out.log`.
    #[serde(default)]
    pub startup_options: Option<String>,
    /// Named tool for this step only.
    #[serde(default)]
    pub tool: Option<String>,
    /// Explicit MATLAB root for this step only.
    #[serde(default)]
    pub matlab_root: Option<String>,
}

/// `runMATLABTests`: run a test suite and export results.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunTestsStep {
    #[serde(default, rename = "sourceFolder")]
    pub source_folder: Vec<String>,
    #[serde(default, rename = "selectByFolder")]
    pub select_by_folder: Vec<String>,
    #[serde(default, rename = "selectByFile")]
    pub select_by_file: Vec<String>,
    #[serde(default, rename = "selectByClass")]
    pub select_by_class: Vec<String>,
    #[serde(default, rename = "selectByProcedure")]
    pub select_by_procedure: Vec<String>,
    #[serde(default, rename = "selectByTag")]
    pub select_by_tag: Option<String>,
    #[serde(default, rename = "testResultsTAP")]
    pub test_results_tap: Option<String>,
    #[serde(default, rename = "testResultsJUnit")]
    pub test_results_junit: Option<String>,
    #[serde(default, rename = "testResultsSimulinkTest")]
    pub test_results_simulink_test: Option<String>,
    #[serde(default, rename = "testResultsPDF")]
    pub test_results_pdf: Option<String>,
    #[serde(default, rename = "codeCoverageCobertura")]
    pub code_coverage_cobertura: Option<String>,
    #[serde(default, rename = "modelCoverageCobertura")]
    pub model_coverage_cobertura: Option<String>,
    #[serde(default, rename = "startupOptions")]
    pub startup_options: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default, rename = "matlabRoot")]
    pub matlab_root: Option<String>,
}

impl RunTestsStep {
    pub fn test_selector(&self) -> TestSelector {
        let mut selectors = Vec::new();
        selectors.extend(self.select_by_folder.iter().map(|f| Selector::Folder(PathBuf::from(f))));
        selectors.extend(self.select_by_file.iter().map(|f| Selector::File(PathBuf::from(f))));
        selectors.extend(self.select_by_class.iter().cloned().map(Selector::Class));
        selectors.extend(self.select_by_procedure.iter().cloned().map(Selector::Procedure));
        selectors.extend(self.select_by_tag.iter().cloned().map(Selector::Tag));
        TestSelector {
            source_folders: self.source_folder.iter().map(PathBuf::from).collect(),
            selectors,
        }
    }

    /// Declared outputs in a fixed order (TAP, JUnit, Simulink Test, PDF,
    /// code coverage, model coverage).
    pub fn artifacts(&self) -> Vec<OutputArtifactSpec> {
        ArtifactKind::ALL
            .iter()
            .filter_map(|kind| {
                self.target_for(*kind)
                    .map(|target| OutputArtifactSpec::new(*kind, target))
            })
            .collect()
    }

    fn target_for(&self, kind: ArtifactKind) -> Option<&str> {
        let target = match kind {
            ArtifactKind::Tap => &self.test_results_tap,
            ArtifactKind::JUnitXml => &self.test_results_junit,
            ArtifactKind::SimulinkTestResults => &self.test_results_simulink_test,
            ArtifactKind::Pdf => &self.test_results_pdf,
            ArtifactKind::CoberturaCode => &self.code_coverage_cobertura,
            ArtifactKind::CoberturaModel => &self.model_coverage_cobertura,
        };
        target.as_deref()
    }
}

/// A typed step ready for validation and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    RunCommand(RunCommandStep),
    RunTests(RunTestsStep),
}

impl Step {
    /// Turns a raw `[[steps]]` table into a typed step. The table's `step`
    /// key names the handler; every other key is a parameter of it.
    pub fn from_table(table: &toml::Table) -> Result<Self> {
        let name = match table.get("step") {
            Some(toml::Value::String(name)) => name.as_str(),
            Some(_) => return Err(Error::config("step", "must be a string")),
            None => return Err(Error::config("step", "missing step name")),
        };
        let kind = StepKind::lookup(name)?;

        let mut params = table.clone();
        params.remove("step");
        let params = toml::Value::Table(params);
        let parse_error = |e: toml::de::Error| Error::Configuration {
            parameter: kind.dsl_name().to_string(),
            reason: e.message().trim().to_string(),
        };
        match kind {
            StepKind::RunCommand => params
                .try_into::<RunCommandStep>()
                .map(Step::RunCommand)
                .map_err(parse_error),
            StepKind::RunTests => params
                .try_into::<RunTestsStep>()
                .map(Step::RunTests)
                .map_err(parse_error),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Step::RunCommand(_) => StepKind::RunCommand,
            Step::RunTests(_) => StepKind::RunTests,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().dsl_name()
    }

    pub fn tool(&self) -> Option<&str> {
        match self {
            Step::RunCommand(s) => s.tool.as_deref(),
            Step::RunTests(s) => s.tool.as_deref(),
        }
    }

    pub fn matlab_root(&self) -> Option<&str> {
        match self {
            Step::RunCommand(s) => s.matlab_root.as_deref(),
            Step::RunTests(s) => s.matlab_root.as_deref(),
        }
    }

    pub fn startup_options(&self) -> Option<&str> {
        match self {
            Step::RunCommand(s) => s.startup_options.as_deref(),
            Step::RunTests(s) => s.startup_options.as_deref(),
        }
    }

    /// One-line description used in logs and error messages,
    /// e.g. `runMATLABCommand 'version'`.
    pub fn describe(&self) -> String {
        match self {
            Step::RunCommand(s) => format!("{} '{}'", self.name(), s.command),
            Step::RunTests(_) => self.name().to_string(),
        }
    }
}
