//! # Driver Script Generation Module / 驱动脚本生成模块
//!
//! Writes the MATLAB code a build step actually runs. Every generated file
//! lives in a fresh `genscript_*` temporary folder: the entry point is a
//! `runner_*.m` script and the helpers sit in the `+scriptgen` package, so
//! none of them can shadow or be shadowed by user code. The same names are
//! what the ingestor scrubs from coverage reports afterwards.
//!
//! The folder is owned by [`DriverScript`] and removed when it is dropped,
//! on success, failure and cancellation alike.
//!
//! 生成构建步骤实际运行的 MATLAB 代码。脚本目录在 `DriverScript` 被丢弃时删除。

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::core::errors::{Error, Result};
use crate::core::models::{ArtifactKind, Installation, OutputArtifactSpec, Selector};
use crate::core::validation::ValidatedTests;
use crate::infra::fs::{resolve_in, sanitize_identifier};

/// MATLAB package holding the generated helper functions.
pub const HELPER_PACKAGE: &str = "scriptgen";
/// File name prefix of the generated entry point.
pub const RUNNER_PREFIX: &str = "runner_";
/// Name prefix of the temporary folder holding the generated files.
pub const SCRIPT_DIR_PREFIX: &str = "genscript_";

const INTERNAL_MARKERS: [&str; 3] = ["+scriptgen", "genscript", "runner_"];

/// Substrings that identify generated code. They must never appear in a
/// report handed back to the user.
pub fn internal_markers() -> [&'static str; 3] {
    INTERNAL_MARKERS
}

const ADD_SOURCE_FOLDERS: &str = "\
function addSourceFolders(folders)
% Puts each source folder and its subfolders on the path.
for i = 1:numel(folders)
    addpath(genpath(folders{i}));
end
end
";

const SELECT_TESTS: &str = "\
function suite = selectTests(workspace, folders, files, classes, procedures, tag)
import matlab.unittest.TestSuite;
if isempty(folders) && isempty(files) && isempty(classes) && isempty(procedures)
    suite = TestSuite.fromFolder(workspace, 'IncludingSubfolders', true);
else
    suite = matlab.unittest.Test.empty;
    for i = 1:numel(folders)
        suite = [suite, TestSuite.fromFolder(fullfile(workspace, folders{i}), 'IncludingSubfolders', true)];
    end
    for i = 1:numel(files)
        suite = [suite, TestSuite.fromFile(fullfile(workspace, files{i}))];
    end
    for i = 1:numel(classes)
        suite = [suite, TestSuite.fromClass(meta.class.fromName(classes{i}))];
    end
    for i = 1:numel(procedures)
        parts = strsplit(procedures{i}, '/');
        suite = [suite, TestSuite.fromMethod(meta.class.fromName(parts{1}), parts{2})];
    end
end
if ~isempty(tag)
    suite = suite.selectIf(matlab.unittest.selectors.HasTag(tag));
end
end
";

const ENSURE_PARENT_FOLDER: &str = "\
function ensureParentFolder(file)
folder = fileparts(file);
if ~isempty(folder) && ~exist(folder, 'dir')
    mkdir(folder);
end
end
";

const TAP_PLUGIN: &str = "\
function plugin = tapPlugin(file)
stream = matlab.unittest.plugins.ToFile(file);
if verLessThan('matlab', '9.1')
    plugin = matlab.unittest.plugins.TAPPlugin.producingOriginalFormat(stream);
else
    plugin = matlab.unittest.plugins.TAPPlugin.producingVersion13(stream);
end
end
";

const ASSERT_NO_FAILURES: &str = "\
function assertNoFailures(results)
failed = nnz([results.Failed]) + nnz([results.Incomplete]);
if failed > 0
    error('scriptgen:testFailures', '%d test(s) did not pass.', failed);
end
end
";

const HELPERS: &[(&str, &str)] = &[
    ("addSourceFolders.m", ADD_SOURCE_FOLDERS),
    ("selectTests.m", SELECT_TESTS),
    ("ensureParentFolder.m", ENSURE_PARENT_FOLDER),
    ("tapPlugin.m", TAP_PLUGIN),
    ("assertNoFailures.m", ASSERT_NO_FAILURES),
];

/// A generated driver on disk. Dropping it deletes the folder.
/// 磁盘上生成的驱动脚本。丢弃时删除目录。
#[derive(Debug)]
pub struct DriverScript {
    dir: TempDir,
    entry_point: String,
    script_path: PathBuf,
}

impl DriverScript {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Name MATLAB calls to start the driver, e.g. `runner_k3j9x2`.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Arguments for the MATLAB launcher: user startup options first, then
    /// the driver invocation in the form `installation` understands.
    pub fn launch_args(
        &self,
        installation: &Installation,
        startup_options: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut args = match startup_options.map(str::trim).filter(|o| !o.is_empty()) {
            Some(options) => shlex::split(options)
                .ok_or_else(|| Error::config("startupOptions", "unbalanced quotes"))?,
            None => Vec::new(),
        };

        let call = format!(
            "addpath({}); {}",
            matlab_string(&self.dir().display().to_string()),
            self.entry_point
        );
        if installation.supports_batch() {
            args.push("-batch".to_string());
            args.push(call);
        } else {
            args.push("-nosplash".to_string());
            args.push("-nodesktop".to_string());
            if cfg!(windows) {
                args.push("-wait".to_string());
            }
            args.push("-r".to_string());
            args.push(format!(
                "try, {}; catch e, disp(getReport(e,'extended')); exit(1); end; exit(0);",
                call
            ));
        }
        Ok(args)
    }
}

/// Generates driver scripts for one workspace.
#[derive(Debug, Clone)]
pub struct DriverScriptGenerator {
    workspace: PathBuf,
}

impl DriverScriptGenerator {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    /// A driver that runs `command` from the workspace folder.
    pub fn for_command(&self, command: &str) -> Result<DriverScript> {
        let mut body = self.preamble();
        body.push_str(command.trim());
        body.push('\n');
        self.write(&body, false)
    }

    /// A driver that selects tests, attaches one plugin per requested
    /// artifact, runs the suite and fails when any test did not pass.
    pub fn for_tests(&self, tests: &ValidatedTests) -> Result<DriverScript> {
        let selector = &tests.selector;
        let mut body = self.preamble();

        let sources: Vec<String> = selector
            .source_folders
            .iter()
            .map(|f| self.absolute(f))
            .collect();
        if !sources.is_empty() {
            let _ = writeln!(body, "{}.addSourceFolders({});", HELPER_PACKAGE, matlab_cell(&sources));
        }

        let mut folders = Vec::new();
        let mut files = Vec::new();
        let mut classes = Vec::new();
        let mut procedures = Vec::new();
        for entry in &selector.selectors {
            match entry {
                Selector::Folder(p) => folders.push(p.display().to_string()),
                Selector::File(p) => files.push(p.display().to_string()),
                Selector::Class(c) => classes.push(c.clone()),
                Selector::Procedure(p) => procedures.push(p.clone()),
                Selector::Tag(_) => {}
            }
        }
        let tag = selector.tags().next().unwrap_or_default();
        let _ = writeln!(
            body,
            "suite = {}.selectTests({}, {}, {}, {}, {}, {});",
            HELPER_PACKAGE,
            matlab_string(&self.workspace.display().to_string()),
            matlab_cell(&folders),
            matlab_cell(&files),
            matlab_cell(&classes),
            matlab_cell(&procedures),
            matlab_string(tag)
        );
        body.push_str("runner = matlab.unittest.TestRunner.withTextOutput;\n");

        let coverage_folders = if sources.is_empty() {
            vec![self.workspace.display().to_string()]
        } else {
            sources
        };
        for artifact in &tests.artifacts {
            let target = self.absolute(&artifact.target);
            let _ = writeln!(body, "{}.ensureParentFolder({});", HELPER_PACKAGE, matlab_string(&target));
            let _ = writeln!(body, "runner.addPlugin({});", plugin_for(artifact, &target, &coverage_folders));
        }

        body.push_str("results = runner.run(suite);\n");
        body.push_str("display(results);\n");
        let _ = writeln!(body, "{}.assertNoFailures(results);", HELPER_PACKAGE);
        self.write(&body, true)
    }

    fn preamble(&self) -> String {
        format!("cd({});\n", matlab_string(&self.workspace.display().to_string()))
    }

    fn absolute(&self, path: &Path) -> String {
        resolve_in(&self.workspace, path).display().to_string()
    }

    fn write(&self, body: &str, with_helpers: bool) -> Result<DriverScript> {
        let dir = tempfile::Builder::new().prefix(SCRIPT_DIR_PREFIX).tempdir()?;
        let suffix = dir
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().trim_start_matches(SCRIPT_DIR_PREFIX).to_string())
            .unwrap_or_default();
        let entry_point = format!("{}{}", RUNNER_PREFIX, sanitize_identifier(&suffix));
        let script_path = dir.path().join(format!("{}.m", entry_point));
        fs::write(&script_path, body)?;

        if with_helpers {
            let package = dir.path().join(format!("+{}", HELPER_PACKAGE));
            fs::create_dir(&package)?;
            for (name, source) in HELPERS {
                fs::write(package.join(name), source)?;
            }
        }

        Ok(DriverScript {
            dir,
            entry_point,
            script_path,
        })
    }
}

fn plugin_for(artifact: &OutputArtifactSpec, target: &str, coverage_folders: &[String]) -> String {
    let file = matlab_string(target);
    match artifact.kind {
        ArtifactKind::Tap => format!("{}.tapPlugin({})", HELPER_PACKAGE, file),
        ArtifactKind::JUnitXml => {
            format!("matlab.unittest.plugins.XMLPlugin.producingJUnitFormat({})", file)
        }
        ArtifactKind::Pdf => {
            format!("matlab.unittest.plugins.TestReportPlugin.producingPDF({})", file)
        }
        ArtifactKind::CoberturaCode => format!(
            "matlab.unittest.plugins.CodeCoveragePlugin.forFolder({}, 'IncludingSubfolders', true, \
             'Producing', matlab.unittest.plugins.codecoverage.CoberturaFormat({}))",
            matlab_cell(coverage_folders),
            file
        ),
        ArtifactKind::CoberturaModel => format!(
            "sltest.plugins.ModelCoveragePlugin('Producing', \
             matlab.unittest.plugins.codecoverage.CoberturaFormat({}))",
            file
        ),
        ArtifactKind::SimulinkTestResults => {
            format!("sltest.plugins.TestManagerResultsPlugin('ExportToFile', {})", file)
        }
    }
}

/// Single-quoted MATLAB char vector literal.
pub fn matlab_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Cell array literal of char vectors, `{}` when empty.
pub fn matlab_cell(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| matlab_string(v)).collect();
    format!("{{{}}}", items.join(", "))
}
