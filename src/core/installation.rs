//! # Installation Resolution Module / 安装解析模块
//!
//! Finds the MATLAB installation a step should use. An explicit root wins
//! over a named tool, which wins over whatever `matlab` is first on PATH.
//! Whatever is found is checked for a launcher under `bin/` and a readable,
//! supported version in `VersionInfo.xml`.
//!
//! 查找步骤应使用的 MATLAB 安装。显式根目录优先于命名工具，命名工具优先于 PATH。

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::NamedTool;
use crate::core::errors::{Error, Result};
use crate::core::models::{ArtifactKind, Installation, MINIMUM_RELEASE, MatlabVersion};
use crate::infra::fs::resolve_in;
use crate::infra::xml::Document;

#[cfg(windows)]
pub const MATLAB_EXECUTABLE: &str = "matlab.exe";
#[cfg(not(windows))]
pub const MATLAB_EXECUTABLE: &str = "matlab";

pub const VERSION_INFO_FILE: &str = "VersionInfo.xml";

/// Named installations available to a build, passed in explicitly rather
/// than looked up from global state.
/// 构建可用的命名安装，显式传入而非从全局状态查找。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRegistry {
    tools: Vec<NamedTool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<NamedTool>) -> Result<Self> {
        for (i, tool) in tools.iter().enumerate() {
            if tool.name.trim().is_empty() {
                return Err(Error::config("tools.name", "tool name must not be empty"));
            }
            if tools[..i].iter().any(|t| t.name == tool.name) {
                return Err(Error::config(
                    "tools.name",
                    format!("tool '{}' is configured more than once", tool.name),
                ));
            }
        }
        Ok(Self { tools })
    }

    pub fn get(&self, name: &str) -> Option<&NamedTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Resolves installations against a tool registry and a PATH value.
pub struct InstallationResolver<'a> {
    tools: &'a ToolRegistry,
    path_var: Option<OsString>,
    cwd: PathBuf,
}

impl<'a> InstallationResolver<'a> {
    /// `path_var` is the PATH to scan; `None` means the process's PATH.
    pub fn new(tools: &'a ToolRegistry, path_var: Option<OsString>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            tools,
            path_var,
            cwd: cwd.into(),
        }
    }

    /// Resolves in order: `explicit_root`, then `tool`, then PATH.
    /// Blank strings count as not given; relative roots are taken from the
    /// resolver's working folder.
    pub fn resolve(&self, explicit_root: Option<&str>, tool: Option<&str>) -> Result<Installation> {
        if let Some(root) = non_blank(explicit_root) {
            let root = expand("matlabRoot", root)?;
            return inspect_root(&resolve_in(&self.cwd, &root));
        }
        if let Some(name) = non_blank(tool) {
            let named = self.tools.get(name).ok_or_else(|| Error::ToolNotConfigured {
                tool: name.to_string(),
                available: self.tools.names().join(", "),
            })?;
            let root = expand("tools.home", &named.home)?;
            return inspect_root(&resolve_in(&self.cwd, &root));
        }
        self.resolve_from_path()
    }

    fn resolve_from_path(&self) -> Result<Installation> {
        let path_var = self.path_var.clone().or_else(|| std::env::var_os("PATH"));
        let found = which::which_in(MATLAB_EXECUTABLE, path_var, &self.cwd)
            .map_err(|_| Error::InstallationNotFound)?;
        // `/usr/local/bin/matlab` is usually a link into the real root.
        let executable = fs::canonicalize(&found).unwrap_or(found);
        let root = executable
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| Error::InstallationInvalid {
                root: executable.clone(),
                reason: "launcher is not inside a 'bin' folder".to_string(),
            })?;
        inspect_root(root)
    }
}

/// Validates a candidate root folder and reads its version.
pub fn inspect_root(root: &Path) -> Result<Installation> {
    if !root.is_dir() {
        return Err(Error::InstallationInvalid {
            root: root.to_path_buf(),
            reason: "folder does not exist".to_string(),
        });
    }
    let executable = root.join("bin").join(MATLAB_EXECUTABLE);
    if !executable.is_file() {
        return Err(Error::InstallationInvalid {
            root: root.to_path_buf(),
            reason: format!("no MATLAB launcher at '{}'", executable.display()),
        });
    }
    let (version, release) = read_version_info(root)?;
    if version < MINIMUM_RELEASE.version {
        return Err(Error::IncompatibleVersion {
            found: release.clone().unwrap_or_else(|| version.to_string()),
            minimum: MINIMUM_RELEASE.to_string(),
            feature: String::new(),
        });
    }
    Ok(Installation {
        root: root.to_path_buf(),
        version,
        release,
        executable,
    })
}

/// Reads `<version>` and `<release>` from `VersionInfo.xml`.
pub fn read_version_info(root: &Path) -> Result<(MatlabVersion, Option<String>)> {
    let path = root.join(VERSION_INFO_FILE);
    let invalid = |reason: String| Error::InstallationInvalid {
        root: root.to_path_buf(),
        reason,
    };
    let text = fs::read_to_string(&path)
        .map_err(|e| invalid(format!("cannot read '{}': {}", path.display(), e)))?;
    let doc = Document::parse(&text)
        .map_err(|e| invalid(format!("cannot parse '{}': {}", path.display(), e)))?;
    let raw_version = doc
        .root
        .child("version")
        .map(|v| v.text())
        .ok_or_else(|| invalid(format!("'{}' has no <version>", path.display())))?;
    let version = MatlabVersion::parse(&raw_version)
        .ok_or_else(|| invalid(format!("unrecognized MATLAB version '{}'", raw_version.trim())))?;
    let release = doc
        .root
        .child("release")
        .map(|r| r.text().trim().to_string())
        .filter(|r| !r.is_empty());
    Ok((version, release))
}

/// Fails if `installation` is too old to produce one of `kinds`.
pub fn check_artifact_support(installation: &Installation, kinds: &[ArtifactKind]) -> Result<()> {
    let too_new = kinds
        .iter()
        .map(|k| (k, k.minimum_release()))
        .filter(|(_, min)| installation.version < min.version)
        .max_by_key(|(_, min)| min.version);
    match too_new {
        Some((kind, minimum)) => Err(Error::IncompatibleVersion {
            found: installation.display_name(),
            minimum: minimum.to_string(),
            feature: format!(" for {} output ('{}')", kind.label(), kind.parameter()),
        }),
        None => Ok(()),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn expand(parameter: &str, raw: &str) -> Result<PathBuf> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.into_owned()))
        .map_err(|e| Error::config(parameter, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install_at(root: &Path, version: &str) {
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join("bin").join(MATLAB_EXECUTABLE), "").unwrap();
        fs::write(
            root.join(VERSION_INFO_FILE),
            format!("<MathWorks_version_info><version>{version}</version><release>R2021a</release></MathWorks_version_info>"),
        )
        .unwrap();
    }

    #[test]
    fn relative_roots_resolve_against_the_workspace() {
        let ws = tempfile::tempdir().unwrap();
        install_at(&ws.path().join("toolchain/matlab"), "9.10.0.1602886");
        let tools = ToolRegistry::new(vec![NamedTool {
            name: "local".into(),
            home: "toolchain/matlab".into(),
        }])
        .unwrap();
        let resolver = InstallationResolver::new(&tools, None, ws.path());

        let explicit = resolver.resolve(Some("toolchain/matlab"), None).unwrap();
        assert_eq!(explicit.root, ws.path().join("toolchain/matlab"));
        assert_eq!(explicit.release.as_deref(), Some("R2021a"));

        let named = resolver.resolve(None, Some("local")).unwrap();
        assert_eq!(named.root, explicit.root);
    }

    #[test]
    fn versions_below_the_minimum_are_rejected() {
        let ws = tempfile::tempdir().unwrap();
        install_at(ws.path(), "8.1.0.604");
        let err = inspect_root(ws.path()).unwrap_err();
        assert!(matches!(err, Error::IncompatibleVersion { .. }));
    }
}
