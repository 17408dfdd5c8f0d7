//! # File System Operations Module / 文件系统操作模块
//!
//! Path helpers used before anything is launched: lexical normalization,
//! workspace containment, per-OS filename legality and a read-only
//! writability probe. None of these functions create or modify files.
//!
//! 启动前使用的路径辅助函数。这些函数都不会创建或修改文件。

use std::fs;
use std::path::{Component, Path, PathBuf};

/// The filename rules to validate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    Windows,
    Unix,
}

impl TargetOs {
    pub fn current() -> Self {
        if cfg!(windows) {
            TargetOs::Windows
        } else {
            TargetOs::Unix
        }
    }
}

const WINDOWS_ILLEGAL: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Returns why `component` cannot be used as a file or folder name on `os`,
/// or `None` if it can.
pub fn illegal_component(component: &str, os: TargetOs) -> Option<String> {
    if let Some(c) = component.chars().find(|c| *c == '\0') {
        return Some(format!("contains illegal character {:?}", c));
    }
    if os == TargetOs::Windows {
        if let Some(c) = component
            .chars()
            .find(|c| WINDOWS_ILLEGAL.contains(c) || (*c as u32) < 32)
        {
            return Some(format!("contains illegal character {:?}", c));
        }
        let stem = component.split('.').next().unwrap_or(component);
        if WINDOWS_RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
            return Some(format!("'{}' is a reserved device name", component));
        }
        if component != "." && component != ".." && component.ends_with(['.', ' ']) {
            return Some(format!("'{}' ends with a dot or space", component));
        }
    }
    None
}

/// Checks every normal component of `path` with [`illegal_component`].
pub fn illegal_path(path: &Path, os: TargetOs) -> Option<String> {
    path.components().find_map(|c| match c {
        Component::Normal(name) => illegal_component(&name.to_string_lossy(), os),
        _ => None,
    })
}

/// Resolves `.` and `..` without touching the file system. Returns `None`
/// when a relative path climbs above its starting point.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str()),
        }
    }
    Some(out)
}

/// Whether `path` is relative and stays inside the folder it is relative to.
pub fn stays_within(path: &Path) -> bool {
    !path.has_root() && path.is_relative() && normalize_lexically(path).is_some()
}

/// Joins a workspace-relative path onto `workspace`; absolute paths pass through.
pub fn resolve_in(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Decides, without writing anything, whether a file could be created at
/// `target`: the target must not be a folder, and its nearest existing
/// ancestor must be a writable folder.
pub fn probe_writable(target: &Path) -> Result<(), String> {
    if target.is_dir() {
        return Err("a folder with that name already exists".to_string());
    }
    let mut ancestor = target.parent();
    while let Some(dir) = ancestor {
        if dir.as_os_str().is_empty() {
            ancestor = dir.parent();
            continue;
        }
        match fs::metadata(dir) {
            Ok(meta) if !meta.is_dir() => {
                return Err(format!("'{}' is a file, not a folder", dir.display()));
            }
            Ok(meta) if meta.permissions().readonly() => {
                return Err(format!("folder '{}' is read-only", dir.display()));
            }
            Ok(_) => return Ok(()),
            Err(_) => ancestor = dir.parent(),
        }
    }
    Ok(())
}

/// Replaces everything but ASCII alphanumerics with `_`.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_is_only_illegal_on_windows() {
        assert!(illegal_component("x?.pdf", TargetOs::Windows).is_some());
        assert!(illegal_component("x?.pdf", TargetOs::Unix).is_none());
    }

    #[test]
    fn reserved_device_names_are_rejected_on_windows() {
        assert!(illegal_component("con.xml", TargetOs::Windows).is_some());
        assert!(illegal_component("console.xml", TargetOs::Windows).is_none());
    }

    #[test]
    fn normalize_detects_escape() {
        assert_eq!(
            normalize_lexically(Path::new("a/./b/../c")),
            Some(PathBuf::from("a/c"))
        );
        assert_eq!(normalize_lexically(Path::new("a/../../c")), None);
        assert!(stays_within(Path::new("test/TestSum")));
        assert!(!stays_within(Path::new("../outside")));
    }

    #[test]
    fn probe_rejects_file_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(probe_writable(&file.join("nested/report.pdf")).is_err());
        assert!(probe_writable(&dir.path().join("new/folder/report.pdf")).is_ok());
    }
}
