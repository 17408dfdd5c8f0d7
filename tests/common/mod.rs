//! Shared helpers for integration tests: a fake MATLAB installation backed
//! by a shell script.
//!
//! 集成测试的共享辅助函数：由 shell 脚本模拟的 MATLAB 安装。
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// The launcher echoes the generated driver, copies prepared outputs into
/// the workspace when `FAKE_OUTPUTS` is set, then fails the way MATLAB would
/// when the driver mentions `apple`. A driver mentioning `pause` hangs; one
/// mentioning `background` exits at once but leaves a process holding the
/// output pipes. `FAKE_FAILURE` is printed before exiting with code 1, after
/// the outputs are in place, like a test run with failing tests.
const FAKE_LAUNCHER: &str = r#"#!/bin/sh
call=""
while [ $# -gt 0 ]; do
  case "$1" in
    -batch|-r) call="$2"; shift 2 ;;
    *) echo "startup option: $1"; shift ;;
  esac
done
dir=$(printf '%s' "$call" | sed -n "s/.*addpath('\([^']*\)').*/\1/p")
entry=$(printf '%s' "$call" | sed -n 's/.*; \(runner_[A-Za-z0-9_]*\).*/\1/p')
script="$dir/$entry.m"
if [ ! -f "$script" ]; then
  echo "Undefined function or variable '$entry'." >&2
  exit 1
fi
echo "driver: $script"
cat "$script"
if grep -q "pause" "$script"; then
  exec sleep 30
fi
if grep -q "background" "$script"; then
  sleep 30 &
  exit 0
fi
if [ -n "$FAKE_OUTPUTS" ]; then
  cp -R "$FAKE_OUTPUTS"/. .
fi
if [ -n "$FAKE_FAILURE" ]; then
  echo "$FAKE_FAILURE"
  exit 1
fi
if grep -q "apple" "$script"; then
  echo "Unrecognized function or variable 'apple'." >&2
  exit 1
fi
exit 0
"#;

/// A MATLAB root in a temporary folder.
pub struct FakeMatlab {
    pub dir: TempDir,
}

impl FakeMatlab {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn root_str(&self) -> String {
        self.root().display().to_string()
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root().join("bin")
    }
}

/// Creates a fake MATLAB root reporting `version` and `release`.
pub fn fake_matlab(version: &str, release: &str) -> FakeMatlab {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("Failed to create temporary directory");
    let bin = dir.path().join("bin");
    fs::create_dir_all(&bin).expect("Failed to create bin directory");

    let launcher = bin.join("matlab");
    fs::write(&launcher, FAKE_LAUNCHER).expect("Failed to write launcher");
    let mut perms = fs::metadata(&launcher).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&launcher, perms).unwrap();

    fs::write(
        dir.path().join("VersionInfo.xml"),
        format!(
            "<!-- Version information for MATLAB -->\n\
             <MathWorks_version_info>\n  <version>{version}</version>\n  \
             <release>{release}</release>\n  <description></description>\n  \
             <date>Feb 14 2023</date>\n</MathWorks_version_info>\n"
        ),
    )
    .expect("Failed to write VersionInfo.xml");

    FakeMatlab { dir }
}

/// A recent release that supports every output and `-batch`.
pub fn current_matlab() -> FakeMatlab {
    fake_matlab("9.14.0.2206163", "R2023a")
}

/// Creates an empty workspace with a `src` folder.
pub fn workspace() -> TempDir {
    let dir = tempdir().expect("Failed to create temporary directory");
    fs::create_dir_all(dir.path().join("src")).expect("Failed to create src directory");
    dir
}

/// Writes `files` (relative path, contents) under a fresh folder that the
/// fake launcher copies into the workspace when `FAKE_OUTPUTS` points at it.
pub fn prepared_outputs(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().expect("Failed to create temporary directory");
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
    }
    dir
}

/// A Cobertura report as MATLAB writes it when the driver folder is on the
/// path: one user class plus entries for the generated helpers.
pub const LEAKY_COBERTURA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<coverage branch-rate="NaN" line-rate="0.6" lines-covered="3" lines-valid="5" timestamp="1700000000" version="1.0">
  <sources>
    <source>/ws</source>
    <source>/tmp/genscript_q8w2e1</source>
  </sources>
  <packages>
    <package name="" line-rate="1">
      <classes>
        <class name="testSquare" filename="testSquare.m" line-rate="1">
          <methods/>
          <lines><line number="1" hits="1"/><line number="2" hits="1"/></lines>
        </class>
      </classes>
    </package>
    <package name="+scriptgen" line-rate="0.3333">
      <classes>
        <class name="selectTests" filename="+scriptgen/selectTests.m" line-rate="0.3333">
          <methods/>
          <lines><line number="1" hits="1"/><line number="2" hits="0"/><line number="3" hits="0"/></lines>
        </class>
      </classes>
    </package>
  </packages>
</coverage>
"#;

pub const JUNIT_REPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites>
  <testsuite name="testSquare" tests="2" failures="0" errors="0" skipped="0" time="0.01">
    <testcase classname="testSquare" name="testPositive" time="0.004"/>
    <testcase classname="testSquare" name="testZero" time="0.003"/>
  </testsuite>
</testsuites>
"#;

pub const TAP_REPORT: &str =
    "TAP version 13\n1..2\nok 1 - testSquare/testPositive\nok 2 - testSquare/testZero\n";
