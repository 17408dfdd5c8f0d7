//! # Command Execution Module / 命令执行模块
//!
//! Spawns a child process and streams its stdout and stderr into the build
//! log line by line while it runs. Two reader tasks feed a bounded channel;
//! the caller's task drains it continuously so the child never stalls on a
//! full pipe.
//!
//! 派生子进程并在其运行时逐行将 stdout 和 stderr 流式写入构建日志。

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::infra::log::BuildLog;

/// Lines buffered between the pipe readers and the log consumer.
pub const LINE_CHANNEL_CAPACITY: usize = 256;

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// The process exited on its own with this code.
    Exited(i32),
    /// The process was terminated by a signal it did not ask for.
    Signaled,
    /// The build step was aborted and the process killed.
    Cancelled,
}

impl ExitState {
    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitState::Exited(code),
            None => ExitState::Signaled,
        }
    }
}

/// What the runner observed while streaming the child's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedRun {
    pub exit: ExitState,
    /// First failure marker seen in the output, if any.
    pub marker: Option<String>,
    pub lines: usize,
}

/// Prepends `dir` to a PATH-style variable. `base` falls back to the
/// process's own PATH.
pub fn prepend_to_path(dir: &Path, base: Option<OsString>) -> OsString {
    let base = base.or_else(|| std::env::var_os("PATH"));
    let mut entries: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Some(base) = base {
        entries.extend(std::env::split_paths(&base).filter(|p| p != dir));
    }
    // Only fails when an entry contains the separator itself.
    std::env::join_paths(&entries).unwrap_or_else(|_| dir.as_os_str().to_os_string())
}

/// Spawns `cmd` and streams its combined output into `log`.
///
/// Every line is checked against `failure_markers`; the first hit is
/// reported in [`StreamedRun::marker`]. When `stop_token` fires, the child is
/// killed and the run reports [`ExitState::Cancelled`].
///
/// 派生 `cmd` 并将其合并输出流式写入 `log`。
pub async fn spawn_and_stream(
    mut cmd: tokio::process::Command,
    log: &mut BuildLog<'_>,
    failure_markers: &[String],
    stop_token: Option<CancellationToken>,
) -> std::io::Result<StreamedRun> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

    let (tx, mut rx) = mpsc::channel::<String>(LINE_CHANNEL_CAPACITY);
    let stdout_handle = tokio::spawn(forward_lines(stdout, tx.clone()));
    let stderr_handle = tokio::spawn(forward_lines(stderr, tx));

    let token = stop_token.unwrap_or_default();
    let mut marker: Option<String> = None;
    let mut lines = 0usize;
    let mut record = |line: String, log: &mut BuildLog<'_>| {
        if marker.is_none() {
            marker = failure_markers
                .iter()
                .find(|m| !m.is_empty() && line.contains(m.as_str()))
                .cloned();
        }
        lines += 1;
        log.output(&line);
    };

    let mut exit = loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                // Already-exited children make kill fail; that is fine.
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                break ExitState::Cancelled;
            }
            Some(line) = rx.recv() => record(line, log),
            status = child.wait() => break ExitState::from_status(status?),
        }
    };

    if exit != ExitState::Cancelled {
        // The readers finish once the pipes close, which a leftover
        // grandchild can delay indefinitely; the stop token still applies.
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    stdout_handle.abort();
                    stderr_handle.abort();
                    exit = ExitState::Cancelled;
                    break;
                }
                line = rx.recv() => match line {
                    Some(line) => record(line, log),
                    None => break,
                },
            }
        }
        if exit != ExitState::Cancelled {
            let _ = stdout_handle.await;
            let _ = stderr_handle.await;
        }
    }

    Ok(StreamedRun {
        exit,
        marker,
        lines,
    })
}

/// Reads `reader` line by line (lossily decoding non-UTF-8 bytes) and sends
/// each line without its terminator.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        }
    }
}
