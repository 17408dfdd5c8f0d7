//! # Build Log Module / 构建日志模块
//!
//! The build log is where every line of MATLAB output, every progress message
//! and every error ends up. Sinks decide where lines go (console, memory,
//! channel); `BuildLog` wraps a sink and keeps the tail that is attached to
//! the `BuildOutcome`.
//!
//! 构建日志：MATLAB 输出、进度消息和错误都写入这里。

use colored::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Origin of a log line, used by sinks that render lines differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A line produced by the MATLAB process.
    Output,
    /// A progress message from the runner itself.
    Info,
    /// An error message from the runner itself.
    Error,
}

/// A destination for build log lines.
pub trait LogSink: Send {
    fn line(&mut self, kind: LineKind, line: &str);
}

/// Prints lines to stdout as they arrive.
#[derive(Debug, Default)]
pub struct ConsoleLog;

impl LogSink for ConsoleLog {
    fn line(&mut self, kind: LineKind, line: &str) {
        match kind {
            LineKind::Output => println!("{}", line),
            LineKind::Info => println!("{}", line.blue()),
            LineKind::Error => println!("{}", line.red()),
        }
    }
}

/// Collects lines in memory. Clones share the same buffer, so a test can keep
/// one handle and give the other to the runner.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for MemoryLog {
    fn line(&mut self, _kind: LineKind, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Forwards lines to an unbounded channel, for callers that watch the log
/// while the step is still running.
#[derive(Debug, Clone)]
pub struct ChannelLog {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelLog {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl LogSink for ChannelLog {
    fn line(&mut self, _kind: LineKind, line: &str) {
        // The receiver going away must not fail the build.
        let _ = self.tx.send(line.to_string());
    }
}

/// Fixed-capacity ring of the most recent lines.
#[derive(Debug, Clone)]
pub struct LogTail {
    capacity: usize,
    lines: VecDeque<String>,
}

impl LogTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: VecDeque::with_capacity(capacity.clamp(1, 1024)),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into_iter().collect()
    }
}

/// The log of a single build step: a sink plus the retained tail.
pub struct BuildLog<'a> {
    sink: &'a mut dyn LogSink,
    tail: LogTail,
}

impl<'a> BuildLog<'a> {
    pub fn new(sink: &'a mut dyn LogSink, tail_lines: usize) -> Self {
        Self {
            sink,
            tail: LogTail::new(tail_lines),
        }
    }

    pub fn output(&mut self, line: &str) {
        self.write(LineKind::Output, line);
    }

    pub fn info(&mut self, line: &str) {
        self.write(LineKind::Info, line);
    }

    pub fn error(&mut self, line: &str) {
        self.write(LineKind::Error, line);
    }

    fn write(&mut self, kind: LineKind, line: &str) {
        self.sink.line(kind, line);
        self.tail.push(line);
    }

    pub fn into_excerpt(self) -> Vec<String> {
        self.tail.into_lines()
    }
}
