//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the runner,
//! including command execution, the build log, file system checks,
//! XML handling and i18n support.
//!
//! 此模块为运行器提供基础设施服务，
//! 包括命令执行、构建日志、文件系统检查、XML 处理和国际化支持。

pub mod command;
pub mod fs;
pub mod log;
pub mod xml;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
