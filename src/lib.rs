//! # MATLAB Runner Library / MATLAB Runner 库
//!
//! This library provides the core functionality for the MATLAB Runner tool,
//! which runs MATLAB commands and MATLAB test suites as CI build steps and
//! ingests the test and coverage artifacts they produce.
//!
//! 此库为 MATLAB Runner 工具提供核心功能，
//! 它将 MATLAB 命令和 MATLAB 测试套件作为 CI 构建步骤运行，并摄取其生成的测试和覆盖率产物。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, pipeline configuration and the step execution engine
//! - `infra` - Process streaming, the build log, path checks and XML handling
//! - `ingest` - Parsers and sanitizers for the artifacts MATLAB writes
//! - `reporting` - Console, HTML and JSON presentation of build outcomes
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、流水线配置和步骤执行引擎
//! - `infra` - 进程流式输出、构建日志、路径检查和 XML 处理
//! - `ingest` - MATLAB 所写产物的解析与清理
//! - `reporting` - 构建结果的控制台、HTML 和 JSON 展示
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod ingest;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::config;
pub use crate::core::execution;
pub use crate::core::models;

/// Initializes the application's internationalization (i18n) based on the
/// system locale and returns the locale that was selected.
///
/// It attempts to match the full locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en"), and finally falls back to "en".
pub fn init() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale.as_str()) {
        locale.as_str()
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
    lang.to_string()
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
