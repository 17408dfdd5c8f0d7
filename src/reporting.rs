//! # Reporting Module / 报告模块
//!
//! This module presents pipeline outcomes: colorful console summaries with
//! internationalization support, a standalone HTML page, and JSON for hosts
//! that read build results programmatically.
//!
//! 此模块展示流水线结果：支持国际化的彩色控制台摘要、独立的 HTML 页面以及 JSON。

pub mod console;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
pub use html::generate_html_report;
pub use json::generate_json_report;
