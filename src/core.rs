//! # Core Module / 核心模块
//!
//! This module contains the core functionality of the MATLAB runner:
//! data models, pipeline configuration, the step registry, parameter
//! validation, installation resolution, driver script generation and the
//! step execution engine.
//!
//! 此模块包含 MATLAB 运行器的核心功能：
//! 数据模型、流水线配置、步骤注册、参数验证、安装解析、驱动脚本生成和步骤执行引擎。

pub mod config;
pub mod errors;
pub mod execution;
pub mod installation;
pub mod models;
pub mod scriptgen;
pub mod steps;
pub mod validation;

// Re-exports
pub use config::PipelineFile;
pub use errors::{Error, ErrorCategory, Result};
pub use execution::{PipelineOutcome, StepContext, StepRecord, run_pipeline, run_step};
pub use models::BuildOutcome;
pub use steps::Step;
