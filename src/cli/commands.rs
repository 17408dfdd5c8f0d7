//! # CLI Commands Module / CLI 命令模块
//!
//! One module per subcommand: `run`, `command` and `init`.
//!
//! 每个子命令一个模块：`run`、`command` 和 `init`。

pub mod command;
pub mod init;
pub mod run;
