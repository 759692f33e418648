//! # Holo CLI
//!
//! 全息卡片方案编辑器的命令行宿主。
//!
//! ## 模块结构
//!
//! - [`config`]：配置文件
//! - [`logging`]：日志初始化
//! - [`commands`]：子命令与会话
//! - [`script`]：脚本模式（同一会话执行多条命令，支持撤销 / 重做）

pub mod commands;
pub mod config;
pub mod logging;
pub mod script;

pub use commands::{Command, SchemeArg, Session, repair_check};
pub use config::{AppConfig, ConfigError};
