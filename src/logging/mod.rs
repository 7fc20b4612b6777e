//! 日志模块
//!
//! 基于 tracing 的结构化日志，支持控制台与滚动文件双输出。

pub mod config;
pub mod logger;

pub use config::{LogLevel, LoggingConfig};
pub use logger::LogManager;
