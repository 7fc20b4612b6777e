// lib.rs - 暴露服务层给桌面外壳使用

pub mod commands;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{LauncherError, Result};
pub use models::*;
pub use services::{
    AssetService, BrowserLauncher, ConfigUpdater, InstallLayout, MirrorFetcher, ProcessSupervisor,
    StartOutcome, StopOutcome, ToolRegistry, UpdateOutcome,
};

pub use commands::AppContext;
pub use logging::{LogLevel, LogManager, LoggingConfig};
