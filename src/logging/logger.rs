use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use super::config::LoggingConfig;

/// 日志管理器，持有后台写线程的守卫
pub struct LogManager {
    config: LoggingConfig,
    _guards: Vec<WorkerGuard>,
}

impl LogManager {
    /// 初始化日志系统，配置来自环境变量
    pub fn init() -> Result<Self> {
        Self::init_with_config(Self::load_config_from_env())
    }

    /// 使用指定配置初始化日志系统
    pub fn init_with_config(config: LoggingConfig) -> Result<Self> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
        let mut guards = Vec::new();

        if config.console_enabled {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
            guards.push(guard);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false);

            if config.json_format {
                layers.push(layer.json().boxed());
            } else {
                layers.push(layer.boxed());
            }
        }

        if config.file_enabled {
            let log_dir = config.effective_log_dir();
            std::fs::create_dir_all(&log_dir)
                .with_context(|| format!("无法创建日志目录: {log_dir:?}"))?;

            let appender = tracing_appender::rolling::daily(&log_dir, "proxydeck.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            if config.json_format {
                layers.push(layer.json().boxed());
            } else {
                layers.push(layer.boxed());
            }
        }

        let filter = EnvFilter::new(format!("proxydeck={}", config.level));
        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .context("日志系统初始化失败")?;

        tracing::info!(
            level = %config.level,
            console = config.console_enabled,
            file = config.file_enabled,
            "日志系统初始化完成"
        );

        Ok(Self {
            config,
            _guards: guards,
        })
    }

    /// 从环境变量加载配置
    fn load_config_from_env() -> LoggingConfig {
        let mut config = LoggingConfig::default();

        if let Ok(level_str) = std::env::var("RUST_LOG") {
            if let Ok(level) = LoggingConfig::parse_level(&level_str) {
                config.level = level;
            }
        }

        if let Ok(enabled) = std::env::var("PROXYDECK_LOG_CONSOLE") {
            config.console_enabled = enabled.parse().unwrap_or(true);
        }

        if let Ok(enabled) = std::env::var("PROXYDECK_LOG_FILE") {
            config.file_enabled = enabled.parse().unwrap_or(true);
        }

        if let Ok(path) = std::env::var("PROXYDECK_LOG_PATH") {
            config.file_path = Some(path.into());
        }

        if let Ok(json_fmt) = std::env::var("PROXYDECK_LOG_JSON") {
            config.json_format = json_fmt.parse().unwrap_or(false);
        }

        config
    }

    /// 当前生效的日志配置
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::config::LogLevel;
    use serial_test::serial;
    use std::env;

    const LOG_VARS: [&str; 5] = [
        "RUST_LOG",
        "PROXYDECK_LOG_CONSOLE",
        "PROXYDECK_LOG_FILE",
        "PROXYDECK_LOG_PATH",
        "PROXYDECK_LOG_JSON",
    ];

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let saved = LOG_VARS
                .iter()
                .map(|name| {
                    let value = env::var(name).ok();
                    env::remove_var(name);
                    (*name, value)
                })
                .collect();
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(val) => env::set_var(name, val),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_config_defaults_without_env() {
        let _guard = EnvGuard::new();

        let config = LogManager::load_config_from_env();
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.console_enabled);
        assert!(config.file_enabled);
        assert!(config.file_path.is_none());
        assert!(!config.json_format);
    }

    #[test]
    #[serial]
    fn test_load_config_reads_env_overrides() {
        let _guard = EnvGuard::new();
        env::set_var("RUST_LOG", "debug");
        env::set_var("PROXYDECK_LOG_CONSOLE", "false");
        env::set_var("PROXYDECK_LOG_PATH", "/tmp/proxydeck-logs");
        env::set_var("PROXYDECK_LOG_JSON", "true");

        let config = LogManager::load_config_from_env();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.console_enabled);
        assert!(config.file_enabled);
        assert_eq!(
            config.file_path.as_deref(),
            Some(std::path::Path::new("/tmp/proxydeck-logs"))
        );
        assert!(config.json_format);
    }

    #[test]
    #[serial]
    fn test_load_config_ignores_invalid_values() {
        let _guard = EnvGuard::new();
        env::set_var("RUST_LOG", "proxydeck=debug,hyper=warn");
        env::set_var("PROXYDECK_LOG_CONSOLE", "maybe");

        let config = LogManager::load_config_from_env();
        // 非单一级别的过滤表达式不覆盖级别配置
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.console_enabled);
    }
}
