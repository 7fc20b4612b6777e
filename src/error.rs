//! 统一错误类型定义
//!
//! 使用 `thiserror` 定义控制面各服务的错误类型，并提供与 `anyhow` 的兼容层。

use std::path::PathBuf;
use thiserror::Error;

/// 控制面统一错误类型
#[derive(Error, Debug)]
pub enum LauncherError {
    /// 工具不存在（注册表中无此 ID）
    #[error("工具不存在: {0}")]
    ToolNotFound(String),

    /// 工具可执行文件缺失
    #[error("工具不存在: {tool_id}: {path}")]
    ExecutableMissing { tool_id: String, path: PathBuf },

    /// 工具启动失败
    #[error("工具启动失败: {tool_id}: {source}")]
    StartFailed {
        tool_id: String,
        #[source]
        source: std::io::Error,
    },

    /// 工具停止失败
    #[error("工具停止失败: {tool_id}: {reason}")]
    StopFailed { tool_id: String, reason: String },

    /// 线路标识无效
    #[error("线路不存在: {0}")]
    SourceMissing(String),

    /// 下载组件缺失
    #[error("wget 下载组件不存在: {0}")]
    HelperMissing(PathBuf),

    /// 目录创建失败
    #[error("无法创建目录: {path}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 所有镜像源均下载失败
    #[error("所有镜像源下载失败: {0}")]
    AllMirrorsFailed(String),

    /// 配置更新失败
    #[error("配置更新失败: {0}")]
    UpdateFailed(String),

    /// 浏览器启动失败
    #[error("Chrome启动失败，请确保Chrome已正确安装: {0}")]
    BrowserLaunchFailed(String),

    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 便于与现有代码集成的类型别名
pub type Result<T> = std::result::Result<T, LauncherError>;

// 注意：LauncherError 已通过 thiserror 实现了 std::error::Error trait，
// anyhow 会自动提供 From<LauncherError> for anyhow::Error 的实现，
// 因此无需手动实现，避免冲突。

/// 便捷的 I/O 错误构造器
impl LauncherError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
