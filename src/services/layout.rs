//! 安装目录布局解析
//!
//! 打包发行版与开发检出的目录结构不同。布局在启动时解析一次并注入各服务，
//! 服务内部不再各自拼接环境相关路径。

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// 安装目录布局
pub trait InstallLayout: Send + Sync {
    /// 安装根目录：各工具子目录与下载组件所在位置
    fn root(&self) -> PathBuf;

    /// 组件缺失时的回退来源目录
    fn asset_fallback_dir(&self) -> PathBuf {
        self.root()
    }
}

/// 开发检出布局：安装根目录即项目根目录
pub struct DevelopmentLayout {
    project_root: PathBuf,
}

impl DevelopmentLayout {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }
}

impl InstallLayout for DevelopmentLayout {
    fn root(&self) -> PathBuf {
        self.project_root.clone()
    }
}

/// 打包发行版布局：资源目录随应用分发
pub struct PackagedLayout {
    resources_dir: PathBuf,
    bundle_dir: PathBuf,
}

impl PackagedLayout {
    pub fn new(resources_dir: impl Into<PathBuf>, bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
            bundle_dir: bundle_dir.into(),
        }
    }
}

impl InstallLayout for PackagedLayout {
    fn root(&self) -> PathBuf {
        self.resources_dir.clone()
    }

    fn asset_fallback_dir(&self) -> PathBuf {
        self.bundle_dir.clone()
    }
}

/// 根据运行环境解析布局
///
/// 开发模式下可执行文件位于 `target/debug`，回到项目根目录（上三级）；
/// 打包模式下资源目录位于可执行文件旁。
pub fn detect() -> Result<Arc<dyn InstallLayout>> {
    let exe = std::env::current_exe().context("无法获取当前可执行文件路径")?;
    let exe_dir = exe
        .parent()
        .map(PathBuf::from)
        .context("无法获取可执行文件所在目录")?;

    if cfg!(debug_assertions) {
        // 开发模式: exe 在 target/debug 下，需要回到项目根目录
        let project_root = exe_dir
            .parent() // target
            .and_then(|p| p.parent()) // 项目根目录
            .map(PathBuf::from)
            .unwrap_or(exe_dir);

        tracing::debug!(root = ?project_root, "使用开发布局");
        Ok(Arc::new(DevelopmentLayout::new(project_root)))
    } else {
        let resources_dir = if cfg!(target_os = "macos") {
            // macOS: .app/Contents/Resources/
            exe_dir
                .parent()
                .map(|p| p.join("Resources"))
                .unwrap_or_else(|| exe_dir.join("resources"))
        } else {
            exe_dir.join("resources")
        };

        tracing::debug!(root = ?resources_dir, "使用打包布局");
        Ok(Arc::new(PackagedLayout::new(
            resources_dir,
            exe_dir.clone(),
        )))
    }
}
