//! 内置组件引导
//!
//! 配置下载依赖随应用分发的 wget 组件。打包安装中该文件可能缺失，
//! 此时从分发包内的回退位置复制一份，并在 Unix 上补齐执行权限。

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{LauncherError, Result};
use crate::services::layout::InstallLayout;

/// 组件引导服务
pub struct AssetService {
    layout: Arc<dyn InstallLayout>,
}

impl AssetService {
    pub fn new(layout: Arc<dyn InstallLayout>) -> Self {
        Self { layout }
    }

    /// 下载组件文件名，按平台区分
    pub fn helper_file_name() -> &'static str {
        if cfg!(windows) {
            "wget.exe"
        } else {
            "wget"
        }
    }

    /// 确保下载组件存在且可执行，返回其绝对路径
    pub async fn ensure_download_helper(&self) -> Result<PathBuf> {
        let helper_path = self.layout.root().join(Self::helper_file_name());

        if tokio::fs::metadata(&helper_path).await.is_err() {
            tracing::warn!(path = ?helper_path, "下载组件不存在，尝试复制");
            let fallback = self
                .layout
                .asset_fallback_dir()
                .join(Self::helper_file_name());

            if fallback != helper_path && tokio::fs::metadata(&fallback).await.is_ok() {
                tokio::fs::copy(&fallback, &helper_path)
                    .await
                    .map_err(|e| {
                        tracing::error!(from = ?fallback, to = ?helper_path, error = ?e, "下载组件复制失败");
                        LauncherError::io(&helper_path, e)
                    })?;
                tracing::info!(path = ?helper_path, "下载组件复制成功");
            } else {
                tracing::error!(path = ?helper_path, "下载组件源文件不存在");
                return Err(LauncherError::HelperMissing(helper_path));
            }
        }

        // 执行权限补齐失败不阻止后续流程，留给下载时报错
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            match tokio::fs::metadata(&helper_path).await {
                Ok(meta) => {
                    let mut perms = meta.permissions();
                    if perms.mode() & 0o111 == 0 {
                        perms.set_mode(0o755);
                        if let Err(e) = tokio::fs::set_permissions(&helper_path, perms).await {
                            tracing::warn!(path = ?helper_path, error = ?e, "设置执行权限失败");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(path = ?helper_path, error = ?e, "读取组件权限失败");
                }
            }
        }

        Ok(helper_path)
    }
}
