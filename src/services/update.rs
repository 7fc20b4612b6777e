//! 配置更新管道
//!
//! 从镜像源下载新配置，备份旧配置后安装，必要时重启对应工具。
//! 下载、校验、备份、安装是关键路径，逐步推进，任一步失败即终止
//! 且不回滚已完成的步骤；重启是尽力而为，不会把已成功的配置更新
//! 降级为失败。

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LauncherError, Result};
use crate::models::tool::ToolDescriptor;
use crate::services::assets::AssetService;
use crate::services::fetcher::MirrorFetcher;
use crate::services::layout::InstallLayout;
use crate::services::registry::ToolRegistry;
use crate::services::supervisor::ProcessSupervisor;
use crate::utils::file_helpers::file_checksum;

/// 合法的线路标识
static SOURCE_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,32}$").expect("invalid source id regex"));

/// 镜像站点，按顺序尝试。线路与工具决定站点下的具体路径。
const MIRROR_HOSTS: [&str; 2] = [
    "https://www.gitlabip.xyz/Alvin9999/PAC/refs/heads/master/backup/img/1/2/ipp",
    "https://gitlab.com/free9999/ipupdate/-/raw/master/backup/img/1/2/ipp",
];

/// 更新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 配置已更新，工具原本未运行
    Applied,
    /// 配置已更新且工具已重启
    AppliedAndRestarted,
    /// 配置已更新，但重启失败，需要手动重启
    AppliedRestartFailed,
}

impl UpdateOutcome {
    /// 返回给调用方的结果消息
    pub fn message(&self) -> &'static str {
        match self {
            UpdateOutcome::Applied => "IP更新成功",
            UpdateOutcome::AppliedAndRestarted => "IP更新成功，工具已重启",
            UpdateOutcome::AppliedRestartFailed => "IP更新成功，但工具重启失败",
        }
    }
}

/// 配置更新服务
pub struct ConfigUpdater {
    registry: Arc<ToolRegistry>,
    layout: Arc<dyn InstallLayout>,
    supervisor: Arc<ProcessSupervisor>,
    assets: AssetService,
    attempt_timeout: Option<Duration>,
}

impl ConfigUpdater {
    pub fn new(
        registry: Arc<ToolRegistry>,
        layout: Arc<dyn InstallLayout>,
        supervisor: Arc<ProcessSupervisor>,
    ) -> Self {
        let assets = AssetService::new(Arc::clone(&layout));
        Self {
            registry,
            layout,
            supervisor,
            assets,
            attempt_timeout: None,
        }
    }

    /// 调整单个镜像的下载时限
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// 按线路标识更新指定工具的配置
    ///
    /// 工具在更新开始时处于运行状态的，安装完成后会自动重启。
    pub async fn update(&self, tool_id: &str, source_id: &str) -> Result<UpdateOutcome> {
        let tool = self.registry.resolve(tool_id)?.clone();

        if !SOURCE_ID_REGEX.is_match(source_id) {
            tracing::warn!(tool_id = %tool_id, source_id = %source_id, "线路标识无效");
            return Err(LauncherError::SourceMissing(source_id.to_string()));
        }

        let was_running = self.supervisor.status(tool_id).await?;
        tracing::info!(
            tool_id = %tool_id,
            source_id = %source_id,
            was_running,
            "开始更新配置"
        );

        let config_path = self.layout.root().join(&tool.config_path);
        let config_dir = config_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.layout.root());

        tokio::fs::create_dir_all(&config_dir).await.map_err(|e| {
            tracing::error!(path = ?config_dir, error = ?e, "配置目录创建失败");
            LauncherError::DirectoryCreateFailed {
                path: config_dir.clone(),
                source: e,
            }
        })?;

        let helper_path = self.assets.ensure_download_helper().await?;

        let mut fetcher = MirrorFetcher::new(&helper_path);
        if let Some(timeout) = self.attempt_timeout {
            fetcher = fetcher.with_attempt_timeout(timeout);
        }

        let urls = mirror_urls(&tool, source_id);
        let temp_path = config_dir.join(format!("{}.download", tool.config_file_name()));

        if let Err(e) = fetcher.fetch(&urls, &temp_path).await {
            return Err(match e {
                LauncherError::AllMirrorsFailed(_) => {
                    LauncherError::UpdateFailed("无法下载配置文件".to_string())
                }
                other => other,
            });
        }

        self.install_config(&tool, &temp_path, &config_path).await?;

        if !was_running {
            return Ok(UpdateOutcome::Applied);
        }

        match self.supervisor.restart(tool_id).await {
            Ok(_) => {
                tracing::info!(tool_id = %tool_id, "工具重启成功");
                Ok(UpdateOutcome::AppliedAndRestarted)
            }
            Err(e) => {
                // 配置已经落盘，重启失败只记录，由调用方提示手动重启
                tracing::warn!(tool_id = %tool_id, error = ?e, "工具重启失败");
                Ok(UpdateOutcome::AppliedRestartFailed)
            }
        }
    }

    /// 备份旧配置并安装下载产物
    async fn install_config(
        &self,
        tool: &ToolDescriptor,
        temp_path: &Path,
        config_path: &Path,
    ) -> Result<()> {
        if tokio::fs::metadata(config_path).await.is_ok() {
            let backup_path = backup_path_for(config_path);

            if tokio::fs::metadata(&backup_path).await.is_ok() {
                if let Err(e) = tokio::fs::remove_file(&backup_path).await {
                    tracing::warn!(path = ?backup_path, error = ?e, "删除旧备份失败");
                }
            }

            // 备份失败不阻止更新，旧配置仍可能被覆盖前读取
            match tokio::fs::rename(config_path, &backup_path).await {
                Ok(()) => tracing::info!(tool_id = %tool.id, path = ?backup_path, "旧配置已备份"),
                Err(e) => tracing::warn!(tool_id = %tool.id, error = ?e, "备份旧配置失败"),
            }
        }

        tokio::fs::copy(temp_path, config_path)
            .await
            .map_err(|e| {
                tracing::error!(tool_id = %tool.id, error = ?e, "复制新配置失败");
                LauncherError::UpdateFailed("无法复制配置文件".to_string())
            })?;

        match file_checksum(config_path) {
            Ok(checksum) => {
                tracing::info!(tool_id = %tool.id, checksum = %checksum, "新配置已安装");
            }
            Err(e) => {
                tracing::warn!(tool_id = %tool.id, error = ?e, "计算配置校验和失败");
            }
        }

        if let Err(e) = tokio::fs::remove_file(temp_path).await {
            tracing::warn!(path = ?temp_path, error = ?e, "删除临时文件失败");
        }

        Ok(())
    }
}

/// 由工具与线路派生镜像 URL 列表
fn mirror_urls(tool: &ToolDescriptor, source_id: &str) -> Vec<String> {
    let segment = tool.mirror_segment();
    let file_name = tool.config_file_name();
    MIRROR_HOSTS
        .iter()
        .map(|host| format!("{host}/{segment}/{source_id}/{file_name}"))
        .collect()
}

/// 备份路径：配置路径追加 `_backup`，单槽覆盖
fn backup_path_for(config_path: &Path) -> PathBuf {
    let mut path = config_path.as_os_str().to_os_string();
    path.push("_backup");
    PathBuf::from(path)
}
