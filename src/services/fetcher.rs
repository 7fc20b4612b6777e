//! 镜像下载
//!
//! 通过外部 wget 组件从镜像列表依次下载资源。镜像在部署环境中可能
//! 间歇性不可达，可靠性来自按顺序尝试不同的网络路径，而不是对同一
//! 地址反复重试。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{LauncherError, Result};

/// 单个镜像的下载时限
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// 镜像下载器
pub struct MirrorFetcher {
    helper_path: PathBuf,
    attempt_timeout: Duration,
}

impl MirrorFetcher {
    /// 创建下载器，`helper_path` 为 wget 组件的绝对路径
    pub fn new(helper_path: impl Into<PathBuf>) -> Self {
        Self {
            helper_path: helper_path.into(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// 调整单个镜像的下载时限
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// 依次尝试镜像列表，第一个产出非空文件的镜像胜出
    ///
    /// 任一镜像失败（组件无法执行、退出码非零、超时、产物缺失或为空）
    /// 都直接转向下一个镜像，不重试同一地址。全部失败时目标文件不会
    /// 残留。
    pub async fn fetch(&self, urls: &[String], destination: &Path) -> Result<()> {
        for url in urls {
            if self.try_mirror(url, destination).await {
                return Ok(());
            }
        }

        tracing::error!(destination = ?destination, "所有镜像源下载失败");
        if tokio::fs::metadata(destination).await.is_ok() {
            let _ = tokio::fs::remove_file(destination).await;
        }

        let name = destination
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("目标文件")
            .to_string();
        Err(LauncherError::AllMirrorsFailed(name))
    }

    async fn try_mirror(&self, url: &str, destination: &Path) -> bool {
        if url::Url::parse(url).is_err() {
            tracing::warn!(url = %url, "镜像地址无效，跳过");
            return false;
        }

        // 清理上次尝试残留，避免把旧文件误判为本次下载产物
        if tokio::fs::metadata(destination).await.is_ok() {
            if let Err(e) = tokio::fs::remove_file(destination).await {
                tracing::warn!(destination = ?destination, error = ?e, "清理临时文件失败");
            }
        }

        tracing::info!(url = %url, "尝试从镜像下载");

        let mut command = Command::new(&self.helper_path);
        command
            .arg("-t")
            .arg("2")
            .arg("--no-check-certificate")
            .arg(url)
            .arg("-O")
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.attempt_timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(url = %url, error = ?e, "下载组件执行失败");
                return false;
            }
            Err(_) => {
                // 超时后丢弃 output future，kill_on_drop 负责终止下载进程
                tracing::warn!(url = %url, timeout = ?self.attempt_timeout, "下载超时");
                return false;
            }
        };

        if !output.status.success() {
            tracing::warn!(
                url = %url,
                code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "下载退出码非零"
            );
            return false;
        }

        match tokio::fs::metadata(destination).await {
            Ok(meta) if meta.len() > 0 => {
                tracing::info!(url = %url, size = meta.len(), "下载成功");
                true
            }
            Ok(_) => {
                tracing::warn!(url = %url, "下载的文件为空，尝试下一个镜像");
                false
            }
            Err(_) => {
                tracing::warn!(url = %url, "下载后未找到目标文件");
                false
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_helper(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("wget");
        std::fs::write(&path, body).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_mirror_wins() {
        let dir = TempDir::new().unwrap();
        let helper = write_helper(
            dir.path(),
            "#!/bin/sh\nprintf 'payload-a' > \"$6\"\nexit 0\n",
        );
        let dest = dir.path().join("config.yaml");

        let fetcher = MirrorFetcher::new(&helper);
        fetcher
            .fetch(&urls(&["http://mirror-a.example/config.yaml"]), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "payload-a");
    }

    #[tokio::test]
    async fn test_fallback_to_second_mirror() {
        let dir = TempDir::new().unwrap();
        let helper = write_helper(
            dir.path(),
            "#!/bin/sh\ncase \"$4\" in\n  *good*) printf 'payload-b' > \"$6\"; exit 0 ;;\n  *) exit 1 ;;\nesac\n",
        );
        let dest = dir.path().join("config.yaml");

        let fetcher = MirrorFetcher::new(&helper);
        fetcher
            .fetch(
                &urls(&[
                    "http://mirror-a.example/bad/config.yaml",
                    "http://mirror-b.example/good/config.yaml",
                ]),
                &dest,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "payload-b");
    }

    #[tokio::test]
    async fn test_all_mirrors_failed() {
        let dir = TempDir::new().unwrap();
        let helper = write_helper(dir.path(), "#!/bin/sh\nexit 1\n");
        let dest = dir.path().join("config.yaml");

        let fetcher = MirrorFetcher::new(&helper);
        let err = fetcher
            .fetch(
                &urls(&[
                    "http://mirror-a.example/config.yaml",
                    "http://mirror-b.example/config.yaml",
                ]),
                &dest,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::AllMirrorsFailed(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_zero_length_payload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let helper = write_helper(
            dir.path(),
            "#!/bin/sh\ncase \"$4\" in\n  *empty*) : > \"$6\"; exit 0 ;;\n  *) printf 'data' > \"$6\"; exit 0 ;;\nesac\n",
        );
        let dest = dir.path().join("config.yaml");

        let fetcher = MirrorFetcher::new(&helper);
        fetcher
            .fetch(
                &urls(&[
                    "http://mirror-a.example/empty/config.yaml",
                    "http://mirror-b.example/full/config.yaml",
                ]),
                &dest,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "data");
    }

    #[tokio::test]
    async fn test_non_zero_exit_rejected_even_with_file() {
        let dir = TempDir::new().unwrap();
        let helper = write_helper(
            dir.path(),
            "#!/bin/sh\ncase \"$4\" in\n  *broken*) printf 'partial' > \"$6\"; exit 3 ;;\n  *) printf 'whole' > \"$6\"; exit 0 ;;\nesac\n",
        );
        let dest = dir.path().join("config.yaml");

        let fetcher = MirrorFetcher::new(&helper);
        fetcher
            .fetch(
                &urls(&[
                    "http://mirror-a.example/broken/config.yaml",
                    "http://mirror-b.example/ok/config.yaml",
                ]),
                &dest,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "whole");
    }

    #[tokio::test]
    async fn test_timeout_advances_to_next_mirror() {
        let dir = TempDir::new().unwrap();
        let helper = write_helper(
            dir.path(),
            "#!/bin/sh\ncase \"$4\" in\n  *slow*) sleep 5; printf 'late' > \"$6\"; exit 0 ;;\n  *) printf 'fast' > \"$6\"; exit 0 ;;\nesac\n",
        );
        let dest = dir.path().join("config.yaml");

        let fetcher =
            MirrorFetcher::new(&helper).with_attempt_timeout(Duration::from_millis(200));
        fetcher
            .fetch(
                &urls(&[
                    "http://mirror-a.example/slow/config.yaml",
                    "http://mirror-b.example/fast/config.yaml",
                ]),
                &dest,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "fast");
    }

    #[tokio::test]
    async fn test_helper_missing_counts_as_mirror_failure() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("config.yaml");

        let fetcher = MirrorFetcher::new(dir.path().join("no-such-wget"));
        let err = fetcher
            .fetch(&urls(&["http://mirror-a.example/config.yaml"]), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::AllMirrorsFailed(_)));
    }

    #[tokio::test]
    async fn test_stale_file_not_mistaken_for_download() {
        let dir = TempDir::new().unwrap();
        // 组件声称成功但什么都没写
        let helper = write_helper(dir.path(), "#!/bin/sh\nexit 0\n");
        let dest = dir.path().join("config.yaml");
        std::fs::write(&dest, "stale data").unwrap();

        let fetcher = MirrorFetcher::new(&helper);
        let err = fetcher
            .fetch(&urls(&["http://mirror-a.example/config.yaml"]), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::AllMirrorsFailed(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_invalid_url_is_skipped() {
        let dir = TempDir::new().unwrap();
        let helper = write_helper(
            dir.path(),
            "#!/bin/sh\nprintf 'ok' > \"$6\"\nexit 0\n",
        );
        let dest = dir.path().join("config.yaml");

        let fetcher = MirrorFetcher::new(&helper);
        fetcher
            .fetch(
                &urls(&["not a url", "http://mirror-b.example/config.yaml"]),
                &dest,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "ok");
    }
}
