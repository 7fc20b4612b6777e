//! 工具进程托管
//!
//! ProcessSupervisor 负责外部代理工具进程的生命周期：
//! - 启动和停止指定工具，保证同一工具至多一个进程
//! - 通过轮询感知进程退出并清理登记
//! - 汇报运行状态（仅本地登记，不做操作系统级探测）
//!
//! 工具进程与托管方生命周期分离：托管方退出后工具继续运行，
//! 但托管方仍持有句柄，可以主动停止。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock};

use crate::error::{LauncherError, Result};
use crate::models::tool::ToolDescriptor;
use crate::services::layout::InstallLayout;
use crate::services::registry::ToolRegistry;

/// 进程退出轮询间隔
const DEFAULT_EXIT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// 重启时停止与启动之间的等待时间
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// 运行中的工具进程登记
struct RunningTool {
    child: Child,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
}

/// 启动结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// 新进程已启动
    Started,
    /// 工具已经在运行，未启动新进程
    AlreadyRunning,
}

/// 停止结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// 已发送停止信号并移除登记
    Stopped,
    /// 工具本来就未运行
    NotRunning,
}

/// 工具进程管理器
pub struct ProcessSupervisor {
    registry: Arc<ToolRegistry>,
    layout: Arc<dyn InstallLayout>,
    running: Arc<RwLock<HashMap<String, RunningTool>>>,
    op_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    exit_poll_interval: Duration,
    settle_delay: Duration,
}

impl ProcessSupervisor {
    /// 创建新的进程管理器
    pub fn new(registry: Arc<ToolRegistry>, layout: Arc<dyn InstallLayout>) -> Self {
        Self {
            registry,
            layout,
            running: Arc::new(RwLock::new(HashMap::new())),
            op_locks: Mutex::new(HashMap::new()),
            exit_poll_interval: DEFAULT_EXIT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// 调整退出轮询间隔
    pub fn with_exit_poll_interval(mut self, interval: Duration) -> Self {
        self.exit_poll_interval = interval;
        self
    }

    /// 调整重启等待时间
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// 启动指定工具
    ///
    /// 同一工具重复启动是幂等的，不会产生第二个进程。
    pub async fn start(&self, tool_id: &str) -> Result<StartOutcome> {
        let tool = self.registry.resolve(tool_id)?.clone();
        let lock = self.op_lock(tool_id).await;
        let _guard = lock.lock().await;
        self.start_locked(&tool).await
    }

    /// 停止指定工具
    ///
    /// 未运行时直接返回 `NotRunning`。发送信号失败会报错，
    /// 但登记总是被移除，避免一直跟踪僵死的句柄。
    pub async fn stop(&self, tool_id: &str) -> Result<StopOutcome> {
        self.registry.resolve(tool_id)?;
        let lock = self.op_lock(tool_id).await;
        let _guard = lock.lock().await;
        self.stop_locked(tool_id).await
    }

    /// 重启指定工具：停止、等待、再启动
    ///
    /// 整个序列持有该工具的操作锁，期间的其他 start/stop 请求会排队。
    pub async fn restart(&self, tool_id: &str) -> Result<StartOutcome> {
        let tool = self.registry.resolve(tool_id)?.clone();
        let lock = self.op_lock(tool_id).await;
        let _guard = lock.lock().await;

        self.stop_locked(tool_id).await?;
        tokio::time::sleep(self.settle_delay).await;
        self.start_locked(&tool).await
    }

    /// 查询工具运行状态
    ///
    /// 只反映本地登记，进程被外部强杀后到下一次轮询前会短暂显示为运行中。
    pub async fn status(&self, tool_id: &str) -> Result<bool> {
        self.registry.resolve(tool_id)?;
        Ok(self.running.read().await.contains_key(tool_id))
    }

    /// 停止所有登记中的工具，用于应用退出时清理
    ///
    /// 尽力而为，单个失败只记录日志。
    pub async fn stop_all(&self) {
        let mut table = self.running.write().await;
        for (tool_id, entry) in table.drain() {
            let RunningTool { mut child, pid, .. } = entry;
            match child.start_kill() {
                Ok(()) => {
                    tracing::info!(tool_id = %tool_id, pid = ?pid, "停止工具");
                    tokio::spawn(async move {
                        let _ = child.wait().await;
                    });
                }
                Err(e) => {
                    tracing::error!(tool_id = %tool_id, error = ?e, "停止工具失败");
                }
            }
        }
    }

    async fn start_locked(&self, tool: &ToolDescriptor) -> Result<StartOutcome> {
        let exe_path = self.layout.root().join(&tool.executable_path);
        if !exe_path.exists() {
            tracing::warn!(tool_id = %tool.id, path = ?exe_path, "工具可执行文件不存在");
            return Err(LauncherError::ExecutableMissing {
                tool_id: tool.id.clone(),
                path: exe_path,
            });
        }

        {
            let table = self.running.read().await;
            if table.contains_key(&tool.id) {
                tracing::info!(tool_id = %tool.id, "工具已经在运行");
                return Ok(StartOutcome::AlreadyRunning);
            }
        }

        let mut command = Command::new(&exe_path);
        if let Some(flag) = &tool.workdir_flag {
            // 该工具在指定目录下解析附属文件
            command
                .arg(flag)
                .arg(self.layout.root().join(tool.tool_dir()));
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // 与托管方生命周期分离：独立进程组，托管方退出不影响工具
        #[cfg(unix)]
        command.process_group(0);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW | CREATE_NEW_PROCESS_GROUP);

        let child = command.spawn().map_err(|e| {
            tracing::error!(tool_id = %tool.id, error = ?e, "工具启动失败");
            LauncherError::StartFailed {
                tool_id: tool.id.clone(),
                source: e,
            }
        })?;

        let pid = child.id();
        tracing::info!(tool_id = %tool.id, pid = ?pid, "工具启动成功");

        {
            let mut table = self.running.write().await;
            table.insert(
                tool.id.clone(),
                RunningTool {
                    child,
                    pid,
                    started_at: Utc::now(),
                },
            );
        }

        self.spawn_exit_watcher(tool.id.clone(), pid);
        Ok(StartOutcome::Started)
    }

    async fn stop_locked(&self, tool_id: &str) -> Result<StopOutcome> {
        let mut table = self.running.write().await;
        let Some(entry) = table.remove(tool_id) else {
            tracing::info!(tool_id = %tool_id, "工具未运行");
            return Ok(StopOutcome::NotRunning);
        };
        drop(table);

        let RunningTool { mut child, pid, .. } = entry;
        match child.start_kill() {
            Ok(()) => {
                tracing::info!(tool_id = %tool_id, pid = ?pid, "工具停止成功");
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
                Ok(StopOutcome::Stopped)
            }
            Err(e) => {
                // 进程可能已自行退出，此时按已停止处理
                if matches!(child.try_wait(), Ok(Some(_))) {
                    tracing::info!(tool_id = %tool_id, "工具已自行退出");
                    return Ok(StopOutcome::Stopped);
                }
                tracing::error!(tool_id = %tool_id, error = ?e, "工具停止失败");
                Err(LauncherError::StopFailed {
                    tool_id: tool_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// 轮询进程退出并清理登记
    ///
    /// 登记被移除或被新进程替换后观察任务自行结束。
    fn spawn_exit_watcher(&self, tool_id: String, expected_pid: Option<u32>) {
        let running = Arc::clone(&self.running);
        let interval = self.exit_poll_interval;

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut table = running.write().await;

                let exited = match table.get_mut(&tool_id) {
                    Some(entry) if entry.pid == expected_pid => match entry.child.try_wait() {
                        Ok(Some(status)) => Some((status, entry.started_at)),
                        Ok(None) => None,
                        Err(e) => {
                            tracing::warn!(tool_id = %tool_id, error = ?e, "检查工具进程状态失败");
                            None
                        }
                    },
                    _ => break,
                };

                if let Some((status, started_at)) = exited {
                    table.remove(&tool_id);
                    tracing::info!(
                        tool_id = %tool_id,
                        code = ?status.code(),
                        started_at = %started_at,
                        "工具退出"
                    );
                    break;
                }
            }
        });
    }

    async fn op_lock(&self, tool_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.op_locks.lock().await;
        locks
            .entry(tool_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    async fn pid(&self, tool_id: &str) -> Option<u32> {
        self.running.read().await.get(tool_id).and_then(|e| e.pid)
    }
}
