//! 代理浏览器启动
//!
//! 按固定的本地代理地址启动 Chrome 访问外网。优先使用随应用分发的
//! 浏览器，缺失时回退到系统安装的 Chrome。浏览器进程独立运行，
//! 启动后不等待也不跟踪。

use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::error::{LauncherError, Result};
use crate::services::layout::InstallLayout;
use crate::services::registry::ToolRegistry;

/// 固定的本地代理地址
const PROXY_URL: &str = "http://127.0.0.1:7890";
/// 启动后打开的页面
const LANDING_URL: &str = "https://www.google.com";

/// 浏览器启动服务
pub struct BrowserLauncher {
    registry: Arc<ToolRegistry>,
    layout: Arc<dyn InstallLayout>,
}

impl BrowserLauncher {
    pub fn new(registry: Arc<ToolRegistry>, layout: Arc<dyn InstallLayout>) -> Self {
        Self { registry, layout }
    }

    /// 打开经代理访问的浏览器窗口
    pub async fn open(&self, tool_id: &str) -> Result<()> {
        self.registry.resolve(tool_id)?;

        let root = self.layout.root();
        let bundled = root.join("Browser").join(browser_file_name());
        let user_data_arg = format!("--user-data-dir={}", root.join("chrome-user-data").display());
        let proxy_arg = format!("--proxy-server={PROXY_URL}");

        let mut command = if bundled.exists() {
            tracing::info!(path = ?bundled, "使用内置 Chrome");
            let mut command = Command::new(&bundled);
            command.arg(&user_data_arg).arg(&proxy_arg).arg(LANDING_URL);
            command
        } else {
            tracing::info!("内置 Chrome 不存在，尝试系统 Chrome");
            system_chrome_command(&user_data_arg, &proxy_arg)
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        command.spawn().map_err(|e| {
            tracing::error!(error = ?e, "Chrome 启动失败");
            LauncherError::BrowserLaunchFailed(e.to_string())
        })?;

        tracing::info!(tool_id = %tool_id, proxy = %PROXY_URL, "浏览器已打开");
        Ok(())
    }
}

fn browser_file_name() -> &'static str {
    if cfg!(windows) {
        "chrome.exe"
    } else {
        "chrome"
    }
}

#[cfg(target_os = "windows")]
fn system_chrome_command(user_data_arg: &str, proxy_arg: &str) -> Command {
    let mut command = Command::new("cmd");
    command
        .arg("/C")
        .arg("start")
        .arg("chrome.exe")
        .arg(user_data_arg)
        .arg(proxy_arg)
        .arg(LANDING_URL);
    command
}

#[cfg(target_os = "macos")]
fn system_chrome_command(user_data_arg: &str, proxy_arg: &str) -> Command {
    let mut command = Command::new("open");
    command
        .arg("-a")
        .arg("Google Chrome")
        .arg("--args")
        .arg(user_data_arg)
        .arg(proxy_arg)
        .arg(LANDING_URL);
    command
}

#[cfg(all(unix, not(target_os = "macos")))]
fn system_chrome_command(user_data_arg: &str, proxy_arg: &str) -> Command {
    let mut command = Command::new("google-chrome");
    command.arg(user_data_arg).arg(proxy_arg).arg(LANDING_URL);
    command
}
