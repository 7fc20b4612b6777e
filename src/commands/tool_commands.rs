//! 工具操作命令
//!
//! 面向外层壳的请求边界。服务层的类型化错误在这里展平为字符串，
//! 可恢复的局部状态（已在运行、本就未运行）作为成功响应返回。

use crate::commands::context::AppContext;
use crate::commands::types::{OpResponse, RunStatus};
use crate::models::tool::ToolSummary;
use crate::services::supervisor::{StartOutcome, StopOutcome};

/// 获取工具列表
pub async fn list_tools(ctx: &AppContext) -> Vec<ToolSummary> {
    ctx.registry.list()
}

/// 启动工具
pub async fn start_tool(ctx: &AppContext, tool_id: &str) -> Result<OpResponse, String> {
    let outcome = ctx
        .supervisor
        .start(tool_id)
        .await
        .map_err(|e| e.to_string())?;

    let message = match outcome {
        StartOutcome::Started => "工具启动成功",
        StartOutcome::AlreadyRunning => "工具已经在运行",
    };
    Ok(OpResponse {
        success: true,
        message: message.to_string(),
    })
}

/// 停止工具
pub async fn stop_tool(ctx: &AppContext, tool_id: &str) -> Result<OpResponse, String> {
    let outcome = ctx
        .supervisor
        .stop(tool_id)
        .await
        .map_err(|e| e.to_string())?;

    let message = match outcome {
        StopOutcome::Stopped => "工具停止成功",
        StopOutcome::NotRunning => "工具未运行",
    };
    Ok(OpResponse {
        success: true,
        message: message.to_string(),
    })
}

/// 检查工具运行状态
pub async fn check_tool_status(ctx: &AppContext, tool_id: &str) -> Result<RunStatus, String> {
    let running = ctx
        .supervisor
        .status(tool_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(RunStatus { running })
}

/// 更新工具配置
pub async fn update_config(
    ctx: &AppContext,
    tool_id: &str,
    source_id: &str,
) -> Result<OpResponse, String> {
    let outcome = ctx
        .updater
        .update(tool_id, source_id)
        .await
        .map_err(|e| e.to_string())?;

    Ok(OpResponse {
        success: true,
        message: outcome.message().to_string(),
    })
}

/// 打开经代理访问的浏览器
pub async fn open_proxied_browser(ctx: &AppContext, tool_id: &str) -> Result<OpResponse, String> {
    ctx.browser
        .open(tool_id)
        .await
        .map_err(|e| e.to_string())?;

    Ok(OpResponse {
        success: true,
        message: "浏览器已打开，使用代理访问".to_string(),
    })
}

/// 应用退出时停止所有工具
pub async fn shutdown(ctx: &AppContext) {
    ctx.supervisor.stop_all().await;
}
