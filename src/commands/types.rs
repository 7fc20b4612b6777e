//! 命令层的请求/响应类型

use serde::{Deserialize, Serialize};

/// 操作结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpResponse {
    pub success: bool,
    pub message: String,
}

/// 工具运行状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub running: bool,
}
