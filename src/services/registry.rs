//! 工具注册表
//!
//! 启动时由静态表构建，之后只读。查询不产生副作用。

use crate::error::{LauncherError, Result};
use crate::models::tool::{ToolDescriptor, ToolSummary};

/// 工具注册表
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// 使用内置工具表构建
    pub fn builtin() -> Self {
        Self {
            tools: ToolDescriptor::all(),
        }
    }

    /// 使用显式工具表构建
    pub fn from_descriptors(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// 工具列表，保持定义顺序
    pub fn list(&self) -> Vec<ToolSummary> {
        self.tools.iter().map(|t| t.summary()).collect()
    }

    /// 根据 ID 解析工具定义
    pub fn resolve(&self, id: &str) -> Result<&ToolDescriptor> {
        self.tools
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| LauncherError::ToolNotFound(id.to_string()))
    }

    /// 是否存在指定工具
    pub fn contains(&self, id: &str) -> bool {
        self.tools.iter().any(|t| t.id == id)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
