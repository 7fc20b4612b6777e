//! 应用上下文
//!
//! 在启动时装配好全部服务，由外层壳持有并传给各命令。

use std::sync::Arc;

use crate::services::browser::BrowserLauncher;
use crate::services::layout::{self, InstallLayout};
use crate::services::registry::ToolRegistry;
use crate::services::supervisor::ProcessSupervisor;
use crate::services::update::ConfigUpdater;

/// 应用上下文，聚合各服务
pub struct AppContext {
    pub registry: Arc<ToolRegistry>,
    pub supervisor: Arc<ProcessSupervisor>,
    pub updater: ConfigUpdater,
    pub browser: BrowserLauncher,
}

impl AppContext {
    /// 以内置工具表和指定布局装配服务
    pub fn new(layout: Arc<dyn InstallLayout>) -> Self {
        Self::with_registry(Arc::new(ToolRegistry::builtin()), layout)
    }

    /// 以显式注册表装配服务
    pub fn with_registry(registry: Arc<ToolRegistry>, layout: Arc<dyn InstallLayout>) -> Self {
        let supervisor = Arc::new(ProcessSupervisor::new(
            Arc::clone(&registry),
            Arc::clone(&layout),
        ));
        let updater = ConfigUpdater::new(
            Arc::clone(&registry),
            Arc::clone(&layout),
            Arc::clone(&supervisor),
        );
        let browser = BrowserLauncher::new(Arc::clone(&registry), Arc::clone(&layout));

        Self {
            registry,
            supervisor,
            updater,
            browser,
        }
    }

    /// 按运行环境自动探测布局后装配
    pub fn detect() -> anyhow::Result<Self> {
        Ok(Self::new(layout::detect()?))
    }
}
