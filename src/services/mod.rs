// 服务层模块
//
// - layout: 安装目录布局解析（打包/开发环境）
// - registry: 工具注册表
// - supervisor: 工具进程托管
// - fetcher: 镜像下载
// - assets: 内置组件引导
// - update: 配置更新管道
// - browser: 代理浏览器启动

pub mod assets;
pub mod browser;
pub mod fetcher;
pub mod layout;
pub mod registry;
pub mod supervisor;
pub mod update;

// 重新导出服务
pub use assets::AssetService;
pub use browser::BrowserLauncher;
pub use fetcher::MirrorFetcher;
pub use layout::{DevelopmentLayout, InstallLayout, PackagedLayout};
pub use registry::ToolRegistry;
pub use supervisor::{ProcessSupervisor, StartOutcome, StopOutcome};
pub use update::{ConfigUpdater, UpdateOutcome};
