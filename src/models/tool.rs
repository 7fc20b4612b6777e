use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 代理协议类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Http,
    Socks5,
}

/// 工具定义
///
/// 所有路径均相对于安装根目录，由 `InstallLayout` 在运行时解析为绝对路径。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    pub executable_path: PathBuf,
    pub config_path: PathBuf,
    pub listen_port: u16,
    pub proxy_kind: ProxyKind,
    /// 需要显式指定工作目录的工具（如 Clash.Meta 的 `-d`），
    /// 启动时附加 `[标志, <工具自身目录>]` 参数
    pub workdir_flag: Option<String>,
    /// 镜像 URL 中的发布目录名，默认与工具 ID 相同
    pub mirror_segment: Option<String>,
}

/// 工具列表项（返回给调用方的摘要信息）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    pub id: String,
    pub name: String,
}

fn tool(
    id: &str,
    name: &str,
    executable_path: &str,
    config_path: &str,
    listen_port: u16,
    proxy_kind: ProxyKind,
) -> ToolDescriptor {
    ToolDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        executable_path: PathBuf::from(executable_path),
        config_path: PathBuf::from(config_path),
        listen_port,
        proxy_kind,
        workdir_flag: None,
        mirror_segment: None,
    }
}

impl ToolDescriptor {
    /// 获取所有内置工具
    pub fn all() -> Vec<ToolDescriptor> {
        let mut clash_meta = tool(
            "clash.meta",
            "Clash.Meta",
            "clash.meta/clash.meta-windows-386.exe",
            "clash.meta/config.yaml",
            7890,
            ProxyKind::Http,
        );
        // Clash.Meta 在运行目录下解析附属文件，镜像发布目录为 clash.meta2
        clash_meta.workdir_flag = Some("-d".to_string());
        clash_meta.mirror_segment = Some("clash.meta2".to_string());

        vec![
            clash_meta,
            tool(
                "Xray",
                "Xray",
                "Xray/xray.exe",
                "Xray/config.json",
                10808,
                ProxyKind::Socks5,
            ),
            tool(
                "hysteria",
                "Hysteria",
                "hysteria/hysteria-tun-windows-6.0-386.exe",
                "hysteria/config.json",
                10809,
                ProxyKind::Socks5,
            ),
            tool(
                "hysteria2",
                "Hysteria2",
                "hysteria2/hysteria2.exe",
                "hysteria2/config.yaml",
                10810,
                ProxyKind::Socks5,
            ),
            tool(
                "juicity",
                "Juicity",
                "juicity/juicity-client.exe",
                "juicity/config.json",
                10811,
                ProxyKind::Socks5,
            ),
            tool(
                "mieru",
                "Mieru",
                "mieru/mieru.exe",
                "mieru/config.json",
                10812,
                ProxyKind::Socks5,
            ),
            tool(
                "naiveproxy",
                "NaiveProxy",
                "naiveproxy/naive.exe",
                "naiveproxy/config.json",
                10813,
                ProxyKind::Http,
            ),
            tool(
                "shadowquic",
                "ShadowQuic",
                "shadowquic/shadowquic.exe",
                "shadowquic/config.json",
                10814,
                ProxyKind::Socks5,
            ),
            tool(
                "singbox",
                "SingBox",
                "singbox/sing-box.exe",
                "singbox/config.json",
                10815,
                ProxyKind::Socks5,
            ),
        ]
    }

    /// 根据 ID 获取工具
    pub fn by_id(id: &str) -> Option<ToolDescriptor> {
        Self::all().into_iter().find(|t| t.id == id)
    }

    /// 工具自身所在的目录（相对于安装根目录）
    pub fn tool_dir(&self) -> PathBuf {
        self.executable_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default()
    }

    /// 配置文件名（如 `config.yaml`）
    pub fn config_file_name(&self) -> String {
        self.config_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("config.yaml")
            .to_string()
    }

    /// 镜像 URL 中使用的发布目录名
    pub fn mirror_segment(&self) -> &str {
        self.mirror_segment.as_deref().unwrap_or(&self.id)
    }

    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}
