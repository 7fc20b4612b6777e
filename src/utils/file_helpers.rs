//! 文件操作辅助函数

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 计算文件的 SHA256 哈希值（十六进制字符串）
///
/// 配置安装后记录校验和，便于核对镜像内容问题。
pub fn file_checksum(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};

    let content = fs::read(path).with_context(|| format!("读取文件失败: {path:?}"))?;
    let digest = Sha256::digest(&content);
    Ok(format!("{digest:x}"))
}
