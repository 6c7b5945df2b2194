//! 缓存键生成模块
//!
//! 缓存键为各组成部分以冒号拼接后的 MD5 十六进制摘要；
//! 同样的组成部分总是得到同样的键，且对顺序敏感。

use rat_logger::debug;
use std::fmt::Display;

/// 计算任意字节串的 MD5 十六进制摘要
pub fn hash_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// 由多个组成部分生成确定性的缓存键
///
/// # 参数
/// * `parts` - 键的组成部分，按顺序以 `:` 拼接
pub fn generate_key(parts: &[&dyn Display]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(":");
    let key = hash_hex(joined.as_bytes());
    debug!("生成缓存键: parts={}, key={}", joined, key);
    key
}

/// 为键加上版本命名空间
///
/// 变更配置中的版本号即可让旧版本写入的条目全部失效
pub(crate) fn namespaced(version: &str, key: &str) -> String {
    format!("{}:{}", version, key)
}
