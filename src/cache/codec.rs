//! 缓存值编解码
//!
//! 远程与磁盘后端把值存为字节串：优先使用 bincode 二进制格式，
//! 失败时退回 JSON 文本格式。首字节标记格式。解码按
//! 二进制 -> JSON -> 原始字符串 的顺序逐级退回，其他客户端写入的
//! 无标记数据也能读出。

use crate::error::QueryCacheResult;
use crate::types::CacheValue;
use rat_logger::{debug, warn};

const BINARY_TAG: u8 = 0xB1;
const TEXT_TAG: u8 = 0xB2;

/// 编码缓存值
pub fn encode(value: &CacheValue) -> QueryCacheResult<Vec<u8>> {
    match bincode::serialize(value) {
        Ok(body) => {
            let mut out = Vec::with_capacity(body.len() + 1);
            out.push(BINARY_TAG);
            out.extend_from_slice(&body);
            Ok(out)
        }
        Err(e) => {
            debug!("二进制编码失败，改用JSON: {}", e);
            let body = serde_json::to_vec(value).map_err(|e| {
                crate::qc_error!(
                    serialization,
                    crate::i18n::tf("error.encode", &[("message", &e.to_string())])
                )
            })?;
            let mut out = Vec::with_capacity(body.len() + 1);
            out.push(TEXT_TAG);
            out.extend_from_slice(&body);
            Ok(out)
        }
    }
}

/// 解码缓存值，永不失败
pub fn decode(raw: &[u8]) -> CacheValue {
    if let Some((tag, body)) = raw.split_first() {
        match *tag {
            BINARY_TAG => match bincode::deserialize::<CacheValue>(body) {
                Ok(value) => return value,
                Err(e) => warn!("二进制解码失败，尝试JSON: {}", e),
            },
            TEXT_TAG => {
                if let Ok(value) = serde_json::from_slice::<CacheValue>(body) {
                    return value;
                }
            }
            _ => {}
        }
    }

    // 无标记的 JSON（例如其他客户端直接写入）
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(raw) {
        return CacheValue::from(json);
    }

    CacheValue::String(String::from_utf8_lossy(raw).into_owned())
}
