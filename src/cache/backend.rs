//! 缓存后端接口
//!
//! 内存、远程、磁盘三种实现共用的契约。后端内部的错误以
//! `QueryCacheResult` 返回并计入错误计数，由 CacheManager 统一降级处理。

use super::stats::CacheStats;
use crate::error::QueryCacheResult;
use crate::types::CacheValue;
use async_trait::async_trait;
use std::time::Duration;

/// 缓存后端
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// 后端名称（memory / remote / disk）
    fn name(&self) -> &'static str;

    /// 读取键；不存在或已过期时返回 `Ok(None)` 并计一次未命中
    async fn get(&self, key: &str) -> QueryCacheResult<Option<CacheValue>>;

    /// 写入键；`ttl` 为 `None` 或零表示永不过期
    async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> QueryCacheResult<()>;

    /// 删除键，返回删除前是否存在
    async fn delete(&self, key: &str) -> QueryCacheResult<bool>;

    /// 清空本后端的全部条目
    async fn clear(&self) -> QueryCacheResult<()>;

    /// 键是否存在，过期判断与 `get` 一致，不计入命中统计
    async fn exists(&self, key: &str) -> QueryCacheResult<bool>;

    /// 统计快照，包含后端特有信息
    async fn stats(&self) -> CacheStats;

    /// 主动清理过期条目，返回清理数量；存储自身负责过期的后端返回 0
    async fn cleanup_expired(&self) -> usize {
        0
    }

    /// 关闭后端连接
    async fn close(&self) {}
}

/// 将 TTL 规整为可选的非零时长
pub(crate) fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|d| !d.is_zero())
}
