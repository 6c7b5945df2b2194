//! 缓存操作模块
//!
//! CacheManager 的对外操作。缓存是建议性的：后端错误只记录日志，
//! 调用方拿到的是默认结果，不会因为缓存故障而失败。

use super::cache_manager::CacheManager;
use super::key_generator::{self, namespaced};
use super::stats::CacheStats;
use crate::types::CacheValue;
use rat_logger::{debug, warn};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// 一次查找的结果，区分未命中与后端不可用
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// 命中
    Hit(CacheValue),
    /// 未命中
    Miss,
    /// 后端出错，调用方应直接访问真实数据源
    Unavailable,
}

impl CacheManager {
    fn key(&self, key: &str) -> String {
        namespaced(&self.config.version, key)
    }

    /// 查找键并区分命中、未命中和后端不可用
    pub async fn lookup(&self, key: &str) -> CacheLookup {
        match self.backend.get(&self.key(key)).await {
            Ok(Some(value)) => CacheLookup::Hit(value),
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!("缓存读取失败: backend={}, key={}, error={}", self.backend.name(), key, e);
                CacheLookup::Unavailable
            }
        }
    }

    /// 读取键，未命中或出错时返回 `None`
    pub async fn get_value(&self, key: &str) -> Option<CacheValue> {
        match self.lookup(key).await {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::Unavailable => None,
        }
    }

    /// 读取键，未命中或出错时返回 `default`
    pub async fn get(&self, key: &str, default: CacheValue) -> CacheValue {
        self.get_value(key).await.unwrap_or(default)
    }

    /// 写入键
    ///
    /// # 参数
    /// * `ttl` - `None` 时使用配置的默认 TTL；`Some(Duration::ZERO)` 表示永不过期
    pub async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> bool {
        let ttl = ttl.or_else(|| self.default_ttl());
        match self.backend.set(&self.key(key), value, ttl).await {
            Ok(()) => {
                debug!("已缓存: key={}, ttl={:?}", key, ttl);
                true
            }
            Err(e) => {
                warn!("缓存写入失败: backend={}, key={}, error={}", self.backend.name(), key, e);
                false
            }
        }
    }

    /// 删除键，返回删除前是否存在
    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.delete(&self.key(key)).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!("缓存删除失败: backend={}, key={}, error={}", self.backend.name(), key, e);
                false
            }
        }
    }

    /// 删除多个键，返回实际删除的数量
    pub async fn delete_many<S: AsRef<str>>(&self, keys: &[S]) -> usize {
        let mut deleted = 0;
        for key in keys {
            if self.delete(key.as_ref()).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// 清空当前后端
    pub async fn clear(&self) -> bool {
        match self.backend.clear().await {
            Ok(()) => {
                debug!("已清空缓存: backend={}", self.backend.name());
                true
            }
            Err(e) => {
                warn!("缓存清空失败: backend={}, error={}", self.backend.name(), e);
                false
            }
        }
    }

    /// 键是否存在
    pub async fn exists(&self, key: &str) -> bool {
        match self.backend.exists(&self.key(key)).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("缓存检查失败: backend={}, key={}, error={}", self.backend.name(), key, e);
                false
            }
        }
    }

    /// 读取键，未命中时调用 `producer` 生成并写回
    ///
    /// 写回失败不影响返回值；`producer` 的错误原样返回给调用方
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<CacheValue, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue, E>>,
    {
        if let Some(value) = self.get_value(key).await {
            return Ok(value);
        }

        let value = producer().await?;
        if !self.set(key, &value, ttl).await {
            debug!("get_or_set 写回失败，忽略: key={}", key);
        }
        Ok(value)
    }

    /// 批量读取，只返回命中的键；各键独立读取，不保证原子性
    pub async fn mget<S: AsRef<str>>(&self, keys: &[S]) -> HashMap<String, CacheValue> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = self.get_value(key).await {
                found.insert(key.to_string(), value);
            }
        }
        found
    }

    /// 批量写入；任一写入失败即返回 `false`，但仍会尝试全部条目
    pub async fn mset(&self, entries: &HashMap<String, CacheValue>, ttl: Option<Duration>) -> bool {
        let mut all_ok = true;
        for (key, value) in entries {
            if !self.set(key, value, ttl).await {
                all_ok = false;
            }
        }
        all_ok
    }

    /// 由多个组成部分生成确定性的缓存键
    pub fn generate_key(&self, parts: &[&dyn Display]) -> String {
        key_generator::generate_key(parts)
    }

    /// 当前后端的统计信息
    pub async fn stats(&self) -> CacheStats {
        self.backend
            .stats()
            .await
            .with_detail("version", self.config.version.as_str())
            .with_detail("default_ttl_secs", self.config.default_ttl_secs)
    }

    /// 主动清理过期条目
    pub async fn cleanup_expired(&self) -> usize {
        let removed = self.backend.cleanup_expired().await;
        if removed > 0 {
            debug!("清理过期缓存条目: backend={}, count={}", self.backend.name(), removed);
        }
        removed
    }

    /// 关闭后端连接
    pub async fn shutdown(&self) {
        self.backend.close().await;
    }
}
