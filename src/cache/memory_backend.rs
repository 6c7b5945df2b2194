//! 内存缓存后端
//!
//! 单把互斥锁保护值表与过期时间表。没有后台清理线程，
//! 过期条目在下一次 `get`/`set` 时被顺带清除。

use super::backend::{CacheBackend, effective_ttl};
use super::stats::{CacheStats, StatsCounter};
use crate::error::QueryCacheResult;
use crate::types::CacheValue;
use async_trait::async_trait;
use parking_lot::Mutex;
use rat_logger::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct MemoryStore {
    values: HashMap<String, CacheValue>,
    expires_at: HashMap<String, Instant>,
}

impl MemoryStore {
    /// 移除所有已过期的键，返回移除数量
    fn sweep(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .expires_at
            .iter()
            .filter(|(_, deadline)| now > **deadline)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.expires_at.remove(key);
            self.values.remove(key);
        }
        expired.len()
    }

    fn remove(&mut self, key: &str) -> bool {
        self.expires_at.remove(key);
        self.values.remove(key).is_some()
    }
}

/// 进程内内存缓存
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: Mutex<MemoryStore>,
    counters: StatsCounter,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前条目数（可能包含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.store.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> QueryCacheResult<Option<CacheValue>> {
        let mut store = self.store.lock();
        let swept = store.sweep(Instant::now());
        if swept > 0 {
            debug!("内存缓存清理过期条目: {}", swept);
        }

        match store.values.get(key) {
            Some(value) => {
                self.counters.record_hit();
                Ok(Some(value.clone()))
            }
            None => {
                self.counters.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> QueryCacheResult<()> {
        let now = Instant::now();
        let mut store = self.store.lock();
        store.sweep(now);

        store.values.insert(key.to_string(), value.clone());
        match effective_ttl(ttl) {
            Some(ttl) => {
                store.expires_at.insert(key.to_string(), now + ttl);
            }
            None => {
                store.expires_at.remove(key);
            }
        }
        self.counters.record_set();
        Ok(())
    }

    async fn delete(&self, key: &str) -> QueryCacheResult<bool> {
        let existed = self.store.lock().remove(key);
        if existed {
            self.counters.record_delete();
        }
        Ok(existed)
    }

    async fn clear(&self) -> QueryCacheResult<()> {
        let mut store = self.store.lock();
        store.values.clear();
        store.expires_at.clear();
        Ok(())
    }

    async fn exists(&self, key: &str) -> QueryCacheResult<bool> {
        let mut store = self.store.lock();
        if let Some(deadline) = store.expires_at.get(key) {
            if Instant::now() > *deadline {
                store.remove(key);
                return Ok(false);
            }
        }
        Ok(store.values.contains_key(key))
    }

    async fn stats(&self) -> CacheStats {
        let (entries, approx_bytes) = {
            let store = self.store.lock();
            let bytes: usize = store
                .values
                .iter()
                .map(|(k, v)| k.len() + v.approx_size())
                .sum();
            (store.values.len(), bytes)
        };

        CacheStats::from_counters(self.name(), self.counters.snapshot())
            .with_detail("entries", entries)
            .with_detail("approx_memory_bytes", approx_bytes)
    }

    async fn cleanup_expired(&self) -> usize {
        self.store.lock().sweep(Instant::now())
    }
}
