//! 缓存统计模块
//!
//! 提供各后端共用的原子计数器和对外暴露的统计快照

use crate::types::CacheValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// 缓存操作计数器
///
/// 每个后端持有一份，所有字段均为原子计数，可在任意任务中并发累加
#[derive(Debug, Default)]
pub struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// 读取只读快照
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CounterSnapshot {
    /// 计算命中率（百分比），无流量时为 0
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// 后端名称
    pub backend: String,
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数
    pub misses: u64,
    /// 写入次数
    pub sets: u64,
    /// 删除次数
    pub deletes: u64,
    /// 错误次数
    pub errors: u64,
    /// 缓存命中率（百分比）
    pub hit_rate: f64,
    /// 后端特有的信息（条目数、内存占用、连接信息等）
    pub details: BTreeMap<String, CacheValue>,
}

impl CacheStats {
    /// 由后端名称和计数器快照构建
    pub fn from_counters(backend: &str, counters: CounterSnapshot) -> Self {
        Self {
            backend: backend.to_string(),
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            deletes: counters.deletes,
            errors: counters.errors,
            hit_rate: counters.hit_rate(),
            details: BTreeMap::new(),
        }
    }

    /// 追加后端特有信息
    pub fn with_detail<V: Into<CacheValue>>(mut self, key: &str, value: V) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}
