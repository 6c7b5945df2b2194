//! 查询性能统计
//!
//! 以查询指纹为键记录执行次数、耗时分布与缓存命中。
//! 注册表由一把互斥锁保护，所有更新都在锁内完成读改写。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 单个查询指纹的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    /// 查询指纹
    pub fingerprint: String,
    /// 查询名称
    pub name: String,
    /// 执行次数
    pub count: u64,
    /// 累计耗时
    pub total_time: Duration,
    /// 平均耗时，始终等于 total_time / count
    pub avg_time: Duration,
    /// 最短耗时
    pub min_time: Duration,
    /// 最长耗时
    pub max_time: Duration,
    /// 最近一次执行时间
    pub last_executed: Option<DateTime<Utc>>,
    /// 缓存命中次数
    pub cache_hits: u64,
    /// 执行失败次数
    pub errors: u64,
}

impl QueryStats {
    pub fn new(fingerprint: &str, name: &str) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            name: name.to_string(),
            count: 0,
            total_time: Duration::ZERO,
            avg_time: Duration::ZERO,
            min_time: Duration::ZERO,
            max_time: Duration::ZERO,
            last_executed: None,
            cache_hits: 0,
            errors: 0,
        }
    }

    /// 记录一次执行耗时
    pub fn update(&mut self, elapsed: Duration) {
        if self.count == 0 {
            self.min_time = elapsed;
            self.max_time = elapsed;
        } else {
            self.min_time = self.min_time.min(elapsed);
            self.max_time = self.max_time.max(elapsed);
        }
        self.count += 1;
        self.total_time += elapsed;
        self.avg_time = Duration::from_nanos((self.total_time.as_nanos() / self.count as u128) as u64);
        self.last_executed = Some(Utc::now());
    }

    /// 缓存命中占执行次数的比例
    pub fn hit_ratio(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.count as f64
        }
    }
}

/// 查询统计注册表
#[derive(Debug, Default)]
pub struct QueryStatsRegistry {
    entries: Mutex<HashMap<String, QueryStats>>,
}

impl QueryStatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次执行，失败的执行同样计入耗时
    pub fn record(&self, fingerprint: &str, name: &str, elapsed: Duration, success: bool) -> QueryStats {
        let mut entries = self.entries.lock();
        let stats = entries
            .entry(fingerprint.to_string())
            .or_insert_with(|| QueryStats::new(fingerprint, name));
        stats.update(elapsed);
        if !success {
            stats.errors += 1;
        }
        stats.clone()
    }

    /// 记录一次缓存命中
    pub fn record_cache_hit(&self, fingerprint: &str, name: &str) {
        let mut entries = self.entries.lock();
        entries
            .entry(fingerprint.to_string())
            .or_insert_with(|| QueryStats::new(fingerprint, name))
            .cache_hits += 1;
    }

    pub fn get(&self, fingerprint: &str) -> Option<QueryStats> {
        self.entries.lock().get(fingerprint).cloned()
    }

    /// 所有统计的拷贝
    pub fn snapshot(&self) -> Vec<QueryStats> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_avg_min_max_track_updates() {
        let mut stats = QueryStats::new("fp", "q");
        let samples = [30u64, 10, 50, 20];
        for ms in samples {
            stats.update(Duration::from_millis(ms));
        }

        assert_eq!(stats.count, 4);
        assert_eq!(stats.total_time, Duration::from_millis(110));
        assert_eq!(stats.avg_time, stats.total_time / 4);
        assert_eq!(stats.min_time, Duration::from_millis(10));
        assert_eq!(stats.max_time, Duration::from_millis(50));
        assert!(stats.last_executed.is_some());
    }

    #[test]
    fn test_cache_hit_before_first_execution() {
        let registry = QueryStatsRegistry::new();
        registry.record_cache_hit("fp", "q");
        let stats = registry.get("fp").unwrap();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn test_failed_executions_are_recorded() {
        let registry = QueryStatsRegistry::new();
        registry.record("fp", "q", Duration::from_millis(5), true);
        let stats = registry.record("fp", "q", Duration::from_millis(7), false);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let registry = Arc::new(QueryStatsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        registry.record("fp", "q", Duration::from_micros(10), true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = registry.get("fp").unwrap();
        assert_eq!(stats.count, 2000);
        assert_eq!(stats.total_time, Duration::from_micros(10) * 2000);
    }
}
