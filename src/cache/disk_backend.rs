//! 磁盘缓存后端
//!
//! 基于 rat_memcache 的 L2 磁盘存储。值经 codec 序列化后以不透明字节串保存，
//! TTL 交给存储本身以绝对过期时间处理（精度为秒）。

use super::backend::{CacheBackend, effective_ttl};
use super::codec;
use super::stats::{CacheStats, StatsCounter};
use crate::error::QueryCacheResult;
use crate::types::{CacheValue, DiskConfig};
use async_trait::async_trait;
use bytes::Bytes;
use rat_logger::{info, warn};
use rat_memcache::types::EvictionStrategy;
use rat_memcache::{CacheOptions, RatMemCache, RatMemCacheBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 磁盘缓存前面的内存层只保留少量热点
const L1_MAX_MEMORY_BYTES: usize = 8 * 1024 * 1024;
const L1_MAX_ENTRIES: usize = 1024;

/// 磁盘缓存后端
pub struct DiskBackend {
    cache: RatMemCache,
    config: DiskConfig,
    counters: StatsCounter,
}

impl DiskBackend {
    /// 打开磁盘缓存，目录不可写时立即失败
    pub async fn open(config: DiskConfig) -> QueryCacheResult<Self> {
        let data_dir = PathBuf::from(&config.storage_path);
        ensure_writable(&data_dir)?;

        let max_disk_mb = config.max_disk_mb.max(1);
        let builder = RatMemCacheBuilder::new()
            .l1_config(rat_memcache::config::L1Config {
                max_memory: L1_MAX_MEMORY_BYTES,
                max_entries: L1_MAX_ENTRIES,
                eviction_strategy: EvictionStrategy::Lru,
            })
            .l2_config(rat_memcache::config::L2Config {
                enable_l2_cache: true,
                data_dir: Some(data_dir.clone()),
                max_disk_size: max_disk_mb as u64 * 1024 * 1024,
                write_buffer_size: 16 * 1024 * 1024,
                max_write_buffer_number: 3,
                block_cache_size: 8 * 1024 * 1024,
                enable_lz4: false,
                compression_threshold: 1024,
                compression_max_threshold: 10 * 1024,
                compression_level: 6,
                background_threads: 2,
                clear_on_startup: config.clear_on_startup,
                cache_size_mb: max_disk_mb,
                max_file_size_mb: (max_disk_mb / 2).max(1),
                smart_flush_enabled: true,
                smart_flush_base_interval_ms: 100,
                smart_flush_min_interval_ms: 20,
                smart_flush_max_interval_ms: 500,
                smart_flush_write_rate_threshold: 10000,
                smart_flush_accumulated_bytes_threshold: 4 * 1024 * 1024,
                cache_warmup_strategy: rat_memcache::config::CacheWarmupStrategy::Recent,
                zstd_compression_level: None,
                // 全部写穿到磁盘，保证重启后可读
                l2_write_strategy: "write_through".to_string(),
                l2_write_threshold: 0,
                l2_write_ttl_threshold: 0,
            })
            .ttl_config(rat_memcache::config::TtlConfig {
                expire_seconds: None,
                cleanup_interval: 60,
                max_cleanup_entries: 1000,
                lazy_expiration: true,
                active_expiration: true,
            })
            .performance_config(rat_memcache::config::PerformanceConfig {
                worker_threads: 2,
                enable_concurrency: true,
                read_write_separation: true,
                batch_size: 256,
                enable_warmup: false,
                large_value_threshold: 10240,
            })
            .logging_config(rat_memcache::config::LoggingConfig {
                level: "WARN".to_string(),
                enable_colors: false,
                show_timestamp: true,
                enable_performance_logs: false,
                enable_audit_logs: false,
                enable_cache_logs: false,
                enable_logging: false,
                enable_async: false,
                batch_size: 2048,
                batch_interval_ms: 25,
                buffer_size: 16384,
            });

        let cache = builder.build().await.map_err(|e| {
            crate::qc_error!(
                connection,
                crate::i18n::tf(
                    "error.disk_open",
                    &[("path", &config.storage_path), ("message", &e.to_string())]
                )
            )
        })?;

        info!("磁盘缓存后端已打开: path={}, 上限={}MB", config.storage_path, max_disk_mb);

        Ok(Self {
            cache,
            config,
            counters: StatsCounter::new(),
        })
    }

    fn record_failure<E: std::fmt::Display>(&self, op: &str, key: &str, e: E) -> crate::error::QueryCacheError {
        self.counters.record_error();
        warn!("磁盘缓存操作失败: op={}, key={}, error={}", op, key, e);
        crate::qc_error!(cache, format!("磁盘缓存{}失败: {}", op, e))
    }
}

/// 创建目录并写入探测文件，确认可写
fn ensure_writable(dir: &Path) -> QueryCacheResult<()> {
    let path = dir.display().to_string();
    let fail = |e: std::io::Error| {
        crate::qc_error!(
            connection,
            crate::i18n::tf("error.disk_path", &[("path", &path), ("message", &e.to_string())])
        )
    };

    std::fs::create_dir_all(dir).map_err(fail)?;
    let probe = dir.join(".write_probe");
    std::fs::write(&probe, b"ok").map_err(fail)?;
    std::fs::remove_file(&probe).map_err(fail)?;
    Ok(())
}

/// 存储只支持秒级 TTL，不足一秒按一秒计
fn ttl_seconds(ttl: Option<Duration>) -> Option<u64> {
    effective_ttl(ttl).map(|d| {
        let secs = d.as_secs();
        if d.subsec_nanos() > 0 { secs + 1 } else { secs }
    })
}

#[async_trait]
impl CacheBackend for DiskBackend {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, key: &str) -> QueryCacheResult<Option<CacheValue>> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => {
                self.counters.record_hit();
                Ok(Some(codec::decode(&raw)))
            }
            Ok(None) => {
                self.counters.record_miss();
                Ok(None)
            }
            Err(e) => Err(self.record_failure("读取", key, e)),
        }
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> QueryCacheResult<()> {
        let payload = codec::encode(value).inspect_err(|_| self.counters.record_error())?;

        let options = CacheOptions {
            ttl_seconds: ttl_seconds(ttl),
            ..Default::default()
        };

        self.cache
            .set_with_options(key.to_string(), Bytes::from(payload), &options)
            .await
            .map_err(|e| self.record_failure("写入", key, e))?;

        self.counters.record_set();
        Ok(())
    }

    async fn delete(&self, key: &str) -> QueryCacheResult<bool> {
        let existed = self
            .cache
            .delete(key)
            .await
            .map_err(|e| self.record_failure("删除", key, e))?;
        if existed {
            self.counters.record_delete();
        }
        Ok(existed)
    }

    async fn clear(&self) -> QueryCacheResult<()> {
        self.cache
            .clear()
            .await
            .map_err(|e| self.record_failure("清空", "*", e))
    }

    async fn exists(&self, key: &str) -> QueryCacheResult<bool> {
        self.cache
            .get(key)
            .await
            .map(|raw| raw.is_some())
            .map_err(|e| self.record_failure("检查", key, e))
    }

    async fn stats(&self) -> CacheStats {
        CacheStats::from_counters(self.name(), self.counters.snapshot())
            .with_detail("storage_path", self.config.storage_path.as_str())
            .with_detail("max_disk_mb", self.config.max_disk_mb)
    }

    async fn close(&self) {
        if let Err(e) = self.cache.shutdown().await {
            warn!("磁盘缓存关闭失败: path={}, error={}", self.config.storage_path, e);
        } else {
            info!("磁盘缓存后端已关闭: path={}", self.config.storage_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_seconds_rounds_up() {
        assert_eq!(ttl_seconds(None), None);
        assert_eq!(ttl_seconds(Some(Duration::ZERO)), None);
        assert_eq!(ttl_seconds(Some(Duration::from_millis(200))), Some(1));
        assert_eq!(ttl_seconds(Some(Duration::from_secs(30))), Some(30));
        assert_eq!(ttl_seconds(Some(Duration::from_millis(30_500))), Some(31));
    }

    #[test]
    fn test_unwritable_directory_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // 普通文件下无法创建子目录
        let bad_dir = file.path().join("cache");
        assert!(ensure_writable(&bad_dir).is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_writable(&dir.path().join("nested")).is_ok());
    }
}
