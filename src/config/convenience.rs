//! # 便利配置函数模块
//!
//! 提供三种后端的常用配置，简化配置过程

use crate::types::{BackendType, CacheConfig, DiskConfig, RemoteConfig};

/// 内存缓存配置
///
/// # 参数
///
/// * `default_ttl_secs` - 默认 TTL（秒）
pub fn memory_cache_config(default_ttl_secs: u64) -> CacheConfig {
    base_config(BackendType::Memory, default_ttl_secs)
}

/// 磁盘缓存配置，不可用时回退到内存
///
/// # 参数
///
/// * `storage_path` - 磁盘缓存目录
/// * `default_ttl_secs` - 默认 TTL（秒）
pub fn disk_cache_config<P: Into<String>>(storage_path: P, default_ttl_secs: u64) -> CacheConfig {
    let mut config = base_config(BackendType::Disk, default_ttl_secs);
    config.disk.storage_path = storage_path.into();
    config
}

/// 远程缓存配置，不可用时依次回退到磁盘和内存
///
/// # 参数
///
/// * `url` - 远程地址，例如 `redis://127.0.0.1:6379/0`
/// * `default_ttl_secs` - 默认 TTL（秒）
pub fn remote_cache_config<S: Into<String>>(url: S, default_ttl_secs: u64) -> CacheConfig {
    let mut config = base_config(BackendType::Remote, default_ttl_secs);
    config.remote.url = url.into();
    config
}

fn base_config(backend: BackendType, default_ttl_secs: u64) -> CacheConfig {
    CacheConfig {
        backend,
        remote: RemoteConfig {
            url: String::new(),
            key_prefix: "rat_querycache:".to_string(),
            timeout_secs: 5,
        },
        disk: DiskConfig {
            storage_path: super::builders::cache_builder::default_storage_path(),
            max_disk_mb: 500,
            clear_on_startup: false,
        },
        default_ttl_secs,
        query_cache_ttl_secs: 300,
        enable_fallback_warnings: true,
        version: "v1".to_string(),
    }
}
