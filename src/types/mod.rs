//! 通用类型定义
//!
//! 定义缓存值类型以及缓存、优化器的配置结构

pub mod cache_value;
pub mod cache_config;

// 重新导出所有公共类型
pub use cache_value::CacheValue;
pub use cache_config::{BackendType, CacheConfig, DiskConfig, OptimizerConfig, RemoteConfig};
