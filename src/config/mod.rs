//! # 配置管理模块
//!
//! 提供缓存与查询优化器的配置系统，支持构建器模式和链式配置，
//! 以及从 TOML/JSON 文件加载

pub mod builders;
pub mod convenience;
pub mod core;

// 重新导出所有公共类型
pub use builders::{CacheConfigBuilder, OptimizerConfigBuilder};
pub use convenience::{disk_cache_config, memory_cache_config, remote_cache_config};
pub use core::AppCacheConfig;
