//! rat_querycache - 嵌入式缓存与查询优化层
//!
//! 提供多后端缓存（内存、磁盘、远程）及自动故障回退，
//! 以及查询性能跟踪、结果缓存、N+1 批处理和分页中间件

// 导出所有公共模块
pub mod error;
pub mod types;
pub mod cache;
pub mod config;
pub mod optimizer;
pub mod security;
pub mod executor;
pub mod services;
pub mod i18n;

// 重新导出常用类型和函数
pub use error::{QueryCacheError, QueryCacheResult};
pub use types::*;
pub use cache::{CacheBackend, CacheLookup, CacheManager, CacheStats, generate_key};
pub use config::{
    AppCacheConfig, CacheConfigBuilder, OptimizerConfigBuilder,
    disk_cache_config, memory_cache_config, remote_cache_config,
};
pub use optimizer::{
    BatchExecutor, BatchRequest, OptimizedQuery, QueryArgs, QueryCall, QueryHandler, QueryLayer,
    QueryOptimizer, QueryPipeline, QueryStats, QueryStatsReport, SharedHandler, handler_fn,
};
pub use security::{QuerySecurityValidator, SqlDialect};
pub use executor::{ExecutorKind, PassthroughExecutor, QueryExecutor, ValidatingExecutor, build_executor};
pub use services::QueryServices;

/// 初始化rat_querycache库
///
/// 初始化多语言错误消息系统
///
/// 注意：日志系统由调用者自行初始化，本库不会自动初始化日志
pub fn init() {
    i18n::ErrorMessageI18n::init();
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
