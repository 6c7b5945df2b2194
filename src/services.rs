//! 组合根
//!
//! 应用启动时构建一次 `QueryServices`，把其中的缓存管理器与查询优化器
//! 以引用的方式传给业务层。库内没有任何进程级全局实例。

use crate::cache::CacheManager;
use crate::config::AppCacheConfig;
use crate::optimizer::QueryOptimizer;
use crate::types::OptimizerConfig;
use rat_logger::info;
use std::sync::Arc;

/// 缓存与查询优化服务
#[derive(Debug, Clone)]
pub struct QueryServices {
    pub cache: Arc<CacheManager>,
    pub optimizer: Arc<QueryOptimizer>,
}

impl QueryServices {
    /// 按配置初始化
    ///
    /// 缓存后端不可用时沿回退链降级，初始化本身不会失败
    pub async fn init(config: AppCacheConfig) -> Self {
        let cache = Arc::new(CacheManager::new(config.cache).await);
        let services = Self::with_cache(cache, config.optimizer);
        info!("缓存服务已就绪: backend={}", services.cache.backend_name());
        services
    }

    /// 使用已构建的缓存管理器
    pub fn with_cache(cache: Arc<CacheManager>, optimizer: OptimizerConfig) -> Self {
        let optimizer = Arc::new(QueryOptimizer::new(optimizer, cache.clone()));
        Self { cache, optimizer }
    }

    /// 先刷新待处理批次，再关闭缓存后端
    pub async fn shutdown(&self) {
        self.optimizer.shutdown().await;
        self.cache.shutdown().await;
        info!("缓存服务已关闭");
    }
}
