//! 查询优化器
//!
//! 持有统计注册表、批处理执行器与缓存管理器，
//! 提供各中间件的工厂方法以及统计报告。

use super::batch::BatchExecutor;
use super::handler::{BatchRequest, QueryArgs, QueryCall, SharedHandler};
use super::layers::{CachedQueryLayer, PaginatedLayer, PreventNPlusOneLayer, TrackPerformanceLayer};
use super::pipeline::QueryPipeline;
use super::query_stats::{QueryStats, QueryStatsRegistry};
use super::report::{self, QueryStatsReport};
use crate::cache::CacheManager;
use crate::error::QueryCacheResult;
use crate::types::{CacheValue, OptimizerConfig};
use rat_logger::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 查询优化器
pub struct QueryOptimizer {
    config: OptimizerConfig,
    registry: Arc<QueryStatsRegistry>,
    batcher: Arc<BatchExecutor>,
    cache: Arc<CacheManager>,
    batching_enabled: Arc<AtomicBool>,
}

impl QueryOptimizer {
    /// 创建优化器
    ///
    /// 会启动批处理调度任务，必须在 tokio 运行时内调用
    pub fn new(config: OptimizerConfig, cache: Arc<CacheManager>) -> Self {
        info!(
            "初始化查询优化器: slow_threshold={}ms, batch_window={}ms, batching={}",
            config.slow_query_threshold_ms, config.batch_window_ms, config.batching_enabled
        );

        Self {
            registry: Arc::new(QueryStatsRegistry::new()),
            batcher: Arc::new(BatchExecutor::new(config.batch_window())),
            batching_enabled: Arc::new(AtomicBool::new(config.batching_enabled)),
            cache,
            config,
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// 查询结果使用的缓存管理器
    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<QueryStatsRegistry> {
        &self.registry
    }

    /// 性能跟踪中间件
    pub fn track_performance(&self) -> TrackPerformanceLayer {
        TrackPerformanceLayer::new(self.registry.clone(), self.config.slow_query_threshold())
    }

    /// 结果缓存中间件，未指定 TTL 时使用缓存配置的 `query_cache_ttl_secs`
    pub fn cached_query(&self, cache_key: Option<&str>, ttl: Option<Duration>) -> CachedQueryLayer {
        CachedQueryLayer::new(
            self.cache.clone(),
            self.registry.clone(),
            cache_key.map(str::to_string),
            ttl.unwrap_or(Duration::from_secs(self.cache.config().query_cache_ttl_secs)),
        )
    }

    /// N+1 批处理中间件，受全局开关控制
    pub fn prevent_n_plus_one(&self, batch_key: &str) -> PreventNPlusOneLayer {
        PreventNPlusOneLayer::new(self.batcher.clone(), self.batching_enabled.clone(), batch_key)
    }

    /// 分页中间件，按调用方给定的默认值和上限
    pub fn paginated(&self, page_size: u64, max_page_size: u64) -> PaginatedLayer {
        PaginatedLayer::new(page_size, max_page_size)
    }

    /// 使用优化器配置的默认分页大小和上限
    pub fn default_paginated(&self) -> PaginatedLayer {
        self.paginated(self.config.default_page_size, self.config.max_page_size)
    }

    /// 开始组装一条查询管线
    pub fn pipeline(&self, name: &str, handler: SharedHandler) -> QueryPipeline<'_> {
        QueryPipeline::new(self, name, handler)
    }

    /// 直接加入批处理，不经过中间件
    pub async fn batch_query(
        &self,
        batch_key: &str,
        name: &str,
        handler: SharedHandler,
        args: QueryArgs,
    ) -> QueryCacheResult<Option<CacheValue>> {
        self.batcher.batch_query(batch_key, name, handler, args).await
    }

    /// 批次键下等待刷新的调用数
    pub fn pending_batch_len(&self, batch_key: &str) -> usize {
        self.batcher.pending_len(batch_key)
    }

    pub fn set_batching_enabled(&self, enabled: bool) {
        info!("N+1 批处理开关: {}", enabled);
        self.batching_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn batching_enabled(&self) -> bool {
        self.batching_enabled.load(Ordering::Relaxed)
    }

    /// 计算与跟踪中间件一致的查询指纹
    pub fn fingerprint(&self, name: &str, request: &BatchRequest) -> String {
        QueryCall {
            name: name.to_string(),
            request: request.clone(),
        }
        .fingerprint()
    }

    /// 某个指纹的统计
    pub fn query_stats(&self, fingerprint: &str) -> Option<QueryStats> {
        self.registry.get(fingerprint)
    }

    /// 汇总报告
    pub fn get_query_stats(&self) -> QueryStatsReport {
        QueryStatsReport::build(&self.registry.snapshot(), self.config.slow_query_threshold())
    }

    /// 优化建议
    pub fn get_recommendations(&self) -> Vec<String> {
        report::recommendations(&self.registry.snapshot(), self.config.slow_query_threshold())
    }

    pub fn reset_stats(&self) {
        self.registry.clear();
    }

    /// 刷新待处理批次并停止调度任务
    pub async fn shutdown(&self) {
        self.batcher.shutdown().await;
        info!("查询优化器已关闭");
    }
}

impl std::fmt::Debug for QueryOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOptimizer")
            .field("config", &self.config)
            .field("tracked_queries", &self.registry.len())
            .field("batching_enabled", &self.batching_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use crate::config::memory_cache_config;
    use crate::optimizer::handler::handler_fn;
    use crate::optimizer::report::OPTIMAL_MESSAGE;
    use std::sync::atomic::AtomicUsize;

    fn optimizer() -> QueryOptimizer {
        let cache = Arc::new(CacheManager::with_backend(
            Arc::new(MemoryBackend::new()),
            memory_cache_config(60),
        ));
        QueryOptimizer::new(OptimizerConfig::default(), cache)
    }

    #[tokio::test]
    async fn test_empty_optimizer_reports_optimal() {
        let optimizer = optimizer();
        assert_eq!(optimizer.get_recommendations(), vec![OPTIMAL_MESSAGE.to_string()]);
        assert_eq!(optimizer.get_query_stats().total_queries, 0);
    }

    #[tokio::test]
    async fn test_tracked_and_cached_pipeline() {
        let optimizer = optimizer();
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = {
            let calls = calls.clone();
            handler_fn(move |_call: QueryCall| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(CacheValue::from(vec![CacheValue::from("alice")]))
                }
            })
        };

        let users = optimizer
            .pipeline("list_users", handler)
            .track_performance()
            .cached(None, None)
            .build();

        let args = QueryArgs::new().kwarg("role", "admin");
        users.call(args.clone()).await.unwrap();
        users.call(args.clone()).await.unwrap();
        users.call(args.clone()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let fp = optimizer.fingerprint("list_users", &BatchRequest::Single(args));
        let stats = optimizer.query_stats(&fp).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.cache_hits, 2);

        let report = optimizer.get_query_stats();
        assert_eq!(report.total_executions, 3);
        assert!((report.cache_hit_ratio - 2.0 / 3.0).abs() < 1e-9);

        optimizer.reset_stats();
        assert!(optimizer.query_stats(&fp).is_none());
    }

    #[tokio::test]
    async fn test_batching_switch() {
        let optimizer = optimizer();
        assert!(optimizer.batching_enabled());
        optimizer.set_batching_enabled(false);
        assert!(!optimizer.batching_enabled());
    }

    fn limit_echo() -> SharedHandler {
        handler_fn(|call: QueryCall| async move {
            Ok(call
                .args()
                .and_then(|a| a.get_kwarg("limit"))
                .cloned()
                .unwrap_or(CacheValue::Null))
        })
    }

    #[tokio::test]
    async fn test_paginated_honors_explicit_max() {
        let optimizer = optimizer();
        let query = optimizer
            .pipeline("limit_echo", limit_echo())
            .paginated(50, 1000)
            .build();

        // 显式上限高于配置的 500
        let limit = query.call(QueryArgs::new().kwarg("page_size", 800)).await.unwrap();
        assert_eq!(limit, CacheValue::UInt(800));

        let limit = query.call(QueryArgs::new().kwarg("page_size", 5000)).await.unwrap();
        assert_eq!(limit, CacheValue::UInt(1000));
    }

    #[tokio::test]
    async fn test_default_paginated_uses_config() {
        let optimizer = optimizer();
        let query = optimizer
            .pipeline("limit_echo", limit_echo())
            .layer(optimizer.default_paginated())
            .build();

        let limit = query.call(QueryArgs::new()).await.unwrap();
        assert_eq!(limit, CacheValue::UInt(optimizer.config().default_page_size));

        let limit = query.call(QueryArgs::new().kwarg("page_size", 9_999)).await.unwrap();
        assert_eq!(limit, CacheValue::UInt(optimizer.config().max_page_size));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_query_default_ttl_from_cache_config() {
        let mut cache_config = memory_cache_config(60);
        cache_config.query_cache_ttl_secs = 1;
        let cache = Arc::new(CacheManager::with_backend(Arc::new(MemoryBackend::new()), cache_config));
        let optimizer = QueryOptimizer::new(OptimizerConfig::default(), cache);

        let calls = Arc::new(AtomicUsize::new(0));
        let handler = {
            let calls = calls.clone();
            handler_fn(move |_call: QueryCall| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(CacheValue::Int(1))
                }
            })
        };
        let query = optimizer.pipeline("ttl_query", handler).cached(None, None).build();

        query.call(QueryArgs::new()).await.unwrap();
        query.call(QueryArgs::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        query.call(QueryArgs::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
