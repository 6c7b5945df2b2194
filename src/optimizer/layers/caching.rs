//! 结果缓存中间件

use crate::cache::{CacheLookup, CacheManager};
use crate::error::QueryCacheResult;
use crate::optimizer::handler::{QueryCall, QueryHandler, QueryLayer, SharedHandler};
use crate::optimizer::query_stats::QueryStatsRegistry;
use crate::types::CacheValue;
use async_trait::async_trait;
use rat_logger::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// 缓存查询结果
///
/// 缓存键为显式给定的键，否则为调用指纹。命中时计入统计并直接返回；
/// 后端不可用时退化为直接调用下一层。出错的结果不会被缓存。
#[derive(Clone)]
pub struct CachedQueryLayer {
    cache: Arc<CacheManager>,
    registry: Arc<QueryStatsRegistry>,
    cache_key: Option<String>,
    ttl: Duration,
}

impl CachedQueryLayer {
    pub fn new(
        cache: Arc<CacheManager>,
        registry: Arc<QueryStatsRegistry>,
        cache_key: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            registry,
            cache_key,
            ttl,
        }
    }
}

impl QueryLayer for CachedQueryLayer {
    fn layer(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(CachedQuery {
            next,
            layer: self.clone(),
        })
    }
}

struct CachedQuery {
    next: SharedHandler,
    layer: CachedQueryLayer,
}

#[async_trait]
impl QueryHandler for CachedQuery {
    async fn call(&self, call: QueryCall) -> QueryCacheResult<CacheValue> {
        let fingerprint = call.fingerprint();
        let key = self.layer.cache_key.clone().unwrap_or_else(|| fingerprint.clone());

        match self.layer.cache.lookup(&key).await {
            CacheLookup::Hit(value) => {
                debug!("查询缓存命中: name={}, key={}", call.name, key);
                self.layer.registry.record_cache_hit(&fingerprint, &call.name);
                Ok(value)
            }
            CacheLookup::Miss => {
                let value = self.next.call(call).await?;
                // 写入失败不影响本次结果
                self.layer.cache.set(&key, &value, Some(self.layer.ttl)).await;
                Ok(value)
            }
            CacheLookup::Unavailable => {
                warn!("缓存不可用，直接执行查询: name={}", call.name);
                self.next.call(call).await
            }
        }
    }
}
