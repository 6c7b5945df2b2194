//! 查询管线
//!
//! 启动时把处理函数与若干中间件组装为一个 `OptimizedQuery`。
//! 先声明的中间件位于最外层：
//!
//! ```ignore
//! let list_orders = optimizer
//!     .pipeline("list_orders", handler)
//!     .track_performance()
//!     .cached(None, Some(Duration::from_secs(60)))
//!     .paginated(20, 200)
//!     .build();
//! ```

use super::handler::{QueryArgs, QueryCall, QueryLayer, SharedHandler};
use super::query_optimizer::QueryOptimizer;
use crate::error::QueryCacheResult;
use crate::types::CacheValue;
use std::sync::Arc;
use std::time::Duration;

/// 管线构建器
pub struct QueryPipeline<'a> {
    optimizer: &'a QueryOptimizer,
    name: String,
    handler: SharedHandler,
    layers: Vec<Box<dyn QueryLayer>>,
}

impl<'a> QueryPipeline<'a> {
    pub(crate) fn new(optimizer: &'a QueryOptimizer, name: &str, handler: SharedHandler) -> Self {
        Self {
            optimizer,
            name: name.to_string(),
            handler,
            layers: Vec::new(),
        }
    }

    /// 追加任意中间件
    pub fn layer<L: QueryLayer + 'static>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn track_performance(self) -> Self {
        let layer = self.optimizer.track_performance();
        self.layer(layer)
    }

    /// 缓存结果；`ttl` 为 `None` 时使用缓存配置的查询缓存 TTL
    pub fn cached(self, cache_key: Option<&str>, ttl: Option<Duration>) -> Self {
        let layer = self.optimizer.cached_query(cache_key, ttl);
        self.layer(layer)
    }

    pub fn prevent_n_plus_one(self, batch_key: &str) -> Self {
        let layer = self.optimizer.prevent_n_plus_one(batch_key);
        self.layer(layer)
    }

    pub fn paginated(self, page_size: u64, max_page_size: u64) -> Self {
        let layer = self.optimizer.paginated(page_size, max_page_size);
        self.layer(layer)
    }

    /// 组装，先声明的中间件在最外层
    pub fn build(self) -> OptimizedQuery {
        let handler = self
            .layers
            .iter()
            .rev()
            .fold(self.handler, |next, layer| layer.layer(next));

        OptimizedQuery {
            name: self.name,
            handler,
        }
    }
}

/// 组装完成的查询
#[derive(Clone)]
pub struct OptimizedQuery {
    name: String,
    handler: SharedHandler,
}

impl OptimizedQuery {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 组装后的处理函数，可以再交给其他中间件
    pub fn handler(&self) -> SharedHandler {
        Arc::clone(&self.handler)
    }

    pub async fn call(&self, args: QueryArgs) -> QueryCacheResult<CacheValue> {
        self.handler.call(QueryCall::new(self.name.as_str(), args)).await
    }

    /// 直接以批量形态调用
    pub async fn call_batch(&self, items: Vec<QueryArgs>) -> QueryCacheResult<CacheValue> {
        self.handler.call(QueryCall::batch(self.name.as_str(), items)).await
    }
}

impl std::fmt::Debug for OptimizedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizedQuery").field("name", &self.name).finish()
    }
}
