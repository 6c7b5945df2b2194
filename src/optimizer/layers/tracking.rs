//! 性能跟踪中间件

use crate::error::QueryCacheResult;
use crate::optimizer::handler::{QueryCall, QueryHandler, QueryLayer, SharedHandler};
use crate::optimizer::query_stats::QueryStatsRegistry;
use crate::types::CacheValue;
use async_trait::async_trait;
use rat_logger::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// 记录每次调用的耗时，超过阈值时输出慢查询日志
///
/// 无论调用成功与否都会记录，不改变调用结果
#[derive(Clone)]
pub struct TrackPerformanceLayer {
    registry: Arc<QueryStatsRegistry>,
    slow_threshold: Duration,
}

impl TrackPerformanceLayer {
    pub fn new(registry: Arc<QueryStatsRegistry>, slow_threshold: Duration) -> Self {
        Self {
            registry,
            slow_threshold,
        }
    }
}

impl QueryLayer for TrackPerformanceLayer {
    fn layer(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(TrackPerformance {
            next,
            registry: self.registry.clone(),
            slow_threshold: self.slow_threshold,
        })
    }
}

struct TrackPerformance {
    next: SharedHandler,
    registry: Arc<QueryStatsRegistry>,
    slow_threshold: Duration,
}

#[async_trait]
impl QueryHandler for TrackPerformance {
    async fn call(&self, call: QueryCall) -> QueryCacheResult<CacheValue> {
        let fingerprint = call.fingerprint();
        let name = call.name.clone();

        let start = Instant::now();
        let result = self.next.call(call).await;
        let elapsed = start.elapsed();

        self.registry.record(&fingerprint, &name, elapsed, result.is_ok());

        if elapsed > self.slow_threshold {
            warn!(
                "慢查询: name={}, fingerprint={}, duration={:.3}s",
                name,
                fingerprint,
                elapsed.as_secs_f64()
            );
        } else {
            debug!("查询完成: name={}, duration={:?}", name, elapsed);
        }

        result
    }
}
