//! N+1 批处理中间件

use crate::error::QueryCacheResult;
use crate::optimizer::batch::BatchExecutor;
use crate::optimizer::handler::{BatchRequest, QueryCall, QueryHandler, QueryLayer, SharedHandler};
use crate::types::CacheValue;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 把单次调用交给批处理执行器合并
///
/// 开关关闭时直接调用下一层；已经是批量形态的调用直接透传
#[derive(Clone)]
pub struct PreventNPlusOneLayer {
    executor: Arc<BatchExecutor>,
    enabled: Arc<AtomicBool>,
    batch_key: String,
}

impl PreventNPlusOneLayer {
    pub fn new(executor: Arc<BatchExecutor>, enabled: Arc<AtomicBool>, batch_key: &str) -> Self {
        Self {
            executor,
            enabled,
            batch_key: batch_key.to_string(),
        }
    }
}

impl QueryLayer for PreventNPlusOneLayer {
    fn layer(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(PreventNPlusOne {
            next,
            layer: self.clone(),
        })
    }
}

struct PreventNPlusOne {
    next: SharedHandler,
    layer: PreventNPlusOneLayer,
}

#[async_trait]
impl QueryHandler for PreventNPlusOne {
    async fn call(&self, call: QueryCall) -> QueryCacheResult<CacheValue> {
        if !self.layer.enabled.load(Ordering::Relaxed) {
            return self.next.call(call).await;
        }

        match call.request {
            BatchRequest::Single(args) => {
                let result = self
                    .layer
                    .executor
                    .batch_query(&self.layer.batch_key, &call.name, self.next.clone(), args)
                    .await?;
                Ok(result.unwrap_or(CacheValue::Null))
            }
            request @ BatchRequest::Batch(_) => {
                self.next
                    .call(QueryCall {
                        name: call.name,
                        request,
                    })
                    .await
            }
        }
    }
}
