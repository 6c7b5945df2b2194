//! 分页中间件

use crate::error::QueryCacheResult;
use crate::optimizer::handler::{QueryCall, QueryHandler, QueryLayer, SharedHandler};
use crate::types::CacheValue;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 页码参数名
pub const PAGE_KWARG: &str = "page";
/// 每页条数参数名
pub const PAGE_SIZE_KWARG: &str = "page_size";

/// 把 `page` / `page_size` 转换为 `limit` / `offset`
///
/// 下一层返回数组时包装为 `{data, pagination}`，其他结果原样返回。
/// 批量调用不做处理。
#[derive(Debug, Clone, Copy)]
pub struct PaginatedLayer {
    page_size: u64,
    max_page_size: u64,
}

impl PaginatedLayer {
    pub fn new(page_size: u64, max_page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
            max_page_size: max_page_size.max(1),
        }
    }

    /// 从关键字参数解析页码和每页条数
    fn resolve(&self, kwargs: &BTreeMap<String, CacheValue>) -> (u64, u64) {
        let page = kwargs
            .get(PAGE_KWARG)
            .and_then(|v| v.as_i64())
            .filter(|p| *p >= 1)
            .unwrap_or(1) as u64;

        let limit = kwargs
            .get(PAGE_SIZE_KWARG)
            .and_then(|v| v.as_i64())
            .filter(|s| *s >= 1)
            .map(|s| s as u64)
            .unwrap_or(self.page_size)
            .min(self.max_page_size);

        (page, limit)
    }
}

impl QueryLayer for PaginatedLayer {
    fn layer(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(Paginated { next, layer: *self })
    }
}

struct Paginated {
    next: SharedHandler,
    layer: PaginatedLayer,
}

#[async_trait]
impl QueryHandler for Paginated {
    async fn call(&self, mut call: QueryCall) -> QueryCacheResult<CacheValue> {
        let Some(args) = call.args_mut() else {
            return self.next.call(call).await;
        };

        let (page, limit) = self.layer.resolve(&args.kwargs);
        // 页码来自调用方，超大时饱和而不溢出
        let offset = page.saturating_sub(1).saturating_mul(limit);
        args.kwargs.remove(PAGE_KWARG);
        args.kwargs.remove(PAGE_SIZE_KWARG);
        args.kwargs.insert("limit".to_string(), CacheValue::UInt(limit));
        args.kwargs.insert("offset".to_string(), CacheValue::UInt(offset));

        match self.next.call(call).await? {
            CacheValue::Array(items) => {
                let has_more = items.len() as u64 == limit;

                let mut pagination = BTreeMap::new();
                pagination.insert("page".to_string(), CacheValue::UInt(page));
                pagination.insert("page_size".to_string(), CacheValue::UInt(limit));
                pagination.insert("has_more".to_string(), CacheValue::Bool(has_more));

                let mut wrapped = BTreeMap::new();
                wrapped.insert("data".to_string(), CacheValue::Array(items));
                wrapped.insert("pagination".to_string(), CacheValue::Object(pagination));
                Ok(CacheValue::Object(wrapped))
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::handler::{QueryArgs, handler_fn};

    /// 返回 1..=25 中 offset/limit 对应的片段
    fn numbers() -> SharedHandler {
        handler_fn(|call: QueryCall| async move {
            let args = call.args().cloned().unwrap_or_default();
            let limit = args.get_kwarg("limit").and_then(|v| v.as_i64()).unwrap_or(0) as usize;
            let offset = args.get_kwarg("offset").and_then(|v| v.as_i64()).unwrap_or(0) as usize;
            let items = (1..=25i64).skip(offset).take(limit).map(CacheValue::Int).collect();
            Ok(CacheValue::Array(items))
        })
    }

    fn page_of(result: &CacheValue) -> (Vec<i64>, bool) {
        let data = result
            .get("data")
            .and_then(|d| d.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default();
        let has_more = matches!(
            result.get("pagination").and_then(|p| p.get("has_more")),
            Some(CacheValue::Bool(true))
        );
        (data, has_more)
    }

    #[tokio::test]
    async fn test_pages_over_25_items() {
        let handler = PaginatedLayer::new(50, 500).layer(numbers());

        let page2 = handler
            .call(QueryCall::new("list", QueryArgs::new().kwarg("page", 2).kwarg("page_size", 10)))
            .await
            .unwrap();
        let (data, has_more) = page_of(&page2);
        assert_eq!(data, (11..=20).collect::<Vec<_>>());
        assert!(has_more);

        let page3 = handler
            .call(QueryCall::new("list", QueryArgs::new().kwarg("page", 3).kwarg("page_size", 10)))
            .await
            .unwrap();
        let (data, has_more) = page_of(&page3);
        assert_eq!(data, (21..=25).collect::<Vec<_>>());
        assert!(!has_more);
    }

    #[tokio::test]
    async fn test_page_size_is_clamped() {
        let handler = PaginatedLayer::new(5, 8).layer(numbers());
        let result = handler
            .call(QueryCall::new("list", QueryArgs::new().kwarg("page_size", 100)))
            .await
            .unwrap();
        let (data, _) = page_of(&result);
        assert_eq!(data.len(), 8);
        assert_eq!(
            result.get("pagination").and_then(|p| p.get("page_size")),
            Some(&CacheValue::UInt(8))
        );

        let defaults = handler.call(QueryCall::new("list", QueryArgs::new())).await.unwrap();
        assert_eq!(page_of(&defaults).0, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_non_list_result_passes_through() {
        let handler = PaginatedLayer::new(10, 100).layer(handler_fn(|call: QueryCall| async move {
            let offset = call.args().and_then(|a| a.get_kwarg("offset")).cloned();
            Ok(offset.unwrap_or(CacheValue::Null))
        }));
        let result = handler
            .call(QueryCall::new("count", QueryArgs::new().kwarg("page", 4)))
            .await
            .unwrap();
        assert_eq!(result, CacheValue::UInt(30));
    }

    #[tokio::test]
    async fn test_huge_page_saturates_offset() {
        let handler = PaginatedLayer::new(50, 500).layer(handler_fn(|call: QueryCall| async move {
            Ok(call
                .args()
                .and_then(|a| a.get_kwarg("offset"))
                .cloned()
                .unwrap_or(CacheValue::Null))
        }));

        let offset = handler
            .call(QueryCall::new("list", QueryArgs::new().kwarg("page", i64::MAX)))
            .await
            .unwrap();
        assert_eq!(offset, CacheValue::UInt(u64::MAX));
    }
}
