//! 查询处理函数与中间件接口
//!
//! 业务层以 `QueryHandler` 提供真正执行查询的函数，优化器的各项能力
//! 以 `QueryLayer` 的形式逐层包裹在外面，启动时一次性组装。

use crate::cache::key_generator::hash_hex;
use crate::error::QueryCacheResult;
use crate::types::CacheValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// 一次调用的参数：位置参数加关键字参数
///
/// 关键字参数使用有序映射，序列化结果与插入顺序无关
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    pub args: Vec<CacheValue>,
    pub kwargs: BTreeMap<String, CacheValue>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个位置参数
    pub fn arg<V: Into<CacheValue>>(mut self, value: V) -> Self {
        self.args.push(value.into());
        self
    }

    /// 设置一个关键字参数
    pub fn kwarg<V: Into<CacheValue>>(mut self, key: &str, value: V) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }

    pub fn get_kwarg(&self, key: &str) -> Option<&CacheValue> {
        self.kwargs.get(key)
    }
}

/// 传给处理函数的请求形态
///
/// 批处理窗口结束时才知道攒了几次调用：只有一次时为 `Single`，
/// 多次时为 `Batch`。处理函数需要同时支持两种形态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchRequest {
    Single(QueryArgs),
    Batch(Vec<QueryArgs>),
}

impl BatchRequest {
    /// 包含的调用次数
    pub fn len(&self) -> usize {
        match self {
            BatchRequest::Single(_) => 1,
            BatchRequest::Batch(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 展开为参数列表
    pub fn into_vec(self) -> Vec<QueryArgs> {
        match self {
            BatchRequest::Single(args) => vec![args],
            BatchRequest::Batch(items) => items,
        }
    }
}

/// 一次查询调用
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCall {
    /// 查询名称，作为函数标识参与指纹计算
    pub name: String,
    pub request: BatchRequest,
}

impl QueryCall {
    /// 单次调用
    pub fn new<S: Into<String>>(name: S, args: QueryArgs) -> Self {
        Self {
            name: name.into(),
            request: BatchRequest::Single(args),
        }
    }

    /// 合并后的批量调用
    pub fn batch<S: Into<String>>(name: S, items: Vec<QueryArgs>) -> Self {
        Self {
            name: name.into(),
            request: BatchRequest::Batch(items),
        }
    }

    /// 单次调用的参数；批量调用返回 `None`
    pub fn args(&self) -> Option<&QueryArgs> {
        match &self.request {
            BatchRequest::Single(args) => Some(args),
            BatchRequest::Batch(_) => None,
        }
    }

    pub fn args_mut(&mut self) -> Option<&mut QueryArgs> {
        match &mut self.request {
            BatchRequest::Single(args) => Some(args),
            BatchRequest::Batch(_) => None,
        }
    }

    /// 查询指纹：名称与序列化参数的 MD5
    ///
    /// 相同名称和参数总是得到相同指纹
    pub fn fingerprint(&self) -> String {
        let serialized = serde_json::to_string(&self.request).unwrap_or_else(|_| format!("{:?}", self.request));
        hash_hex(format!("{}|{}", self.name, serialized).as_bytes())
    }
}

/// 查询处理函数
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn call(&self, call: QueryCall) -> QueryCacheResult<CacheValue>;
}

/// 共享的处理函数
pub type SharedHandler = Arc<dyn QueryHandler>;

/// 中间件：包裹下一层处理函数，返回新的处理函数
pub trait QueryLayer: Send + Sync {
    fn layer(&self, next: SharedHandler) -> SharedHandler;
}

/// 由闭包构成的处理函数
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> QueryHandler for FnHandler<F>
where
    F: Fn(QueryCall) -> Fut + Send + Sync,
    Fut: Future<Output = QueryCacheResult<CacheValue>> + Send + 'static,
{
    async fn call(&self, call: QueryCall) -> QueryCacheResult<CacheValue> {
        (self.f)(call).await
    }
}

/// 用闭包创建处理函数
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(QueryCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = QueryCacheResult<CacheValue>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_argument_sensitive() {
        let a = QueryCall::new("list_projects", QueryArgs::new().arg(1).kwarg("status", "open"));
        let b = QueryCall::new("list_projects", QueryArgs::new().arg(1).kwarg("status", "open"));
        let c = QueryCall::new("list_projects", QueryArgs::new().arg(2).kwarg("status", "open"));
        let d = QueryCall::new("list_users", QueryArgs::new().arg(1).kwarg("status", "open"));

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn test_kwarg_order_does_not_change_fingerprint() {
        let a = QueryCall::new("q", QueryArgs::new().kwarg("x", 1).kwarg("y", 2));
        let b = QueryCall::new("q", QueryArgs::new().kwarg("y", 2).kwarg("x", 1));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_batch_request_shapes() {
        let single = BatchRequest::Single(QueryArgs::new().arg(1));
        assert_eq!(single.len(), 1);
        assert_eq!(single.into_vec().len(), 1);

        let batch = BatchRequest::Batch(vec![QueryArgs::new(), QueryArgs::new()]);
        assert_eq!(batch.len(), 2);
        assert!(QueryCall::batch("q", vec![]).args().is_none());
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn(|call: QueryCall| async move {
            Ok(CacheValue::from(call.name))
        });
        let result = handler.call(QueryCall::new("echo", QueryArgs::new())).await.unwrap();
        assert_eq!(result, CacheValue::from("echo"));
    }
}
