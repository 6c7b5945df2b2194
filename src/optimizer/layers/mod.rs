//! 优化器中间件
//!
//! 每个中间件包裹下一层处理函数。组装顺序由 `QueryPipeline` 决定，
//! 各中间件之间互不依赖，可以任意组合。

mod batching;
mod caching;
mod pagination;
mod tracking;

pub use batching::PreventNPlusOneLayer;
pub use caching::CachedQueryLayer;
pub use pagination::PaginatedLayer;
pub use tracking::TrackPerformanceLayer;
