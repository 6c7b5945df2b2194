//! 查询优化模块
//!
//! 性能跟踪、结果缓存、N+1 批处理与分页，以中间件形式组合到业务查询上。

pub mod batch;
pub mod handler;
pub mod layers;
pub mod pipeline;
pub mod query_optimizer;
pub mod query_stats;
pub mod report;

pub use batch::BatchExecutor;
pub use handler::{BatchRequest, FnHandler, QueryArgs, QueryCall, QueryHandler, QueryLayer, SharedHandler, handler_fn};
pub use layers::{CachedQueryLayer, PaginatedLayer, PreventNPlusOneLayer, TrackPerformanceLayer};
pub use pipeline::{OptimizedQuery, QueryPipeline};
pub use query_optimizer::QueryOptimizer;
pub use query_stats::{QueryStats, QueryStatsRegistry};
pub use report::{OPTIMAL_MESSAGE, QueryStatsReport, QuerySummary};
