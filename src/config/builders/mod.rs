//! # 配置构建器模块
//!
//! 提供缓存与优化器配置的构建器实现，支持链式调用和严格验证

pub mod cache_builder;
pub mod optimizer_builder;

pub use cache_builder::CacheConfigBuilder;
pub use optimizer_builder::OptimizerConfigBuilder;
