//! # 优化器配置构建器模块

use crate::error::QueryCacheError;
use crate::types::OptimizerConfig;

/// 优化器配置构建器，未设置的项沿用默认值
#[derive(Debug, Default)]
pub struct OptimizerConfigBuilder {
    config: OptimizerConfig,
}

impl OptimizerConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置慢查询阈值（毫秒）
    pub fn slow_query_threshold_ms(mut self, ms: u64) -> Self {
        self.config.slow_query_threshold_ms = ms;
        self
    }

    /// 设置批处理窗口（毫秒）
    pub fn batch_window_ms(mut self, ms: u64) -> Self {
        self.config.batch_window_ms = ms;
        self
    }

    /// 启用或关闭 N+1 批处理
    pub fn batching_enabled(mut self, enabled: bool) -> Self {
        self.config.batching_enabled = enabled;
        self
    }

    /// 设置分页大小
    ///
    /// # 参数
    ///
    /// * `default_size` - 未指定时的分页大小
    /// * `max_size` - 调用方可请求的最大分页大小
    pub fn page_sizes(mut self, default_size: u64, max_size: u64) -> Self {
        self.config.default_page_size = default_size;
        self.config.max_page_size = max_size;
        self
    }

    /// 构建优化器配置
    pub fn build(self) -> Result<OptimizerConfig, QueryCacheError> {
        let config = self.config;

        if config.batch_window_ms == 0 {
            return Err(crate::qc_error!(validation, "batch_window_ms", "批处理窗口必须大于0"));
        }
        if config.default_page_size == 0 {
            return Err(crate::qc_error!(validation, "default_page_size", "分页大小必须大于0"));
        }
        if config.max_page_size < config.default_page_size {
            return Err(crate::qc_error!(
                validation,
                "max_page_size",
                format!(
                    "最大分页大小({})不能小于默认分页大小({})",
                    config.max_page_size, config.default_page_size
                )
            ));
        }
        Ok(config)
    }
}

impl OptimizerConfig {
    /// 创建优化器配置构建器
    pub fn builder() -> OptimizerConfigBuilder {
        OptimizerConfigBuilder::new()
    }
}
