//! # 配置管理模块 - 核心配置类型
//!
//! 组合根使用的完整配置：缓存部分加优化器部分

use crate::error::QueryCacheError;
use crate::types::{CacheConfig, OptimizerConfig};
use serde::{Deserialize, Serialize};
use rat_logger::info;

/// 应用级缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCacheConfig {
    /// 缓存管理器配置
    pub cache: CacheConfig,
    /// 查询优化器配置
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl AppCacheConfig {
    /// 使用给定缓存配置与默认优化器配置创建
    pub fn new(cache: CacheConfig) -> Self {
        Self {
            cache,
            optimizer: OptimizerConfig::default(),
        }
    }

    /// 替换优化器配置
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// 从配置文件加载配置
    ///
    /// 扩展名为 `.toml` 时按 TOML 解析，否则按 JSON 解析
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径
    pub fn from_file<P: AsRef<std::path::Path>>(config_path: P) -> Result<Self, QueryCacheError> {
        let path = config_path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let path_str = path.display().to_string();

        let config: AppCacheConfig = if is_toml(path) {
            toml::from_str(&content).map_err(|e| {
                crate::qc_error!(
                    config,
                    crate::i18n::tf("error.config_file", &[("path", &path_str), ("message", &e.to_string())])
                )
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                crate::qc_error!(
                    config,
                    crate::i18n::tf("error.config_file", &[("path", &path_str), ("message", &e.to_string())])
                )
            })?
        };

        info!("从文件加载缓存配置: {:?}, 后端={}", path, config.cache.backend);
        Ok(config)
    }

    /// 保存配置到文件
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, config_path: P) -> Result<(), QueryCacheError> {
        let path = config_path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)
                .map_err(|e| crate::qc_error!(config, format!("序列化TOML配置失败: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| crate::qc_error!(config, format!("序列化JSON配置失败: {}", e)))?
        };

        std::fs::write(path, content)?;

        info!("保存缓存配置到文件: {:?}", path);
        Ok(())
    }
}

fn is_toml(path: &std::path::Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("toml")
}
