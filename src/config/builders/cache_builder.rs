//! # 缓存配置构建器模块
//!
//! 后端类型与默认 TTL 必须显式设置，其余项有保守的取值

use crate::error::QueryCacheError;
use crate::types::{BackendType, CacheConfig, DiskConfig, RemoteConfig};
use rat_logger::info;

/// 缓存配置构建器
#[derive(Debug)]
pub struct CacheConfigBuilder {
    backend: Option<BackendType>,
    remote_url: Option<String>,
    key_prefix: String,
    timeout_secs: u64,
    storage_path: Option<String>,
    max_disk_mb: usize,
    clear_on_startup: bool,
    default_ttl_secs: Option<u64>,
    query_cache_ttl_secs: u64,
    enable_fallback_warnings: bool,
    version: String,
}

impl CacheConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            backend: None,
            remote_url: None,
            key_prefix: "rat_querycache:".to_string(),
            timeout_secs: 5,
            storage_path: None,
            max_disk_mb: 500,
            clear_on_startup: false,
            default_ttl_secs: None,
            query_cache_ttl_secs: 300,
            enable_fallback_warnings: true,
            version: "v1".to_string(),
        }
    }

    /// 设置首选后端
    pub fn backend(mut self, backend: BackendType) -> Self {
        self.backend = Some(backend);
        self
    }

    /// 设置远程地址
    ///
    /// # 参数
    ///
    /// * `url` - 例如 `redis://127.0.0.1:6379/0`
    pub fn remote_url<S: Into<String>>(mut self, url: S) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// 设置远程键前缀
    pub fn key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// 设置远程连接与命令超时（秒）
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// 设置磁盘缓存目录
    pub fn storage_path<S: Into<String>>(mut self, path: S) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// 设置磁盘缓存上限（MB）
    pub fn max_disk_mb(mut self, mb: usize) -> Self {
        self.max_disk_mb = mb;
        self
    }

    /// 启动时是否清空磁盘缓存
    pub fn clear_on_startup(mut self, clear: bool) -> Self {
        self.clear_on_startup = clear;
        self
    }

    /// 设置默认 TTL（秒），0 表示永不过期
    pub fn default_ttl_secs(mut self, secs: u64) -> Self {
        self.default_ttl_secs = Some(secs);
        self
    }

    /// 设置查询结果缓存 TTL（秒）
    pub fn query_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.query_cache_ttl_secs = secs;
        self
    }

    /// 设置回退时是否输出警告
    pub fn enable_fallback_warnings(mut self, enabled: bool) -> Self {
        self.enable_fallback_warnings = enabled;
        self
    }

    /// 设置缓存版本
    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    /// 构建缓存配置
    ///
    /// # 错误
    ///
    /// 后端或默认 TTL 未设置、远程后端缺少地址、查询缓存 TTL 为 0 时返回错误
    pub fn build(self) -> Result<CacheConfig, QueryCacheError> {
        let backend = self
            .backend
            .ok_or_else(|| crate::qc_error!(config, "缓存后端类型必须设置"))?;

        let default_ttl_secs = self
            .default_ttl_secs
            .ok_or_else(|| crate::qc_error!(config, "默认TTL必须设置"))?;

        if self.query_cache_ttl_secs == 0 {
            return Err(crate::qc_error!(validation, "query_cache_ttl_secs", "查询缓存TTL必须大于0"));
        }

        let remote_url = self.remote_url.unwrap_or_default();
        if backend == BackendType::Remote && remote_url.trim().is_empty() {
            return Err(crate::qc_error!(config, "使用远程后端时必须设置远程地址"));
        }

        if self.version.trim().is_empty() {
            return Err(crate::qc_error!(validation, "version", "缓存版本不能为空"));
        }

        let storage_path = self
            .storage_path
            .unwrap_or_else(default_storage_path);

        info!(
            "创建缓存配置: 后端={}, 默认TTL={}s, 查询缓存TTL={}s",
            backend, default_ttl_secs, self.query_cache_ttl_secs
        );

        Ok(CacheConfig {
            backend,
            remote: RemoteConfig {
                url: remote_url,
                key_prefix: self.key_prefix,
                timeout_secs: self.timeout_secs,
            },
            disk: DiskConfig {
                storage_path,
                max_disk_mb: self.max_disk_mb,
                clear_on_startup: self.clear_on_startup,
            },
            default_ttl_secs,
            query_cache_ttl_secs: self.query_cache_ttl_secs,
            enable_fallback_warnings: self.enable_fallback_warnings,
            version: self.version,
        })
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 未指定目录时使用系统临时目录下的固定子目录
pub(crate) fn default_storage_path() -> String {
    std::env::temp_dir()
        .join("rat_querycache")
        .to_string_lossy()
        .into_owned()
}

impl CacheConfig {
    /// 创建缓存配置构建器
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }
}
