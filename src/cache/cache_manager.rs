//! 缓存管理器核心模块
//!
//! 提供CacheManager的结构定义和后端选择逻辑

use super::backend::CacheBackend;
use super::disk_backend::DiskBackend;
use super::memory_backend::MemoryBackend;
use super::remote_backend::RemoteBackend;
use crate::error::QueryCacheResult;
use crate::types::{BackendType, CacheConfig};
use rat_logger::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// 缓存管理器
///
/// 独占持有一个活动后端，所有公开操作都委托给该后端
#[derive(Clone)]
pub struct CacheManager {
    /// 活动后端，仅在构造时确定
    pub(crate) backend: Arc<dyn CacheBackend>,
    /// 缓存配置
    pub(crate) config: CacheConfig,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("backend", &self.backend.name())
            .field("default_ttl_secs", &self.config.default_ttl_secs)
            .field("version", &self.config.version)
            .finish()
    }
}

impl CacheManager {
    /// 创建新的缓存管理器
    ///
    /// 按配置的首选后端尝试构造，失败时沿 remote -> disk -> memory 回退，
    /// 内存后端作为最终兜底，因此本函数不会失败
    pub async fn new(config: CacheConfig) -> Self {
        debug!("创建缓存管理器，配置: {:?}", config);
        let backend = Self::initialize_backend(&config).await;

        info!(
            "缓存管理器初始化成功 - 首选后端: {}, 实际后端: {}, 默认TTL: {}s",
            config.backend,
            backend.name(),
            config.default_ttl_secs
        );

        Self { backend, config }
    }

    /// 使用外部构造的后端创建管理器
    pub fn with_backend(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        info!("缓存管理器使用注入的后端: {}", backend.name());
        Self { backend, config }
    }

    /// 依次尝试首选后端及其回退链
    async fn initialize_backend(config: &CacheConfig) -> Arc<dyn CacheBackend> {
        let mut candidate = Some(config.backend);

        while let Some(backend_type) = candidate {
            match Self::build_backend(backend_type, config).await {
                Ok(backend) => return backend,
                Err(e) => {
                    let next = backend_type.fallback().unwrap_or(BackendType::Memory);
                    let message = crate::i18n::tf(
                        "warn.backend_fallback",
                        &[
                            ("backend", backend_type.as_str()),
                            ("next", next.as_str()),
                            ("message", &e.to_string()),
                        ],
                    );
                    if config.enable_fallback_warnings {
                        warn!("{}", message);
                    } else {
                        debug!("{}", message);
                    }
                    candidate = backend_type.fallback();
                }
            }
        }

        Arc::new(MemoryBackend::new())
    }

    async fn build_backend(
        backend_type: BackendType,
        config: &CacheConfig,
    ) -> QueryCacheResult<Arc<dyn CacheBackend>> {
        match backend_type {
            BackendType::Remote => {
                let backend = RemoteBackend::connect(config.remote.clone()).await?;
                Ok(Arc::new(backend))
            }
            BackendType::Disk => {
                let backend = DiskBackend::open(config.disk.clone()).await?;
                Ok(Arc::new(backend))
            }
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
        }
    }

    /// 实际使用的后端名称
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// 缓存配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 默认 TTL，0 表示永不过期
    pub fn default_ttl(&self) -> Option<Duration> {
        match self.config.default_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
