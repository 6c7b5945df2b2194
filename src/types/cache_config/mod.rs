use serde::{Deserialize, Serialize};

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 首选的缓存后端，不可用时按 remote -> disk -> memory 回退
    pub backend: BackendType,
    /// 远程后端配置
    pub remote: RemoteConfig,
    /// 磁盘后端配置
    pub disk: DiskConfig,
    /// 默认 TTL（秒），0 表示永不过期
    pub default_ttl_secs: u64,
    /// 查询结果缓存 TTL（秒）
    pub query_cache_ttl_secs: u64,
    /// 后端回退时是否以 warn 级别输出日志
    pub enable_fallback_warnings: bool,
    /// 缓存版本标识，变更此值可使所有旧缓存失效
    #[serde(default = "default_cache_version")]
    pub version: String,
}

/// 默认缓存版本
fn default_cache_version() -> String {
    "v1".to_string()
}

/// 缓存后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// 进程内内存缓存
    Memory,
    /// 本地磁盘缓存
    Disk,
    /// 远程键值存储（Redis）
    Remote,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Memory => "memory",
            BackendType::Disk => "disk",
            BackendType::Remote => "remote",
        }
    }

    /// 回退链中的下一级
    pub fn fallback(&self) -> Option<BackendType> {
        match self {
            BackendType::Remote => Some(BackendType::Disk),
            BackendType::Disk => Some(BackendType::Memory),
            BackendType::Memory => None,
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendType {
    type Err = crate::error::QueryCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendType::Memory),
            "disk" => Ok(BackendType::Disk),
            "remote" | "redis" => Ok(BackendType::Remote),
            other => Err(crate::qc_error!(config, format!("未知的缓存后端类型: {}", other))),
        }
    }
}

/// 远程缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// 连接地址，例如 redis://127.0.0.1:6379/0
    pub url: String,
    /// 键前缀，清空操作只影响该前缀下的键
    pub key_prefix: String,
    /// 连接、存活探测和单条命令的超时（秒）
    pub timeout_secs: u64,
}

/// 磁盘缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    /// 存储路径
    pub storage_path: String,
    /// 最大磁盘使用（MB）
    pub max_disk_mb: usize,
    /// 启动时清空缓存目录
    pub clear_on_startup: bool,
}

/// 查询优化器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// 慢查询阈值（毫秒）
    pub slow_query_threshold_ms: u64,
    /// 批处理时间窗口（毫秒）
    pub batch_window_ms: u64,
    /// 是否启用 N+1 批处理
    pub batching_enabled: bool,
    /// 默认分页大小
    pub default_page_size: u64,
    /// 最大分页大小
    pub max_page_size: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 1000,
            batch_window_ms: 100,
            batching_enabled: true,
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

impl OptimizerConfig {
    pub fn slow_query_threshold(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.slow_query_threshold_ms)
    }

    pub fn batch_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.batch_window_ms)
    }
}
