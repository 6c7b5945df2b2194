//! 缓存管理模块
//!
//! 提供可插拔的缓存后端（内存、远程、磁盘）以及带自动回退的缓存管理器。

pub mod stats;
pub mod key_generator;
pub mod codec;
pub mod backend;
pub mod memory_backend;
pub mod remote_backend;
pub mod disk_backend;
pub mod cache_manager;
pub mod operations;

// 重新导出主要的公共类型和结构体
pub use backend::CacheBackend;
pub use cache_manager::CacheManager;
pub use disk_backend::DiskBackend;
pub use key_generator::generate_key;
pub use memory_backend::MemoryBackend;
pub use operations::CacheLookup;
pub use remote_backend::RemoteBackend;
pub use stats::{CacheStats, CounterSnapshot, StatsCounter};
