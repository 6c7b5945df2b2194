//! 缓存管理器集成测试

use async_trait::async_trait;
use rat_querycache::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 对指定键拒绝写入的后端，其余操作交给内存后端
struct RejectingBackend {
    inner: cache::MemoryBackend,
    rejected_suffix: &'static str,
    set_attempts: AtomicUsize,
}

impl RejectingBackend {
    fn new(rejected_suffix: &'static str) -> Self {
        Self {
            inner: cache::MemoryBackend::new(),
            rejected_suffix,
            set_attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheBackend for RejectingBackend {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    async fn get(&self, key: &str) -> QueryCacheResult<Option<CacheValue>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> QueryCacheResult<()> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        if key.ends_with(self.rejected_suffix) {
            return Err(qc_error!(cache, format!("写入被拒绝: {}", key)));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> QueryCacheResult<bool> {
        self.inner.delete(key).await
    }

    async fn clear(&self) -> QueryCacheResult<()> {
        self.inner.clear().await
    }

    async fn exists(&self, key: &str) -> QueryCacheResult<bool> {
        self.inner.exists(key).await
    }

    async fn stats(&self) -> CacheStats {
        self.inner.stats().await
    }
}

/// 位于普通文件之下的目录，无法创建
fn unwritable_dir(file: &tempfile::NamedTempFile) -> String {
    file.path().join("cache").display().to_string()
}

#[tokio::test]
async fn test_remote_unreachable_still_serves() {
    let mut config = remote_cache_config("redis://127.0.0.1:1/0", 60);
    config.remote.timeout_secs = 1;
    let dir = tempfile::tempdir().unwrap();
    config.disk.storage_path = dir.path().join("fallback").display().to_string();

    let manager = CacheManager::new(config).await;
    println!("🔍 实际后端: {}", manager.backend_name());
    assert_ne!(manager.backend_name(), "remote");

    assert!(manager.set("greeting", &CacheValue::from("hello"), None).await);
    assert_eq!(
        manager.get("greeting", CacheValue::Null).await,
        CacheValue::from("hello")
    );
    manager.shutdown().await;
}

#[tokio::test]
async fn test_full_fallback_chain_ends_in_memory() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let mut config = remote_cache_config("redis://127.0.0.1:1/0", 60);
    config.remote.timeout_secs = 1;
    config.disk.storage_path = unwritable_dir(&blocker);

    let manager = CacheManager::new(config).await;
    assert_eq!(manager.backend_name(), "memory");
    assert!(manager.set("k", &CacheValue::Int(1), None).await);
    assert!(manager.exists("k").await);
}

#[tokio::test]
async fn test_unwritable_disk_falls_back_to_memory() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let manager = CacheManager::new(disk_cache_config(unwritable_dir(&blocker), 60)).await;
    assert_eq!(manager.backend_name(), "memory");
}

#[tokio::test]
async fn test_get_or_set_propagates_producer_error() {
    let manager = CacheManager::new(memory_cache_config(60)).await;

    let result: Result<CacheValue, QueryCacheError> = manager
        .get_or_set("report", || async { Err(qc_error!(query, "数据库不可用")) }, None)
        .await;
    assert!(matches!(result, Err(QueryCacheError::QueryError { .. })));
    assert!(!manager.exists("report").await);

    let value = manager
        .get_or_set("report", || async { Ok::<_, QueryCacheError>(CacheValue::Int(42)) }, None)
        .await
        .unwrap();
    assert_eq!(value, CacheValue::Int(42));

    // 第二次直接命中，不会调用生产函数
    let cached = manager
        .get_or_set(
            "report",
            || async { Err::<CacheValue, _>(qc_error!(query, "不应被调用")) },
            None,
        )
        .await
        .unwrap();
    assert_eq!(cached, CacheValue::Int(42));
}

#[tokio::test]
async fn test_mset_and_mget() {
    let manager = CacheManager::new(memory_cache_config(60)).await;

    let mut entries = HashMap::new();
    entries.insert("a".to_string(), CacheValue::Int(1));
    entries.insert("b".to_string(), CacheValue::from("two"));
    assert!(manager.mset(&entries, None).await);

    let found = manager.mget(&["a", "b", "missing"]).await;
    assert_eq!(found.len(), 2);
    assert_eq!(found.get("a"), Some(&CacheValue::Int(1)));
    assert_eq!(found.get("b"), Some(&CacheValue::from("two")));
    assert!(!found.contains_key("missing"));
}

#[tokio::test]
async fn test_mset_reports_failure_but_writes_every_key() {
    let backend = Arc::new(RejectingBackend::new(":bad"));
    let manager = CacheManager::with_backend(backend.clone(), memory_cache_config(60));

    let mut entries = HashMap::new();
    entries.insert("a".to_string(), CacheValue::Int(1));
    entries.insert("b:bad".to_string(), CacheValue::Int(2));
    entries.insert("c".to_string(), CacheValue::Int(3));
    entries.insert("d".to_string(), CacheValue::Int(4));

    assert!(!manager.mset(&entries, None).await);
    assert_eq!(backend.set_attempts.load(Ordering::SeqCst), 4);

    let found = manager.mget(&["a", "b:bad", "c", "d"]).await;
    assert_eq!(found.len(), 3);
    assert!(!found.contains_key("b:bad"));
    assert_eq!(found.get("d"), Some(&CacheValue::Int(4)));
}

#[tokio::test]
async fn test_get_or_set_returns_value_when_write_back_fails() {
    let backend = Arc::new(RejectingBackend::new(":bad"));
    let manager = CacheManager::with_backend(backend.clone(), memory_cache_config(60));

    let value = manager
        .get_or_set("report:bad", || async { Ok::<_, QueryCacheError>(CacheValue::from("fresh")) }, None)
        .await
        .unwrap();
    assert_eq!(value, CacheValue::from("fresh"));
    assert_eq!(backend.set_attempts.load(Ordering::SeqCst), 1);
    assert!(!manager.exists("report:bad").await);
}

#[tokio::test]
async fn test_clear_and_delete_are_idempotent() {
    let manager = CacheManager::new(memory_cache_config(60)).await;
    manager.set("x", &CacheValue::Bool(true), None).await;

    assert!(manager.clear().await);
    assert!(!manager.exists("x").await);
    assert!(manager.clear().await);
    assert!(!manager.exists("x").await);

    manager.delete("never_set").await;
    assert!(!manager.exists("never_set").await);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_and_miss_counting() {
    let manager = CacheManager::new(memory_cache_config(60)).await;

    assert!(manager.get_value("absent").await.is_none());
    manager
        .set("session", &CacheValue::from("abc"), Some(Duration::from_secs(2)))
        .await;
    assert_eq!(manager.get_value("session").await, Some(CacheValue::from("abc")));

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(manager.get_value("session").await.is_none());

    let stats = manager.stats().await;
    println!("📊 缓存统计: {:?}", stats);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn test_version_namespacing_isolates_entries() {
    let backend: std::sync::Arc<dyn CacheBackend> = std::sync::Arc::new(cache::MemoryBackend::new());

    let mut v1 = memory_cache_config(60);
    v1.version = "v1".to_string();
    let mut v2 = v1.clone();
    v2.version = "v2".to_string();

    let old = CacheManager::with_backend(backend.clone(), v1);
    let new = CacheManager::with_backend(backend, v2);

    old.set("user:1", &CacheValue::from("old"), None).await;
    assert!(old.exists("user:1").await);
    assert!(!new.exists("user:1").await);
}

#[tokio::test]
async fn test_disk_backend_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let manager = CacheManager::new(disk_cache_config(dir.path().display().to_string(), 60)).await;
    assert_eq!(manager.backend_name(), "disk");

    let value = CacheValue::from(vec![CacheValue::Int(1), CacheValue::from("two")]);
    assert!(manager.set("list", &value, None).await);
    assert_eq!(manager.get_value("list").await, Some(value));
    assert!(manager.delete("list").await);
    assert!(manager.get_value("list").await.is_none());
    manager.shutdown().await;
}

#[test]
fn test_generate_key_is_order_sensitive() {
    assert_eq!(generate_key(&[&"a", &"b"]), generate_key(&[&"a", &"b"]));
    assert_ne!(generate_key(&[&"a", &"b"]), generate_key(&[&"b", &"a"]));
}
