//! 远程缓存后端（Redis）
//!
//! 构造时执行一次 PING 存活探测，失败即返回连接错误，
//! 由 CacheManager 的回退链接管。并发安全交给客户端本身，
//! 本层不提供跨 get/set 的原子性。`close` 之后连接被释放，
//! 后续操作返回连接错误。

use super::backend::{CacheBackend, effective_ttl};
use super::codec;
use super::stats::{CacheStats, StatsCounter};
use crate::error::{QueryCacheError, QueryCacheResult};
use crate::types::{CacheValue, RemoteConfig};
use async_trait::async_trait;
use rat_logger::{debug, info, warn};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use parking_lot::RwLock;
use std::future::Future;
use std::time::Duration;

/// 远程缓存后端
pub struct RemoteBackend {
    conn: RwLock<Option<MultiplexedConnection>>,
    config: RemoteConfig,
    timeout: Duration,
    counters: StatsCounter,
}

impl RemoteBackend {
    /// 连接远程存储并执行存活探测
    pub async fn connect(config: RemoteConfig) -> QueryCacheResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let url = config.url.clone();

        let connect_error = |message: String| {
            crate::qc_error!(
                connection,
                crate::i18n::tf("error.remote_connect", &[("url", &url), ("message", &message)])
            )
        };

        let client = redis::Client::open(config.url.as_str()).map_err(|e| connect_error(e.to_string()))?;

        let mut conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| connect_error(format!("连接超时({:?})", timeout)))?
            .map_err(|e| connect_error(e.to_string()))?;

        let pong: String = tokio::time::timeout(timeout, redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(|_| {
                crate::qc_error!(
                    connection,
                    crate::i18n::tf("error.remote_ping", &[("url", &url), ("message", "timeout")])
                )
            })?
            .map_err(|e| {
                crate::qc_error!(
                    connection,
                    crate::i18n::tf("error.remote_ping", &[("url", &url), ("message", &e.to_string())])
                )
            })?;

        info!("远程缓存后端已连接: url={}, ping={}", config.url, pong);

        Ok(Self {
            conn: RwLock::new(Some(conn)),
            config,
            timeout,
            counters: StatsCounter::new(),
        })
    }

    /// 取一个连接句柄，关闭后返回连接错误
    fn connection(&self) -> QueryCacheResult<MultiplexedConnection> {
        self.conn.read().clone().ok_or_else(|| {
            self.counters.record_error();
            crate::qc_error!(connection, format!("远程缓存连接已关闭: url={}", self.config.url))
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// 为单条命令加上超时，超时与命令错误都计入错误统计
    async fn run<T, F>(&self, op: &str, fut: F) -> QueryCacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(QueryCacheError::from(e)),
            Err(_) => Err(crate::qc_error!(cache, format!("远程命令超时: op={}, timeout={:?}", op, self.timeout))),
        };
        if let Err(e) = &result {
            self.counters.record_error();
            warn!("远程缓存操作失败: op={}, error={}", op, e);
        }
        result
    }
}

#[async_trait]
impl CacheBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn get(&self, key: &str) -> QueryCacheResult<Option<CacheValue>> {
        let mut conn = self.connection()?;
        let full_key = self.full_key(key);

        let raw: Option<Vec<u8>> = self.run("get", conn.get(&full_key)).await?;
        match raw {
            Some(bytes) => {
                self.counters.record_hit();
                Ok(Some(codec::decode(&bytes)))
            }
            None => {
                self.counters.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> QueryCacheResult<()> {
        let payload = codec::encode(value).inspect_err(|_| self.counters.record_error())?;
        let mut conn = self.connection()?;
        let full_key = self.full_key(key);

        match effective_ttl(ttl) {
            Some(ttl) => {
                let millis = ttl.as_millis().max(1) as u64;
                self.run::<(), _>("pset_ex", conn.pset_ex(&full_key, payload, millis)).await?;
            }
            None => {
                self.run::<(), _>("set", conn.set(&full_key, payload)).await?;
            }
        }
        self.counters.record_set();
        Ok(())
    }

    async fn delete(&self, key: &str) -> QueryCacheResult<bool> {
        let mut conn = self.connection()?;
        let full_key = self.full_key(key);

        let deleted: i64 = self.run("del", conn.del(&full_key)).await?;
        if deleted > 0 {
            self.counters.record_delete();
        }
        Ok(deleted > 0)
    }

    async fn clear(&self) -> QueryCacheResult<()> {
        let mut conn = self.connection()?;

        // 只删除本前缀下的键
        let pattern = format!("{}*", self.config.key_prefix);
        let mut cursor: u64 = 0;
        let mut total_deleted: i64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = self
                .run(
                    "scan",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(100)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let deleted: i64 = self.run("del", conn.del(&keys)).await?;
                total_deleted += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("已清空远程缓存: prefix={}, deleted={}", self.config.key_prefix, total_deleted);
        Ok(())
    }

    async fn exists(&self, key: &str) -> QueryCacheResult<bool> {
        let mut conn = self.connection()?;
        let full_key = self.full_key(key);
        self.run("exists", conn.exists(&full_key)).await
    }

    async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::from_counters(self.name(), self.counters.snapshot())
            .with_detail("url", self.config.url.as_str())
            .with_detail("key_prefix", self.config.key_prefix.as_str());

        let Some(mut conn) = self.conn.read().clone() else {
            return stats.with_detail("connected", false);
        };
        let dbsize: Option<u64> = tokio::time::timeout(self.timeout, redis::cmd("DBSIZE").query_async(&mut conn))
            .await
            .ok()
            .and_then(|r| r.ok());
        if let Some(dbsize) = dbsize {
            stats = stats.with_detail("dbsize", dbsize);
        }

        let info: Option<String> = tokio::time::timeout(
            self.timeout,
            redis::cmd("INFO").arg("memory").query_async(&mut conn),
        )
        .await
        .ok()
        .and_then(|r| r.ok());
        if let Some(info) = info {
            if let Some(used) = info
                .lines()
                .find_map(|line| line.strip_prefix("used_memory_human:"))
            {
                stats = stats.with_detail("used_memory_human", used.trim());
            }
        }

        stats
    }

    async fn close(&self) {
        // 多路复用连接在最后一个句柄释放时断开，进行中的命令持有各自的句柄
        if self.conn.write().take().is_some() {
            info!("远程缓存后端关闭: url={}", self.config.url);
        }
    }
}
