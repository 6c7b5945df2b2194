//! 查询执行器
//!
//! 业务处理函数通过 `QueryExecutor` 执行 SQL。生产环境使用
//! `ValidatingExecutor`，先经过安全检查再交给驱动；测试或离线场景使用
//! `PassthroughExecutor`。两者由配置显式选择。

use crate::error::QueryCacheResult;
use crate::security::{QuerySecurityValidator, SqlDialect};
use crate::types::CacheValue;
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use rat_logger::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 执行一条参数化语句
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[CacheValue]) -> QueryCacheResult<CacheValue>;

    fn kind(&self) -> ExecutorKind;
}

/// 真正访问数据库的驱动函数
pub type QueryDriver =
    Arc<dyn Fn(String, Vec<CacheValue>) -> BoxFuture<'static, QueryCacheResult<CacheValue>> + Send + Sync>;

/// 执行器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Validating,
    Passthrough,
}

/// 先做安全检查再交给驱动
pub struct ValidatingExecutor {
    validator: QuerySecurityValidator,
    driver: QueryDriver,
}

impl ValidatingExecutor {
    pub fn new(validator: QuerySecurityValidator, driver: QueryDriver) -> Self {
        Self { validator, driver }
    }

    pub fn validator(&self) -> &QuerySecurityValidator {
        &self.validator
    }
}

#[async_trait]
impl QueryExecutor for ValidatingExecutor {
    async fn execute(&self, sql: &str, params: &[CacheValue]) -> QueryCacheResult<CacheValue> {
        self.validator.check_statement(sql)?;
        debug!("执行语句: dialect={:?}, params={}", self.validator.dialect(), params.len());
        (self.driver)(sql.to_string(), params.to_vec()).await
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Validating
    }
}

/// 不访问数据库：记录语句并返回固定结果
#[derive(Debug)]
pub struct PassthroughExecutor {
    response: CacheValue,
    statements: Mutex<Vec<(String, Vec<CacheValue>)>>,
}

impl PassthroughExecutor {
    pub fn new(response: CacheValue) -> Self {
        Self {
            response,
            statements: Mutex::new(Vec::new()),
        }
    }

    /// 已记录的语句
    pub fn statements(&self) -> Vec<(String, Vec<CacheValue>)> {
        self.statements.lock().clone()
    }
}

#[async_trait]
impl QueryExecutor for PassthroughExecutor {
    async fn execute(&self, sql: &str, params: &[CacheValue]) -> QueryCacheResult<CacheValue> {
        self.statements.lock().push((sql.to_string(), params.to_vec()));
        Ok(self.response.clone())
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Passthrough
    }
}

/// 按配置构建执行器
///
/// `Validating` 必须提供驱动；`Passthrough` 忽略驱动并返回 `Null`
pub fn build_executor(
    kind: ExecutorKind,
    dialect: SqlDialect,
    driver: Option<QueryDriver>,
) -> QueryCacheResult<Arc<dyn QueryExecutor>> {
    match kind {
        ExecutorKind::Validating => {
            let driver = driver.ok_or_else(|| crate::qc_error!(config, "验证执行器需要提供数据库驱动"))?;
            Ok(Arc::new(ValidatingExecutor::new(QuerySecurityValidator::new(dialect), driver)))
        }
        ExecutorKind::Passthrough => Ok(Arc::new(PassthroughExecutor::new(CacheValue::Null))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use tokio_test::{assert_err, assert_ok};

    fn echo_driver() -> QueryDriver {
        Arc::new(|sql: String, params: Vec<CacheValue>| {
            async move { Ok(CacheValue::from(format!("{} [{}]", sql, params.len()))) }.boxed()
        })
    }

    #[tokio::test]
    async fn test_validating_executor_rejects_stacked_statements() {
        let executor = build_executor(ExecutorKind::Validating, SqlDialect::PostgreSQL, Some(echo_driver())).unwrap();
        assert_eq!(executor.kind(), ExecutorKind::Validating);

        let ok = executor
            .execute("SELECT * FROM users WHERE id = $1", &[CacheValue::Int(7)])
            .await
            .unwrap();
        assert_eq!(ok, CacheValue::from("SELECT * FROM users WHERE id = $1 [1]"));

        assert_err!(executor.execute("SELECT 1; DELETE FROM users", &[]).await);
    }

    #[tokio::test]
    async fn test_validating_requires_driver() {
        assert!(build_executor(ExecutorKind::Validating, SqlDialect::MySQL, None).is_err());
        let passthrough = assert_ok!(build_executor(ExecutorKind::Passthrough, SqlDialect::MySQL, None));
        assert_eq!(passthrough.kind(), ExecutorKind::Passthrough);
    }

    #[tokio::test]
    async fn test_passthrough_records_statements() {
        let executor = PassthroughExecutor::new(CacheValue::Int(1));
        let result = executor.execute("SELECT 1; SELECT 2", &[]).await.unwrap();
        assert_eq!(result, CacheValue::Int(1));
        assert_eq!(executor.statements().len(), 1);
        assert_eq!(executor.kind(), ExecutorKind::Passthrough);
    }
}
