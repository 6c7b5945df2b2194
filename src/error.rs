//! 错误处理模块
//!
//! 定义缓存层与查询优化层共用的错误类型。缓存是"建议性"的：
//! 后端错误在 CacheManager 内部被记录并转换为默认结果，
//! 只有业务处理函数自身的错误会传播给调用者。

use thiserror::Error;

/// 缓存与查询优化统一错误类型
#[derive(Error, Debug)]
pub enum QueryCacheError {
    /// 缓存操作错误
    #[error("缓存操作失败: {message}")]
    CacheError { message: String },

    /// 后端连接错误
    #[error("缓存后端连接失败: {message}")]
    ConnectionError { message: String },

    /// 序列化错误
    #[error("数据序列化失败: {message}")]
    SerializationError { message: String },

    /// 配置错误
    #[error("配置错误: {message}")]
    ConfigError { message: String },

    /// 验证错误
    #[error("验证失败: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// 查询执行错误
    #[error("查询执行失败: {message}")]
    QueryError { message: String },

    /// 批处理错误
    #[error("批处理失败: {message}")]
    BatchError { message: String },

    /// IO 错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 统一结果类型
pub type QueryCacheResult<T> = Result<T, QueryCacheError>;

impl From<serde_json::Error> for QueryCacheError {
    fn from(e: serde_json::Error) -> Self {
        QueryCacheError::SerializationError {
            message: e.to_string(),
        }
    }
}

impl From<redis::RedisError> for QueryCacheError {
    fn from(e: redis::RedisError) -> Self {
        QueryCacheError::CacheError {
            message: e.to_string(),
        }
    }
}

/// 快速构建错误的宏
///
/// ```ignore
/// qc_error!(cache, "写入失败");
/// qc_error!(validation, "page_size", "必须大于0");
/// ```
#[macro_export]
macro_rules! qc_error {
    (cache, $msg:expr) => {
        $crate::error::QueryCacheError::CacheError { message: $msg.to_string() }
    };
    (connection, $msg:expr) => {
        $crate::error::QueryCacheError::ConnectionError { message: $msg.to_string() }
    };
    (serialization, $msg:expr) => {
        $crate::error::QueryCacheError::SerializationError { message: $msg.to_string() }
    };
    (config, $msg:expr) => {
        $crate::error::QueryCacheError::ConfigError { message: $msg.to_string() }
    };
    (validation, $field:expr, $msg:expr) => {
        $crate::error::QueryCacheError::ValidationError {
            field: $field.to_string(),
            message: $msg.to_string(),
        }
    };
    (query, $msg:expr) => {
        $crate::error::QueryCacheError::QueryError { message: $msg.to_string() }
    };
    (batch, $msg:expr) => {
        $crate::error::QueryCacheError::BatchError { message: $msg.to_string() }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_macro_variants() {
        let err = crate::qc_error!(validation, "page_size", "必须大于0");
        match err {
            QueryCacheError::ValidationError { field, message } => {
                assert_eq!(field, "page_size");
                assert_eq!(message, "必须大于0");
            }
            other => panic!("意外的错误类型: {:?}", other),
        }

        let err = crate::qc_error!(config, String::from("缺少远程地址"));
        assert!(err.to_string().contains("缺少远程地址"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: QueryCacheError = json_err.into();
        assert!(matches!(err, QueryCacheError::SerializationError { .. }));
    }
}
