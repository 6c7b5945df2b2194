use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 通用缓存值类型 - 缓存后端与查询处理函数之间传递的数据表示
///
/// 对象使用有序映射，保证序列化结果稳定（查询指纹依赖这一点）。
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheValue {
    /// 空值
    Null,
    /// 布尔值
    Bool(bool),
    /// 整数
    Int(i64),
    /// 无符号整数
    UInt(u64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 字节数组
    Bytes(Vec<u8>),
    /// UTC日期时间
    DateTime(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// 数组
    Array(Vec<CacheValue>),
    /// 对象/文档
    Object(BTreeMap<String, CacheValue>),
}

impl std::fmt::Display for CacheValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheValue::String(s) => write!(f, "{}", s),
            CacheValue::Bytes(bytes) => write!(f, "[{} bytes]", bytes.len()),
            other => write!(f, "{}", other.to_json_value()),
        }
    }
}

impl std::fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Debug 与 Display 保持一致，显示实际值
        write!(f, "{}", self)
    }
}

impl CacheValue {
    /// 获取数据类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            CacheValue::Null => "null",
            CacheValue::Bool(_) => "boolean",
            CacheValue::Int(_) => "integer",
            CacheValue::UInt(_) => "unsigned_integer",
            CacheValue::Float(_) => "float",
            CacheValue::String(_) => "string",
            CacheValue::Bytes(_) => "bytes",
            CacheValue::DateTime(_) => "datetime",
            CacheValue::Uuid(_) => "uuid",
            CacheValue::Array(_) => "array",
            CacheValue::Object(_) => "object",
        }
    }

    /// 判断是否为空值
    pub fn is_null(&self) -> bool {
        matches!(self, CacheValue::Null)
    }

    pub fn as_array(&self) -> Option<&Vec<CacheValue>> {
        match self {
            CacheValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, CacheValue>> {
        match self {
            CacheValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// 尽量解释为整数（字符串形式的数字也接受）
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CacheValue::Int(i) => Some(*i),
            CacheValue::UInt(u) => i64::try_from(*u).ok(),
            CacheValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            CacheValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 按键读取对象字段
    pub fn get(&self, key: &str) -> Option<&CacheValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// 粗略估算占用字节数，仅用于统计展示
    pub fn approx_size(&self) -> usize {
        match self {
            CacheValue::Null | CacheValue::Bool(_) => 1,
            CacheValue::Int(_) | CacheValue::UInt(_) | CacheValue::Float(_) => 8,
            CacheValue::String(s) => s.len(),
            CacheValue::Bytes(b) => b.len(),
            CacheValue::DateTime(_) => 12,
            CacheValue::Uuid(_) => 16,
            CacheValue::Array(items) => items.iter().map(CacheValue::approx_size).sum::<usize>() + 8,
            CacheValue::Object(map) => map
                .iter()
                .map(|(k, v)| k.len() + v.approx_size())
                .sum::<usize>()
                + 8,
        }
    }

    /// 转换为 JSON 值
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            CacheValue::Null => serde_json::Value::Null,
            CacheValue::Bool(b) => serde_json::Value::Bool(*b),
            CacheValue::Int(i) => serde_json::Value::Number(serde_json::Number::from(*i)),
            CacheValue::UInt(u) => serde_json::Value::Number(serde_json::Number::from(*u)),
            CacheValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CacheValue::String(s) => serde_json::Value::String(s.clone()),
            // 字节数组以 base64 字符串表示
            CacheValue::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
            CacheValue::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            CacheValue::Uuid(u) => serde_json::Value::String(u.to_string()),
            CacheValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(CacheValue::to_json_value).collect())
            }
            CacheValue::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CacheValue::Null,
            serde_json::Value::Bool(b) => CacheValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CacheValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    CacheValue::UInt(u)
                } else {
                    CacheValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => CacheValue::String(s),
            serde_json::Value::Array(arr) => {
                CacheValue::Array(arr.into_iter().map(CacheValue::from).collect())
            }
            serde_json::Value::Object(obj) => CacheValue::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, CacheValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        CacheValue::Int(value as i64)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Int(value)
    }
}

impl From<u64> for CacheValue {
    fn from(value: u64) -> Self {
        CacheValue::UInt(value)
    }
}

impl From<usize> for CacheValue {
    fn from(value: usize) -> Self {
        CacheValue::UInt(value as u64)
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Float(value)
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::String(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        CacheValue::Bytes(value)
    }
}

impl From<DateTime<Utc>> for CacheValue {
    fn from(value: DateTime<Utc>) -> Self {
        CacheValue::DateTime(value)
    }
}

impl From<Uuid> for CacheValue {
    fn from(value: Uuid) -> Self {
        CacheValue::Uuid(value)
    }
}

impl From<Vec<CacheValue>> for CacheValue {
    fn from(value: Vec<CacheValue>) -> Self {
        CacheValue::Array(value)
    }
}

impl From<BTreeMap<String, CacheValue>> for CacheValue {
    fn from(value: BTreeMap<String, CacheValue>) -> Self {
        CacheValue::Object(value)
    }
}

impl<T> From<Option<T>> for CacheValue
where
    T: Into<CacheValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => CacheValue::Null,
        }
    }
}
