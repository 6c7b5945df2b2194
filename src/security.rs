//! 查询安全验证
//!
//! 业务处理函数执行 SQL 前的安全边界：标识符验证与引号保护，
//! 以及拒绝堆叠语句和注释序列的语句检查。

use crate::error::QueryCacheResult;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 标识符最大长度
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// SQL 方言，决定标识符的引号风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl SqlDialect {
    fn quote(&self, identifier: &str) -> String {
        match self {
            SqlDialect::MySQL => format!("`{}`", identifier),
            SqlDialect::PostgreSQL | SqlDialect::SQLite => format!("\"{}\"", identifier),
        }
    }
}

/// 标识符类别，用于错误信息和关键字表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Column,
    Table,
}

impl IdentifierKind {
    fn label(&self) -> &'static str {
        match self {
            IdentifierKind::Column => "字段名",
            IdentifierKind::Table => "表名",
        }
    }

    fn reserved(&self) -> &'static [&'static str] {
        match self {
            IdentifierKind::Column => COLUMN_KEYWORDS,
            IdentifierKind::Table => TABLE_KEYWORDS,
        }
    }
}

const COLUMN_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TABLE",
    "INDEX", "AND", "OR", "NOT", "NULL", "IS", "IN", "EXISTS", "BETWEEN", "LIKE", "UNION", "JOIN",
    "GROUP", "BY", "HAVING", "ORDER", "LIMIT", "OFFSET", "DISTINCT", "AS", "ON", "CASE", "WHEN",
    "THEN", "ELSE", "END",
];

const TABLE_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TABLE",
    "INDEX", "DATABASE", "SCHEMA", "USER", "ROLE", "GRANT", "REVOKE", "VIEW", "TRIGGER",
    "PROCEDURE", "FUNCTION",
];

/// 查询安全验证器
#[derive(Debug, Clone)]
pub struct QuerySecurityValidator {
    dialect: SqlDialect,
    deny_patterns: Vec<Regex>,
}

impl QuerySecurityValidator {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            deny_patterns: Vec::new(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// 追加一条拒绝规则，语句匹配时验证失败
    ///
    /// # 参数
    /// * `pattern` - 正则表达式，例如 `(?i)\bdrop\s+table\b`
    pub fn with_deny_pattern(mut self, pattern: &str) -> QueryCacheResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| crate::qc_error!(validation, "deny_pattern", format!("正则表达式无效: {}", e)))?;
        self.deny_patterns.push(regex);
        Ok(self)
    }

    /// 验证标识符
    ///
    /// 规则：非空、不超过64个字符、不以数字开头、只含字母数字和下划线、不是关键字
    pub fn validate_identifier(&self, kind: IdentifierKind, name: &str) -> QueryCacheResult<()> {
        let label = kind.label();

        let Some(first) = name.chars().next() else {
            return Err(crate::qc_error!(validation, label, format!("{}不能为空", label)));
        };

        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(crate::qc_error!(
                validation,
                name,
                format!("{}长度不能超过{}个字符", label, MAX_IDENTIFIER_LEN)
            ));
        }

        if first.is_ascii_digit() {
            return Err(crate::qc_error!(validation, name, format!("{}不能以数字开头", label)));
        }

        if let Some((i, ch)) = name
            .chars()
            .enumerate()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric() && *ch != '_')
        {
            return Err(crate::qc_error!(
                validation,
                name,
                format!("{}包含非法字符 '{}' 在位置 {}", label, ch, i)
            ));
        }

        let upper = name.to_ascii_uppercase();
        if kind.reserved().contains(&upper.as_str()) {
            return Err(crate::qc_error!(validation, name, format!("{}不能使用SQL关键字: {}", label, name)));
        }

        Ok(())
    }

    pub fn validate_column(&self, name: &str) -> QueryCacheResult<()> {
        self.validate_identifier(IdentifierKind::Column, name)
    }

    pub fn validate_table(&self, name: &str) -> QueryCacheResult<()> {
        self.validate_identifier(IdentifierKind::Table, name)
    }

    /// 验证后返回带方言引号的字段标识符
    pub fn quote_column(&self, name: &str) -> QueryCacheResult<String> {
        self.validate_column(name)?;
        Ok(self.dialect.quote(name))
    }

    /// 验证后返回带方言引号的表标识符
    pub fn quote_table(&self, name: &str) -> QueryCacheResult<String> {
        self.validate_table(name)?;
        Ok(self.dialect.quote(name))
    }

    /// 检查一条参数化语句
    ///
    /// 字符串字面量之外不允许出现分号后接其他语句、`--` 或 `/*`；
    /// 结尾的单个分号是允许的
    pub fn check_statement(&self, sql: &str) -> QueryCacheResult<()> {
        if sql.trim().is_empty() {
            return Err(crate::qc_error!(validation, "sql", "语句不能为空"));
        }

        let bytes = sql.as_bytes();
        let mut quote: Option<u8> = None;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) => {
                    if b == q {
                        // 连续两个引号是转义
                        if bytes.get(i + 1) == Some(&q) {
                            i += 1;
                        } else {
                            quote = None;
                        }
                    }
                }
                None => match b {
                    b'\'' | b'"' | b'`' => quote = Some(b),
                    b';' => {
                        if !sql[i + 1..].trim().is_empty() {
                            return Err(unsafe_statement("不允许多条语句"));
                        }
                    }
                    b'-' if bytes.get(i + 1) == Some(&b'-') => {
                        return Err(unsafe_statement("不允许行注释"));
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        return Err(unsafe_statement("不允许块注释"));
                    }
                    _ => {}
                },
            }
            i += 1;
        }

        if quote.is_some() {
            return Err(unsafe_statement("字符串字面量未闭合"));
        }

        if let Some(pattern) = self.deny_patterns.iter().find(|p| p.is_match(sql)) {
            return Err(unsafe_statement(&format!("匹配拒绝规则 {}", pattern.as_str())));
        }

        Ok(())
    }
}

fn unsafe_statement(message: &str) -> crate::error::QueryCacheError {
    crate::qc_error!(
        validation,
        "sql",
        crate::i18n::tf("error.unsafe_statement", &[("message", message)])
    )
}
