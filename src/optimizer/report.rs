//! 统计报告与优化建议

use super::query_stats::QueryStats;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 报告中列出的查询条数
pub const TOP_QUERIES: usize = 10;

/// 没有任何建议时返回的消息
pub const OPTIMAL_MESSAGE: &str = "查询性能良好，暂无优化建议";

/// 单个查询的摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    pub fingerprint: String,
    pub name: String,
    pub count: u64,
    pub avg_time_ms: f64,
    pub max_time_ms: f64,
    pub cache_hits: u64,
    pub errors: u64,
}

impl From<&QueryStats> for QuerySummary {
    fn from(stats: &QueryStats) -> Self {
        Self {
            fingerprint: stats.fingerprint.clone(),
            name: stats.name.clone(),
            count: stats.count,
            avg_time_ms: as_millis(stats.avg_time),
            max_time_ms: as_millis(stats.max_time),
            cache_hits: stats.cache_hits,
            errors: stats.errors,
        }
    }
}

/// 注册表的汇总报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStatsReport {
    /// 不同指纹数
    pub total_queries: usize,
    /// 总执行次数
    pub total_executions: u64,
    pub total_time_ms: f64,
    pub avg_time_ms: f64,
    /// 平均耗时超过慢查询阈值的指纹数
    pub slow_queries: usize,
    /// 缓存命中总数 / 执行总数
    pub cache_hit_ratio: f64,
    /// 平均耗时最长的查询
    pub slowest: Vec<QuerySummary>,
    /// 执行次数最多的查询
    pub most_frequent: Vec<QuerySummary>,
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl QueryStatsReport {
    pub fn build(stats: &[QueryStats], slow_threshold: Duration) -> Self {
        let total_executions: u64 = stats.iter().map(|s| s.count).sum();
        let total_time: Duration = stats.iter().map(|s| s.total_time).sum();
        let total_hits: u64 = stats.iter().map(|s| s.cache_hits).sum();

        let avg_time_ms = if total_executions == 0 {
            0.0
        } else {
            as_millis(total_time) / total_executions as f64
        };
        let cache_hit_ratio = if total_executions == 0 {
            0.0
        } else {
            total_hits as f64 / total_executions as f64
        };

        let mut by_avg: Vec<&QueryStats> = stats.iter().collect();
        by_avg.sort_by(|a, b| b.avg_time.cmp(&a.avg_time));
        let mut by_count: Vec<&QueryStats> = stats.iter().collect();
        by_count.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            total_queries: stats.len(),
            total_executions,
            total_time_ms: as_millis(total_time),
            avg_time_ms,
            slow_queries: stats.iter().filter(|s| s.avg_time > slow_threshold).count(),
            cache_hit_ratio,
            slowest: by_avg.into_iter().take(TOP_QUERIES).map(QuerySummary::from).collect(),
            most_frequent: by_count.into_iter().take(TOP_QUERIES).map(QuerySummary::from).collect(),
        }
    }
}

/// 根据统计生成优化建议
///
/// 没有任何规则触发时返回仅含 `OPTIMAL_MESSAGE` 的列表
pub fn recommendations(stats: &[QueryStats], slow_threshold: Duration) -> Vec<String> {
    let mut sorted: Vec<&QueryStats> = stats.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.fingerprint.cmp(&b.fingerprint)));

    let mut advice = Vec::new();
    for stats in sorted {
        if stats.count == 0 {
            continue;
        }

        if stats.avg_time > slow_threshold && stats.cache_hits == 0 {
            advice.push(format!(
                "查询 {} 平均耗时 {:.1}ms 且从未命中缓存，建议为其添加结果缓存",
                stats.name,
                as_millis(stats.avg_time)
            ));
        }

        if stats.count > 100 && stats.hit_ratio() < 0.5 {
            advice.push(format!(
                "查询 {} 已执行 {} 次但缓存命中率仅 {:.1}%，建议改进缓存键或延长 TTL",
                stats.name,
                stats.count,
                stats.hit_ratio() * 100.0
            ));
        }

        if !stats.min_time.is_zero() && stats.max_time.as_secs_f64() / stats.min_time.as_secs_f64() > 10.0 {
            advice.push(format!(
                "查询 {} 耗时波动较大（最短 {:.1}ms，最长 {:.1}ms），建议排查原因",
                stats.name,
                as_millis(stats.min_time),
                as_millis(stats.max_time)
            ));
        }
    }

    if advice.is_empty() {
        advice.push(OPTIMAL_MESSAGE.to_string());
    }
    advice
}
