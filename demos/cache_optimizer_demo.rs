//! RatQueryCache 缓存与查询优化示例
//!
//! 演示组合根初始化、后端回退、结果缓存、N+1 批处理、分页
//! 以及统计报告和优化建议。

use rat_logger::{LoggerBuilder, handler::term::TermConfig};
use rat_querycache::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 模拟数据库：按 id 查询作者，支持单次和批量两种形态
fn author_loader(db_calls: Arc<AtomicUsize>) -> SharedHandler {
    handler_fn(move |call: QueryCall| {
        let db_calls = db_calls.clone();
        async move {
            db_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let ids: Vec<CacheValue> = call
                .request
                .into_vec()
                .into_iter()
                .filter_map(|args| args.args.first().cloned())
                .collect();
            Ok(CacheValue::from(ids))
        }
    })
}

/// 模拟 120 条记录的文章列表
fn article_list(executor: Arc<dyn QueryExecutor>) -> SharedHandler {
    handler_fn(move |call: QueryCall| {
        let executor = executor.clone();
        async move {
            let args = call.args().cloned().unwrap_or_default();
            let limit = args.get_kwarg("limit").and_then(|v| v.as_i64()).unwrap_or(10);
            let offset = args.get_kwarg("offset").and_then(|v| v.as_i64()).unwrap_or(0);

            executor
                .execute(
                    "SELECT id, title FROM articles ORDER BY id LIMIT ? OFFSET ?",
                    &[CacheValue::Int(limit), CacheValue::Int(offset)],
                )
                .await?;

            let items = (offset + 1..=120)
                .take(limit as usize)
                .map(|id| CacheValue::from(format!("文章 #{}", id)))
                .collect::<Vec<_>>();
            Ok(CacheValue::from(items))
        }
    })
}

#[tokio::main]
async fn main() -> QueryCacheResult<()> {
    LoggerBuilder::new()
        .add_terminal_with_config(TermConfig::default())
        .init()
        .map_err(|e| qc_error!(config, format!("日志初始化失败: {:?}", e)))?;
    rat_querycache::init();

    println!("=== RatQueryCache 缓存与查询优化示例 ===");
    println!("库版本: {}", rat_querycache::get_info());

    // 1. 远程缓存不可达时自动回退
    println!("\n1. 初始化服务（远程地址不可达，演示回退）...");
    let cache_config = CacheConfig::builder()
        .backend(BackendType::Remote)
        .remote_url("redis://127.0.0.1:1/0")
        .timeout_secs(1)
        .default_ttl_secs(120)
        .build()?;
    let optimizer_config = OptimizerConfig::builder()
        .slow_query_threshold_ms(15)
        .batch_window_ms(50)
        .page_sizes(10, 50)
        .build()?;
    let services = QueryServices::init(AppCacheConfig::new(cache_config).with_optimizer(optimizer_config)).await;
    println!("✅ 实际使用的后端: {}", services.cache.backend_name());

    // 2. N+1 批处理
    println!("\n2. N+1 批处理...");
    let db_calls = Arc::new(AtomicUsize::new(0));
    let load_author = services
        .optimizer
        .pipeline("load_author", author_loader(db_calls.clone()))
        .track_performance()
        .prevent_n_plus_one("author")
        .build();

    let results = futures::future::join_all((1..=8).map(|id| load_author.call(QueryArgs::new().arg(id)))).await;
    println!("  8 次调用，数据库访问 {} 次", db_calls.load(Ordering::SeqCst));
    if let Some(Ok(first)) = results.first() {
        println!("  批次结果: {}", first);
    }

    // 3. 分页 + 结果缓存
    println!("\n3. 分页与结果缓存...");
    let executor = build_executor(ExecutorKind::Passthrough, SqlDialect::SQLite, None)?;
    let list_articles = services
        .optimizer
        .pipeline("list_articles", article_list(executor))
        .track_performance()
        .cached(None, Some(Duration::from_secs(60)))
        .paginated(10, 50)
        .build();

    for round in 1..=3 {
        let page = list_articles
            .call(QueryArgs::new().kwarg("page", 2).kwarg("page_size", 5))
            .await?;
        println!("  第{}次: {}", round, page);
    }

    // 4. 缓存直接操作
    println!("\n4. 缓存操作...");
    let key = services.cache.generate_key(&[&"user", &42, &"profile"]);
    services.cache.set(&key, &CacheValue::from("张三"), None).await;
    println!("  {} => {}", key, services.cache.get(&key, CacheValue::Null).await);
    println!("  缓存统计: {:?}", services.cache.stats().await);

    // 5. 统计与建议
    println!("\n5. 查询统计...");
    let report = services.optimizer.get_query_stats();
    println!(
        "  查询数: {}, 执行次数: {}, 平均耗时: {:.2}ms, 缓存命中率: {:.1}%",
        report.total_queries,
        report.total_executions,
        report.avg_time_ms,
        report.cache_hit_ratio * 100.0
    );
    for advice in services.optimizer.get_recommendations() {
        println!("  💡 {}", advice);
    }

    services.shutdown().await;
    println!("\n✅ 示例完成");
    Ok(())
}
