//! 查询优化器集成测试

use rat_querycache::optimizer::OPTIMAL_MESSAGE;
use rat_querycache::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

async fn services() -> QueryServices {
    QueryServices::init(AppCacheConfig::new(memory_cache_config(60))).await
}

/// 模拟 25 条记录的列表查询
fn list_items() -> SharedHandler {
    handler_fn(|call: QueryCall| async move {
        let args = call.args().cloned().unwrap_or_default();
        let limit = args.get_kwarg("limit").and_then(|v| v.as_i64()).unwrap_or(25) as usize;
        let offset = args.get_kwarg("offset").and_then(|v| v.as_i64()).unwrap_or(0) as usize;
        let items: Vec<CacheValue> = (1..=25i64)
            .skip(offset)
            .take(limit)
            .map(CacheValue::Int)
            .collect();
        Ok(CacheValue::from(items))
    })
}

fn page_numbers(result: &CacheValue) -> Vec<i64> {
    result
        .get("data")
        .and_then(|d| d.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_i64()).collect())
        .unwrap_or_default()
}

fn has_more(result: &CacheValue) -> bool {
    matches!(
        result.get("pagination").and_then(|p| p.get("has_more")),
        Some(CacheValue::Bool(true))
    )
}

#[tokio::test]
async fn test_pagination_over_25_items() {
    let services = services().await;
    let query = services
        .optimizer
        .pipeline("list_items", list_items())
        .track_performance()
        .paginated(50, 500)
        .build();

    let page2 = query
        .call(QueryArgs::new().kwarg("page", 2).kwarg("page_size", 10))
        .await
        .unwrap();
    println!("🔍 第2页: {}", page2);
    assert_eq!(page_numbers(&page2), (11..=20).collect::<Vec<_>>());
    assert!(has_more(&page2));

    let page3 = query
        .call(QueryArgs::new().kwarg("page", 3).kwarg("page_size", 10))
        .await
        .unwrap();
    assert_eq!(page_numbers(&page3), (21..=25).collect::<Vec<_>>());
    assert!(!has_more(&page3));

    services.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_n_plus_one_batching() {
    let services = services().await;
    let invocations = Arc::new(AtomicUsize::new(0));
    let loader = {
        let invocations = invocations.clone();
        handler_fn(move |call: QueryCall| {
            let invocations = invocations.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                match call.request {
                    BatchRequest::Single(args) => Ok(CacheValue::from(vec![args.args[0].clone()])),
                    BatchRequest::Batch(items) => Ok(CacheValue::from(
                        items.into_iter().map(|a| a.args[0].clone()).collect::<Vec<_>>(),
                    )),
                }
            }
        })
    };

    let load_author = services
        .optimizer
        .pipeline("load_author", loader)
        .prevent_n_plus_one("author")
        .build();

    let results = futures::future::join_all(
        (1..=5).map(|id| load_author.call(QueryArgs::new().arg(id))),
    )
    .await;

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    let expected = CacheValue::from((1..=5).map(CacheValue::from).collect::<Vec<_>>());
    for result in results {
        assert_eq!(result.unwrap(), expected);
    }

    // 窗口之后的调用开启新批次
    let sixth = load_author.call(QueryArgs::new().arg(6)).await.unwrap();
    assert_eq!(sixth, CacheValue::from(vec![CacheValue::from(6)]));
    assert_eq!(invocations.load(Ordering::SeqCst), 2);

    // 关闭开关后直接调用
    services.optimizer.set_batching_enabled(false);
    load_author.call(QueryArgs::new().arg(7)).await.unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
    assert_eq!(services.optimizer.pending_batch_len("author"), 0);

    services.shutdown().await;
}

#[tokio::test]
async fn test_cached_query_hits_and_stats() {
    let services = services().await;
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = {
        let invocations = invocations.clone();
        handler_fn(move |_call: QueryCall| {
            let invocations = invocations.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(CacheValue::Int(128))
            }
        })
    };

    let count_orders = services
        .optimizer
        .pipeline("count_orders", counter)
        .track_performance()
        .cached(None, Some(Duration::from_secs(30)))
        .build();

    for _ in 0..4 {
        assert_eq!(
            count_orders.call(QueryArgs::new().kwarg("status", "paid")).await.unwrap(),
            CacheValue::Int(128)
        );
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    let report = services.optimizer.get_query_stats();
    println!("📊 统计报告: {:?}", report);
    assert_eq!(report.total_queries, 1);
    assert_eq!(report.total_executions, 4);
    assert_eq!(report.most_frequent[0].cache_hits, 3);
    assert!((report.cache_hit_ratio - 0.75).abs() < 1e-9);

    // 不同参数是不同指纹
    count_orders.call(QueryArgs::new().kwarg("status", "open")).await.unwrap();
    assert_eq!(services.optimizer.get_query_stats().total_queries, 2);
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_recommendations_on_empty_registry() {
    let services = services().await;
    let advice = services.optimizer.get_recommendations();
    assert_eq!(advice, vec![OPTIMAL_MESSAGE.to_string()]);
}

#[tokio::test]
async fn test_executor_inside_handler() {
    let services = services().await;
    let executor: Arc<dyn QueryExecutor> = Arc::new(PassthroughExecutor::new(CacheValue::Int(3)));
    let handler = {
        let executor = executor.clone();
        handler_fn(move |call: QueryCall| {
            let executor = executor.clone();
            async move {
                let id = call.args().and_then(|a| a.args.first()).cloned().unwrap_or(CacheValue::Null);
                executor.execute("SELECT count(*) FROM orders WHERE user_id = ?", &[id]).await
            }
        })
    };

    let query = services.optimizer.pipeline("order_count", handler).cached(None, None).build();
    assert_eq!(query.call(QueryArgs::new().arg(1)).await.unwrap(), CacheValue::Int(3));
    assert_eq!(executor.kind(), ExecutorKind::Passthrough);
}
