//! N+1 批处理执行器
//!
//! 同一批次键在时间窗口内到达的调用被合并为一次处理函数调用。
//! 所有批次键的定时由同一个调度任务管理：它持有按截止时间排序的堆，
//! 到期时在锁内摘下整组待处理调用，随后在锁外执行刷新，
//! 慢的下游调用不会阻塞新的入队。

use super::handler::{QueryArgs, QueryCall, SharedHandler};
use crate::error::QueryCacheResult;
use crate::types::CacheValue;
use parking_lot::Mutex;
use rat_logger::{debug, error, warn};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// 等待刷新结果的单次调用
struct PendingCall {
    args: QueryArgs,
    reply: oneshot::Sender<Option<CacheValue>>,
}

/// 一个批次键下的待处理调用
///
/// 组存在即表示恰有一个已排期的刷新；刷新时整组从表中移除
struct BatchGroup {
    name: String,
    handler: SharedHandler,
    pending: Vec<PendingCall>,
    generation: u64,
}

/// 调度任务收到的排期请求
struct ScheduleRequest {
    batch_key: String,
    generation: u64,
    deadline: Instant,
}

type GroupMap = Arc<Mutex<HashMap<String, BatchGroup>>>;

/// 批处理执行器
pub struct BatchExecutor {
    window: Duration,
    groups: GroupMap,
    schedule_tx: mpsc::UnboundedSender<ScheduleRequest>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    next_generation: Mutex<u64>,
    closed: AtomicBool,
}

impl BatchExecutor {
    /// 创建执行器并启动调度任务
    ///
    /// 必须在 tokio 运行时内调用
    pub fn new(window: Duration) -> Self {
        let groups: GroupMap = Arc::new(Mutex::new(HashMap::new()));
        let (schedule_tx, schedule_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_scheduler(groups.clone(), schedule_rx));

        debug!("批处理执行器已启动: window={:?}", window);

        Self {
            window,
            groups,
            schedule_tx,
            scheduler: Mutex::new(Some(handle)),
            next_generation: Mutex::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 批次键下等待刷新的调用数
    pub fn pending_len(&self, batch_key: &str) -> usize {
        self.groups
            .lock()
            .get(batch_key)
            .map(|group| group.pending.len())
            .unwrap_or(0)
    }

    /// 加入批次并等待刷新结果
    ///
    /// 同一批次的所有调用者拿到同一个结果；刷新失败时为 `None`。
    /// 批次第一次调用的处理函数负责整批。
    pub async fn batch_query(
        &self,
        batch_key: &str,
        name: &str,
        handler: SharedHandler,
        args: QueryArgs,
    ) -> QueryCacheResult<Option<CacheValue>> {
        let (reply, receiver) = oneshot::channel();

        {
            // 关闭标记在锁内检查，与 shutdown 的清空互斥
            let mut groups = self.groups.lock();
            if self.closed.load(Ordering::Acquire) {
                return Err(crate::qc_error!(
                    batch,
                    crate::i18n::tf("error.batch_closed", &[("batch_key", batch_key)])
                ));
            }
            match groups.get_mut(batch_key) {
                Some(group) => group.pending.push(PendingCall { args, reply }),
                None => {
                    let generation = {
                        let mut next = self.next_generation.lock();
                        *next += 1;
                        *next
                    };
                    let request = ScheduleRequest {
                        batch_key: batch_key.to_string(),
                        generation,
                        deadline: Instant::now() + self.window,
                    };
                    if self.schedule_tx.send(request).is_err() {
                        return Err(crate::qc_error!(
                            batch,
                            crate::i18n::tf("error.batch_closed", &[("batch_key", batch_key)])
                        ));
                    }
                    groups.insert(
                        batch_key.to_string(),
                        BatchGroup {
                            name: name.to_string(),
                            handler,
                            pending: vec![PendingCall { args, reply }],
                            generation,
                        },
                    );
                }
            }
        }

        receiver.await.map_err(|_| {
            crate::qc_error!(
                batch,
                crate::i18n::tf("error.batch_closed", &[("batch_key", batch_key)])
            )
        })
    }

    /// 立即刷新所有待处理批次并停止调度任务
    pub async fn shutdown(&self) {
        // 关闭标记与取出批次在同一把锁内，之后的 batch_query 不会再入组
        let drained: Vec<(String, BatchGroup)> = {
            let mut groups = self.groups.lock();
            self.closed.store(true, Ordering::Release);
            groups.drain().collect()
        };

        let handle = self.scheduler.lock().take();
        if let Some(handle) = handle {
            handle.abort();
        }

        for (batch_key, group) in drained {
            flush(batch_key, group).await;
        }
        debug!("批处理执行器已关闭");
    }
}

impl Drop for BatchExecutor {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
        }
    }
}

/// 调度任务：管理所有批次键的截止时间
async fn run_scheduler(groups: GroupMap, mut schedule_rx: mpsc::UnboundedReceiver<ScheduleRequest>) {
    let mut timers: BinaryHeap<Reverse<(Instant, u64, String)>> = BinaryHeap::new();

    loop {
        let next_deadline = timers.peek().map(|Reverse((deadline, _, _))| *deadline);

        tokio::select! {
            request = schedule_rx.recv() => match request {
                Some(request) => {
                    timers.push(Reverse((request.deadline, request.generation, request.batch_key)));
                }
                None => break,
            },
            _ = sleep_until_deadline(next_deadline) => {
                let now = Instant::now();
                while let Some(Reverse((deadline, _, _))) = timers.peek() {
                    if *deadline > now {
                        break;
                    }
                    let Some(Reverse((_, generation, batch_key))) = timers.pop() else {
                        break;
                    };

                    // 在锁内摘下整组，锁外刷新
                    let detached = {
                        let mut groups = groups.lock();
                        match groups.get(&batch_key) {
                            Some(group) if group.generation == generation => groups.remove(&batch_key),
                            _ => None,
                        }
                    };

                    match detached {
                        Some(group) => {
                            tokio::spawn(flush(batch_key, group));
                        }
                        None => warn!("批次定时器已失效: batch_key={}", batch_key),
                    }
                }
            }
        }
    }

    debug!("批处理调度任务退出");
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// 执行一次刷新并把结果分发给所有等待者
async fn flush(batch_key: String, group: BatchGroup) {
    let BatchGroup { name, handler, pending, .. } = group;
    let (mut items, replies): (Vec<QueryArgs>, Vec<oneshot::Sender<Option<CacheValue>>>) =
        pending.into_iter().map(|call| (call.args, call.reply)).unzip();

    let call = if items.len() == 1 {
        let args = items.remove(0);
        QueryCall::new(name, args)
    } else {
        QueryCall::batch(name, items)
    };

    debug!("刷新批次: batch_key={}, size={}", batch_key, call.request.len());

    let result = match handler.call(call).await {
        Ok(value) => Some(value),
        Err(e) => {
            error!(
                "{}",
                crate::i18n::tf(
                    "error.batch_flush",
                    &[("batch_key", &batch_key), ("message", &e.to_string())]
                )
            );
            None
        }
    };

    for reply in replies {
        // 等待者可能已放弃
        let _ = reply.send(result.clone());
    }
}
