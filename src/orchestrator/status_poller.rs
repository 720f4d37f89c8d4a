//! 任务状态轮询器 - 编排层
//!
//! ## 职责
//!
//! 按固定间隔询问外部服务"任务完成了吗"，并把状态写回任务记录。
//!
//! ## 规则
//!
//! - 单飞：上一次查询还没返回时，新的定时触发直接跳过，不排队
//! - completed → 停止，返回输出位置
//! - failed → 停止，不重试
//! - 其他状态 → 继续轮询，发出"仍在处理"提示
//! - 查询本身出错 → 停止，视为终态，不重试
//! - 句柄被停止或丢弃后不再触发新的查询；已发出的查询不会被取消，其结果被丢弃

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::clients::DocumentProcessor;
use crate::error::AppResult;
use crate::infrastructure::JobStore;
use crate::models::{JobStatus, JobStatusReport, OperationId};

/// 轮询间隔下限，更小的间隔（包括 0）会被抬高到该值
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 轮询过程中的提示
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// 任务仍在处理
    StillProcessing { poll: usize, status: JobStatus },
    /// 任务完成
    Completed,
    /// 任务失败
    Failed { reason: Option<String> },
    /// 查询出错
    Error { detail: String },
}

impl PollEvent {
    /// 展示给用户的提示
    pub fn user_message(&self) -> String {
        match self {
            PollEvent::StillProcessing { poll, .. } => {
                format!("文档仍在处理中，请稍候…（第 {} 次检查）", poll)
            }
            PollEvent::Completed => "文档解析完成，正在提取主题并生成题目".to_string(),
            PollEvent::Failed { reason } => match reason {
                Some(r) => format!("文档解析失败: {}", r),
                None => "文档解析失败".to_string(),
            },
            PollEvent::Error { detail } => format!("检查任务状态出错: {}", detail),
        }
    }
}

/// 轮询的最终结果
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed { output_location: Option<String> },
    Failed { reason: Option<String> },
    Error { detail: String },
    /// 被外部停止（例如视图销毁）
    Stopped,
}

/// 轮询统计，可在运行中读取
#[derive(Debug, Default)]
pub struct PollStats {
    /// 已发出的状态查询次数
    pub checks: AtomicUsize,
    /// 因单飞而跳过的触发次数
    pub skipped_ticks: AtomicUsize,
}

/// 任务状态轮询器
pub struct StatusPoller {
    processor: Arc<dyn DocumentProcessor>,
    jobs: Arc<dyn JobStore>,
    operation_id: OperationId,
    interval: Duration,
    events: Option<mpsc::UnboundedSender<PollEvent>>,
    stats: Arc<PollStats>,
}

/// 运行中的轮询器句柄
///
/// 丢弃句柄等同于调用 `stop()`
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<PollOutcome>,
    stats: Arc<PollStats>,
}

impl PollerHandle {
    /// 停止后续的定时触发
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// 等待轮询结束
    pub async fn join(mut self) -> PollOutcome {
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(e) => PollOutcome::Error {
                detail: format!("轮询任务异常退出: {}", e),
            },
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

impl StatusPoller {
    pub fn new(
        processor: Arc<dyn DocumentProcessor>,
        jobs: Arc<dyn JobStore>,
        operation_id: OperationId,
        interval: Duration,
    ) -> Self {
        if interval < MIN_POLL_INTERVAL {
            warn!(
                "[任务 {}] ⚠️ 轮询间隔 {:?} 过小，改为 {:?}",
                operation_id, interval, MIN_POLL_INTERVAL
            );
        }
        Self {
            processor,
            jobs,
            operation_id,
            interval: interval.max(MIN_POLL_INTERVAL),
            events: None,
            stats: Arc::new(PollStats::default()),
        }
    }

    /// 订阅轮询提示
    pub fn with_events(mut self, events: mpsc::UnboundedSender<PollEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// 在后台启动轮询
    pub fn spawn(self) -> PollerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let stats = Arc::clone(&self.stats);
        let task = tokio::spawn(self.run(stop_rx));
        PollerHandle {
            stop_tx,
            task,
            stats,
        }
    }

    fn emit(&self, event: PollEvent) {
        info!("[任务 {}] {}", self.operation_id, event.user_message());
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    async fn run(self, mut stop_rx: watch::Receiver<bool>) -> PollOutcome {
        let mut in_flight = false;
        let (result_tx, mut result_rx) = mpsc::channel::<AppResult<JobStatusReport>>(1);

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last_status: Option<JobStatus> = None;
        let mut polls = 0usize;

        info!(
            "[任务 {}] ⏳ 开始轮询，间隔 {} 秒",
            self.operation_id,
            self.interval.as_secs_f64()
        );

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    // 发送端被丢弃也视为停止
                    if changed.is_err() || *stop_rx.borrow() {
                        debug!("[任务 {}] 轮询已停止", self.operation_id);
                        return PollOutcome::Stopped;
                    }
                }
                _ = ticker.tick() => {
                    if in_flight {
                        self.stats.skipped_ticks.fetch_add(1, Ordering::Relaxed);
                        debug!("[任务 {}] 上一次查询尚未返回，跳过本次触发", self.operation_id);
                        continue;
                    }
                    in_flight = true;
                    self.stats.checks.fetch_add(1, Ordering::Relaxed);

                    let processor = Arc::clone(&self.processor);
                    let operation_id = self.operation_id.clone();
                    let tx = result_tx.clone();
                    tokio::spawn(async move {
                        let result = processor.status(&operation_id).await;
                        // 轮询已结束时接收端已关闭，结果直接丢弃
                        let _ = tx.send(result).await;
                    });
                }
                Some(result) = result_rx.recv() => {
                    polls += 1;
                    let outcome = self.handle_result(result, polls, &mut last_status).await;
                    in_flight = false;
                    if let Some(outcome) = outcome {
                        return outcome;
                    }
                }
            }
        }
    }

    /// 处理一次查询结果；返回 `Some` 表示轮询结束
    async fn handle_result(
        &self,
        result: AppResult<JobStatusReport>,
        poll: usize,
        last_status: &mut Option<JobStatus>,
    ) -> Option<PollOutcome> {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                let detail = e.user_detail();
                error!("[任务 {}] ❌ 状态查询失败: {}", self.operation_id, e);
                self.emit(PollEvent::Error {
                    detail: detail.clone(),
                });
                return Some(PollOutcome::Error { detail });
            }
        };

        if *last_status != Some(report.status) {
            if let Err(e) = self.jobs.update_status(&self.operation_id, report.status).await {
                let detail = e.user_detail();
                error!("[任务 {}] ❌ 写入任务状态失败: {}", self.operation_id, e);
                self.emit(PollEvent::Error {
                    detail: detail.clone(),
                });
                return Some(PollOutcome::Error { detail });
            }
            *last_status = Some(report.status);
        }

        if !report.status.is_terminal() {
            self.emit(PollEvent::StillProcessing {
                poll,
                status: report.status,
            });
            return None;
        }

        if report.status == JobStatus::Completed {
            self.emit(PollEvent::Completed);
            Some(PollOutcome::Completed {
                output_location: report.output_location,
            })
        } else {
            warn!("[任务 {}] ⚠️ 外部任务失败", self.operation_id);
            self.emit(PollEvent::Failed {
                reason: report.error.clone(),
            });
            Some(PollOutcome::Failed {
                reason: report.error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::MemoryBackend;
    use crate::models::UploadJob;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按脚本返回状态的假服务，脚本用完后一直返回 running
    struct ScriptedProcessor {
        script: Mutex<VecDeque<AppResult<JobStatusReport>>>,
        latency: Duration,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ScriptedProcessor {
        fn new(script: Vec<AppResult<JobStatusReport>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                latency: Duration::ZERO,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }

        fn slow(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }
    }

    #[async_trait]
    impl DocumentProcessor for ScriptedProcessor {
        async fn submit(&self, _: &str, _: &str) -> AppResult<OperationId> {
            unreachable!()
        }

        async fn status(&self, _: &OperationId) -> AppResult<JobStatusReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(JobStatusReport::running()))
        }

        async fn list_output_shards(&self, _: &str) -> AppResult<Vec<String>> {
            unreachable!()
        }

        async fn fetch_shard_text(&self, _: &str) -> AppResult<String> {
            unreachable!()
        }
    }

    async fn store_with_job(op: &str) -> Arc<MemoryBackend> {
        let store = Arc::new(MemoryBackend::new());
        store
            .create_job(&UploadJob::new(OperationId::new(op), "doc.pdf", "u/1_doc.pdf", "u"))
            .await
            .unwrap();
        store
    }

    fn poller(
        processor: Arc<ScriptedProcessor>,
        store: Arc<MemoryBackend>,
        op: &str,
    ) -> StatusPoller {
        StatusPoller::new(processor, store, OperationId::new(op), Duration::from_secs(20))
    }

    #[tokio::test(start_paused = true)]
    async fn running_five_times_then_completed() {
        let store = store_with_job("op-ok").await;
        let mut script: Vec<AppResult<JobStatusReport>> =
            (0..5).map(|_| Ok(JobStatusReport::running())).collect();
        script.push(Ok(JobStatusReport::completed("gs://out/op-ok/")));
        let processor = Arc::new(ScriptedProcessor::new(script));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = poller(processor.clone(), store.clone(), "op-ok")
            .with_events(tx)
            .spawn();
        let outcome = handle.join().await;

        assert_eq!(
            outcome,
            PollOutcome::Completed {
                output_location: Some("gs://out/op-ok/".to_string())
            }
        );
        assert_eq!(processor.calls.load(Ordering::SeqCst), 6);

        let mut still_processing = 0;
        let mut completed = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                PollEvent::StillProcessing { .. } => still_processing += 1,
                PollEvent::Completed => completed += 1,
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(still_processing, 5);
        assert_eq!(completed, 1);

        let job = store.get_job(&OperationId::new("op-ok")).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_stops_without_retry() {
        let store = store_with_job("op-fail").await;
        let processor = Arc::new(ScriptedProcessor::new(vec![
            Ok(JobStatusReport::running()),
            Ok(JobStatusReport::failed("unreadable page")),
        ]));

        let handle = poller(processor.clone(), store.clone(), "op-fail").spawn();
        let outcome = handle.join().await;
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                reason: Some("unreadable page".to_string())
            }
        );

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
        let job = store.get_job(&OperationId::new("op-fail")).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_check_suppresses_overlapping_ticks() {
        let store = store_with_job("op-slow").await;
        let processor =
            Arc::new(ScriptedProcessor::new(vec![]).slow(Duration::from_secs(70)));

        let handle = poller(processor.clone(), store, "op-slow").spawn();

        // 第一次查询在 20s 发出，90s 返回；40s / 60s / 80s 的触发都被跳过
        tokio::time::sleep(Duration::from_secs(85)).await;
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.stats().checks.load(Ordering::Relaxed), 1);
        assert_eq!(handle.stats().skipped_ticks.load(Ordering::Relaxed), 3);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(processor.max_active.load(Ordering::SeqCst), 1);
        assert!(processor.calls.load(Ordering::SeqCst) >= 2);

        handle.stop();
        assert_eq!(handle.join().await, PollOutcome::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_stops_polling() {
        let store = store_with_job("op-err").await;
        let processor = Arc::new(ScriptedProcessor::new(vec![
            Ok(JobStatusReport::running()),
            Err(AppError::bad_response("/v1/operations/op-err", 500, "backend exploded")),
        ]));

        let outcome = poller(processor.clone(), store.clone(), "op-err")
            .spawn()
            .join()
            .await;
        assert_eq!(
            outcome,
            PollOutcome::Error {
                detail: "backend exploded".to_string()
            }
        );

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
        let job = store.get_job(&OperationId::new("op-err")).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_checks() {
        let store = store_with_job("op-stop").await;
        let processor = Arc::new(ScriptedProcessor::new(vec![]));
        let handle = poller(processor.clone(), store, "op-stop").spawn();

        tokio::time::sleep(Duration::from_secs(45)).await;
        handle.stop();
        assert_eq!(handle.join().await, PollOutcome::Stopped);

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_polling() {
        let store = store_with_job("op-drop").await;
        let processor = Arc::new(ScriptedProcessor::new(vec![]));
        let handle = poller(processor.clone(), store, "op-drop").spawn();

        tokio::time::sleep(Duration::from_secs(25)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_to_minimum() {
        let store = store_with_job("op-zero").await;
        let processor = Arc::new(ScriptedProcessor::new(vec![
            Ok(JobStatusReport::running()),
            Ok(JobStatusReport::completed("gs://out/op-zero/")),
        ]));
        let started = Instant::now();

        let outcome = StatusPoller::new(
            processor.clone(),
            store,
            OperationId::new("op-zero"),
            Duration::ZERO,
        )
        .spawn()
        .join()
        .await;

        assert!(matches!(outcome, PollOutcome::Completed { .. }));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= MIN_POLL_INTERVAL * 2);
    }

    #[test]
    fn event_messages_are_user_facing() {
        let msg = PollEvent::Failed {
            reason: Some("página ilegible".to_string()),
        }
        .user_message();
        assert!(msg.contains("página ilegible"));
    }
}
