//! 文档流水线 - 编排层
//!
//! 上传 → 轮询 → （完成时）提取 → 生成
//!
//! - 只有轮询结果为 completed 时才进入提取，且只进入一次
//! - failed / 查询出错 / 被停止时不做任何提取与生成

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clients::DocumentProcessor;
use crate::config::Config;
use crate::error::{AppResult, PipelineError};
use crate::infrastructure::{JobStore, ObjectStorage, QuestionStore};
use crate::models::OperationId;
use crate::orchestrator::status_poller::{PollEvent, PollOutcome, StatusPoller};
use crate::orchestrator::uploader::{UploadOutcome, UploadRequest, Uploader};
use crate::services::{QuestionGenerator, TopicExtractor, UploadValidator};
use crate::utils::logging::print_pipeline_summary;
use crate::workflow::{FlowResult, IngestionCtx, IngestionFlow};

/// 流水线依赖的全部能力
pub struct PipelineDeps {
    pub storage: Arc<dyn ObjectStorage>,
    pub processor: Arc<dyn DocumentProcessor>,
    pub jobs: Arc<dyn JobStore>,
    pub questions: Arc<dyn QuestionStore>,
    pub extractor: Arc<dyn TopicExtractor>,
    pub generator: Arc<dyn QuestionGenerator>,
}

/// 轮询及其后续处理的结果
#[derive(Debug)]
pub struct WatchResult {
    pub poll: PollOutcome,
    /// 仅当轮询结果为 completed 时存在
    pub flow: Option<Result<FlowResult, PipelineError>>,
}

impl WatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self.flow, Some(Ok(_)))
    }
}

/// 一次完整运行的结果
#[derive(Debug)]
pub struct PipelineRun {
    pub upload: UploadOutcome,
    /// 上传未被接受时为 None
    pub watch: Option<WatchResult>,
}

/// 文档流水线
pub struct DocumentPipeline {
    uploader: Uploader,
    processor: Arc<dyn DocumentProcessor>,
    jobs: Arc<dyn JobStore>,
    flow: IngestionFlow,
    poll_interval: Duration,
}

impl DocumentPipeline {
    pub fn new(config: &Config, deps: PipelineDeps) -> Self {
        let uploader = Uploader::new(
            UploadValidator::new(config.max_upload_bytes),
            Arc::clone(&deps.storage),
            Arc::clone(&deps.processor),
            Arc::clone(&deps.jobs),
        );
        let flow = IngestionFlow::new(
            Arc::clone(&deps.processor),
            deps.extractor,
            deps.generator,
            Arc::clone(&deps.jobs),
            deps.questions,
            config.question_batch_size,
            config.max_context_chars,
        );

        Self {
            uploader,
            processor: deps.processor,
            jobs: deps.jobs,
            flow,
            poll_interval: config.poll_interval(),
        }
    }

    /// 上传一个文件并跟进到结束
    pub async fn process(
        &self,
        request: UploadRequest,
        events: Option<mpsc::UnboundedSender<PollEvent>>,
    ) -> PipelineRun {
        let upload = self.uploader.submit(request).await;
        info!("{}", upload.user_message());

        let watch = match upload.job() {
            Some(job) => {
                let operation_id = job.operation_id.clone();
                let document_name = job.document_name.clone();
                Some(self.follow(operation_id, document_name, events).await)
            }
            None => None,
        };

        PipelineRun { upload, watch }
    }

    /// 跟进一个已提交的任务
    pub async fn watch(
        &self,
        operation_id: &OperationId,
        events: Option<mpsc::UnboundedSender<PollEvent>>,
    ) -> AppResult<WatchResult> {
        let job = self.jobs.get_job(operation_id).await?;
        Ok(self
            .follow(job.operation_id, job.document_name, events)
            .await)
    }

    async fn follow(
        &self,
        operation_id: OperationId,
        document_name: String,
        events: Option<mpsc::UnboundedSender<PollEvent>>,
    ) -> WatchResult {
        let mut poller = StatusPoller::new(
            Arc::clone(&self.processor),
            Arc::clone(&self.jobs),
            operation_id.clone(),
            self.poll_interval,
        );
        if let Some(tx) = events {
            poller = poller.with_events(tx);
        }

        let poll = poller.spawn().join().await;

        let flow = match &poll {
            PollOutcome::Completed { output_location } => {
                let ctx = IngestionCtx::new(operation_id, document_name, output_location.clone());
                let result = self.flow.run(&ctx).await;
                match &result {
                    Ok(done) => print_pipeline_summary(
                        ctx.operation_id.as_str(),
                        done.topics.len(),
                        done.questions.len(),
                        &done.review_path,
                    ),
                    Err(e) => error!("{} ❌ {}", ctx, e),
                }
                Some(result)
            }
            PollOutcome::Failed { .. } => {
                warn!("[任务 {}] ⚠️ 外部解析失败，跳过提取与生成", operation_id);
                None
            }
            PollOutcome::Error { detail } => {
                error!("[任务 {}] ❌ 轮询中止: {}", operation_id, detail);
                None
            }
            PollOutcome::Stopped => None,
        };

        WatchResult { poll, flow }
    }
}
