//! 提取与生成流程 - 流程层
//!
//! 核心职责：定义"一个已完成任务"的后续处理
//!
//! 流程顺序：
//! 1. 读取输出分片 → 提取主题 → 写回任务记录
//! 2. 主题 + 原文 → 生成草稿题目 → 保存待审核
//!
//! 任何一步失败都终止后续步骤，但不回滚已经成功的步骤。

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{error, info, warn};

use crate::clients::DocumentProcessor;
use crate::error::{AppError, AppResult, PipelineError};
use crate::infrastructure::{JobStore, QuestionStore};
use crate::models::{DraftQuestion, JobStatus, Topic};
use crate::services::{QuestionGenerator, TopicExtractor};
use crate::utils::logging::truncate_text;
use crate::workflow::ingestion_ctx::IngestionCtx;

/// 流程结果
#[derive(Debug, Clone)]
pub struct FlowResult {
    pub topics: Vec<Topic>,
    pub questions: Vec<DraftQuestion>,
    /// 审核页面路径，以任务标识为键
    pub review_path: String,
}

/// 提取步骤的中间结果
#[derive(Debug, Clone)]
pub struct Ingested {
    pub topics: Vec<Topic>,
    pub context: String,
}

/// 提取与生成流程
///
/// - 只依赖能力（trait），不持有具体资源
/// - 对同一任务只执行一次提取
pub struct IngestionFlow {
    processor: Arc<dyn DocumentProcessor>,
    extractor: Arc<dyn TopicExtractor>,
    generator: Arc<dyn QuestionGenerator>,
    jobs: Arc<dyn JobStore>,
    questions: Arc<dyn QuestionStore>,
    batch_size: usize,
    max_context_chars: usize,
}

impl IngestionFlow {
    pub fn new(
        processor: Arc<dyn DocumentProcessor>,
        extractor: Arc<dyn TopicExtractor>,
        generator: Arc<dyn QuestionGenerator>,
        jobs: Arc<dyn JobStore>,
        questions: Arc<dyn QuestionStore>,
        batch_size: usize,
        max_context_chars: usize,
    ) -> Self {
        Self {
            processor,
            extractor,
            generator,
            jobs,
            questions,
            batch_size,
            max_context_chars,
        }
    }

    /// 提取后生成；提取失败时不会调用生成
    pub async fn run(&self, ctx: &IngestionCtx) -> Result<FlowResult, PipelineError> {
        let ingested = self.ingest(ctx).await?;
        let questions = self.generate(ctx, &ingested).await?;

        let result = FlowResult {
            topics: ingested.topics,
            questions,
            review_path: format!("/review/{}", ctx.operation_id),
        };
        info!("{} ✅ 已生成草稿题目，前往审核: {}", ctx, result.review_path);
        Ok(result)
    }

    /// 提取步骤
    pub async fn ingest(&self, ctx: &IngestionCtx) -> Result<Ingested, PipelineError> {
        let op = ctx.operation_id.as_str().to_string();
        let ingestion_err = |e: AppError| PipelineError::Ingestion {
            operation_id: op.clone(),
            reason: e.user_detail(),
        };

        let job = self.jobs.get_job(&ctx.operation_id).await.map_err(ingestion_err)?;
        if job.status != JobStatus::Completed {
            return Err(PipelineError::NotCompleted {
                operation_id: op.clone(),
                status: job.status.to_string(),
            });
        }
        if job.is_ingested() {
            return Err(PipelineError::AlreadyIngested { operation_id: op.clone() });
        }

        let output_location = ctx
            .output_location
            .clone()
            .ok_or_else(|| PipelineError::MissingOutput {
                operation_id: op.clone(),
            })?;

        info!("{} 📥 读取解析结果: {}", ctx, output_location);
        let text = self
            .read_output(&output_location)
            .await
            .map_err(ingestion_err)?;
        if text.trim().is_empty() {
            return Err(PipelineError::Ingestion {
                operation_id: op.clone(),
                reason: "解析结果没有文本".to_string(),
            });
        }
        info!("{} 原文预览: {}", ctx, truncate_text(text.trim(), 80));

        info!("{} 🔍 提取主题...", ctx);
        let topics = self
            .extractor
            .extract_topics(&text)
            .await
            .map_err(ingestion_err)?;
        if topics.is_empty() {
            return Err(PipelineError::Ingestion {
                operation_id: op.clone(),
                reason: "没有提取到任何主题".to_string(),
            });
        }

        self.jobs
            .record_ingestion(&ctx.operation_id, &output_location, &topics)
            .await
            .map_err(ingestion_err)?;
        info!("{} ✓ 提取到 {} 个主题", ctx, topics.len());

        let context: String = text.chars().take(self.max_context_chars).collect();
        Ok(Ingested { topics, context })
    }

    /// 生成步骤
    pub async fn generate(
        &self,
        ctx: &IngestionCtx,
        ingested: &Ingested,
    ) -> Result<Vec<DraftQuestion>, PipelineError> {
        let op = ctx.operation_id.as_str().to_string();
        let generation_err = |e: AppError| PipelineError::Generation {
            operation_id: op.clone(),
            reason: e.user_detail(),
        };

        info!("{} 🤖 生成 {} 道题目...", ctx, self.batch_size);
        let raw = self
            .generator
            .generate(&ingested.topics, &ingested.context, self.batch_size)
            .await
            .map_err(generation_err)?;

        let mut drafts = Vec::with_capacity(self.batch_size);
        for (i, question) in raw.into_iter().enumerate() {
            if drafts.len() == self.batch_size {
                warn!("{} ⚠️ 模型返回的题目超过 {} 道，多余部分已忽略", ctx, self.batch_size);
                break;
            }
            match question.into_draft(&ctx.operation_id, drafts.len()) {
                Ok(draft) => drafts.push(draft),
                Err(reason) => warn!("{} ⚠️ 丢弃第 {} 道题: {}", ctx, i + 1, reason),
            }
        }

        if drafts.is_empty() {
            error!("{} ❌ 没有可用的题目", ctx);
            return Err(PipelineError::Generation {
                operation_id: op.clone(),
                reason: "模型没有返回任何有效题目".to_string(),
            });
        }
        if drafts.len() < self.batch_size {
            warn!(
                "{} ⚠️ 只得到 {}/{} 道有效题目",
                ctx,
                drafts.len(),
                self.batch_size
            );
        }

        self.questions
            .insert_drafts(&drafts)
            .await
            .map_err(generation_err)?;
        info!("{} ✓ 已保存 {} 道草稿题目", ctx, drafts.len());

        Ok(drafts)
    }

    /// 并发读取所有分片，按分片顺序拼接
    async fn read_output(&self, output_location: &str) -> AppResult<String> {
        let shards = self.processor.list_output_shards(output_location).await?;
        let texts = try_join_all(
            shards
                .iter()
                .map(|shard| self.processor.fetch_shard_text(shard)),
        )
        .await?;
        Ok(texts.join("\n"))
    }
}
