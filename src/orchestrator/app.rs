use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::clients::{DocumentAiClient, LlmClient};
use crate::config::Config;
use crate::infrastructure::{BackendClient, QuestionStore};
use crate::models::{load_exam_sheet, OperationId, PracticalScores};
use crate::orchestrator::pipeline::{DocumentPipeline, PipelineDeps, WatchResult};
use crate::orchestrator::status_poller::PollOutcome;
use crate::orchestrator::uploader::{UploadOutcome, UploadRequest};
use crate::services::{CompetencyMatrix, LlmQuestionGenerator, LlmTopicExtractor, ReviewService};
use crate::utils::logging::log_startup;

/// 应用主结构
///
/// 持有所有对外连接，供命令行各子命令使用
pub struct App {
    config: Config,
    backend: Arc<BackendClient>,
    pipeline: DocumentPipeline,
    reviews: ReviewService,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config, command: &str) -> Result<Self> {
        config.validate().context("配置不完整")?;
        log_startup(command, config.poll_interval_secs);

        let backend = Arc::new(BackendClient::new(&config).context("无法创建后端客户端")?);
        let processor = Arc::new(DocumentAiClient::new(&config).context("无法创建文档 AI 客户端")?);
        let llm = LlmClient::new(&config);
        info!("🤖 使用模型: {}", llm.model_name());

        let pipeline = DocumentPipeline::new(
            &config,
            PipelineDeps {
                storage: backend.clone(),
                processor,
                jobs: backend.clone(),
                questions: backend.clone(),
                extractor: Arc::new(LlmTopicExtractor::new(llm.clone(), config.max_context_chars)),
                generator: Arc::new(LlmQuestionGenerator::new(llm)),
            },
        );
        let reviews = ReviewService::new(backend.clone());

        Ok(Self {
            config,
            backend,
            pipeline,
            reviews,
        })
    }

    /// 上传文件并跟进到草稿题目生成
    pub async fn upload(&self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("无法读取文件: {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let run = self
            .pipeline
            .process(
                UploadRequest {
                    file_name,
                    mime: None,
                    bytes,
                    user_id: self.config.user_id.clone(),
                },
                None,
            )
            .await;

        match (&run.upload, run.watch) {
            (UploadOutcome::Accepted(_), Some(watch)) => report_watch(watch),
            (outcome, _) => bail!("{}", outcome.user_message()),
        }
    }

    /// 跟进一个已提交的任务
    pub async fn poll(&self, operation_id: &str) -> Result<()> {
        let watch = self
            .pipeline
            .watch(&OperationId::new(operation_id), None)
            .await
            .with_context(|| format!("无法跟进任务 {}", operation_id))?;
        report_watch(watch)
    }

    /// 学员交卷
    pub async fn grade(&self, sheet_path: &Path) -> Result<()> {
        let sheet = load_exam_sheet(sheet_path).await?;
        let attempt = self.reviews.submit_exam(&sheet).await?;

        info!("📋 作答 {} 的理论成绩:", attempt.id);
        for (category, score) in &attempt.category_scores {
            info!(
                "  {}: {}/{} ({:.2}%)",
                category, score.correct, score.total, score.percentage
            );
        }
        info!("  平均: {:.2}%", attempt.theoretical_average());
        info!("👉 等待顾问评审: lean-exam review {}", attempt.id);
        Ok(())
    }

    /// 顾问评审
    pub async fn review(&self, attempt_id: &str, practical: PracticalScores) -> Result<()> {
        let final_score = self.reviews.submit_review(attempt_id, practical).await?;
        info!("✅ 作答 {} 最终成绩: {:.3}", attempt_id, final_score);
        Ok(())
    }

    /// 打印能力矩阵
    pub async fn matrix(&self, operation_id: Option<&str>) -> Result<()> {
        let questions = match operation_id {
            Some(op) => self.backend.list_by_job(&OperationId::new(op)).await?,
            None => self.backend.list_all().await?,
        };
        let matrix = CompetencyMatrix::from_questions(&questions);

        println!("{}", matrix);
        let gaps = matrix.gaps();
        if !gaps.is_empty() {
            warn!("⚠️ {} 个单元格没有题目", gaps.len());
        }
        Ok(())
    }
}

fn report_watch(watch: WatchResult) -> Result<()> {
    match (watch.poll, watch.flow) {
        (PollOutcome::Completed { .. }, Some(Ok(_))) => Ok(()),
        (PollOutcome::Completed { .. }, Some(Err(e))) => Err(e.into()),
        (PollOutcome::Failed { reason }, _) => {
            bail!("文档解析失败: {}", reason.unwrap_or_else(|| "未知原因".to_string()))
        }
        (PollOutcome::Error { detail }, _) => bail!("检查任务状态出错: {}", detail),
        (PollOutcome::Stopped, _) | (PollOutcome::Completed { .. }, None) => {
            bail!("轮询被中止")
        }
    }
}
