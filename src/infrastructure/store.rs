//! 持久化与对象存储能力
//!
//! 后端的具体实现（HTTP 托管后端 / 内存）都实现这些 trait，
//! 上层只依赖 trait，不关心数据放在哪里。

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{DraftQuestion, ExamAttempt, JobStatus, OperationId, Topic, UploadJob};

/// 对象存储
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 写入一个对象，路径已存在时报错
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;
}

/// 上传任务记录
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &UploadJob) -> AppResult<()>;

    async fn get_job(&self, operation_id: &OperationId) -> AppResult<UploadJob>;

    /// 轮询器写入的状态
    async fn update_status(&self, operation_id: &OperationId, status: JobStatus) -> AppResult<()>;

    /// 提取步骤写入的输出位置与主题
    async fn record_ingestion(
        &self,
        operation_id: &OperationId,
        output_location: &str,
        topics: &[Topic],
    ) -> AppResult<()>;
}

/// 草稿题目
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn insert_drafts(&self, drafts: &[DraftQuestion]) -> AppResult<()>;

    async fn list_by_job(&self, operation_id: &OperationId) -> AppResult<Vec<DraftQuestion>>;

    async fn list_all(&self) -> AppResult<Vec<DraftQuestion>>;
}

/// 考试作答记录
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn insert_attempt(&self, attempt: &ExamAttempt) -> AppResult<()>;

    async fn get_attempt(&self, attempt_id: &str) -> AppResult<ExamAttempt>;

    /// 写入评审结果，仅当存储中的记录仍为 pending_review 时生效
    async fn save_review(&self, attempt: &ExamAttempt) -> AppResult<()>;
}
