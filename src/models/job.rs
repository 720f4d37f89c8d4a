use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::question::Topic;

/// 外部文档处理服务返回的操作标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// 宽松解析外部服务返回的状态字符串
    ///
    /// 无法识别的状态一律视为仍在处理中
    pub fn parse_external(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "QUEUED" | "PENDING" | "SUBMITTED" => JobStatus::Queued,
            "COMPLETED" | "SUCCEEDED" | "DONE" => JobStatus::Completed,
            "FAILED" | "ERROR" | "CANCELLED" | "CANCELED" => JobStatus::Failed,
            _ => JobStatus::Running,
        }
    }

    /// completed / failed 之后不会再变化
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 一次状态查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusReport {
    pub status: JobStatus,
    /// 仅在完成时存在
    pub output_location: Option<String>,
    /// 服务返回的失败原因
    pub error: Option<String>,
}

impl JobStatusReport {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            output_location: None,
            error: None,
        }
    }

    pub fn completed(output_location: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            output_location: Some(output_location.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            output_location: None,
            error: Some(error.into()),
        }
    }
}

/// 上传任务记录
///
/// 由上传器创建；状态只由轮询器修改，输出位置与主题只由提取步骤写入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    pub operation_id: OperationId,
    pub document_name: String,
    pub storage_path: String,
    pub user_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Topic>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadJob {
    pub fn new(
        operation_id: OperationId,
        document_name: impl Into<String>,
        storage_path: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            operation_id,
            document_name: document_name.into(),
            storage_path: storage_path.into(),
            user_id: user_id.into(),
            status: JobStatus::Queued,
            output_location: None,
            topics: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_ingested(&self) -> bool {
        self.topics.is_some()
    }
}
