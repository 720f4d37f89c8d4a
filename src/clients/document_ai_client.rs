/// 文档 AI 客户端
///
/// 封装外部 OCR / 文档解析服务：提交后台任务、查询任务状态、读取输出分片
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{JobStatus, JobStatusReport, OperationId};
use crate::utils::http::ensure_success;

/// 外部文档处理能力
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// 为已存储的文档提交一个后台解析任务
    async fn submit(&self, storage_path: &str, mime: &str) -> AppResult<OperationId>;

    /// 查询任务状态
    async fn status(&self, operation_id: &OperationId) -> AppResult<JobStatusReport>;

    /// 列出输出位置下的所有分片，按顺序返回
    async fn list_output_shards(&self, output_location: &str) -> AppResult<Vec<String>>;

    /// 读取单个分片的文本
    async fn fetch_shard_text(&self, shard: &str) -> AppResult<String>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(alias = "name")]
    operation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(alias = "state")]
    status: String,
    #[serde(default)]
    output_location: Option<String>,
    #[serde(default)]
    error: Option<StatusError>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusError {
    Message { message: String },
    Text(String),
}

impl StatusError {
    fn into_message(self) -> String {
        match self {
            StatusError::Message { message } => message,
            StatusError::Text(text) => text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShardListResponse {
    #[serde(default)]
    shards: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ShardResponse {
    #[serde(default)]
    text: String,
}

/// 文档 AI 客户端
pub struct DocumentAiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl DocumentAiClient {
    /// 创建新的文档 AI 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: config.document_ai_base_url.trim_end_matches('/').to_string(),
            api_key: config.document_ai_api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }
}

#[async_trait]
impl DocumentProcessor for DocumentAiClient {
    async fn submit(&self, storage_path: &str, mime: &str) -> AppResult<OperationId> {
        let endpoint = self.url("documents:process");
        debug!("提交文档解析任务: {}", storage_path);

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "source": storage_path,
                "mime_type": mime,
            }))
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let body: SubmitResponse = ensure_success(response, &endpoint).await?.json().await?;
        let operation_id = body
            .operation_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                AppError::Api(ApiError::MissingField {
                    endpoint: endpoint.clone(),
                    field: "operation_id".to_string(),
                })
            })?;

        Ok(OperationId::new(operation_id))
    }

    async fn status(&self, operation_id: &OperationId) -> AppResult<JobStatusReport> {
        let endpoint = self.url(&format!("operations/{}", operation_id));

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let body: StatusResponse = ensure_success(response, &endpoint).await?.json().await?;
        let status = JobStatus::parse_external(&body.status);
        debug!("任务 {} 状态: {} ({})", operation_id, status, body.status);

        Ok(JobStatusReport {
            status,
            output_location: body.output_location.filter(|_| status == JobStatus::Completed),
            error: body.error.map(StatusError::into_message),
        })
    }

    async fn list_output_shards(&self, output_location: &str) -> AppResult<Vec<String>> {
        let endpoint = self.url("outputs");

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("prefix", output_location)])
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let body: ShardListResponse = ensure_success(response, &endpoint).await?.json().await?;
        let mut shards = body.shards;
        shards.sort();
        Ok(shards)
    }

    async fn fetch_shard_text(&self, shard: &str) -> AppResult<String> {
        let endpoint = self.url(&format!("outputs/{}", shard));

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let body: ShardResponse = ensure_success(response, &endpoint).await?.json().await?;
        Ok(body.text)
    }
}
