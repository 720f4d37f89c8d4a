//! 托管后端客户端 - 基础设施层
//!
//! 持有唯一的 HTTP 连接池，显式构造后按引用向下传递。
//! 对象存储走 `/storage/v1/object`，表读写走 REST 风格的 `/rest/v1/{table}`。

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult, StorageError};
use crate::infrastructure::store::{AttemptStore, JobStore, ObjectStorage, QuestionStore};
use crate::models::{DraftQuestion, ExamAttempt, JobStatus, OperationId, Topic, UploadJob};
use crate::utils::http::ensure_success;

const JOBS_TABLE: &str = "upload_jobs";
const QUESTIONS_TABLE: &str = "draft_questions";
const ATTEMPTS_TABLE: &str = "exam_attempts";

/// 托管后端客户端
///
/// 职责：
/// - 持有 HTTP Client 与凭证
/// - 暴露对象写入与表的增删改查
/// - 不认识上传流程 / 轮询流程
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    bucket: String,
}

impl BackendClient {
    /// 创建新的后端客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.backend_api_key)
            .map_err(|e| AppError::Other(format!("无效的 BACKEND_API_KEY: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.backend_api_key))
            .map_err(|e| AppError::Other(format!("无效的 BACKEND_API_KEY: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            bucket: config.storage_bucket.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// 插入一行或多行
    async fn insert<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> AppResult<()> {
        let endpoint = self.table_url(table);
        debug!("插入 {}", table);
        let response = self
            .http
            .post(&endpoint)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;
        ensure_success(response, &endpoint).await?;
        Ok(())
    }

    /// 按等值条件查询
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
    ) -> AppResult<Vec<T>> {
        let endpoint = self.table_url(table);
        let mut query: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        query.extend(
            filters
                .iter()
                .map(|(column, value)| (column.to_string(), format!("eq.{}", value))),
        );

        let response = self
            .http
            .get(&endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;
        let rows = ensure_success(response, &endpoint).await?.json::<Vec<T>>().await?;
        Ok(rows)
    }

    /// 按等值条件更新，返回命中的行数
    async fn update(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        patch: &JsonValue,
    ) -> AppResult<usize> {
        let endpoint = self.table_url(table);
        let query: Vec<(String, String)> = filters
            .iter()
            .map(|(column, value)| (column.to_string(), format!("eq.{}", value)))
            .collect();

        let response = self
            .http
            .patch(&endpoint)
            .query(&query)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;
        let rows = ensure_success(response, &endpoint)
            .await?
            .json::<Vec<JsonValue>>()
            .await?;
        Ok(rows.len())
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        key: &str,
    ) -> AppResult<T> {
        self.select::<T>(table, &[(column, key)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(table, key))
    }
}

#[async_trait]
impl ObjectStorage for BackendClient {
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let endpoint = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);
        debug!("写入对象: {} ({} 字节)", path, bytes.len());

        let response = self
            .http
            .post(&endpoint)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        ensure_success(response, &endpoint).await.map_err(|e| {
            AppError::Storage(StorageError::WriteFailed {
                path: path.to_string(),
                detail: e.user_detail(),
            })
        })?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for BackendClient {
    async fn create_job(&self, job: &UploadJob) -> AppResult<()> {
        self.insert(JOBS_TABLE, job).await
    }

    async fn get_job(&self, operation_id: &OperationId) -> AppResult<UploadJob> {
        self.select_one(JOBS_TABLE, "operation_id", operation_id.as_str())
            .await
    }

    async fn update_status(&self, operation_id: &OperationId, status: JobStatus) -> AppResult<()> {
        let patch = json!({
            "status": status,
            "updated_at": chrono::Utc::now(),
        });
        let updated = self
            .update(JOBS_TABLE, &[("operation_id", operation_id.as_str())], &patch)
            .await?;
        if updated == 0 {
            return Err(AppError::not_found(JOBS_TABLE, operation_id.as_str()));
        }
        Ok(())
    }

    async fn record_ingestion(
        &self,
        operation_id: &OperationId,
        output_location: &str,
        topics: &[Topic],
    ) -> AppResult<()> {
        let patch = json!({
            "output_location": output_location,
            "topics": topics,
            "updated_at": chrono::Utc::now(),
        });
        let updated = self
            .update(JOBS_TABLE, &[("operation_id", operation_id.as_str())], &patch)
            .await?;
        if updated == 0 {
            return Err(AppError::not_found(JOBS_TABLE, operation_id.as_str()));
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionStore for BackendClient {
    async fn insert_drafts(&self, drafts: &[DraftQuestion]) -> AppResult<()> {
        if drafts.is_empty() {
            return Ok(());
        }
        self.insert(QUESTIONS_TABLE, drafts).await
    }

    async fn list_by_job(&self, operation_id: &OperationId) -> AppResult<Vec<DraftQuestion>> {
        self.select(QUESTIONS_TABLE, &[("job_id", operation_id.as_str())])
            .await
    }

    async fn list_all(&self) -> AppResult<Vec<DraftQuestion>> {
        self.select(QUESTIONS_TABLE, &[]).await
    }
}

#[async_trait]
impl AttemptStore for BackendClient {
    async fn insert_attempt(&self, attempt: &ExamAttempt) -> AppResult<()> {
        self.insert(ATTEMPTS_TABLE, attempt).await
    }

    async fn get_attempt(&self, attempt_id: &str) -> AppResult<ExamAttempt> {
        self.select_one(ATTEMPTS_TABLE, "id", attempt_id).await
    }

    async fn save_review(&self, attempt: &ExamAttempt) -> AppResult<()> {
        let patch = json!({
            "practical": attempt.practical,
            "final_score": attempt.final_score,
            "status": attempt.status,
            "reviewed_at": attempt.reviewed_at,
        });
        // 条件更新：只改仍在 pending_review 的行
        let updated = self
            .update(
                ATTEMPTS_TABLE,
                &[("id", attempt.id.as_str()), ("status", "pending_review")],
                &patch,
            )
            .await?;
        if updated == 0 {
            return Err(AppError::Storage(StorageError::ConditionFailed {
                table: ATTEMPTS_TABLE.to_string(),
                key: attempt.id.clone(),
            }));
        }
        Ok(())
    }
}
