//! 上传器 - 编排层
//!
//! ## 职责
//!
//! 接收一个文件，校验通过后依次：
//! 1. 写入对象存储（路径按用户和提交时间划分）
//! 2. 向文档 AI 服务提交后台解析任务
//! 3. 创建任务记录
//!
//! 校验失败只返回面向用户的原因，不发起任何网络调用；
//! 任一子步骤失败即中止并报告第一个错误，已完成的子步骤不做清理。

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{error, info, warn};

use crate::clients::DocumentProcessor;
use crate::error::{AppError, ValidationError};
use crate::infrastructure::{JobStore, ObjectStorage};
use crate::models::UploadJob;
use crate::services::UploadValidator;

/// 一次上传请求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
    pub user_id: String,
}

/// 上传结果
#[derive(Debug)]
pub enum UploadOutcome {
    /// 已提交，任务记录已创建
    Accepted(UploadJob),
    /// 文件校验未通过
    Rejected(ValidationError),
    /// 存储 / 提交 / 建档中的某一步失败
    Aborted(AppError),
}

impl UploadOutcome {
    /// 展示给用户的提示
    pub fn user_message(&self) -> String {
        match self {
            UploadOutcome::Accepted(job) => format!(
                "文件 {} 已提交，正在后台解析 (任务 {})",
                job.document_name, job.operation_id
            ),
            UploadOutcome::Rejected(reason) => reason.to_string(),
            UploadOutcome::Aborted(err) => format!("上传失败: {}", err.user_detail()),
        }
    }

    pub fn job(&self) -> Option<&UploadJob> {
        match self {
            UploadOutcome::Accepted(job) => Some(job),
            _ => None,
        }
    }
}

/// 上传器
pub struct Uploader {
    validator: UploadValidator,
    storage: Arc<dyn ObjectStorage>,
    processor: Arc<dyn DocumentProcessor>,
    jobs: Arc<dyn JobStore>,
}

impl Uploader {
    pub fn new(
        validator: UploadValidator,
        storage: Arc<dyn ObjectStorage>,
        processor: Arc<dyn DocumentProcessor>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            validator,
            storage,
            processor,
            jobs,
        }
    }

    /// 提交一个文件
    pub async fn submit(&self, request: UploadRequest) -> UploadOutcome {
        let kind = match self
            .validator
            .validate(&request.file_name, request.mime.as_deref(), &request.bytes)
        {
            Ok(kind) => kind,
            Err(reason) => {
                warn!("⚠️ 文件被拒绝: {}", reason);
                return UploadOutcome::Rejected(reason);
            }
        };

        let storage_path = storage_path(
            &request.user_id,
            chrono::Utc::now().timestamp_millis(),
            &request.file_name,
        );

        info!("📤 正在上传 {} → {}", request.file_name, storage_path);
        if let Err(e) = self
            .storage
            .put_object(&storage_path, request.bytes, kind.mime())
            .await
        {
            error!("❌ 上传失败: {}", e);
            return UploadOutcome::Aborted(e);
        }

        let operation_id = match self.processor.submit(&storage_path, kind.mime()).await {
            Ok(id) => id,
            Err(e) => {
                error!("❌ 提交解析任务失败: {}", e);
                return UploadOutcome::Aborted(e);
            }
        };

        let job = UploadJob::new(
            operation_id,
            &request.file_name,
            &storage_path,
            &request.user_id,
        );
        if let Err(e) = self.jobs.create_job(&job).await {
            error!("❌ 创建任务记录失败: {}", e);
            return UploadOutcome::Aborted(e);
        }

        info!("[任务 {}] ✓ 已提交后台解析", job.operation_id);
        UploadOutcome::Accepted(job)
    }
}

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"))
}

/// `{用户}/{毫秒时间戳}_{清洗后的文件名}`
pub fn storage_path(user_id: &str, timestamp_ms: i64, file_name: &str) -> String {
    let base = std::path::Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    let cleaned = unsafe_chars().replace_all(base, "_");
    let user = unsafe_chars().replace_all(user_id, "_");
    format!("{}/{}_{}", user, timestamp_ms, cleaned)
}
