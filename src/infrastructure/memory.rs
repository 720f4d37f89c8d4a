//! 内存后端 - 基础设施层
//!
//! 与 `BackendClient` 实现相同的 trait，数据只存在进程内。
//! 用于测试。

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, AppResult, StorageError};
use crate::infrastructure::store::{AttemptStore, JobStore, ObjectStorage, QuestionStore};
use crate::models::{
    AttemptStatus, DraftQuestion, ExamAttempt, JobStatus, OperationId, Topic, UploadJob,
};

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<String, (String, Vec<u8>)>,
    jobs: HashMap<OperationId, UploadJob>,
    questions: Vec<DraftQuestion>,
    attempts: HashMap<String, ExamAttempt>,
}

/// 内存后端
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Other("内存后端锁已损坏".to_string()))
    }

    /// 已写入对象的路径列表
    pub fn object_paths(&self) -> Vec<String> {
        self.lock()
            .map(|s| s.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn job_count(&self) -> usize {
        self.lock().map(|s| s.jobs.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.objects.contains_key(path) {
            return Err(AppError::Storage(StorageError::WriteFailed {
                path: path.to_string(),
                detail: "对象已存在".to_string(),
            }));
        }
        state
            .objects
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryBackend {
    async fn create_job(&self, job: &UploadJob) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.jobs.contains_key(&job.operation_id) {
            return Err(AppError::Storage(StorageError::AlreadyExists {
                table: "upload_jobs".to_string(),
                key: job.operation_id.to_string(),
            }));
        }
        state.jobs.insert(job.operation_id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, operation_id: &OperationId) -> AppResult<UploadJob> {
        self.lock()?
            .jobs
            .get(operation_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("upload_jobs", operation_id.as_str()))
    }

    async fn update_status(&self, operation_id: &OperationId, status: JobStatus) -> AppResult<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .get_mut(operation_id)
            .ok_or_else(|| AppError::not_found("upload_jobs", operation_id.as_str()))?;
        job.status = status;
        job.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn record_ingestion(
        &self,
        operation_id: &OperationId,
        output_location: &str,
        topics: &[Topic],
    ) -> AppResult<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .get_mut(operation_id)
            .ok_or_else(|| AppError::not_found("upload_jobs", operation_id.as_str()))?;
        job.output_location = Some(output_location.to_string());
        job.topics = Some(topics.to_vec());
        job.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[async_trait]
impl QuestionStore for MemoryBackend {
    async fn insert_drafts(&self, drafts: &[DraftQuestion]) -> AppResult<()> {
        self.lock()?.questions.extend_from_slice(drafts);
        Ok(())
    }

    async fn list_by_job(&self, operation_id: &OperationId) -> AppResult<Vec<DraftQuestion>> {
        Ok(self
            .lock()?
            .questions
            .iter()
            .filter(|q| &q.job_id == operation_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> AppResult<Vec<DraftQuestion>> {
        Ok(self.lock()?.questions.clone())
    }
}

#[async_trait]
impl AttemptStore for MemoryBackend {
    async fn insert_attempt(&self, attempt: &ExamAttempt) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.attempts.contains_key(&attempt.id) {
            return Err(AppError::Storage(StorageError::AlreadyExists {
                table: "exam_attempts".to_string(),
                key: attempt.id.clone(),
            }));
        }
        state.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, attempt_id: &str) -> AppResult<ExamAttempt> {
        self.lock()?
            .attempts
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("exam_attempts", attempt_id))
    }

    async fn save_review(&self, attempt: &ExamAttempt) -> AppResult<()> {
        let mut state = self.lock()?;
        let stored = state
            .attempts
            .get_mut(&attempt.id)
            .ok_or_else(|| AppError::not_found("exam_attempts", attempt.id.as_str()))?;
        if stored.status != AttemptStatus::PendingReview {
            return Err(AppError::Storage(StorageError::ConditionFailed {
                table: "exam_attempts".to_string(),
                key: attempt.id.clone(),
            }));
        }
        *stored = attempt.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_object_path_is_rejected() {
        let backend = MemoryBackend::new();
        backend
            .put_object("u/1_a.pdf", b"%PDF-".to_vec(), "application/pdf")
            .await
            .unwrap();
        let err = backend
            .put_object("u/1_a.pdf", b"%PDF-".to_vec(), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(StorageError::WriteFailed { .. })));
        assert_eq!(backend.object_paths(), vec!["u/1_a.pdf".to_string()]);
    }

    #[tokio::test]
    async fn status_update_on_unknown_job_fails() {
        let backend = MemoryBackend::new();
        let err = backend
            .update_status(&OperationId::new("missing"), JobStatus::Running)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(StorageError::NotFound { .. })));
    }
}
