//! 评审服务 - 业务能力层
//!
//! 顾问提交五项实操分数，作答记录从 pending_review 变为 completed。
//! 已完成的记录在这里拒绝写入，存储层的条件更新再做一次兜底。

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, AppResult, ScoringError};
use crate::infrastructure::AttemptStore;
use crate::models::loaders::ExamSheet;
use crate::models::{ExamAttempt, PracticalScores};
use crate::services::scoring_service;

/// 评审服务
pub struct ReviewService {
    attempts: Arc<dyn AttemptStore>,
}

impl ReviewService {
    pub fn new(attempts: Arc<dyn AttemptStore>) -> Self {
        Self { attempts }
    }

    /// 学员交卷：统计理论分并创建待评审记录
    pub async fn submit_exam(&self, sheet: &ExamSheet) -> AppResult<ExamAttempt> {
        let scores = scoring_service::grade_answers(&sheet.questions)?;
        let attempt_id = sheet.attempt_id.clone().unwrap_or_else(|| {
            format!(
                "{}-{}",
                sheet.student_id,
                chrono::Utc::now().timestamp_millis()
            )
        });

        let attempt = ExamAttempt::from_submission(
            attempt_id,
            &sheet.student_id,
            scores.categories,
            scores.subcategories,
        );
        self.attempts.insert_attempt(&attempt).await?;

        info!(
            "[作答 {}] ✓ 交卷完成，理论平均 {:.2}，等待顾问评审",
            attempt.id,
            attempt.theoretical_average()
        );
        Ok(attempt)
    }

    /// 顾问提交实操分数
    ///
    /// # 返回
    /// 返回最终成绩
    pub async fn submit_review(
        &self,
        attempt_id: &str,
        practical: PracticalScores,
    ) -> AppResult<f64> {
        let mut attempt = self.attempts.get_attempt(attempt_id).await?;

        if attempt.is_completed() {
            warn!("[作答 {}] ⚠️ 记录已完成评审，只读", attempt_id);
            return Err(ScoringError::AlreadyCompleted {
                attempt_id: attempt_id.to_string(),
            }
            .into());
        }

        let final_score = attempt.complete_review(practical)?;
        self.attempts.save_review(&attempt).await.map_err(|e| match e {
            // 并发评审：另一位顾问已先提交
            AppError::Storage(crate::error::StorageError::ConditionFailed { .. }) => {
                AppError::Scoring(ScoringError::AlreadyCompleted {
                    attempt_id: attempt_id.to_string(),
                })
            }
            other => other,
        })?;

        info!("[作答 {}] ✅ 评审完成，最终成绩 {:.3}", attempt_id, final_score);
        Ok(final_score)
    }
}
