use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::services::scoring_service;

/// 单个类别的理论得分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
}

impl CategoryScore {
    pub fn new(correct: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64 * 100.0
        };
        Self {
            correct,
            total,
            percentage,
        }
    }
}

/// 顾问评定的实操分数（每项 0–100）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PracticalScores {
    /// 岗位画像契合度
    pub perfil: f64,
    pub kaizen: f64,
    pub herramientas: f64,
    pub involucramiento: f64,
    pub sostenimiento: f64,
}

impl PracticalScores {
    /// 校验每一项都是 [0, 100] 内的有限数
    pub fn validate(&self) -> Result<(), ScoringError> {
        let dimensions = [
            ("perfil", self.perfil),
            ("kaizen", self.kaizen),
            ("herramientas", self.herramientas),
            ("involucramiento", self.involucramiento),
            ("sostenimiento", self.sostenimiento),
        ];
        for (dimension, value) in dimensions {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ScoringError::ScoreOutOfRange {
                    dimension: dimension.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// 现场应用四项的平均分
    pub fn floor_application_average(&self) -> f64 {
        (self.kaizen + self.herramientas + self.involucramiento + self.sostenimiento) / 4.0
    }
}

/// 作答记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    PendingReview,
    Completed,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::PendingReview => "pending_review",
            AttemptStatus::Completed => "completed",
        }
    }
}

/// 一名学员的一次考试作答
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamAttempt {
    pub id: String,
    pub student_id: String,
    pub category_scores: BTreeMap<String, CategoryScore>,
    #[serde(default)]
    pub subcategory_scores: BTreeMap<String, CategoryScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practical: Option<PracticalScores>,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ExamAttempt {
    /// 学员交卷后创建，等待顾问评审
    pub fn from_submission(
        id: impl Into<String>,
        student_id: impl Into<String>,
        category_scores: BTreeMap<String, CategoryScore>,
        subcategory_scores: BTreeMap<String, CategoryScore>,
    ) -> Self {
        Self {
            id: id.into(),
            student_id: student_id.into(),
            category_scores,
            subcategory_scores,
            practical: None,
            status: AttemptStatus::PendingReview,
            final_score: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    /// 各类别理论得分百分比的平均值
    pub fn theoretical_average(&self) -> f64 {
        scoring_service::average_percentage(&self.category_scores)
    }

    /// pending_review → completed
    ///
    /// 只能发生一次；已完成的记录会被拒绝且保持不变
    pub fn complete_review(&mut self, practical: PracticalScores) -> Result<f64, ScoringError> {
        if self.is_completed() {
            return Err(ScoringError::AlreadyCompleted {
                attempt_id: self.id.clone(),
            });
        }
        practical.validate()?;

        let final_score = scoring_service::final_score(self.theoretical_average(), &practical);
        self.practical = Some(practical);
        self.final_score = Some(final_score);
        self.status = AttemptStatus::Completed;
        self.reviewed_at = Some(Utc::now());
        Ok(final_score)
    }
}
