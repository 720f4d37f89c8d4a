use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::OperationId;
use crate::models::taxonomy::{CognitiveLevel, KnowledgeType};

/// 从文档中提取的主题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 草稿题目的审核状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    Approved,
    Rejected,
}

/// AI 生成、等待人工审核的题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftQuestion {
    pub id: String,
    pub job_id: OperationId,
    pub prompt: String,
    pub options: Vec<String>,
    /// 正确选项在 `options` 中的索引
    pub correct_option: usize,
    #[serde(default)]
    pub rationale: String,
    pub knowledge_type: KnowledgeType,
    pub cognitive_level: CognitiveLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl DraftQuestion {
    /// 正确选项文本
    pub fn correct_text(&self) -> Option<&str> {
        self.options.get(self.correct_option).map(String::as_str)
    }
}

impl std::fmt::Display for DraftQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prompt_preview = if self.prompt.chars().count() > 80 {
            self.prompt.chars().take(80).collect::<String>() + "..."
        } else {
            self.prompt.clone()
        };
        write!(
            f,
            "{} [{} / {}]",
            prompt_preview, self.knowledge_type, self.cognitive_level
        )
    }
}
