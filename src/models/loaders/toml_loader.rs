use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{AppError, AppResult, StorageError};

/// 学员交卷后的答题卡
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSheet {
    pub student_id: String,
    #[serde(default)]
    pub attempt_id: Option<String>,
    pub questions: Vec<SheetQuestion>,
}

/// 答题卡中的一道题
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetQuestion {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// 正确选项索引
    pub correct_option: usize,
    /// 学员选择的选项索引，未作答时为空
    #[serde(default)]
    pub selected_option: Option<usize>,
}

/// 从 TOML 文件加载答题卡
pub async fn load_exam_sheet(path: &Path) -> AppResult<ExamSheet> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let sheet: ExamSheet = toml::from_str(&content).map_err(|e| {
        AppError::Storage(StorageError::TomlParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    })?;

    tracing::info!(
        "成功加载答题卡: 学员 {}，{} 道题",
        sheet.student_id,
        sheet.questions.len()
    );

    Ok(sheet)
}
