//! 任务处理上下文
//!
//! 封装"我正在处理哪个任务、它的输出在哪里"这一信息

use std::fmt::Display;

use crate::models::OperationId;

/// 提取 / 生成流程的上下文
#[derive(Debug, Clone)]
pub struct IngestionCtx {
    /// 外部任务操作标识
    pub operation_id: OperationId,

    /// 原始文档名（仅用于日志显示）
    pub document_name: String,

    /// 轮询到的输出位置，完成时才有
    pub output_location: Option<String>,
}

impl IngestionCtx {
    pub fn new(
        operation_id: OperationId,
        document_name: impl Into<String>,
        output_location: Option<String>,
    ) -> Self {
        Self {
            operation_id,
            document_name: document_name.into(),
            output_location,
        }
    }
}

impl Display for IngestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[任务 {}]", self.operation_id)
    }
}
