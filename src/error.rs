use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 上传文件校验错误
    #[error("文件校验失败: {0}")]
    Validation(#[from] ValidationError),
    /// 外部 API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 存储 / 数据库错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 流水线步骤错误
    #[error("流水线错误: {0}")]
    Pipeline(#[from] PipelineError),
    /// 评分错误
    #[error("评分错误: {0}")]
    Scoring(#[from] ScoringError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 上传文件校验错误
///
/// 这些错误直接展示给用户，不会向上抛出
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 扩展名或 MIME 类型不是可识别的文档格式
    #[error("不支持的文件格式: {file_name} ({mime})，仅支持 PDF 文档")]
    UnsupportedFormat { file_name: String, mime: String },
    /// 文件为空
    #[error("文件为空: {file_name}")]
    Empty { file_name: String },
    /// 文件超过大小上限
    #[error("文件过大: {size} 字节，上限为 {limit} 字节")]
    TooLarge { size: u64, limit: u64 },
    /// 文件头与声明的格式不符
    #[error("文件内容与 PDF 格式签名不符: {file_name}")]
    SignatureMismatch { file_name: String },
}

/// 外部 API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, detail={detail}")]
    BadResponse {
        endpoint: String,
        status: u16,
        detail: String,
    },
    /// API 返回内容缺少必要字段
    #[error("API返回内容缺少字段 {field} ({endpoint})")]
    MissingField { endpoint: String, field: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 存储 / 数据库错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 对象写入失败
    #[error("对象写入失败 ({path}): {detail}")]
    WriteFailed { path: String, detail: String },
    /// 记录不存在
    #[error("{table} 中不存在记录: {key}")]
    NotFound { table: String, key: String },
    /// 记录已存在
    #[error("{table} 中记录已存在: {key}")]
    AlreadyExists { table: String, key: String },
    /// 条件更新没有命中任何行
    #[error("{table} 中记录 {key} 不满足更新条件")]
    ConditionFailed { table: String, key: String },
    /// 读取本地文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容不是预期的 JSON
    #[error("无法解析LLM返回的JSON (响应: {response}): {reason}")]
    MalformedResponse { response: String, reason: String },
}

/// 流水线步骤错误
///
/// 每一步的失败只终止当前步骤，不回滚之前成功的步骤
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 任务完成但没有输出位置
    #[error("任务 {operation_id} 已完成但没有输出位置")]
    MissingOutput { operation_id: String },
    /// 任务已经提取过主题
    #[error("任务 {operation_id} 已提取过主题，不会重复执行")]
    AlreadyIngested { operation_id: String },
    /// 任务尚未完成
    #[error("任务 {operation_id} 尚未完成 (状态: {status})")]
    NotCompleted { operation_id: String, status: String },
    /// 主题提取步骤失败
    #[error("主题提取失败 (任务 {operation_id}): {reason}")]
    Ingestion { operation_id: String, reason: String },
    /// 题目生成步骤失败
    #[error("题目生成失败 (任务 {operation_id}): {reason}")]
    Generation { operation_id: String, reason: String },
}

/// 评分错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// 作答记录已完成评审，只读
    #[error("作答记录 {attempt_id} 已完成评审，不能再次修改")]
    AlreadyCompleted { attempt_id: String },
    /// 实操分数超出范围
    #[error("实操分数 {dimension}={value} 超出范围 [0, 100]")]
    ScoreOutOfRange { dimension: String, value: f64 },
    /// 试卷中存在重复题号
    #[error("试卷中存在重复题号: {question_id}")]
    DuplicateQuestion { question_id: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Storage(StorageError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建API错误响应
    pub fn bad_response(
        endpoint: impl Into<String>,
        status: u16,
        detail: impl Into<String>,
    ) -> Self {
        AppError::Api(ApiError::BadResponse {
            endpoint: endpoint.into(),
            status,
            detail: detail.into(),
        })
    }

    /// 创建记录不存在错误
    pub fn not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        AppError::Storage(StorageError::NotFound {
            table: table.into(),
            key: key.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 面向用户的错误详情
    ///
    /// 外部服务返回的原始信息优先，其余错误使用完整描述
    pub fn user_detail(&self) -> String {
        match self {
            AppError::Api(ApiError::BadResponse { detail, .. }) => detail.clone(),
            other => other.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_detail_prefers_raw_service_message() {
        let err = AppError::bad_response("/v1/operations/op-1", 403, "quota exceeded");
        assert_eq!(err.user_detail(), "quota exceeded");
    }

    #[test]
    fn validation_error_converts_into_app_error() {
        let err: AppError = ValidationError::Empty {
            file_name: "a.pdf".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("a.pdf"));
    }
}
