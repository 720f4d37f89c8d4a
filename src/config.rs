use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 托管后端（对象存储 + 数据库）---
    pub backend_url: String,
    pub backend_api_key: String,
    /// 上传文档所在的存储桶
    pub storage_bucket: String,
    // --- 文档 AI 服务 ---
    pub document_ai_base_url: String,
    pub document_ai_api_key: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 流水线参数 ---
    /// 任务状态轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: u64,
    /// 每个任务生成的题目数量
    pub question_batch_size: usize,
    /// 传给题目生成的原文最大字符数
    pub max_context_chars: usize,
    /// 当前操作用户，用于存储路径命名空间
    pub user_id: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            backend_api_key: String::new(),
            storage_bucket: "documents".to_string(),
            document_ai_base_url: "http://localhost:8090".to_string(),
            document_ai_api_key: String::new(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            poll_interval_secs: 20,
            max_upload_bytes: 10 * 1024 * 1024,
            question_batch_size: 20,
            max_context_chars: 30_000,
            user_id: "anonymous".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            backend_url: std::env::var("BACKEND_URL").unwrap_or(default.backend_url),
            backend_api_key: std::env::var("BACKEND_API_KEY").unwrap_or(default.backend_api_key),
            storage_bucket: std::env::var("STORAGE_BUCKET").unwrap_or(default.storage_bucket),
            document_ai_base_url: std::env::var("DOCUMENT_AI_BASE_URL").unwrap_or(default.document_ai_base_url),
            document_ai_api_key: std::env::var("DOCUMENT_AI_API_KEY").unwrap_or(default.document_ai_api_key),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_secs),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_upload_bytes),
            question_batch_size: std::env::var("QUESTION_BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.question_batch_size),
            max_context_chars: std::env::var("MAX_CONTEXT_CHARS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_context_chars),
            user_id: std::env::var("USER_ID").unwrap_or(default.user_id),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 检查访问外部服务所需的凭证是否齐全
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("BACKEND_API_KEY", &self.backend_api_key),
            ("DOCUMENT_AI_API_KEY", &self.document_ai_api_key),
            ("LLM_API_KEY", &self.llm_api_key),
        ];
        for (var_name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EnvVarNotFound {
                    var_name: var_name.to_string(),
                });
            }
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "POLL_INTERVAL_SECS".to_string(),
                value: "0".to_string(),
                expected_type: "正整数".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_observed_flow() {
        let config = Config::default();
        assert_eq!(config.poll_interval_secs, 20);
        assert_eq!(config.question_batch_size, 20);
    }

    #[test]
    fn validate_reports_first_missing_credential() {
        let config = Config {
            backend_api_key: "key".to_string(),
            ..Config::default()
        };
        match config.validate() {
            Err(ConfigError::EnvVarNotFound { var_name }) => assert_eq!(var_name, "DOCUMENT_AI_API_KEY"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
