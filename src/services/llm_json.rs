//! LLM 回复中的 JSON 提取
//!
//! 模型经常把 JSON 包在 ```json 代码块里，或在前后附加说明文字

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult, LlmError};
use crate::utils::logging::truncate_text;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid regex"))
}

/// 取出回复中的 JSON 文本
///
/// 优先使用代码块内容；没有代码块时截取第一个 `{`/`[` 到最后一个 `}`/`]`
pub fn extract_json_block(response: &str) -> &str {
    if let Some(caps) = fence_regex().captures(response) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str().trim();
        }
    }

    let start = response.find(['{', '[']);
    let end = response.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if e >= s => &response[s..=e],
        _ => response.trim(),
    }
}

/// 解析回复中的 JSON
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> AppResult<T> {
    serde_json::from_str(extract_json_block(response)).map_err(|e| {
        AppError::Llm(LlmError::MalformedResponse {
            response: truncate_text(response, 200),
            reason: e.to_string(),
        })
    })
}
