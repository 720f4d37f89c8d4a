//! HTTP 响应处理辅助函数

use reqwest::Response;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// 检查响应状态码，非 2xx 时提取服务返回的原始错误信息
pub async fn ensure_success(response: Response, endpoint: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::bad_response(
        endpoint,
        status.as_u16(),
        error_detail(&body),
    ))
}

/// 从错误响应体中提取可读信息
///
/// 依次尝试 `error.message`、`message`、`error`（字符串）、`msg`，都没有时返回原文
pub fn error_detail(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        let candidates = [
            json.pointer("/error/message"),
            json.get("message"),
            json.get("error"),
            json.get("msg"),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(text) = candidate.as_str() {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    if trimmed.is_empty() {
        "(空响应)".to_string()
    } else {
        trimmed.to_string()
    }
}
