//! 主题提取服务 - 业务能力层
//!
//! 只负责"从原文得到主题列表"，不关心任务状态和持久化

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::clients::LlmClient;
use crate::error::AppResult;
use crate::models::Topic;
use crate::services::llm_json::parse_json_response;

/// 主题提取能力
#[async_trait]
pub trait TopicExtractor: Send + Sync {
    async fn extract_topics(&self, text: &str) -> AppResult<Vec<Topic>>;
}

/// 基于 LLM 的主题提取
pub struct LlmTopicExtractor {
    llm: LlmClient,
    max_chars: usize,
}

impl LlmTopicExtractor {
    pub fn new(llm: LlmClient, max_chars: usize) -> Self {
        Self { llm, max_chars }
    }

    fn build_messages(&self, text: &str) -> (String, &'static str) {
        let system_message = "Eres un experto en manufactura Lean. Extraes los temas principales \
                              de material de capacitación y respondes solo con JSON.";
        let excerpt: String = text.chars().take(self.max_chars).collect();
        let user_message = format!(
            r#"Lee el siguiente material de capacitación y extrae entre 3 y 12 temas principales.

Responde únicamente con JSON con esta forma:
{{"topics": [{{"name": "nombre corto", "description": "una frase"}}]}}

Material:
{}"#,
            excerpt
        );
        (user_message, system_message)
    }
}

#[async_trait]
impl TopicExtractor for LlmTopicExtractor {
    async fn extract_topics(&self, text: &str) -> AppResult<Vec<Topic>> {
        let (user_message, system_message) = self.build_messages(text);
        let response = self.llm.chat(&user_message, Some(system_message), 2048).await?;
        let topics = parse_topics(&response)?;
        debug!("提取到 {} 个主题", topics.len());
        Ok(topics)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TopicsPayload {
    Wrapped { topics: Vec<Topic> },
    Bare(Vec<Topic>),
}

/// 解析主题列表：去掉空名称，按名称（忽略大小写）去重
pub fn parse_topics(response: &str) -> AppResult<Vec<Topic>> {
    let payload: TopicsPayload = parse_json_response(response)?;
    let raw = match payload {
        TopicsPayload::Wrapped { topics } => topics,
        TopicsPayload::Bare(topics) => topics,
    };

    let mut seen = HashSet::new();
    let topics = raw
        .into_iter()
        .map(|t| Topic {
            name: t.name.trim().to_string(),
            description: t.description.trim().to_string(),
        })
        .filter(|t| !t.name.is_empty())
        .filter(|t| seen.insert(t.name.to_lowercase()))
        .collect();

    Ok(topics)
}
