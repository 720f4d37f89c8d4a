//! 题目生成服务 - 业务能力层
//!
//! 根据主题和原文生成一批草稿题目，每题带有知识类型 × 认知层级标签

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::clients::LlmClient;
use crate::error::AppResult;
use crate::models::{CognitiveLevel, DraftQuestion, KnowledgeType, OperationId, ReviewStatus, Topic};
use crate::services::llm_json::parse_json_response;

/// 模型返回的原始题目
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: CorrectOption,
    #[serde(default)]
    pub rationale: String,
    pub knowledge_type: String,
    pub cognitive_level: String,
    #[serde(default)]
    pub topic: Option<String>,
}

/// 正确答案可能以索引、字母或选项原文给出
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CorrectOption {
    Index(usize),
    Label(String),
}

/// 题目生成能力
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        topics: &[Topic],
        context: &str,
        count: usize,
    ) -> AppResult<Vec<GeneratedQuestion>>;
}

/// 基于 LLM 的题目生成
pub struct LlmQuestionGenerator {
    llm: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    fn build_messages(
        &self,
        topics: &[Topic],
        context: &str,
        count: usize,
    ) -> (String, &'static str) {
        let system_message = "Eres un diseñador de exámenes de competencias Lean. \
                              Clasificas cada pregunta según la taxonomía de Anderson y Krathwohl \
                              y respondes solo con JSON.";

        let topic_list = topics
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n");

        let user_message = format!(
            r#"Genera exactamente {count} preguntas de opción múltiple sobre los temas indicados.

Temas:
{topic_list}

Para cada pregunta incluye:
- "prompt": enunciado
- "options": entre 3 y 5 opciones
- "correct_option": índice (desde 0) de la opción correcta
- "rationale": justificación breve
- "knowledge_type": factual | conceptual | procedural | metacognitive
- "cognitive_level": remember | understand | apply | analyze | evaluate | create
- "topic": nombre del tema

Responde únicamente con JSON: {{"questions": [ ... ]}}

Material de referencia:
{context}"#
        );
        (user_message, system_message)
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(
        &self,
        topics: &[Topic],
        context: &str,
        count: usize,
    ) -> AppResult<Vec<GeneratedQuestion>> {
        let (user_message, system_message) = self.build_messages(topics, context, count);
        let response = self.llm.chat(&user_message, Some(system_message), 8192).await?;
        let questions = parse_questions(&response)?;
        debug!("模型返回 {} 道题目", questions.len());
        Ok(questions)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsPayload {
    Wrapped { questions: Vec<GeneratedQuestion> },
    Bare(Vec<GeneratedQuestion>),
}

/// 解析模型返回的题目列表
pub fn parse_questions(response: &str) -> AppResult<Vec<GeneratedQuestion>> {
    let payload: QuestionsPayload = parse_json_response(response)?;
    Ok(match payload {
        QuestionsPayload::Wrapped { questions } => questions,
        QuestionsPayload::Bare(questions) => questions,
    })
}

impl GeneratedQuestion {
    /// 解析正确选项的索引
    fn resolve_correct_index(&self) -> Option<usize> {
        match &self.correct_option {
            CorrectOption::Index(i) => Some(*i),
            CorrectOption::Label(label) => {
                let label = label.trim();
                // 单个字母：A / b / C) ...
                let letter = label.trim_end_matches([')', '.', ':']);
                if letter.chars().count() == 1 {
                    if let Some(c) = letter.chars().next().filter(|c| c.is_ascii_alphabetic()) {
                        return Some((c.to_ascii_uppercase() as u8 - b'A') as usize);
                    }
                }
                if let Ok(i) = label.parse::<usize>() {
                    return Some(i);
                }
                self.options
                    .iter()
                    .position(|o| o.trim().eq_ignore_ascii_case(label))
            }
        }
    }

    /// 校验并转换为草稿题目
    ///
    /// 返回 `Err(原因)` 时该题应被丢弃
    pub fn into_draft(self, job_id: &OperationId, index: usize) -> Result<DraftQuestion, String> {
        if self.prompt.trim().is_empty() {
            return Err("题干为空".to_string());
        }
        let options: Vec<String> = self
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(format!("选项不足: {} 个", options.len()));
        }

        // 索引相对于原始选项；去掉空白选项后需要重新映射
        let raw_index = self
            .resolve_correct_index()
            .filter(|i| *i < self.options.len())
            .ok_or_else(|| format!("正确选项无效: {:?}", self.correct_option))?;
        if self.options[raw_index].trim().is_empty() {
            return Err(format!("正确选项为空白: {:?}", self.correct_option));
        }
        let correct_option = self.options[..raw_index]
            .iter()
            .filter(|o| !o.trim().is_empty())
            .count();
        let knowledge_type = KnowledgeType::from_label(&self.knowledge_type)
            .ok_or_else(|| format!("未知的知识类型: {}", self.knowledge_type))?;
        let cognitive_level = CognitiveLevel::from_label(&self.cognitive_level)
            .ok_or_else(|| format!("未知的认知层级: {}", self.cognitive_level))?;

        Ok(DraftQuestion {
            id: format!("{}-q{:02}", job_id, index + 1),
            job_id: job_id.clone(),
            prompt: self.prompt.trim().to_string(),
            options,
            correct_option,
            rationale: self.rationale.trim().to_string(),
            knowledge_type,
            cognitive_level,
            topic: self.topic.filter(|t| !t.trim().is_empty()),
            review_status: ReviewStatus::Draft,
            created_at: Utc::now(),
        })
    }
}
