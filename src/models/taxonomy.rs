//! Anderson & Krathwohl 认知分类
//!
//! 知识类型（4 种）× 认知层级（6 级），用于给每道题打标签。
//! LLM 可能返回英文或西班牙语标签，两者都通过静态表解析。

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 知识类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    Factual,
    Conceptual,
    Procedural,
    Metacognitive,
}

/// 认知层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

static KNOWLEDGE_TYPE_LABELS: phf::Map<&'static str, KnowledgeType> = phf_map! {
    "factual" => KnowledgeType::Factual,
    "conceptual" => KnowledgeType::Conceptual,
    "procedural" => KnowledgeType::Procedural,
    "procedimental" => KnowledgeType::Procedural,
    "metacognitive" => KnowledgeType::Metacognitive,
    "metacognitivo" => KnowledgeType::Metacognitive,
};

static COGNITIVE_LEVEL_LABELS: phf::Map<&'static str, CognitiveLevel> = phf_map! {
    "remember" => CognitiveLevel::Remember,
    "recordar" => CognitiveLevel::Remember,
    "understand" => CognitiveLevel::Understand,
    "entender" => CognitiveLevel::Understand,
    "comprender" => CognitiveLevel::Understand,
    "apply" => CognitiveLevel::Apply,
    "aplicar" => CognitiveLevel::Apply,
    "analyze" => CognitiveLevel::Analyze,
    "analyse" => CognitiveLevel::Analyze,
    "analizar" => CognitiveLevel::Analyze,
    "evaluate" => CognitiveLevel::Evaluate,
    "evaluar" => CognitiveLevel::Evaluate,
    "create" => CognitiveLevel::Create,
    "crear" => CognitiveLevel::Create,
};

impl KnowledgeType {
    pub const ALL: [KnowledgeType; 4] = [
        KnowledgeType::Factual,
        KnowledgeType::Conceptual,
        KnowledgeType::Procedural,
        KnowledgeType::Metacognitive,
    ];

    /// 从标签解析（忽略大小写与首尾空白）
    pub fn from_label(label: &str) -> Option<Self> {
        KNOWLEDGE_TYPE_LABELS
            .get(label.trim().to_lowercase().as_str())
            .copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            KnowledgeType::Factual => "factual",
            KnowledgeType::Conceptual => "conceptual",
            KnowledgeType::Procedural => "procedural",
            KnowledgeType::Metacognitive => "metacognitive",
        }
    }
}

impl CognitiveLevel {
    pub const ALL: [CognitiveLevel; 6] = [
        CognitiveLevel::Remember,
        CognitiveLevel::Understand,
        CognitiveLevel::Apply,
        CognitiveLevel::Analyze,
        CognitiveLevel::Evaluate,
        CognitiveLevel::Create,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        COGNITIVE_LEVEL_LABELS
            .get(label.trim().to_lowercase().as_str())
            .copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            CognitiveLevel::Remember => "remember",
            CognitiveLevel::Understand => "understand",
            CognitiveLevel::Apply => "apply",
            CognitiveLevel::Analyze => "analyze",
            CognitiveLevel::Evaluate => "evaluate",
            CognitiveLevel::Create => "create",
        }
    }
}

impl std::fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::fmt::Display for CognitiveLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_english_and_spanish_labels() {
        assert_eq!(KnowledgeType::from_label("Procedimental"), Some(KnowledgeType::Procedural));
        assert_eq!(KnowledgeType::from_label(" factual "), Some(KnowledgeType::Factual));
        assert_eq!(CognitiveLevel::from_label("Aplicar"), Some(CognitiveLevel::Apply));
        assert_eq!(CognitiveLevel::from_label("analyze"), Some(CognitiveLevel::Analyze));
        assert_eq!(CognitiveLevel::from_label("memorize"), None);
    }

    #[test]
    fn every_variant_round_trips_through_its_name() {
        for kt in KnowledgeType::ALL {
            assert_eq!(KnowledgeType::from_label(kt.name()), Some(kt));
        }
        for level in CognitiveLevel::ALL {
            assert_eq!(CognitiveLevel::from_label(level.name()), Some(level));
        }
    }
}
