//! 能力矩阵 - 业务能力层
//!
//! 按知识类型 × 认知层级对题目计数（4 × 6），附带行列合计

use std::collections::BTreeMap;
use std::fmt;

use crate::models::{CognitiveLevel, DraftQuestion, KnowledgeType, ReviewStatus};

/// 能力矩阵
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetencyMatrix {
    cells: BTreeMap<(KnowledgeType, CognitiveLevel), usize>,
}

impl CompetencyMatrix {
    /// 统计题目，已驳回的题目不计入
    pub fn from_questions<'a>(questions: impl IntoIterator<Item = &'a DraftQuestion>) -> Self {
        let mut matrix = Self::default();
        for q in questions {
            if q.review_status == ReviewStatus::Rejected {
                continue;
            }
            *matrix
                .cells
                .entry((q.knowledge_type, q.cognitive_level))
                .or_default() += 1;
        }
        matrix
    }

    pub fn count(&self, knowledge_type: KnowledgeType, level: CognitiveLevel) -> usize {
        self.cells.get(&(knowledge_type, level)).copied().unwrap_or(0)
    }

    pub fn row_total(&self, knowledge_type: KnowledgeType) -> usize {
        CognitiveLevel::ALL
            .iter()
            .map(|level| self.count(knowledge_type, *level))
            .sum()
    }

    pub fn column_total(&self, level: CognitiveLevel) -> usize {
        KnowledgeType::ALL
            .iter()
            .map(|kt| self.count(*kt, level))
            .sum()
    }

    pub fn total(&self) -> usize {
        self.cells.values().sum()
    }

    /// 没有任何题目的格子
    pub fn gaps(&self) -> Vec<(KnowledgeType, CognitiveLevel)> {
        KnowledgeType::ALL
            .iter()
            .flat_map(|kt| CognitiveLevel::ALL.iter().map(move |level| (*kt, *level)))
            .filter(|(kt, level)| self.count(*kt, *level) == 0)
            .collect()
    }
}

impl fmt::Display for CompetencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<14}", "")?;
        for level in CognitiveLevel::ALL {
            write!(f, "{:>11}", level.name())?;
        }
        writeln!(f, "{:>8}", "total")?;

        for kt in KnowledgeType::ALL {
            write!(f, "{:<14}", kt.name())?;
            for level in CognitiveLevel::ALL {
                write!(f, "{:>11}", self.count(kt, level))?;
            }
            writeln!(f, "{:>8}", self.row_total(kt))?;
        }

        write!(f, "{:<14}", "total")?;
        for level in CognitiveLevel::ALL {
            write!(f, "{:>11}", self.column_total(level))?;
        }
        writeln!(f, "{:>8}", self.total())
    }
}
