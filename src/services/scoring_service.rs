//! 评分服务 - 业务能力层
//!
//! 理论部分按类别统计正确率，最终成绩按固定权重合成：
//!
//! ```text
//! final = 0.40 × 理论类别平均 + 0.10 × perfil + 0.50 × 现场应用四项平均
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::error::ScoringError;
use crate::models::attempt::{CategoryScore, PracticalScores};
use crate::models::loaders::SheetQuestion;

pub const THEORY_WEIGHT: f64 = 0.40;
pub const PROFILE_WEIGHT: f64 = 0.10;
pub const FLOOR_APPLICATION_WEIGHT: f64 = 0.50;

/// 理论部分的统计结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TheoreticalScores {
    pub categories: BTreeMap<String, CategoryScore>,
    pub subcategories: BTreeMap<String, CategoryScore>,
}

/// 各类别百分比的平均值，没有类别时为 0
pub fn average_percentage(scores: &BTreeMap<String, CategoryScore>) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.values().map(|s| s.percentage).sum::<f64>() / scores.len() as f64
}

/// 合成最终成绩
pub fn final_score(theoretical_average: f64, practical: &PracticalScores) -> f64 {
    theoretical_average * THEORY_WEIGHT
        + practical.perfil * PROFILE_WEIGHT
        + practical.floor_application_average() * FLOOR_APPLICATION_WEIGHT
}

/// 按类别与子类别统计答题卡
///
/// 未作答的题目计入总数但不计为正确
pub fn grade_answers(questions: &[SheetQuestion]) -> Result<TheoreticalScores, ScoringError> {
    let mut seen = HashSet::new();
    let mut categories: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    let mut subcategories: BTreeMap<String, (u32, u32)> = BTreeMap::new();

    for question in questions {
        if !seen.insert(question.id.as_str()) {
            return Err(ScoringError::DuplicateQuestion {
                question_id: question.id.clone(),
            });
        }

        let correct = question.selected_option == Some(question.correct_option);

        let entry = categories.entry(question.category.clone()).or_default();
        entry.1 += 1;
        if correct {
            entry.0 += 1;
        }

        if let Some(sub) = &question.subcategory {
            let entry = subcategories.entry(sub.clone()).or_default();
            entry.1 += 1;
            if correct {
                entry.0 += 1;
            }
        }
    }

    let to_scores = |map: BTreeMap<String, (u32, u32)>| -> BTreeMap<String, CategoryScore> {
        map.into_iter()
            .map(|(name, (correct, total))| (name, CategoryScore::new(correct, total)))
            .collect()
    };

    Ok(TheoreticalScores {
        categories: to_scores(categories),
        subcategories: to_scores(subcategories),
    })
}
