//! ScoreAggregator: totals, pass/fail and performance tier for a set of
//! answered questions. Thresholds are fixed.

use serde::{Deserialize, Serialize};

use crate::models::interview::{Difficulty, Question, QUESTIONS_PER_INTERVIEW};

pub const MAX_QUESTION_SCORE: u32 = 100;
pub const MAX_TOTAL_SCORE: u32 = MAX_QUESTION_SCORE * QUESTIONS_PER_INTERVIEW as u32;
/// 60% of the maximum.
pub const PASS_THRESHOLD: u32 = 360;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

/// Score band used to filter the results listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    /// 80% and above.
    High,
    /// 60% up to 80%.
    Medium,
    /// Below 60%.
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionScore {
    pub id: String,
    pub prompt: String,
    pub difficulty: Difficulty,
    pub answer: Option<String>,
    pub time_spent_secs: Option<u32>,
    pub time_limit_secs: u32,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub total_score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub passed: bool,
    pub tier: PerformanceTier,
    pub questions: Vec<QuestionScore>,
}

/// Sum of question scores, unset scores counting as zero.
pub fn total_score(questions: &[Question]) -> u32 {
    questions
        .iter()
        .map(|q| u32::from(q.score.unwrap_or(0)).min(MAX_QUESTION_SCORE))
        .sum()
}

pub fn is_pass(total_score: u32) -> bool {
    total_score >= PASS_THRESHOLD
}

/// Whole-number percentage of the maximum, rounded half up.
pub fn percentage(total_score: u32) -> u32 {
    let total = total_score.min(MAX_TOTAL_SCORE);
    (total * 100 + MAX_TOTAL_SCORE / 2) / MAX_TOTAL_SCORE
}

pub fn tier_for(percentage: u32) -> PerformanceTier {
    match percentage {
        p if p >= 80 => PerformanceTier::Excellent,
        p if p >= 60 => PerformanceTier::Good,
        p if p >= 40 => PerformanceTier::Average,
        _ => PerformanceTier::NeedsImprovement,
    }
}

/// Band from the unrounded percentage, compared exactly on the raw total.
pub fn band_for(total_score: u32) -> ScoreBand {
    if total_score * 100 >= 80 * MAX_TOTAL_SCORE {
        ScoreBand::High
    } else if total_score * 100 >= 60 * MAX_TOTAL_SCORE {
        ScoreBand::Medium
    } else {
        ScoreBand::Low
    }
}

pub fn build_report(questions: &[Question]) -> ScoreReport {
    let total = total_score(questions);
    let pct = percentage(total);
    ScoreReport {
        total_score: total,
        max_score: MAX_TOTAL_SCORE,
        percentage: pct,
        passed: is_pass(total),
        tier: tier_for(pct),
        questions: questions
            .iter()
            .map(|q| QuestionScore {
                id: q.id.clone(),
                prompt: q.prompt.clone(),
                difficulty: q.difficulty,
                answer: q.answer.clone(),
                time_spent_secs: q.time_spent_secs,
                time_limit_secs: q.time_limit_secs,
                score: u32::from(q.score.unwrap_or(0)),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::DIFFICULTY_SEQUENCE;

    fn scored(scores: [Option<u8>; 6]) -> Vec<Question> {
        DIFFICULTY_SEQUENCE
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(i, (d, s))| {
                let mut q = Question::new(format!("q{i}"), "p", *d);
                q.score = s;
                q
            })
            .collect()
    }

    #[test]
    fn test_total_treats_unset_as_zero() {
        let qs = scored([Some(50), None, Some(70), None, Some(100), Some(0)]);
        assert_eq!(total_score(&qs), 220);
    }

    #[test]
    fn test_total_bounds() {
        assert_eq!(total_score(&scored([None; 6])), 0);
        assert_eq!(total_score(&scored([Some(100); 6])), MAX_TOTAL_SCORE);
        assert_eq!(MAX_TOTAL_SCORE, 600);
    }

    #[test]
    fn test_pass_threshold_boundary() {
        assert!(!is_pass(359));
        assert!(is_pass(360));
        assert!(is_pass(600));
    }

    #[test]
    fn test_percentage_rounds() {
        assert_eq!(percentage(0), 0);
        assert_eq!(percentage(360), 60);
        assert_eq!(percentage(600), 100);
        // 217/600 = 36.17%
        assert_eq!(percentage(217), 36);
        // 3/600 = 0.5% rounds up
        assert_eq!(percentage(3), 1);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(tier_for(80), PerformanceTier::Excellent);
        assert_eq!(tier_for(79), PerformanceTier::Good);
        assert_eq!(tier_for(60), PerformanceTier::Good);
        assert_eq!(tier_for(40), PerformanceTier::Average);
        assert_eq!(tier_for(39), PerformanceTier::NeedsImprovement);
    }

    #[test]
    fn test_bands_use_raw_total() {
        assert_eq!(band_for(480), ScoreBand::High);
        assert_eq!(band_for(479), ScoreBand::Medium);
        assert_eq!(band_for(360), ScoreBand::Medium);
        assert_eq!(band_for(359), ScoreBand::Low);
    }

    #[test]
    fn test_report() {
        let report =
            build_report(&scored([Some(90), Some(80), Some(70), Some(60), Some(50), Some(40)]));
        assert_eq!(report.total_score, 390);
        assert_eq!(report.percentage, 65);
        assert!(report.passed);
        assert_eq!(report.tier, PerformanceTier::Good);
        assert_eq!(report.questions.len(), 6);
        assert_eq!(report.questions[0].score, 90);
    }
}
