//! Evaluator: question generation, answer scoring and summaries.
//!
//! The evaluator is an external collaborator that may be slow or down. The
//! session never waits on it past `timeout`: every call site goes through one
//! of the `*_or_fallback` helpers, which substitute fixed values on failure.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::interview::prompts::{
    EVALUATE_ANSWER_PROMPT, EVALUATOR_JSON_SYSTEM, QUESTION_SET_PROMPT, SUMMARY_PROMPT,
    SUMMARY_SYSTEM,
};
use crate::interview::scoring::MAX_TOTAL_SCORE;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::candidate::CandidateProfile;
use crate::models::interview::{Difficulty, Question, DIFFICULTY_SEQUENCE, QUESTIONS_PER_INTERVIEW};

/// Score recorded when the evaluator cannot be reached or times out.
pub const FALLBACK_SCORE: u8 = 50;
pub const FALLBACK_FEEDBACK: &str = "Unable to evaluate answer due to technical issues.";
/// Score recorded when the evaluator replied with something unparseable.
pub const MALFORMED_FALLBACK_SCORE: u8 = 70;
pub const MALFORMED_FALLBACK_FEEDBACK: &str = "Answer received and evaluated.";

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("malformed evaluator response: {0}")]
    Malformed(String),
}

impl From<LlmError> for EvaluatorError {
    fn from(err: LlmError) -> Self {
        if err.is_malformed() {
            EvaluatorError::Malformed(err.to_string())
        } else {
            EvaluatorError::Unavailable(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub score: u8,
    pub feedback: String,
    /// True when `score` and `feedback` are fallback values.
    pub fallback: bool,
}

/// A generated question set plus whether it is the canonical fallback.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
    pub fallback: bool,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn generate_questions(
        &self,
        profile: &CandidateProfile,
    ) -> Result<Vec<Question>, EvaluatorError>;

    async fn evaluate_answer(
        &self,
        question: &Question,
        answer: &str,
        time_spent_secs: u32,
    ) -> Result<Evaluation, EvaluatorError>;

    async fn generate_summary(
        &self,
        questions: &[Question],
        total_score: u32,
    ) -> Result<String, EvaluatorError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmEvaluator
// ────────────────────────────────────────────────────────────────────────────

/// Question as returned by the model, before shape checks.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "question")]
    pub prompt: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    score: f64,
    feedback: String,
}

pub struct LlmEvaluator {
    llm: LlmClient,
}

impl LlmEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn generate_questions(
        &self,
        profile: &CandidateProfile,
    ) -> Result<Vec<Question>, EvaluatorError> {
        let prompt = QUESTION_SET_PROMPT
            .replace("{name}", profile.name.as_deref().unwrap_or(""))
            .replace("{email}", profile.email.as_deref().unwrap_or(""));
        let generated: Vec<GeneratedQuestion> =
            self.llm.call_json(&prompt, EVALUATOR_JSON_SYSTEM).await?;
        build_question_set(generated)
    }

    async fn evaluate_answer(
        &self,
        question: &Question,
        answer: &str,
        time_spent_secs: u32,
    ) -> Result<Evaluation, EvaluatorError> {
        let prompt = EVALUATE_ANSWER_PROMPT
            .replace("{question}", &question.prompt)
            .replace("{answer}", answer)
            .replace("{time_spent}", &time_spent_secs.to_string())
            .replace("{time_limit}", &question.time_limit_secs.to_string());
        let raw: RawEvaluation = self.llm.call_json(&prompt, EVALUATOR_JSON_SYSTEM).await?;
        if !raw.score.is_finite() {
            return Err(EvaluatorError::Malformed(format!("non-finite score {}", raw.score)));
        }
        Ok(Evaluation {
            score: raw.score.round().clamp(0.0, 100.0) as u8,
            feedback: raw.feedback,
            fallback: false,
        })
    }

    async fn generate_summary(
        &self,
        questions: &[Question],
        total_score: u32,
    ) -> Result<String, EvaluatorError> {
        let transcript = questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                format!(
                    "Q{} ({:?}): {}\nAnswer: {}\nScore: {}/100",
                    i + 1,
                    q.difficulty,
                    q.prompt,
                    q.answer.as_deref().unwrap_or("No answer provided"),
                    q.score.unwrap_or(0)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = SUMMARY_PROMPT
            .replace("{total_score}", &total_score.to_string())
            .replace("{max_score}", &MAX_TOTAL_SCORE.to_string())
            .replace("{transcript}", &transcript);
        Ok(self.llm.call_text(&prompt, SUMMARY_SYSTEM).await?.trim().to_string())
    }
}

/// Evaluator used when no API key is configured. Every call fails, so the
/// session always runs on fallbacks.
pub struct OfflineEvaluator;

#[async_trait]
impl Evaluator for OfflineEvaluator {
    async fn generate_questions(
        &self,
        _profile: &CandidateProfile,
    ) -> Result<Vec<Question>, EvaluatorError> {
        Err(EvaluatorError::Unavailable("no evaluator configured".into()))
    }

    async fn evaluate_answer(
        &self,
        _: &Question,
        _: &str,
        _: u32,
    ) -> Result<Evaluation, EvaluatorError> {
        Err(EvaluatorError::Unavailable("no evaluator configured".into()))
    }

    async fn generate_summary(&self, _: &[Question], _: u32) -> Result<String, EvaluatorError> {
        Err(EvaluatorError::Unavailable("no evaluator configured".into()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shape checks
// ────────────────────────────────────────────────────────────────────────────

/// Turns model output into a question set: exactly six questions in
/// Easy, Easy, Medium, Medium, Hard, Hard order, limits set from difficulty.
pub fn build_question_set(
    generated: Vec<GeneratedQuestion>,
) -> Result<Vec<Question>, EvaluatorError> {
    if generated.len() != QUESTIONS_PER_INTERVIEW {
        return Err(EvaluatorError::Malformed(format!(
            "expected {QUESTIONS_PER_INTERVIEW} questions, got {}",
            generated.len()
        )));
    }
    generated
        .into_iter()
        .zip(DIFFICULTY_SEQUENCE)
        .enumerate()
        .map(|(i, (g, expected))| {
            if g.difficulty != expected {
                return Err(EvaluatorError::Malformed(format!(
                    "question {} is {:?}, expected {:?}",
                    i + 1,
                    g.difficulty,
                    expected
                )));
            }
            if g.prompt.trim().is_empty() {
                return Err(EvaluatorError::Malformed(format!("question {} is empty", i + 1)));
            }
            let id = g
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("q{}", i + 1));
            let mut question = Question::new(id, g.prompt.trim(), expected);
            question.category = g.category;
            Ok(question)
        })
        .collect()
}

/// Re-checks a set from any evaluator and resets limits and result fields.
fn normalize_question_set(questions: Vec<Question>) -> Option<Vec<Question>> {
    if questions.len() != QUESTIONS_PER_INTERVIEW {
        return None;
    }
    questions
        .into_iter()
        .zip(DIFFICULTY_SEQUENCE)
        .map(|(q, expected)| {
            (q.difficulty == expected && !q.prompt.trim().is_empty()).then(|| {
                let mut fresh = Question::new(q.id, q.prompt, expected);
                fresh.category = q.category;
                fresh
            })
        })
        .collect()
}

/// The canonical six questions used whenever generation fails.
pub fn fallback_questions() -> Vec<Question> {
    vec![
        Question::new(
            "q1",
            "What is the difference between useState and useEffect hooks in React?",
            Difficulty::Easy,
        )
        .with_category("React"),
        Question::new(
            "q2",
            "How do you handle asynchronous operations in JavaScript?",
            Difficulty::Easy,
        )
        .with_category("JavaScript"),
        Question::new(
            "q3",
            "Explain the concept of middleware in Express.js and provide an example.",
            Difficulty::Medium,
        )
        .with_category("Node.js"),
        Question::new(
            "q4",
            "How would you implement authentication in a React application?",
            Difficulty::Medium,
        )
        .with_category("React"),
        Question::new(
            "q5",
            "Design a REST API for a blog application. Include endpoints for users, posts, and comments.",
            Difficulty::Hard,
        )
        .with_category("System Design"),
        Question::new(
            "q6",
            "How would you optimize the performance of a React application that handles large datasets?",
            Difficulty::Hard,
        )
        .with_category("Performance"),
    ]
}

pub fn fallback_summary(total_score: u32) -> String {
    format!(
        "Interview completed with a score of {total_score}/{MAX_TOTAL_SCORE}. \
         Unable to generate detailed summary due to technical issues."
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback wrappers
// ────────────────────────────────────────────────────────────────────────────

async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, EvaluatorError>
where
    F: Future<Output = Result<T, EvaluatorError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(EvaluatorError::Unavailable(format!(
            "timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

pub async fn questions_or_fallback(
    evaluator: &dyn Evaluator,
    profile: &CandidateProfile,
    timeout: Duration,
) -> QuestionSet {
    match bounded(timeout, evaluator.generate_questions(profile)).await {
        Ok(questions) => match normalize_question_set(questions) {
            Some(questions) => {
                info!("Generated question set for candidate {}", profile.id);
                QuestionSet {
                    questions,
                    fallback: false,
                }
            }
            None => {
                warn!("Evaluator returned a malformed question set; using fallback questions");
                QuestionSet {
                    questions: fallback_questions(),
                    fallback: true,
                }
            }
        },
        Err(e) => {
            warn!("Question generation failed ({e}); using fallback questions");
            QuestionSet {
                questions: fallback_questions(),
                fallback: true,
            }
        }
    }
}

pub async fn evaluation_or_fallback(
    evaluator: &dyn Evaluator,
    question: &Question,
    answer: &str,
    time_spent_secs: u32,
    timeout: Duration,
) -> Evaluation {
    match bounded(timeout, evaluator.evaluate_answer(question, answer, time_spent_secs)).await {
        Ok(mut evaluation) => {
            evaluation.score = evaluation.score.min(100);
            evaluation
        }
        Err(EvaluatorError::Malformed(reason)) => {
            warn!("Malformed evaluation for question {}: {reason}", question.id);
            Evaluation {
                score: MALFORMED_FALLBACK_SCORE,
                feedback: MALFORMED_FALLBACK_FEEDBACK.to_string(),
                fallback: true,
            }
        }
        Err(e) => {
            warn!("Evaluation failed for question {} ({e}); using fallback score", question.id);
            Evaluation {
                score: FALLBACK_SCORE,
                feedback: FALLBACK_FEEDBACK.to_string(),
                fallback: true,
            }
        }
    }
}

pub async fn summary_or_fallback(
    evaluator: &dyn Evaluator,
    questions: &[Question],
    total_score: u32,
    timeout: Duration,
) -> String {
    match bounded(timeout, evaluator.generate_summary(questions, total_score)).await {
        Ok(summary) if !summary.trim().is_empty() => summary,
        Ok(_) => {
            warn!("Evaluator returned an empty summary; using fallback summary");
            fallback_summary(total_score)
        }
        Err(e) => {
            warn!("Summary generation failed ({e}); using fallback summary");
            fallback_summary(total_score)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct HangingEvaluator;

    #[async_trait]
    impl Evaluator for HangingEvaluator {
        async fn generate_questions(
            &self,
            _: &CandidateProfile,
        ) -> Result<Vec<Question>, EvaluatorError> {
            std::future::pending().await
        }
        async fn evaluate_answer(
            &self,
            _: &Question,
            _: &str,
            _: u32,
        ) -> Result<Evaluation, EvaluatorError> {
            std::future::pending().await
        }
        async fn generate_summary(&self, _: &[Question], _: u32) -> Result<String, EvaluatorError> {
            std::future::pending().await
        }
    }

    struct GarbledEvaluator;

    #[async_trait]
    impl Evaluator for GarbledEvaluator {
        async fn generate_questions(
            &self,
            _: &CandidateProfile,
        ) -> Result<Vec<Question>, EvaluatorError> {
            Ok(vec![Question::new("only", "One question", Difficulty::Hard)])
        }
        async fn evaluate_answer(
            &self,
            _: &Question,
            _: &str,
            _: u32,
        ) -> Result<Evaluation, EvaluatorError> {
            Err(EvaluatorError::Malformed("not json".into()))
        }
        async fn generate_summary(&self, _: &[Question], _: u32) -> Result<String, EvaluatorError> {
            Ok("   ".into())
        }
    }

    fn profile() -> CandidateProfile {
        CandidateProfile::new(Some("Jane".into()), Some("j@x.io".into()), Some("1".into()))
    }

    fn generated(difficulties: &[Difficulty]) -> Vec<GeneratedQuestion> {
        difficulties
            .iter()
            .enumerate()
            .map(|(i, d)| GeneratedQuestion {
                id: (i % 2 == 0).then(|| format!("gen{i}")),
                prompt: format!("  Prompt {i} "),
                difficulty: *d,
                category: None,
            })
            .collect()
    }

    #[test]
    fn test_fallback_questions_have_canonical_shape() {
        let qs = fallback_questions();
        assert_eq!(qs.len(), QUESTIONS_PER_INTERVIEW);
        let limits: Vec<u32> = qs.iter().map(|q| q.time_limit_secs).collect();
        assert_eq!(limits, vec![20, 20, 60, 60, 120, 120]);
        assert!(qs.iter().all(|q| q.answer.is_none() && q.score.is_none()));
    }

    #[test]
    fn test_build_question_set_sets_limits_and_ids() {
        let qs = build_question_set(generated(&DIFFICULTY_SEQUENCE)).unwrap();
        assert_eq!(qs[0].id, "gen0");
        assert_eq!(qs[1].id, "q2");
        assert_eq!(qs[1].prompt, "Prompt 1");
        assert_eq!(qs[5].time_limit_secs, 120);
    }

    #[test]
    fn test_build_question_set_rejects_wrong_order() {
        let mut order = DIFFICULTY_SEQUENCE;
        order.swap(0, 5);
        assert!(matches!(
            build_question_set(generated(&order)),
            Err(EvaluatorError::Malformed(_))
        ));
    }

    #[test]
    fn test_build_question_set_rejects_wrong_count() {
        assert!(build_question_set(generated(&DIFFICULTY_SEQUENCE[..5])).is_err());
    }

    #[test]
    fn test_generated_question_accepts_question_alias() {
        let json = r#"{"id":"q1","question":"What is JSX?","difficulty":"Easy","timeLimit":20}"#;
        let g: GeneratedQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(g.prompt, "What is JSX?");
    }

    #[test]
    fn test_llm_error_classification() {
        let parse_err = serde_json::from_str::<u32>("x").unwrap_err();
        assert!(matches!(
            EvaluatorError::from(LlmError::Parse(parse_err)),
            EvaluatorError::Malformed(_)
        ));
        assert!(matches!(
            EvaluatorError::from(LlmError::RateLimited { retries: 3 }),
            EvaluatorError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_offline_evaluator_uses_fallbacks() {
        let q = fallback_questions().remove(0);
        let eval = evaluation_or_fallback(&OfflineEvaluator, &q, "answer", 10, TIMEOUT).await;
        assert_eq!(eval.score, FALLBACK_SCORE);
        assert_eq!(eval.feedback, FALLBACK_FEEDBACK);
        assert!(eval.fallback);

        let set = questions_or_fallback(&OfflineEvaluator, &profile(), TIMEOUT).await;
        assert!(set.fallback);
        assert_eq!(set.questions, fallback_questions());

        let summary = summary_or_fallback(&OfflineEvaluator, &set.questions, 420, TIMEOUT).await;
        assert_eq!(summary, fallback_summary(420));
        assert!(summary.contains("420/600"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_evaluator_times_out_to_fallback() {
        let q = fallback_questions().remove(3);
        let eval = evaluation_or_fallback(&HangingEvaluator, &q, "answer", 10, TIMEOUT).await;
        assert_eq!(eval.score, FALLBACK_SCORE);

        let set = questions_or_fallback(&HangingEvaluator, &profile(), TIMEOUT).await;
        assert!(set.fallback);

        let summary = summary_or_fallback(&HangingEvaluator, &[], 0, TIMEOUT).await;
        assert_eq!(summary, fallback_summary(0));
    }

    #[tokio::test]
    async fn test_malformed_responses_fall_back() {
        let q = fallback_questions().remove(0);
        let eval = evaluation_or_fallback(&GarbledEvaluator, &q, "answer", 3, TIMEOUT).await;
        assert_eq!(eval.score, MALFORMED_FALLBACK_SCORE);
        assert_eq!(eval.feedback, MALFORMED_FALLBACK_FEEDBACK);

        let set = questions_or_fallback(&GarbledEvaluator, &profile(), TIMEOUT).await;
        assert!(set.fallback);

        let summary = summary_or_fallback(&GarbledEvaluator, &[], 12, TIMEOUT).await;
        assert_eq!(summary, fallback_summary(12));
    }
}
