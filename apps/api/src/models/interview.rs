use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every interview has exactly this many questions.
pub const QUESTIONS_PER_INTERVIEW: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Fixed per-tier answer window in seconds.
    pub fn time_limit_secs(self) -> u32 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }
}

/// Required difficulty for each question slot.
pub const DIFFICULTY_SEQUENCE: [Difficulty; QUESTIONS_PER_INTERVIEW] = [
    Difficulty::Easy,
    Difficulty::Easy,
    Difficulty::Medium,
    Difficulty::Medium,
    Difficulty::Hard,
    Difficulty::Hard,
];

/// A single timed question. The result fields (`answer`, `time_spent_secs`,
/// `score`) are empty until the question is answered or expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub difficulty: Difficulty,
    pub time_limit_secs: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub time_spent_secs: Option<u32>,
    #[serde(default)]
    pub score: Option<u8>,
}

impl Question {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            difficulty,
            time_limit_secs: difficulty.time_limit_secs(),
            category: None,
            answer: None,
            time_spent_secs: None,
            score: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
}

/// One candidate's attempt at the interview; the unit of resumability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub status: SessionStatus,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_score: Option<u32>,
    pub summary: Option<String>,
}

impl InterviewSession {
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::InProgress | SessionStatus::Paused
        )
    }
}

/// A finished session as recorded in the append-only completed log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedInterview {
    pub session_id: Uuid,
    pub candidate_id: Uuid,
    pub questions: Vec<Question>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_score: u32,
    pub summary: String,
}

impl CompletedInterview {
    /// Freezes a session. Returns `None` unless it is completed with its
    /// terminal fields written.
    pub fn from_session(session: &InterviewSession) -> Option<Self> {
        if session.status != SessionStatus::Completed {
            return None;
        }
        Some(Self {
            session_id: session.id,
            candidate_id: session.candidate_id,
            questions: session.questions.clone(),
            start_time: session.start_time,
            end_time: session.end_time?,
            total_score: session.total_score?,
            summary: session.summary.clone()?,
        })
    }
}
