//! SessionStore: the authoritative holder of the active `InterviewSession`.
//!
//! Every mutation of the session goes through one of the operations below.
//! Each operation is a single synchronous transition: it either applies in full
//! or is ignored, so callers serialising access behind one lock never observe a
//! partial write.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::interview::{InterviewSession, Question, SessionStatus, QUESTIONS_PER_INTERVIEW};

/// Result of a transition that may be refused because the session is not in a
/// state that accepts it. Refusals are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

impl Transition {
    pub fn is_applied(self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Result of `next_question`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the question at this index.
    Question(usize),
    /// The last question was passed; the session is now completed.
    Finished,
    Ignored,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    current: Option<InterviewSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the store around a session loaded from the repository.
    pub fn restore(session: Option<InterviewSession>) -> Self {
        Self { current: session }
    }

    pub fn current(&self) -> Option<&InterviewSession> {
        self.current.as_ref()
    }

    /// True when `session_id` is the active session and it is still on `index`.
    pub fn is_current(&self, session_id: Uuid, index: usize) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| {
                s.id == session_id && s.current_question_index == index && s.is_active()
            })
    }

    pub fn start_interview(&mut self, candidate_id: Uuid, questions: Vec<Question>) -> Transition {
        if let Some(existing) = &self.current {
            if existing.is_active() && existing.candidate_id != candidate_id {
                warn!(
                    "Refusing to start interview for {candidate_id}: session {} for {} is still {:?}",
                    existing.id, existing.candidate_id, existing.status
                );
                return Transition::Ignored;
            }
        }
        if questions.is_empty() {
            warn!("Refusing to start interview for {candidate_id} with no questions");
            return Transition::Ignored;
        }
        debug_assert_eq!(questions.len(), QUESTIONS_PER_INTERVIEW);

        let session = InterviewSession {
            id: Uuid::new_v4(),
            candidate_id,
            status: SessionStatus::InProgress,
            questions,
            current_question_index: 0,
            start_time: Utc::now(),
            end_time: None,
            total_score: None,
            summary: None,
        };
        info!("Started interview session {} for candidate {candidate_id}", session.id);
        self.current = Some(session);
        Transition::Applied
    }

    /// Writes the result fields onto the current question. A second call for
    /// the same index overwrites the first.
    pub fn submit_answer(
        &mut self,
        answer: String,
        time_spent_secs: u32,
        score: Option<u8>,
    ) -> Transition {
        let Some(session) = self.current.as_mut().filter(|s| s.is_active()) else {
            debug!("submit_answer ignored: no active session");
            return Transition::Ignored;
        };
        let index = session.current_question_index;
        let Some(question) = session.questions.get_mut(index) else {
            debug!("submit_answer ignored: index {index} out of range");
            return Transition::Ignored;
        };
        question.answer = Some(answer);
        question.time_spent_secs = Some(time_spent_secs);
        question.score = score.map(|s| s.min(100));
        debug!(
            "Recorded answer for question {} ({}s, score {:?})",
            index, time_spent_secs, question.score
        );
        Transition::Applied
    }

    pub fn next_question(&mut self) -> Advance {
        let Some(session) = self.current.as_mut().filter(|s| s.is_active()) else {
            debug!("next_question ignored: no active session");
            return Advance::Ignored;
        };
        session.current_question_index += 1;
        if session.current_question_index >= session.questions.len() {
            session.current_question_index = session.questions.len();
            session.status = SessionStatus::Completed;
            session.end_time = Some(Utc::now());
            info!("Interview session {} reached its last question", session.id);
            Advance::Finished
        } else {
            Advance::Question(session.current_question_index)
        }
    }

    /// Terminal write. Returns `true` when this call recorded the final score
    /// and summary; later calls never overwrite them.
    pub fn complete_interview(&mut self, total_score: u32, summary: String) -> bool {
        let Some(session) = self.current.as_mut() else {
            debug!("complete_interview ignored: no session");
            return false;
        };
        if session.status == SessionStatus::NotStarted {
            return false;
        }
        let first_completion = session.total_score.is_none() && session.summary.is_none();

        session.status = SessionStatus::Completed;
        session.end_time.get_or_insert_with(Utc::now);
        session.total_score.get_or_insert(total_score);
        session.summary.get_or_insert(summary);

        if first_completion {
            info!(
                "Interview session {} completed with total score {}",
                session.id, total_score
            );
        }
        first_completion
    }

    pub fn pause(&mut self) -> Transition {
        match self.current.as_mut() {
            Some(s) if s.status == SessionStatus::InProgress => {
                s.status = SessionStatus::Paused;
                info!("Paused interview session {} at question {}", s.id, s.current_question_index);
                Transition::Applied
            }
            _ => Transition::Ignored,
        }
    }

    pub fn resume(&mut self) -> Transition {
        match self.current.as_mut() {
            Some(s) if s.status == SessionStatus::Paused => {
                s.status = SessionStatus::InProgress;
                info!(
                    "Resumed interview session {} at question {}",
                    s.id, s.current_question_index
                );
                Transition::Applied
            }
            _ => Transition::Ignored,
        }
    }

    /// Drops the active session and hands it back to the caller.
    pub fn clear(&mut self) -> Option<InterviewSession> {
        let taken = self.current.take();
        if let Some(s) = &taken {
            info!("Cleared interview session {} ({:?})", s.id, s.status);
        }
        taken
    }
}
