//! StageController: maps candidate and session state to the coarse flow stage.

use serde::{Deserialize, Serialize};

use crate::interview::session_store::{SessionStore, Transition};
use crate::models::candidate::CandidateProfile;
use crate::models::interview::{InterviewSession, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Profile,
    Interview,
    /// A paused session exists; the candidate must choose to resume or restart.
    ResumeDecision,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeChoice {
    Resume,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// Back in the interview at the same question.
    Resumed { question_index: usize },
    /// Session dropped; the flow starts again from upload.
    Restarted,
    /// No paused session was waiting for a decision.
    NotApplicable,
}

/// Resolves the stage by priority: paused, in progress, completed, candidate,
/// nothing. A running session wins over an incomplete profile because profile
/// completion only gates starting a session, not continuing one.
pub fn resolve_stage(
    candidate: Option<&CandidateProfile>,
    session: Option<&InterviewSession>,
) -> Stage {
    match session.map(|s| s.status) {
        Some(SessionStatus::Paused) => Stage::ResumeDecision,
        Some(SessionStatus::InProgress) => Stage::Interview,
        Some(SessionStatus::Completed) => Stage::Completed,
        Some(SessionStatus::NotStarted) | None => match candidate {
            Some(_) => Stage::Profile,
            None => Stage::Upload,
        },
    }
}

/// Applies the candidate's resume-or-restart choice to a paused session.
pub fn apply_resume_choice(store: &mut SessionStore, choice: ResumeChoice) -> DecisionOutcome {
    let Some(session) = store.current() else {
        return DecisionOutcome::NotApplicable;
    };
    if session.status != SessionStatus::Paused {
        return DecisionOutcome::NotApplicable;
    }
    match choice {
        ResumeChoice::Resume => match store.resume() {
            Transition::Applied => DecisionOutcome::Resumed {
                question_index: store.current().map_or(0, |s| s.current_question_index),
            },
            Transition::Ignored => DecisionOutcome::NotApplicable,
        },
        ResumeChoice::Restart => {
            store.clear();
            DecisionOutcome::Restarted
        }
    }
}
