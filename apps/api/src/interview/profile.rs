//! ProfileCollector: fills the contact fields the resume did not yield, one
//! chat message at a time, before an interview may start.

use std::collections::VecDeque;

use serde::Serialize;

use crate::models::candidate::{CandidateProfile, ProfileField};
use crate::models::interview::QUESTIONS_PER_INTERVIEW;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectorReply {
    /// Ask for the next missing field.
    Prompt { field: ProfileField, message: String },
    /// Every required field is present; waiting for the candidate to start.
    Ready { message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ProfileCollector {
    pending: VecDeque<ProfileField>,
}

impl ProfileCollector {
    /// Computes the missing fields once; later edits to the profile do not
    /// change the queue.
    pub fn for_profile(profile: &CandidateProfile) -> Self {
        Self {
            pending: profile.missing_fields().into(),
        }
    }

    pub fn next_field(&self) -> Option<ProfileField> {
        self.pending.front().copied()
    }

    pub fn pending(&self) -> Vec<ProfileField> {
        self.pending.iter().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// First message shown when the candidate enters the profile stage.
    pub fn opening(&self, profile: &CandidateProfile) -> CollectorReply {
        match self.next_field() {
            Some(first) => {
                let wanted = self
                    .pending
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                CollectorReply::Prompt {
                    field: first,
                    message: format!(
                        "Hello! I've processed your resume, but I need to collect some missing \
                         information before we begin the interview. I need your {wanted}. \
                         Let's start with your {first}:"
                    ),
                }
            }
            None => CollectorReply::Ready {
                message: format!(
                    "Hello {}! I have all your information. {}",
                    profile.display_name(),
                    ready_prompt()
                ),
            },
        }
    }

    /// Fills the head field with `message` and pops it. Blank input re-prompts
    /// for the same field without consuming it.
    pub fn accept(&mut self, profile: &mut CandidateProfile, message: &str) -> CollectorReply {
        let Some(field) = self.next_field() else {
            return CollectorReply::Ready {
                message: ready_prompt(),
            };
        };
        let value = message.trim();
        if value.is_empty() {
            return CollectorReply::Prompt {
                field,
                message: format!("Please enter your {field}:"),
            };
        }

        profile.set_field(field, value.to_string());
        self.pending.pop_front();

        match self.next_field() {
            Some(next) => CollectorReply::Prompt {
                field: next,
                message: format!("Thank you! Now I need your {next}:"),
            },
            None => CollectorReply::Ready {
                message: format!("Perfect! I now have all your information. {}", ready_prompt()),
            },
        }
    }
}

fn ready_prompt() -> String {
    format!(
        "Are you ready to begin the technical interview? This will consist of \
         {QUESTIONS_PER_INTERVIEW} questions with increasing difficulty. \
         Type \"ready\" when you're prepared to start."
    )
}

/// True when a chat message confirms the candidate wants to start.
pub fn is_ready_confirmation(message: &str) -> bool {
    message.to_lowercase().contains("ready")
}
