//! Persistence: the candidate registry, the active-session slot and the
//! append-only completed log.
//!
//! `InterviewRepository` is the seam; Postgres in production, memory when no
//! `DATABASE_URL` is configured and in tests.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::candidate::CandidateProfile;
use crate::models::interview::{CompletedInterview, InterviewSession};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait InterviewRepository: Send + Sync {
    /// Inserts or replaces the candidate keyed by `profile.id`.
    async fn upsert_candidate(&self, profile: &CandidateProfile) -> Result<()>;

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateProfile>>;

    async fn list_candidates(&self) -> Result<Vec<CandidateProfile>>;

    /// Stores the session as the candidate's active session, replacing any
    /// earlier one.
    async fn save_active_session(&self, session: &InterviewSession) -> Result<()>;

    /// Most recently saved active session, if any.
    async fn load_active_session(&self) -> Result<Option<InterviewSession>>;

    async fn clear_active_session(&self, candidate_id: Uuid) -> Result<()>;

    /// Appends a finished interview. Appending the same `session_id` twice
    /// keeps the first record and returns `false`.
    async fn append_completed(&self, record: &CompletedInterview) -> Result<bool>;

    /// Completed log, oldest first.
    async fn list_completed(&self) -> Result<Vec<CompletedInterview>>;
}
