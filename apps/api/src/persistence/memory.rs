use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::candidate::CandidateProfile;
use crate::models::interview::{CompletedInterview, InterviewSession};
use crate::persistence::InterviewRepository;

#[derive(Default)]
struct Tables {
    candidates: Vec<CandidateProfile>,
    /// (candidate_id, session, save sequence)
    active: HashMap<Uuid, (InterviewSession, u64)>,
    completed: Vec<CompletedInterview>,
    sequence: u64,
}

/// Process-local repository. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InterviewRepository for MemoryRepository {
    async fn upsert_candidate(&self, profile: &CandidateProfile) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.candidates.iter_mut().find(|c| c.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => tables.candidates.push(profile.clone()),
        }
        Ok(())
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateProfile>> {
        let tables = self.tables.read().await;
        Ok(tables.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn list_candidates(&self) -> Result<Vec<CandidateProfile>> {
        Ok(self.tables.read().await.candidates.clone())
    }

    async fn save_active_session(&self, session: &InterviewSession) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.sequence += 1;
        let seq = tables.sequence;
        tables.active.insert(session.candidate_id, (session.clone(), seq));
        Ok(())
    }

    async fn load_active_session(&self) -> Result<Option<InterviewSession>> {
        let tables = self.tables.read().await;
        Ok(tables
            .active
            .values()
            .max_by_key(|(_, seq)| *seq)
            .map(|(session, _)| session.clone()))
    }

    async fn clear_active_session(&self, candidate_id: Uuid) -> Result<()> {
        self.tables.write().await.active.remove(&candidate_id);
        Ok(())
    }

    async fn append_completed(&self, record: &CompletedInterview) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.completed.iter().any(|c| c.session_id == record.session_id) {
            return Ok(false);
        }
        tables.completed.push(record.clone());
        Ok(true)
    }

    async fn list_completed(&self) -> Result<Vec<CompletedInterview>> {
        Ok(self.tables.read().await.completed.clone())
    }
}
