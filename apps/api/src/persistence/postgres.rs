use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::candidate::{CandidateProfile, CandidateRow};
use crate::models::interview::{CompletedInterview, InterviewSession};
use crate::persistence::InterviewRepository;

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterviewRepository for PgRepository {
    async fn upsert_candidate(&self, profile: &CandidateProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO candidates (id, name, email, phone, resume_file_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                resume_file_name = EXCLUDED.resume_file_name
            "#,
        )
        .bind(profile.id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.resume_file_name)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateProfile>> {
        let row: Option<CandidateRow> = sqlx::query_as("SELECT * FROM candidates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CandidateProfile::from))
    }

    async fn list_candidates(&self) -> Result<Vec<CandidateProfile>> {
        let rows: Vec<CandidateRow> =
            sqlx::query_as("SELECT * FROM candidates ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(CandidateProfile::from).collect())
    }

    async fn save_active_session(&self, session: &InterviewSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO active_sessions (candidate_id, session, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (candidate_id) DO UPDATE
            SET session = EXCLUDED.session, updated_at = NOW()
            "#,
        )
        .bind(session.candidate_id)
        .bind(Json(session))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_active_session(&self) -> Result<Option<InterviewSession>> {
        let session: Option<Json<InterviewSession>> = sqlx::query_scalar(
            "SELECT session FROM active_sessions ORDER BY updated_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(session.map(|s| s.0))
    }

    async fn clear_active_session(&self, candidate_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM active_sessions WHERE candidate_id = $1")
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_completed(&self, record: &CompletedInterview) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO completed_interviews
                (session_id, candidate_id, total_score, record, completed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(record.session_id)
        .bind(record.candidate_id)
        .bind(i32::try_from(record.total_score)?)
        .bind(Json(record))
        .bind(record.end_time)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_completed(&self) -> Result<Vec<CompletedInterview>> {
        let records: Vec<Json<CompletedInterview>> = sqlx::query_scalar(
            "SELECT record FROM completed_interviews ORDER BY completed_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(|r| r.0).collect())
    }
}
