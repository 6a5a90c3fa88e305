//! Results review over the completed log: search, band filter, sorting and
//! the per-candidate score report.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interview::scoring::{
    band_for, build_report, is_pass, percentage, ScoreBand, ScoreReport,
};
use crate::models::candidate::CandidateProfile;
use crate::models::interview::CompletedInterview;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Highest total first.
    #[default]
    Score,
    /// Most recently finished first.
    Date,
    /// Candidate name, A to Z.
    Name,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
    /// Case-insensitive match against candidate name or email.
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    pub band: Option<ScoreBand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub session_id: Uuid,
    pub candidate_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub total_score: u32,
    pub percentage: u32,
    pub band: ScoreBand,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub candidate: CandidateProfile,
    pub session_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub summary: String,
    pub report: ScoreReport,
}

pub fn list_results(
    candidates: &[CandidateProfile],
    completed: &[CompletedInterview],
    query: &ResultsQuery,
) -> Vec<ResultSummary> {
    let by_id: HashMap<Uuid, &CandidateProfile> = candidates.iter().map(|c| (c.id, c)).collect();
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut rows: Vec<ResultSummary> = completed
        .iter()
        .filter_map(|record| {
            let candidate = by_id.get(&record.candidate_id).copied();
            if let Some(needle) = &needle {
                let hit = candidate.is_some_and(|c| {
                    [c.name.as_deref(), c.email.as_deref()]
                        .into_iter()
                        .flatten()
                        .any(|v| v.to_lowercase().contains(needle.as_str()))
                });
                if !hit {
                    return None;
                }
            }
            let band = band_for(record.total_score);
            if query.band.is_some_and(|wanted| wanted != band) {
                return None;
            }
            Some(ResultSummary {
                session_id: record.session_id,
                candidate_id: record.candidate_id,
                name: candidate.and_then(|c| c.name.clone()),
                email: candidate.and_then(|c| c.email.clone()),
                total_score: record.total_score,
                percentage: percentage(record.total_score),
                band,
                passed: is_pass(record.total_score),
                completed_at: record.end_time,
            })
        })
        .collect();

    match query.sort {
        SortKey::Score => rows.sort_by_key(|r| Reverse(r.total_score)),
        SortKey::Date => rows.sort_by_key(|r| Reverse(r.completed_at)),
        SortKey::Name => rows.sort_by(|a, b| {
            let a = a.name.as_deref().unwrap_or("").to_lowercase();
            let b = b.name.as_deref().unwrap_or("").to_lowercase();
            a.cmp(&b)
        }),
    }
    rows
}

/// Report for the candidate's most recent completed interview.
pub fn candidate_report(
    candidate: CandidateProfile,
    completed: &[CompletedInterview],
) -> Option<CandidateReport> {
    let latest = completed
        .iter()
        .filter(|r| r.candidate_id == candidate.id)
        .max_by_key(|r| r.end_time)?;
    Some(CandidateReport {
        session_id: latest.session_id,
        completed_at: latest.end_time,
        summary: latest.summary.clone(),
        report: build_report(&latest.questions),
        candidate,
    })
}
