use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::profile::CollectorReply;
use crate::interview::review::{
    candidate_report, list_results, CandidateReport, ResultSummary, ResultsQuery,
};
use crate::interview::service::{InterviewSnapshot, ProfileStep, SubmitOutcome};
use crate::interview::stage::DecisionOutcome;
use crate::resume::extractor::{parse_resume, ExtractedResume, ResumeValidation};
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";

#[derive(Serialize)]
pub struct UploadResponse {
    pub extracted: ExtractedResume,
    pub validation: ResumeValidation,
    pub reply: CollectorReply,
    pub state: InterviewSnapshot,
}

#[derive(Deserialize)]
pub struct ProfileMessageRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ProfileMessageResponse {
    pub step: ProfileStep,
    pub state: InterviewSnapshot,
}

#[derive(Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    pub answer: String,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub outcome: SubmitOutcome,
    pub state: InterviewSnapshot,
}

#[derive(Serialize)]
pub struct TransitionResponse {
    pub applied: bool,
    pub state: InterviewSnapshot,
}

/// GET /api/v1/interview
pub async fn handle_get_interview(State(state): State<AppState>) -> Json<InterviewSnapshot> {
    Json(state.interview.snapshot().await)
}

/// GET /api/v1/interview/events
pub async fn handle_timer_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Timer event client connected");
    let stream = BroadcastStream::new(state.interview.subscribe()).filter_map(|result| async move {
        match result {
            Ok(event) => match Event::default().json_data(&event) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    warn!("Failed to serialize timer event: {e}");
                    None
                }
            },
            Err(e) => {
                // Lagged receivers skip ahead; the next tick carries the current value.
                debug!("Timer event stream lagged: {e:?}");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// POST /api/v1/interview/upload
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        let extracted = parse_resume(data, content_type.as_deref(), file_name.as_deref()).await?;
        let validation = extracted.validate();
        let reply = state
            .interview
            .register_candidate(extracted.clone().into_profile(file_name))
            .await?;
        return Ok(Json(UploadResponse {
            extracted,
            validation,
            reply,
            state: state.interview.snapshot().await,
        }));
    }
    Err(AppError::Validation(format!("Missing '{RESUME_FIELD}' file field")))
}

/// POST /api/v1/interview/profile
pub async fn handle_profile_message(
    State(state): State<AppState>,
    Json(req): Json<ProfileMessageRequest>,
) -> Result<Json<ProfileMessageResponse>, AppError> {
    let step = state.interview.profile_message(&req.message).await?;
    Ok(Json(ProfileMessageResponse {
        step,
        state: state.interview.snapshot().await,
    }))
}

/// POST /api/v1/interview/start
pub async fn handle_start_interview(
    State(state): State<AppState>,
) -> Result<Json<InterviewSnapshot>, AppError> {
    state.interview.start_interview().await?;
    Ok(Json(state.interview.snapshot().await))
}

/// PUT /api/v1/interview/draft
pub async fn handle_update_draft(
    State(state): State<AppState>,
    Json(req): Json<DraftRequest>,
) -> Result<StatusCode, AppError> {
    state.interview.update_draft(req.text).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/interview/answer
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let outcome = state.interview.submit_answer(req.question_index, req.answer).await?;
    Ok(Json(AnswerResponse {
        outcome,
        state: state.interview.snapshot().await,
    }))
}

/// POST /api/v1/interview/pause
pub async fn handle_pause(
    State(state): State<AppState>,
) -> Result<Json<TransitionResponse>, AppError> {
    let applied = state.interview.pause().await?;
    Ok(Json(TransitionResponse {
        applied,
        state: state.interview.snapshot().await,
    }))
}

/// POST /api/v1/interview/resume
pub async fn handle_resume(
    State(state): State<AppState>,
) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = state.interview.resume().await?;
    Ok(Json(TransitionResponse {
        applied: matches!(outcome, DecisionOutcome::Resumed { .. }),
        state: state.interview.snapshot().await,
    }))
}

/// POST /api/v1/interview/restart
pub async fn handle_restart(
    State(state): State<AppState>,
) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = state.interview.restart().await?;
    Ok(Json(TransitionResponse {
        applied: outcome == DecisionOutcome::Restarted,
        state: state.interview.snapshot().await,
    }))
}

/// GET /api/v1/results
pub async fn handle_list_results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<ResultSummary>>, AppError> {
    let candidates = state.repo.list_candidates().await?;
    let completed = state.repo.list_completed().await?;
    Ok(Json(list_results(&candidates, &completed, &query)))
}

/// GET /api/v1/results/:candidate_id
pub async fn handle_candidate_report(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateReport>, AppError> {
    let candidate = state
        .repo
        .get_candidate(candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;
    let completed = state.repo.list_completed().await?;
    let report = candidate_report(candidate, &completed).ok_or_else(|| {
        AppError::NotFound(format!("No completed interview for candidate {candidate_id}"))
    })?;
    Ok(Json(report))
}
