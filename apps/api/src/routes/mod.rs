pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::interview::handlers;
use crate::resume::extractor::MAX_RESUME_BYTES;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const UPLOAD_BODY_LIMIT: usize = MAX_RESUME_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Candidate flow
        .route("/api/v1/interview", get(handlers::handle_get_interview))
        .route("/api/v1/interview/events", get(handlers::handle_timer_events))
        .route(
            "/api/v1/interview/upload",
            post(handlers::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/v1/interview/profile",
            post(handlers::handle_profile_message),
        )
        .route(
            "/api/v1/interview/start",
            post(handlers::handle_start_interview),
        )
        .route("/api/v1/interview/draft", put(handlers::handle_update_draft))
        .route(
            "/api/v1/interview/answer",
            post(handlers::handle_submit_answer),
        )
        .route("/api/v1/interview/pause", post(handlers::handle_pause))
        .route("/api/v1/interview/resume", post(handlers::handle_resume))
        .route("/api/v1/interview/restart", post(handlers::handle_restart))
        // Results review
        .route("/api/v1/results", get(handlers::handle_list_results))
        .route(
            "/api/v1/results/:candidate_id",
            get(handlers::handle_candidate_report),
        )
        .with_state(state)
}
