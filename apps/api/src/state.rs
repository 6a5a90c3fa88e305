use std::sync::Arc;

use crate::config::Config;
use crate::interview::InterviewService;
use crate::persistence::InterviewRepository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The running interview. Cloning shares the same session.
    pub interview: InterviewService,
    /// Candidate registry and completed log. Postgres when DATABASE_URL is set.
    pub repo: Arc<dyn InterviewRepository>,
}
