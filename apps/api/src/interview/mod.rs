//! Interview: the session lifecycle: profile collection, timed questions,
//! evaluation with fallbacks, scoring and results review.

pub mod evaluator;
pub mod handlers;
pub mod profile;
pub mod prompts;
pub mod review;
pub mod scoring;
pub mod service;
pub mod session_store;
pub mod stage;
pub mod timer;

pub use service::InterviewService;
