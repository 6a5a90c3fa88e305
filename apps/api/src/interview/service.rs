//! InterviewService: the single owner of the running interview.
//!
//! HTTP handlers and the timer ticker both go through this service, and every
//! write happens while holding `Inner::runtime`. Evaluator calls are made with
//! the lock released; their results are applied only if the session is still
//! on the question they were made for.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::evaluator::{
    evaluation_or_fallback, questions_or_fallback, summary_or_fallback, Evaluator,
};
use crate::interview::profile::{is_ready_confirmation, CollectorReply, ProfileCollector};
use crate::interview::scoring;
use crate::interview::session_store::{Advance, SessionStore, Transition};
use crate::interview::stage::{
    apply_resume_choice, resolve_stage, DecisionOutcome, ResumeChoice, Stage,
};
use crate::interview::timer::{TickOutcome, TimerEngine, TimerEvent, TimerState, TimerToken};
use crate::models::candidate::{CandidateProfile, ProfileField};
use crate::models::interview::{CompletedInterview, InterviewSession, SessionStatus};
use crate::persistence::InterviewRepository;

/// Answer recorded when a question times out with an empty draft.
pub const TIME_EXPIRED_ANSWER: &str = "No answer provided (time expired)";
const EVENT_CAPACITY: usize = 64;

struct Runtime {
    candidate: Option<CandidateProfile>,
    collector: ProfileCollector,
    store: SessionStore,
    timer: TimerEngine,
    draft: String,
    /// (session, index) of a manual answer currently out for evaluation.
    claimed: Option<(Uuid, usize)>,
}

struct Inner {
    runtime: Mutex<Runtime>,
    repo: Arc<dyn InterviewRepository>,
    evaluator: Arc<dyn Evaluator>,
    evaluator_timeout: Duration,
    events: broadcast::Sender<TimerEvent>,
}

#[derive(Clone)]
pub struct InterviewService {
    inner: Arc<Inner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewSnapshot {
    pub stage: Stage,
    pub candidate: Option<CandidateProfile>,
    pub pending_fields: Vec<ProfileField>,
    pub session: Option<InterviewSession>,
    pub timer: TimerState,
    pub draft: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileStep {
    Reply { reply: CollectorReply },
    Started { session: InterviewSession },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted {
        question_index: usize,
        score: u8,
        feedback: String,
        fallback: bool,
        finished: bool,
    },
    /// The answer targeted a question that is no longer current.
    Stale { current_index: Option<usize> },
}

impl InterviewService {
    pub fn new(
        repo: Arc<dyn InterviewRepository>,
        evaluator: Arc<dyn Evaluator>,
        evaluator_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let runtime = Runtime {
            candidate: None,
            collector: ProfileCollector::default(),
            store: SessionStore::new(),
            timer: TimerEngine::new(events.clone()),
            draft: String::new(),
            claimed: None,
        };
        Self {
            inner: Arc::new(Inner {
                runtime: Mutex::new(runtime),
                repo,
                evaluator,
                evaluator_timeout,
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.inner.events.subscribe()
    }

    /// Reloads the most recent active session. An in-progress session gets a
    /// fresh countdown at the full limit of its current question.
    pub async fn restore(&self) -> anyhow::Result<()> {
        let Some(session) = self.inner.repo.load_active_session().await? else {
            info!("No active interview session to restore");
            return Ok(());
        };
        let candidate = self.inner.repo.get_candidate(session.candidate_id).await?;
        if candidate.is_none() {
            warn!(
                "Restored session {} references unknown candidate {}",
                session.id, session.candidate_id
            );
        }
        let completed = session.status == SessionStatus::Completed;
        info!(
            "Restoring interview session {} ({:?}, question {})",
            session.id, session.status, session.current_question_index
        );
        {
            let mut rt = self.inner.runtime.lock().await;
            rt.collector = candidate
                .as_ref()
                .map(ProfileCollector::for_profile)
                .unwrap_or_default();
            rt.candidate = candidate;
            rt.store = SessionStore::restore(Some(session));
            rt.draft.clear();
            rt.claimed = None;
            self.arm_timer(&mut rt);
        }
        if completed {
            self.finalize().await?;
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> InterviewSnapshot {
        let rt = self.inner.runtime.lock().await;
        snapshot_of(&rt)
    }

    /// Makes `profile` the current candidate and opens profile collection.
    /// Refused while another interview is still active.
    pub async fn register_candidate(
        &self,
        profile: CandidateProfile,
    ) -> Result<CollectorReply, AppError> {
        let mut rt = self.inner.runtime.lock().await;
        if let Some(session) = rt.store.current() {
            if session.is_active() {
                return Err(AppError::Conflict(
                    "An interview is still in progress; finish or restart it first".into(),
                ));
            }
            let finished_candidate = session.candidate_id;
            rt.store.clear();
            self.inner.repo.clear_active_session(finished_candidate).await?;
        }

        self.inner.repo.upsert_candidate(&profile).await?;
        let collector = ProfileCollector::for_profile(&profile);
        let reply = collector.opening(&profile);
        info!(
            "Registered candidate {} (missing: {:?})",
            profile.id,
            collector.pending()
        );
        rt.collector = collector;
        rt.candidate = Some(profile);
        rt.draft.clear();
        Ok(reply)
    }

    /// Handles one chat message during profile collection. Once every field
    /// is present, a message containing "ready" starts the interview.
    pub async fn profile_message(&self, message: &str) -> Result<ProfileStep, AppError> {
        {
            let mut rt = self.inner.runtime.lock().await;
            ensure_no_session(&rt)?;
            let rt = &mut *rt;
            let candidate = rt
                .candidate
                .as_mut()
                .ok_or_else(|| AppError::Validation("Upload a resume before continuing".into()))?;

            if !rt.collector.is_complete() {
                let reply = rt.collector.accept(candidate, message);
                self.inner.repo.upsert_candidate(candidate).await?;
                return Ok(ProfileStep::Reply { reply });
            }
            if !is_ready_confirmation(message) {
                let reply = rt.collector.accept(candidate, message);
                return Ok(ProfileStep::Reply { reply });
            }
        }
        let session = self.start_interview().await?;
        Ok(ProfileStep::Started { session })
    }

    /// Generates the question set and starts the session for the current
    /// candidate. Falls back to the canonical questions if generation fails.
    pub async fn start_interview(&self) -> Result<InterviewSession, AppError> {
        let profile = {
            let rt = self.inner.runtime.lock().await;
            ensure_no_session(&rt)?;
            let candidate = rt
                .candidate
                .clone()
                .ok_or_else(|| AppError::Validation("Upload a resume before starting".into()))?;
            let missing = candidate.missing_fields();
            if !missing.is_empty() {
                let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
                return Err(AppError::Validation(format!(
                    "Profile incomplete, missing: {}",
                    names.join(", ")
                )));
            }
            candidate
        };

        let set = questions_or_fallback(
            self.inner.evaluator.as_ref(),
            &profile,
            self.inner.evaluator_timeout,
        )
        .await;

        let mut rt = self.inner.runtime.lock().await;
        if rt.candidate.as_ref().map(|c| c.id) != Some(profile.id) {
            return Err(AppError::Conflict("Candidate changed while preparing questions".into()));
        }
        ensure_no_session(&rt)?;
        if rt.store.start_interview(profile.id, set.questions) != Transition::Applied {
            return Err(AppError::Conflict("Interview could not be started".into()));
        }
        rt.draft.clear();
        rt.claimed = None;
        let session = rt
            .store
            .current()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("session missing right after start"))?;
        self.arm_timer(&mut rt);
        self.persist_current(&rt, "start").await;
        info!(
            "Interview {} started for {} ({} questions{})",
            session.id,
            profile.display_name(),
            session.question_count(),
            if set.fallback { ", fallback set" } else { "" }
        );
        Ok(session)
    }

    /// Stores the in-progress answer text that timer expiry submits.
    pub async fn update_draft(&self, text: String) -> Result<(), AppError> {
        let mut rt = self.inner.runtime.lock().await;
        if !rt.store.current().is_some_and(|s| s.status == SessionStatus::InProgress) {
            return Err(AppError::Conflict("No interview in progress".into()));
        }
        rt.draft = text;
        Ok(())
    }

    /// Manual answer for `expected_index`. The countdown stops immediately;
    /// the answer is recorded once evaluated, unless expiry or a restart moved
    /// the session on in the meantime.
    pub async fn submit_answer(
        &self,
        expected_index: usize,
        answer: String,
    ) -> Result<SubmitOutcome, AppError> {
        let (session_id, question, elapsed) = {
            let mut rt = self.inner.runtime.lock().await;
            let Some(session) = rt.store.current() else {
                return Err(AppError::Conflict("No interview in progress".into()));
            };
            if session.status != SessionStatus::InProgress {
                return Err(AppError::Conflict(format!(
                    "Interview is {:?}; answers are not accepted",
                    session.status
                )));
            }
            let session_id = session.id;
            let index = session.current_question_index;
            if index != expected_index || rt.claimed == Some((session_id, index)) {
                debug!("Ignoring answer for question {expected_index}; current is {index}");
                return Ok(SubmitOutcome::Stale {
                    current_index: Some(index),
                });
            }
            let question = session
                .current_question()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("question {index} out of range"))?;
            rt.timer.cancel();
            let elapsed = rt.timer.elapsed_secs().min(question.time_limit_secs);
            rt.claimed = Some((session_id, index));
            (session_id, question, elapsed)
        };

        let evaluation = evaluation_or_fallback(
            self.inner.evaluator.as_ref(),
            &question,
            &answer,
            elapsed,
            self.inner.evaluator_timeout,
        )
        .await;

        let finished = {
            let mut rt = self.inner.runtime.lock().await;
            if rt.claimed == Some((session_id, expected_index)) {
                rt.claimed = None;
            }
            if !rt.store.is_current(session_id, expected_index) {
                debug!("Question {expected_index} moved on during evaluation; dropping answer");
                return Ok(SubmitOutcome::Stale {
                    current_index: rt.store.current().map(|s| s.current_question_index),
                });
            }
            rt.store.submit_answer(answer, elapsed, Some(evaluation.score));
            rt.draft.clear();
            let advance = rt.store.next_question();
            self.arm_timer(&mut rt);
            self.persist_current(&rt, "answer").await;
            info!(
                "Question {expected_index} answered in {elapsed}s, score {}{}",
                evaluation.score,
                if evaluation.fallback { " (fallback)" } else { "" }
            );
            advance == Advance::Finished
        };

        if finished {
            if let Err(e) = self.finalize().await {
                error!("Failed to finalize interview after answer: {e:?}");
            }
        }
        Ok(SubmitOutcome::Accepted {
            question_index: expected_index,
            score: evaluation.score,
            feedback: evaluation.feedback,
            fallback: evaluation.fallback,
            finished,
        })
    }

    pub async fn pause(&self) -> Result<bool, AppError> {
        let mut rt = self.inner.runtime.lock().await;
        if !rt.store.pause().is_applied() {
            return Ok(false);
        }
        rt.timer.cancel();
        self.persist_current(&rt, "pause").await;
        Ok(true)
    }

    /// Leaves the resume decision by continuing at the same question with a
    /// full countdown.
    pub async fn resume(&self) -> Result<DecisionOutcome, AppError> {
        let mut rt = self.inner.runtime.lock().await;
        let outcome = apply_resume_choice(&mut rt.store, ResumeChoice::Resume);
        if matches!(outcome, DecisionOutcome::Resumed { .. }) {
            self.arm_timer(&mut rt);
            self.persist_current(&rt, "resume").await;
        }
        Ok(outcome)
    }

    /// Leaves the resume decision by dropping the paused session and the
    /// candidate; the flow returns to upload.
    pub async fn restart(&self) -> Result<DecisionOutcome, AppError> {
        let mut rt = self.inner.runtime.lock().await;
        let candidate_id = rt.store.current().map(|s| s.candidate_id);
        let outcome = apply_resume_choice(&mut rt.store, ResumeChoice::Restart);
        if outcome == DecisionOutcome::Restarted {
            rt.timer.cancel();
            rt.candidate = None;
            rt.collector = ProfileCollector::default();
            rt.draft.clear();
            rt.claimed = None;
            if let Some(candidate_id) = candidate_id {
                self.inner.repo.clear_active_session(candidate_id).await?;
            }
        }
        Ok(outcome)
    }

    /// Starts the countdown for the current question if the session is in
    /// progress. Must be called with the runtime lock held.
    fn arm_timer(&self, rt: &mut Runtime) {
        let Some(session) = rt
            .store
            .current()
            .filter(|s| s.status == SessionStatus::InProgress)
        else {
            rt.timer.cancel();
            return;
        };
        let Some(question) = session.current_question() else {
            rt.timer.cancel();
            return;
        };
        let (session_id, index, limit) =
            (session.id, session.current_question_index, question.time_limit_secs);

        let token = rt.timer.activate(session_id, index, limit);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        rt.timer.spawn_ticker(token, move |token| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => InterviewService { inner }.on_tick(token).await,
                    None => false,
                }
            }
        });
    }

    /// Saves the current session once a transition has been applied. A failed
    /// save is logged; the in-memory session and its countdown stay
    /// authoritative and the next successful save catches the store up.
    async fn persist_current(&self, rt: &Runtime, after: &str) {
        let Some(session) = rt.store.current() else {
            return;
        };
        if let Err(e) = self.inner.repo.save_active_session(session).await {
            error!("Failed to persist session {} after {after}: {e:?}", session.id);
        }
    }

    /// One second of countdown. On expiry the draft is recorded with score 0
    /// and the session advances; nothing is sent to the evaluator.
    async fn on_tick(&self, token: TimerToken) -> bool {
        let finished = {
            let mut rt = self.inner.runtime.lock().await;
            let elapsed_secs = match rt.timer.tick(&token) {
                TickOutcome::Ticked { .. } => return true,
                TickOutcome::Stale => return false,
                TickOutcome::Expired { elapsed_secs } => elapsed_secs,
            };
            if !rt.store.is_current(token.session_id, token.question_index) {
                debug!("Expiry for question {} no longer current", token.question_index);
                return false;
            }

            let draft = std::mem::take(&mut rt.draft);
            let answer = if draft.trim().is_empty() {
                TIME_EXPIRED_ANSWER.to_string()
            } else {
                draft
            };
            rt.store.submit_answer(answer, elapsed_secs, Some(0));
            let advance = rt.store.next_question();
            info!("Question {} timed out after {elapsed_secs}s", token.question_index);

            self.arm_timer(&mut rt);
            self.persist_current(&rt, "expiry").await;
            advance == Advance::Finished
        };

        if finished {
            if let Err(e) = self.finalize().await {
                error!("Failed to finalize interview after expiry: {e:?}");
            }
        }
        false
    }

    /// Writes total score and summary onto a completed session and appends it
    /// to the completed log. Safe to call more than once.
    pub async fn finalize(&self) -> anyhow::Result<()> {
        let session = {
            let mut rt = self.inner.runtime.lock().await;
            rt.timer.cancel();
            match rt.store.current() {
                Some(s) if s.status == SessionStatus::Completed => s.clone(),
                _ => return Ok(()),
            }
        };

        let pending_summary = if session.total_score.is_some() && session.summary.is_some() {
            None
        } else {
            let total = scoring::total_score(&session.questions);
            let summary = summary_or_fallback(
                self.inner.evaluator.as_ref(),
                &session.questions,
                total,
                self.inner.evaluator_timeout,
            )
            .await;
            Some((total, summary))
        };

        let mut rt = self.inner.runtime.lock().await;
        if rt.store.current().map(|s| s.id) != Some(session.id) {
            debug!("Session {} was cleared before finalization", session.id);
            return Ok(());
        }
        if let Some((total, summary)) = pending_summary {
            rt.store.complete_interview(total, summary);
        }
        let Some(current) = rt.store.current() else {
            return Ok(());
        };
        self.inner.repo.save_active_session(current).await?;
        if let Some(record) = CompletedInterview::from_session(current) {
            if self.inner.repo.append_completed(&record).await? {
                info!(
                    "Interview {} recorded: {}/{}",
                    record.session_id,
                    record.total_score,
                    scoring::MAX_TOTAL_SCORE
                );
            }
        }
        Ok(())
    }
}

fn ensure_no_session(rt: &Runtime) -> Result<(), AppError> {
    match rt.store.current().map(|s| s.status) {
        None => Ok(()),
        Some(SessionStatus::Completed) => Err(AppError::Conflict(
            "Interview already completed; upload a new resume to start again".into(),
        )),
        Some(status) => Err(AppError::Conflict(format!("An interview is already {status:?}"))),
    }
}

fn snapshot_of(rt: &Runtime) -> InterviewSnapshot {
    InterviewSnapshot {
        stage: resolve_stage(rt.candidate.as_ref(), rt.store.current()),
        candidate: rt.candidate.clone(),
        pending_fields: rt.collector.pending(),
        session: rt.store.current().cloned(),
        timer: rt.timer.state(),
        draft: rt.draft.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::interview::evaluator::{
        fallback_questions, fallback_summary, Evaluation, EvaluatorError, OfflineEvaluator,
        FALLBACK_FEEDBACK, FALLBACK_SCORE,
    };
    use crate::models::interview::Question;
    use crate::persistence::MemoryRepository;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Scores every answer 80 and writes a fixed summary.
    struct FixedEvaluator;

    #[async_trait]
    impl Evaluator for FixedEvaluator {
        async fn generate_questions(
            &self,
            _: &CandidateProfile,
        ) -> Result<Vec<Question>, EvaluatorError> {
            Ok(fallback_questions())
        }
        async fn evaluate_answer(
            &self,
            _: &Question,
            _: &str,
            _: u32,
        ) -> Result<Evaluation, EvaluatorError> {
            Ok(Evaluation {
                score: 80,
                feedback: "Solid.".into(),
                fallback: false,
            })
        }
        async fn generate_summary(
            &self,
            _: &[Question],
            total: u32,
        ) -> Result<String, EvaluatorError> {
            Ok(format!("Scored {total}."))
        }
    }

    /// Takes 30 seconds to score an answer.
    struct SlowEvaluator;

    #[async_trait]
    impl Evaluator for SlowEvaluator {
        async fn generate_questions(
            &self,
            _: &CandidateProfile,
        ) -> Result<Vec<Question>, EvaluatorError> {
            Ok(fallback_questions())
        }
        async fn evaluate_answer(
            &self,
            _: &Question,
            _: &str,
            _: u32,
        ) -> Result<Evaluation, EvaluatorError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Evaluation {
                score: 90,
                feedback: "Thorough.".into(),
                fallback: false,
            })
        }
        async fn generate_summary(
            &self,
            _: &[Question],
            total: u32,
        ) -> Result<String, EvaluatorError> {
            Ok(format!("Scored {total}."))
        }
    }

    /// Memory repository whose session writes can be switched off.
    #[derive(Default)]
    struct UnreliableRepository {
        inner: MemoryRepository,
        fail_saves: AtomicBool,
    }

    impl UnreliableRepository {
        fn set_failing(&self, failing: bool) {
            self.fail_saves.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl InterviewRepository for UnreliableRepository {
        async fn upsert_candidate(&self, profile: &CandidateProfile) -> anyhow::Result<()> {
            self.inner.upsert_candidate(profile).await
        }
        async fn get_candidate(&self, id: Uuid) -> anyhow::Result<Option<CandidateProfile>> {
            self.inner.get_candidate(id).await
        }
        async fn list_candidates(&self) -> anyhow::Result<Vec<CandidateProfile>> {
            self.inner.list_candidates().await
        }
        async fn save_active_session(&self, session: &InterviewSession) -> anyhow::Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                anyhow::bail!("database unavailable");
            }
            self.inner.save_active_session(session).await
        }
        async fn load_active_session(&self) -> anyhow::Result<Option<InterviewSession>> {
            self.inner.load_active_session().await
        }
        async fn clear_active_session(&self, candidate_id: Uuid) -> anyhow::Result<()> {
            self.inner.clear_active_session(candidate_id).await
        }
        async fn append_completed(&self, record: &CompletedInterview) -> anyhow::Result<bool> {
            self.inner.append_completed(record).await
        }
        async fn list_completed(&self) -> anyhow::Result<Vec<CompletedInterview>> {
            self.inner.list_completed().await
        }
    }

    fn complete_profile() -> CandidateProfile {
        CandidateProfile::new(
            Some("Jane Doe".into()),
            Some("jane@example.com".into()),
            Some("555-1234".into()),
        )
    }

    fn service_with(evaluator: Arc<dyn Evaluator>) -> (InterviewService, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let service = InterviewService::new(repo.clone(), evaluator, TIMEOUT);
        (service, repo)
    }

    async fn started(
        evaluator: Arc<dyn Evaluator>,
    ) -> (InterviewService, Arc<MemoryRepository>, InterviewSession) {
        let (service, repo) = service_with(evaluator);
        service.register_candidate(complete_profile()).await.unwrap();
        let session = service.start_interview().await.unwrap();
        (service, repo, session)
    }

    async fn current(service: &InterviewService) -> InterviewSession {
        service.snapshot().await.session.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_question_expires_with_zero_score() {
        let (service, _repo, _) = started(Arc::new(FixedEvaluator)).await;
        let mut events = service.subscribe();

        tokio::time::sleep(Duration::from_millis(20_500)).await;

        let session = current(&service).await;
        assert_eq!(session.current_question_index, 1);
        let q = &session.questions[0];
        assert_eq!(q.score, Some(0));
        assert_eq!(q.answer.as_deref(), Some(TIME_EXPIRED_ANSWER));
        assert_eq!(q.time_spent_secs, Some(20));

        let timer = service.snapshot().await.timer;
        assert_eq!(timer.question_index, Some(1));
        assert!(timer.running);

        let mut expiries = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TimerEvent::Expired { question_index: 0 }) {
                expiries += 1;
            }
        }
        assert_eq!(expiries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_submits_draft() {
        let (service, _repo, _) = started(Arc::new(FixedEvaluator)).await;
        service.update_draft("useState holds state".into()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20_500)).await;

        let session = current(&service).await;
        assert_eq!(session.questions[0].answer.as_deref(), Some("useState holds state"));
        assert_eq!(session.questions[0].score, Some(0));
        assert!(service.snapshot().await.draft.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_records_evaluation() {
        let (service, _repo, _) = started(Arc::new(FixedEvaluator)).await;
        tokio::time::sleep(Duration::from_secs(7)).await;

        let outcome = service.submit_answer(0, "An answer".into()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Accepted { score: 80, finished: false, .. }));

        let session = current(&service).await;
        assert_eq!(session.current_question_index, 1);
        assert_eq!(session.questions[0].time_spent_secs, Some(7));
        assert_eq!(service.snapshot().await.timer.remaining_secs, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluator_failure_uses_fallback_and_advances() {
        let (service, _repo, session) = started(Arc::new(OfflineEvaluator)).await;
        assert_eq!(session.questions, fallback_questions());

        let outcome = service.submit_answer(0, "Hooks manage state".into()).await.unwrap();
        match outcome {
            SubmitOutcome::Accepted { score, feedback, fallback, .. } => {
                assert_eq!(score, FALLBACK_SCORE);
                assert_eq!(feedback, FALLBACK_FEEDBACK);
                assert!(fallback);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(current(&service).await.current_question_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_before_expiry_wins() {
        let (service, _repo, _) = started(Arc::new(FixedEvaluator)).await;
        tokio::time::sleep(Duration::from_millis(19_500)).await;
        service.submit_answer(0, "Just in time".into()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let session = current(&service).await;
        assert_eq!(session.current_question_index, 1);
        assert_eq!(session.questions[0].answer.as_deref(), Some("Just in time"));
        assert_eq!(session.questions[0].score, Some(80));
        assert!(session.questions[1].answer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_expiry_is_stale() {
        let (service, _repo, _) = started(Arc::new(FixedEvaluator)).await;
        tokio::time::sleep(Duration::from_millis(20_500)).await;

        let outcome = service.submit_answer(0, "Too late".into()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Stale { current_index: Some(1) }));
        let session = current(&service).await;
        assert_eq!(session.questions[0].answer.as_deref(), Some(TIME_EXPIRED_ANSWER));
        assert!(session.questions[1].answer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_evaluated_after_expiry_is_dropped() {
        let repo = Arc::new(MemoryRepository::new());
        let service = InterviewService::new(repo, Arc::new(SlowEvaluator), Duration::from_secs(60));
        service.register_candidate(complete_profile()).await.unwrap();
        service.start_interview().await.unwrap();

        let pending = tokio::spawn({
            let service = service.clone();
            async move { service.submit_answer(0, "Slow answer".into()).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!service.snapshot().await.timer.running);

        // A fresh countdown for the same question expires while scoring is
        // still under way.
        assert!(service.pause().await.unwrap());
        let resumed = service.resume().await.unwrap();
        assert_eq!(resumed, DecisionOutcome::Resumed { question_index: 0 });

        let outcome = pending.await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Stale { current_index: Some(1) }));

        let session = current(&service).await;
        assert_eq!(session.current_question_index, 1);
        assert_eq!(session.questions[0].answer.as_deref(), Some(TIME_EXPIRED_ANSWER));
        assert_eq!(session.questions[0].score, Some(0));
        assert_eq!(session.questions[0].time_spent_secs, Some(20));
        assert!(session.questions[1].answer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_countdown_running() {
        let repo = Arc::new(UnreliableRepository::default());
        let service = InterviewService::new(repo.clone(), Arc::new(FixedEvaluator), TIMEOUT);
        service.register_candidate(complete_profile()).await.unwrap();
        repo.set_failing(true);

        service.start_interview().await.unwrap();
        assert!(service.snapshot().await.timer.running);

        let outcome = service.submit_answer(0, "x".into()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Accepted { finished: false, .. }));
        let timer = service.snapshot().await.timer;
        assert_eq!(timer.question_index, Some(1));
        assert!(timer.running);

        assert!(service.pause().await.unwrap());
        service.resume().await.unwrap();
        assert!(service.snapshot().await.timer.running);

        repo.set_failing(false);
        tokio::time::sleep(Duration::from_millis(20_500)).await;

        let session = current(&service).await;
        assert_eq!(session.current_question_index, 2);
        assert_eq!(session.questions[1].score, Some(0));
        let saved = repo.load_active_session().await.unwrap().unwrap();
        assert_eq!(saved.current_question_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_on_last_answer_still_completes() {
        let repo = Arc::new(UnreliableRepository::default());
        let service = InterviewService::new(repo.clone(), Arc::new(FixedEvaluator), TIMEOUT);
        service.register_candidate(complete_profile()).await.unwrap();
        service.start_interview().await.unwrap();
        for i in 0..5 {
            service.submit_answer(i, "answer".into()).await.unwrap();
        }

        repo.set_failing(true);
        let outcome = service.submit_answer(5, "answer".into()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Accepted { finished: true, .. }));
        let snap = service.snapshot().await;
        assert_eq!(snap.stage, Stage::Completed);
        assert_eq!(snap.session.unwrap().total_score, Some(480));
        assert!(repo.list_completed().await.unwrap().is_empty());

        repo.set_failing(false);
        service.finalize().await.unwrap();
        assert_eq!(repo.list_completed().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_then_resume_restores_full_limit() {
        let (service, _repo, _) = started(Arc::new(FixedEvaluator)).await;
        for i in 0..3 {
            service.submit_answer(i, format!("answer {i}")).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(service.snapshot().await.timer.remaining_secs, 50);

        assert!(service.pause().await.unwrap());
        let snap = service.snapshot().await;
        assert_eq!(snap.stage, Stage::ResumeDecision);
        assert!(!snap.timer.running);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(current(&service).await.current_question_index, 3);

        let outcome = service.resume().await.unwrap();
        assert_eq!(outcome, DecisionOutcome::Resumed { question_index: 3 });
        let snap = service.snapshot().await;
        assert_eq!(snap.stage, Stage::Interview);
        assert_eq!(snap.timer.remaining_secs, 60);
        assert!(snap.timer.running);
        assert_eq!(snap.session.unwrap().questions[2].score, Some(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_returns_to_upload() {
        let (service, repo, _) = started(Arc::new(FixedEvaluator)).await;
        service.pause().await.unwrap();
        assert_eq!(service.restart().await.unwrap(), DecisionOutcome::Restarted);

        let snap = service.snapshot().await;
        assert_eq!(snap.stage, Stage::Upload);
        assert!(snap.session.is_none());
        assert!(repo.load_active_session().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_appends_log_once() {
        let (service, repo, _) = started(Arc::new(FixedEvaluator)).await;
        for i in 0..6 {
            let outcome = service.submit_answer(i, "answer".into()).await.unwrap();
            assert!(matches!(
                outcome,
                SubmitOutcome::Accepted { finished, .. } if finished == (i == 5)
            ));
        }
        service.finalize().await.unwrap();

        let session = current(&service).await;
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.total_score, Some(480));
        assert_eq!(session.summary.as_deref(), Some("Scored 480."));
        assert_eq!(service.snapshot().await.stage, Stage::Completed);

        let log = repo.list_completed().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].total_score, 480);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_questions_expiring_completes_with_fallback_summary() {
        let (service, repo, _) = started(Arc::new(OfflineEvaluator)).await;
        // 2*20 + 2*60 + 2*120 seconds of countdown.
        tokio::time::sleep(Duration::from_secs(401)).await;

        let session = current(&service).await;
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.current_question_index, 6);
        assert_eq!(session.total_score, Some(0));
        assert_eq!(session.summary, Some(fallback_summary(0)));
        assert!(!service.snapshot().await.timer.running);
        assert_eq!(repo.list_completed().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_chat_collects_phone_then_starts_on_ready() {
        let (service, repo) = service_with(Arc::new(FixedEvaluator));
        let profile =
            CandidateProfile::new(Some("Jane Doe".into()), Some("jane@example.com".into()), None);
        let candidate_id = profile.id;

        let opening = service.register_candidate(profile).await.unwrap();
        assert!(matches!(opening, CollectorReply::Prompt { field: ProfileField::Phone, .. }));
        assert!(service.start_interview().await.is_err());

        let step = service.profile_message("555-1234").await.unwrap();
        assert!(matches!(step, ProfileStep::Reply { reply: CollectorReply::Ready { .. } }));
        let stored = repo.get_candidate(candidate_id).await.unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("555-1234"));

        let step = service.profile_message("hold on").await.unwrap();
        assert!(matches!(step, ProfileStep::Reply { .. }));

        let step = service.profile_message("I'm ready!").await.unwrap();
        assert!(matches!(step, ProfileStep::Started { .. }));
        assert_eq!(service.snapshot().await.stage, Stage::Interview);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_candidate_refused_while_interview_active() {
        let (service, _repo, _) = started(Arc::new(FixedEvaluator)).await;
        let err = service.register_candidate(complete_profile()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_rearms_in_progress_session() {
        let repo = Arc::new(MemoryRepository::new());
        let profile = complete_profile();
        repo.upsert_candidate(&profile).await.unwrap();

        let mut store = SessionStore::new();
        store.start_interview(profile.id, fallback_questions());
        store.next_question();
        store.next_question();
        repo.save_active_session(store.current().unwrap()).await.unwrap();

        let service = InterviewService::new(repo.clone(), Arc::new(FixedEvaluator), TIMEOUT);
        service.restore().await.unwrap();

        let snap = service.snapshot().await;
        assert_eq!(snap.stage, Stage::Interview);
        assert_eq!(snap.candidate.unwrap().id, profile.id);
        assert_eq!(snap.timer.question_index, Some(2));
        assert_eq!(snap.timer.remaining_secs, 60);
        assert!(snap.timer.running);
    }
}
