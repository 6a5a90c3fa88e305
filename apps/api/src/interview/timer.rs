//! TimerEngine: one-second countdown for the question at the session's
//! current index.
//!
//! The engine owns at most one ticker task. Every activation bumps a
//! generation counter and hands out a `TimerToken`; a tick carrying any other
//! token is stale and never touches the countdown. This is what keeps a ticker
//! created for question N from expiring question N+1.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

const TICK_PERIOD: Duration = Duration::from_secs(1);
const WARNING_FLOOR_SECS: u32 = 5;

/// Remaining-seconds threshold at or below which the warning flag is raised:
/// 25% of the limit, never less than five seconds.
pub fn warning_threshold(time_limit_secs: u32) -> u32 {
    WARNING_FLOOR_SECS.max(time_limit_secs / 4)
}

/// Identifies one activation of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub session_id: Uuid,
    pub question_index: usize,
    generation: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Tick { question_index: usize, remaining_secs: u32 },
    Warning { question_index: usize, remaining_secs: u32 },
    Expired { question_index: usize },
}

/// Snapshot of the countdown for callers; never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerState {
    pub question_index: Option<usize>,
    pub time_limit_secs: u32,
    pub remaining_secs: u32,
    pub running: bool,
    pub warning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ticked { remaining_secs: u32, warning: bool },
    /// Remaining time hit zero on this tick. Reported once per activation.
    Expired { elapsed_secs: u32 },
    /// The tick belongs to a superseded or stopped countdown.
    Stale,
}

pub struct TimerEngine {
    token: Option<TimerToken>,
    generation: u64,
    time_limit_secs: u32,
    remaining_secs: u32,
    running: bool,
    warning: bool,
    started_at: Instant,
    task: Option<JoinHandle<()>>,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerEngine {
    pub fn new(events: broadcast::Sender<TimerEvent>) -> Self {
        Self {
            token: None,
            generation: 0,
            time_limit_secs: 0,
            remaining_secs: 0,
            running: false,
            warning: false,
            started_at: Instant::now(),
            task: None,
            events,
        }
    }

    /// Starts a fresh countdown of `time_limit_secs` for `question_index`,
    /// cancelling whatever ticker was running before.
    pub fn activate(
        &mut self,
        session_id: Uuid,
        question_index: usize,
        time_limit_secs: u32,
    ) -> TimerToken {
        self.cancel();
        self.generation += 1;
        let token = TimerToken {
            session_id,
            question_index,
            generation: self.generation,
        };
        self.token = Some(token);
        self.time_limit_secs = time_limit_secs;
        self.remaining_secs = time_limit_secs;
        self.running = true;
        self.warning = false;
        self.started_at = Instant::now();
        info!("Timer armed for question {question_index}: {time_limit_secs}s");
        token
    }

    /// Spawns the repeating ticker for `token`. `on_tick` is awaited once per
    /// second and returns whether the ticker should keep going.
    pub fn spawn_ticker<F, Fut>(&mut self, token: TimerToken, mut on_tick: F)
    where
        F: FnMut(TimerToken) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        if self.token != Some(token) {
            debug!("Not spawning ticker for superseded token {:?}", token);
            return;
        }
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick(token).await {
                    break;
                }
            }
        });
        self.task = Some(handle);
    }

    pub fn tick(&mut self, token: &TimerToken) -> TickOutcome {
        if self.token.as_ref() != Some(token) || !self.running {
            return TickOutcome::Stale;
        }
        let index = token.question_index;
        self.remaining_secs = self.remaining_secs.saturating_sub(1);

        let warning = self.remaining_secs <= warning_threshold(self.time_limit_secs);
        if warning && !self.warning {
            let _ = self.events.send(TimerEvent::Warning {
                question_index: index,
                remaining_secs: self.remaining_secs,
            });
        }
        self.warning = warning;

        if self.remaining_secs == 0 {
            self.running = false;
            // The ticker calling us is the one finishing; detach it so that
            // arming the next question does not abort the expiry in flight.
            self.task = None;
            let _ = self.events.send(TimerEvent::Expired { question_index: index });
            info!("Timer expired for question {index}");
            // A delayed ticker can finish late; time spent never exceeds the limit.
            return TickOutcome::Expired {
                elapsed_secs: self.elapsed_secs().min(self.time_limit_secs),
            };
        }

        let _ = self.events.send(TimerEvent::Tick {
            question_index: index,
            remaining_secs: self.remaining_secs,
        });
        TickOutcome::Ticked {
            remaining_secs: self.remaining_secs,
            warning,
        }
    }

    /// Stops the countdown and aborts its ticker. Remaining time is not kept.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.running {
            debug!("Timer cancelled with {}s remaining", self.remaining_secs);
        }
        self.running = false;
    }

    /// Whole seconds since the current activation.
    pub fn elapsed_secs(&self) -> u32 {
        u32::try_from(self.started_at.elapsed().as_secs()).unwrap_or(u32::MAX)
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            question_index: self.token.map(|t| t.question_index),
            time_limit_secs: self.time_limit_secs,
            remaining_secs: self.remaining_secs,
            running: self.running,
            warning: self.warning,
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
