//! Periodic reminder sweep.
//!
//! A [`Sweeper`] performs one scan-claim-dispatch pass; the
//! [`ReminderScheduler`] owns the timer that drives it. Ticks never overlap:
//! a tick that arrives while the previous one is still running is skipped.

use chrono::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info, warn};

use crate::notification::NotificationDispatcher;
use crate::task::{CandidateWindow, TaskStore};
use super::clock::Clock;
use super::reminder_evaluator::{evaluate, ReminderState};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler error: {0}")]
    Cron(#[from] JobSchedulerError),

    #[error("Reminder scheduler is already running")]
    AlreadyStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    /// Time between ticks.
    pub interval: std::time::Duration,
    /// How far ahead of now a deadline may be and still be scanned.
    pub horizon: Duration,
    /// How far behind now a deadline may be and still be scanned.
    pub lookback: Duration,
}

impl SweepSettings {
    fn window(&self) -> CandidateWindow {
        CandidateWindow {
            horizon: self.horizon,
            lookback: self.lookback,
        }
    }
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(60),
            horizon: Duration::minutes(60),
            lookback: Duration::minutes(1),
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub skipped: bool,
    pub store_unavailable: bool,
    pub candidates: usize,
    pub eligible: usize,
    pub expired: usize,
    pub claimed: usize,
    pub lost_claims: usize,
    pub claim_failures: usize,
    pub dispatched: usize,
    pub dispatch_failures: usize,
}

impl SweepReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct Sweeper {
    store: Arc<dyn TaskStore>,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    settings: SweepSettings,
    running: Arc<AtomicBool>,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn TaskStore>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SweepState {
        if self.running.load(Ordering::Acquire) {
            SweepState::Running
        } else {
            SweepState::Idle
        }
    }

    fn begin(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    /// Runs one tick. Errors on a single task are logged and counted; they
    /// never abort the rest of the sweep.
    pub async fn sweep_once(&self) -> SweepReport {
        let Some(_guard) = self.begin() else {
            debug!("Previous reminder sweep still running, skipping tick");
            return SweepReport::skipped();
        };

        let now = self.clock.now();
        let mut report = SweepReport::default();

        let candidates = match self
            .store
            .find_reminder_candidates(now, self.settings.window())
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Failed to load reminder candidates, retrying next tick: {:?}", e);
                report.store_unavailable = true;
                return report;
            }
        };
        report.candidates = candidates.len();

        for task in candidates {
            match evaluate(&task, now) {
                ReminderState::Eligible => report.eligible += 1,
                ReminderState::Expired => {
                    report.expired += 1;
                    debug!(task_id = %task.id, deadline = %task.deadline, "Reminder window closed before it fired");
                    continue;
                }
                _ => continue,
            }

            match self.store.claim_reminder(task.id, now).await {
                Ok(true) => report.claimed += 1,
                Ok(false) => {
                    report.lost_claims += 1;
                    debug!(task_id = %task.id, "Reminder already claimed elsewhere");
                    continue;
                }
                Err(e) => {
                    report.claim_failures += 1;
                    warn!(task_id = %task.id, "Failed to claim reminder, will retry next tick: {:?}", e);
                    continue;
                }
            }

            match self.dispatcher.dispatch_reminder(&task) {
                Ok(_) => report.dispatched += 1,
                Err(_) => report.dispatch_failures += 1,
            }
        }

        if report.claimed > 0 || report.claim_failures > 0 {
            info!(
                candidates = report.candidates,
                eligible = report.eligible,
                claimed = report.claimed,
                lost_claims = report.lost_claims,
                claim_failures = report.claim_failures,
                dispatched = report.dispatched,
                dispatch_failures = report.dispatch_failures,
                "Reminder sweep finished"
            );
        } else {
            debug!(candidates = report.candidates, expired = report.expired, "Reminder sweep finished");
        }

        report
    }
}

/// Owns the sweep timer. `start` and `stop` may be called from any task.
pub struct ReminderScheduler {
    sweeper: Sweeper,
    jobs: Mutex<Option<JobScheduler>>,
}

impl ReminderScheduler {
    pub fn new(sweeper: Sweeper) -> Self {
        Self {
            sweeper,
            jobs: Mutex::new(None),
        }
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        let scheduler = JobScheduler::new().await?;
        let sweeper = self.sweeper.clone();
        let job = Job::new_repeated_async(self.sweeper.settings.interval, move |_uuid, _l| {
            let sweeper = sweeper.clone();

            Box::pin(async move {
                let report = sweeper.sweep_once().await;
                if report.skipped {
                    warn!("Reminder sweep overran its interval, tick skipped");
                } else if report.store_unavailable {
                    debug!("Reminder sweep deferred to next tick");
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;
        *jobs = Some(scheduler);

        info!(
            interval_secs = self.sweeper.settings.interval.as_secs(),
            "Reminder scheduler started"
        );
        Ok(())
    }

    /// Stops the timer. A tick already in flight runs to completion.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if let Some(mut scheduler) = self.jobs.lock().await.take() {
            scheduler.shutdown().await?;
            info!("Reminder scheduler stopped");
        }
        Ok(())
    }
}
