//! # Sync Scheduler
//!
//! Fires [`SyncTrigger::run_scheduled`] on the configured cadence.
//!
//! The loop polls every `poll_interval`. Each tick runs inside its own tokio
//! task so a panicking sync is caught as a `JoinError`; after a failure or a
//! panic the loop pauses for `error_cooldown` and carries on. A trigger that
//! finds another sync holding the run lock is retried at the next poll, so a
//! manual sync overlapping the weekly slot does not cost the week's run. The
//! loop only exits when its `CancellationToken` is cancelled.

use crate::coordinator::{SyncReport, SyncTrigger};
use crate::{Result, SyncError};
use bridge_traits::time::Clock;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, FixedOffset, NaiveDate, Timelike, Utc};
use core_runtime::{Cadence, ScheduleConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Weekly {
        weekday: chrono::Weekday,
        hour: u32,
        minute: u32,
    },
    Every(ChronoDuration),
}

/// Cadence resolved against a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    rule: Rule,
    offset: FixedOffset,
}

impl Schedule {
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidSchedule`] for an out-of-range offset or
    /// an empty period
    pub fn new(config: &ScheduleConfig) -> Result<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            SyncError::InvalidSchedule(format!(
                "UTC offset of {} minutes is out of range",
                config.utc_offset_minutes
            ))
        })?;

        let rule = match config.cadence {
            Cadence::Weekly {
                weekday,
                hour,
                minute,
            } => {
                if hour > 23 || minute > 59 {
                    return Err(SyncError::InvalidSchedule(format!(
                        "invalid time of day {:02}:{:02}",
                        hour, minute
                    )));
                }
                Rule::Weekly {
                    weekday,
                    hour,
                    minute,
                }
            }
            Cadence::Every(period) => {
                let period = ChronoDuration::from_std(period)
                    .map_err(|e| SyncError::InvalidSchedule(e.to_string()))?;
                if period <= ChronoDuration::zero() {
                    return Err(SyncError::InvalidSchedule(
                        "period must be greater than zero".to_string(),
                    ));
                }
                Rule::Every(period)
            }
        };

        Ok(Self { rule, offset })
    }

    /// Calendar date at `now` in the schedule's zone
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    pub fn is_due(&self, state: &ScheduleState, now: DateTime<Utc>) -> bool {
        match self.rule {
            Rule::Weekly {
                weekday,
                hour,
                minute,
            } => {
                let local = now.with_timezone(&self.offset);
                local.weekday() == weekday
                    && local.hour() == hour
                    && local.minute() == minute
                    && state.last_run_date != Some(local.date_naive())
            }
            Rule::Every(period) => match state.last_run_at {
                None => true,
                Some(last) => now - last >= period,
            },
        }
    }
}

/// What the scheduler remembers between ticks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleState {
    /// Local date of the last successful scheduled run
    pub last_run_date: Option<NaiveDate>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl ScheduleState {
    fn record(&mut self, at: DateTime<Utc>, local_date: NaiveDate) {
        self.last_run_at = Some(at);
        self.last_run_date = Some(local_date);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not due
    Idle,
    Ran(SyncReport),
    /// Due, but another sync held the run lock
    Busy,
    Failed(String),
}

pub struct SyncScheduler {
    trigger: Arc<dyn SyncTrigger>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    error_cooldown: Duration,
}

impl SyncScheduler {
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidSchedule`] if the schedule cannot be
    /// resolved
    pub fn new(
        trigger: Arc<dyn SyncTrigger>,
        config: &ScheduleConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if config.poll_interval.is_zero() {
            return Err(SyncError::InvalidSchedule(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            trigger,
            schedule: Schedule::new(config)?,
            clock,
            poll_interval: config.poll_interval,
            error_cooldown: config.error_cooldown,
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Evaluate the schedule once, running the trigger if due
    pub async fn tick(&self, state: &mut ScheduleState) -> TickOutcome {
        let now = self.clock.now();
        if !self.schedule.is_due(state, now) {
            return TickOutcome::Idle;
        }

        info!("Scheduled sync due");
        match self.trigger.run_scheduled().await {
            Ok(report) => {
                state.record(now, self.schedule.local_date(now));
                info!(
                    invocation_id = %report.invocation_id,
                    all_ok = report.all_ok(),
                    "Scheduled sync finished"
                );
                TickOutcome::Ran(report)
            }
            Err(SyncError::SyncInProgress) => {
                info!("Another sync is running, retrying at next poll");
                TickOutcome::Busy
            }
            Err(e) => {
                error!(error = %e, "Scheduled sync failed");
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    /// Poll the schedule until `cancel` fires
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            poll_secs = self.poll_interval.as_secs(),
            "Scheduler started"
        );
        let mut state = ScheduleState::default();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let scheduler = Arc::clone(&self);
            let mut tick_state = state.clone();
            let handle = tokio::spawn(async move {
                let outcome = scheduler.tick(&mut tick_state).await;
                (outcome, tick_state)
            });

            let pause = match handle.await {
                Ok((outcome, next_state)) => {
                    state = next_state;
                    match outcome {
                        TickOutcome::Failed(_) => {
                            warn!(
                                cooldown_secs = self.error_cooldown.as_secs(),
                                "Pausing scheduler after failure"
                            );
                            self.error_cooldown
                        }
                        TickOutcome::Idle | TickOutcome::Busy | TickOutcome::Ran(_) => {
                            self.poll_interval
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Scheduled sync panicked");
                    self.error_cooldown
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {
                    debug!("Scheduler tick");
                }
            }
        }

        info!("Scheduler stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================
