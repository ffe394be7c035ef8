//! Health-check cadence.
//!
//! Like the rest of the engine this timer owns no thread. The caller polls
//! [`HealthCheckTimer::tick`] with the current time and runs a health check
//! whenever it returns `true`: once shortly after the session starts, then
//! every `interval`.

use chrono::{DateTime, Duration, Utc};

use crate::storage::Config;

#[derive(Debug, Clone)]
pub struct HealthCheckTimer {
    interval: Duration,
    startup_delay: Duration,
    started_at: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
}

impl HealthCheckTimer {
    pub fn new(started_at: DateTime<Utc>, interval: Duration, startup_delay: Duration) -> Self {
        Self {
            interval,
            startup_delay,
            started_at,
            last_run: None,
        }
    }

    pub fn from_config(config: &Config, started_at: DateTime<Utc>) -> Self {
        Self::new(
            started_at,
            config.health_check_interval(),
            config.health_check_startup_delay(),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn next_due(&self) -> DateTime<Utc> {
        match self.last_run {
            Some(last) => last + self.interval,
            None => self.started_at + self.startup_delay,
        }
    }

    pub fn due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_due()
    }

    pub fn mark_ran(&mut self, now: DateTime<Utc>) {
        self.last_run = Some(now);
    }

    /// Returns `true` (and records the run) when a check is due at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if self.due(now) {
            self.mark_ran(now);
            true
        } else {
            false
        }
    }
}
