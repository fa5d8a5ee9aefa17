//! Cron-driven refresh of every enabled pair
//!
//! One timer per scheduled interval. Each tick reloads the scheduler config and
//! enqueues a `limit = 1` fetch for every enabled pair, or does nothing when the
//! config cannot be loaded or the interval is disabled.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use shared::FetchRequest;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::data::CandleInterval;
use crate::queue::FetchQueue;
use crate::services::config_client::ConfigSource;
use crate::{MarketError, Result};

/// Default timers: sec min hour day-of-month month day-of-week, in UTC, five
/// seconds after each boundary.
pub const DEFAULT_SCHEDULES: [(CandleInterval, &str); 9] = [
    (CandleInterval::OneMinute, "5 * * * * *"),
    (CandleInterval::FiveMinutes, "5 */5 * * * *"),
    (CandleInterval::FifteenMinutes, "5 */15 * * * *"),
    (CandleInterval::ThirtyMinutes, "5 */30 * * * *"),
    (CandleInterval::OneHour, "5 0 * * * *"),
    (CandleInterval::FourHours, "5 0 */4 * * *"),
    (CandleInterval::OneDay, "5 0 0 * * *"),
    (CandleInterval::OneWeek, "5 0 0 * * Mon"),
    (CandleInterval::OneMonth, "5 0 0 1 * *"),
];

const TICK_LIMIT: u32 = 1;

/// Suffix of the `SCHEDULER_CRON_<CODE>` override for `interval`.
///
/// Environment keys are upper-cased, so the month is spelled `1MO` to keep it
/// apart from the minute.
pub fn override_key(interval: CandleInterval) -> String {
    match interval {
        CandleInterval::OneMonth => "1MO".to_string(),
        other => other.code().to_uppercase(),
    }
}

#[derive(Debug, Clone)]
pub struct IntervalSchedule {
    pub interval: CandleInterval,
    pub expression: String,
    schedule: Schedule,
}

impl IntervalSchedule {
    pub fn parse(interval: CandleInterval, expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            MarketError::Configuration(format!("invalid cron '{expression}' for {interval}: {e}"))
        })?;
        Ok(Self {
            interval,
            expression: expression.to_string(),
            schedule,
        })
    }

    /// Next firing strictly after now.
    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Slot that follows `previous`, the one that just fired.
    ///
    /// Never `previous` again, even when the timer woke slightly before it by
    /// the wall clock; slots already in the past at `now` are skipped.
    pub fn following(&self, previous: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&previous.max(now)).next()
    }
}

/// Builds the timer table, applying overrides keyed by [`override_key`].
pub fn schedule_table(overrides: &HashMap<String, String>) -> Result<Vec<IntervalSchedule>> {
    DEFAULT_SCHEDULES
        .iter()
        .map(|(interval, default)| {
            let expression = overrides
                .get(&override_key(*interval))
                .map(String::as_str)
                .unwrap_or(*default);
            IntervalSchedule::parse(*interval, expression)
        })
        .collect()
}

pub struct Scheduler {
    config: Arc<dyn ConfigSource>,
    queue: Arc<dyn FetchQueue>,
    default_exchange: String,
    table: Vec<IntervalSchedule>,
}

impl Scheduler {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        queue: Arc<dyn FetchQueue>,
        default_exchange: impl Into<String>,
        table: Vec<IntervalSchedule>,
    ) -> Self {
        Self {
            config,
            queue,
            default_exchange: default_exchange.into(),
            table,
        }
    }

    pub fn table(&self) -> &[IntervalSchedule] {
        &self.table
    }

    /// Runs one tick for `interval` and returns how many requests were enqueued.
    pub async fn tick(&self, interval: CandleInterval) -> usize {
        let config = match self.config.fetch_config().await {
            Ok(config) => config,
            Err(e) => {
                warn!(interval = %interval, error = %e, "skipping tick, scheduler config unavailable");
                return 0;
            }
        };
        if !config.is_interval_enabled(interval.code()) {
            debug!(interval = %interval, "skipping tick, interval disabled");
            return 0;
        }

        let mut enqueued = 0;
        for pair in &config.pairs {
            let request = FetchRequest::new(
                pair.symbol.trim().to_uppercase(),
                interval.code(),
                TICK_LIMIT,
                self.default_exchange.as_str(),
            );
            match self.queue.enqueue(&request).await {
                Ok(()) => enqueued += 1,
                Err(e) => warn!(
                    pair = %request.pair,
                    interval = %interval,
                    request_id = %request.request_id,
                    error = %e,
                    "failed to enqueue scheduled fetch"
                ),
            }
        }
        info!(interval = %interval, enqueued, pairs = config.pairs.len(), "scheduled fetch requests");
        enqueued
    }

    /// Starts one timer task per table entry; all stop once `shutdown` flips.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.table.len())
            .map(|index| {
                let scheduler = Arc::clone(&self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { scheduler.run_timer(index, shutdown).await })
            })
            .collect()
    }

    async fn run_timer(&self, index: usize, mut shutdown: watch::Receiver<bool>) {
        let entry = &self.table[index];
        info!(interval = %entry.interval, cron = %entry.expression, "scheduler timer started");

        let mut next = entry.next_fire();
        loop {
            if *shutdown.borrow() {
                break;
            }
            let Some(slot) = next else {
                warn!(interval = %entry.interval, "cron schedule has no further firings");
                break;
            };
            let delay = (slot - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = sleep_until(Instant::now() + delay) => {
                    self.tick(entry.interval).await;
                    next = entry.following(slot, Utc::now());
                }
            }
        }
        info!(interval = %entry.interval, "scheduler timer stopped");
    }
}
