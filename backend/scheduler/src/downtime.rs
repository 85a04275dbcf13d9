//! Downtime tracking: accumulates detected scheduling delay and spreads the
//! schedule out so a single stall does not fire every task at once.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::task::TaskHeap;

/// Receives the accumulated downtime once per loop iteration.
pub trait DowntimeHook: Send {
    fn handle_downtime(&mut self, downtime: Duration);
}

impl<F> DowntimeHook for F
where
    F: FnMut(Duration) + Send,
{
    fn handle_downtime(&mut self, downtime: Duration) {
        self(downtime)
    }
}

/// Default hook: logs the downtime and takes no further action.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDowntime;

impl DowntimeHook for LogDowntime {
    fn handle_downtime(&mut self, downtime: Duration) {
        warn!(
            seconds = downtime.as_secs(),
            "Accumulated downtime ignored"
        );
    }
}

#[derive(Debug, Default)]
pub struct DowntimeTracker {
    accumulated: Duration,
}

impl DowntimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `additional` to the accumulator and shift every scheduled task by
    /// the same amount (clamped per task to one interval past `now`).
    pub fn track(&mut self, additional: Duration, tasks: &mut TaskHeap, now: DateTime<Utc>) {
        info!(
            seconds = additional.as_secs_f64(),
            "Detected delay, adding to downtime timer"
        );
        self.accumulated = self.accumulated.saturating_add(additional);

        for task in tasks.iter_mut() {
            task.adapt_to_delay(additional, now);
        }
        tasks.reheapify_all();
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Return the accumulated downtime and reset it to zero.
    pub fn drain_and_report(&mut self) -> Duration {
        std::mem::take(&mut self.accumulated)
    }
}
