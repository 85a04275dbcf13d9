use std::fmt;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use metronome_core::{add_saturating, MetronomeError, TaskHandler, MAX_TASK_INTERVAL};

use crate::heap::KeyedHeap;

/// Heap of recurring tasks keyed by their next due time.
pub type TaskHeap = KeyedHeap<RecurringTask, Option<DateTime<Utc>>, fn(&RecurringTask) -> Option<DateTime<Utc>>>;

/// Create an empty [`TaskHeap`].
pub fn task_heap() -> TaskHeap {
    KeyedHeap::new(RecurringTask::next_execution as fn(&RecurringTask) -> Option<DateTime<Utc>>)
}

/// A periodic unit of work.
///
/// Identity (`name`, handler, interval, cadence) is fixed at construction;
/// only the due time changes as the scheduler runs the task.
pub struct RecurringTask {
    name: String,
    handler: TaskHandler,
    interval: Duration,
    fixed_schedule: bool,
    next_execution: Option<DateTime<Utc>>,
    executions: u64,
}

impl RecurringTask {
    /// Build a task. Fails if `interval` is zero or longer than
    /// [`MAX_TASK_INTERVAL`].
    pub fn new(
        name: impl Into<String>,
        handler: TaskHandler,
        interval: Duration,
        fixed_schedule: bool,
    ) -> Result<Self, MetronomeError> {
        let name = name.into();
        if interval.is_zero() {
            return Err(MetronomeError::InvalidTask {
                name,
                reason: "interval must be positive".into(),
            });
        }
        if interval > MAX_TASK_INTERVAL {
            return Err(MetronomeError::InvalidTask {
                name,
                reason: format!(
                    "interval of {}s exceeds the maximum of {}s",
                    interval.as_secs(),
                    MAX_TASK_INTERVAL.as_secs()
                ),
            });
        }

        Ok(Self {
            name,
            handler,
            interval,
            fixed_schedule,
            next_execution: None,
            executions: 0,
        })
    }

    /// Seed the first due time instead of letting registration pick "now".
    pub fn with_next_execution(mut self, at: DateTime<Utc>) -> Self {
        self.next_execution = Some(at);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn fixed_schedule(&self) -> bool {
        self.fixed_schedule
    }

    pub fn next_execution(&self) -> Option<DateTime<Utc>> {
        self.next_execution
    }

    /// Number of handler invocations so far, failed ones included.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Advance the due time.
    ///
    /// - never scheduled: due `now`
    /// - fixed schedule: previous due time + interval, even if that is
    ///   already in the past
    /// - otherwise: `now` + interval
    ///
    /// Results past the last representable instant saturate there.
    pub fn compute_next_execution_time(&mut self, now: DateTime<Utc>) {
        self.next_execution = Some(match self.next_execution {
            None => now,
            Some(previous) if self.fixed_schedule => add_saturating(previous, self.interval),
            Some(_) => add_saturating(now, self.interval),
        });
    }

    /// Push the due time out by `delay`, but never more than one interval
    /// past `now`.
    pub fn adapt_to_delay(&mut self, delay: Duration, now: DateTime<Utc>) {
        let Some(current) = self.next_execution else {
            return;
        };
        let limit = add_saturating(now, self.interval);
        self.next_execution = Some(add_saturating(current, delay).min(limit));
    }

    /// How far `now` lies past the due time; zero when not yet due.
    pub fn delay_at(&self, now: DateTime<Utc>) -> Duration {
        self.next_execution
            .and_then(|due| (now - due).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Run the handler once.
    pub fn execute(&mut self) -> Result<()> {
        self.executions += 1;
        (self.handler)()
    }
}

impl fmt::Debug for RecurringTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecurringTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("fixed_schedule", &self.fixed_schedule)
            .field("next_execution", &self.next_execution)
            .field("executions", &self.executions)
            .finish_non_exhaustive()
    }
}
