use std::time::Duration;

/// Default oversleep tolerated at wake-up before it counts as downtime.
pub const DEFAULT_MAXIMUM_TIMER_SLACK: Duration = Duration::from_secs(5);

/// Default per-task lateness tolerated before it counts as downtime.
pub const DEFAULT_MINIMUM_DOWNTIME_DURATION: Duration = Duration::from_secs(20);

/// Tuning knobs for the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Oversleep at wake-up above which the delay is tracked as downtime.
    pub maximum_timer_slack: Duration,
    /// Lateness of a single execution above which it is tracked as downtime.
    pub minimum_downtime_duration: Duration,
    /// Fail fast: errors from the wait or from task handlers end `run()`.
    pub debug_mode: bool,
    /// Run a single loop iteration and stop.
    pub single_run: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            maximum_timer_slack: DEFAULT_MAXIMUM_TIMER_SLACK,
            minimum_downtime_duration: DEFAULT_MINIMUM_DOWNTIME_DURATION,
            debug_mode: false,
            single_run: false,
        }
    }
}
