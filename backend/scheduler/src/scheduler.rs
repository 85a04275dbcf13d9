use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use metronome_core::{Clock, MetronomeError, SystemClock, TaskHandler, TaskRegistry};

use crate::config::SchedulerConfig;
use crate::downtime::{DowntimeHook, DowntimeTracker, LogDowntime};
use crate::stop::StopHandle;
use crate::task::{task_heap, RecurringTask, TaskHeap};

/// Wait used when no task is registered; only a stop request ends it early.
pub const ETERNITY: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopping,
    Stopped,
}

/// Outcome of the interruptible wait between loop iterations.
#[derive(Debug)]
pub enum WakeReason {
    TimedOut,
    Interrupted,
    Error(anyhow::Error),
}

pub struct SchedulerBuilder {
    config: SchedulerConfig,
    clock: Option<Arc<dyn Clock>>,
    downtime_hook: Option<Box<dyn DowntimeHook>>,
    stop: Option<StopHandle>,
}

impl SchedulerBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            clock: None,
            downtime_hook: None,
            stop: None,
        }
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn downtime_hook(mut self, hook: impl DowntimeHook + 'static) -> Self {
        self.downtime_hook = Some(Box::new(hook));
        self
    }

    /// Share an existing stop handle, e.g. one the signal bridge already holds.
    pub fn stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            config: self.config,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            tasks: task_heap(),
            downtime: DowntimeTracker::new(),
            downtime_hook: self.downtime_hook.unwrap_or_else(|| Box::new(LogDowntime)),
            stop: self.stop.unwrap_or_default(),
            state: SchedulerState::Stopped,
        }
    }
}

/// Single-threaded recurring-task event loop.
///
/// Each iteration sleeps until the earliest task is due (or a stop is
/// requested), then runs every task whose due time has passed in due order.
/// Delay observed at wake-up or per execution feeds the downtime tracker.
pub struct Scheduler {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    tasks: TaskHeap,
    downtime: DowntimeTracker,
    downtime_hook: Box<dyn DowntimeHook>,
    stop: StopHandle,
    state: SchedulerState,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("downtime", &self.downtime)
            .field("stop", &self.stop)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        SchedulerBuilder::new(config).build()
    }

    pub fn builder(config: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(config)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Downtime accumulated in the current iteration and not yet reported.
    pub fn downtime(&self) -> Duration {
        self.downtime.accumulated()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Due time of the earliest task.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.tasks.peek_min().and_then(RecurringTask::next_execution)
    }

    pub fn task(&self, name: &str) -> Option<&RecurringTask> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &RecurringTask> {
        self.tasks.iter()
    }

    /// Register a recurring task; it first becomes due immediately.
    pub fn register<H>(
        &mut self,
        name: impl Into<String>,
        handler: H,
        interval: Duration,
        fixed_schedule: bool,
    ) -> Result<(), MetronomeError>
    where
        H: FnMut() -> Result<()> + Send + 'static,
    {
        let task = RecurringTask::new(name, Box::new(handler), interval, fixed_schedule)?;
        self.add_task(task);
        Ok(())
    }

    /// Insert a task, seeding its due time with "now" unless already set.
    pub fn add_task(&mut self, mut task: RecurringTask) {
        if task.next_execution().is_none() {
            task.compute_next_execution_time(self.clock.now());
        }
        info!(
            task = %task.name(),
            interval_secs = task.interval().as_secs_f64(),
            fixed_schedule = task.fixed_schedule(),
            "Registered recurring task"
        );
        self.tasks.insert(task);
    }

    /// Run the event loop until a stop is requested, a single run completes,
    /// or (in debug mode) an error occurs.
    pub async fn run(&mut self) -> Result<()> {
        self.state = SchedulerState::Running;
        info!(tasks = self.tasks.len(), "Event queue started");

        while self.state == SchedulerState::Running {
            if let Err(e) = self.run_iteration().await {
                if self.config.debug_mode {
                    warn!("Propagating error due to debug_mode=true");
                    self.state = SchedulerState::Stopped;
                    return Err(e);
                }
                error!(error = %format!("{e:#}"), "Error in event queue");
            }

            if self.config.single_run || self.stop.is_stop_requested() {
                self.state = SchedulerState::Stopping;
            }
        }

        self.state = SchedulerState::Stopped;
        info!("Event queue stopped");
        Ok(())
    }

    async fn run_iteration(&mut self) -> Result<()> {
        let now = self.clock.now();
        let head_due = self.next_due();
        let wait = match head_due {
            Some(due) => (due - now).to_std().unwrap_or(Duration::ZERO),
            None => ETERNITY,
        };

        if !wait.is_zero() {
            debug!(seconds = wait.as_secs_f64(), "Sleeping (or until next signal)");

            match self.wait(wait).await {
                WakeReason::TimedOut => debug!("Woken by timer"),
                WakeReason::Interrupted => {
                    info!("Event queue interrupted by signal");
                    self.state = SchedulerState::Stopping;
                }
                WakeReason::Error(e) => {
                    if self.config.debug_mode {
                        return Err(e.context("Error while waiting for next task"));
                    }
                    error!(error = %format!("{e:#}"), "Error while waiting for signal");
                }
            }

            if let Some(due) = head_due {
                let overslept = elapsed_since(due, self.clock.now());
                if overslept > self.config.maximum_timer_slack {
                    self.track_downtime(overslept);
                }
            }
        }

        self.drain_due_tasks()?;

        let downtime = self.downtime.drain_and_report();
        if !downtime.is_zero() {
            self.downtime_hook.handle_downtime(downtime);
        }

        Ok(())
    }

    /// Sleep for `duration` unless a stop request arrives first.
    async fn wait(&self, duration: Duration) -> WakeReason {
        if self.stop.is_stop_requested() {
            return WakeReason::Interrupted;
        }
        tokio::select! {
            biased;
            _ = self.stop.stopped() => WakeReason::Interrupted,
            result = self.clock.sleep(duration) => match result {
                Ok(()) => WakeReason::TimedOut,
                Err(e) => WakeReason::Error(e),
            },
        }
    }

    /// Run every task due at or before now, earliest first. The clock is
    /// re-read before each check since handlers take time.
    fn drain_due_tasks(&mut self) -> Result<()> {
        loop {
            let now = self.clock.now();
            match self.next_due() {
                Some(due) if due <= now => {}
                _ => return Ok(()),
            }
            let Some(mut task) = self.tasks.pop_min() else {
                return Ok(());
            };

            let delay = task.delay_at(now);
            task.compute_next_execution_time(now);

            let name = task.name().to_string();
            let delay_secs = delay.as_secs_f64();
            debug!(task = %name, delay_secs, "Executing task *** START ***");
            let outcome = task.execute();
            // Re-queue before propagating so a failing task keeps its schedule.
            // A failed execution's lateness is not tracked as downtime.
            self.tasks.insert(task);
            outcome.with_context(|| format!("Task '{name}' failed"))?;
            debug!(task = %name, delay_secs, "Executing task *** END ***");

            if delay > self.config.minimum_downtime_duration {
                self.track_downtime(delay);
            }
        }
    }

    fn track_downtime(&mut self, delay: Duration) {
        let now = self.clock.now();
        self.downtime.track(delay, &mut self.tasks, now);
    }
}

impl TaskRegistry for Scheduler {
    fn register_task(
        &mut self,
        name: &str,
        handler: TaskHandler,
        interval: Duration,
        fixed_schedule: bool,
    ) -> Result<(), MetronomeError> {
        let task = RecurringTask::new(name, handler, interval, fixed_schedule)?;
        self.add_task(task);
        Ok(())
    }
}

fn elapsed_since(due: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - due).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use metronome_core::ManualClock;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(secs)
    }

    fn single_run() -> SchedulerConfig {
        SchedulerConfig {
            single_run: true,
            ..Default::default()
        }
    }

    /// Handler that records the virtual time of every invocation.
    fn recorder(clock: &ManualClock, log: &Arc<Mutex<Vec<DateTime<Utc>>>>) -> TaskHandler {
        let clock = clock.clone();
        let log = Arc::clone(log);
        Box::new(move || {
            log.lock().unwrap().push(clock.now());
            Ok(())
        })
    }

    #[tokio::test]
    async fn drifting_task_reschedules_from_execution_time() {
        let clock = ManualClock::new(t0());
        let runs = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::builder(single_run()).clock(clock.clone()).build();
        scheduler
            .register_task("a", recorder(&clock, &runs), Duration::from_secs(10), false)
            .unwrap();

        // Registration makes the task due at once.
        scheduler.run().await.unwrap();
        assert_eq!(*runs.lock().unwrap(), vec![at(0)]);
        assert_eq!(scheduler.next_due(), Some(at(10)));

        // Next run happens at t=10 and reschedules from there.
        scheduler.run().await.unwrap();
        assert_eq!(*runs.lock().unwrap(), vec![at(0), at(10)]);
        assert_eq!(scheduler.next_due(), Some(at(20)));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn handler_runtime_shifts_drifting_schedule() {
        let clock = ManualClock::new(t0());
        let slow_clock = clock.clone();
        let mut scheduler = Scheduler::builder(single_run()).clock(clock.clone()).build();
        scheduler
            .register(
                "slow",
                move || {
                    slow_clock.advance(Duration::from_secs(3));
                    Ok(())
                },
                Duration::from_secs(10),
                false,
            )
            .unwrap();

        scheduler.run().await.unwrap();
        // Next due is computed before the handler runs.
        assert_eq!(scheduler.next_due(), Some(at(10)));
        assert_eq!(clock.now(), at(3));
    }

    #[tokio::test]
    async fn fixed_task_executes_once_and_tracks_downtime_after_long_stall() {
        let clock = ManualClock::new(at(35));
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);
        let mut scheduler = Scheduler::builder(single_run())
            .clock(clock.clone())
            .downtime_hook(move |d: Duration| sink.lock().unwrap().push(d))
            .build();
        let task = RecurringTask::new("b", Box::new(|| Ok(())), Duration::from_secs(10), true)
            .unwrap()
            .with_next_execution(at(0));
        scheduler.add_task(task);

        scheduler.run().await.unwrap();

        let b = scheduler.task("b").unwrap();
        assert_eq!(b.executions(), 1);
        // 10 + 35 shifted, clamped to now + interval.
        assert_eq!(b.next_execution(), Some(at(45)));
        assert_eq!(*reported.lock().unwrap(), vec![Duration::from_secs(35)]);
        assert_eq!(scheduler.downtime(), Duration::ZERO);
    }

    #[tokio::test]
    async fn fixed_task_catches_up_when_delay_is_tolerated() {
        let clock = ManualClock::new(at(35));
        let config = SchedulerConfig {
            minimum_downtime_duration: Duration::from_secs(3_600),
            ..single_run()
        };
        let mut scheduler = Scheduler::builder(config).clock(clock.clone()).build();
        let task = RecurringTask::new("b", Box::new(|| Ok(())), Duration::from_secs(10), true)
            .unwrap()
            .with_next_execution(at(0));
        scheduler.add_task(task);

        scheduler.run().await.unwrap();

        // Due at 0, 10, 20, 30; next at 40 is beyond now.
        let b = scheduler.task("b").unwrap();
        assert_eq!(b.executions(), 4);
        assert_eq!(b.next_execution(), Some(at(40)));
    }

    #[tokio::test]
    async fn overdue_tasks_run_in_due_order_in_one_drain() {
        let clock = ManualClock::new(at(10));
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::builder(single_run()).clock(clock.clone()).build();
        for (name, due) in [("third", 3), ("first", 1), ("second", 2), ("future", 11)] {
            let order = Arc::clone(&order);
            let label = name.to_string();
            let task = RecurringTask::new(
                name,
                Box::new(move || {
                    order.lock().unwrap().push(label.clone());
                    Ok(())
                }),
                Duration::from_secs(60),
                false,
            )
            .unwrap()
            .with_next_execution(at(due));
            scheduler.add_task(task);
        }

        scheduler.run().await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        // No sleep happened: the clock never moved towards "future".
        assert_eq!(clock.now(), at(10));
    }

    #[tokio::test]
    async fn tasks_due_at_same_time_share_a_drain() {
        let clock = ManualClock::new(t0());
        let runs = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::builder(single_run()).clock(clock.clone()).build();
        for name in ["x", "y"] {
            let task = RecurringTask::new(name, recorder(&clock, &runs), Duration::from_secs(30), false)
                .unwrap()
                .with_next_execution(at(5));
            scheduler.add_task(task);
        }

        scheduler.run().await.unwrap();

        assert_eq!(*runs.lock().unwrap(), vec![at(5), at(5)]);
    }

    #[tokio::test]
    async fn oversleep_beyond_slack_is_reported() {
        struct LateClock(ManualClock);

        #[async_trait]
        impl Clock for LateClock {
            fn now(&self) -> DateTime<Utc> {
                self.0.now()
            }

            async fn sleep(&self, duration: Duration) -> Result<()> {
                // The OS wakes us 8 s late.
                self.0.advance(duration + Duration::from_secs(8));
                Ok(())
            }
        }

        let clock = ManualClock::new(t0());
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);
        let config = SchedulerConfig {
            minimum_downtime_duration: Duration::from_secs(3_600),
            ..single_run()
        };
        let mut scheduler = Scheduler::builder(config)
            .clock(LateClock(clock.clone()))
            .downtime_hook(move |d: Duration| sink.lock().unwrap().push(d))
            .build();
        let task = RecurringTask::new("late", Box::new(|| Ok(())), Duration::from_secs(60), false)
            .unwrap()
            .with_next_execution(at(10));
        scheduler.add_task(task);

        scheduler.run().await.unwrap();

        assert_eq!(*reported.lock().unwrap(), vec![Duration::from_secs(8)]);
        // Shifted by the oversleep, then executed and rescheduled from now.
        assert_eq!(scheduler.task("late").unwrap().executions(), 1);
        assert_eq!(scheduler.next_due(), Some(at(18 + 60)));
    }

    #[tokio::test]
    async fn oversleep_within_slack_is_ignored() {
        let clock = ManualClock::new(t0());
        let reported = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&reported);
        let mut scheduler = Scheduler::builder(single_run())
            .clock(clock.clone())
            .downtime_hook(move |_d: Duration| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let task = RecurringTask::new("t", Box::new(|| Ok(())), Duration::from_secs(60), false)
            .unwrap()
            .with_next_execution(at(10));
        scheduler.add_task(task);

        scheduler.run().await.unwrap();

        assert_eq!(reported.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn debug_mode_propagates_handler_error() {
        let clock = ManualClock::new(t0());
        let config = SchedulerConfig {
            debug_mode: true,
            ..Default::default()
        };
        let mut scheduler = Scheduler::builder(config).clock(clock).build();
        scheduler
            .register("boom", || anyhow::bail!("handler exploded"), Duration::from_secs(5), false)
            .unwrap();

        let err = scheduler.run().await.unwrap_err();

        assert!(format!("{err:#}").contains("handler exploded"));
        assert!(err.to_string().contains("boom"));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        // The failing task is still scheduled.
        assert_eq!(scheduler.task_count(), 1);
    }

    #[tokio::test]
    async fn fail_soft_keeps_running_after_handler_error() {
        let clock = ManualClock::new(t0());
        let mut scheduler = Scheduler::builder(SchedulerConfig::default())
            .clock(clock.clone())
            .build();
        let stop = scheduler.stop_handle();

        let mut calls = 0;
        scheduler
            .register(
                "flaky",
                move || {
                    calls += 1;
                    anyhow::ensure!(calls > 1, "first call fails");
                    Ok(())
                },
                Duration::from_secs(5),
                false,
            )
            .unwrap();

        let healthy = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&healthy);
        scheduler
            .register(
                "healthy",
                move || {
                    if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                        stop.request_stop();
                    }
                    Ok(())
                },
                Duration::from_secs(5),
                false,
            )
            .unwrap();

        scheduler.run().await.unwrap();

        assert_eq!(healthy.load(Ordering::SeqCst), 3);
        assert!(scheduler.task("flaky").unwrap().executions() >= 3);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    struct FailingClock(ManualClock);

    #[async_trait]
    impl Clock for FailingClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.now()
        }

        async fn sleep(&self, duration: Duration) -> Result<()> {
            self.0.advance(duration);
            anyhow::bail!("timer unavailable")
        }
    }

    #[tokio::test]
    async fn debug_mode_propagates_wait_error() {
        let config = SchedulerConfig {
            debug_mode: true,
            ..Default::default()
        };
        let mut scheduler = Scheduler::builder(config)
            .clock(FailingClock(ManualClock::new(t0())))
            .build();

        let err = scheduler.run().await.unwrap_err();
        assert!(format!("{err:#}").contains("timer unavailable"));
    }

    #[tokio::test]
    async fn fail_soft_treats_wait_error_as_wake() {
        let clock = ManualClock::new(t0());
        let mut scheduler = Scheduler::builder(single_run())
            .clock(FailingClock(clock.clone()))
            .build();
        let task = RecurringTask::new("t", Box::new(|| Ok(())), Duration::from_secs(60), false)
            .unwrap()
            .with_next_execution(at(10));
        scheduler.add_task(task);

        scheduler.run().await.unwrap();

        assert_eq!(scheduler.task("t").unwrap().executions(), 1);
    }

    #[tokio::test]
    async fn stop_requested_before_run_exits_without_sleeping() {
        let clock = ManualClock::new(t0());
        let mut scheduler = Scheduler::builder(SchedulerConfig::default())
            .clock(clock.clone())
            .build();
        let task = RecurringTask::new("later", Box::new(|| Ok(())), Duration::from_secs(60), false)
            .unwrap()
            .with_next_execution(at(30));
        scheduler.add_task(task);

        scheduler.request_stop();
        scheduler.request_stop();
        scheduler.run().await.unwrap();

        assert_eq!(clock.now(), t0());
        assert_eq!(scheduler.task("later").unwrap().executions(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        // Further requests after the loop stopped are harmless.
        scheduler.stop_handle().request_stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn hang_up_interrupts_eternal_wait() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        let stop = scheduler.stop_handle();

        let signal = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.hang_up("SIGTERM");
        });

        tokio::time::timeout(Duration::from_secs(5), scheduler.run())
            .await
            .expect("hang-up should end the wait")
            .unwrap();
        signal.await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn stop_requested_mid_handler_ends_loop_after_drain() {
        let clock = ManualClock::new(t0());
        let mut scheduler = Scheduler::builder(SchedulerConfig::default())
            .clock(clock.clone())
            .build();
        let stop = scheduler.stop_handle();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        scheduler
            .register(
                "once",
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // A signal arrives mid-handler; the handler completes.
                    stop.hang_up("SIGINT");
                    Ok(())
                },
                Duration::from_secs(10),
                false,
            )
            .unwrap();

        scheduler.run().await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    /// Clock whose sleep reaches its deadline, then a hang-up arrives before
    /// the timer fires.
    struct HangUpDuringSleep {
        clock: ManualClock,
        stop: StopHandle,
        sleeps: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Clock for HangUpDuringSleep {
        fn now(&self) -> DateTime<Utc> {
            self.clock.now()
        }

        async fn sleep(&self, duration: Duration) -> Result<()> {
            self.sleeps.fetch_add(1, Ordering::SeqCst);
            self.clock.advance(duration);
            self.stop.hang_up("SIGTERM");
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn hang_up_during_sleep_drains_due_work_then_stops() {
        let clock = ManualClock::new(t0());
        let stop = StopHandle::new();
        let sleeps = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::builder(SchedulerConfig::default())
            .clock(HangUpDuringSleep {
                clock: clock.clone(),
                stop: stop.clone(),
                sleeps: Arc::clone(&sleeps),
            })
            .stop_handle(stop)
            .build();
        let log = Arc::new(Mutex::new(Vec::new()));
        let task = RecurringTask::new("due", recorder(&clock, &log), Duration::from_secs(60), false)
            .unwrap()
            .with_next_execution(at(10));
        scheduler.add_task(task);

        tokio::time::timeout(Duration::from_secs(5), scheduler.run())
            .await
            .expect("hang-up should end the loop")
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec![at(10)]);
        assert_eq!(sleeps.load(Ordering::SeqCst), 1);
        assert_eq!(clock.now(), at(10));
        assert_eq!(scheduler.task("due").unwrap().next_execution(), Some(at(70)));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn failed_late_execution_is_not_tracked_as_downtime() {
        let clock = ManualClock::new(t0());
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);
        let mut scheduler = Scheduler::builder(single_run())
            .clock(clock.clone())
            .downtime_hook(move |d: Duration| sink.lock().unwrap().push(d))
            .build();
        let task = RecurringTask::new(
            "late",
            Box::new(|| -> Result<()> { anyhow::bail!("backend unavailable") }),
            Duration::from_secs(60),
            false,
        )
        .unwrap()
        .with_next_execution(at(-100));
        scheduler.add_task(task);

        scheduler.run().await.unwrap();

        assert_eq!(scheduler.task("late").unwrap().executions(), 1);
        assert!(reported.lock().unwrap().is_empty());
        assert_eq!(scheduler.downtime(), Duration::ZERO);
    }

    #[tokio::test]
    async fn huge_interval_is_rejected_and_maximum_runs_without_overflow() {
        let clock = ManualClock::new(t0());
        let mut scheduler = Scheduler::builder(single_run()).clock(clock.clone()).build();

        let err = scheduler
            .register("huge", || Ok(()), Duration::from_secs(10_000_000_000_000), false)
            .unwrap_err();
        assert!(matches!(err, MetronomeError::InvalidTask { .. }));

        scheduler
            .register("century", || Ok(()), metronome_core::MAX_TASK_INTERVAL, true)
            .unwrap();
        scheduler.run().await.unwrap();

        assert_eq!(scheduler.task("century").unwrap().executions(), 1);
        assert!(scheduler.next_due().unwrap() > t0());
    }

    #[tokio::test]
    async fn empty_scheduler_single_run_sleeps_eternity() {
        let clock = ManualClock::new(t0());
        let mut scheduler = Scheduler::builder(single_run()).clock(clock.clone()).build();

        scheduler.run().await.unwrap();

        assert_eq!(clock.now(), t0() + chrono::Duration::from_std(ETERNITY).unwrap());
    }

    #[test]
    fn registration_rejects_zero_interval() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        let err = scheduler
            .register("bad", || Ok(()), Duration::ZERO, false)
            .unwrap_err();
        assert!(matches!(err, MetronomeError::InvalidTask { .. }));
        assert_eq!(scheduler.task_count(), 0);
    }
}
