pub mod config;
pub mod downtime;
pub mod heap;
pub mod heartbeat;
pub mod scheduler;
pub mod stop;
pub mod task;

pub use config::SchedulerConfig;
pub use downtime::{DowntimeHook, DowntimeTracker, LogDowntime};
pub use heap::KeyedHeap;
pub use heartbeat::Heartbeat;
pub use scheduler::{Scheduler, SchedulerBuilder, SchedulerState, WakeReason, ETERNITY};
pub use stop::StopHandle;
pub use task::{task_heap, RecurringTask, TaskHeap};
