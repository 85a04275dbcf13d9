use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::MetronomeError;

/// Zero-argument unit of work run by the scheduler each time a task is due.
pub type TaskHandler = Box<dyn FnMut() -> Result<()> + Send>;

/// Longest accepted task interval (100 years). Longer intervals would push
/// due times past what a timestamp can represent.
pub const MAX_TASK_INTERVAL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Anything that accepts recurring task registrations (the scheduler).
pub trait TaskRegistry {
    /// Register a recurring task. `interval` must be non-zero and at most
    /// [`MAX_TASK_INTERVAL`].
    fn register_task(
        &mut self,
        name: &str,
        handler: TaskHandler,
        interval: Duration,
        fixed_schedule: bool,
    ) -> Result<(), MetronomeError>;
}

/// Lifecycle of a service hosted next to the event loop.
///
/// The host calls `prepare` once before signal handlers are installed,
/// `start` right before the loop is entered and `stop` after it exits,
/// whether or not the loop failed.
#[async_trait]
pub trait Service: Send + Sync {
    /// Human-readable name of this service.
    fn name(&self) -> &str;

    /// Register recurring tasks and acquire resources.
    fn prepare(&mut self, registry: &mut dyn TaskRegistry) -> Result<()>;

    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
