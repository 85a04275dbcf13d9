use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use metronome_config::TaskConfig;
use metronome_core::{Service, TaskRegistry};
use metronome_scheduler::Heartbeat;

/// Registers one heartbeat task per enabled task entry in the config.
pub struct HeartbeatService {
    tasks: Vec<TaskConfig>,
    heartbeats: Vec<Heartbeat>,
}

impl HeartbeatService {
    pub fn new<'a>(tasks: impl IntoIterator<Item = &'a TaskConfig>) -> Self {
        Self {
            tasks: tasks.into_iter().cloned().collect(),
            heartbeats: Vec::new(),
        }
    }

    pub fn heartbeats(&self) -> &[Heartbeat] {
        &self.heartbeats
    }
}

#[async_trait]
impl Service for HeartbeatService {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn prepare(&mut self, registry: &mut dyn TaskRegistry) -> Result<()> {
        if self.tasks.is_empty() {
            warn!("No heartbeat tasks configured; the event loop will idle");
        }
        for task in &self.tasks {
            let heartbeat = Heartbeat::new(&task.name);
            registry
                .register_task(
                    &task.name,
                    heartbeat.handler(),
                    Duration::from_secs(task.interval_secs),
                    task.fixed_schedule,
                )
                .with_context(|| format!("Cannot register heartbeat '{}'", task.name))?;
            self.heartbeats.push(heartbeat);
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        for hb in &self.heartbeats {
            info!(heartbeat = %hb.name(), ticks = hb.ticks(), "Heartbeat stopped");
        }
        Ok(())
    }
}
