/// Heartbeat task: a keep-alive tick logged at a fixed interval.
///
/// The host registers one per configured task so a running process shows
/// up in the logs even when it has nothing else to do.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use metronome_core::TaskHandler;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Heartbeat {
    name: String,
    ticks: Arc<AtomicU64>,
}

impl Heartbeat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticks logged so far (shared across clones).
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Handler to register with the scheduler.
    pub fn handler(&self) -> TaskHandler {
        let name = self.name.clone();
        let ticks = Arc::clone(&self.ticks);
        Box::new(move || {
            let tick = ticks.fetch_add(1, Ordering::Relaxed) + 1;
            info!(heartbeat = %name, tick, "[Heartbeat] Tick");
            Ok(())
        })
    }
}
