//! Host lifecycle: prepare services, install signal handling, run the event
//! loop, always stop services.

use anyhow::{Context, Result};
use tracing::{error, info};

use metronome_core::Service;
use metronome_scheduler::{Scheduler, StopHandle};

use crate::signals;

pub struct App {
    name: String,
    scheduler: Scheduler,
    services: Vec<Box<dyn Service>>,
    handle_signals: bool,
}

impl App {
    pub fn new(name: impl Into<String>, scheduler: Scheduler) -> Self {
        Self {
            name: name.into(),
            scheduler,
            services: Vec::new(),
            handle_signals: true,
        }
    }

    pub fn with_service(mut self, service: impl Service + 'static) -> Self {
        self.services.push(Box::new(service));
        self
    }

    /// Skip OS signal handling; stops then only arrive via [`Self::stop_handle`].
    pub fn without_signal_handling(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.scheduler.stop_handle()
    }

    pub async fn run(mut self) -> Result<Scheduler> {
        info!(app = %self.name, services = self.services.len(), "Starting app");

        for service in &mut self.services {
            service
                .prepare(&mut self.scheduler)
                .with_context(|| format!("Cannot prepare service '{}'", service.name()))?;
        }

        let bridge = if self.handle_signals {
            Some(signals::install(self.scheduler.stop_handle())?)
        } else {
            None
        };

        let result = self.start_and_run().await;

        for service in self.services.iter_mut().rev() {
            if let Err(e) = service.stop().await {
                error!(service = %service.name(), error = %format!("{e:#}"), "Error while stopping service");
            }
        }
        if let Some(bridge) = bridge {
            bridge.abort();
        }

        info!(app = %self.name, "Terminating app");
        result.map(|()| self.scheduler)
    }

    async fn start_and_run(&mut self) -> Result<()> {
        for service in &mut self.services {
            info!(service = %service.name(), "Starting service");
            service
                .start()
                .await
                .with_context(|| format!("Cannot start service '{}'", service.name()))?;
        }
        self.scheduler.run().await
    }
}
