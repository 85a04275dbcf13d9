//! Cross-context stop requests for the event loop.
//!
//! The host's signal handling (SIGTERM/SIGHUP/SIGINT) holds a clone of the
//! [`StopHandle`] and calls [`StopHandle::hang_up`]. The handle only flips a
//! flag and wakes the loop's wait; it never touches the task heap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::info;

#[derive(Debug, Default)]
struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopSignal>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after the current iteration. Idempotent; safe to
    /// call from any thread, before `run()` or after it returned.
    pub fn request_stop(&self) {
        if !self.inner.requested.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_one();
        }
    }

    /// A termination or reload signal arrived.
    pub fn hang_up(&self, signal: &str) {
        info!(signal, "Received signal");
        self.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested.
    pub(crate) async fn stopped(&self) {
        if self.is_stop_requested() {
            return;
        }
        self.inner.notify.notified().await;
    }
}
