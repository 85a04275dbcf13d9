//! Time source for the scheduler.
//!
//! The event loop never reads the system clock directly; it asks a [`Clock`]
//! for "now" and for a timed wait. Production code uses [`SystemClock`];
//! tests drive virtual time through [`ManualClock`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Wait for `duration`. Errors are reported to the event loop, which
    /// decides whether to fail fast or carry on.
    async fn sleep(&self, duration: Duration) -> Result<()>;
}

/// `at + step`, pinned to the last representable instant instead of
/// overflowing.
pub fn add_saturating(at: DateTime<Utc>, step: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(step)
        .ok()
        .and_then(|step| at.checked_add_signed(step))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Wall clock backed by `chrono::Utc` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) -> Result<()> {
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

/// Virtual clock. `sleep` advances time immediately instead of waiting.
///
/// Clones share the same time, so a test (or a task handler) can hold a
/// clone and move time forward while the scheduler owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = add_saturating(*now, duration);
    }

    /// Jump to an absolute point in time.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) -> Result<()> {
        self.advance(duration);
        tokio::task::yield_now().await;
        Ok(())
    }
}
