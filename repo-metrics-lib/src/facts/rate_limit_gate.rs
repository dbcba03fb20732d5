use crate::Result;
use core::time::Duration;
use ohno::app_err;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Holds back every outgoing request while the upstream quota is exhausted.
///
/// All requests wait on [`RateLimitGate::wait`] before being sent. When a response
/// reports an exhausted quota, [`RateLimitGate::pause_for`] closes the gate until
/// the quota resets, so callers sharing the gate wait once instead of each
/// discovering the limit on their own.
///
/// When multiple callers pause the gate, the longest pause wins.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    resume_at: Mutex<Option<Instant>>,
}

impl RateLimitGate {
    /// Minimum extension required for a new pause to override an active one.
    /// Prevents callers that observed the same reset time from each "winning"
    /// the pause due to tiny `Instant::now()` drift between calls.
    const MIN_PAUSE_EXTENSION: Duration = Duration::from_secs(1);

    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Close the gate for `duration`.
    ///
    /// Returns `true` only when a new pause is established; a similar or longer
    /// pause already in effect makes this a no-op.
    pub fn pause_for(&self, duration: Duration) -> bool {
        let new_resume_at = Instant::now() + duration;

        let mut guard = self.resume_at.lock().expect("lock not poisoned");
        if guard.is_some_and(|existing| existing + Self::MIN_PAUSE_EXTENSION >= new_resume_at) {
            return false;
        }

        *guard = Some(new_resume_at);
        true
    }

    /// Returns whether the gate is currently closed.
    pub fn is_paused(&self) -> bool {
        self.pending_resume().is_some()
    }

    /// Wait until the gate opens.
    ///
    /// Fails only when `cancel` fires first. A pause extended while waiting is honored.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        while let Some(resume_at) = self.pending_resume() {
            tokio::select! {
                () = cancel.cancelled() => return Err(app_err!("cancelled while waiting for the rate limit to reset")),
                () = tokio::time::sleep_until(resume_at) => {}
            }
        }

        Ok(())
    }

    fn pending_resume(&self) -> Option<Instant> {
        let mut guard = self.resume_at.lock().expect("lock not poisoned");
        match *guard {
            Some(resume_at) if resume_at > Instant::now() => Some(resume_at),
            _ => {
                *guard = None;
                None
            }
        }
    }
}
