use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Fixed minimum spacing between consecutive calls.
///
/// Semantics:
/// - The first [`Pacer::ready`] returns immediately.
/// - Every later call waits until `interval` has elapsed since the previous call returned.
///
/// This is a one-token bucket with a refill period of `interval`; there is no burst.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forget the previous call so the next one is not delayed.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Wait time needed before the next call is allowed (zero if ready).
    fn needed_wait(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self.interval.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Sleep as long as needed, then mark the call as issued. Returns the time waited.
    pub async fn ready(&mut self) -> Duration {
        let wait = self.needed_wait(Instant::now());
        if !wait.is_zero() {
            tracing::trace!(target: "rate", wait_ms = wait.as_millis() as u64, "pacer.wait");
            sleep(wait).await;
        }
        self.last = Some(Instant::now());
        wait
    }
}
