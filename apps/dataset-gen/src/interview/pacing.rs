//! Minimum spacing between consecutive outbound model calls.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Shared across every interview of a run. The first call goes out
/// immediately; each later call waits until `delay` has passed since the
/// previous call finished.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

/// Held for the duration of one outbound call. Dropping it marks the call as
/// finished, which is where the next call's delay is measured from.
#[must_use = "the call is marked finished when this guard is dropped"]
pub struct PacedCall<'a> {
    last: MutexGuard<'a, Option<Instant>>,
}

impl Drop for PacedCall<'_> {
    fn drop(&mut self) {
        *self.last = Some(Instant::now());
    }
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    pub async fn wait(&self) -> PacedCall<'_> {
        let last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.delay).await;
        }
        PacedCall { last }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let pacer = Pacer::new(Duration::from_secs(5));
        let start = Instant::now();
        drop(pacer.wait().await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced_by_delay() {
        let pacer = Pacer::new(Duration::from_secs(5));
        let start = Instant::now();
        for _ in 0..4 {
            drop(pacer.wait().await);
        }
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_time_after_a_call_counts_toward_delay() {
        let pacer = Pacer::new(Duration::from_secs(5));
        drop(pacer.wait().await);
        tokio::time::sleep(Duration::from_secs(3)).await;
        let before = Instant::now();
        drop(pacer.wait().await);
        assert_eq!(before.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_measured_from_end_of_slow_call() {
        let pacer = Pacer::new(Duration::from_secs(5));
        {
            let _call = pacer.wait().await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        let finished = Instant::now();
        drop(pacer.wait().await);
        assert_eq!(finished.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_never_sleeps() {
        let pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            drop(pacer.wait().await);
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
