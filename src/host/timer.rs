//! # Delay capability used by the wait disambiguation heuristic.
//!
//! The classifier never sleeps directly; it asks a [`Timer`] for a future that
//! resolves after the delay. [`TokioTimer`] is the runtime implementation; tests
//! substitute a manually advanced clock so both the skip-through and the genuine
//! wait branch run without real time passing.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

/// Produces futures that resolve after a delay.
///
/// Dropping the returned future cancels the delay.
pub trait Timer: Send + Sync + 'static {
    /// Returns a future that completes once `delay` has elapsed.
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// [`Timer`] backed by [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(delay).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_resolves_after_delay() {
        let start = tokio::time::Instant::now();
        TokioTimer.sleep(Duration::from_millis(100)).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
