//! Timer whose clock only moves when the test says so.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::host::Timer;

#[derive(Default)]
struct Clock {
    now: Duration,
    sleepers: Vec<(Duration, oneshot::Sender<()>)>,
}

/// Manually advanced [`Timer`].
///
/// Each `sleep` registers a deadline relative to the manual clock; [`advance`](Self::advance)
/// moves the clock and wakes every sleeper whose deadline has passed. Dropping a
/// sleep future cancels it.
#[derive(Clone, Default)]
pub struct ManualTimer {
    clock: Arc<Mutex<Clock>>,
}

impl ManualTimer {
    /// Creates a timer at time zero with no sleepers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by` and returns how many sleepers were woken.
    pub fn advance(&self, by: Duration) -> usize {
        let mut clock = self.clock.lock();
        clock.now += by;
        let now = clock.now;

        let (due, rest): (Vec<_>, Vec<_>) = clock
            .sleepers
            .drain(..)
            .partition(|(deadline, _)| *deadline <= now);
        clock.sleepers = rest;

        due.into_iter()
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(_, tx)| tx.send(()))
            .filter(Result::is_ok)
            .count()
    }

    /// Number of sleeps that are neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        self.clock
            .lock()
            .sleepers
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }

    /// Time elapsed on the manual clock.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }
}

impl Timer for ManualTimer {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut clock = self.clock.lock();
            let deadline = clock.now + delay;
            clock.sleepers.push((deadline, tx));
        }
        async move {
            if rx.await.is_err() {
                future::pending::<()>().await;
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTimer")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_advance_wakes_due_sleepers_only() {
        let timer = ManualTimer::new();
        let short = timer.sleep(Duration::from_millis(50));
        let _long = timer.sleep(Duration::from_millis(200));
        assert_eq!(timer.pending(), 2);

        assert_eq!(timer.advance(Duration::from_millis(100)), 1);
        short.await;
        assert_eq!(timer.pending(), 1);
        assert_eq!(timer.now(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_dropped_sleep_is_not_pending() {
        let timer = ManualTimer::new();
        let sleep = timer.sleep(Duration::from_millis(100));
        assert_eq!(timer.pending(), 1);

        drop(sleep);
        assert_eq!(timer.pending(), 0);
        assert_eq!(timer.advance(Duration::from_millis(100)), 0);
    }
}
