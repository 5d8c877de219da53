//! # Tracker configuration.
//!
//! Provides [`TrackerConfig`] centralized settings for one [`Tracker`](crate::Tracker).
//!
//! ## Sentinel values
//! - `waiting_delay = 0s` → a waiting peer is reported as soon as the classifier
//!   runs again; skip-through detection is effectively disabled.
//! - `bus_capacity = 0` → clamped to 1 by the bus.

use std::time::Duration;

/// Default delay used to tell a genuine wait from a skip-through.
pub const DEFAULT_WAITING_DELAY: Duration = Duration::from_millis(100);

/// Configuration for a tracker.
///
/// ## Field semantics
/// - `waiting_delay`: how long a worker must stay `installed` (with a waiting
///   peer on the registration) before `Waiting` is emitted
/// - `bus_capacity`: ring buffer size of the event bus behind [`Tracker::events`](crate::Tracker::events)
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Wait disambiguation delay.
    ///
    /// A worker that calls skip-waiting during install leaves `installed` almost
    /// immediately. Reaching `activating` inside this window suppresses `Waiting`.
    pub waiting_delay: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind more than `bus_capacity` events observe `Lagged`
    /// and skip older items.
    pub bus_capacity: usize,
}

impl TrackerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for TrackerConfig {
    /// Default configuration:
    ///
    /// - `waiting_delay = 100ms`
    /// - `bus_capacity = 64`
    fn default() -> Self {
        Self {
            waiting_delay: DEFAULT_WAITING_DELAY,
            bus_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let mut cfg = TrackerConfig::default();
        assert_eq!(cfg.waiting_delay, Duration::from_millis(100));
        assert_eq!(cfg.bus_capacity_clamped(), 64);

        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
