//! # Events emitted by the tracker.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: one per classified transition of the tracked worker
//!   (installing, installed, waiting, activated, controlling, activated-not-controlling)
//! - **Peer event**: a controller already existed when the tracker was built
//! - **Advisory events**: anomalies worth surfacing that never change control flow
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the worker
//! identity and script URL, and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Within one install cycle lifecycle events are emitted in this order:
//! ```text
//! Installing → Installed → (Waiting)? → Activated → Controlling
//!                                                 → ActivatedNotControlling → (Controlling)?
//! ```
//!
//! ## Example
//! ```rust
//! use swvisor::{Event, EventKind, WorkerId};
//!
//! let ev = Event::new(EventKind::Installed)
//!     .with_worker(WorkerId(7))
//!     .with_script("https://example.com/sw.js");
//!
//! assert_eq!(ev.kind, EventKind::Installed);
//! assert_eq!(ev.worker, Some(WorkerId(7)));
//! assert!(ev.kind.is_lifecycle());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::host::{ServiceWorker, WorkerId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of tracker events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Lifecycle events ===
    /// A new worker was found on the registration and is installing.
    ///
    /// Sets: `worker`, `script_url`.
    Installing,

    /// The worker finished installing.
    ///
    /// Sets: `worker`, `script_url`.
    Installed,

    /// The worker stayed installed past the wait delay while another worker was active.
    ///
    /// Sets: `worker`, `script_url`.
    Waiting,

    /// The worker finished activating.
    ///
    /// Sets: `worker`, `script_url`.
    Activated,

    /// The worker controls the page.
    ///
    /// Sets: `worker`, `script_url`.
    Controlling,

    /// The worker is active, but the page is still controlled by another worker (or none).
    ///
    /// Sets: `worker`, `script_url`.
    ActivatedNotControlling,

    // === Peer event ===
    /// A controller existed when the tracker was built; it may now message the page.
    ///
    /// Sets: `worker`, `script_url` (of the existing controller).
    PeerReady,

    // === Advisory events ===
    /// Registration succeeded.
    ///
    /// Sets: `script_url`, `reason` (registration scope).
    Registered,

    /// A worker was already waiting (next to an active one) when registration resolved.
    ///
    /// Sets: `worker` (the waiting one), `script_url`.
    AlreadyWaiting,

    /// The current page is outside the registration scope.
    ///
    /// Sets: `reason` (page path and scope path).
    OutOfScope,

    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `reason` (`subscriber=<name> info=<panic message>`).
    HookPanicked,
}

impl EventKind {
    /// True for the six lifecycle kinds.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            EventKind::Installing
                | EventKind::Installed
                | EventKind::Waiting
                | EventKind::Activated
                | EventKind::Controlling
                | EventKind::ActivatedNotControlling
        )
    }

    /// True for advisory kinds.
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            EventKind::Registered
                | EventKind::AlreadyWaiting
                | EventKind::OutOfScope
                | EventKind::HookPanicked
        )
    }

    /// Returns a short stable label (kebab-case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::Installing => "installing",
            EventKind::Installed => "installed",
            EventKind::Waiting => "waiting",
            EventKind::Activated => "activated",
            EventKind::Controlling => "controlling",
            EventKind::ActivatedNotControlling => "activated-not-controlling",
            EventKind::PeerReady => "peer-ready",
            EventKind::Registered => "registered",
            EventKind::AlreadyWaiting => "already-waiting",
            EventKind::OutOfScope => "out-of-scope",
            EventKind::HookPanicked => "hook-panicked",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Tracker event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker the event is about, if applicable.
    pub worker: Option<WorkerId>,
    /// Script URL of that worker (or of the tracked target).
    pub script_url: Option<Arc<str>>,
    /// Human-readable details.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            script_url: None,
            reason: None,
        }
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, id: WorkerId) -> Self {
        self.worker = Some(id);
        self
    }

    /// Attaches a script URL.
    #[inline]
    pub fn with_script(mut self, script_url: impl Into<Arc<str>>) -> Self {
        self.script_url = Some(script_url.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates an event about `worker`, carrying its id and script URL.
    pub(crate) fn for_worker(kind: EventKind, worker: &dyn ServiceWorker) -> Self {
        Event::new(kind)
            .with_worker(worker.id())
            .with_script(worker.script_url())
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub(crate) fn hook_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::HookPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::Installing);
        let b = Event::new(EventKind::Installed);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_kind_categories_are_disjoint() {
        let all = [
            EventKind::Installing,
            EventKind::Installed,
            EventKind::Waiting,
            EventKind::Activated,
            EventKind::Controlling,
            EventKind::ActivatedNotControlling,
            EventKind::PeerReady,
            EventKind::Registered,
            EventKind::AlreadyWaiting,
            EventKind::OutOfScope,
            EventKind::HookPanicked,
        ];
        for kind in all {
            assert!(!(kind.is_lifecycle() && kind.is_advisory()), "{kind}");
        }
        assert!(!EventKind::PeerReady.is_lifecycle());
        assert!(!EventKind::PeerReady.is_advisory());
    }

    #[test]
    fn test_hook_panicked_reason() {
        let ev = Event::hook_panicked("recorder", "boom".into());
        assert_eq!(ev.kind, EventKind::HookPanicked);
        assert_eq!(ev.reason.as_deref(), Some("subscriber=recorder info=boom"));
    }
}
