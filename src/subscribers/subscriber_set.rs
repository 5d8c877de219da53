//! # Ordered, panic-isolated fan-out to subscribers.
//!
//! [`SubscriberSet`] delivers every event to each subscriber in registration
//! order and then publishes it on the [`Bus`].
//!
//! ```text
//! emit(event)
//!     ├──► subscriber1.on_event()  ── panic → HookPanicked (after the loop)
//!     ├──► subscriber2.on_event()
//!     ├──► subscriberN.on_event()
//!     └──► bus.publish(event)
//! ```
//!
//! ## Rules
//! - **Synchronous**: `emit()` returns after every subscriber has run.
//! - **Per-subscriber FIFO**: each subscriber sees events in emission order.
//! - **Isolation**: a panicking subscriber does not stop delivery to the others.
//! - **No loops**: a panic while handling `HookPanicked` is logged, not re-emitted.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Fan-out coordinator for tracker subscribers.
pub struct SubscriberSet {
    subs: Vec<Arc<dyn Subscribe>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a set delivering to `subs` and publishing on `bus`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        Self { subs, bus }
    }

    /// Delivers `event` to every subscriber, then publishes it on the bus.
    pub fn emit(&self, event: Event) {
        let mut panics = Vec::new();
        for sub in &self.subs {
            let res = panic::catch_unwind(AssertUnwindSafe(|| sub.on_event(&event)));
            if let Err(panic_err) = res {
                let info = panic_message(panic_err.as_ref());
                tracing::warn!(
                    subscriber = sub.name(),
                    event = %event.kind,
                    %info,
                    "subscriber panicked"
                );
                panics.push(Event::hook_panicked(sub.name(), info));
            }
        }

        let is_panic_evt = matches!(event.kind, EventKind::HookPanicked);
        self.bus.publish(event);

        if !is_panic_evt {
            for ev in panics {
                self.emit(ev);
            }
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// True if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}

impl fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("subs", &self.subs.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
