//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for reacting to tracker events. It has one
//! override point per lifecycle event plus catch-alls for the peer-ready and
//! advisory events. Every method defaults to a no-op, so implementors override
//! only what they care about.
//!
//! ## Contract
//! - Methods are called **synchronously** by the tracker, in emission order, from
//!   the task that classified the transition. Keep them short; hand off heavy work.
//! - A panic inside a method is caught and reported as
//!   [`EventKind::HookPanicked`]; other subscribers still see the event.
//!
//! ## Example
//! ```rust
//! use swvisor::{Event, Subscribe};
//!
//! struct Banner;
//!
//! impl Subscribe for Banner {
//!     fn waiting(&self, _ev: &Event) {
//!         // show "reload to update" banner
//!     }
//!     fn controlling(&self, _ev: &Event) {
//!         // hide the banner
//!     }
//!     fn name(&self) -> &'static str { "banner" }
//! }
//! ```

use crate::events::{Event, EventKind};

/// Contract for tracker event subscribers.
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    ///
    /// The default implementation dispatches to the per-kind methods below.
    /// Override it to receive every event in one place.
    fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::Installing => self.installing(event),
            EventKind::Installed => self.installed(event),
            EventKind::Waiting => self.waiting(event),
            EventKind::Activated => self.activated(event),
            EventKind::Controlling => self.controlling(event),
            EventKind::ActivatedNotControlling => self.activated_not_controlling(event),
            EventKind::PeerReady => self.peer_ready(event),
            EventKind::Registered
            | EventKind::AlreadyWaiting
            | EventKind::OutOfScope
            | EventKind::HookPanicked => self.advisory(event),
        }
    }

    /// A new worker started installing.
    fn installing(&self, _event: &Event) {}

    /// The worker installed.
    fn installed(&self, _event: &Event) {}

    /// The worker is waiting for other clients to close.
    fn waiting(&self, _event: &Event) {}

    /// The worker activated.
    fn activated(&self, _event: &Event) {}

    /// The worker controls the page.
    fn controlling(&self, _event: &Event) {}

    /// The worker activated but another worker (or none) still controls the page.
    fn activated_not_controlling(&self, _event: &Event) {}

    /// A controller already existed when the tracker was built.
    ///
    /// Hook point for announcing the page to that controller; no message format is
    /// implied.
    fn peer_ready(&self, _event: &Event) {}

    /// Advisory diagnostics (registered, already waiting, out of scope, hook panicked).
    fn advisory(&self, _event: &Event) {}

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
