//! # swvisor
//!
//! **swvisor** observes the lifecycle of a service worker registration and turns
//! the host's raw notifications into a small, ordered, deduplicated stream of
//! lifecycle events.
//!
//! The host environment (a browser binding, an embedder, or the in-memory host in
//! [`testing`]) owns the actual registration and install machinery. The crate only
//! consumes it through the traits in [`host`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │  Host (register, controller, page load, notifications)            │
//!  └──────┬──────────────────────┬───────────────────────┬─────────────┘
//!         │ updatefound          │ statechange           │ controllerchange
//!         ▼                      ▼                       ▼
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │  Classifier (one task per registered Tracker)                     │
//!  │  - current install cycle (worker, emitted set, wait timer)        │
//!  │  - Timer (wait heuristic, injectable)                             │
//!  └─────────────────────────────────┬─────────────────────────────────┘
//!                                    │ Installing, Installed, Waiting,
//!                                    │ Activated, Controlling, ...
//!                                    ▼
//!                          ┌───────────────────┐
//!  Tracker ── PeerReady ─► │   SubscriberSet   │ ◄── Registered, AlreadyWaiting,
//!                          └───┬───────────┬───┘     OutOfScope (Tracker)
//!                              ▼           ▼
//!                        sub.on_event()   Bus (Tracker::events receivers)
//! ```
//!
//! ### Lifecycle of one install cycle
//! ```text
//! updatefound ──► Installing
//!   statechange installed ──► Installed
//!     ├─ waiting worker present ─► arm timer (TrackerConfig::waiting_delay)
//!     │     ├─ timer fires, still installed ─► Waiting
//!     │     └─ activating first ─────────────► (skip-through, no Waiting)
//!   statechange activated ──► Activated
//!     ├─ controller == worker ─► Controlling
//!     └─ otherwise ────────────► ActivatedNotControlling
//!           └─ controllerchange to worker ─► Controlling
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Tracking**      | Register a script and observe its lifecycle.                 | [`Tracker`], [`TrackerBuilder`]           |
//! | **Subscriber API**| React to lifecycle, peer-ready and advisory events.          | [`Subscribe`], [`Event`], [`EventKind`]   |
//! | **Host**          | Capabilities the tracker consumes.                           | [`host::Host`], [`host::Timer`]           |
//! | **Errors**        | Typed registration errors.                                   | [`RegisterError`], [`HostError`]          |
//! | **Configuration** | Wait heuristic and bus sizing.                               | [`TrackerConfig`]                         |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//! - `testing`: exports the [`testing`] module with an in-memory host, a manual
//!   timer and a recording subscriber. Off by default; the crate's own tests
//!   enable it through a dev-dependency.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use swvisor::host::WorkerState;
//! use swvisor::testing::{MemoryHost, Recorder};
//! use swvisor::{EventKind, RegisterOptions, Subscribe, Tracker};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = MemoryHost::new("https://example.com/")?;
//!     let recorder = Arc::new(Recorder::new());
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
//!
//!     let tracker = Tracker::builder(host.clone(), "/sw.js")
//!         .with_subscribers(subs)
//!         .build();
//!     let mut events = tracker.events();
//!     tracker.register(RegisterOptions::immediate()).await?;
//!
//!     // first install, driven straight through
//!     let worker = host.begin_install("/sw.js");
//!     host.set_state(&worker, WorkerState::Installed);
//!     host.set_state(&worker, WorkerState::Activating);
//!     host.set_state(&worker, WorkerState::Activated);
//!     host.claim(&worker);
//!     while events.recv().await?.kind != EventKind::Controlling {}
//!
//!     assert_eq!(
//!         recorder.lifecycle(),
//!         vec![EventKind::Installing, EventKind::Installed, EventKind::Activated, EventKind::Controlling],
//!     );
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;

pub mod host;

// ---- Public re-exports ----

pub use crate::core::{
    RegisterOptions, Target, Tracker, TrackerBuilder, TrackerConfig, DEFAULT_WAITING_DELAY,
};
pub use error::{HostError, RegisterError};
pub use events::{Bus, Event, EventKind};
pub use host::{WorkerId, WorkerState};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

// Optional: in-memory host and helpers for tests.
// Enable with: `--features testing`
#[cfg(feature = "testing")]
pub mod testing;
