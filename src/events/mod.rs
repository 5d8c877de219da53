//! Tracker events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Tracker` (peer-ready, advisory events) and the classifier task
//!   (lifecycle events), both through `SubscriberSet::emit`.
//! - **Consumers**: [`Subscribe`](crate::Subscribe) implementations (synchronously,
//!   in emission order) and receivers from [`Tracker::events`](crate::Tracker::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
