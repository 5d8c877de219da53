//! # Event subscribers for the tracker.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! classifier / tracker ── emit(Event) ──► SubscriberSet
//!                                              │
//!                                              ├──► Subscribe::on_event(&Event)
//!                                              │         │
//!                                              │    ┌────┴─────┬──────────┐
//!                                              │    ▼          ▼          ▼
//!                                              │  LogWriter  Recorder   Custom
//!                                              │
//!                                              └──► Bus (Tracker::events receivers)
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
