//! Tracker core: registration and lifecycle classification.
//!
//! The public API from this module is [`Tracker`] (with its [`TrackerBuilder`]),
//! [`TrackerConfig`] and the small descriptor types passed to them.
//!
//! Internal modules:
//! - [`tracker`]: registration, advisory checks, classifier spawn;
//! - [`classifier`]: the per-cycle transition state machine;
//! - [`scope`]: URL helpers for scope defaulting and script comparison;
//! - [`builder`]: assembles the bus, subscribers and timer.

mod builder;
mod classifier;
mod config;
mod scope;
mod tracker;

pub use builder::TrackerBuilder;
pub use config::{TrackerConfig, DEFAULT_WAITING_DELAY};
pub use tracker::{RegisterOptions, Target, Tracker};
