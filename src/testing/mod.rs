//! In-memory test doubles for the host capabilities.
//!
//! - [`MemoryHost`]: registrations, workers, controller and page load state, all
//!   driven explicitly by the test.
//! - [`ManualTimer`]: a [`Timer`](crate::host::Timer) that only advances on demand.
//! - [`Recorder`]: a subscriber that keeps every event it receives.
//!
//! Enabled by the `testing` feature (on by default).

mod host;
mod recorder;
mod timer;

pub use host::{MemoryHost, MemoryRegistration, MemoryWorker};
pub use recorder::Recorder;
pub use timer::ManualTimer;
