//! Worker handles and their lifecycle states.

use std::fmt;
use std::sync::Arc;

/// Identity of one worker instance as assigned by the host.
///
/// Two handles refer to the same worker iff their ids are equal. The tracker
/// never compares handles by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sw#{}", self.0)
    }
}

/// Lifecycle state reported by a worker handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Install event dispatched; script is being installed.
    Installing,
    /// Installed; either waiting for clients to close or about to activate.
    Installed,
    /// Activate event dispatched.
    Activating,
    /// Active and able to control clients.
    Activated,
    /// Replaced by a newer worker or failed to install.
    Redundant,
}

impl WorkerState {
    /// Returns the host's string form of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Handle to one worker instance.
///
/// Implemented by host adapters. `state` must return the **current** state at the
/// time of the call.
pub trait ServiceWorker: Send + Sync + 'static {
    /// Host-assigned identity.
    fn id(&self) -> WorkerId;

    /// Absolute URL of the script this worker runs.
    fn script_url(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> WorkerState;
}

/// Shared worker handle.
pub type WorkerRef = Arc<dyn ServiceWorker>;

impl fmt::Debug for dyn ServiceWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("id", &self.id())
            .field("script_url", &self.script_url())
            .field("state", &self.state())
            .finish()
    }
}

/// Returns true if both optional handles refer to the same worker.
pub(crate) fn same_worker(a: Option<&WorkerRef>, b: Option<&WorkerRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.id() == b.id(),
        _ => false,
    }
}
