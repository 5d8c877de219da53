//! Registration handles and the options passed to the host's register operation.

use std::fmt;
use std::sync::Arc;

use super::worker::WorkerRef;

/// # Handle to one script-to-scope binding.
///
/// Returned by [`Host::register`](crate::host::Host::register). The three slots
/// mirror the host's view at the time of the call.
pub trait Registration: Send + Sync + 'static {
    /// Absolute scope URL of this registration.
    fn scope(&self) -> &str;

    /// Worker currently installing, if any.
    fn installing(&self) -> Option<WorkerRef>;

    /// Worker installed and waiting to activate, if any.
    fn waiting(&self) -> Option<WorkerRef>;

    /// Active worker, if any.
    fn active(&self) -> Option<WorkerRef>;
}

/// Shared registration handle.
pub type RegistrationRef = Arc<dyn Registration>;

impl fmt::Debug for dyn Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("scope", &self.scope())
            .field("installing", &self.installing().map(|w| w.id()))
            .field("waiting", &self.waiting().map(|w| w.id()))
            .field("active", &self.active().map(|w| w.id()))
            .finish()
    }
}

/// How the host's HTTP cache is consulted when checking for script updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateViaCache {
    /// Bypass the cache for the main script, use it for imported scripts.
    #[default]
    Imports,
    /// Use the cache for every script.
    All,
    /// Bypass the cache for every script.
    None,
}

/// Script flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerType {
    /// Classic script.
    #[default]
    Classic,
    /// ES module.
    Module,
}

/// Options forwarded to the host's register operation.
///
/// `scope = None` lets the host pick its default: the directory of the script URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationOptions {
    /// Scope URL, relative to the page's base URL.
    pub scope: Option<String>,
    /// Cache mode for update checks.
    pub update_via_cache: UpdateViaCache,
    /// Script flavour.
    pub worker_type: WorkerType,
}

impl RegistrationOptions {
    /// Sets the registration scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the cache mode for update checks.
    #[must_use]
    pub fn with_update_via_cache(mut self, mode: UpdateViaCache) -> Self {
        self.update_via_cache = mode;
        self
    }

    /// Sets the script flavour.
    #[must_use]
    pub fn with_worker_type(mut self, worker_type: WorkerType) -> Self {
        self.worker_type = worker_type;
        self
    }
}
