//! Host environment interfaces.
//!
//! The tracker observes a registration owned by the host (a browser, an embedder,
//! or the in-memory host used in tests). Everything it needs from the host goes
//! through the traits in this module:
//!
//! - [`Host`]: register operation, current-controller accessor, page load state.
//! - [`Subscriptions`]: notification channels keyed by [`Topic`].
//! - [`Registration`] / [`ServiceWorker`]: opaque handles with queryable slots and state.
//! - [`Timer`]: delay capability for the wait heuristic.

mod registration;
mod subscription;
mod timer;
mod worker;

use async_trait::async_trait;
use url::Url;

use crate::error::HostError;

pub use registration::{
    Registration, RegistrationOptions, RegistrationRef, UpdateViaCache, WorkerType,
};
pub use subscription::{
    FoundWorker, Notification, OnceSubscription, Subscription, Subscriptions, Topic,
    UpdateSubscription,
};
pub use timer::{Timer, TokioTimer};
pub use worker::{ServiceWorker, WorkerId, WorkerRef, WorkerState};

pub(crate) use worker::same_worker;

/// Page loading progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Document still loading.
    Loading,
    /// Document parsed, subresources still loading.
    Interactive,
    /// Load event has fired.
    Complete,
}

/// # The host environment as seen by the tracker.
///
/// `controller` is the only way the tracker reads the page's current controller;
/// it is called at the moment of each comparison and never cached.
#[async_trait]
pub trait Host: Subscriptions {
    /// Registers `script_url` with the given options.
    ///
    /// `script_url` is passed exactly as the caller supplied it; resolution against
    /// the page's base URL is the host's job.
    async fn register(
        &self,
        script_url: &str,
        options: &RegistrationOptions,
    ) -> Result<RegistrationRef, HostError>;

    /// Worker currently controlling the page, if any.
    fn controller(&self) -> Option<WorkerRef>;

    /// Current page loading progress.
    fn ready_state(&self) -> ReadyState;

    /// Resolves once the page's load event has fired (immediately if it already has).
    async fn loaded(&self);

    /// URL of the current page.
    fn location(&self) -> Url;

    /// Base URL used to resolve relative script and scope URLs.
    fn base_url(&self) -> Url {
        self.location()
    }
}
