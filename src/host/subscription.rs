//! # Narrow subscription capability over host notifications.
//!
//! Host objects deliver three kinds of notifications. Adapters expose them as
//! channels, so the classifier only depends on this trait and never on a concrete
//! host object.
//!
//! ```text
//! subscribe_updates(scope)    ── registration found a new installing worker
//! Topic::StateChange(id)      ── worker `id` changed state
//! Topic::ControllerChange     ── the page's controller changed
//! ```
//!
//! ## Rules
//! - `subscribe` delivers every matching notification until the receiver is dropped.
//! - `subscribe_once` delivers the next matching notification and then detaches.
//! - `subscribe_updates` hands over the installing worker together with a state
//!   subscription the adapter opened **while delivering** `updatefound`. Every
//!   `statechange` of that worker after the update therefore lands in
//!   [`FoundWorker::states`], however late the receiver gets to it.
//! - Dropping a receiver unsubscribes; adapters prune closed senders lazily.

use tokio::sync::{mpsc, oneshot};

use super::worker::{WorkerId, WorkerRef, WorkerState};

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `statechange` on the worker with this id.
    StateChange(WorkerId),
    /// `controllerchange` on the page's worker container.
    ControllerChange,
}

/// A single delivered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The worker entered this state.
    StateChange(WorkerState),
    /// The page's controller changed.
    ControllerChange,
}

/// Receiver for a long-lived subscription.
pub type Subscription = mpsc::UnboundedReceiver<Notification>;

/// Receiver for a one-shot subscription.
pub type OnceSubscription = oneshot::Receiver<Notification>;

/// An `updatefound` delivery: the registration's installing worker at delivery
/// time and its state changes from that moment on.
#[derive(Debug)]
pub struct FoundWorker {
    /// The worker that was installing when `updatefound` fired.
    pub worker: WorkerRef,
    /// `statechange` notifications of `worker`, opened before delivery returned.
    pub states: Subscription,
}

/// Receiver of `updatefound` deliveries for one registration.
pub type UpdateSubscription = mpsc::UnboundedReceiver<FoundWorker>;

/// Subscription capability implemented by host adapters.
pub trait Subscriptions: Send + Sync + 'static {
    /// Subscribes to every notification on `topic`.
    fn subscribe(&self, topic: Topic) -> Subscription;

    /// Subscribes to the next notification on `topic` only.
    fn subscribe_once(&self, topic: Topic) -> OnceSubscription;

    /// Subscribes to `updatefound` on the registration with this scope URL.
    ///
    /// For each delivery the adapter must open the installing worker's state
    /// subscription before any later `statechange` of that worker is dispatched.
    fn subscribe_updates(&self, scope: &str) -> UpdateSubscription;
}
