//! In-memory host: registrations, workers and notifications driven by the test.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use crate::error::HostError;
use crate::host::{
    FoundWorker, Host, Notification, OnceSubscription, ReadyState, Registration,
    RegistrationOptions, RegistrationRef, ServiceWorker, Subscription, Subscriptions, Topic,
    UpdateSubscription, WorkerId, WorkerRef, WorkerState,
};

/// Worker handle owned by [`MemoryHost`]. Its state only changes through
/// [`MemoryHost::set_state`].
#[derive(Debug)]
pub struct MemoryWorker {
    id: WorkerId,
    script_url: String,
    state: Mutex<WorkerState>,
}

impl ServiceWorker for MemoryWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn script_url(&self) -> &str {
        &self.script_url
    }

    fn state(&self) -> WorkerState {
        *self.state.lock()
    }
}

#[derive(Debug, Default)]
struct Slots {
    installing: Option<Arc<MemoryWorker>>,
    waiting: Option<Arc<MemoryWorker>>,
    active: Option<Arc<MemoryWorker>>,
}

/// Registration handle owned by [`MemoryHost`].
#[derive(Debug)]
pub struct MemoryRegistration {
    scope: String,
    slots: Mutex<Slots>,
}

fn to_ref(worker: &Option<Arc<MemoryWorker>>) -> Option<WorkerRef> {
    worker.clone().map(|w| w as WorkerRef)
}

fn holds(slot: &Option<Arc<MemoryWorker>>, id: WorkerId) -> bool {
    slot.as_ref().is_some_and(|w| w.id == id)
}

impl Registration for MemoryRegistration {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn installing(&self) -> Option<WorkerRef> {
        to_ref(&self.slots.lock().installing)
    }

    fn waiting(&self) -> Option<WorkerRef> {
        to_ref(&self.slots.lock().waiting)
    }

    fn active(&self) -> Option<WorkerRef> {
        to_ref(&self.slots.lock().active)
    }
}

#[derive(Default)]
struct Inner {
    registrations: Vec<Arc<MemoryRegistration>>,
    controller: Option<Arc<MemoryWorker>>,
    fail_next: Option<HostError>,
    register_calls: usize,
    streams: HashMap<Topic, Vec<mpsc::UnboundedSender<Notification>>>,
    once: HashMap<Topic, Vec<oneshot::Sender<Notification>>>,
    updates: HashMap<String, Vec<mpsc::UnboundedSender<FoundWorker>>>,
}

impl Inner {
    fn notify(&mut self, topic: &Topic, notification: Notification) {
        if let Some(streams) = self.streams.get_mut(topic) {
            streams.retain(|tx| tx.send(notification).is_ok());
        }
        if let Some(once) = self.once.remove(topic) {
            for tx in once {
                let _ = tx.send(notification);
            }
        }
    }

    /// Delivers `updatefound` for `worker`. Each delivery carries a state stream
    /// that is registered before this returns.
    fn notify_update(&mut self, scope: &str, worker: &Arc<MemoryWorker>) {
        let Inner {
            updates, streams, ..
        } = self;
        let Some(senders) = updates.get_mut(scope) else {
            return;
        };
        senders.retain(|tx| {
            let (state_tx, states) = mpsc::unbounded_channel();
            let found = FoundWorker {
                worker: Arc::clone(worker) as WorkerRef,
                states,
            };
            if tx.send(found).is_err() {
                return false;
            }
            streams
                .entry(Topic::StateChange(worker.id))
                .or_default()
                .push(state_tx);
            true
        });
    }
}

/// # Host environment kept entirely in memory.
///
/// Mirrors the ordering guarantees of a browser: registration slots are updated
/// before the matching `statechange` is delivered, and `controllerchange` is
/// delivered after the controller was replaced.
///
/// The page starts out loaded ([`ReadyState::Complete`]); use
/// [`set_ready_state`](Self::set_ready_state) to simulate a page that is still loading.
///
/// ## Example
/// ```rust
/// use swvisor::host::{Host, RegistrationOptions, ServiceWorker, WorkerState};
/// use swvisor::testing::MemoryHost;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let host = MemoryHost::new("https://example.com/")?;
/// let registration = host.register("/sw.js", &RegistrationOptions::default()).await?;
///
/// let worker = host.begin_install("/sw.js");
/// assert_eq!(registration.installing().map(|w| w.id()), Some(worker.id()));
///
/// host.set_state(&worker, WorkerState::Installed);
/// assert_eq!(registration.waiting().map(|w| w.id()), Some(worker.id()));
/// # Ok(())
/// # }
/// ```
pub struct MemoryHost {
    location: Url,
    ready: watch::Sender<ReadyState>,
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl MemoryHost {
    /// Creates a loaded page at `location` with no registrations and no controller.
    pub fn new(location: &str) -> Result<Arc<Self>, url::ParseError> {
        let location = Url::parse(location)?;
        let (ready, _) = watch::channel(ReadyState::Complete);
        Ok(Arc::new(Self {
            location,
            ready,
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner::default()),
        }))
    }

    /// Sets the page's loading progress; `Complete` releases pending `loaded()` calls.
    pub fn set_ready_state(&self, state: ReadyState) {
        self.ready.send_replace(state);
    }

    /// Fires the page's load event.
    pub fn finish_loading(&self) {
        self.set_ready_state(ReadyState::Complete);
    }

    /// Makes the next `register` call fail with `err`.
    pub fn fail_next_register(&self, err: HostError) {
        self.inner.lock().fail_next = Some(err);
    }

    /// Number of `register` calls received so far, successful or not.
    pub fn register_calls(&self) -> usize {
        self.inner.lock().register_calls
    }

    /// Most recently created registration.
    pub fn registration(&self) -> Option<Arc<MemoryRegistration>> {
        self.inner.lock().registrations.last().cloned()
    }

    /// Current controller.
    pub fn controller_worker(&self) -> Option<Arc<MemoryWorker>> {
        self.inner.lock().controller.clone()
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        let inner = self.inner.lock();
        let streams = inner
            .streams
            .get(topic)
            .map_or(0, |v| v.iter().filter(|tx| !tx.is_closed()).count());
        let once = inner
            .once
            .get(topic)
            .map_or(0, |v| v.iter().filter(|tx| !tx.is_closed()).count());
        streams + once
    }

    /// Number of live `updatefound` subscriptions on the registration with `scope`.
    pub fn update_subscriber_count(&self, scope: &str) -> usize {
        self.inner
            .lock()
            .updates
            .get(scope)
            .map_or(0, |v| v.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Creates a worker that no registration slot refers to yet.
    pub fn create_worker(&self, script_url: &str, state: WorkerState) -> Arc<MemoryWorker> {
        let script_url = self
            .location
            .join(script_url)
            .map_or_else(|_| script_url.to_string(), String::from);
        Arc::new(MemoryWorker {
            id: WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            script_url,
            state: Mutex::new(state),
        })
    }

    /// Simulates a returning visit: registers `script_url` at its default scope
    /// with an activated worker that already controls the page. No notifications.
    pub fn preinstall(&self, script_url: &str) -> Result<Arc<MemoryWorker>, HostError> {
        let scope = self.resolve_scope(script_url, &RegistrationOptions::default())?;
        let worker = self.create_worker(script_url, WorkerState::Activated);
        let mut inner = self.inner.lock();
        let registration = Self::registration_for(&mut inner, &scope);
        registration.slots.lock().active = Some(Arc::clone(&worker));
        inner.controller = Some(Arc::clone(&worker));
        Ok(worker)
    }

    /// Puts an installed worker into the waiting slot of the latest registration.
    /// No notifications.
    pub fn stage_waiting(&self, script_url: &str) -> Arc<MemoryWorker> {
        let worker = self.create_worker(script_url, WorkerState::Installed);
        if let Some(registration) = self.registration() {
            registration.slots.lock().waiting = Some(Arc::clone(&worker));
        }
        worker
    }

    /// Starts an install cycle on the latest registration: a new worker takes the
    /// installing slot and `updatefound` is delivered. State changes made right
    /// after this call reach every `updatefound` subscriber.
    pub fn begin_install(&self, script_url: &str) -> Arc<MemoryWorker> {
        let worker = self.create_worker(script_url, WorkerState::Installing);
        let mut inner = self.inner.lock();
        if let Some(registration) = inner.registrations.last().cloned() {
            registration.slots.lock().installing = Some(Arc::clone(&worker));
            inner.notify_update(&registration.scope, &worker);
        }
        worker
    }

    /// Moves `worker` to `state`, updates registration slots, then delivers `statechange`.
    pub fn set_state(&self, worker: &Arc<MemoryWorker>, state: WorkerState) {
        *worker.state.lock() = state;
        let mut inner = self.inner.lock();
        for registration in &inner.registrations {
            let mut slots = registration.slots.lock();
            match state {
                WorkerState::Installing => {}
                WorkerState::Installed => {
                    if holds(&slots.installing, worker.id) {
                        slots.installing = None;
                        slots.waiting = Some(Arc::clone(worker));
                    }
                }
                WorkerState::Activating | WorkerState::Activated => {
                    if holds(&slots.installing, worker.id) || holds(&slots.waiting, worker.id) {
                        if holds(&slots.installing, worker.id) {
                            slots.installing = None;
                        }
                        if holds(&slots.waiting, worker.id) {
                            slots.waiting = None;
                        }
                        slots.active = Some(Arc::clone(worker));
                    }
                }
                WorkerState::Redundant => {
                    if holds(&slots.installing, worker.id) {
                        slots.installing = None;
                    }
                    if holds(&slots.waiting, worker.id) {
                        slots.waiting = None;
                    }
                    if holds(&slots.active, worker.id) {
                        slots.active = None;
                    }
                }
            }
        }
        inner.notify(
            &Topic::StateChange(worker.id),
            Notification::StateChange(state),
        );
    }

    /// Makes `worker` the page's controller and delivers `controllerchange`.
    pub fn claim(&self, worker: &Arc<MemoryWorker>) {
        let mut inner = self.inner.lock();
        inner.controller = Some(Arc::clone(worker));
        inner.notify(&Topic::ControllerChange, Notification::ControllerChange);
    }

    /// Replaces the controller without delivering `controllerchange`.
    pub fn set_controller(&self, worker: Option<Arc<MemoryWorker>>) {
        self.inner.lock().controller = worker;
    }

    fn resolve_scope(
        &self,
        script_url: &str,
        options: &RegistrationOptions,
    ) -> Result<String, HostError> {
        let script = self
            .location
            .join(script_url)
            .map_err(|e| HostError::Other(format!("invalid script URL {script_url:?}: {e}")))?;
        let max_scope = script
            .join("./")
            .map_err(|e| HostError::Other(format!("invalid script URL {script_url:?}: {e}")))?;
        let scope = match &options.scope {
            Some(scope) => self
                .location
                .join(scope)
                .map_err(|e| HostError::Other(format!("invalid scope URL {scope:?}: {e}")))?,
            None => max_scope.clone(),
        };
        if !scope.as_str().starts_with(max_scope.as_str()) {
            return Err(HostError::Security(format!(
                "the path of the provided scope ('{}') is not under the max scope allowed ('{}')",
                scope.path(),
                max_scope.path()
            )));
        }
        Ok(scope.into())
    }

    fn registration_for(inner: &mut Inner, scope: &str) -> Arc<MemoryRegistration> {
        if let Some(existing) = inner.registrations.iter().find(|r| r.scope == scope) {
            return Arc::clone(existing);
        }
        let registration = Arc::new(MemoryRegistration {
            scope: scope.to_string(),
            slots: Mutex::new(Slots::default()),
        });
        inner.registrations.push(Arc::clone(&registration));
        registration
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryHost")
            .field("location", &self.location.as_str())
            .field("ready", &*self.ready.borrow())
            .field("registrations", &inner.registrations)
            .field("controller", &inner.controller.as_ref().map(|w| w.id))
            .finish()
    }
}

impl Subscriptions for MemoryHost {
    fn subscribe(&self, topic: Topic) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().streams.entry(topic).or_default().push(tx);
        rx
    }

    fn subscribe_once(&self, topic: Topic) -> OnceSubscription {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().once.entry(topic).or_default().push(tx);
        rx
    }

    fn subscribe_updates(&self, scope: &str) -> UpdateSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .lock()
            .updates
            .entry(scope.to_string())
            .or_default()
            .push(tx);
        rx
    }
}

#[async_trait]
impl Host for MemoryHost {
    async fn register(
        &self,
        script_url: &str,
        options: &RegistrationOptions,
    ) -> Result<RegistrationRef, HostError> {
        let fail = {
            let mut inner = self.inner.lock();
            inner.register_calls += 1;
            inner.fail_next.take()
        };
        if let Some(err) = fail {
            return Err(err);
        }
        let scope = self.resolve_scope(script_url, options)?;
        let mut inner = self.inner.lock();
        let registration: RegistrationRef = Self::registration_for(&mut inner, &scope);
        Ok(registration)
    }

    fn controller(&self) -> Option<WorkerRef> {
        to_ref(&self.inner.lock().controller)
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready.borrow()
    }

    async fn loaded(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|state| *state == ReadyState::Complete).await;
    }

    fn location(&self) -> Url {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(worker: Option<WorkerRef>) -> Option<WorkerId> {
        worker.map(|w| w.id())
    }

    #[tokio::test]
    async fn test_slots_follow_worker_state() {
        let host = MemoryHost::new("https://example.com/").unwrap();
        let registration = host
            .register("/sw.js", &RegistrationOptions::default())
            .await
            .unwrap();

        let worker = host.begin_install("/sw.js");
        assert_eq!(id(registration.installing()), Some(worker.id()));

        host.set_state(&worker, WorkerState::Installed);
        assert_eq!(id(registration.installing()), None);
        assert_eq!(id(registration.waiting()), Some(worker.id()));

        host.set_state(&worker, WorkerState::Activating);
        assert_eq!(id(registration.waiting()), None);
        assert_eq!(id(registration.active()), Some(worker.id()));

        host.set_state(&worker, WorkerState::Redundant);
        assert_eq!(id(registration.active()), None);
    }

    #[tokio::test]
    async fn test_default_scope_and_reuse() {
        let host = MemoryHost::new("https://example.com/").unwrap();
        let a = host
            .register("/app/sw.js", &RegistrationOptions::default())
            .await
            .unwrap();
        let b = host
            .register("/app/sw.js", &RegistrationOptions::default())
            .await
            .unwrap();

        assert_eq!(a.scope(), "https://example.com/app/");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(host.register_calls(), 2);
    }

    #[tokio::test]
    async fn test_scope_above_script_directory_is_refused() {
        let host = MemoryHost::new("https://example.com/").unwrap();
        let err = host
            .register("/app/sw.js", &RegistrationOptions::default().with_scope("/"))
            .await
            .unwrap_err();

        assert!(matches!(err, HostError::Security(_)));
    }

    #[tokio::test]
    async fn test_fail_next_register_fails_once() {
        let host = MemoryHost::new("https://example.com/").unwrap();
        host.fail_next_register(HostError::Network("404".into()));

        let opts = RegistrationOptions::default();
        assert_eq!(
            host.register("/sw.js", &opts).await.unwrap_err(),
            HostError::Network("404".into())
        );
        assert!(host.register("/sw.js", &opts).await.is_ok());
    }

    #[tokio::test]
    async fn test_once_subscription_fires_once() {
        let host = MemoryHost::new("https://example.com/").unwrap();
        let worker = host.create_worker("/sw.js", WorkerState::Activated);
        let once = host.subscribe_once(Topic::ControllerChange);
        let mut stream = host.subscribe(Topic::ControllerChange);
        assert_eq!(host.subscriber_count(&Topic::ControllerChange), 2);

        host.claim(&worker);
        host.claim(&worker);

        assert_eq!(once.await.unwrap(), Notification::ControllerChange);
        assert_eq!(stream.recv().await, Some(Notification::ControllerChange));
        assert_eq!(stream.recv().await, Some(Notification::ControllerChange));
        assert_eq!(id(host.controller()), Some(worker.id()));
    }

    #[tokio::test]
    async fn test_update_delivery_keeps_following_state_changes() {
        let host = MemoryHost::new("https://example.com/").unwrap();
        host.register("/sw.js", &RegistrationOptions::default())
            .await
            .unwrap();
        let mut updates = host.subscribe_updates("https://example.com/");
        assert_eq!(host.update_subscriber_count("https://example.com/"), 1);

        let worker = host.begin_install("/sw.js");
        host.set_state(&worker, WorkerState::Installed);
        host.set_state(&worker, WorkerState::Activated);

        let mut found = updates.recv().await.unwrap();
        assert_eq!(found.worker.id(), worker.id());
        assert_eq!(
            found.states.recv().await,
            Some(Notification::StateChange(WorkerState::Installed))
        );
        assert_eq!(
            found.states.recv().await,
            Some(Notification::StateChange(WorkerState::Activated))
        );

        drop(updates);
        assert_eq!(host.update_subscriber_count("https://example.com/"), 0);
    }

    #[tokio::test]
    async fn test_loaded_waits_for_complete() {
        let host = MemoryHost::new("https://example.com/").unwrap();
        host.set_ready_state(ReadyState::Loading);

        let waiter = {
            let host = host.clone();
            tokio::spawn(async move { host.loaded().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        host.finish_loading();
        waiter.await.unwrap();
        assert_eq!(host.ready_state(), ReadyState::Complete);
    }
}
