//! # Classifier: turns host notifications into lifecycle events.
//!
//! One classifier runs per registered tracker, as a single spawned task. It owns the
//! current install cycle and reacts to notifications one at a time, so transitions
//! for a cycle never interleave.
//!
//! ## Transitions
//! ```text
//! update found ──► take the delivered worker and its state stream ─► Installing
//! installed    ──► Installed; arm wait timer if registration has a waiting worker
//! timer fires  ──► Waiting (only if the worker is still installed)
//! activating   ──► drop the wait timer (skip-through: no Waiting)
//! activated    ──► Activated, then
//!                    ├─ controller == worker ─► Controlling
//!                    └─ otherwise ───────────► ActivatedNotControlling,
//!                                              watch controller change once
//! controller change to this worker, worker activated ──► Controlling
//! ```
//!
//! ## Rules
//! - Every lifecycle event is emitted **at most once per cycle**.
//! - A new cycle replaces the previous one; its wait timer and controller watch are dropped.
//! - Unclassified states (`installing` repeats, `redundant`) are ignored.
//! - Notification priority: worker state, controller watch, update found, wait timer.

use std::collections::HashSet;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::core::scope;
use crate::events::{Event, EventKind};
use crate::host::{
    same_worker, FoundWorker, Host, Notification, OnceSubscription, RegistrationRef,
    Subscription, Subscriptions, Timer, Topic, UpdateSubscription, WorkerRef, WorkerState,
};
use crate::subscribers::SubscriberSet;

/// Everything the classifier borrows from its tracker.
pub(crate) struct ClassifierParams {
    pub host: Arc<dyn Host>,
    pub registration: RegistrationRef,
    pub subs: Arc<SubscriberSet>,
    pub timer: Arc<dyn Timer>,
    pub waiting_delay: Duration,
    pub initial_controller: Option<WorkerRef>,
    pub script_url: Arc<str>,
    pub base_url: Url,
}

/// State of one install cycle.
struct Cycle {
    worker: WorkerRef,
    states: Option<Subscription>,
    emitted: HashSet<EventKind>,
    pending_wait: Option<BoxFuture<'static, ()>>,
    controller_watch: Option<OnceSubscription>,
}

impl Cycle {
    fn new(found: FoundWorker) -> Self {
        Self {
            worker: found.worker,
            states: Some(found.states),
            emitted: HashSet::new(),
            pending_wait: None,
            controller_watch: None,
        }
    }

    /// True if nothing can advance this cycle any more.
    fn is_idle(&self) -> bool {
        self.states.is_none() && self.pending_wait.is_none() && self.controller_watch.is_none()
    }
}

/// One unit of work for the classifier.
#[derive(Debug)]
pub(crate) enum Step {
    UpdateFound(FoundWorker),
    UpdatesClosed,
    StateChange(WorkerState),
    StatesClosed,
    ControllerChange,
    ControllerWatchClosed,
    WaitElapsed,
    Ignored,
}

pub(crate) struct Classifier {
    host: Arc<dyn Host>,
    registration: RegistrationRef,
    subs: Arc<SubscriberSet>,
    timer: Arc<dyn Timer>,
    waiting_delay: Duration,
    initial_controller: Option<WorkerRef>,
    script_url: Arc<str>,
    base_url: Url,
    updates: Option<UpdateSubscription>,
    cycle: Option<Cycle>,
}

impl Classifier {
    pub(crate) fn new(params: ClassifierParams, updates: UpdateSubscription) -> Self {
        Self {
            host: params.host,
            registration: params.registration,
            subs: params.subs,
            timer: params.timer,
            waiting_delay: params.waiting_delay,
            initial_controller: params.initial_controller,
            script_url: params.script_url,
            base_url: params.base_url,
            updates: Some(updates),
            cycle: None,
        }
    }

    /// Drains notifications until cancelled or until nothing can arrive any more.
    pub(crate) async fn run(mut self, token: CancellationToken) {
        loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                step = self.next_step() => step,
            };
            match step {
                Some(step) => self.apply(step),
                None => break,
            }
        }
        debug!(scope = self.registration.scope(), "classifier stopped");
    }

    /// Waits for the next notification, honoring the priority order.
    ///
    /// Returns `None` once every source is closed.
    async fn next_step(&mut self) -> Option<Step> {
        let idle = self.cycle.as_ref().map_or(true, Cycle::is_idle);
        if self.updates.is_none() && idle {
            return None;
        }

        let (states, controller, wait) = match self.cycle.as_mut() {
            Some(c) => (
                c.states.as_mut(),
                c.controller_watch.as_mut(),
                c.pending_wait.as_mut(),
            ),
            None => (None, None, None),
        };
        let updates = self.updates.as_mut();

        let step = tokio::select! {
            biased;
            n = recv(states) => match n {
                Some(Notification::StateChange(state)) => Step::StateChange(state),
                Some(_) => Step::Ignored,
                None => Step::StatesClosed,
            },
            n = recv_once(controller) => match n {
                Ok(_) => Step::ControllerChange,
                Err(_) => Step::ControllerWatchClosed,
            },
            n = recv(updates) => match n {
                Some(found) => Step::UpdateFound(found),
                None => Step::UpdatesClosed,
            },
            _ = elapsed(wait) => Step::WaitElapsed,
        };
        Some(step)
    }

    pub(crate) fn apply(&mut self, step: Step) {
        match step {
            Step::UpdateFound(found) => self.on_update_found(found),
            Step::UpdatesClosed => {
                debug!("update-found subscription closed");
                self.updates = None;
            }
            Step::StateChange(state) => self.on_state_change(state),
            Step::StatesClosed => {
                if let Some(cycle) = self.cycle.as_mut() {
                    debug!(worker = %cycle.worker.id(), "state-change subscription closed");
                    cycle.states = None;
                }
            }
            Step::ControllerChange => self.on_controller_change(),
            Step::ControllerWatchClosed => {
                if let Some(cycle) = self.cycle.as_mut() {
                    cycle.controller_watch = None;
                }
            }
            Step::WaitElapsed => self.on_wait_elapsed(),
            Step::Ignored => {}
        }
    }

    fn on_update_found(&mut self, found: FoundWorker) {
        let id = found.worker.id();
        if let Some(prev) = self.cycle.as_ref() {
            if prev.worker.id() == id {
                debug!(worker = %id, "update found for the worker already tracked");
                return;
            }
            if prev.pending_wait.is_some() {
                debug!(previous = %prev.worker.id(), "new install cycle drops pending wait timer");
            }
        }

        match &self.initial_controller {
            Some(ctrl) if scope::is_same_script(&self.base_url, &self.script_url, ctrl.script_url()) => {
                debug!(worker = %id, "New service worker found. Installing now...");
            }
            Some(_) => {
                debug!(worker = %id, "Updated service worker found. Installing now...");
            }
            None => {
                debug!(worker = %id, "Service worker is installing...");
            }
        }

        self.cycle = Some(Cycle::new(found));
        self.emit(EventKind::Installing);
    }

    fn on_state_change(&mut self, state: WorkerState) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        match state {
            WorkerState::Installed => {
                self.emit(EventKind::Installed);
                self.arm_wait_timer();
            }
            WorkerState::Activating => {
                if cycle.pending_wait.take().is_some() {
                    debug!(
                        worker = %cycle.worker.id(),
                        "left installed within the wait delay; treating as skip-through"
                    );
                }
            }
            WorkerState::Activated => {
                cycle.pending_wait = None;
                if cycle.emitted.contains(&EventKind::Activated) {
                    return;
                }
                self.emit(EventKind::Activated);
                self.classify_control();
            }
            WorkerState::Installing | WorkerState::Redundant => {
                debug!(worker = %cycle.worker.id(), %state, "unclassified state");
            }
        }
    }

    /// Arms the wait timer if the worker is still installed next to a waiting worker.
    fn arm_wait_timer(&mut self) {
        let has_waiting = self.registration.waiting().is_some();
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        if !has_waiting || cycle.worker.state() != WorkerState::Installed {
            return;
        }
        if cycle.emitted.contains(&EventKind::Waiting) {
            return;
        }
        cycle.pending_wait = Some(self.timer.sleep(self.waiting_delay));
        debug!(
            worker = %cycle.worker.id(),
            delay = ?self.waiting_delay,
            "wait timer armed"
        );
    }

    fn classify_control(&mut self) {
        let controller = self.host.controller();
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        if same_worker(controller.as_ref(), Some(&cycle.worker)) {
            self.emit(EventKind::Controlling);
        } else {
            cycle.controller_watch = Some(self.host.subscribe_once(Topic::ControllerChange));
            self.emit(EventKind::ActivatedNotControlling);
        }
    }

    fn on_wait_elapsed(&mut self) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        cycle.pending_wait = None;
        if cycle.worker.state() != WorkerState::Installed {
            debug!(worker = %cycle.worker.id(), "wait timer fired after the worker left installed");
            return;
        }
        self.emit(EventKind::Waiting);
    }

    /// The watch only exists once the worker was seen activated, so the live state
    /// decides: still activated means it now controls the page.
    fn on_controller_change(&mut self) {
        let controller = self.host.controller();
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        cycle.controller_watch = None;
        if !same_worker(controller.as_ref(), Some(&cycle.worker)) {
            debug!(
                worker = %cycle.worker.id(),
                controller = ?controller.map(|c| c.id()),
                "controller changed to another worker"
            );
            return;
        }
        let state = cycle.worker.state();
        if state != WorkerState::Activated {
            debug!(worker = %cycle.worker.id(), %state, "controller change while not activated");
            return;
        }
        self.emit(EventKind::Controlling);
    }

    /// Emits `kind` for the current cycle's worker unless it was already emitted.
    fn emit(&mut self, kind: EventKind) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        if !cycle.emitted.insert(kind) {
            debug!(worker = %cycle.worker.id(), event = %kind, "already emitted in this cycle");
            return;
        }
        self.subs.emit(Event::for_worker(kind, &*cycle.worker));
    }
}

async fn recv<T>(rx: Option<&mut mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn recv_once(rx: Option<&mut OnceSubscription>) -> Result<Notification, oneshot::error::RecvError> {
    match rx {
        Some(rx) => rx.await,
        None => future::pending().await,
    }
}

async fn elapsed(wait: Option<&mut BoxFuture<'static, ()>>) {
    match wait {
        Some(wait) => wait.await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::host::{RegistrationOptions, ServiceWorker};
    use crate::subscribers::Subscribe;
    use crate::testing::{ManualTimer, MemoryHost, MemoryWorker, Recorder};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    struct Fixture {
        host: Arc<MemoryHost>,
        timer: ManualTimer,
        recorder: Arc<Recorder>,
        found: UpdateSubscription,
        classifier: Classifier,
    }

    impl Fixture {
        /// Hands the next `updatefound` delivery to the classifier.
        fn deliver_update(&mut self) {
            let found = self.found.try_recv().unwrap();
            self.classifier.apply(Step::UpdateFound(found));
        }

        fn step(&mut self, worker: &Arc<MemoryWorker>, state: WorkerState) {
            self.host.set_state(worker, state);
            self.classifier.apply(Step::StateChange(state));
        }
    }

    async fn fixture() -> Fixture {
        fixture_controlled_by(None).await
    }

    /// Fixture whose page was controlled by a worker for `script` when the tracker started.
    async fn fixture_controlled_by(script: Option<&str>) -> Fixture {
        let host = MemoryHost::new("https://example.com/").unwrap();
        let initial_controller = match script {
            Some(script) => Some(host.preinstall(script).unwrap() as WorkerRef),
            None => None,
        };
        let registration = host
            .register("/sw.js", &RegistrationOptions::default())
            .await
            .unwrap();
        let timer = ManualTimer::new();
        let recorder = Arc::new(Recorder::new());
        let hooks: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
        let subs = Arc::new(SubscriberSet::new(hooks, Bus::new(16)));
        let found = host.subscribe_updates(registration.scope());
        let updates = host.subscribe_updates(registration.scope());
        let classifier = Classifier::new(
            ClassifierParams {
                host: host.clone(),
                registration,
                subs,
                timer: Arc::new(timer.clone()),
                waiting_delay: Duration::from_millis(100),
                initial_controller,
                script_url: "/sw.js".into(),
                base_url: host.location(),
            },
            updates,
        );
        Fixture {
            host,
            timer,
            recorder,
            found,
            classifier,
        }
    }

    #[tokio::test]
    async fn test_duplicate_notifications_emit_once() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.deliver_update();
        let again = FoundWorker {
            worker: worker.clone() as WorkerRef,
            states: f.host.subscribe(Topic::StateChange(worker.id())),
        };
        f.classifier.apply(Step::UpdateFound(again));

        f.step(&worker, WorkerState::Installed);
        f.classifier.apply(Step::StateChange(WorkerState::Installed));

        assert_eq!(
            f.recorder.kinds(),
            vec![EventKind::Installing, EventKind::Installed]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_update_found_log_names_same_script_as_new() {
        let mut f = fixture_controlled_by(Some("/sw.js")).await;
        f.host.begin_install("/sw.js");
        f.deliver_update();

        assert!(logs_contain("New service worker found. Installing now..."));
        assert!(!logs_contain("Updated service worker found"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_update_found_log_names_other_script_as_updated() {
        let mut f = fixture_controlled_by(Some("/old-sw.js")).await;
        f.host.begin_install("/sw.js");
        f.deliver_update();

        assert!(logs_contain("Updated service worker found. Installing now..."));
        assert!(!logs_contain("New service worker found"));
    }

    #[tokio::test]
    async fn test_activating_drops_wait_timer() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.deliver_update();

        f.step(&worker, WorkerState::Installed);
        assert_eq!(f.timer.pending(), 1);

        f.step(&worker, WorkerState::Activating);
        assert_eq!(f.timer.pending(), 0);
        assert!(!f.recorder.kinds().contains(&EventKind::Waiting));
    }

    #[tokio::test]
    async fn test_wait_elapsed_after_leaving_installed_is_ignored() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.deliver_update();
        f.step(&worker, WorkerState::Installed);

        // activating happened on the host but its notification has not been handled yet
        f.host.set_state(&worker, WorkerState::Activating);
        f.classifier.apply(Step::WaitElapsed);

        assert!(!f.recorder.kinds().contains(&EventKind::Waiting));
    }

    #[tokio::test]
    async fn test_redundant_is_unclassified() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.deliver_update();
        f.step(&worker, WorkerState::Redundant);

        assert_eq!(f.recorder.kinds(), vec![EventKind::Installing]);
    }

    #[tokio::test]
    async fn test_new_cycle_replaces_previous_timer() {
        let mut f = fixture().await;
        let first = f.host.begin_install("/sw.js");
        f.deliver_update();
        f.step(&first, WorkerState::Installed);
        assert_eq!(f.timer.pending(), 1);

        let second = f.host.begin_install("/sw.js");
        f.deliver_update();
        assert_eq!(f.timer.pending(), 0);

        let installing: Vec<_> = f
            .recorder
            .events()
            .into_iter()
            .filter(|e| e.kind == EventKind::Installing)
            .map(|e| e.worker)
            .collect();
        assert_eq!(installing, vec![Some(first.id()), Some(second.id())]);
    }

    #[tokio::test]
    async fn test_states_come_from_the_delivered_stream() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.host.set_state(&worker, WorkerState::Installed);
        f.host.set_state(&worker, WorkerState::Activating);
        f.host.set_state(&worker, WorkerState::Activated);
        f.deliver_update();

        // drain what the host queued on the delivered stream
        while let Some(step) = f.classifier.next_step().now_or_never().flatten() {
            f.classifier.apply(step);
        }

        assert_eq!(
            f.recorder.kinds(),
            vec![
                EventKind::Installing,
                EventKind::Installed,
                EventKind::Activated,
                EventKind::ActivatedNotControlling,
            ]
        );
    }

    #[tokio::test]
    async fn test_controller_change_after_activation_controls() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.deliver_update();
        f.step(&worker, WorkerState::Installed);
        f.step(&worker, WorkerState::Activating);
        f.step(&worker, WorkerState::Activated);
        assert_eq!(f.host.subscriber_count(&Topic::ControllerChange), 1);

        f.host.claim(&worker);
        f.classifier.apply(Step::ControllerChange);
        f.classifier.apply(Step::ControllerChange);

        assert_eq!(
            f.recorder.kinds(),
            vec![
                EventKind::Installing,
                EventKind::Installed,
                EventKind::Activated,
                EventKind::ActivatedNotControlling,
                EventKind::Controlling,
            ]
        );
    }

    #[tokio::test]
    async fn test_controller_change_to_redundant_worker_is_ignored() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.deliver_update();
        f.step(&worker, WorkerState::Installed);
        f.step(&worker, WorkerState::Activated);

        f.host.set_state(&worker, WorkerState::Redundant);
        f.host.claim(&worker);
        f.classifier.apply(Step::ControllerChange);

        assert!(!f.recorder.kinds().contains(&EventKind::Controlling));
    }

    #[tokio::test]
    async fn test_controller_change_to_other_worker_is_ignored() {
        let mut f = fixture().await;
        let worker = f.host.begin_install("/sw.js");
        f.deliver_update();
        f.step(&worker, WorkerState::Installed);
        f.step(&worker, WorkerState::Activating);
        f.step(&worker, WorkerState::Activated);

        let other = f.host.create_worker("/other.js", WorkerState::Activated);
        f.host.claim(&other);
        f.classifier.apply(Step::ControllerChange);

        assert_eq!(
            f.recorder.kinds(),
            vec![
                EventKind::Installing,
                EventKind::Installed,
                EventKind::Activated,
                EventKind::ActivatedNotControlling,
            ]
        );
    }
}
