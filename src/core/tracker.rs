//! # Tracker: registers a worker script and observes its lifecycle.
//!
//! The [`Tracker`] owns the target descriptor, the subscriber set and the event bus.
//! [`Tracker::register`] performs the host registration and spawns the classifier
//! that turns host notifications into lifecycle events.
//!
//! ## Flow
//! ```text
//! Tracker::builder(host, script).build()
//!     └─► controller present? ─► emit PeerReady
//!
//! Tracker::register(opts)
//!     ├─► (immediate = false and page loading) ─► await host.loaded()
//!     ├─► host.register(script, options)
//!     │       ├─ Err ─► log, return RegisterError::Host (unchanged)
//!     │       └─ Ok  ─► store handle, emit Registered
//!     ├─► advisory checks ─► AlreadyWaiting / OutOfScope
//!     ├─► subscribe_updates(scope)
//!     └─► spawn Classifier::run(child token)
//! ```
//!
//! Dropping the tracker cancels the classifier task.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use swvisor::{LogWriter, RegisterOptions, Subscribe, Tracker};
//! use swvisor::testing::MemoryHost;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let host = MemoryHost::new("https://example.com/")?;
//! let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//! let tracker = Tracker::builder(host.clone(), "/sw.js")
//!     .with_subscribers(subs)
//!     .build();
//!
//! let registration = tracker.register(RegisterOptions::default()).await?;
//! assert_eq!(registration.scope(), "https://example.com/");
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

use crate::core::builder::TrackerBuilder;
use crate::core::classifier::{Classifier, ClassifierParams};
use crate::core::config::TrackerConfig;
use crate::core::scope;
use crate::error::RegisterError;
use crate::events::{Bus, Event, EventKind};
use crate::host::{
    Host, ReadyState, RegistrationOptions, RegistrationRef, Subscriptions, Timer, WorkerRef,
};
use crate::subscribers::SubscriberSet;

/// Script identity and registration options of a tracker. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Script URL as supplied by the caller (resolved by the host).
    pub script_url: String,
    /// Options forwarded to the host's register operation.
    pub options: RegistrationOptions,
}

/// Options for [`Tracker::register`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Register right away instead of waiting for the page's load event.
    pub immediate: bool,
}

impl RegisterOptions {
    /// Options with `immediate = true`.
    pub fn immediate() -> Self {
        Self { immediate: true }
    }
}

/// Observes one worker lineage on one registration.
pub struct Tracker {
    host: Arc<dyn Host>,
    target: Target,
    cfg: TrackerConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    timer: Arc<dyn Timer>,
    initial_controller: Option<WorkerRef>,
    registration: OnceLock<RegistrationRef>,
    register_started: AtomicBool,
    token: CancellationToken,
}

impl Tracker {
    /// Starts building a tracker for `script_url` on `host`.
    pub fn builder(host: Arc<dyn Host>, script_url: impl Into<String>) -> TrackerBuilder {
        TrackerBuilder::new(host, script_url)
    }

    /// Creates a tracker with default configuration and no subscribers.
    pub fn new(
        host: Arc<dyn Host>,
        script_url: impl Into<String>,
        options: RegistrationOptions,
    ) -> Self {
        TrackerBuilder::new(host, script_url)
            .with_options(options)
            .build()
    }

    pub(crate) fn new_internal(
        host: Arc<dyn Host>,
        target: Target,
        cfg: TrackerConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let initial_controller = host.controller();
        if let Some(ctrl) = &initial_controller {
            debug!(controller = %ctrl.id(), "page already controlled; notifying peer");
            subs.emit(Event::for_worker(EventKind::PeerReady, &**ctrl));
        }

        Self {
            host,
            target,
            cfg,
            bus,
            subs,
            timer,
            initial_controller,
            registration: OnceLock::new(),
            register_started: AtomicBool::new(false),
            token: CancellationToken::new(),
        }
    }

    /// Registers the target script with the host and starts observing it.
    ///
    /// Unless `opts.immediate` is set, waits for the page's load event first.
    ///
    /// # Errors
    /// - [`RegisterError::Host`] carrying the host's error unchanged; the tracker
    ///   stays unregistered and may be retried.
    /// - [`RegisterError::AlreadyRegistered`] if a registration succeeded or is in
    ///   progress.
    ///
    /// Cancelling the returned future (for example with a timeout while the page is
    /// still loading) leaves the tracker unregistered; `register` may be called again.
    pub async fn register(&self, opts: RegisterOptions) -> Result<RegistrationRef, RegisterError> {
        if self.register_started.swap(true, Ordering::SeqCst) {
            return Err(RegisterError::AlreadyRegistered);
        }
        // Released on every exit but success, including the caller dropping this future.
        let started = StartedGuard {
            flag: &self.register_started,
            keep: false,
        };

        if !opts.immediate && self.host.ready_state() != ReadyState::Complete {
            debug!("deferring registration until the page has loaded");
            self.host.loaded().await;
        }

        let registration = match self
            .host
            .register(&self.target.script_url, &self.target.options)
            .await
        {
            Ok(registration) => registration,
            Err(err) => {
                error!(
                    script = %self.target.script_url,
                    label = err.as_label(),
                    error = %err,
                    "Error registering service worker"
                );
                return Err(err.into());
            }
        };
        started.keep();
        let _ = self.registration.set(Arc::clone(&registration));

        self.subs.emit(
            Event::new(EventKind::Registered)
                .with_script(self.target.script_url.as_str())
                .with_reason(registration.scope()),
        );
        self.describe_controller();
        self.check_already_waiting(&registration);
        self.check_scope(&registration);

        let updates = self.host.subscribe_updates(registration.scope());
        let classifier = Classifier::new(
            ClassifierParams {
                host: Arc::clone(&self.host),
                registration: Arc::clone(&registration),
                subs: Arc::clone(&self.subs),
                timer: Arc::clone(&self.timer),
                waiting_delay: self.cfg.waiting_delay,
                initial_controller: self.initial_controller.clone(),
                script_url: self.target.script_url.as_str().into(),
                base_url: self.host.base_url(),
            },
            updates,
        );
        tokio::spawn(classifier.run(self.token.child_token()));

        Ok(registration)
    }

    /// Registration handle, once [`register`](Self::register) succeeded.
    pub fn registration(&self) -> Option<RegistrationRef> {
        self.registration.get().cloned()
    }

    /// Receiver for every event emitted from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Script identity and registration options.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Tracker configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.cfg
    }

    /// Controller recorded when the tracker was built.
    pub fn initial_controller(&self) -> Option<&WorkerRef> {
        self.initial_controller.as_ref()
    }

    /// Scope the registration is expected to get: the configured scope, or the
    /// script's directory, resolved against the host's base URL.
    pub fn expected_scope(&self) -> Option<Url> {
        let base = self.host.base_url();
        match &self.target.options.scope {
            Some(scope) => base.join(scope).ok(),
            None => scope::default_scope(&base, &self.target.script_url),
        }
    }

    fn describe_controller(&self) {
        let Some(ctrl) = &self.initial_controller else {
            return;
        };
        if scope::is_same_script(&self.host.base_url(), &self.target.script_url, ctrl.script_url()) {
            debug!(
                controller = %ctrl.id(),
                "A service worker with the same script URL is already controlling this page. \
                 This service worker will remain active unless an update is found."
            );
            debug!("Checking for update...");
        } else {
            debug!(
                controller = %ctrl.id(),
                controller_script = ctrl.script_url(),
                "A service worker with a different script URL is currently controlling the page."
            );
            debug!("Fetching the new script...");
        }
    }

    fn check_already_waiting(&self, registration: &RegistrationRef) {
        let (Some(waiting), Some(_active)) = (registration.waiting(), registration.active()) else {
            return;
        };
        warn!(
            waiting = %waiting.id(),
            "A service worker was already waiting to activate before this service worker was registered..."
        );
        self.subs
            .emit(Event::for_worker(EventKind::AlreadyWaiting, &*waiting));
    }

    fn check_scope(&self, registration: &RegistrationRef) {
        let page = self.host.location();
        let in_scope = scope::is_in_scope(&page, registration.scope()).or_else(|| {
            self.expected_scope()
                .and_then(|scope| scope::is_in_scope(&page, scope.as_str()))
        });
        if in_scope != Some(false) {
            return;
        }
        warn!(
            page = %page,
            scope = registration.scope(),
            "The current page is not in scope for the registered service worker. Was this a mistake?"
        );
        self.subs.emit(
            Event::new(EventKind::OutOfScope)
                .with_script(self.target.script_url.as_str())
                .with_reason(format!("page={} scope={}", page, registration.scope())),
        );
    }
}

/// Resets the in-progress flag unless the registration went through.
struct StartedGuard<'a> {
    flag: &'a AtomicBool,
    keep: bool,
}

impl StartedGuard<'_> {
    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for StartedGuard<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("target", &self.target)
            .field("cfg", &self.cfg)
            .field("subs", &self.subs)
            .field("initial_controller", &self.initial_controller)
            .field("registration", &self.registration.get())
            .finish()
    }
}
