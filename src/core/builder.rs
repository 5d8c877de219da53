use std::sync::Arc;

use crate::{
    core::TrackerConfig,
    events::Bus,
    host::{Host, RegistrationOptions, Timer, TokioTimer},
    subscribers::{Subscribe, SubscriberSet},
};
use super::tracker::{Target, Tracker};

/// Builder for constructing a [`Tracker`] with optional features.
pub struct TrackerBuilder {
    host: Arc<dyn Host>,
    script_url: String,
    options: RegistrationOptions,
    cfg: TrackerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    timer: Option<Arc<dyn Timer>>,
}

impl TrackerBuilder {
    /// Creates a new builder for `script_url` on `host` with default settings.
    pub fn new(host: Arc<dyn Host>, script_url: impl Into<String>) -> Self {
        Self {
            host,
            script_url: script_url.into(),
            options: RegistrationOptions::default(),
            cfg: TrackerConfig::default(),
            subscribers: Vec::new(),
            timer: None,
        }
    }

    /// Sets the options forwarded to the host's register operation.
    pub fn with_options(mut self, options: RegistrationOptions) -> Self {
        self.options = options;
        self
    }

    /// Shorthand for setting only the registration scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.options.scope = Some(scope.into());
        self
    }

    /// Sets the tracker configuration.
    pub fn with_config(mut self, cfg: TrackerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers are called synchronously, in order, for every event the tracker
    /// emits. A panicking subscriber is isolated from the others.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Replaces the delay capability used by the wait heuristic (default: [`TokioTimer`]).
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Builds the tracker.
    ///
    /// If the host already has a controller, `PeerReady` is emitted before this returns.
    pub fn build(self) -> Tracker {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let timer = self
            .timer
            .unwrap_or_else(|| Arc::new(TokioTimer) as Arc<dyn Timer>);
        let target = Target {
            script_url: self.script_url,
            options: self.options,
        };

        Tracker::new_internal(self.host, target, self.cfg, bus, subs, timer)
    }
}

impl std::fmt::Debug for TrackerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerBuilder")
            .field("script_url", &self.script_url)
            .field("options", &self.options)
            .field("cfg", &self.cfg)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
