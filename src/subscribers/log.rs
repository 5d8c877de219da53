//! # LogWriter: lifecycle events as log lines
//!
//! A subscriber that renders every [`Event`] through `tracing`, using the
//! messages a developer expects to see in the console while iterating on a
//! worker script.
//!
//! ## Example output
//! ```text
//! INFO  Service worker is installing... worker=sw#2
//! INFO  Service worker installed! worker=sw#2
//! WARN  Service worker is installed but waiting for existing clients to close before activating... worker=sw#2
//! INFO  Service worker is active! worker=sw#2
//! INFO  Service worker is controlling the page. worker=sw#2
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let worker = e.worker.map(|w| w.to_string()).unwrap_or_default();
        match e.kind {
            EventKind::Installing => {
                tracing::info!(%worker, "Service worker is installing...");
            }
            EventKind::Installed => {
                tracing::info!(%worker, "Service worker installed!");
            }
            EventKind::Waiting => {
                tracing::warn!(
                    %worker,
                    "Service worker is installed but waiting for existing clients to close before activating..."
                );
            }
            EventKind::Activated => {
                tracing::info!(%worker, "Service worker is active!");
            }
            EventKind::Controlling => {
                tracing::info!(%worker, "Service worker is controlling the page.");
            }
            EventKind::ActivatedNotControlling => {
                tracing::info!(
                    %worker,
                    "Service worker active, but not yet controlling the page. Reload the page or run `clients.claim()` in the service worker."
                );
            }
            EventKind::PeerReady => {
                tracing::debug!(%worker, script = ?e.script_url, "existing controller notified");
            }
            EventKind::Registered => {
                tracing::info!(scope = ?e.reason, "Successfully registered service worker.");
            }
            EventKind::AlreadyWaiting | EventKind::OutOfScope | EventKind::HookPanicked => {
                tracing::warn!(kind = %e.kind, reason = ?e.reason, "advisory");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::WorkerId;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_waiting_is_logged_as_warning() {
        LogWriter::new().on_event(&Event::new(EventKind::Waiting).with_worker(WorkerId(3)));
        assert!(logs_contain("waiting for existing clients to close"));
        assert!(logs_contain("sw#3"));
    }

    #[traced_test]
    #[test]
    fn test_not_controlling_hint() {
        LogWriter::new().on_event(&Event::new(EventKind::ActivatedNotControlling));
        assert!(logs_contain("clients.claim()"));
    }
}
