//! Error types used by the tracker and by host adapters.
//!
//! This module defines two enums:
//!
//! - [`HostError`]: failures reported by the host environment's register operation.
//! - [`RegisterError`]: what [`Tracker::register`](crate::Tracker::register) returns to the caller.
//!
//! Only registration crosses the public boundary as an error. Everything that happens
//! after a successful registration is observational and surfaces as events or logs.

use thiserror::Error;

/// # Errors reported by the host's register operation.
///
/// Host adapters map their platform failures onto these variants. The tracker never
/// inspects or rewrites them; they are handed back to the caller as-is.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The worker script could not be fetched.
    #[error("network error: {0}")]
    Network(String),

    /// The registration was refused (origin, scope or MIME checks).
    #[error("security error: {0}")]
    Security(String),

    /// The worker script failed to parse or evaluate.
    #[error("script error: {0}")]
    Script(String),

    /// The host is not in a state that allows registration.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Any other host-defined failure.
    #[error("{0}")]
    Other(String),
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use swvisor::HostError;
    ///
    /// let err = HostError::Network("404".into());
    /// assert_eq!(err.as_label(), "host_network");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::Network(_) => "host_network",
            HostError::Security(_) => "host_security",
            HostError::Script(_) => "host_script",
            HostError::InvalidState(_) => "host_invalid_state",
            HostError::Other(_) => "host_other",
        }
    }
}

/// # Errors returned by [`Tracker::register`](crate::Tracker::register).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The host rejected the registration. Display and source are the host error's own.
    #[error(transparent)]
    Host(#[from] HostError),

    /// `register` was already called on this tracker.
    #[error("register() was already called on this tracker")]
    AlreadyRegistered,
}

impl RegisterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegisterError::Host(e) => e.as_label(),
            RegisterError::AlreadyRegistered => "register_already_called",
        }
    }

    /// Returns the underlying host error, if this is a host rejection.
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            RegisterError::Host(e) => Some(e),
            RegisterError::AlreadyRegistered => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_passes_through_unchanged() {
        let host = HostError::Script("SyntaxError: unexpected token".into());
        let err = RegisterError::from(host.clone());

        assert_eq!(err.to_string(), host.to_string());
        assert_eq!(err.host_error(), Some(&host));
        assert_eq!(err.as_label(), "host_script");
    }

    #[test]
    fn test_already_registered_has_no_host_error() {
        let err = RegisterError::AlreadyRegistered;
        assert!(err.host_error().is_none());
        assert_eq!(err.as_label(), "register_already_called");
    }
}
