//! Domain error types.
//!
//! Application plumbing (config files, server startup) uses `anyhow`; these
//! enums cover the failures callers are expected to match on.

use thiserror::Error;

use crate::models::{TransitionScheme, TrapStatus};

/// Errors raised by the trap registry and state store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrapError {
    /// The id does not name a registered trap.
    #[error("unknown trap '{0}'")]
    UnknownTrap(String),

    /// The status is not part of the configured scheme.
    #[error("status '{status}' is not part of the {} scheme", .scheme.as_str())]
    StatusNotInScheme {
        /// Rejected status.
        status: TrapStatus,
        /// Scheme in effect.
        scheme: TransitionScheme,
    },

    /// The trap list could not be turned into a registry.
    #[error("invalid trap registry: {0}")]
    InvalidRegistry(String),
}

/// Failures at the detection service boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No candidate port produced a usable answer.
    #[error("detection service could not be reached on any port (tried {})", format_ports(.ports))]
    ServiceUnreachable {
        /// Ports attempted, in order.
        ports: Vec<u16>,
        /// Description of the last failed attempt.
        last_error: Option<String>,
    },

    /// Nothing accepted the connection, or it broke before a response.
    #[error("port {port}: {reason}")]
    Connection {
        /// Port attempted.
        port: u16,
        /// Transport error text.
        reason: String,
    },

    /// The service answered with an empty or unparseable body.
    #[error("port {port} returned a malformed response (HTTP {http_status}): {snippet:?}")]
    MalformedResponse {
        /// Port that answered.
        port: u16,
        /// HTTP status code of the answer.
        http_status: u16,
        /// Truncated raw body.
        snippet: String,
    },

    /// The request exceeded its time bound.
    #[error("port {port} did not answer within {timeout_ms} ms")]
    Timeout {
        /// Port attempted.
        port: u16,
        /// Bound that was exceeded.
        timeout_ms: u64,
    },
}

fn format_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised when starting a detection trigger.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TriggerError {
    /// A keypress trigger arrived while a detection was still running.
    #[error("a detection is already in flight")]
    DetectionInFlight,
}
