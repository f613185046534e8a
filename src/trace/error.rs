//! Error types for trace sessions

use std::net::IpAddr;
use thiserror::Error;

/// Errors surfaced when starting a trace
///
/// Per-probe failures never show up here: they are recorded on the hop
/// they happened at.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A trace is running or still draining
    #[error("A trace is already running; stop it and wait for it to finish first")]
    AlreadyTracing,

    /// The probe transport cannot handle this address family
    #[error("Address family of {0} is not supported")]
    UnsupportedFamily(IpAddr),

    /// The target address cannot be traced (unspecified or multicast)
    #[error("Cannot trace {0}")]
    InvalidTarget(IpAddr),

    /// The probe transport could not be initialized
    ///
    /// Typically missing privileges for raw ICMP sockets.
    #[error("Failed to initialize probe transport: {0}")]
    TransportInit(String),

    /// Host name could not be resolved to an address
    #[error("Failed to resolve host: {0}")]
    ResolutionError(String),

    /// Invalid options provided
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A trace was started outside of a Tokio runtime
    #[error("A trace must be started from within a Tokio runtime")]
    NoRuntime,
}
