//! Probe options supplied to the tracing engine
//!
//! The engine only ever reads options through the [`OptionsProvider`]
//! trait, so a front end can hand in anything from a fixed
//! [`TraceOptions`] value to settings that change while a trace runs.

use crate::trace::TraceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default echo payload size in bytes
pub const DEFAULT_PING_SIZE: usize = 64;
/// Largest accepted echo payload size in bytes
pub const MAX_PING_SIZE: usize = 8192;
/// Default interval between two probes of the same hop in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
/// Default time to wait for an echo reply in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5000;

/// Read-only view of the options a trace runs with.
pub trait OptionsProvider: Send + Sync {
    /// Number of filler bytes carried by every echo request
    fn ping_payload_size(&self) -> usize;

    /// Desired time between two probes of the same hop
    fn probe_interval(&self) -> Duration;

    /// Whether latched hop addresses are reverse-resolved
    fn use_reverse_name_resolution(&self) -> bool;

    /// How long a single echo may wait for its reply
    fn probe_timeout(&self) -> Duration {
        Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS)
    }
}

/// Options for a trace session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceOptions {
    /// Echo payload size in bytes (default: 64)
    pub ping_size: usize,
    /// Interval between probes of one hop (default: 1s)
    pub interval: Duration,
    /// Timeout for a single echo (default: 5s)
    pub probe_timeout: Duration,
    /// Resolve hop addresses to names (default: true)
    pub use_dns: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            ping_size: DEFAULT_PING_SIZE,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            use_dns: true,
        }
    }
}

impl TraceOptions {
    /// Create a new TraceOptions builder
    pub fn builder() -> TraceOptionsBuilder {
        TraceOptionsBuilder::new()
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), String> {
        if self.ping_size > MAX_PING_SIZE {
            return Err(format!("ping_size must be at most {MAX_PING_SIZE} bytes"));
        }
        if self.interval.is_zero() {
            return Err("interval must be greater than 0".to_string());
        }
        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl OptionsProvider for TraceOptions {
    fn ping_payload_size(&self) -> usize {
        self.ping_size
    }

    fn probe_interval(&self) -> Duration {
        self.interval
    }

    fn use_reverse_name_resolution(&self) -> bool {
        self.use_dns
    }

    fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }
}

/// Builder for TraceOptions
#[derive(Debug, Default)]
pub struct TraceOptionsBuilder {
    options: TraceOptions,
}

impl TraceOptionsBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the echo payload size in bytes
    pub fn ping_size(mut self, size: usize) -> Self {
        self.options.ping_size = size;
        self
    }

    /// Set the interval between probes of one hop
    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    /// Set the timeout for a single echo
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.options.probe_timeout = timeout;
        self
    }

    /// Enable or disable reverse name resolution
    pub fn use_dns(mut self, enable: bool) -> Self {
        self.options.use_dns = enable;
        self
    }

    /// Build the options, validating them first
    pub fn build(self) -> Result<TraceOptions, TraceError> {
        self.options.validate().map_err(TraceError::ConfigError)?;
        Ok(self.options)
    }
}
