//! Async traits for echo transports
//!
//! A prober never touches a socket directly. It owns one [`EchoTransport`]
//! created by a [`TransportFactory`] when the trace starts, which lets the
//! session run against real raw sockets or against a simulated network.

use crate::probe::{EchoReply, ProbeId};
use crate::trace::TraceError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Sends ICMP echo requests and waits for the matching reply.
#[async_trait]
pub trait EchoTransport: Send + Sync {
    /// Send one echo request to `target` with hop limit `probe.hop` and
    /// wait up to `timeout` for the matching reply.
    ///
    /// Returns `None` when nothing matching arrived in time. Local send
    /// failures are reported as a reply with `from == None` and the status
    /// that best describes the failure.
    async fn echo(
        &self,
        target: IpAddr,
        probe: ProbeId,
        payload: &[u8],
        timeout: Duration,
    ) -> Option<EchoReply>;
}

/// Creates one transport per prober.
pub trait TransportFactory: Send + Sync {
    /// Create a transport able to probe `target`, tagging its requests
    /// with `identifier`.
    ///
    /// Failing here aborts the start of a trace before any state changes.
    fn create(&self, target: IpAddr, identifier: u16)
        -> Result<Box<dyn EchoTransport>, TraceError>;
}
