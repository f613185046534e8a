//! Factory for the production echo transport

use super::async_trait::{EchoTransport, TransportFactory};
use crate::trace::TraceError;
use std::net::IpAddr;

/// Creates raw ICMP/ICMPv6 transports matching the target's family.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawIcmpFactory;

impl RawIcmpFactory {
    /// Create a new factory
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
fn init_error(target: IpAddr, err: &std::io::Error) -> TraceError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        return TraceError::TransportInit(format!(
            "raw {} sockets require root or CAP_NET_RAW ({})",
            if target.is_ipv4() { "ICMP" } else { "ICMPv6" },
            err
        ));
    }
    if err.raw_os_error() == Some(libc::EAFNOSUPPORT) {
        return TraceError::UnsupportedFamily(target);
    }
    TraceError::TransportInit(err.to_string())
}

impl TransportFactory for RawIcmpFactory {
    #[cfg(unix)]
    fn create(
        &self,
        target: IpAddr,
        identifier: u16,
    ) -> Result<Box<dyn EchoTransport>, TraceError> {
        use super::family::{V4, V6};
        use super::raw_icmp::RawIcmpTransport;

        let transport: std::io::Result<Box<dyn EchoTransport>> = match target {
            IpAddr::V4(_) => RawIcmpTransport::<V4>::new(identifier)
                .map(|t| Box::new(t) as Box<dyn EchoTransport>),
            IpAddr::V6(_) => RawIcmpTransport::<V6>::new(identifier)
                .map(|t| Box::new(t) as Box<dyn EchoTransport>),
        };
        transport.map_err(|e| init_error(target, &e))
    }

    #[cfg(not(unix))]
    fn create(
        &self,
        _target: IpAddr,
        _identifier: u16,
    ) -> Result<Box<dyn EchoTransport>, TraceError> {
        Err(TraceError::TransportInit(
            "raw ICMP sockets are not available on this platform".to_string(),
        ))
    }
}
