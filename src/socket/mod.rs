//! Socket abstraction layer for ICMP echo probing
//!
//! Probers talk to an [`EchoTransport`]; the production implementation is a
//! raw ICMP/ICMPv6 socket per prober, created through [`RawIcmpFactory`].

pub mod async_trait;
pub mod factory;
pub mod family;
#[cfg(unix)]
pub mod raw_icmp;
pub mod utils;

pub use self::async_trait::{EchoTransport, TransportFactory};
pub use factory::RawIcmpFactory;
pub use family::{IcmpFamily, V4, V6};
