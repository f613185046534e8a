//! Simulated network for exercising sessions without raw sockets
//!
//! Routers sit at every hop below the target hop and answer with
//! ttl-expired after `hop` milliseconds; the target answers every probe
//! that reaches it after 10 ms. Individual hops can be made silent or
//! answer with an arbitrary status.

use crate::dns::{NameResolver, ReverseDnsError};
use crate::probe::{EchoReply, ProbeId};
use crate::socket::{EchoTransport, TransportFactory};
use crate::trace::{IcmpStatus, TraceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const TARGET_RTT: Duration = Duration::from_millis(10);

#[derive(Clone)]
pub(crate) struct SimNetwork {
    pub(crate) target: IpAddr,
    target_hop: u8,
    silent: Vec<u8>,
    statuses: HashMap<u8, IcmpStatus>,
}

impl SimNetwork {
    pub(crate) fn new(target: IpAddr, target_hop: u8) -> Arc<Self> {
        Arc::new(Self {
            target,
            target_hop,
            silent: Vec::new(),
            statuses: HashMap::new(),
        })
    }

    pub(crate) fn default_target() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9))
    }

    /// Router answering at `hop`, in the target's family
    pub(crate) fn router(&self, hop: u8) -> IpAddr {
        match self.target {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::new(10, 0, 0, hop)),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, u16::from(hop))),
        }
    }

    pub(crate) fn with_silent_hop(self: Arc<Self>, hop: u8) -> Arc<Self> {
        let mut network = Arc::unwrap_or_clone(self);
        network.silent.push(hop);
        Arc::new(network)
    }

    pub(crate) fn with_status(self: Arc<Self>, hop: u8, status: IcmpStatus) -> Arc<Self> {
        let mut network = Arc::unwrap_or_clone(self);
        network.statuses.insert(hop, status);
        Arc::new(network)
    }

    pub(crate) fn factory(self: &Arc<Self>) -> Arc<dyn TransportFactory> {
        Arc::new(SimFactory {
            network: Arc::clone(self),
        })
    }

    fn answer(&self, hop: u8) -> Option<EchoReply> {
        if self.silent.contains(&hop) {
            return None;
        }
        let rtt = if hop >= self.target_hop {
            TARGET_RTT
        } else {
            Duration::from_millis(u64::from(hop))
        };
        let (from, default_status) = if hop >= self.target_hop {
            (self.target, IcmpStatus::Success)
        } else {
            (self.router(hop), IcmpStatus::TtlExpiredTransit)
        };
        Some(EchoReply {
            from: Some(from),
            status: self.statuses.get(&hop).copied().unwrap_or(default_status),
            rtt,
        })
    }
}

struct SimFactory {
    network: Arc<SimNetwork>,
}

impl TransportFactory for SimFactory {
    fn create(
        &self,
        _target: IpAddr,
        _identifier: u16,
    ) -> Result<Box<dyn EchoTransport>, TraceError> {
        Ok(Box::new(SimTransport {
            network: Arc::clone(&self.network),
        }))
    }
}

struct SimTransport {
    network: Arc<SimNetwork>,
}

#[async_trait]
impl EchoTransport for SimTransport {
    async fn echo(
        &self,
        target: IpAddr,
        probe: ProbeId,
        _payload: &[u8],
        timeout: Duration,
    ) -> Option<EchoReply> {
        assert_eq!(target, self.network.target);
        match self.network.answer(probe.hop) {
            Some(reply) if reply.rtt < timeout => {
                tokio::time::sleep(reply.rtt).await;
                Some(reply)
            }
            _ => {
                tokio::time::sleep(timeout).await;
                None
            }
        }
    }
}

/// Factory whose transport creation fails after `ok` successes
pub(crate) struct FailingFactory {
    ok: usize,
    created: AtomicUsize,
}

impl FailingFactory {
    pub(crate) fn after(ok: usize) -> Self {
        Self {
            ok,
            created: AtomicUsize::new(0),
        }
    }
}

impl TransportFactory for FailingFactory {
    fn create(
        &self,
        _target: IpAddr,
        _identifier: u16,
    ) -> Result<Box<dyn EchoTransport>, TraceError> {
        if self.created.fetch_add(1, Ordering::SeqCst) < self.ok {
            Ok(Box::new(SimTransport {
                network: SimNetwork::new(SimNetwork::default_target(), 1),
            }))
        } else {
            Err(TraceError::TransportInit("simulated failure".to_string()))
        }
    }
}

/// Resolver naming every address `host-<addr>.sim`
pub(crate) struct SimResolver;

impl SimResolver {
    pub(crate) fn name_of(ip: IpAddr) -> String {
        format!("host-{ip}.sim")
    }
}

#[async_trait]
impl NameResolver for SimResolver {
    async fn reverse(&self, ip: IpAddr) -> Result<String, ReverseDnsError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Self::name_of(ip))
    }
}
