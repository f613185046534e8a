//! Per-hop probing loop

use super::resolver;
use super::table::HopTable;
use crate::config::OptionsProvider;
use crate::dns::NameResolver;
use crate::probe::{echo_payload, EchoReply, ProbeId};
use crate::socket::EchoTransport;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Repeatedly probes one hop distance until the session stops or the hop
/// falls beyond the estimated path length.
pub(crate) struct Prober {
    pub(crate) hop: u8,
    pub(crate) target: IpAddr,
    pub(crate) generation: u64,
    pub(crate) transport: Box<dyn EchoTransport>,
    pub(crate) table: Arc<HopTable>,
    pub(crate) options: Arc<dyn OptionsProvider>,
    pub(crate) resolver: Option<Arc<dyn NameResolver>>,
    pub(crate) active: Arc<AtomicBool>,
}

impl Prober {
    pub(crate) async fn run(self) {
        let hop = self.hop;
        debug!(hop, "Prober started");

        let mut round: u8 = 0;
        loop {
            if !self.active.load(Ordering::Acquire) {
                break;
            }
            if hop > self.table.path_length() {
                trace!(hop, "Hop is beyond the path");
                break;
            }

            let payload = echo_payload(self.options.ping_payload_size());
            let probe = ProbeId::new(hop, round);
            round = round.wrapping_add(1);

            let reply = self
                .transport
                .echo(self.target, probe, &payload, self.options.probe_timeout())
                .await;
            self.table.record_probe(hop);

            match reply {
                Some(reply) => {
                    self.observe(&reply);
                    let pause = self.options.probe_interval().saturating_sub(reply.rtt);
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                }
                None => trace!(hop, round = probe.round, "Echo timed out"),
            }
        }

        debug!(hop, "Prober finished");
    }

    fn observe(&self, reply: &EchoReply) {
        let hop = self.hop;
        trace!(hop, from = ?reply.from, status = ?reply.status, rtt = ?reply.rtt, "Echo reply");

        if !reply.status.identifies_hop() {
            self.table.set_name(hop, reply.status.description());
            return;
        }

        self.table.record_reply(hop, reply.rtt);
        let Some(address) = reply.from else {
            return;
        };
        if !self.table.set_address_if_unset(hop, address) {
            return;
        }
        debug!(hop, %address, "Latched hop address");

        if self.options.use_reverse_name_resolution() {
            if let Some(resolver) = &self.resolver {
                resolver::dispatch(
                    Arc::clone(&self.table),
                    Arc::clone(resolver),
                    hop,
                    self.generation,
                    address,
                );
            }
        }
    }
}
