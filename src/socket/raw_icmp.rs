//! Raw ICMP echo transport
//!
//! One [`RawIcmpTransport`] is owned by each prober. Raw ICMP sockets see
//! every ICMP message addressed to the host, so replies are filtered by the
//! generation's identifier and by the sequence number of the outstanding
//! request. Works for both address families through [`IcmpFamily`].

use super::async_trait::EchoTransport;
use super::family::{parse_reply, IcmpFamily, ICMP_HEADER_LEN};
use crate::probe::{EchoReply, ProbeId};
use crate::trace::IcmpStatus;
use async_trait::async_trait;
use socket2::{SockAddr, Socket, Type};
use std::io;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::io::unix::AsyncFd;
use tracing::{debug, trace, warn};

/// Room for the outer IP header and the headers quoted by ICMP errors
const REPLY_HEADROOM_BYTES: usize = 128;
/// Smallest receive buffer, one Ethernet MTU
const MIN_REPLY_BUFFER_BYTES: usize = 1500;

/// Receive buffer size able to hold the echo reply for `payload_len` bytes.
pub fn reply_buffer_size(payload_len: usize) -> usize {
    (payload_len + ICMP_HEADER_LEN + REPLY_HEADROOM_BYTES).max(MIN_REPLY_BUFFER_BYTES)
}

/// Map a local socket error to the status recorded on the hop.
pub fn status_from_io_error(err: &io::Error) -> IcmpStatus {
    if err.kind() == io::ErrorKind::WouldBlock {
        return IcmpStatus::NoResources;
    }
    match err.raw_os_error() {
        Some(libc::ENOBUFS) | Some(libc::ENOMEM) => IcmpStatus::NoResources,
        Some(libc::EMSGSIZE) => IcmpStatus::PacketTooBig,
        Some(libc::ENETUNREACH) | Some(libc::ENETDOWN) => IcmpStatus::DestNetUnreachable,
        Some(libc::EHOSTUNREACH) | Some(libc::EHOSTDOWN) => IcmpStatus::DestHostUnreachable,
        Some(libc::EADDRNOTAVAIL) | Some(libc::EDESTADDRREQ) => IcmpStatus::BadDestination,
        Some(libc::EINVAL) => IcmpStatus::BadRequest,
        Some(libc::ENOPROTOOPT) => IcmpStatus::BadOption,
        Some(libc::EIO) => IcmpStatus::HardwareError,
        _ => IcmpStatus::GeneralFailure,
    }
}

fn local_failure(err: &io::Error) -> EchoReply {
    EchoReply {
        from: None,
        status: status_from_io_error(err),
        rtt: Duration::ZERO,
    }
}

/// Echo transport over a raw ICMP socket of family `F`
pub struct RawIcmpTransport<F: IcmpFamily> {
    socket: AsyncFd<Socket>,
    identifier: u16,
    _family: PhantomData<F>,
}

impl<F: IcmpFamily> RawIcmpTransport<F> {
    /// Open a raw socket tagged with `identifier`.
    ///
    /// Must be called from within a Tokio runtime. Fails without the
    /// privileges needed for raw sockets.
    pub fn new(identifier: u16) -> io::Result<Self> {
        let socket = Socket::new(F::DOMAIN, Type::RAW, Some(F::PROTOCOL))?;
        socket.set_nonblocking(true)?;
        trace!(family = F::NAME, identifier, "Opened raw socket");

        Ok(Self {
            socket: AsyncFd::new(socket)?,
            identifier,
            _family: PhantomData,
        })
    }

    /// Wait for the reply carrying `sequence`, skipping everything else.
    async fn recv_matching(
        &self,
        sequence: u16,
        sent_at: Instant,
        buf: &mut [MaybeUninit<u8>],
    ) -> io::Result<EchoReply> {
        loop {
            let mut guard = self.socket.readable().await?;
            let (len, addr) = match guard.try_io(|inner| inner.get_ref().recv_from(&mut *buf)) {
                Ok(result) => result?,
                Err(_would_block) => continue,
            };
            let received_at = Instant::now();

            // SAFETY: recv_from initialized the first `len` bytes
            let datagram = unsafe { std::slice::from_raw_parts(buf.as_ptr().cast::<u8>(), len) };

            let Some(parsed) = parse_reply::<F>(datagram, self.identifier) else {
                continue;
            };
            if parsed.sequence != sequence {
                trace!(
                    expected = ?ProbeId::from_sequence(sequence),
                    got = ?ProbeId::from_sequence(parsed.sequence),
                    "Skipping reply to another probe"
                );
                continue;
            }

            return Ok(EchoReply {
                from: addr.as_socket().map(|a| a.ip()),
                status: parsed.status,
                rtt: received_at.duration_since(sent_at),
            });
        }
    }
}

#[async_trait]
impl<F: IcmpFamily> EchoTransport for RawIcmpTransport<F> {
    async fn echo(
        &self,
        target: IpAddr,
        probe: ProbeId,
        payload: &[u8],
        timeout: Duration,
    ) -> Option<EchoReply> {
        if let Err(e) = F::set_hop_limit(self.socket.get_ref(), probe.hop) {
            warn!(hop = probe.hop, "Failed to set hop limit: {}", e);
            return Some(local_failure(&e));
        }

        let sequence = probe.to_sequence();
        let request = F::build_echo_request(self.identifier, sequence, payload);
        let dest = SockAddr::from(SocketAddr::new(target, 0));

        let sent_at = Instant::now();
        if let Err(e) = self.socket.get_ref().send_to(&request, &dest) {
            debug!(hop = probe.hop, "Failed to send echo request: {}", e);
            return Some(local_failure(&e));
        }

        let mut buf = vec![MaybeUninit::uninit(); reply_buffer_size(payload.len())];
        match tokio::time::timeout(timeout, self.recv_matching(sequence, sent_at, &mut buf)).await
        {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(e)) => {
                warn!(hop = probe.hop, "Failed to receive echo reply: {}", e);
                Some(local_failure(&e))
            }
            Err(_) => None,
        }
    }
}
