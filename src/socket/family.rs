//! Address-family specifics of ICMP echo probing
//!
//! The probe routine in [`raw_icmp`](super::raw_icmp) is written once and
//! parameterized by an [`IcmpFamily`]. A family describes how its socket is
//! opened, how the hop limit is set, what an echo request looks like on the
//! wire, and where the ICMP message and the quoted request live inside a
//! received datagram.

use crate::trace::IcmpStatus;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::Packet;
use pnet::util::checksum;
use socket2::{Domain, Protocol, Socket};
use std::io;

/// ICMP header length in bytes (type, code, checksum, identifier, sequence)
pub const ICMP_HEADER_LEN: usize = 8;
/// Fixed IPv6 header length in bytes
const IPV6_HEADER_LEN: usize = 40;

/// Family-specific knowledge needed to probe over raw ICMP sockets.
pub trait IcmpFamily: Send + Sync + 'static {
    /// Human-readable protocol name
    const NAME: &'static str;
    /// Socket domain
    const DOMAIN: Domain;
    /// Socket protocol
    const PROTOCOL: Protocol;
    /// ICMP type of an echo request
    const ECHO_REQUEST: u8;

    /// Set the hop limit of outgoing datagrams.
    fn set_hop_limit(socket: &Socket, hops: u8) -> io::Result<()>;

    /// Serialize an echo request.
    fn build_echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8>;

    /// Locate the ICMP message in a datagram read from the raw socket.
    fn icmp_message(datagram: &[u8]) -> Option<&[u8]>;

    /// Length of the IP header at the start of a quoted datagram.
    fn quoted_header_len(quoted: &[u8]) -> Option<usize>;

    /// Classify an ICMP type/code pair.
    fn status(icmp_type: u8, code: u8) -> Option<IcmpStatus>;
}

/// IPv4 / ICMP
pub struct V4;

/// IPv6 / ICMPv6
pub struct V6;

fn ipv4_header_len(datagram: &[u8]) -> Option<usize> {
    let packet = Ipv4Packet::new(datagram)?;
    if packet.get_version() != 4 {
        return None;
    }
    let len = usize::from(packet.get_header_length()) * 4;
    (len >= 20 && len <= datagram.len()).then_some(len)
}

impl IcmpFamily for V4 {
    const NAME: &'static str = "ICMP";
    const DOMAIN: Domain = Domain::IPV4;
    const PROTOCOL: Protocol = Protocol::ICMPV4;
    const ECHO_REQUEST: u8 = 8;

    fn set_hop_limit(socket: &Socket, hops: u8) -> io::Result<()> {
        socket.set_ttl_v4(u32::from(hops))
    }

    fn build_echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; MutableEchoRequestPacket::minimum_packet_size() + payload.len()];
        if let Some(mut packet) = MutableEchoRequestPacket::new(&mut buf) {
            packet.set_icmp_type(IcmpTypes::EchoRequest);
            packet.set_icmp_code(IcmpCode(0));
            packet.set_identifier(identifier);
            packet.set_sequence_number(sequence);
            packet.set_payload(payload);
            let sum = checksum(packet.packet(), 1);
            packet.set_checksum(sum);
        }
        buf
    }

    fn icmp_message(datagram: &[u8]) -> Option<&[u8]> {
        // IPv4 raw sockets deliver the IP header
        let header_len = ipv4_header_len(datagram)?;
        datagram.get(header_len..)
    }

    fn quoted_header_len(quoted: &[u8]) -> Option<usize> {
        ipv4_header_len(quoted)
    }

    fn status(icmp_type: u8, code: u8) -> Option<IcmpStatus> {
        IcmpStatus::from_icmpv4(icmp_type, code)
    }
}

impl IcmpFamily for V6 {
    const NAME: &'static str = "ICMPv6";
    const DOMAIN: Domain = Domain::IPV6;
    const PROTOCOL: Protocol = Protocol::ICMPV6;
    const ECHO_REQUEST: u8 = 128;

    fn set_hop_limit(socket: &Socket, hops: u8) -> io::Result<()> {
        socket.set_unicast_hops_v6(u32::from(hops))
    }

    fn build_echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
        // The kernel fills in the ICMPv6 checksum for raw sockets
        let mut buf = Vec::with_capacity(ICMP_HEADER_LEN + payload.len());
        buf.extend_from_slice(&[Self::ECHO_REQUEST, 0, 0, 0]);
        buf.extend_from_slice(&identifier.to_be_bytes());
        buf.extend_from_slice(&sequence.to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    fn icmp_message(datagram: &[u8]) -> Option<&[u8]> {
        Some(datagram)
    }

    fn quoted_header_len(quoted: &[u8]) -> Option<usize> {
        let packet = Ipv6Packet::new(quoted)?;
        (packet.get_version() == 6).then_some(IPV6_HEADER_LEN)
    }

    fn status(icmp_type: u8, code: u8) -> Option<IcmpStatus> {
        IcmpStatus::from_icmpv6(icmp_type, code)
    }
}

/// An ICMP message that answers one of our echo requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReply {
    /// Sequence number of the request being answered
    pub sequence: u16,
    /// Classified outcome
    pub status: IcmpStatus,
}

/// Parse a datagram read from a raw socket of family `F`.
///
/// Returns `None` unless the datagram is an echo reply, or an ICMP error
/// quoting an echo request, carrying `identifier`.
pub fn parse_reply<F: IcmpFamily>(datagram: &[u8], identifier: u16) -> Option<ParsedReply> {
    let icmp = F::icmp_message(datagram)?;
    if icmp.len() < ICMP_HEADER_LEN {
        return None;
    }
    let status = F::status(icmp[0], icmp[1])?;

    let echo_header = if status == IcmpStatus::Success {
        &icmp[..ICMP_HEADER_LEN]
    } else {
        let quoted = &icmp[ICMP_HEADER_LEN..];
        let inner_len = F::quoted_header_len(quoted)?;
        let echo = quoted.get(inner_len..inner_len + ICMP_HEADER_LEN)?;
        if echo[0] != F::ECHO_REQUEST {
            return None;
        }
        echo
    };

    let reply_identifier = u16::from_be_bytes([echo_header[4], echo_header[5]]);
    let sequence = u16::from_be_bytes([echo_header[6], echo_header[7]]);
    (reply_identifier == identifier).then_some(ParsedReply { sequence, status })
}
