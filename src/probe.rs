//! Probe-related types shared by the prober and the transports
//!
//! This module sits below both `socket` and `trace` to avoid circular
//! dependencies between them.

use crate::trace::IcmpStatus;
use std::net::IpAddr;
use std::time::Duration;

/// Identity of one echo request within a generation.
///
/// The hop distance travels in the high byte of the ICMP sequence number
/// and a per-hop wrapping counter in the low byte, so a reply can be
/// matched to both the hop and the attempt that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeId {
    /// Hop limit the request was sent with
    pub hop: u8,
    /// Per-hop attempt counter
    pub round: u8,
}

impl ProbeId {
    /// Create a probe id
    pub fn new(hop: u8, round: u8) -> Self {
        Self { hop, round }
    }

    /// Encode into a 16-bit ICMP sequence number
    pub fn to_sequence(self) -> u16 {
        (u16::from(self.hop) << 8) | u16::from(self.round)
    }

    /// Decode from a 16-bit ICMP sequence number
    pub fn from_sequence(sequence: u16) -> Self {
        Self {
            hop: (sequence >> 8) as u8,
            round: (sequence & 0xFF) as u8,
        }
    }
}

/// Reply to a single echo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    /// Address that answered; `None` when the failure was local
    pub from: Option<IpAddr>,
    /// Classified outcome
    pub status: IcmpStatus,
    /// Time between sending the request and receiving this reply
    pub rtt: Duration,
}

/// Build an echo payload of `size` filler bytes.
pub fn echo_payload(size: usize) -> Vec<u8> {
    vec![b' '; size]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_id_sequence_layout() {
        let id = ProbeId::new(7, 3);
        assert_eq!(id.to_sequence(), 0x0703);
        assert_eq!(ProbeId::from_sequence(0x1EFF), ProbeId::new(30, 255));
    }

    #[test]
    fn test_echo_payload_is_filler() {
        let payload = echo_payload(32);
        assert_eq!(payload.len(), 32);
        assert!(payload.iter().all(|b| *b == 0x20));
        assert!(echo_payload(0).is_empty());
    }
}
