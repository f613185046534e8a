//! Classification of echo outcomes
//!
//! Every reply that comes back for a probe is reduced to one [`IcmpStatus`].
//! Only [`IcmpStatus::Success`] and [`IcmpStatus::TtlExpiredTransit`] identify
//! a hop; every other status is reported on the hop as a fixed description.

use serde::{Deserialize, Serialize};

/// Outcome of a single ICMP echo as seen by a prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IcmpStatus {
    /// Echo reply from the probed address
    Success,
    /// The hop limit ran out at an intermediate router
    TtlExpiredTransit,
    /// The reply did not fit into the receive buffer
    BufferTooSmall,
    /// Destination network unreachable
    DestNetUnreachable,
    /// Destination host unreachable
    DestHostUnreachable,
    /// Destination protocol unreachable
    DestProtocolUnreachable,
    /// Destination port unreachable
    DestPortUnreachable,
    /// The local stack ran out of buffers
    NoResources,
    /// An IP option was rejected
    BadOption,
    /// The local interface reported an I/O failure
    HardwareError,
    /// The datagram needs fragmentation or exceeds the path MTU
    PacketTooBig,
    /// The transport gave up waiting for a reply
    RequestTimedOut,
    /// The request itself was malformed
    BadRequest,
    /// Routing to the destination failed
    BadRoute,
    /// The hop limit ran out while reassembling fragments
    TtlExpiredReassembly,
    /// A router reported a header parameter problem
    ParameterProblem,
    /// A router asked the sender to slow down
    SourceQuench,
    /// An IP option exceeded its allowed length
    OptionTooBig,
    /// The destination address is not usable
    BadDestination,
    /// Anything not covered above
    GeneralFailure,
}

impl IcmpStatus {
    /// Whether this outcome reveals the address and latency of a hop.
    pub fn identifies_hop(self) -> bool {
        matches!(self, IcmpStatus::Success | IcmpStatus::TtlExpiredTransit)
    }

    /// Fixed human-readable description shown in place of a hop name.
    pub fn description(self) -> &'static str {
        match self {
            IcmpStatus::Success => "Success.",
            IcmpStatus::TtlExpiredTransit => "The time to live expired in transit.",
            IcmpStatus::BufferTooSmall => "Reply buffer too small.",
            IcmpStatus::DestNetUnreachable => "Destination network unreachable.",
            IcmpStatus::DestHostUnreachable => "Destination host unreachable.",
            IcmpStatus::DestProtocolUnreachable => "Destination protocol unreachable.",
            IcmpStatus::DestPortUnreachable => "Destination port unreachable.",
            IcmpStatus::NoResources => "Insufficient IP resources were available.",
            IcmpStatus::BadOption => "Bad IP option was specified.",
            IcmpStatus::HardwareError => "Hardware error occurred.",
            IcmpStatus::PacketTooBig => "Packet was too big.",
            IcmpStatus::RequestTimedOut => "Request timed out.",
            IcmpStatus::BadRequest => "Bad request.",
            IcmpStatus::BadRoute => "Bad route.",
            IcmpStatus::TtlExpiredReassembly => {
                "The time to live expired during fragment reassembly."
            }
            IcmpStatus::ParameterProblem => "Parameter problem.",
            IcmpStatus::SourceQuench => {
                "Datagrams are arriving too fast to be processed and datagrams may have been discarded."
            }
            IcmpStatus::OptionTooBig => "An IP option was too big.",
            IcmpStatus::BadDestination => "Bad destination.",
            IcmpStatus::GeneralFailure => "General failure.",
        }
    }

    /// Map an ICMPv4 type/code pair to a status.
    ///
    /// Returns `None` for message types that are never a reply to an echo
    /// request (e.g. another host's echo request seen on a raw socket).
    pub fn from_icmpv4(icmp_type: u8, code: u8) -> Option<Self> {
        let status = match icmp_type {
            0 => IcmpStatus::Success,
            3 => match code {
                0 => IcmpStatus::DestNetUnreachable,
                1 => IcmpStatus::DestHostUnreachable,
                2 => IcmpStatus::DestProtocolUnreachable,
                3 => IcmpStatus::DestPortUnreachable,
                4 => IcmpStatus::PacketTooBig,
                5 => IcmpStatus::BadRoute,
                6 | 7 => IcmpStatus::BadDestination,
                _ => IcmpStatus::DestHostUnreachable,
            },
            4 => IcmpStatus::SourceQuench,
            5 => IcmpStatus::BadRoute,
            11 => match code {
                0 => IcmpStatus::TtlExpiredTransit,
                _ => IcmpStatus::TtlExpiredReassembly,
            },
            12 => match code {
                2 => IcmpStatus::OptionTooBig,
                _ => IcmpStatus::ParameterProblem,
            },
            _ => return None,
        };
        Some(status)
    }

    /// Map an ICMPv6 type/code pair to a status.
    pub fn from_icmpv6(icmp_type: u8, code: u8) -> Option<Self> {
        let status = match icmp_type {
            129 => IcmpStatus::Success,
            1 => match code {
                0 => IcmpStatus::DestNetUnreachable,
                1 | 5 | 6 => IcmpStatus::BadRoute,
                2 => IcmpStatus::BadDestination,
                3 => IcmpStatus::DestHostUnreachable,
                4 => IcmpStatus::DestPortUnreachable,
                _ => IcmpStatus::DestHostUnreachable,
            },
            2 => IcmpStatus::PacketTooBig,
            3 => match code {
                0 => IcmpStatus::TtlExpiredTransit,
                _ => IcmpStatus::TtlExpiredReassembly,
            },
            4 => match code {
                0 => IcmpStatus::ParameterProblem,
                _ => IcmpStatus::BadOption,
            },
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for IcmpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
