//! Per-hop statistics record

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Maximum number of hops probed per trace.
pub const MAX_HOPS: u8 = 30;

/// Statistics for one hop distance.
///
/// Records are plain values: the [`HopTable`](super::HopTable) hands out
/// copies, so a record never changes underneath its reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopRecord {
    /// Responding address, latched on the first identifying reply
    pub address: Option<IpAddr>,
    /// Resolved host name or status description, empty until set
    pub name: String,
    /// Number of echo requests sent
    pub sent: u32,
    /// Number of identifying replies received
    pub received: u32,
    /// Most recent round-trip time
    pub last_rtt: Duration,
    /// Shortest round-trip time seen
    pub best_rtt: Duration,
    /// Longest round-trip time seen
    pub worst_rtt: Duration,
    /// Sum of all round-trip times seen
    pub total_rtt: Duration,
}

impl HopRecord {
    /// Packet loss in whole percent.
    pub fn loss_percent(&self) -> u32 {
        if self.sent == 0 {
            0
        } else {
            let received = u64::from(self.received.min(self.sent));
            let answered = 100 * received / u64::from(self.sent);
            100 - answered as u32
        }
    }

    /// Mean round-trip time over all received replies.
    pub fn avg_rtt(&self) -> Duration {
        if self.received == 0 {
            Duration::ZERO
        } else {
            self.total_rtt / self.received
        }
    }

    /// Name to display for this hop: the stored name, else the numeric
    /// address, else an empty string.
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.address.map(|a| a.to_string()).unwrap_or_default()
    }

    /// Fold one round-trip sample into the aggregates.
    ///
    /// A sample without an outstanding probe is ignored so that
    /// `received <= sent` always holds. Returns whether it was counted.
    pub(crate) fn add_sample(&mut self, rtt: Duration) -> bool {
        if self.received >= self.sent {
            return false;
        }
        if self.received == 0 || rtt < self.best_rtt {
            self.best_rtt = rtt;
        }
        if rtt > self.worst_rtt {
            self.worst_rtt = rtt;
        }
        self.last_rtt = rtt;
        self.total_rtt += rtt;
        self.received += 1;
        true
    }
}
