//! Shared per-hop statistics table
//!
//! The [`HopTable`] is the only state shared between probers, resolver
//! tasks, and whoever renders the results. Every access goes through one
//! mutex; no method performs I/O while holding it.

use super::hop::{HopRecord, MAX_HOPS};
use super::path::estimate_path_length;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

struct TableState {
    hops: Vec<HopRecord>,
    target: Option<IpAddr>,
    generation: u64,
}

/// Fixed-size table of [`HopRecord`]s indexed by hop distance (1-based).
///
/// Reads of out-of-range distances return an empty record; writes to them
/// are ignored.
pub struct HopTable {
    state: Mutex<TableState>,
}

impl Default for HopTable {
    fn default() -> Self {
        Self::new()
    }
}

fn index(distance: u8) -> Option<usize> {
    (1..=MAX_HOPS)
        .contains(&distance)
        .then(|| usize::from(distance) - 1)
}

impl HopTable {
    /// Create an empty table with no target.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                hops: vec![HopRecord::default(); MAX_HOPS as usize],
                target: None,
                generation: 0,
            }),
        }
    }

    fn with_hop<R>(&self, distance: u8, f: impl FnOnce(&mut HopRecord) -> R) -> Option<R> {
        let i = index(distance)?;
        let mut state = self.state.lock().expect("mutex poisoned");
        Some(f(&mut state.hops[i]))
    }

    /// Clear every record and the target, starting a new generation.
    pub fn reset_all(&self) {
        self.begin_generation(None);
    }

    /// Clear every record and install `target` in one step.
    ///
    /// Returns the number of the generation that just started.
    pub fn begin_generation(&self, target: Option<IpAddr>) -> u64 {
        let mut state = self.state.lock().expect("mutex poisoned");
        for hop in state.hops.iter_mut() {
            *hop = HopRecord::default();
        }
        state.target = target;
        state.generation += 1;
        state.generation
    }

    /// Target address of the current generation.
    pub fn target(&self) -> Option<IpAddr> {
        self.state.lock().expect("mutex poisoned").target
    }

    /// Number of the current generation.
    pub fn generation(&self) -> u64 {
        self.state.lock().expect("mutex poisoned").generation
    }

    /// Copy of the record at `distance`.
    pub fn get(&self, distance: u8) -> HopRecord {
        self.with_hop(distance, |hop| hop.clone())
            .unwrap_or_default()
    }

    /// Latch `addr` as the address of `distance` unless one is already set.
    ///
    /// Returns `true` only for the call that actually latched.
    pub fn set_address_if_unset(&self, distance: u8, addr: IpAddr) -> bool {
        if addr.is_unspecified() {
            return false;
        }
        self.with_hop(distance, |hop| {
            if hop.address.is_some() {
                return false;
            }
            hop.address = Some(addr);
            true
        })
        .unwrap_or(false)
    }

    /// Replace the display name of `distance`.
    pub fn set_name(&self, distance: u8, name: impl Into<String>) {
        let name = name.into();
        self.with_hop(distance, |hop| hop.name = name);
    }

    /// Replace the display name of `distance` if the table is still in
    /// `generation`. Returns whether the name was stored.
    pub fn set_name_in_generation(
        &self,
        distance: u8,
        generation: u64,
        name: impl Into<String>,
    ) -> bool {
        let Some(i) = index(distance) else {
            return false;
        };
        let mut state = self.state.lock().expect("mutex poisoned");
        if state.generation != generation {
            return false;
        }
        state.hops[i].name = name.into();
        true
    }

    /// Count one echo request sent to `distance`.
    pub fn record_probe(&self, distance: u8) {
        self.with_hop(distance, |hop| hop.sent += 1);
    }

    /// Fold one identifying reply into the statistics of `distance`.
    ///
    /// Ignored unless a probe to `distance` is still unanswered. Returns
    /// whether the reply was counted.
    pub fn record_reply(&self, distance: u8, rtt: Duration) -> bool {
        self.with_hop(distance, |hop| hop.add_sample(rtt))
            .unwrap_or(false)
    }

    /// Number of live hops, see [`estimate_path_length`].
    pub fn path_length(&self) -> u8 {
        let state = self.state.lock().expect("mutex poisoned");
        estimate_path_length(&state.hops, state.target)
    }

    /// Records of the live path in increasing distance order.
    pub fn snapshot(&self) -> Vec<HopRecord> {
        let state = self.state.lock().expect("mutex poisoned");
        let len = estimate_path_length(&state.hops, state.target);
        state.hops[..usize::from(len)].to_vec()
    }

    /// Latched address of `distance`.
    pub fn address(&self, distance: u8) -> Option<IpAddr> {
        self.with_hop(distance, |hop| hop.address).flatten()
    }

    /// Display name of `distance` (name, else numeric address).
    pub fn name(&self, distance: u8) -> String {
        self.with_hop(distance, |hop| hop.display_name())
            .unwrap_or_default()
    }

    /// Shortest round-trip time of `distance`.
    pub fn best(&self, distance: u8) -> Duration {
        self.get(distance).best_rtt
    }

    /// Longest round-trip time of `distance`.
    pub fn worst(&self, distance: u8) -> Duration {
        self.get(distance).worst_rtt
    }

    /// Mean round-trip time of `distance`.
    pub fn avg(&self, distance: u8) -> Duration {
        self.get(distance).avg_rtt()
    }

    /// Most recent round-trip time of `distance`.
    pub fn last(&self, distance: u8) -> Duration {
        self.get(distance).last_rtt
    }

    /// Packet loss of `distance` in whole percent.
    pub fn loss_percent(&self, distance: u8) -> u32 {
        self.get(distance).loss_percent()
    }

    /// Echo requests sent to `distance`.
    pub fn sent(&self, distance: u8) -> u32 {
        self.get(distance).sent
    }

    /// Identifying replies received from `distance`.
    pub fn received(&self, distance: u8) -> u32 {
        self.get(distance).received
    }
}
