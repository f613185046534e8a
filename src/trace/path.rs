//! Live path length estimation

use super::hop::{HopRecord, MAX_HOPS};
use std::net::IpAddr;

/// Estimate how many hops of the table are part of the live path.
///
/// The first hop whose latched address equals `target` ends the path. When
/// the target never answers, a tail of hops that all latched the same
/// address (typically the last router in front of a silent host) is
/// collapsed onto its first occurrence. Without either signal the full
/// table is live.
///
/// The result is always in `1..=MAX_HOPS`.
pub fn estimate_path_length(hops: &[HopRecord], target: Option<IpAddr>) -> u8 {
    let len = hops.len().min(MAX_HOPS as usize);
    if len == 0 {
        return 1;
    }

    if let Some(target) = target {
        if let Some(index) = hops[..len]
            .iter()
            .position(|hop| hop.address == Some(target))
        {
            return (index + 1) as u8;
        }
    }

    let mut max = len;
    while max > 1 {
        match (hops[max - 1].address, hops[max - 2].address) {
            (Some(last), Some(previous)) if last == previous => max -= 1,
            _ => break,
        }
    }
    max as u8
}
