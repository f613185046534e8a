//! Detached reverse lookups for latched hop addresses

use super::table::HopTable;
use crate::dns::NameResolver;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, trace};

/// Name `address` at `hop` in the background.
///
/// Falls back to the numeric address when the lookup fails. The write is
/// dropped if the table moved on to another generation meanwhile. The task
/// holds its own handle to the table and is never awaited.
pub(crate) fn dispatch(
    table: Arc<HopTable>,
    resolver: Arc<dyn NameResolver>,
    hop: u8,
    generation: u64,
    address: IpAddr,
) {
    tokio::spawn(async move {
        let name = match resolver.reverse(address).await {
            Ok(name) => {
                debug!(hop, %address, name = %name, "Resolved hop");
                name
            }
            Err(e) => {
                debug!(hop, %address, "Reverse lookup failed: {}", e);
                address.to_string()
            }
        };
        if !table.set_name_in_generation(hop, generation, name) {
            trace!(hop, generation, "Dropped name from a previous generation");
        }
    });
}
