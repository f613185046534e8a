//! rmtr - a continuous per-hop ICMP traceroute and ping diagnostic
//!
//! A [`TraceSession`] probes every hop distance from 1 to [`MAX_HOPS`]
//! concurrently, one Tokio task per hop, and aggregates loss and
//! round-trip statistics in a shared [`HopTable`] that can be read at any
//! time while the trace runs.
//!
//! ```no_run
//! use rmtr::{TraceOptions, TraceSession};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), rmtr::TraceError> {
//! let session = TraceSession::new(Arc::new(TraceOptions::default()));
//! session.start("192.0.2.1".parse().unwrap())?;
//! tokio::time::sleep(Duration::from_secs(10)).await;
//! session.stop_and_wait().await;
//!
//! for (i, hop) in session.table().snapshot().iter().enumerate() {
//!     println!("{:2} {} {}%", i + 1, hop.display_name(), hop.loss_percent());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dns;
pub mod probe;
pub mod report;
pub mod socket;
pub mod trace;

// Re-export core types for library users
pub use config::{OptionsProvider, TraceOptions, TraceOptionsBuilder};
pub use dns::{resolve_target, AddressFamily, HickoryNameResolver, NameResolver};
pub use probe::{EchoReply, ProbeId};
pub use socket::{EchoTransport, RawIcmpFactory, TransportFactory};
pub use trace::{
    estimate_path_length, HopRecord, HopTable, IcmpStatus, SessionState, TraceError,
    TraceSession, MAX_HOPS,
};
