//! Core tracing engine: hop table, probers, and the session driving them

pub mod error;
pub mod hop;
pub mod path;
mod prober;
mod resolver;
pub mod session;
pub mod status;
pub mod table;

// Re-export commonly used types
pub use error::TraceError;
pub use hop::{HopRecord, MAX_HOPS};
pub use path::estimate_path_length;
pub use session::{SessionState, TraceSession};
pub use status::IcmpStatus;
pub use table::HopTable;
