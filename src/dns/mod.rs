//! DNS functionality: target resolution and hop name lookups

pub mod forward;
pub mod reverse;

pub use forward::{resolve_target, AddressFamily};
pub use reverse::{
    create_default_resolver, reverse_dns_lookup, HickoryNameResolver, NameResolver,
    ReverseDnsError,
};
