//! Reverse DNS lookup functionality

use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Error type for reverse DNS operations
#[derive(Debug, thiserror::Error)]
pub enum ReverseDnsError {
    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    ResolutionError(String),

    /// No PTR record found
    #[error("No PTR record found")]
    NotFound,
}

/// Turns hop addresses into host names.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Look up the name of `ip`.
    async fn reverse(&self, ip: IpAddr) -> Result<String, ReverseDnsError>;
}

/// [`NameResolver`] backed by a hickory resolver
#[derive(Clone)]
pub struct HickoryNameResolver {
    resolver: Arc<TokioResolver>,
}

impl HickoryNameResolver {
    /// Use the system resolver configuration, falling back to Cloudflare.
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(create_default_resolver()))
    }

    /// Share an existing resolver
    pub fn with_resolver(resolver: Arc<TokioResolver>) -> Self {
        Self { resolver }
    }
}

impl Default for HickoryNameResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameResolver for HickoryNameResolver {
    async fn reverse(&self, ip: IpAddr) -> Result<String, ReverseDnsError> {
        reverse_dns_lookup(ip, &self.resolver).await
    }
}

/// Perform reverse DNS lookup for an IP address
pub async fn reverse_dns_lookup(
    ip: IpAddr,
    resolver: &TokioResolver,
) -> Result<String, ReverseDnsError> {
    let lookup = resolver
        .reverse_lookup(ip)
        .await
        .map_err(|e| ReverseDnsError::ResolutionError(e.to_string()))?;

    // Get the first PTR record
    lookup
        .iter()
        .next()
        .map(|name| trim_root(&name.to_string()).to_string())
        .filter(|name| !name.is_empty())
        .ok_or(ReverseDnsError::NotFound)
}

/// Remove the trailing root label dot.
fn trim_root(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Create a default DNS resolver
///
/// Reads the system configuration; when that is unavailable the Cloudflare
/// public resolvers are used.
pub fn create_default_resolver() -> TokioResolver {
    match TokioResolver::builder_tokio() {
        Ok(builder) => builder.build(),
        Err(e) => {
            debug!("System resolver configuration unavailable: {}", e);
            TokioResolver::builder_with_config(
                ResolverConfig::cloudflare(),
                TokioConnectionProvider::default(),
            )
            .build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_trim_root() {
        assert_eq!(trim_root("router.example.net."), "router.example.net");
        assert_eq!(trim_root("router.example.net"), "router.example.net");
        assert_eq!(trim_root("."), "");
    }

    #[tokio::test]
    async fn test_reverse_dns_localhost() {
        let resolver = HickoryNameResolver::new();
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        // Depends on the host's resolver; only a non-empty name is guaranteed
        if let Ok(hostname) = resolver.reverse(ip).await {
            assert!(!hostname.is_empty());
            assert!(!hostname.ends_with('.'));
        }
    }
}
