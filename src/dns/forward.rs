//! Forward resolution of the trace target

use super::reverse::create_default_resolver;
use crate::trace::TraceError;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use tracing::debug;

/// Address family the target must be resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    /// First address returned, whatever its family
    #[default]
    Any,
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
}

impl AddressFamily {
    /// Whether `ip` belongs to this family
    pub fn accepts(self, ip: &IpAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            AddressFamily::Any => "IP",
            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
        }
    }
}

/// Resolve `host` to the address to trace.
///
/// Numeric addresses are returned as-is when they match `family`.
pub async fn resolve_target(
    host: &str,
    family: AddressFamily,
    resolver: Option<&TokioResolver>,
) -> Result<IpAddr, TraceError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return if family.accepts(&ip) {
            Ok(ip)
        } else {
            Err(TraceError::ResolutionError(format!(
                "{host} is not an {} address",
                family.label()
            )))
        };
    }

    let default_resolver;
    let resolver = match resolver {
        Some(r) => r,
        None => {
            default_resolver = create_default_resolver();
            &default_resolver
        }
    };

    let response = resolver
        .lookup_ip(host)
        .await
        .map_err(|e| TraceError::ResolutionError(e.to_string()))?;

    let ip = response
        .iter()
        .find(|ip| family.accepts(ip))
        .ok_or_else(|| {
            TraceError::ResolutionError(format!("No {} address found for {host}", family.label()))
        })?;
    debug!(host, %ip, "Resolved target");
    Ok(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_numeric_target_skips_lookup() {
        let ip = resolve_target("192.0.2.7", AddressFamily::Any, None)
            .await
            .unwrap();
        assert_eq!(ip, "192.0.2.7".parse::<IpAddr>().unwrap());

        let ip = resolve_target("2001:db8::7", AddressFamily::V6, None)
            .await
            .unwrap();
        assert!(ip.is_ipv6());
    }

    #[tokio::test]
    async fn test_numeric_target_family_mismatch() {
        let err = resolve_target("192.0.2.7", AddressFamily::V6, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TraceError::ResolutionError(msg) if msg.contains("IPv6")));
    }

    #[test]
    fn test_family_accepts() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "::1".parse().unwrap();
        assert!(AddressFamily::Any.accepts(&v4) && AddressFamily::Any.accepts(&v6));
        assert!(AddressFamily::V4.accepts(&v4) && !AddressFamily::V4.accepts(&v6));
        assert!(AddressFamily::V6.accepts(&v6) && !AddressFamily::V6.accepts(&v4));
    }
}
