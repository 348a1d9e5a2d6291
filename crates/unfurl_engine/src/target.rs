//! Target validation: the only gate between user input and outbound requests.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use engine_logging::engine_debug;
use thiserror::Error;
use url::{Host, Url};

/// Reasons a raw URL is refused before any network access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidTarget {
    #[error("missing url")]
    Missing,
    #[error("invalid url: {0}")]
    Malformed(String),
    #[error("invalid protocol: {0}")]
    UnsupportedScheme(String),
    #[error("invalid host")]
    EmptyHost,
    #[error("blocked host: {0}")]
    BlockedHost(String),
    #[error("blocked ip: {0}")]
    BlockedIp(IpAddr),
    #[error("blocked host: {host} resolves to {ip}")]
    BlockedResolvedIp { host: String, ip: IpAddr },
}

/// An absolute http(s) URL whose host passed the blocklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(Url);

impl TargetUrl {
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host as it appears in the URL (IPv6 literals keep their brackets).
    pub fn host_str(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn into_url(self) -> Url {
        self.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Parse and vet a raw, user-supplied URL.
///
/// Pure: no DNS lookups, no I/O. A hostname that only *resolves* to a private
/// address passes; see [`check_resolved_host`] for the opt-in lookup.
pub fn validate_target(raw: &str) -> Result<TargetUrl, InvalidTarget> {
    if raw.trim().is_empty() {
        return Err(InvalidTarget::Missing);
    }

    let url = Url::parse(raw).map_err(|err| InvalidTarget::Malformed(err.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(InvalidTarget::UnsupportedScheme(other.to_string())),
    }

    match url.host() {
        None => return Err(InvalidTarget::EmptyHost),
        Some(Host::Domain(domain)) => check_domain(domain)?,
        Some(Host::Ipv4(ip)) => check_ip(IpAddr::V4(ip))?,
        Some(Host::Ipv6(ip)) => check_ip(IpAddr::V6(ip))?,
    }

    Ok(TargetUrl(url))
}

fn check_domain(domain: &str) -> Result<(), InvalidTarget> {
    let host = domain.to_ascii_lowercase();
    let host = host.strip_suffix('.').unwrap_or(&host);
    if host.is_empty() {
        return Err(InvalidTarget::EmptyHost);
    }
    if host == "localhost" || host.ends_with(".local") {
        engine_debug!("Rejecting local hostname {}", domain);
        return Err(InvalidTarget::BlockedHost(domain.to_string()));
    }
    Ok(())
}

fn check_ip(ip: IpAddr) -> Result<(), InvalidTarget> {
    if is_blocked_ip(ip) {
        engine_debug!("Rejecting private address literal {}", ip);
        return Err(InvalidTarget::BlockedIp(ip));
    }
    Ok(())
}

/// Returns `true` for loopback, RFC 1918, the unspecified addresses,
/// IPv6 loopback, unique-local (`fc00::/7`) and link-local (`fe80::/10`).
///
/// IPv4-mapped IPv6 addresses are judged by their embedded IPv4 address.
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => is_blocked_ipv4(addr),
        IpAddr::V6(addr) => match addr.to_ipv4_mapped() {
            Some(mapped) => is_blocked_ipv4(mapped),
            None => is_blocked_ipv6(addr),
        },
    }
}

fn is_blocked_ipv4(addr: Ipv4Addr) -> bool {
    let [a, b, _, _] = addr.octets();
    a == 10
        || a == 127
        || (a == 192 && b == 168)
        || (a == 172 && (16..=31).contains(&b))
        || addr.is_unspecified()
}

fn is_blocked_ipv6(addr: Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Resolve the target's hostname and refuse it when any address is blocked.
///
/// Lookup failures are not rejections: the fetch that follows fails on its
/// own and degrades to the minimal result. The resolved address is not pinned
/// for the subsequent request.
pub async fn check_resolved_host(target: &TargetUrl) -> Result<(), InvalidTarget> {
    let url = target.as_url();
    let Some(Host::Domain(domain)) = url.host() else {
        return Ok(());
    };
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = match tokio::net::lookup_host((domain, port)).await {
        Ok(addrs) => addrs,
        Err(err) => {
            engine_debug!("DNS lookup for {} failed: {}", domain, err);
            return Ok(());
        }
    };

    for addr in addrs {
        if is_blocked_ip(addr.ip()) {
            engine_debug!("{} resolves to blocked address {}", domain, addr.ip());
            return Err(InvalidTarget::BlockedResolvedIp {
                host: domain.to_string(),
                ip: addr.ip(),
            });
        }
    }
    Ok(())
}
