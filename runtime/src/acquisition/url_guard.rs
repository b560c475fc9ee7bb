//! URL normalization and SSRF guard.
//!
//! Two layers:
//! - [`validate_url`] is synchronous and checks scheme, host names, and
//!   literal IP addresses.
//! - [`ensure_public_host`] resolves the host and rejects it if it resolves
//!   to nothing or to any non-public address.
//!
//! Redirect hops are re-checked with [`validate_url`] by the HTTP client.

use crate::error::{PricingError, PricingResult};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Add `https://` when the scheme is missing and make sure the path is non-empty.
pub fn normalize_url(raw: &str) -> PricingResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PricingError::InvalidUrl("empty URL".into()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    // The url crate already turns an empty path into "/" for http(s).
    let parsed = Url::parse(&with_scheme)
        .map_err(|e| PricingError::InvalidUrl(format!("invalid URL format: {e}")))?;
    Ok(parsed.to_string())
}

/// Parse and check a URL without touching the network.
///
/// With `allow_private` set, only the scheme and host presence are checked.
pub fn validate_url(raw: &str, allow_private: bool) -> PricingResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| PricingError::InvalidUrl(format!("invalid URL format: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PricingError::InvalidUrl(
            "only http/https URLs allowed".into(),
        ));
    }

    let host = url
        .host()
        .ok_or_else(|| PricingError::InvalidUrl("missing host".into()))?;

    if allow_private {
        return Ok(url);
    }

    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            if name == "localhost" || name.ends_with(".localhost") {
                return Err(PricingError::InvalidUrl("localhost not allowed".into()));
            }
        }
        Host::Ipv4(ip) => check_ip(IpAddr::V4(ip))?,
        Host::Ipv6(ip) => check_ip(IpAddr::V6(ip))?,
    }

    Ok(url)
}

/// Resolve the URL's host and require every address to be public.
pub async fn ensure_public_host(url: &Url, allow_private: bool) -> PricingResult<()> {
    if allow_private {
        return Ok(());
    }
    let host = match url.host() {
        Some(Host::Domain(name)) => name.to_string(),
        // Literal IPs were already classified by validate_url.
        Some(_) => return Ok(()),
        None => return Err(PricingError::InvalidUrl("missing host".into())),
    };
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| PricingError::InvalidUrl(format!("host does not resolve: {host}: {e}")))?
        .map(|sa| sa.ip())
        .collect();

    if addrs.is_empty() {
        return Err(PricingError::InvalidUrl(format!(
            "host does not resolve: {host}"
        )));
    }
    for ip in addrs {
        check_ip(ip).map_err(|_| {
            PricingError::InvalidUrl(format!("{host} resolves to non-public address {ip}"))
        })?;
    }
    Ok(())
}

fn check_ip(ip: IpAddr) -> PricingResult<()> {
    if is_public_ip(ip) {
        Ok(())
    } else {
        Err(PricingError::InvalidUrl(format!(
            "private/internal address not allowed: {ip}"
        )))
    }
}

/// True for globally routable unicast addresses.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public_v4(mapped);
            }
            is_public_v6(v6)
        }
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared_cgnat = a == 100 && (64..128).contains(&b);
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || shared_cgnat
        || a == 0)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || unique_local || link_local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_scheme_and_path() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com/");
        assert_eq!(
            normalize_url("  http://example.com/pricing ").unwrap(),
            "http://example.com/pricing"
        );
        assert!(normalize_url("").is_err());
    }

    #[test]
    fn test_rejects_loopback_and_localhost() {
        assert!(matches!(
            validate_url("http://127.0.0.1/pricing", false),
            Err(PricingError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("http://localhost:8080", false),
            Err(PricingError::InvalidUrl(_))
        ));
        assert!(validate_url("http://[::1]/", false).is_err());
        assert!(validate_url("http://app.localhost/", false).is_err());
    }

    #[test]
    fn test_rejects_private_and_link_local() {
        for raw in [
            "http://10.0.0.5/",
            "http://192.168.1.1/",
            "http://172.16.0.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0/",
            "http://100.64.0.1/",
            "http://[fd00::1]/",
            "http://[fe80::1]/",
            "http://[::ffff:127.0.0.1]/",
        ] {
            assert!(validate_url(raw, false).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(validate_url("ftp://example.com/", false).is_err());
        assert!(validate_url("file:///etc/passwd", false).is_err());
        assert!(validate_url("javascript:alert(1)", false).is_err());
    }

    #[test]
    fn test_accepts_public() {
        let url = validate_url("https://example.com/pricing", false).unwrap();
        assert_eq!(url.path(), "/pricing");
        assert!(validate_url("http://93.184.216.34/", false).is_ok());
    }

    #[test]
    fn test_allow_private_still_checks_scheme() {
        assert!(validate_url("http://127.0.0.1:9999/pricing", true).is_ok());
        assert!(validate_url("ftp://127.0.0.1/", true).is_err());
    }

    #[tokio::test]
    async fn test_ensure_public_host_skips_literal_ips() {
        let url = Url::parse("http://93.184.216.34/").unwrap();
        assert!(ensure_public_host(&url, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_public_host_rejects_localhost_resolution() {
        let url = Url::parse("http://localhost/").unwrap();
        assert!(ensure_public_host(&url, false).await.is_err());
    }
}
