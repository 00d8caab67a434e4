//! Client IP extraction for rate limiting.
//!
//! The rate limiter keys its buckets by client address. Behind a proxy the
//! peer address is the proxy, so the X-Forwarded-For chain is consulted
//! first, validated against the number of trusted proxies to keep spoofed
//! entries out of the bucket key space.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::OnceLock;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};

/// Extractor form of [`extract_client_ip`]. Pulls the peer address from the
/// connect-info extension when the server was started with it; absent in
/// in-process tests, where the header path still applies.
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let socket = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        Ok(ClientIp(extract_client_ip(
            &parts.headers,
            socket.as_ref(),
            trusted_proxy_count(),
        )))
    }
}

/// `TRUSTED_PROXY_COUNT` env var, read once. Defaults to 1, the single
/// load balancer this service normally sits behind.
fn trusted_proxy_count() -> usize {
    static COUNT: OnceLock<usize> = OnceLock::new();
    *COUNT.get_or_init(|| {
        std::env::var("TRUSTED_PROXY_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1)
    })
}

/// Resolve the client IP used as the rate-limit bucket key.
///
/// Order: X-Forwarded-For (validated against `trusted_proxy_count`),
/// X-Real-IP, then the peer socket address. Returns `"unknown"` when none
/// of those yields a usable address; unknown clients share one bucket.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = from_forwarded_chain(value, trusted_proxy_count) {
            return ip;
        }
    }

    if let Some(value) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let trimmed = value.trim();
        if trimmed.parse::<IpAddr>().is_ok() {
            return trimmed.to_string();
        }
    }

    match socket_addr {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

/// Pick the client entry out of an X-Forwarded-For chain.
///
/// The chain reads `client, proxy1, proxy2, ...`. The last
/// `trusted_proxy_count` entries were appended by infrastructure we trust;
/// the entry just before them is the client. With zero trusted proxies the
/// whole header is attacker-controlled, so only the last entry (written by
/// the peer closest to us) is considered.
fn from_forwarded_chain(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let entries: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let candidate = if trusted_proxy_count == 0 || entries.len() <= trusted_proxy_count {
        // Short chains also land here: fewer entries than trusted proxies
        // means the client entry is missing, so fall back to the nearest.
        entries.last()?
    } else {
        entries.get(entries.len() - trusted_proxy_count - 1)?
    };

    if candidate.parse::<IpAddr>().is_ok() {
        Some(candidate.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_forwarded_chain_single_entry() {
        assert_eq!(
            from_forwarded_chain("203.0.113.7", 0).as_deref(),
            Some("203.0.113.7")
        );
        assert_eq!(
            from_forwarded_chain("203.0.113.7", 1).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_forwarded_chain_behind_one_proxy() {
        assert_eq!(
            from_forwarded_chain("203.0.113.7, 10.0.0.1", 1).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_forwarded_chain_behind_two_proxies() {
        assert_eq!(
            from_forwarded_chain("203.0.113.7, 10.0.0.1, 10.0.0.2", 2).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_forwarded_chain_untrusted_uses_nearest_entry() {
        // With zero trusted proxies the client-supplied prefix is ignored.
        assert_eq!(
            from_forwarded_chain("203.0.113.7, 10.0.0.1", 0).as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn test_forwarded_chain_rejects_garbage() {
        assert_eq!(from_forwarded_chain("not.an.ip.address", 0), None);
        assert_eq!(from_forwarded_chain("", 1), None);
    }

    #[test]
    fn test_extract_prefers_forwarded_for() {
        let headers = headers_with("x-forwarded-for", "203.0.113.7");
        let socket = SocketAddr::from(([127, 0, 0, 1], 4000));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 0), "203.0.113.7");
    }

    #[test]
    fn test_extract_real_ip_fallback() {
        let headers = headers_with("x-real-ip", "198.51.100.4");
        assert_eq!(extract_client_ip(&headers, None, 1), "198.51.100.4");
    }

    #[test]
    fn test_extract_falls_back_to_socket_then_unknown() {
        let headers = HeaderMap::new();
        let socket = SocketAddr::from(([127, 0, 0, 1], 4000));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 1), "127.0.0.1");
        assert_eq!(extract_client_ip(&headers, None, 1), "unknown");
    }

    #[test]
    fn test_extract_ipv6_client() {
        let headers = headers_with("x-forwarded-for", "2001:db8::1, 10.0.0.1");
        assert_eq!(extract_client_ip(&headers, None, 1), "2001:db8::1");
    }
}
