//! Client IP resolution.
//!
//! Proxy headers are consulted first (Cloudflare, then the usual forwarding
//! headers, then Fly.io); without them the TCP peer address is used, which
//! requires serving with `into_make_service_with_connect_info::<SocketAddr>()`.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{Extensions, HeaderMap, request::Parts};

/// Best-effort client IP from proxy headers or the connection.
#[must_use]
pub fn resolve_client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip")
        .or_else(|| header_ip("x-forwarded-for"))
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| header_ip("fly-client-ip"))
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

/// Extractor for the client IP; `None` when it can't be determined.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_client_ip(&parts.headers, &parts.extensions)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_cloudflare_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(
            resolve_client_ip(&headers, &Extensions::new()),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn test_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.2"),
        );
        assert_eq!(
            resolve_client_ip(&headers, &Extensions::new()),
            Some("198.51.100.1".parse().unwrap())
        );
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 5555))));
        assert_eq!(
            resolve_client_ip(&HeaderMap::new(), &extensions),
            Some("192.0.2.4".parse().unwrap())
        );
    }

    #[test]
    fn test_unknown_without_headers_or_peer() {
        assert_eq!(resolve_client_ip(&HeaderMap::new(), &Extensions::new()), None);
    }
}
