//! Per-request correlation id.
//!
//! An `x-request-id` set by the proxy in front of the shop is reused,
//! otherwise a UUID v4 is minted. The id lands on the request span, as a
//! Sentry tag and on the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id we are willing to echo back.
const MAX_UPSTREAM_LEN: usize = 128;

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_UPSTREAM_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned)
}

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let id = request_id(request.headers());

    Span::current().record("request_id", id.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &id));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_is_reused() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("cf-1234"));
        assert_eq!(request_id(&headers), "cf-1234");
    }

    #[test]
    fn test_missing_or_oversized_id_is_replaced() {
        let minted = request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&minted).is_ok());

        let mut headers = HeaderMap::new();
        let long = "a".repeat(MAX_UPSTREAM_LEN + 1);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_ne!(request_id(&headers), long);
    }
}
