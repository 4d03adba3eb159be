//! Razorpay client for order creation and payment signature checks.
//!
//! Checkout creates a gateway order for the cart total (in minor units),
//! the browser completes payment with the gateway's widget, and the
//! resulting `(order_id, payment_id, signature)` triple is verified here
//! before the order is marked paid.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::PaymentConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body didn't match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

/// An order as created on the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Razorpay Orders API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("api_base", &self.api_base)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    /// Public key id, handed to the browser checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a gateway order with automatic capture.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the gateway rejects it.
    #[instrument(skip(self), fields(api_base = %self.api_base))]
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders", self.api_base);
        let body = CreateOrderRequest {
            amount: amount_minor,
            currency,
            receipt,
            payment_capture: 1,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        debug!(gateway_order_id = %order.id, "Gateway order created");
        Ok(order)
    }

    /// Check a payment signature from the checkout widget.
    #[must_use]
    pub fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        verify_signature(
            self.key_secret.expose_secret(),
            gateway_order_id,
            gateway_payment_id,
            signature,
        )
    }
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"` keyed with the API secret.
#[must_use]
pub fn payment_signature(key_secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret.as_bytes()) else {
        return String::new();
    };
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Compare a client-supplied signature with the expected one in constant time.
#[must_use]
pub fn verify_signature(
    key_secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> bool {
    let expected = payment_signature(key_secret, gateway_order_id, gateway_payment_id);
    !expected.is_empty() && constant_time_compare(&expected, signature)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use tokio::sync::oneshot;

    use super::*;

    const SECRET: &str = "rzp_test_secret_Xk29fLq";

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "helloo"));
    }

    #[test]
    fn test_signature_is_lowercase_hex_sha256() {
        let sig = payment_signature(SECRET, "order_A1", "pay_B2");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_valid_signature_accepted() {
        let sig = payment_signature(SECRET, "order_A1", "pay_B2");
        assert!(verify_signature(SECRET, "order_A1", "pay_B2", &sig));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let sig = payment_signature(SECRET, "order_A1", "pay_B2");
        assert!(!verify_signature(SECRET, "order_A1", "pay_B3", &sig));
        assert!(!verify_signature(SECRET, "order_A2", "pay_B2", &sig));
        assert!(!verify_signature("another-secret", "order_A1", "pay_B2", &sig));
        assert!(!verify_signature(SECRET, "order_A1", "pay_B2", &sig.to_uppercase()));
        assert!(!verify_signature(SECRET, "order_A1", "pay_B2", ""));
    }

    #[test]
    fn test_separator_is_part_of_message() {
        // "ab|c" and "a|bc" must not collide.
        let one = payment_signature(SECRET, "ab", "c");
        let two = payment_signature(SECRET, "a", "bc");
        assert_ne!(one, two);
    }

    #[derive(Default)]
    struct Captured {
        authorization: Option<String>,
        body: Option<serde_json::Value>,
    }

    async fn orders_handler(
        State(captured): State<Arc<Mutex<Captured>>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let mut captured = captured.lock().unwrap();
        captured.authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        captured.body = Some(body.clone());

        if body["amount"].as_i64() == Some(0) {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": {"description": "amount too small"}})),
            );
        }

        (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": "order_Test123",
                "amount": body["amount"],
                "currency": body["currency"],
                "receipt": body["receipt"],
                "status": "created",
            })),
        )
    }

    async fn spawn_gateway() -> (String, Arc<Mutex<Captured>>, oneshot::Sender<()>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let app = Router::new()
            .route("/v1/orders", post(orders_handler))
            .with_state(Arc::clone(&captured));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        (format!("http://{addr}/v1/"), captured, shutdown_tx)
    }

    fn client_for(api_base: String) -> RazorpayClient {
        RazorpayClient::new(&PaymentConfig {
            api_base,
            key_id: "rzp_test_key".to_owned(),
            key_secret: SecretString::from(SECRET),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_order_posts_minor_units_with_basic_auth() {
        let (base, captured, shutdown) = spawn_gateway().await;
        let client = client_for(base);

        let order = client.create_order(9000, "INR", "cart_7").await.unwrap();
        assert_eq!(order.id, "order_Test123");
        assert_eq!(order.amount, 9000);
        assert_eq!(order.currency, "INR");

        {
            let captured = captured.lock().unwrap();
            let auth = captured.authorization.as_deref().unwrap();
            assert!(auth.starts_with("Basic "));
            let body = captured.body.as_ref().unwrap();
            assert_eq!(body["amount"], 9000);
            assert_eq!(body["receipt"], "cart_7");
            assert_eq!(body["payment_capture"], 1);
        }

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_create_order_surfaces_gateway_rejection() {
        let (base, _captured, shutdown) = spawn_gateway().await;
        let client = client_for(base);

        let err = client.create_order(0, "INR", "cart_7").await.unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 400, .. }));

        let _ = shutdown.send(());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let client = client_for("https://api.razorpay.com/v1".to_owned());
        let debug = format!("{client:?}");
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("[REDACTED]"));
    }
}
