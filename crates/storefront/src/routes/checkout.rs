//! Checkout API: gateway order creation and payment verification.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::AddressId;

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::services::checkout::{PaymentConfirmation, send_confirmation};
use crate::services::CheckoutService;
use crate::state::AppState;

use super::cart::current_cart;

/// Build the checkout router (mounted under `/cart/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify-payment", post(verify_payment))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    pub address_id: Option<AddressId>,
}

/// What the browser needs to open the payment widget.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    /// Gateway order id.
    pub order_id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

/// Price the cart and open a gateway order for it.
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    body: Option<Json<CreateOrderRequest>>,
) -> Result<(StatusCode, Json<CreateOrderResponse>)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let cart = current_cart(&state, &session, user.as_ref()).await?;

    let placed = CheckoutService::new(state.pool(), state.payments(), state.config().currency)
        .place_order(&cart, user.map(|u| u.id), body.address_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: placed.order.gateway_order_id,
            amount: placed.amount_minor,
            currency: placed.order.currency,
            key_id: placed.key_id,
        }),
    ))
}

/// Fields posted back by the payment widget.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub status: &'static str,
    pub order_id: String,
    pub payment_id: String,
}

/// Verify the gateway signature and mark the order paid.
///
/// The confirmation email goes out in the background once the payment is
/// committed.
#[instrument(skip_all, fields(gateway_order_id = %body.razorpay_order_id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>> {
    let confirmation = PaymentConfirmation {
        gateway_order_id: &body.razorpay_order_id,
        gateway_payment_id: &body.razorpay_payment_id,
        signature: &body.razorpay_signature,
    };

    let paid = CheckoutService::new(state.pool(), state.payments(), state.config().currency)
        .confirm_payment(&confirmation)
        .await?;

    let response = VerifyPaymentResponse {
        status: "Payment verified successfully",
        order_id: paid.order.gateway_order_id.clone(),
        payment_id: paid.payment.gateway_payment_id.clone(),
    };

    if state.email().is_some() {
        tokio::spawn(async move {
            if let Some(email) = state.email() {
                send_confirmation(state.pool(), email, &paid, &state.config().base_url).await;
            }
        });
    }

    Ok(Json(response))
}
