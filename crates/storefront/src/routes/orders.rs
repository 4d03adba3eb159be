//! Order history and invoices.
//!
//! Logged-in customers see their own paid orders; guests see the orders
//! placed from their session cart. Invoices are HTML and require login.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{CurrencyCode, OrderId, OrderStatus};

use crate::db::{AddressRepository, OrderOwner, OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{OrderItem, OrderSummary};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

use super::cart::current_cart;

/// Order history routes (mounted under `/cart/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list))
        .route("/orders/{id}", get(detail))
}

/// Invoice page (mounted under `/cart`).
pub fn invoice_router() -> Router<AppState> {
    Router::new().route("/invoice/{id}", get(invoice))
}

#[derive(Debug, Serialize)]
pub struct PaymentRef {
    pub payment_id: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    /// Gateway order id.
    pub order_id: String,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub payment: Option<PaymentRef>,
    pub item_count: i64,
}

impl From<OrderSummary> for OrderView {
    fn from(summary: OrderSummary) -> Self {
        let payment = match (summary.gateway_payment_id, summary.paid_at) {
            (Some(payment_id), Some(paid_at)) => Some(PaymentRef {
                payment_id,
                paid_at,
            }),
            _ => None,
        };
        Self {
            id: summary.order.id,
            order_id: summary.order.gateway_order_id,
            amount: summary.order.amount,
            status: summary.order.status,
            created_at: summary.order.created_at,
            payment,
            item_count: summary.item_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDetailView {
    #[serde(flatten)]
    pub order: OrderView,
    pub items: Vec<OrderItem>,
}

async fn owner(
    state: &AppState,
    session: &Session,
    user: Option<&crate::models::CurrentUser>,
) -> Result<OrderOwner> {
    match user {
        Some(user) => Ok(OrderOwner::User(user.id)),
        None => {
            let cart = current_cart(state, session, None).await?;
            Ok(OrderOwner::Cart(cart.id))
        }
    }
}

/// Paid orders, newest first.
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Vec<OrderView>>> {
    let owner = owner(&state, &session, user.as_ref()).await?;
    let orders = OrderRepository::new(state.pool()).list_paid(owner).await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// One paid order with its items.
#[instrument(skip(state, session, user))]
pub async fn detail(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetailView>> {
    let owner = owner(&state, &session, user.as_ref()).await?;
    let orders = OrderRepository::new(state.pool());
    let summary = orders
        .get_paid(id, owner)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;
    let items = orders.items(id).await?;

    Ok(Json(OrderDetailView {
        order: summary.into(),
        items,
    }))
}

/// One invoice row, preformatted.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub subtotal: String,
}

/// Printable invoice.
#[derive(Template, WebTemplate)]
#[template(path = "invoice.html")]
pub struct InvoiceTemplate {
    pub order_number: String,
    pub gateway_order_id: String,
    pub status: &'static str,
    pub placed_on: String,
    pub customer: String,
    pub email: Option<String>,
    pub ship_to: Option<String>,
    pub payment_id: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub total: String,
}

fn money(symbol: &str, amount: Decimal) -> String {
    format!("{symbol}{amount:.2}")
}

/// HTML invoice for the order's owner or staff.
#[instrument(skip(state, user))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<InvoiceTemplate> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;

    if order.user_id != Some(user.id) && !user.is_staff {
        return Err(AppError::Forbidden(
            "You do not have permission to view this invoice".to_owned(),
        ));
    }

    let items = orders.items(order.id).await?;
    let payment = orders.payment_for(order.id).await?;
    let customer = match order.user_id {
        Some(user_id) => UserRepository::new(state.pool()).get_by_id(user_id).await?,
        None => None,
    };
    let ship_to = match order.shipping_address_id {
        Some(address_id) => AddressRepository::new(state.pool())
            .get_any(address_id)
            .await?
            .map(|a| format!("{}, {} ({})", a.name, a.one_line(), a.phone)),
        None => None,
    };

    let symbol = order
        .currency
        .parse::<CurrencyCode>()
        .map_or("", CurrencyCode::symbol);

    Ok(InvoiceTemplate {
        order_number: order.id.to_string(),
        gateway_order_id: order.gateway_order_id.clone(),
        status: order.status.label(),
        placed_on: order.created_at.format("%d %b %Y").to_string(),
        customer: customer
            .as_ref()
            .map_or_else(|| "Guest".to_owned(), crate::models::User::display_name),
        email: customer
            .and_then(|c| c.email)
            .map(bazaar_core::Email::into_inner),
        ship_to,
        payment_id: payment.map(|p| p.gateway_payment_id),
        lines: items
            .iter()
            .map(|item| InvoiceLine {
                name: item.product_name.clone(),
                unit_price: money(symbol, item.product_price),
                quantity: item.quantity,
                subtotal: money(symbol, item.subtotal),
            })
            .collect(),
        total: money(symbol, order.amount),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{CartId, UserId};

    use super::*;
    use crate::models::Order;

    fn summary(payment: Option<&str>) -> OrderSummary {
        let now = Utc::now();
        OrderSummary {
            order: Order {
                id: OrderId::new(7),
                user_id: Some(UserId::new(1)),
                cart_id: Some(CartId::new(3)),
                shipping_address_id: None,
                gateway_order_id: "order_ABC".to_owned(),
                amount: Decimal::new(9000, 2),
                currency: "INR".to_owned(),
                status: OrderStatus::Paid,
                created_at: now,
            },
            gateway_payment_id: payment.map(str::to_owned),
            paid_at: payment.map(|_| now),
            item_count: 2,
        }
    }

    #[test]
    fn test_order_view_shape() {
        let json = serde_json::to_value(OrderView::from(summary(Some("pay_1")))).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["order_id"], "order_ABC");
        assert_eq!(json["amount"], "90.00");
        assert_eq!(json["status"], "paid");
        assert_eq!(json["payment"]["payment_id"], "pay_1");
        assert_eq!(json["item_count"], 2);
    }

    #[test]
    fn test_order_view_without_payment() {
        let json = serde_json::to_value(OrderView::from(summary(None))).unwrap();
        assert!(json["payment"].is_null());
    }

    #[test]
    fn test_invoice_renders_lines() {
        let html = InvoiceTemplate {
            order_number: "7".to_owned(),
            gateway_order_id: "order_ABC".to_owned(),
            status: "Paid",
            placed_on: "01 Oct 2026".to_owned(),
            customer: "Asha Rao".to_owned(),
            email: Some("asha@example.in".to_owned()),
            ship_to: None,
            payment_id: Some("pay_1".to_owned()),
            lines: vec![InvoiceLine {
                name: "Brass Lamp".to_owned(),
                unit_price: "₹45.00".to_owned(),
                quantity: 2,
                subtotal: "₹90.00".to_owned(),
            }],
            total: "₹90.00".to_owned(),
        }
        .render()
        .unwrap();

        assert!(html.contains("order_ABC"));
        assert!(html.contains("Brass Lamp"));
        assert!(html.contains("₹90.00"));
        assert!(html.contains("pay_1"));
    }
}
