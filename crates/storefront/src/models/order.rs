//! Orders, their payments and item snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{AddressId, CartId, OrderId, OrderItemId, OrderStatus, PaymentId, ProductId, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub cart_id: Option<CartId>,
    pub shipping_address_id: Option<AddressId>,
    /// Identifier issued by the payment gateway.
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    pub paid_at: DateTime<Utc>,
}

/// A product as it was when the order was paid.
///
/// `product_id` goes null if the product is later deleted; the copied name
/// and price stay.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// An order with its payment (if any) and number of item rows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderSummary {
    #[sqlx(flatten)]
    pub order: Order,
    pub gateway_payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub item_count: i64,
}
