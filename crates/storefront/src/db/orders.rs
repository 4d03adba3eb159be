//! Order, payment and order item queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{AddressId, CartId, OrderId, OrderStatus, Page, UserId};

use super::RepositoryError;
use super::catalog::contains_pattern;
use crate::models::{Order, OrderItem, OrderSummary, Payment};

const ORDER_COLUMNS: &str = r"
    id, user_id, cart_id, shipping_address_id, gateway_order_id,
    amount, currency, status, created_at";

const ITEM_COLUMNS: &str = r"
    id, order_id, product_id, product_name, product_price, product_image, quantity, subtotal";

/// Customers see an order while it has a payment and is still `paid`; the
/// status is bound as the last parameter of each query.
const SUMMARY_SELECT: &str = r"
    SELECT o.id, o.user_id, o.cart_id, o.shipping_address_id, o.gateway_order_id,
           o.amount, o.currency, o.status, o.created_at,
           pay.gateway_payment_id, pay.paid_at,
           (SELECT COUNT(*) FROM bazaar.order_item oi WHERE oi.order_id = o.id) AS item_count
    FROM bazaar.order o
    JOIN bazaar.payment pay ON pay.order_id = o.id";

/// Whose orders a customer request may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOwner {
    User(UserId),
    /// Guest checkout, identified by the session cart.
    Cart(CartId),
}

impl OrderOwner {
    const fn binds(self) -> (Option<UserId>, Option<CartId>) {
        match self {
            Self::User(id) => (Some(id), None),
            Self::Cart(id) => (None, Some(id)),
        }
    }
}

/// A pending order about to be persisted.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: Option<UserId>,
    pub cart_id: CartId,
    pub shipping_address_id: Option<AddressId>,
    pub gateway_order_id: &'a str,
    pub amount: Decimal,
    pub currency: &'a str,
}

/// A row of the dashboard order table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminOrderRow {
    pub id: OrderId,
    #[serde(rename = "order_id")]
    pub gateway_order_id: String,
    pub user: String,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items_count: i64,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewOrder<'_>) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO bazaar.order
                (user_id, cart_id, shipping_address_id, gateway_order_id, amount, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new.user_id)
        .bind(new.cart_id)
        .bind(new.shipping_address_id)
        .bind(new.gateway_order_id)
        .bind(new.amount)
        .bind(new.currency)
        .fetch_one(self.pool)
        .await?;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM bazaar.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Lock an order by its gateway id for the payment transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_by_gateway_id(
        tx: &mut Transaction<'_, Postgres>,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM bazaar.order WHERE gateway_order_id = $1 FOR UPDATE"
        ))
        .bind(gateway_order_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.order SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(OrderStatus::Paid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order already has a payment.
    pub async fn insert_payment(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        gateway_payment_id: &str,
        gateway_signature: &str,
    ) -> Result<Payment, RepositoryError> {
        sqlx::query_as::<_, Payment>(
            r"
            INSERT INTO bazaar.payment (order_id, gateway_payment_id, gateway_signature)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, gateway_payment_id, gateway_signature, paid_at
            ",
        )
        .bind(order_id)
        .bind(gateway_payment_id)
        .bind(gateway_signature)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| super::conflict_on_unique(e, "payment for this order"))
    }

    /// Copy every line of the cart into order items at current product prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn snapshot_cart(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        cart_id: CartId,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            r"
            INSERT INTO bazaar.order_item
                (order_id, product_id, product_name, product_price, product_image, quantity, subtotal)
            SELECT $1, p.id, p.name, p.price, p.image, ci.quantity, p.price * ci.quantity
            FROM bazaar.cart_item ci
            JOIN bazaar.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $2
            ORDER BY ci.id
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(order_id)
        .bind(cart_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(items)
    }

    /// Paid orders visible to `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_paid(&self, owner: OrderOwner) -> Result<Vec<OrderSummary>, RepositoryError> {
        let (user_id, cart_id) = owner.binds();
        let orders = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE ($1::int IS NULL OR o.user_id = $1)
              AND ($2::int IS NULL OR o.cart_id = $2)
              AND o.status = $3
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(user_id)
        .bind(cart_id)
        .bind(OrderStatus::Paid)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// A single paid order, if `owner` may see it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_paid(
        &self,
        id: OrderId,
        owner: OrderOwner,
    ) -> Result<Option<OrderSummary>, RepositoryError> {
        let (user_id, cart_id) = owner.binds();
        let order = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE o.id = $3
              AND ($1::int IS NULL OR o.user_id = $1)
              AND ($2::int IS NULL OR o.cart_id = $2)
              AND o.status = $4
            "
        ))
        .bind(user_id)
        .bind(cart_id)
        .bind(id)
        .bind(OrderStatus::Paid)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bazaar.order_item WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn payment_for(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(
            r"
            SELECT id, order_id, gateway_payment_id, gateway_signature, paid_at
            FROM bazaar.payment WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(payment)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bazaar.order SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// One page of the dashboard order table, newest first.
    ///
    /// `search` matches the gateway order id, the id's digits, or the
    /// customer's username or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_page(
        &self,
        search: Option<&str>,
        status: Option<OrderStatus>,
        requested_page: Option<&str>,
        per_page: i64,
    ) -> Result<(Vec<AdminOrderRow>, Page, i64), RepositoryError> {
        const FROM_WHERE: &str = r"
            FROM bazaar.order o
            LEFT JOIN bazaar.user u ON u.id = o.user_id
            WHERE ($1::text IS NULL
                   OR o.gateway_order_id ILIKE $1
                   OR o.id::text ILIKE $1
                   OR u.username ILIKE $1
                   OR u.email ILIKE $1)
              AND ($2::bazaar.order_status IS NULL OR o.status = $2)";

        let pattern = search.map(contains_pattern);

        let total_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {FROM_WHERE}"))
            .bind(pattern.as_deref())
            .bind(status)
            .fetch_one(self.pool)
            .await?;

        let page = Page::clamp(requested_page, total_count, per_page);

        let rows = sqlx::query_as::<_, AdminOrderRow>(&format!(
            r"
            SELECT o.id, o.gateway_order_id, COALESCE(u.username, 'Guest') AS user,
                   o.amount, o.status, o.created_at,
                   (SELECT COUNT(*) FROM bazaar.order_item oi WHERE oi.order_id = o.id) AS items_count
            {FROM_WHERE}
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(pattern.as_deref())
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, page, total_count))
    }
}
