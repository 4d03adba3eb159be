//! Checkout: cart to gateway order, and gateway payment to paid order.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use bazaar_core::{AddressId, CurrencyCode, Money, MoneyError, OrderStatus, UserId};

use super::cart::{redeemable_coupon, totals};
use super::email::EmailService;
use super::payment::{GatewayError, RazorpayClient};
use crate::db::{
    AddressRepository, CartRepository, NewOrder, OrderRepository, RepositoryError, UserRepository,
};
use crate::models::{Cart, Order, OrderItem, Payment};

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Missing payment details")]
    MissingPaymentDetails,

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Order is already paid")]
    AlreadyPaid,

    #[error("Order is not pending")]
    NotPending,

    #[error("amount error: {0}")]
    Amount(#[from] MoneyError),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Data the browser needs to open the payment widget.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub amount_minor: i64,
    pub key_id: String,
}

/// Signed result returned by the payment widget.
#[derive(Debug, Clone, Default)]
pub struct PaymentConfirmation<'a> {
    pub gateway_order_id: &'a str,
    pub gateway_payment_id: &'a str,
    pub signature: &'a str,
}

impl PaymentConfirmation<'_> {
    fn is_complete(&self) -> bool {
        [self.gateway_order_id, self.gateway_payment_id, self.signature]
            .iter()
            .all(|s| !s.trim().is_empty())
    }
}

/// A freshly paid order.
#[derive(Debug, Clone)]
pub struct PaidOrder {
    pub order: Order,
    pub payment: Payment,
    pub items: Vec<OrderItem>,
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    gateway: &'a RazorpayClient,
    currency: CurrencyCode,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, gateway: &'a RazorpayClient, currency: CurrencyCode) -> Self {
        Self {
            pool,
            gateway,
            currency,
        }
    }

    /// Price the cart, open a gateway order for it and record it as pending.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the cart has no active lines and
    /// `CheckoutError::Gateway` if the gateway call fails.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    pub async fn place_order(
        &self,
        cart: &Cart,
        user: Option<UserId>,
        address_id: Option<AddressId>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let lines = CartRepository::new(self.pool).active_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let now = Utc::now();
        let coupon = redeemable_coupon(self.pool, cart, now).await?;
        let priced = totals(&lines, coupon.as_ref(), now);
        let amount_minor = Money::new(priced.total, self.currency).to_minor_units()?;

        let shipping_address_id = match address_id {
            Some(id) => self.usable_address(id, user).await?,
            None => None,
        };

        let receipt = format!("cart_{}", cart.id);
        let gateway_order = self
            .gateway
            .create_order(amount_minor, self.currency.code(), &receipt)
            .await?;

        let order = OrderRepository::new(self.pool)
            .create(&NewOrder {
                user_id: user,
                cart_id: cart.id,
                shipping_address_id,
                gateway_order_id: &gateway_order.id,
                amount: priced.total,
                currency: self.currency.code(),
            })
            .await?;

        info!(
            order_id = %order.id,
            gateway_order_id = %order.gateway_order_id,
            amount = %order.amount,
            "Order placed"
        );

        Ok(PlacedOrder {
            order,
            amount_minor,
            key_id: self.gateway.key_id().to_owned(),
        })
    }

    /// An address id is kept only if it exists (and, for a logged-in
    /// customer, belongs to them).
    async fn usable_address(
        &self,
        id: AddressId,
        user: Option<UserId>,
    ) -> Result<Option<AddressId>, RepositoryError> {
        let addresses = AddressRepository::new(self.pool);
        let address = match user {
            Some(user_id) => addresses.get(user_id, id).await?,
            None => addresses.get_any(id).await?,
        };
        Ok(address.map(|a| a.id))
    }

    /// Verify a payment and complete its order.
    ///
    /// In one transaction: mark the order paid, record the payment, snapshot
    /// the cart into order items, empty the cart and drop coupons.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingPaymentDetails`,
    /// `CheckoutError::InvalidSignature`, `CheckoutError::OrderNotFound`,
    /// `CheckoutError::AlreadyPaid` or `CheckoutError::NotPending` when the
    /// confirmation can't be applied.
    #[instrument(skip(self, confirmation), fields(gateway_order_id = %confirmation.gateway_order_id))]
    pub async fn confirm_payment(
        &self,
        confirmation: &PaymentConfirmation<'_>,
    ) -> Result<PaidOrder, CheckoutError> {
        if !confirmation.is_complete() {
            return Err(CheckoutError::MissingPaymentDetails);
        }

        if !self.gateway.verify_payment_signature(
            confirmation.gateway_order_id,
            confirmation.gateway_payment_id,
            confirmation.signature,
        ) {
            warn!("Payment signature mismatch");
            return Err(CheckoutError::InvalidSignature);
        }

        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::lock_by_gateway_id(&mut tx, confirmation.gateway_order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        ensure_pending(order.status)?;

        OrderRepository::mark_paid(&mut tx, order.id).await?;
        let payment = OrderRepository::insert_payment(
            &mut tx,
            order.id,
            confirmation.gateway_payment_id,
            confirmation.signature,
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CheckoutError::AlreadyPaid,
            other => CheckoutError::Repository(other),
        })?;

        let items = match order.cart_id {
            Some(cart_id) => {
                let items = OrderRepository::snapshot_cart(&mut tx, order.id, cart_id).await?;
                CartRepository::clear_items(&mut tx, cart_id).await?;
                match order.user_id {
                    Some(user_id) => CartRepository::clear_user_coupons(&mut tx, user_id).await?,
                    None => CartRepository::clear_cart_coupon(&mut tx, cart_id).await?,
                }
                items
            }
            None => Vec::new(),
        };

        tx.commit().await?;

        info!(
            order_id = %order.id,
            gateway_payment_id = %payment.gateway_payment_id,
            items = items.len(),
            "Payment verified"
        );

        Ok(PaidOrder {
            order: Order {
                status: OrderStatus::Paid,
                ..order
            },
            payment,
            items,
        })
    }
}

/// Only a pending order may take a payment.
fn ensure_pending(status: OrderStatus) -> Result<(), CheckoutError> {
    match status {
        OrderStatus::Pending => Ok(()),
        OrderStatus::Paid => Err(CheckoutError::AlreadyPaid),
        _ => Err(CheckoutError::NotPending),
    }
}

/// Email the customer about a paid order, if they have an address on file.
///
/// Failures are logged and swallowed.
pub async fn send_confirmation(
    pool: &PgPool,
    email: &EmailService,
    paid: &PaidOrder,
    base_url: &str,
) {
    let Some(user_id) = paid.order.user_id else {
        return;
    };

    let user = match UserRepository::new(pool).get_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "Could not load customer for confirmation email");
            return;
        }
    };
    let Some(to) = user.email.as_ref() else {
        return;
    };

    let invoice_url = format!("{base_url}/cart/invoice/{}", paid.order.id);
    if let Err(e) = email
        .send_order_confirmation(
            to.as_str(),
            &user.display_name(),
            &paid.order,
            &paid.items,
            &invoice_url,
        )
        .await
    {
        warn!(error = %e, order_id = %paid.order.id, "Failed to send order confirmation");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_requires_every_field() {
        let full = PaymentConfirmation {
            gateway_order_id: "order_1",
            gateway_payment_id: "pay_1",
            signature: "abc",
        };
        assert!(full.is_complete());

        assert!(
            !PaymentConfirmation {
                signature: "",
                ..full.clone()
            }
            .is_complete()
        );
        assert!(
            !PaymentConfirmation {
                gateway_payment_id: "  ",
                ..full.clone()
            }
            .is_complete()
        );
        assert!(!PaymentConfirmation::default().is_complete());
    }

    #[test]
    fn test_error_messages_are_client_facing() {
        assert_eq!(CheckoutError::EmptyCart.to_string(), "Cart is empty");
        assert_eq!(
            CheckoutError::InvalidSignature.to_string(),
            "Invalid payment signature"
        );
        assert_eq!(
            CheckoutError::MissingPaymentDetails.to_string(),
            "Missing payment details"
        );
    }

    #[test]
    fn test_only_pending_orders_take_payment() {
        assert!(ensure_pending(OrderStatus::Pending).is_ok());
        assert!(matches!(
            ensure_pending(OrderStatus::Paid),
            Err(CheckoutError::AlreadyPaid)
        ));
        for status in [
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ] {
            let err = ensure_pending(status).unwrap_err();
            assert!(matches!(err, CheckoutError::NotPending));
            assert_eq!(err.to_string(), "Order is not pending");
        }
    }
}
