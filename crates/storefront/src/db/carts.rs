//! Cart and cart item queries.

use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{CartId, CouponId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartLine};

const CART_COLUMNS: &str = "id, cart_token, user_id, coupon_id, date_added";

const LINE_COLUMNS: &str = r"
    ci.id AS item_id, ci.quantity, ci.active AS item_active,
    p.id, p.category_id, p.name, p.slug, p.description, p.price, p.image,
    p.stock, p.available, p.created_at, p.updated_at";

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The oldest cart owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM bazaar.cart WHERE user_id = $1 ORDER BY id LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(cart)
    }

    /// The oldest cart carrying the session token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM bazaar.cart WHERE cart_token = $1 ORDER BY id LIMIT 1"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;
        Ok(cart)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        token: &str,
        user_id: Option<UserId>,
    ) -> Result<Cart, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "INSERT INTO bazaar.cart (cart_token, user_id) VALUES ($1, $2) RETURNING {CART_COLUMNS}"
        ))
        .bind(token)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(cart)
    }

    /// Attach an unowned cart to a user. Returns `None` if someone else got there first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim(&self, id: CartId, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            r"
            UPDATE bazaar.cart SET user_id = $2
            WHERE id = $1 AND user_id IS NULL
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(cart)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_coupon(
        &self,
        id: CartId,
        coupon_id: Option<CouponId>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.cart SET coupon_id = $2 WHERE id = $1")
            .bind(id)
            .bind(coupon_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Active lines with their products, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_lines(&self, id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(&format!(
            r"
            SELECT {LINE_COLUMNS}
            FROM bazaar.cart_item ci
            JOIN bazaar.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1 AND ci.active
            ORDER BY ci.id
            "
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// Current quantity of a product in the cart, if present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        id: CartId,
        product_id: ProductId,
    ) -> Result<Option<i32>, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM bazaar.cart_item WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(quantity)
    }

    /// Add one unit of a product, never going above `stock`.
    ///
    /// Returns the resulting quantity; an existing line already at `stock`
    /// is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn increment(
        &self,
        id: CartId,
        product_id: ProductId,
        stock: i32,
    ) -> Result<i32, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO bazaar.cart_item AS ci (cart_id, product_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT (cart_id, product_id) DO UPDATE
            SET quantity = CASE WHEN ci.quantity < $3 THEN ci.quantity + 1 ELSE ci.quantity END,
                active = TRUE
            RETURNING quantity
            ",
        )
        .bind(id)
        .bind(product_id)
        .bind(stock)
        .fetch_one(self.pool)
        .await?;
        Ok(quantity)
    }

    /// Remove one unit; the line is deleted when its quantity would reach zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product isn't in the cart.
    pub async fn decrement(&self, id: CartId, product_id: ProductId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let quantity = sqlx::query_scalar::<_, i32>(
            r"
            SELECT quantity FROM bazaar.cart_item
            WHERE cart_id = $1 AND product_id = $2
            FOR UPDATE
            ",
        )
        .bind(id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if quantity > 1 {
            sqlx::query(
                r"
                UPDATE bazaar.cart_item SET quantity = quantity - 1
                WHERE cart_id = $1 AND product_id = $2
                ",
            )
            .bind(id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("DELETE FROM bazaar.cart_item WHERE cart_id = $1 AND product_id = $2")
                .bind(id)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a product's line entirely.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product isn't in the cart.
    pub async fn remove_line(&self, id: CartId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM bazaar.cart_item WHERE cart_id = $1 AND product_id = $2")
                .bind(id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty a cart after checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_items(
        tx: &mut Transaction<'_, Postgres>,
        id: CartId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM bazaar.cart_item WHERE cart_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Detach coupons from every cart the user owns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_user_coupons(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.cart SET coupon_id = NULL WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_cart_coupon(
        tx: &mut Transaction<'_, Postgres>,
        id: CartId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.cart SET coupon_id = NULL WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
