//! Wishlist queries. Each user has one wishlist, created on first use.

use sqlx::PgPool;

use bazaar_core::{ProductId, UserId, WishlistId};

use super::RepositoryError;
use super::catalog::LISTING_COLUMNS;
use crate::models::WishlistEntry;

pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's wishlist id, creating the wishlist if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<WishlistId, RepositoryError> {
        let id = sqlx::query_scalar::<_, WishlistId>(
            r"
            INSERT INTO bazaar.wishlist (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Entries with their products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn entries(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, WishlistEntry>(&format!(
            r"
            SELECT wi.id AS item_id, wi.added_at, {LISTING_COLUMNS}
            FROM bazaar.wishlist w
            JOIN bazaar.wishlist_item wi ON wi.wishlist_id = w.id
            JOIN bazaar.product p ON p.id = wi.product_id
            LEFT JOIN bazaar.category c ON c.id = p.category_id
            WHERE w.user_id = $1
            ORDER BY wi.id
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(entries)
    }

    /// Add a product. Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let wishlist_id = self.get_or_create(user_id).await?;
        let result = sqlx::query(
            r"
            INSERT INTO bazaar.wishlist_item (wishlist_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (wishlist_id, product_id) DO NOTHING
            ",
        )
        .bind(wishlist_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product isn't in the wishlist.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM bazaar.wishlist_item wi
            USING bazaar.wishlist w
            WHERE wi.wishlist_id = w.id AND w.user_id = $1 AND wi.product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn contains(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let found: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM bazaar.wishlist_item wi
                JOIN bazaar.wishlist w ON w.id = wi.wishlist_id
                WHERE w.user_id = $1 AND wi.product_id = $2
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(found)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_ids(&self, user_id: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, ProductId>(
            r"
            SELECT wi.product_id FROM bazaar.wishlist_item wi
            JOIN bazaar.wishlist w ON w.id = wi.wishlist_id
            WHERE w.user_id = $1
            ORDER BY wi.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }
}
