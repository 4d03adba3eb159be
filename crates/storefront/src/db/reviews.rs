//! Product review queries.

use sqlx::PgPool;

use bazaar_core::{ProductId, ReviewId, UserId};

use super::RepositoryError;
use super::catalog::contains_pattern;
use crate::models::{Review, ReviewWithAuthor};

const REVIEW_COLUMNS: &str = r"
    id, product_id, user_id, subject, review, rating, ip, status, created_at, updated_at";

const WITH_AUTHOR_SELECT: &str = r"
    SELECT r.id, r.product_id, r.user_id, r.subject, r.review, r.rating, r.ip, r.status,
           r.created_at, r.updated_at,
           p.name AS product_name, u.username, u.first_name, u.last_name
    FROM bazaar.review r
    JOIN bazaar.product p ON p.id = r.product_id
    JOIN bazaar.user u ON u.id = r.user_id";

/// A customer's review submission.
#[derive(Debug, Clone)]
pub struct ReviewInput<'a> {
    pub subject: &'a str,
    pub review: &'a str,
    pub rating: i32,
    pub ip: &'a str,
}

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the user's review of a product, or overwrite the existing one.
    ///
    /// Returns the review and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        product_id: ProductId,
        user_id: UserId,
        input: &ReviewInput<'_>,
    ) -> Result<(Review, bool), RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            review: Review,
            inserted: bool,
        }

        let row = sqlx::query_as::<_, Row>(&format!(
            r"
            INSERT INTO bazaar.review AS r (product_id, user_id, subject, review, rating, ip)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (product_id, user_id) DO UPDATE
            SET subject = EXCLUDED.subject,
                review = EXCLUDED.review,
                rating = EXCLUDED.rating,
                ip = EXCLUDED.ip,
                updated_at = NOW()
            RETURNING {REVIEW_COLUMNS}, (xmax = 0) AS inserted
            "
        ))
        .bind(product_id)
        .bind(user_id)
        .bind(input.subject)
        .bind(input.review)
        .bind(input.rating)
        .bind(input.ip)
        .fetch_one(self.pool)
        .await?;

        Ok((row.review, row.inserted))
    }

    /// Rating of the user's existing review of a product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stored_rating(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Option<i32>, RepositoryError> {
        let rating = sqlx::query_scalar::<_, i32>(
            "SELECT rating FROM bazaar.review WHERE product_id = $1 AND user_id = $2",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(rating)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_author(
        &self,
        id: ReviewId,
    ) -> Result<Option<ReviewWithAuthor>, RepositoryError> {
        let review = sqlx::query_as::<_, ReviewWithAuthor>(&format!(
            "{WITH_AUTHOR_SELECT} WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(review)
    }

    /// Visible reviews of a product, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn visible_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(&format!(
            r"
            {WITH_AUTHOR_SELECT}
            WHERE r.product_id = $1 AND r.status
            ORDER BY r.updated_at DESC, r.id DESC
            "
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Every review, newest first, for moderation.
    ///
    /// `search` matches subject, body, author username or product name;
    /// `visible` filters on the status flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_list(
        &self,
        search: Option<&str>,
        visible: Option<bool>,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let pattern = search.map(contains_pattern);
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(&format!(
            r"
            {WITH_AUTHOR_SELECT}
            WHERE ($1::text IS NULL
                   OR r.subject ILIKE $1
                   OR r.review ILIKE $1
                   OR u.username ILIKE $1
                   OR p.name ILIKE $1)
              AND ($2::boolean IS NULL OR r.status = $2)
            ORDER BY r.created_at DESC, r.id DESC
            "
        ))
        .bind(pattern.as_deref())
        .bind(visible)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Flip a review's visibility and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn toggle_status(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            r"
            UPDATE bazaar.review SET status = NOT status, updated_at = NOW()
            WHERE id = $1
            RETURNING status
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.review WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
