//! Coupon lookups.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::CouponId;

use super::RepositoryError;
use crate::models::Coupon;

const COUPON_COLUMNS: &str = "id, code, discount, active, valid_from, valid_to";

pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Exact, case-sensitive code match regardless of validity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM bazaar.coupon WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(coupon)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM bazaar.coupon WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(coupon)
    }

    /// Insert or update a coupon by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        code: &str,
        discount: i32,
        active: bool,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
    ) -> Result<Coupon, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            r"
            INSERT INTO bazaar.coupon (code, discount, active, valid_from, valid_to)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO UPDATE
            SET discount = EXCLUDED.discount,
                active = EXCLUDED.active,
                valid_from = EXCLUDED.valid_from,
                valid_to = EXCLUDED.valid_to
            RETURNING {COUPON_COLUMNS}
            "
        ))
        .bind(code)
        .bind(discount)
        .bind(active)
        .bind(valid_from)
        .bind(valid_to)
        .fetch_one(self.pool)
        .await?;
        Ok(coupon)
    }
}
