//! Aggregate queries behind the admin dashboard.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use bazaar_core::OrderStatus;

use super::RepositoryError;
use super::catalog::LOW_STOCK_THRESHOLD;
use super::orders::AdminOrderRow;

/// Headline numbers for the dashboard landing page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_customers: i64,
    pub low_stock_count: i64,
    pub total_reviews: i64,
    pub avg_rating: Decimal,
}

/// Paid revenue for one calendar day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailySales {
    pub day: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<DashboardStats, RepositoryError> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r"
            SELECT
                (SELECT COALESCE(SUM(amount), 0) FROM bazaar.order WHERE status = 'paid')
                    AS total_revenue,
                (SELECT COUNT(*) FROM bazaar.order) AS total_orders,
                (SELECT COUNT(*) FROM bazaar.order WHERE status = 'pending') AS pending_orders,
                (SELECT COUNT(*) FROM bazaar.user) AS total_customers,
                (SELECT COUNT(*) FROM bazaar.product WHERE stock < $1) AS low_stock_count,
                (SELECT COUNT(*) FROM bazaar.review) AS total_reviews,
                (SELECT COALESCE(ROUND(AVG(rating)::numeric, 1), 0) FROM bazaar.review)
                    AS avg_rating
            ",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }

    /// The latest orders of any status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<AdminOrderRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminOrderRow>(
            r"
            SELECT o.id, o.gateway_order_id, COALESCE(u.username, 'Guest') AS user,
                   o.amount, o.status, o.created_at,
                   (SELECT COUNT(*) FROM bazaar.order_item oi WHERE oi.order_id = o.id) AS items_count
            FROM bazaar.order o
            LEFT JOIN bazaar.user u ON u.id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Paid orders per UTC day over the trailing `days` days, oldest first.
    /// Days without sales are omitted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_sales(&self, days: i32) -> Result<Vec<DailySales>, RepositoryError> {
        let rows = sqlx::query_as::<_, DailySales>(
            r"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   SUM(amount) AS revenue,
                   COUNT(*) AS orders
            FROM bazaar.order
            WHERE status = 'paid'
              AND created_at >= NOW() - make_interval(days => $1)
            GROUP BY day
            ORDER BY day
            ",
        )
        .bind(days)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of orders in each status that has at least one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            r"
            SELECT status, COUNT(*) AS count
            FROM bazaar.order
            GROUP BY status
            ORDER BY status
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
