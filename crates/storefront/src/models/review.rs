//! Product reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{ProductId, ReviewId, UserId};

use super::user::full_name_or;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub subject: String,
    pub review: String,
    pub rating: i32,
    #[serde(skip)]
    pub ip: String,
    /// Visible on the product page.
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review joined with its author and product names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewWithAuthor {
    #[sqlx(flatten)]
    pub review: Review,
    pub product_name: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Review as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub product: ProductId,
    pub product_name: String,
    pub user: UserId,
    pub user_name: String,
    pub subject: String,
    pub review: String,
    pub rating: i32,
    pub status: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewWithAuthor> for ReviewView {
    fn from(row: ReviewWithAuthor) -> Self {
        let user_name = full_name_or(&row.first_name, &row.last_name, &row.username);
        Self {
            id: row.review.id,
            product: row.review.product_id,
            product_name: row.product_name,
            user: row.review.user_id,
            user_name,
            subject: row.review.subject,
            review: row.review.review,
            rating: row.review.rating,
            status: row.review.status,
            created_at: row.review.created_at,
        }
    }
}
