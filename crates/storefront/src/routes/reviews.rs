//! Product reviews and their moderation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use bazaar_core::{ProductId, ReviewId};

use crate::db::{CatalogRepository, RepositoryError, ReviewInput, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::{ClientIp, RequireAuth, RequireStaff};
use crate::models::ReviewView;
use crate::state::AppState;

const MAX_SUBJECT_CHARS: usize = 100;
const MAX_REVIEW_CHARS: usize = 500;

/// Public and customer review routes (mounted under `/shop/api/reviews`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit/{product_id}", post(submit))
        .route("/{product_id}", get(for_product))
}

/// Moderation routes (mounted under `/shop/api/admin/reviews`).
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list))
        .route("/{id}", put(toggle).delete(remove))
}

fn review_not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Review not found".to_owned()),
        other => other.into(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub review: String,
    pub rating: Option<i32>,
}

impl ReviewRequest {
    /// Resolve the rating to store. An update that leaves `rating` out keeps
    /// the `stored` one; a new review must carry its own.
    fn validate(&self, stored: Option<i32>) -> Result<i32> {
        let rating = self
            .rating
            .or(stored)
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| AppError::BadRequest("Rating must be between 1 and 5".to_owned()))?;

        if self.subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(AppError::BadRequest(format!(
                "Subject must be at most {MAX_SUBJECT_CHARS} characters"
            )));
        }
        if self.review.chars().count() > MAX_REVIEW_CHARS {
            return Err(AppError::BadRequest(format!(
                "Review must be at most {MAX_REVIEW_CHARS} characters"
            )));
        }
        Ok(rating)
    }
}

/// Create or replace the caller's review of a product.
#[instrument(skip(state, user, ip, body), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ClientIp(ip): ClientIp,
    Path(product_id): Path<ProductId>,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    CatalogRepository::new(state.pool())
        .get_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    let reviews = ReviewRepository::new(state.pool());
    let stored = match body.rating {
        Some(_) => None,
        None => reviews.stored_rating(product_id, user.id).await?,
    };
    let rating = body.validate(stored)?;
    let ip = ip.map(|ip| ip.to_string()).unwrap_or_default();

    let (review, inserted) = reviews
        .upsert(
            product_id,
            user.id,
            &ReviewInput {
                subject: body.subject.trim(),
                review: body.review.trim(),
                rating,
                ip: &ip,
            },
        )
        .await?;

    let view = reviews
        .get_with_author(review.id)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    let status = if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(view.into())))
}

/// Visible reviews of a product.
#[instrument(skip(state))]
pub async fn for_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<ReviewView>>> {
    let reviews = ReviewRepository::new(state.pool())
        .visible_for_product(product_id)
        .await?;
    Ok(Json(reviews.into_iter().map(ReviewView::from).collect()))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminReviewQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl AdminReviewQuery {
    /// `active`/`inactive` filter on visibility; anything else shows all.
    fn visible(&self) -> Option<bool> {
        match self.status.as_deref() {
            Some("active") => Some(true),
            Some("inactive") => Some(false),
            _ => None,
        }
    }
}

#[instrument(skip(state, _staff))]
pub async fn admin_list(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<AdminReviewQuery>,
) -> Result<Json<Vec<ReviewView>>> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let reviews = ReviewRepository::new(state.pool())
        .admin_list(search, query.visible())
        .await?;
    Ok(Json(reviews.into_iter().map(ReviewView::from).collect()))
}

/// Flip a review's visibility.
#[instrument(skip(state, staff), fields(staff = %staff.username))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ReviewId>,
) -> Result<Json<Value>> {
    let status = ReviewRepository::new(state.pool())
        .toggle_status(id)
        .await
        .map_err(review_not_found)?;
    info!(review_id = %id, visible = status, "Review visibility changed");
    Ok(Json(json!({ "message": "Review status updated", "status": status })))
}

#[instrument(skip(state, staff), fields(staff = %staff.username))]
pub async fn remove(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ReviewId>,
) -> Result<Json<Value>> {
    ReviewRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(review_not_found)?;
    info!(review_id = %id, "Review deleted");
    Ok(Json(json!({ "message": "Review deleted successfully" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(rating: Option<i32>) -> ReviewRequest {
        ReviewRequest {
            subject: "Lovely".to_owned(),
            review: "Bright and well made.".to_owned(),
            rating,
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert_eq!(request(Some(1)).validate(None).unwrap(), 1);
        assert_eq!(request(Some(5)).validate(None).unwrap(), 5);
        assert!(request(Some(0)).validate(None).is_err());
        assert!(request(Some(6)).validate(None).is_err());
        assert!(request(None).validate(None).is_err());
    }

    #[test]
    fn test_update_without_rating_keeps_stored_one() {
        assert_eq!(request(None).validate(Some(3)).unwrap(), 3);
        assert_eq!(request(Some(5)).validate(Some(3)).unwrap(), 5);
        assert!(request(Some(9)).validate(Some(3)).is_err());
    }

    #[test]
    fn test_long_subject_is_rejected() {
        let mut req = request(Some(4));
        req.subject = "x".repeat(MAX_SUBJECT_CHARS + 1);
        assert!(req.validate(None).is_err());
    }

    #[test]
    fn test_status_filter() {
        let query = |status: &str| AdminReviewQuery {
            search: None,
            status: Some(status.to_owned()),
        };
        assert_eq!(query("active").visible(), Some(true));
        assert_eq!(query("inactive").visible(), Some(false));
        assert_eq!(query("everything").visible(), None);
        assert_eq!(AdminReviewQuery::default().visible(), None);
    }
}
