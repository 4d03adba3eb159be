//! Catalog API: categories, product listing, search suggestions, detail.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::db::{CatalogRepository, ProductFilter, ProductSort, ProductSuggestion};
use crate::error::{AppError, Result};
use crate::models::{Category, ProductView};
use crate::state::AppState;

const SUGGESTION_LIMIT: i64 = 5;
const SUGGESTION_MIN_CHARS: usize = 2;

/// Build the catalog router (mounted under `/shop/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories))
        .route("/products", get(products))
        .route("/products/search-suggestions", get(search_suggestions))
        .route("/products/{slug}", get(product_detail))
}

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub sort: Option<String>,
}

impl ProductQuery {
    fn into_filter(self) -> Result<ProductFilter> {
        Ok(ProductFilter {
            search: non_blank(self.search),
            category_slug: non_blank(self.category),
            min_price: parse_price(self.min_price.as_deref(), "min_price")?,
            max_price: parse_price(self.max_price.as_deref(), "max_price")?,
            in_stock: self
                .in_stock
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            sort: ProductSort::from_param(self.sort.as_deref()),
        })
    }
}

/// Search suggestion query.
#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_price(value: Option<&str>, name: &str) -> Result<Option<Decimal>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => Decimal::from_str(raw)
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{name} must be a number"))),
    }
}

/// List every category by name.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CatalogRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// List available products matching the query.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let filter = query.into_filter()?;
    let listings = CatalogRepository::new(state.pool())
        .list_products(&filter)
        .await?;
    Ok(Json(listings.into_iter().map(ProductView::from).collect()))
}

/// Search-as-you-type; short queries get nothing.
#[instrument(skip(state))]
pub async fn search_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<ProductSuggestion>>> {
    let q = query.q.trim();
    if q.chars().count() < SUGGESTION_MIN_CHARS {
        return Ok(Json(Vec::new()));
    }
    let suggestions = CatalogRepository::new(state.pool())
        .suggest(q, SUGGESTION_LIMIT)
        .await?;
    Ok(Json(suggestions))
}

/// A single available product by slug.
#[instrument(skip(state))]
pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductView>> {
    let listing = CatalogRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;
    Ok(Json(listing.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builds_filter() {
        let filter = ProductQuery {
            search: Some("  lamp ".to_owned()),
            category: Some(String::new()),
            min_price: Some("10.50".to_owned()),
            max_price: None,
            in_stock: Some("True".to_owned()),
            sort: Some("price_desc".to_owned()),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.search.as_deref(), Some("lamp"));
        assert!(filter.category_slug.is_none());
        assert_eq!(filter.min_price, Some(Decimal::new(1050, 2)));
        assert!(filter.in_stock);
        assert_eq!(filter.sort, ProductSort::PriceDesc);
    }

    #[test]
    fn test_in_stock_only_when_true() {
        let filter = ProductQuery {
            in_stock: Some("yes".to_owned()),
            ..ProductQuery::default()
        }
        .into_filter()
        .unwrap();
        assert!(!filter.in_stock);
        assert_eq!(filter.sort, ProductSort::Default);
    }

    #[test]
    fn test_bad_price_is_rejected() {
        let err = ProductQuery {
            max_price: Some("cheap".to_owned()),
            ..ProductQuery::default()
        }
        .into_filter()
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("max_price")));
    }
}
