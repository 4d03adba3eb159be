//! Load shop fixtures from YAML.
//!
//! Categories and products are keyed by slug and coupons by code, so running
//! the same file twice updates rows in place.
//!
//! ```yaml
//! categories:
//!   - name: Lighting
//!     slug: lighting
//! products:
//!   - name: Brass Lamp
//!     slug: brass-lamp
//!     price: "2499.00"
//!     stock: 12
//!     category: lighting
//! coupons:
//!   - code: WELCOME10
//!     discount: 10
//!     valid_from: 2026-01-01T00:00:00Z
//!     valid_to: 2026-12-31T23:59:59Z
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use bazaar_core::CategoryId;
use bazaar_storefront::db::{CatalogRepository, CouponRepository, NewProduct, RepositoryError};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid fixture: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub categories: Vec<CategorySeed>,
    pub products: Vec<ProductSeed>,
    pub coupons: Vec<CouponSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    /// Slug of a category in the same file.
    pub category: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CouponSeed {
    pub code: String,
    pub discount: i32,
    #[serde(default = "active_by_default")]
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

const fn active_by_default() -> bool {
    true
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub coupons: usize,
}

impl Fixture {
    /// Problems that would make the fixture fail halfway through.
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for product in &self.products {
            if product.price.is_sign_negative() {
                errors.push(format!("product {}: negative price", product.slug));
            }
            if product.stock < 0 {
                errors.push(format!("product {}: negative stock", product.slug));
            }
            if let Some(category) = &product.category
                && !self.categories.iter().any(|c| &c.slug == category)
            {
                errors.push(format!(
                    "product {}: unknown category {category}",
                    product.slug
                ));
            }
        }

        for coupon in &self.coupons {
            if !(0..=100).contains(&coupon.discount) {
                errors.push(format!("coupon {}: discount must be 0-100", coupon.code));
            }
            if coupon.valid_to < coupon.valid_from {
                errors.push(format!("coupon {}: window ends before it starts", coupon.code));
            }
        }

        errors
    }
}

/// Seed the database from a fixture file.
///
/// The file is parsed and validated before connecting.
pub async fn from_file(path: &Path) -> Result<SeedSummary, SeedError> {
    info!(path = %path.display(), "Loading fixture");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let fixture: Fixture = serde_yaml::from_str(&content)?;

    let errors = fixture.validate();
    if !errors.is_empty() {
        tracing::error!("Fixture validation failed:");
        for err in &errors {
            tracing::error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let pool = connect().await?;
    let catalog = CatalogRepository::new(&pool);
    let coupons = CouponRepository::new(&pool);

    let mut category_ids: HashMap<&str, CategoryId> = HashMap::new();
    for seed in &fixture.categories {
        let category = catalog
            .upsert_category(&seed.name, &seed.slug, &seed.description)
            .await?;
        category_ids.insert(seed.slug.as_str(), category.id);
    }

    for seed in &fixture.products {
        catalog
            .upsert_product(&NewProduct {
                name: seed.name.clone(),
                slug: seed.slug.clone(),
                description: seed.description.clone(),
                price: seed.price,
                stock: seed.stock,
                category_id: seed
                    .category
                    .as_deref()
                    .and_then(|slug| category_ids.get(slug).copied()),
                image: seed.image.clone(),
            })
            .await?;
    }

    for seed in &fixture.coupons {
        coupons
            .upsert(
                &seed.code,
                seed.discount,
                seed.active,
                seed.valid_from,
                seed.valid_to,
            )
            .await?;
    }

    let summary = SeedSummary {
        categories: fixture.categories.len(),
        products: fixture.products.len(),
        coupons: fixture.coupons.len(),
    };
    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!("  Products: {}", summary.products);
    info!("  Coupons: {}", summary.coupons);
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
categories:
  - name: Lighting
    slug: lighting
products:
  - name: Brass Lamp
    slug: brass-lamp
    price: "2499.00"
    stock: 12
    category: lighting
  - name: Gift Card
    slug: gift-card
    price: 500
coupons:
  - code: WELCOME10
    discount: 10
    valid_from: 2026-01-01T00:00:00Z
    valid_to: 2026-12-31T23:59:59Z
"#;

    #[test]
    fn test_parse_fixture() {
        let fixture: Fixture = serde_yaml::from_str(FIXTURE).unwrap();
        assert_eq!(fixture.categories.len(), 1);
        assert_eq!(fixture.products[0].price, Decimal::new(249_900, 2));
        assert_eq!(fixture.products[1].price, Decimal::new(500, 0));
        assert_eq!(fixture.products[1].stock, 0);
        assert!(fixture.coupons[0].active);
        assert!(fixture.validate().is_empty());
    }

    #[test]
    fn test_unknown_category_is_reported() {
        let mut fixture: Fixture = serde_yaml::from_str(FIXTURE).unwrap();
        fixture.products[1].category = Some("garden".to_owned());
        let errors = fixture.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unknown category garden"));
    }

    #[test]
    fn test_empty_fixture_is_valid() {
        let fixture: Fixture = serde_yaml::from_str("{}").unwrap();
        assert!(fixture.validate().is_empty());
    }
}
