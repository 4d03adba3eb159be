//! Categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{CategoryId, ProductId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub stock: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A product joined with its category's name and slug.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductListing {
    #[sqlx(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

/// Category summary embedded in product responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// Product as returned by the shop API.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<CategoryRef>,
}

impl From<ProductListing> for ProductView {
    fn from(listing: ProductListing) -> Self {
        let category = match (
            listing.product.category_id,
            listing.category_name,
            listing.category_slug,
        ) {
            (Some(id), Some(name), Some(slug)) => Some(CategoryRef { id, name, slug }),
            _ => None,
        };

        Self {
            product: listing.product,
            category,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(category_id: Option<i32>) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            category_id: category_id.map(CategoryId::new),
            name: "Brass Lamp".to_owned(),
            slug: "brass-lamp".to_owned(),
            description: String::new(),
            price: Decimal::new(129_900, 2),
            image: None,
            stock: 3,
            available: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_view_embeds_category() {
        let view = ProductView::from(ProductListing {
            product: product(Some(4)),
            category_name: Some("Lighting".to_owned()),
            category_slug: Some("lighting".to_owned()),
        });

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Brass Lamp");
        assert_eq!(json["price"], "1299.00");
        assert_eq!(json["category"]["slug"], "lighting");
    }

    #[test]
    fn test_view_without_category() {
        let view = ProductView::from(ProductListing {
            product: product(None),
            category_name: None,
            category_slug: None,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["category"].is_null());
    }
}
