//! Category and product queries.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use bazaar_core::{CategoryId, Page, ProductId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Category, Product, ProductListing};

/// Columns for a [`ProductListing`] over `product p LEFT JOIN category c`.
pub(crate) const LISTING_COLUMNS: &str = r"
    p.id, p.category_id, p.name, p.slug, p.description, p.price, p.image,
    p.stock, p.available, p.created_at, p.updated_at,
    c.name AS category_name, c.slug AS category_slug";

const PRODUCT_COLUMNS: &str = r"
    id, category_id, name, slug, description, price, image,
    stock, available, created_at, updated_at";

/// Products below this stock level count as low stock on the dashboard.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// Shop listing sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    Name,
    Newest,
}

impl ProductSort {
    /// Parse the `sort` query parameter; unknown values keep the default order.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("name") => Self::Name,
            Some("newest") => Self::Newest,
            _ => Self::Default,
        }
    }

    const fn order_by(self) -> &'static str {
        match self {
            Self::Default => "p.id ASC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id ASC",
            Self::Name => "p.name ASC, p.id ASC",
            Self::Newest => "p.created_at DESC, p.id DESC",
        }
    }
}

/// Filters for the public product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_slug: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: bool,
    pub sort: ProductSort,
}

/// Stock filter for the dashboard listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    Low,
    Out,
}

impl StockStatus {
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        match param {
            Some("low") => Some(Self::Low),
            Some("out") => Some(Self::Out),
            _ => None,
        }
    }
}

/// A row of the dashboard product table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminProductRow {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: String,
    pub image: Option<String>,
}

/// Search-as-you-type suggestion.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSuggestion {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub image: Option<String>,
}

/// Fields for a product created from the dashboard.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    pub image: Option<String>,
}

/// Wrap user input for `ILIKE`, escaping its wildcards.
#[must_use]
pub fn contains_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, image FROM bazaar.category ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_exists(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bazaar.category WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Available products matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {LISTING_COLUMNS}
            FROM bazaar.product p
            LEFT JOIN bazaar.category c ON c.id = p.category_id
            WHERE p.available
              AND ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1)
              AND ($2::text IS NULL OR c.slug = $2)
              AND ($3::numeric IS NULL OR p.price >= $3)
              AND ($4::numeric IS NULL OR p.price <= $4)
              AND (NOT $5 OR p.stock > 0)
            ORDER BY {}
            ",
            filter.sort.order_by()
        );

        let products = sqlx::query_as::<_, ProductListing>(&sql)
            .bind(filter.search.as_deref().map(contains_pattern))
            .bind(filter.category_slug.as_deref())
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.in_stock)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Up to `limit` available products whose name contains `query`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn suggest(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<ProductSuggestion>, RepositoryError> {
        let suggestions = sqlx::query_as::<_, ProductSuggestion>(
            r"
            SELECT id, name, slug, price, image
            FROM bazaar.product
            WHERE available AND name ILIKE $1
            ORDER BY name
            LIMIT $2
            ",
        )
        .bind(contains_pattern(query))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(suggestions)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<ProductListing>, RepositoryError> {
        let product = sqlx::query_as::<_, ProductListing>(&format!(
            r"
            SELECT {LISTING_COLUMNS}
            FROM bazaar.product p
            LEFT JOIN bazaar.category c ON c.id = p.category_id
            WHERE p.slug = $1 AND p.available
            "
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// One page of the dashboard product table, plus the page actually served.
    ///
    /// `search` matches name, slug or the id's digits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_page(
        &self,
        search: Option<&str>,
        category_id: Option<CategoryId>,
        stock: Option<StockStatus>,
        requested_page: Option<&str>,
        per_page: i64,
    ) -> Result<(Vec<AdminProductRow>, Page, i64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::text IS NULL
                   OR p.name ILIKE $1 OR p.slug ILIKE $1 OR p.id::text ILIKE $1)
              AND ($2::int IS NULL OR p.category_id = $2)
              AND ($3::text IS NULL
                   OR ($3 = 'low' AND p.stock < $4)
                   OR ($3 = 'out' AND p.stock = 0))";

        let pattern = search.map(contains_pattern);
        let stock_param = stock.map(|s| match s {
            StockStatus::Low => "low",
            StockStatus::Out => "out",
        });

        let total_count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM bazaar.product p {WHERE}"))
                .bind(pattern.as_deref())
                .bind(category_id)
                .bind(stock_param)
                .bind(LOW_STOCK_THRESHOLD)
                .fetch_one(self.pool)
                .await?;

        let page = Page::clamp(requested_page, total_count, per_page);

        let rows = sqlx::query_as::<_, AdminProductRow>(&format!(
            r"
            SELECT p.id, p.name, p.price, p.stock,
                   COALESCE(c.name, 'Uncategorized') AS category, p.image
            FROM bazaar.product p
            LEFT JOIN bazaar.category c ON c.id = p.category_id
            {WHERE}
            ORDER BY p.id
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(pattern.as_deref())
        .bind(category_id)
        .bind(stock_param)
        .bind(LOW_STOCK_THRESHOLD)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, page, total_count))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_product(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO bazaar.product (name, slug, description, price, stock, category_id, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.category_id)
        .bind(new.image.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product slug"))
    }

    /// Change stock and/or price; `None` leaves a field as is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update_stock_and_price(
        &self,
        id: ProductId,
        stock: Option<i32>,
        price: Option<Decimal>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE bazaar.product
            SET stock = COALESCE($2, stock),
                price = COALESCE($3, price),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(stock)
        .bind(price)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Insert or update a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_category(
        &self,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            INSERT INTO bazaar.category (name, slug, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug)
            DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description
            RETURNING id, name, slug, description, image
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_one(self.pool)
        .await?;
        Ok(category)
    }

    /// Insert or update a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO bazaar.product (name, slug, description, price, stock, category_id, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                category_id = EXCLUDED.category_id,
                image = EXCLUDED.image,
                updated_at = NOW()
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.category_id)
        .bind(new.image.as_deref())
        .fetch_one(self.pool)
        .await?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("lamp"), "%lamp%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("c:\\"), "%c:\\\\%");
    }

    #[test]
    fn test_sort_param() {
        assert_eq!(ProductSort::from_param(Some("price_desc")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::from_param(Some("newest")), ProductSort::Newest);
        assert_eq!(ProductSort::from_param(Some("random")), ProductSort::Default);
        assert_eq!(ProductSort::from_param(None), ProductSort::Default);
    }

    #[test]
    fn test_stock_status_param() {
        assert_eq!(StockStatus::from_param(Some("low")), Some(StockStatus::Low));
        assert_eq!(StockStatus::from_param(Some("out")), Some(StockStatus::Out));
        assert_eq!(StockStatus::from_param(Some("all")), None);
    }
}
