//! Staff dashboard API (`/custom-admin`).
//!
//! Every handler takes [`RequireStaff`]; anonymous callers get 401 and
//! customers 403.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State,
        multipart::MultipartError,
    },
    http::{StatusCode, header::CONTENT_TYPE},
    routing::{get, patch},
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument};

use bazaar_core::{CategoryId, OrderId, OrderStatus, ProductId};

use crate::db::{
    AdminOrderRow, AdminProductRow, CatalogRepository, DailySales, DashboardRepository,
    DashboardStats, NewProduct, OrderRepository, RepositoryError, StatusCount, StockStatus,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::models::Product;
use crate::services::media::{self, ImageUpload, MAX_IMAGE_BYTES};
use crate::state::AppState;

const PER_PAGE: i64 = 10;
const RECENT_ORDERS: i64 = 5;
const CHART_DAYS: i32 = 30;
/// Room for the text fields next to an image upload.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the dashboard router (mounted under `/custom-admin`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/chart-data", get(chart_data))
        .route(
            "/products",
            get(products)
                .post(create_product)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES)),
        )
        .route(
            "/products/{id}",
            patch(update_product).delete(delete_product),
        )
        .route("/orders", get(orders))
        .route("/orders/{id}", patch(update_order))
}

fn not_found(what: &'static str) -> impl Fn(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("{what} not found")),
        other => other.into(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Overview
// =============================================================================

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub recent_orders: Vec<AdminOrderRow>,
}

#[instrument(skip_all)]
pub async fn stats(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<StatsResponse>> {
    let dashboard = DashboardRepository::new(state.pool());
    let stats = dashboard.stats().await?;
    let recent_orders = dashboard.recent_orders(RECENT_ORDERS).await?;
    Ok(Json(StatsResponse {
        stats,
        recent_orders,
    }))
}

/// Series for the sales line chart and the status pie chart.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub revenue: Vec<f64>,
    pub orders: Vec<i64>,
    pub pie_labels: Vec<&'static str>,
    pub pie_data: Vec<i64>,
}

impl ChartData {
    fn build(sales: &[DailySales], statuses: &[StatusCount]) -> Self {
        Self {
            labels: sales
                .iter()
                .map(|d| d.day.format("%Y-%m-%d").to_string())
                .collect(),
            revenue: sales
                .iter()
                .map(|d| d.revenue.to_f64().unwrap_or_default())
                .collect(),
            orders: sales.iter().map(|d| d.orders).collect(),
            pie_labels: statuses.iter().map(|s| s.status.label()).collect(),
            pie_data: statuses.iter().map(|s| s.count).collect(),
        }
    }
}

#[instrument(skip_all)]
pub async fn chart_data(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<ChartData>> {
    let dashboard = DashboardRepository::new(state.pool());
    let sales = dashboard.daily_sales(CHART_DAYS).await?;
    let statuses = dashboard.status_counts().await?;
    Ok(Json(ChartData::build(&sales, &statuses)))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProductTableQuery {
    pub search: Option<String>,
    /// Category id; `all` or anything unparsable means every category.
    pub category: Option<String>,
    pub stock_status: Option<String>,
    pub page: Option<String>,
}

impl ProductTableQuery {
    fn category_id(&self) -> Option<CategoryId> {
        non_blank(self.category.as_deref())
            .and_then(|c| c.parse::<i32>().ok())
            .map(CategoryId::new)
    }
}

#[derive(Debug, Serialize)]
pub struct ProductTable {
    pub products: Vec<AdminProductRow>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_count: i64,
}

#[instrument(skip(state, _staff))]
pub async fn products(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<ProductTableQuery>,
) -> Result<Json<ProductTable>> {
    let (products, page, total_count) = CatalogRepository::new(state.pool())
        .admin_page(
            non_blank(query.search.as_deref()),
            query.category_id(),
            StockStatus::from_param(query.stock_status.as_deref()),
            query.page.as_deref(),
            PER_PAGE,
        )
        .await?;

    Ok(Json(ProductTable {
        products,
        total_pages: page.total_pages,
        current_page: page.current,
        total_count,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    pub image: Option<String>,
}

impl CreateProductRequest {
    /// Build from the text fields of a `multipart/form-data` submission.
    /// The category may be sent as `category` or `category_id`.
    fn from_form(fields: &HashMap<String, String>) -> Result<Self> {
        let field = |key: &str| non_blank(fields.get(key).map(String::as_str));
        let invalid = |what: &str| AppError::BadRequest(format!("Invalid {what}"));

        let price = field("price")
            .map(|p| p.parse::<Decimal>().map_err(|_| invalid("price")))
            .transpose()?;
        let stock = field("stock")
            .map(|s| s.parse::<i32>().map_err(|_| invalid("stock")))
            .transpose()?
            .unwrap_or_default();
        let category_id = field("category")
            .or_else(|| field("category_id"))
            .map(|c| {
                c.parse::<i32>()
                    .map(CategoryId::new)
                    .map_err(|_| invalid("category"))
            })
            .transpose()?;

        Ok(Self {
            name: field("name").map(str::to_owned),
            slug: field("slug").map(str::to_owned),
            price,
            description: field("description").unwrap_or_default().to_owned(),
            stock,
            category_id,
            image: field("image").map(str::to_owned),
        })
    }

    fn validate(self) -> Result<NewProduct> {
        let name = non_blank(self.name.as_deref()).map(str::to_owned);
        let slug = non_blank(self.slug.as_deref()).map(str::to_owned);
        let (Some(name), Some(slug), Some(price)) = (name, slug, self.price) else {
            return Err(AppError::BadRequest(
                "Name, Slug and Price are required".to_owned(),
            ));
        };
        if price.is_sign_negative() {
            return Err(AppError::BadRequest("Price cannot be negative".to_owned()));
        }
        if self.stock < 0 {
            return Err(AppError::BadRequest("Stock cannot be negative".to_owned()));
        }

        Ok(NewProduct {
            name,
            slug,
            description: self.description,
            price,
            stock: self.stock,
            category_id: self.category_id,
            image: self.image.filter(|i| !i.trim().is_empty()),
        })
    }
}

fn bad_form(e: MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Split a product form into its text fields and the uploaded `image` file.
async fn read_product_form(
    mut form: Multipart,
) -> Result<(CreateProductRequest, Option<ImageUpload>)> {
    let mut fields = HashMap::new();
    let mut upload = None;

    while let Some(field) = form.next_field().await.map_err(bad_form)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "image" && field.file_name().is_some() {
            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await.map_err(bad_form)?;
            // Browsers send an empty part when no file was picked
            if !bytes.is_empty() {
                upload = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            fields.insert(name, field.text().await.map_err(bad_form)?);
        }
    }

    Ok((CreateProductRequest::from_form(&fields)?, upload))
}

/// Create a product from a JSON body or a `multipart/form-data` form with an
/// optional `image` file.
#[instrument(skip_all, fields(staff = %staff.username))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    request: Request,
) -> Result<(StatusCode, Json<Product>)> {
    let (body, upload) = if is_multipart(&request) {
        let form = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_product_form(form).await?
    } else {
        let Json(body) = Json::<CreateProductRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        (body, None)
    };

    let mut new = body.validate()?;
    let catalog = CatalogRepository::new(state.pool());

    if let Some(category_id) = new.category_id
        && !catalog.category_exists(category_id).await?
    {
        return Err(AppError::BadRequest("Invalid category".to_owned()));
    }

    if let Some(upload) = upload {
        new.image = Some(media::save_product_image(&state.config().media_dir, &upload).await?);
    }

    let product = catalog.create_product(&new).await?;
    info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub stock: Option<i32>,
    pub price: Option<Decimal>,
}

#[instrument(skip(state, staff, body), fields(staff = %staff.username))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    if body.stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("Stock cannot be negative".to_owned()));
    }
    if body.price.is_some_and(|p| p.is_sign_negative()) {
        return Err(AppError::BadRequest("Price cannot be negative".to_owned()));
    }

    let product = CatalogRepository::new(state.pool())
        .update_stock_and_price(id, body.stock, body.price)
        .await
        .map_err(not_found("Product"))?;
    Ok(Json(product))
}

#[instrument(skip(state, staff), fields(staff = %staff.username))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    CatalogRepository::new(state.pool())
        .delete_product(id)
        .await
        .map_err(not_found("Product"))?;
    info!(product_id = %id, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OrderTableQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.trim()
        .to_lowercase()
        .parse::<OrderStatus>()
        .map_err(|_| AppError::BadRequest("Invalid status".to_owned()))
}

/// Table filter: blank or `all` shows every status.
fn status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>> {
    non_blank(raw)
        .filter(|s| !s.eq_ignore_ascii_case("all"))
        .map(parse_status)
        .transpose()
}

#[derive(Debug, Serialize)]
pub struct OrderTable {
    pub orders: Vec<AdminOrderRow>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_count: i64,
}

#[instrument(skip(state, _staff))]
pub async fn orders(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<OrderTableQuery>,
) -> Result<Json<OrderTable>> {
    let status = status_filter(query.status.as_deref())?;

    let (orders, page, total_count) = OrderRepository::new(state.pool())
        .admin_page(
            non_blank(query.search.as_deref()),
            status,
            query.page.as_deref(),
            PER_PAGE,
        )
        .await?;

    Ok(Json(OrderTable {
        orders,
        total_pages: page.total_pages,
        current_page: page.current,
        total_count,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
}

#[instrument(skip(state, staff, body), fields(staff = %staff.username))]
pub async fn update_order(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<Value>> {
    let status = non_blank(body.status.as_deref())
        .ok_or_else(|| AppError::BadRequest("Status required".to_owned()))
        .and_then(parse_status)?;

    OrderRepository::new(state.pool())
        .set_status(id, status)
        .await
        .map_err(not_found("Order"))?;

    info!(order_id = %id, %status, "Order status changed");
    Ok(Json(json!({ "message": "Order status updated", "status": status })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_chart_data_shapes() {
        let sales = vec![
            DailySales {
                day: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                revenue: Decimal::new(12_550, 2),
                orders: 2,
            },
            DailySales {
                day: NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
                revenue: Decimal::new(40, 0),
                orders: 1,
            },
        ];
        let statuses = vec![
            StatusCount {
                status: OrderStatus::Paid,
                count: 3,
            },
            StatusCount {
                status: OrderStatus::Pending,
                count: 1,
            },
        ];

        let chart = ChartData::build(&sales, &statuses);
        assert_eq!(chart.labels, vec!["2026-10-01", "2026-10-03"]);
        assert!((chart.revenue[0] - 125.5).abs() < f64::EPSILON);
        assert_eq!(chart.orders, vec![2, 1]);
        assert_eq!(chart.pie_labels, vec!["Paid", "Pending"]);
        assert_eq!(chart.pie_data, vec![3, 1]);
    }

    #[test]
    fn test_empty_chart() {
        assert_eq!(ChartData::build(&[], &[]), ChartData::default());
    }

    #[test]
    fn test_category_param() {
        let query = |c: &str| ProductTableQuery {
            category: Some(c.to_owned()),
            ..ProductTableQuery::default()
        };
        assert_eq!(query("4").category_id(), Some(CategoryId::new(4)));
        assert_eq!(query("all").category_id(), None);
        assert_eq!(query("").category_id(), None);
    }

    #[test]
    fn test_create_requires_name_slug_price() {
        let err = CreateProductRequest {
            name: Some("Lamp".to_owned()),
            slug: Some("lamp".to_owned()),
            ..CreateProductRequest::default()
        }
        .validate()
        .unwrap_err();
        assert!(
            matches!(err, AppError::BadRequest(msg) if msg == "Name, Slug and Price are required")
        );

        let new = CreateProductRequest {
            name: Some(" Lamp ".to_owned()),
            slug: Some("lamp".to_owned()),
            price: Some(Decimal::new(4999, 2)),
            ..CreateProductRequest::default()
        }
        .validate()
        .unwrap();
        assert_eq!(new.name, "Lamp");
        assert_eq!(new.stock, 0);
        assert!(new.image.is_none());
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_product_form_fields() {
        let body = CreateProductRequest::from_form(&form(&[
            ("name", "Brass Lamp"),
            ("slug", "brass-lamp"),
            ("price", "1299.50"),
            ("stock", "7"),
            ("category", "3"),
            ("description", ""),
        ]))
        .unwrap();
        assert_eq!(body.price, Some(Decimal::new(129_950, 2)));
        assert_eq!(body.stock, 7);
        assert_eq!(body.category_id, Some(CategoryId::new(3)));
        assert!(body.image.is_none());

        let new = body.validate().unwrap();
        assert_eq!(new.name, "Brass Lamp");
        assert_eq!(new.description, "");
    }

    #[test]
    fn test_product_form_rejects_bad_numbers() {
        let err = CreateProductRequest::from_form(&form(&[("price", "twelve")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid price"));

        let err = CreateProductRequest::from_form(&form(&[("stock", "1.5")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid stock"));

        let err = CreateProductRequest::from_form(&form(&[("category_id", "x")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid category"));
    }

    #[test]
    fn test_multipart_detection() {
        let request = |content_type: &str| {
            axum::http::Request::builder()
                .header(CONTENT_TYPE, content_type)
                .body(axum::body::Body::empty())
                .unwrap()
        };
        assert!(is_multipart(&request("multipart/form-data; boundary=x")));
        assert!(!is_multipart(&request("application/json")));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(parse_status("Shipped").unwrap(), OrderStatus::Shipped);
        assert!(parse_status("lost").is_err());
    }

    #[test]
    fn test_status_filter_all_means_unfiltered() {
        assert_eq!(status_filter(Some("all")).unwrap(), None);
        assert_eq!(status_filter(Some("ALL")).unwrap(), None);
        assert_eq!(status_filter(Some("  ")).unwrap(), None);
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(
            status_filter(Some("delivered")).unwrap(),
            Some(OrderStatus::Delivered)
        );
        assert!(matches!(
            status_filter(Some("bogus")),
            Err(AppError::BadRequest(msg)) if msg == "Invalid status"
        ));
    }
}
