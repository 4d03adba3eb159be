//! Saved address API, scoped to the logged-in customer.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bazaar_core::{AddressId, AddressType};

use crate::db::{AddressChanges, AddressRepository, NewAddress, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Address;
use crate::state::AppState;

/// Build the address router (mounted under `/shop/api/addresses`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/set-default", post(set_default))
}

fn address_not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Address not found".to_owned()),
        other => other.into(),
    }
}

/// New address as submitted; required fields are checked by hand so the
/// error names the missing field.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAddressRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub address_type: Option<AddressType>,
    #[serde(default)]
    pub is_default: bool,
}

impl CreateAddressRequest {
    fn validate(self) -> Result<NewAddress> {
        fn required(value: Option<String>, field: &str) -> Result<String> {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
        }

        Ok(NewAddress {
            name: required(self.name, "name")?,
            phone: required(self.phone, "phone")?,
            address_line1: required(self.address_line1, "address_line1")?,
            address_line2: self.address_line2.unwrap_or_default(),
            city: required(self.city, "city")?,
            state: required(self.state, "state")?,
            postal_code: required(self.postal_code, "postal_code")?,
            country: self.country.filter(|c| !c.trim().is_empty()),
            address_type: self.address_type.unwrap_or_default(),
            is_default: self.is_default,
        })
    }
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(addresses))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let new = body.validate()?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &new)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": address.id, "message": "Address created successfully" })),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    let address = AddressRepository::new(state.pool())
        .get(user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".to_owned()))?;
    Ok(Json(address))
}

/// Partial update; `is_default: true` moves the default here.
#[instrument(skip(state, user, changes), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(changes): Json<AddressChanges>,
) -> Result<Json<Value>> {
    AddressRepository::new(state.pool())
        .update(user.id, id, &changes)
        .await
        .map_err(address_not_found)?;
    Ok(Json(json!({ "message": "Address updated successfully" })))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Value>> {
    AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await
        .map_err(address_not_found)?;
    Ok(Json(json!({ "message": "Address deleted successfully" })))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Value>> {
    AddressRepository::new(state.pool())
        .set_default(user.id, id)
        .await
        .map_err(address_not_found)?;
    Ok(Json(json!({ "message": "Default address updated" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete() -> CreateAddressRequest {
        CreateAddressRequest {
            name: Some("Asha Rao".to_owned()),
            phone: Some("9876543210".to_owned()),
            address_line1: Some("12 MG Road".to_owned()),
            city: Some("Bengaluru".to_owned()),
            state: Some("Karnataka".to_owned()),
            postal_code: Some("560001".to_owned()),
            ..CreateAddressRequest::default()
        }
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let new = complete().validate().unwrap();
        assert_eq!(new.address_type, AddressType::Home);
        assert!(new.country.is_none());
        assert!(new.address_line2.is_empty());
        assert!(!new.is_default);
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = CreateAddressRequest {
            city: Some("   ".to_owned()),
            ..complete()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "city is required"));
    }

    #[test]
    fn test_first_missing_field_wins() {
        let err = CreateAddressRequest::default().validate().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "name is required"));
    }
}
