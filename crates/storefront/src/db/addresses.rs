//! Saved address queries, always scoped to the owning user.
//!
//! A user has at most one default address (enforced by a partial unique
//! index), so every write that sets `is_default` first clears the flag on
//! the user's other addresses inside the same transaction.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{AddressId, AddressType, UserId};

use super::RepositoryError;
use crate::models::Address;

const ADDRESS_COLUMNS: &str = r"
    id, user_id, name, phone, address_line1, address_line2, city, state,
    postal_code, country, address_type, is_default, created_at";

const DEFAULT_COUNTRY: &str = "India";

/// A validated address to insert.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: Option<String>,
    pub address_type: AddressType,
    pub is_default: bool,
}

/// Fields to overwrite; `None` keeps the stored value.
///
/// `is_default: Some(false)` is ignored; a default is only given up by
/// making another address the default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub address_type: Option<AddressType>,
    pub is_default: Option<bool>,
}

pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's addresses, default first, then oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            r"
            SELECT {ADDRESS_COLUMNS} FROM bazaar.address
            WHERE user_id = $1
            ORDER BY is_default DESC, id
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM bazaar.address WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }

    /// Look up an address regardless of owner (guest checkout, invoices).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_any(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM bazaar.address WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }

    /// Insert an address. The user's first address always becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        new: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let has_any: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bazaar.address WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        let is_default = new.is_default || !has_any;
        if is_default {
            Self::clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            INSERT INTO bazaar.address
                (user_id, name, phone, address_line1, address_line2, city, state,
                 postal_code, country, address_type, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(&new.name)
        .bind(&new.phone)
        .bind(&new.address_line1)
        .bind(&new.address_line2)
        .bind(&new.city)
        .bind(&new.state)
        .bind(&new.postal_code)
        .bind(new.country.as_deref().unwrap_or(DEFAULT_COUNTRY))
        .bind(new.address_type)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        changes: &AddressChanges,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let make_default = changes.is_default == Some(true);
        if make_default {
            Self::clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            UPDATE bazaar.address SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                address_line1 = COALESCE($5, address_line1),
                address_line2 = COALESCE($6, address_line2),
                city = COALESCE($7, city),
                state = COALESCE($8, state),
                postal_code = COALESCE($9, postal_code),
                country = COALESCE($10, country),
                address_type = COALESCE($11, address_type),
                is_default = is_default OR $12
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .bind(changes.name.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.address_line1.as_deref())
        .bind(changes.address_line2.as_deref())
        .bind(changes.city.as_deref())
        .bind(changes.state.as_deref())
        .bind(changes.postal_code.as_deref())
        .bind(changes.country.as_deref())
        .bind(changes.address_type)
        .bind(make_default)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete an address; if it was the default, the oldest remaining one
    /// takes over.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_default: bool = sqlx::query_scalar(
            "DELETE FROM bazaar.address WHERE id = $1 AND user_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if was_default {
            sqlx::query(
                r"
                UPDATE bazaar.address SET is_default = TRUE
                WHERE id = (SELECT id FROM bazaar.address WHERE user_id = $1 ORDER BY id LIMIT 1)
                ",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        self.update(
            user_id,
            id,
            &AddressChanges {
                is_default: Some(true),
                ..AddressChanges::default()
            },
        )
        .await
        .map(|_| ())
    }

    async fn clear_default(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.address SET is_default = FALSE WHERE user_id = $1 AND is_default")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
