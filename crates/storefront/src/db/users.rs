//! User repository.

use sqlx::PgPool;

use bazaar_core::{Email, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_staff, is_active, date_joined";

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: Option<&'a Email>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub is_staff: bool,
}

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM bazaar.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Create a user and their password row in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    pub async fn create_with_password(
        &self,
        new_user: &NewUser<'_>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r"
            INSERT INTO bazaar.user (username, email, first_name, last_name, is_staff)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.is_staff)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "username"))?;

        sqlx::query(
            r"
            INSERT INTO bazaar.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(user.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Look up an active user and their password hash by username.
    ///
    /// Returns `None` if the user doesn't exist, is inactive or has no password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: User,
            password_hash: String,
        }

        let row = sqlx::query_as::<_, Row>(
            r"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name,
                   u.is_staff, u.is_active, u.date_joined, p.password_hash
            FROM bazaar.user u
            JOIN bazaar.user_password p ON p.user_id = u.id
            WHERE u.username = $1 AND u.is_active
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Update the editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        email: Option<&Email>,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE bazaar.user
            SET email = $2, first_name = $3, last_name = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Grant staff access to an existing account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that username.
    pub async fn promote_to_staff(&self, username: &str) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE bazaar.user SET is_staff = TRUE WHERE username = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM bazaar.user WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }
}
