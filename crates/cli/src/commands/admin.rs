//! Staff account management.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli admin create -u admin -e admin@example.com -p 'long passphrase'
//! ```
//!
//! An existing username is promoted to staff; its password is left alone.

use bazaar_storefront::db::{RepositoryError, UserRepository};
use bazaar_storefront::services::AuthService;
use bazaar_storefront::services::auth::{AuthError, Registration};
use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a staff user and return its username.
pub async fn create_staff(
    username: &str,
    email: Option<&str>,
    password: &str,
) -> Result<String, AdminError> {
    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if users.get_by_username(username.trim()).await?.is_some() {
        let user = users.promote_to_staff(username.trim()).await?;
        tracing::warn!(
            "User {} already existed and was promoted to staff; password unchanged",
            user.username
        );
        return Ok(user.username);
    }

    let user = AuthService::new(&pool)
        .register_staff(&Registration {
            username,
            email,
            password,
            ..Registration::default()
        })
        .await?;

    tracing::info!(
        "Staff user created successfully! ID: {}, Username: {}",
        user.id,
        user.username
    );
    Ok(user.username)
}
