//! Authentication service.
//!
//! Username and password accounts, hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use bazaar_core::{Email, UserId};

use crate::db::users::{NewUser, UserRepository};
use crate::db::RepositoryError;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const MAX_USERNAME_LENGTH: usize = 150;

/// Registration form after deserialization.
#[derive(Debug, Clone, Default)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` or `AuthError::InvalidEmail` for
    /// malformed input, `AuthError::WeakPassword` if the password is too short,
    /// and `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn register(&self, form: &Registration<'_>) -> Result<User, AuthError> {
        self.create_account(form, false).await
    }

    /// Register a staff account (used by the CLI).
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub async fn register_staff(&self, form: &Registration<'_>) -> Result<User, AuthError> {
        self.create_account(form, true).await
    }

    async fn create_account(
        &self,
        form: &Registration<'_>,
        is_staff: bool,
    ) -> Result<User, AuthError> {
        let username = validate_username(form.username)?;
        let email = form
            .email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(Email::parse)
            .transpose()?;

        validate_password(form.password)?;
        let password_hash = hash_password(form.password)?;

        let new_user = NewUser {
            username,
            email: email.as_ref(),
            first_name: form.first_name.trim(),
            last_name: form.last_name.trim(),
            is_staff,
        };

        let user = self
            .users
            .create_with_password(&new_user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong
    /// or the account is inactive.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_with_password_hash(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Usernames are 1-150 characters of letters, digits and `@.+-_`.
fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username is required".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AuthError::InvalidUsername(
            "username may only contain letters, digits and @/./+/-/_".to_owned(),
        ));
    }
    Ok(username)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
