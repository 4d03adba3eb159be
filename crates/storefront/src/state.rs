//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::StorefrontConfig;
use crate::services::{EmailService, GatewayError, RazorpayClient};

/// Error building application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    Gateway(#[from] GatewayError),
    #[error("smtp transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    payments: RazorpayClient,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment client or SMTP transport can't be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let payments = RazorpayClient::new(&config.payment)?;
        let email = config.email.as_ref().map(EmailService::new).transpose()?;

        if email.is_none() {
            tracing::info!("SMTP not configured, order confirmation emails disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payments,
                email,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn payments(&self) -> &RazorpayClient {
        &self.inner.payments
    }

    /// The email service, when SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}
