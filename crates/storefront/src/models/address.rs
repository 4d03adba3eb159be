//! Saved shipping addresses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{AddressId, AddressType, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    #[serde(skip)]
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub address_type: AddressType,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Single-line form for invoices.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.address_line1.as_str(),
            self.address_line2.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}
