//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use serde::{Deserialize, Serialize};

use bazaar_core::UserId;

use super::User;

/// Session-stored user identity.
///
/// Just enough to authorize a request without a database round trip. Staff
/// status is re-read at login, so demoting a user takes effect on their next
/// login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub is_staff: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// Session keys.
pub mod keys {
    /// The logged-in [`CurrentUser`](super::CurrentUser).
    pub const CURRENT_USER: &str = "current_user";

    /// Random token naming this visitor's cart.
    pub const CART_TOKEN: &str = "cart_token";
}
