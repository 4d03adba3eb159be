//! Wishlist entries.

use chrono::{DateTime, Utc};

use bazaar_core::WishlistItemId;

use super::ProductListing;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishlistEntry {
    pub item_id: WishlistItemId,
    pub added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub listing: ProductListing,
}
