//! Shop accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId};

/// A registered customer or staff member.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<Email>,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", or the username when no name is set.
    #[must_use]
    pub fn display_name(&self) -> String {
        full_name_or(&self.first_name, &self.last_name, &self.username)
    }
}

/// Join first and last name, falling back when both are blank.
#[must_use]
pub fn full_name_or(first: &str, last: &str, fallback: &str) -> String {
    let full = format!("{} {}", first.trim(), last.trim());
    let full = full.trim();
    if full.is_empty() {
        fallback.to_owned()
    } else {
        full.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_or() {
        assert_eq!(full_name_or("Asha", "Rao", "asha91"), "Asha Rao");
        assert_eq!(full_name_or("Asha", "", "asha91"), "Asha");
        assert_eq!(full_name_or("  ", "", "asha91"), "asha91");
    }
}
