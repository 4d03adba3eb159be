//! Page-number pagination for dashboard listings.

use serde::Serialize;

/// A resolved page of a listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub current: i64,
    pub total_pages: i64,
    pub per_page: i64,
}

impl Page {
    /// Resolve a requested page against the number of rows.
    ///
    /// Missing or unparsable requests give page 1. Requests past the end, and
    /// zero or negative requests, give the last page. An empty listing still
    /// has one page.
    #[must_use]
    pub fn clamp(requested: Option<&str>, total_count: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = ((total_count.max(0) + per_page - 1) / per_page).max(1);
        let current = match requested.and_then(|p| p.trim().parse::<i64>().ok()) {
            None => 1,
            Some(n) if n < 1 => total_pages,
            Some(n) => n.min(total_pages),
        };

        Self {
            current,
            total_pages,
            per_page,
        }
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.current - 1) * self.per_page
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_first_page() {
        let page = Page::clamp(None, 25, 10);
        assert_eq!(page.current, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_past_the_end_gives_last_page() {
        let page = Page::clamp(Some("99"), 25, 10);
        assert_eq!(page.current, 3);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_garbage_gives_first_page() {
        assert_eq!(Page::clamp(Some("two"), 25, 10).current, 1);
        assert_eq!(Page::clamp(Some(""), 25, 10).current, 1);
    }

    #[test]
    fn test_non_positive_gives_last_page() {
        assert_eq!(Page::clamp(Some("0"), 25, 10).current, 3);
        assert_eq!(Page::clamp(Some("-4"), 25, 10).current, 3);
        assert_eq!(Page::clamp(Some("0"), 0, 10).current, 1);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page = Page::clamp(Some("3"), 0, 10);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.current, 1);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(Page::clamp(None, 20, 10).total_pages, 2);
        assert_eq!(Page::clamp(None, 21, 10).total_pages, 3);
    }
}
