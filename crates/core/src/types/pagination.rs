//! Page-window arithmetic for listings.

use serde::Serialize;

/// A 1-indexed page window over a listing.
///
/// ```
/// use delicious_core::Pagination;
///
/// let page = Pagination::new(Some(3), 4);
/// assert_eq!(page.skip(), 8);
/// assert_eq!(Pagination::total_pages(10, 4), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u32,
    per_page: u32,
}

impl Pagination {
    /// Create a window for `page` (defaults to 1, values below 1 clamp to 1).
    ///
    /// A `per_page` of zero is treated as one so the window is never empty.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    /// The requested page number (1-indexed).
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of records per page.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of records to skip before this page.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// `LIMIT` value for this page.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.per_page as u64
    }

    /// Number of pages needed for `count` records, i.e. `ceil(count / per_page)`.
    #[must_use]
    pub fn total_pages(count: u64, per_page: u32) -> u32 {
        let per_page = u64::from(per_page.max(1));
        u32::try_from(count.div_ceil(per_page)).unwrap_or(u32::MAX)
    }

    /// Page to redirect to when this page came back empty.
    ///
    /// Returns `None` for the first page (an empty first page is simply an
    /// empty listing) and otherwise the last page that holds records, or page 1
    /// when there are none at all.
    #[must_use]
    pub fn overflow_redirect(&self, returned: usize, count: u64) -> Option<u32> {
        if returned > 0 || self.skip() == 0 {
            return None;
        }
        Some(Self::total_pages(count, self.per_page).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_skips_nothing() {
        let page = Pagination::new(Some(1), 4);
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), 4);
    }

    #[test]
    fn test_default_and_clamped_page() {
        assert_eq!(Pagination::new(None, 4).page(), 1);
        assert_eq!(Pagination::new(Some(0), 4).page(), 1);
    }

    #[test]
    fn test_skip_grows_with_page() {
        assert_eq!(Pagination::new(Some(2), 4).skip(), 4);
        assert_eq!(Pagination::new(Some(5), 4).skip(), 16);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(Pagination::total_pages(10, 4), 3);
        assert_eq!(Pagination::total_pages(8, 4), 2);
        assert_eq!(Pagination::total_pages(1, 4), 1);
        assert_eq!(Pagination::total_pages(0, 4), 0);
    }

    #[test]
    fn test_overflow_redirects_to_last_page() {
        let page = Pagination::new(Some(7), 4);
        assert_eq!(page.overflow_redirect(0, 10), Some(3));
    }

    #[test]
    fn test_no_redirect_when_page_has_records() {
        let page = Pagination::new(Some(3), 4);
        assert_eq!(page.overflow_redirect(2, 10), None);
    }

    #[test]
    fn test_no_redirect_for_empty_first_page() {
        let page = Pagination::new(Some(1), 4);
        assert_eq!(page.overflow_redirect(0, 0), None);
    }

    #[test]
    fn test_overflow_with_no_records_goes_to_page_one() {
        let page = Pagination::new(Some(4), 4);
        assert_eq!(page.overflow_redirect(0, 0), Some(1));
    }
}
