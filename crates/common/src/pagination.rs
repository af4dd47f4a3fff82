//! Pagination utilities for the service layer
//!
//! Provides a simple `Pagination` input struct, helpers to normalize
//! caller-supplied values, and the `PageInfo` block attached to list
//! responses.

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Clone, Copy, Debug)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    pub const MAX_PER_PAGE: u32 = 100;

    /// Clamp to sane values: page at least 1, per_page in 1..=100.
    pub fn normalize(self) -> (u32, u32) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, Self::MAX_PER_PAGE);
        (page, per_page)
    }

    /// Zero-based row window `(offset, limit)` for range queries.
    pub fn window(self) -> (u64, u64) {
        let (page, per_page) = self.normalize();
        ((page as u64 - 1) * per_page as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: 20 } }
}

/// Pagination block returned alongside list payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    /// Derive the full block from normalized inputs and a total row count.
    pub fn compute(page: u32, per_page: u32, total_count: u64) -> Self {
        let per = per_page.max(1) as u64;
        let total_pages = (total_count.div_ceil(per)) as u32;
        Self {
            page,
            per_page: per_page.max(1),
            total_count,
            total_pages,
            has_next: (page as u64) < total_pages as u64,
            has_prev: page > 1,
        }
    }

    /// Convenience wrapper taking the original `Pagination` input.
    pub fn from_query(query: Pagination, total_count: u64) -> Self {
        let (page, per_page) = query.normalize();
        Self::compute(page, per_page, total_count)
    }
}

#[cfg(test)]
mod tests {
    use super::{PageInfo, Pagination};

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (page, per) = Pagination { page: 0, per_page: 0 }.normalize();
        assert_eq!(page, 1);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (page, per) = Pagination { page: 5, per_page: 1000 }.normalize();
        assert_eq!(page, 5);
        assert_eq!(per, 100);
    }

    #[test]
    fn default_values_are_sane() {
        let d = Pagination::default();
        assert_eq!(d.page, 1);
        assert_eq!(d.per_page, 20);
    }

    #[test]
    fn window_is_zero_based() {
        assert_eq!(Pagination { page: 1, per_page: 20 }.window(), (0, 20));
        assert_eq!(Pagination { page: 3, per_page: 10 }.window(), (20, 10));
    }

    #[test]
    fn page_info_computes_bounds() {
        let info = PageInfo::compute(2, 10, 35);
        assert_eq!(info.total_pages, 4);
        assert!(info.has_next);
        assert!(info.has_prev);

        let last = PageInfo::compute(4, 10, 35);
        assert!(!last.has_next);

        let empty = PageInfo::compute(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
