//! Offset pagination primitives shared by list endpoints.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pagination parameters outside the accepted range.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page must be greater than or equal to 1, got {0}")]
    Page(i64),
    #[error("page_size must be between 1 and {max}, got {value}", max = MAX_PAGE_SIZE)]
    PageSize { value: i64 },
}

impl PageError {
    /// Name of the offending query parameter.
    pub fn field(&self) -> &'static str {
        match self {
            PageError::Page(_) => "page",
            PageError::PageSize { .. } => "page_size",
        }
    }
}

/// A validated, 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u32,
}

impl PageRequest {
    /// Validate raw parameters: `page >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`.
    pub fn new(page: i64, page_size: i64) -> Result<Self, PageError> {
        let page = u64::try_from(page)
            .ok()
            .filter(|page| *page >= 1)
            .ok_or(PageError::Page(page))?;
        let page_size = u32::try_from(page_size)
            .ok()
            .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
            .ok_or(PageError::PageSize { value: page_size })?;

        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip before this page starts, saturating at `i64::MAX` for
    /// pages far past any realistic row count.
    pub fn offset(&self) -> i64 {
        let offset = (self.page - 1).saturating_mul(u64::from(self.page_size));
        i64::try_from(offset).unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// `ceil(total / page_size)`; zero when there is nothing to page through.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the metadata needed to fetch the others.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            page_size: request.page_size(),
            total_pages: request.total_pages(total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_starts_at_zero_on_first_page() {
        let request = PageRequest::new(1, 10).unwrap();
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 10);

        let request = PageRequest::new(3, 25).unwrap();
        assert_eq!(request.offset(), 50);
    }

    #[test]
    fn total_pages_rounds_up() {
        let request = PageRequest::new(1, 10).unwrap();
        assert_eq!(request.total_pages(0), 0);
        assert_eq!(request.total_pages(1), 1);
        assert_eq!(request.total_pages(10), 1);
        assert_eq!(request.total_pages(15), 2);

        let single = PageRequest::new(1, 1).unwrap();
        assert_eq!(single.total_pages(7), 7);
    }

    #[test]
    fn huge_pages_are_valid_and_saturate_offset() {
        let request = PageRequest::new(4_294_967_296, 10).unwrap();
        assert_eq!(request.page(), 4_294_967_296);
        assert_eq!(request.offset(), 42_949_672_950);

        let request = PageRequest::new(i64::MAX, 100).unwrap();
        assert_eq!(request.offset(), i64::MAX);
        assert_eq!(request.total_pages(1), 1);
    }

    #[test]
    fn rejects_page_below_one() {
        assert_eq!(PageRequest::new(0, 10), Err(PageError::Page(0)));
        assert_eq!(PageRequest::new(-4, 10), Err(PageError::Page(-4)));
        assert_eq!(PageError::Page(0).field(), "page");
    }

    #[test]
    fn rejects_page_size_out_of_range() {
        assert_eq!(
            PageRequest::new(1, 0),
            Err(PageError::PageSize { value: 0 })
        );
        assert_eq!(
            PageRequest::new(1, 101),
            Err(PageError::PageSize { value: 101 })
        );
        assert!(PageRequest::new(1, 100).is_ok());
        assert_eq!(PageError::PageSize { value: 0 }.field(), "page_size");
    }

    #[test]
    fn page_serializes_with_metadata() {
        let page = Page::new(vec!["a", "b"], 12, PageRequest::new(2, 5).unwrap());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": ["a", "b"],
                "total": 12,
                "page": 2,
                "page_size": 5,
                "total_pages": 3
            })
        );
    }

    #[test]
    fn map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], 3, PageRequest::default()).map(|n| n * 2);
        assert_eq!(page.items, vec![2, 4, 6]);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.total_pages, 1);
    }
}
