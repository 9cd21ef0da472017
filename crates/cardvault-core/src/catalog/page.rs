//! Offset pagination and listing filters.

use serde::{Deserialize, Serialize};

use super::model::{Category, ItemKind, ItemStatus};

/// Default number of entries per page.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// A 1-based page request.
///
/// Page and size are always at least 1, including after deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PageRequestFields")]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

#[derive(Deserialize)]
struct PageRequestFields {
    page: usize,
    page_size: usize,
}

impl From<PageRequestFields> for PageRequest {
    fn from(fields: PageRequestFields) -> Self {
        Self::new(fields.page, fields.page_size)
    }
}

impl PageRequest {
    /// Creates a request, clamping page and size to at least 1.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Zero-based offset of the first row, saturating for absurd page numbers.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Inclusive row range `(from, to)` for range-based backends.
    pub fn range(&self) -> (usize, usize) {
        let from = self.offset();
        (from, from.saturating_add(self.page_size.saturating_sub(1)))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results with navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: usize, request: PageRequest) -> Self {
        let (page, page_size) = (request.page(), request.page_size());
        let total_pages = total_count.div_ceil(page_size);
        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
        }
    }
}

/// Listing filter. Empty fields do not restrict the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub category: Option<Category>,
    pub kind: Option<ItemKind>,
    pub status: Option<ItemStatus>,
    /// Case-insensitive substring match on the name.
    pub search: Option<String>,
}

impl CatalogFilter {
    /// Returns the trimmed search text, if not blank.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_metadata() {
        let page = Page::new(vec![1, 2], 26, PageRequest::new(3, 12));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_previous);
        assert!(!page.has_next);
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let page: Page<u8> = Page::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_previous);
        assert!(!page.has_next);
    }

    #[test]
    fn test_range_and_clamping() {
        let request = PageRequest::new(0, 0);
        assert_eq!(request, PageRequest::new(1, 1));
        assert_eq!(PageRequest::new(2, 12).range(), (12, 23));
    }

    #[test]
    fn test_deserialized_request_is_clamped() {
        let request: PageRequest = serde_json::from_str(r#"{"page":0,"page_size":0}"#).unwrap();
        assert_eq!(request, PageRequest::new(1, 1));
        assert_eq!(request.offset(), 0);

        let page: Page<u8> = Page::new(Vec::new(), 5, request);
        assert_eq!(page.total_pages, 5);
    }

    #[test]
    fn test_huge_page_number_saturates() {
        let request = PageRequest::new(usize::MAX, 12);
        assert_eq!(request.offset(), usize::MAX);
        assert_eq!(request.range(), (usize::MAX, usize::MAX));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = CatalogFilter {
            search: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_text(), None);
    }
}
