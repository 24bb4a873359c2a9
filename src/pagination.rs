//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// The query parameters for requesting one page of a list.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
pub struct PageQuery {
    /// The 1-based page number.
    pub page: Option<u64>,
    /// The number of items per page.
    pub per_page: Option<u64>,
}

impl PageQuery {
    /// Resolve the page number and page size, falling back to the config
    /// defaults and clamping to sensible bounds.
    pub fn resolve(&self, config: &PaginationConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(config.default_page).max(1);
        let per_page = self
            .per_page
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);

        (page, per_page)
    }
}

/// One page of items along with enough information to request the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of items per page.
    pub per_page: u64,
    /// The number of items across all pages.
    pub total_items: u64,
    /// The number of pages.
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Wrap `items` as page `page` of a list of `total_items`.
    pub fn new(items: Vec<T>, page: u64, per_page: u64, total_items: u64) -> Self {
        Self {
            items,
            page,
            per_page,
            total_items,
            total_pages: total_items.div_ceil(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, PageQuery, PaginationConfig};

    #[test]
    fn uses_defaults_when_unspecified() {
        let config = PaginationConfig::default();

        assert_eq!(PageQuery::default().resolve(&config), (1, 20));
    }

    #[test]
    fn clamps_page_size_and_page_number() {
        let config = PaginationConfig::default();
        let query = PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        };

        assert_eq!(query.resolve(&config), (1, 100));
    }

    #[test]
    fn counts_partial_last_page() {
        let page = Page::new(vec![1, 2], 3, 5, 12);

        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn empty_list_has_no_pages() {
        let page: Page<i32> = Page::new(vec![], 1, 20, 0);

        assert_eq!(page.total_pages, 0);
    }
}
