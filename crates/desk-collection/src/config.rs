//! Collection controller configuration.

use crate::types::Filters;

/// Rows per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Initial view state for a [`PagedCollection`](crate::PagedCollection).
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionConfig {
    /// Page size of a freshly created view.
    pub default_page_size: u32,
    /// Sort key of a freshly created view.
    pub initial_sort_key: Option<String>,
    /// Sort direction of a freshly created view.
    pub initial_sort_descending: bool,
    /// Filters of a freshly created view.
    pub initial_filters: Filters,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            initial_sort_key: None,
            initial_sort_descending: false,
            initial_filters: Filters::new(),
        }
    }
}

impl CollectionConfig {
    /// Set the initial page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Set the initial sort.
    #[must_use]
    pub fn with_sort(mut self, key: impl Into<String>, descending: bool) -> Self {
        self.initial_sort_key = Some(key.into());
        self.initial_sort_descending = descending;
        self
    }

    /// Add an initial filter.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.initial_filters.insert(key.into(), value);
        self
    }
}
