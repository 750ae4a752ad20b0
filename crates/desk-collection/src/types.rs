//! Request, result, and view-state types.

use std::collections::BTreeMap;
use std::sync::Arc;

use desk_sync::{ErrorInfo, Generation};
use serde::{Deserialize, Serialize};

use crate::config::CollectionConfig;

/// Filter identifiers and their opaque values, forwarded verbatim to the backend.
pub type Filters = BTreeMap<String, serde_json::Value>;

/// Parameters of one paginated fetch. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Maximum number of items to return.
    pub limit: u32,
    /// Number of items to skip.
    pub offset: u64,
    /// Sort identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Sort direction.
    #[serde(default)]
    pub sort_descending: bool,
    /// Filters.
    #[serde(default)]
    pub filters: Filters,
}

/// One page returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    /// Total number of items matching the filters.
    pub total_count: u64,
    /// Items of the requested page, in backend order.
    pub items: Vec<T>,
}

impl<T> PageResult<T> {
    /// Create a page result.
    pub const fn new(total_count: u64, items: Vec<T>) -> Self {
        Self { total_count, items }
    }
}

/// View state owned by one [`PagedCollection`](crate::PagedCollection).
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Current page, starting at 1.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
    /// Sort identifier.
    pub sort_key: Option<String>,
    /// Sort direction.
    pub sort_descending: bool,
    /// Active filters.
    pub filters: Filters,
    /// A fetch of the current generation is outstanding.
    pub loading: bool,
    /// Failure of the last applied fetch, if it failed.
    pub last_error: Option<ErrorInfo>,
}

impl ViewState {
    /// Initial view state: first page, not loading, no error.
    ///
    /// A zero page size in the configuration is raised to 1.
    #[must_use]
    pub fn from_config(config: &CollectionConfig) -> Self {
        Self {
            page: 1,
            page_size: config.default_page_size.max(1),
            sort_key: config.initial_sort_key.clone(),
            sort_descending: config.initial_sort_descending,
            filters: config.initial_filters.clone(),
            loading: false,
            last_error: None,
        }
    }

    /// The request that fetches this view.
    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest {
            limit: self.page_size,
            offset: u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size),
            sort_key: self.sort_key.clone(),
            sort_descending: self.sort_descending,
            filters: self.filters.clone(),
        }
    }
}

/// What listeners receive: the view state plus the last applied page.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<T> {
    /// Items of the last successfully applied page.
    pub items: Arc<[T]>,
    /// Total count of the last successfully applied page.
    pub total_count: u64,
    /// Current page.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
    /// Sort identifier.
    pub sort_key: Option<String>,
    /// Sort direction.
    pub sort_descending: bool,
    /// Active filters.
    pub filters: Filters,
    /// A fetch of the current generation is outstanding.
    pub loading: bool,
    /// Failure of the last applied fetch.
    pub last_error: Option<ErrorInfo>,
    /// Generation of the most recently issued request.
    pub generation: Generation,
}

impl<T> CollectionSnapshot<T> {
    /// Number of pages implied by `total_count` (at least 1).
    #[must_use]
    pub fn page_count(&self) -> u64 {
        let size = u64::from(self.page_size.max(1));
        self.total_count.div_ceil(size).max(1)
    }

    /// Returns true if the current page lies beyond the last page implied by
    /// `total_count`. The controller never clamps the page on its own.
    #[must_use]
    pub fn is_past_end(&self) -> bool {
        u64::from(self.page) > self.page_count()
    }
}
