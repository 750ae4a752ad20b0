//! Error types for the collection controller.

use thiserror::Error;

/// Errors returned by [`PagedCollection`](crate::PagedCollection) setters.
///
/// Fetch failures are not reported here; they are recorded in the snapshot's
/// `last_error` and passed to the error hook.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionError {
    /// Pages are numbered from 1.
    #[error("invalid page: {0} (pages start at 1)")]
    InvalidPage(u32),

    /// Page size must be positive.
    #[error("invalid page size: {0}")]
    InvalidPageSize(u32),

    /// The controller has been torn down.
    #[error("collection is closed")]
    Closed,
}

/// Result type alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            CollectionError::InvalidPage(0).to_string(),
            "invalid page: 0 (pages start at 1)"
        );
        assert_eq!(
            CollectionError::InvalidPageSize(0).to_string(),
            "invalid page size: 0"
        );
        assert_eq!(CollectionError::Closed.to_string(), "collection is closed");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CollectionError>();
    }
}
