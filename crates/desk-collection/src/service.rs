//! The backend query boundary.

use std::future::Future;
use std::pin::Pin;

use desk_sync::ErrorInfo;

use crate::types::{PageRequest, PageResult};

/// Future returned by [`QueryService::fetch_page`].
pub type PageFuture<T> = Pin<Box<dyn Future<Output = Result<PageResult<T>, ErrorInfo>> + Send + 'static>>;

/// A backend that answers paginated queries.
///
/// Implementations classify their own failures; the controller only routes
/// on [`ErrorInfo::kind`](desk_sync::ErrorInfo). No deadline is enforced by
/// the controller, so any timeout belongs to the implementation.
pub trait QueryService: Send + Sync + 'static {
    /// Row type of the collection.
    type Item: Send + Sync + 'static;

    /// Fetch one page.
    ///
    /// Called synchronously when the fetch is issued; the returned future is
    /// driven to completion even if a later request supersedes it.
    fn fetch_page(&self, request: PageRequest) -> PageFuture<Self::Item>;
}
