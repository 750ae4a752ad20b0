//! The log stream boundary.

use std::future::Future;
use std::pin::Pin;

use desk_sync::ErrorInfo;
use futures::Stream;

use crate::types::{LogEntry, TailRequest};

/// An open log stream.
///
/// Items are entries or classified failures. A `Protocol` item marks one
/// malformed push and does not end the stream; any other error item, or the
/// end of the stream, terminates it.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<LogEntry, ErrorInfo>> + Send + 'static>>;

/// Future returned by [`LogStreamService::subscribe`].
pub type OpenFuture = Pin<Box<dyn Future<Output = Result<LogStream, ErrorInfo>> + Send + 'static>>;

/// A backend that pushes log entries.
///
/// Dropping the returned stream closes the subscription.
pub trait LogStreamService: Send + Sync + 'static {
    /// Open a stream for `request`.
    fn subscribe(&self, request: &TailRequest) -> OpenFuture;
}
