//! # desk-tail
//!
//! Live log subscriber for gateway frames, device frames, and device events.
//!
//! [`LiveTail::start`] opens a stream against a [`LogStreamService`] and
//! returns an owned [`TailHandle`]. Pushed entries accumulate newest-first
//! in a [`LogBuffer`] that drops duplicates and regressions at the front.
//! When the stream ends or drops, the tail waits a fixed delay and reopens
//! it with the same request, indefinitely, until the owner calls
//! [`TailHandle::cancel`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use desk_tail::{LiveTail, LogStreamService, OpenFuture, TailRequest};
//! # struct Backend;
//! # impl LogStreamService for Backend {
//! #     fn subscribe(&self, _request: &TailRequest) -> OpenFuture {
//! #         Box::pin(async { Err::<desk_tail::LogStream, _>(desk_tail::ErrorInfo::transport("offline")) })
//! #     }
//! # }
//!
//! # async fn example() {
//! let tail = LiveTail::new(Backend);
//! let handle = tail.start(TailRequest::device_events("0102030405060708"));
//! // ...
//! for entry in handle.entries() {
//!     println!("{} {}", entry.id, entry.kind);
//! }
//! handle.cancel();
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod service;
pub mod state;
pub mod subscriber;
pub mod types;

pub use buffer::LogBuffer;
pub use config::{DEFAULT_RECONNECT_DELAY, ReconnectPolicy, TailConfig};
pub use desk_sync::{ErrorHook, ErrorInfo, ErrorKind, Subscription};
pub use error::{Result, TailError};
pub use service::{LogStream, LogStreamService, OpenFuture};
pub use state::{AtomicSubscriptionState, SubscriptionState};
pub use subscriber::{LiveTail, TailHandle};
pub use types::{LogEntry, LogId, TailRequest};
