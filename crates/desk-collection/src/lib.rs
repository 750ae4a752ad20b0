//! # desk-collection
//!
//! Driver for every remote-paginated list screen of the console.
//!
//! A [`PagedCollection`] owns one screen's view state (page, page size, sort,
//! filters), issues a fetch against a [`QueryService`] for every change, and
//! republishes a [`CollectionSnapshot`] to registered listeners. Responses are
//! tagged with a request generation; only the response of the most recently
//! issued request is ever applied, whatever order the network delivers them in.
//!
//! ## Example
//!
//! ```rust,no_run
//! use desk_collection::{
//!     CollectionConfig, ErrorInfo, PageFuture, PageRequest, PageResult, PagedCollection,
//!     QueryService,
//! };
//!
//! struct Devices;
//!
//! impl QueryService for Devices {
//!     type Item = String;
//!
//!     fn fetch_page(&self, request: PageRequest) -> PageFuture<String> {
//!         Box::pin(async move {
//!             Ok::<_, ErrorInfo>(PageResult::new(1, vec![format!("offset {}", request.offset)]))
//!         })
//!     }
//! }
//!
//! # async fn example() {
//! let devices = PagedCollection::new(Devices, CollectionConfig::default());
//! let subscription = devices.subscribe(|snapshot| {
//!     println!("{} of {} rows", snapshot.items.len(), snapshot.total_count);
//! });
//! devices.start().ok();
//! devices.set_page(2).ok();
//! // ...
//! subscription.unsubscribe();
//! devices.close();
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod error;
pub mod service;
pub mod types;

pub use config::CollectionConfig;
pub use controller::PagedCollection;
pub use desk_sync::{ErrorHook, ErrorInfo, ErrorKind, Generation, Subscription};
pub use error::{CollectionError, Result};
pub use service::{PageFuture, QueryService};
pub use types::{CollectionSnapshot, Filters, PageRequest, PageResult, ViewState};
