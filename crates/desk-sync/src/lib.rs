//! # desk-sync
//!
//! Small building blocks shared by the console's list and live-log runtimes.
//!
//! - [`ErrorInfo`] / [`ErrorKind`] - classified failures that cross callback boundaries
//! - [`GenerationCounter`] - monotonic tags used to discard stale responses
//! - [`Observers`] - explicit register/unregister observer registry
//!
//! ## Example
//!
//! ```rust
//! use desk_sync::{GenerationCounter, Observers};
//!
//! let generations = GenerationCounter::new();
//! let first = generations.advance();
//! let second = generations.advance();
//! assert!(!generations.is_current(first));
//! assert!(generations.is_current(second));
//!
//! let observers: Observers<u32> = Observers::new();
//! let subscription = observers.subscribe(|value| println!("got {value}"));
//! observers.notify(&7);
//! subscription.unsubscribe();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod generation;
pub mod observer;

pub use error::{ErrorHook, ErrorInfo, ErrorKind};
pub use generation::{Generation, GenerationCounter};
pub use observer::{ListenerId, Observers, Subscription};
