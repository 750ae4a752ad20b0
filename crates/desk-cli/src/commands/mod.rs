//! CLI command implementations.
//!
//! - [`list`] - One page of a resource collection
//! - [`tail`] - Live gateway/device frame and event streams

pub mod list;
pub mod tail;

pub use list::ListCommand;
pub use tail::TailCommand;
