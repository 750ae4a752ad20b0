//! Error types for the live tail.

use thiserror::Error;

/// Errors returned by live tail operations.
///
/// Stream failures are not reported here; they drive the reconnect loop and,
/// for auth and server failures, the error hook.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TailError {
    /// A log id was not of the form `<millis>-<seq>` or `<millis>`.
    #[error("invalid log id: {0}")]
    InvalidLogId(String),

    /// The subscription has been cancelled.
    #[error("subscription cancelled")]
    Cancelled,
}

/// Result type alias for live tail operations.
pub type Result<T> = std::result::Result<T, TailError>;
