//! CLI error types.

use desk_collection::CollectionError;
use desk_sync::{ErrorInfo, ErrorKind};
use desk_tail::TailError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend unreachable or stream dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend rejected or garbled a request.
    #[error("request failed: {0}")]
    Request(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session is no longer authorized.
    #[error("session expired: {0}")]
    Auth(String),
}

impl CliError {
    /// Returns true for [`CliError::Auth`].
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<ErrorInfo> for CliError {
    fn from(err: ErrorInfo) -> Self {
        match err.kind {
            ErrorKind::Auth => Self::Auth(err.message),
            ErrorKind::Transport => Self::Connection(err.message),
            ErrorKind::Server | ErrorKind::Protocol => Self::Request(err.to_string()),
        }
    }
}

impl From<CollectionError> for CliError {
    fn from(err: CollectionError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<TailError> for CliError {
    fn from(err: TailError) -> Self {
        match err {
            TailError::InvalidLogId(_) => Self::InvalidArgument(err.to_string()),
            TailError::Cancelled => Self::Connection(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_connection() {
        let err = CliError::Connection("timeout".into());
        assert_eq!(err.to_string(), "connection error: timeout");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }

    #[test]
    fn auth_info_maps_to_auth() {
        let err = CliError::from(ErrorInfo::auth("token expired"));
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "session expired: token expired");
    }

    #[test]
    fn server_info_maps_to_request() {
        let err = CliError::from(ErrorInfo::server("500 Internal Server Error"));
        assert!(matches!(err, CliError::Request(_)));
        assert!(err.to_string().contains("server error"));
    }

    #[test]
    fn collection_error_maps_to_invalid_argument() {
        let err = CliError::from(CollectionError::InvalidPage(0));
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
