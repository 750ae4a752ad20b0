//! Error taxonomy shared by the paged collection and live tail runtimes.
//!
//! Service adapters classify their failures into an [`ErrorKind`]; the core
//! components never inspect the message, they only route on the kind.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failure reported by a backend collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network unreachable or stream dropped.
    Transport,
    /// The backend rejected the request.
    Server,
    /// The session is not (or no longer) authorized.
    Auth,
    /// A response or pushed entry could not be decoded.
    Protocol,
}

impl ErrorKind {
    /// Short lowercase name, used in log fields and table output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Server => "server",
            Self::Auth => "auth",
            Self::Protocol => "protocol",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure, delivered through snapshots and error hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind} error: {message}")]
pub struct ErrorInfo {
    /// Failure class.
    pub kind: ErrorKind,
    /// Human-readable detail from the collaborator.
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transport-class failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Server-class failure.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    /// Authentication-class failure.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    /// Protocol-class failure.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Returns true for authentication-class failures.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self.kind, ErrorKind::Auth)
    }

    /// Returns true for transport-class failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }
}

/// Upward callback that lets a hosting application react to failures,
/// e.g. redirecting to a login flow on [`ErrorKind::Auth`].
pub type ErrorHook = Arc<dyn Fn(&ErrorInfo) + Send + Sync>;
