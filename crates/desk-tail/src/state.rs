//! Subscription state types.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle state of one live tail.
///
/// Transitions run `Idle -> Connecting -> Streaming -> ReconnectPending ->
/// Connecting -> ...`; a failed open goes straight from `Connecting` to
/// `ReconnectPending`. Any state may move to `Cancelled`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Created, not yet opened.
    Idle,
    /// Opening the stream.
    Connecting,
    /// Receiving entries.
    Streaming,
    /// Stream ended; waiting for the reconnect delay.
    ReconnectPending,
    /// Cancelled by the owner.
    Cancelled,
}

impl SubscriptionState {
    /// Returns true for [`SubscriptionState::Cancelled`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    const fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Streaming,
            3 => Self::ReconnectPending,
            _ => Self::Cancelled,
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::ReconnectPending => "reconnect_pending",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic wrapper for subscription state.
#[derive(Debug)]
pub struct AtomicSubscriptionState(AtomicU32);

impl AtomicSubscriptionState {
    /// Create a new atomic state.
    #[must_use]
    pub const fn new(state: SubscriptionState) -> Self {
        Self(AtomicU32::new(state as u32))
    }

    /// Load the current state.
    #[must_use]
    pub fn load(&self) -> SubscriptionState {
        SubscriptionState::from_u32(self.0.load(Ordering::SeqCst))
    }

    /// Move from `from` to `to` if the state is still `from`.
    ///
    /// Always fails once cancelled.
    pub fn transition(&self, from: SubscriptionState, to: SubscriptionState) -> bool {
        if from.is_terminal() {
            return false;
        }
        self.0
            .compare_exchange(from as u32, to as u32, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Move to `Cancelled` from any state, returning the previous state.
    pub fn cancel(&self) -> SubscriptionState {
        SubscriptionState::from_u32(
            self.0
                .swap(SubscriptionState::Cancelled as u32, Ordering::SeqCst),
        )
    }
}
