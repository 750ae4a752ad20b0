//! Live tail configuration.

use std::time::Duration;

/// Delay between a stream termination and the next open attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Reconnect behavior: a fixed delay, retried until cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait before every reconnect attempt.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed-delay policy.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay for the given attempt number. The delay never grows.
    #[must_use]
    pub const fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Configuration for a [`LiveTail`](crate::LiveTail).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailConfig {
    /// Reconnect behavior.
    pub reconnect: ReconnectPolicy,
    /// Maximum buffered entries (None = unbounded).
    pub buffer_capacity: Option<usize>,
}

impl TailConfig {
    /// Set the reconnect delay.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect = ReconnectPolicy::fixed(delay);
        self
    }

    /// Bound the buffer.
    #[must_use]
    pub const fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }
}
