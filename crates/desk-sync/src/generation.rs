//! Request generations.
//!
//! Every issued fetch is tagged with a fresh [`Generation`]. When the
//! response comes back, it is applied only if its tag still equals the
//! counter's current value; the comparison happens at completion time, so a
//! later request always supersedes an earlier one regardless of the order in
//! which the network delivers their responses.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic tag carried by one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any request has been issued.
    pub const ZERO: Self = Self(0);

    /// Raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Atomic source of [`Generation`] values.
#[derive(Debug, Default)]
pub struct GenerationCounter(AtomicU64);

impl GenerationCounter {
    /// Create a counter at [`Generation::ZERO`].
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Issue a fresh generation, superseding every earlier one.
    pub fn advance(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently issued generation.
    #[must_use]
    pub fn current(&self) -> Generation {
        Generation(self.0.load(Ordering::SeqCst))
    }

    /// Returns true if `generation` is still the latest one issued.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}
