//! Explicit observer registry.
//!
//! Listeners are registered with [`Observers::subscribe`] and stay registered
//! until their [`Subscription`] is explicitly released. Dropping a
//! subscription does not unregister it.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifier of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener<T>)>,
}

/// A set of listeners notified with `&T`.
pub struct Observers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Observers<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 1,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener.
    ///
    /// The returned [`Subscription`] must be released with
    /// [`Subscription::unsubscribe`] when the listener is no longer wanted.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));
        trace!(listener = id.0, "listener registered");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `value` to every registered listener.
    ///
    /// Listeners are invoked outside the registry lock, so a listener may
    /// subscribe or unsubscribe without deadlocking.
    pub fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(value);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister every listener.
    pub fn clear(&self) {
        self.registry.lock().listeners.clear();
    }
}

impl<T: 'static> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.registry.lock().listeners.len())
            .finish()
    }
}

/// Registration handle returned by [`Observers::subscribe`].
#[must_use = "a subscription stays registered until `unsubscribe` is called"]
pub struct Subscription<T> {
    id: ListenerId,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Subscription<T> {
    /// The listener's identifier.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Unregister the listener.
    ///
    /// Returns `false` if the listener was already gone, either because the
    /// registry was cleared or because it has been dropped.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        let removed = registry.listeners.len() != before;
        trace!(listener = self.id.0, removed, "listener unregistered");
        removed
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
