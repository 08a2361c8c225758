//! Event system for connection lifecycle observers.
//!
//! [`EventEmitter`] maps an event kind to the listeners registered for it.
//! Emission is synchronous: every listener for the kind runs, in registration
//! order, before [`EventEmitter::emit`] returns.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Trait for events emitted by a connection handler.
pub trait SocketEvent: Send + Sync + fmt::Debug {
    /// Returns the type of event (e.g., "connect", "reconnect").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the handler instance that emitted this event.
    fn handler_name(&self) -> &str;
}

/// Trait for listening to emitted values.
pub trait EventListener<V>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, value: &V);
}

/// Type alias for shared event listeners.
pub type BoxedEventListener<V> = Arc<dyn EventListener<V>>;

/// A simple function-based event listener.
pub struct FnListener<V, F>
where
    F: Fn(&V) + Send + Sync,
{
    f: F,
    _phantom: PhantomData<fn(&V)>,
}

impl<V, F> FnListener<V, F>
where
    F: Fn(&V) + Send + Sync,
{
    /// Creates a new function-based listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

impl<V, F> EventListener<V> for FnListener<V, F>
where
    F: Fn(&V) + Send + Sync,
{
    fn on_event(&self, value: &V) {
        (self.f)(value)
    }
}

/// Publish/subscribe registry keyed by event kind.
///
/// Registration and [`close`](Self::close) take the write lock; emission only
/// takes the read lock long enough to snapshot the listeners for one kind, so
/// concurrent emissions never block each other and a listener may register
/// further listeners without deadlocking.
pub struct EventEmitter<K, V> {
    listeners: RwLock<HashMap<K, Vec<BoxedEventListener<V>>>>,
}

impl<K, V> EventEmitter<K, V>
where
    K: Eq + Hash,
{
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a listener for `kind`. Earlier listeners for the same kind are kept.
    pub fn on<L>(&self, kind: K, listener: L)
    where
        L: EventListener<V> + 'static,
    {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(kind)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Appends a closure listener for `kind`.
    pub fn on_fn<F>(&self, kind: K, f: F)
    where
        F: Fn(&V) + Send + Sync + 'static,
        V: 'static,
    {
        self.on(kind, FnListener::new(f));
    }

    /// Invokes every listener registered for `kind`, in registration order.
    ///
    /// If a listener panics, the panic is caught and the remaining listeners
    /// will still be called.
    pub fn emit(&self, kind: &K, value: &V) {
        let snapshot: Vec<BoxedEventListener<V>> = {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match listeners.get(kind) {
                Some(registered) => registered.clone(),
                None => return,
            }
        };

        for listener in &snapshot {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(value);
            }));
        }
    }

    /// Discards every listener. Calling it again is a no-op.
    pub fn close(&self) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.clear();
    }

    /// Returns the number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: &K) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .map_or(0, Vec::len)
    }

    /// Returns true if no listener is registered for any kind.
    pub fn is_empty(&self) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(Vec::is_empty)
    }
}

impl<K, V> Default for EventEmitter<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for EventEmitter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = self
            .listeners
            .read()
            .map(|listeners| listeners.len())
            .unwrap_or_default();
        f.debug_struct("EventEmitter").field("kinds", &kinds).finish()
    }
}
