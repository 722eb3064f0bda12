//! Broadcaster implementation
//!
//! The monitor that owns the current value, the listener set and the closed
//! flag. All three live under one lock; waiting happens on a `Notify` that is
//! woken with "notify all" semantics on every mutation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

use super::error::{BroadcastError, ListenError};
use super::handle::ListenerHandle;
use super::subscriber::Subscriber;

/// Clone strategy applied before a value is handed to a listener
pub(super) type CloneFn<E> = dyn Fn(&E) -> E + Send + Sync;

/// State guarded by the broadcaster lock
pub(super) struct State<E> {
    /// Current payload
    pub(super) value: E,
    /// Bumped by every successful update
    pub(super) version: u64,
    /// One-way shutdown flag
    pub(super) closed: bool,
    /// Active listeners keyed by registration id
    pub(super) listeners: HashMap<u64, ListenerHandle>,
    next_listener_id: u64,
    max_listeners: usize,
}

pub(super) struct Shared<E> {
    pub(super) state: RwLock<State<E>>,
    pub(super) notify: Notify,
    pub(super) clone_fn: Box<CloneFn<E>>,
}

impl<E> Shared<E> {
    pub(super) fn remove_listener(&self, id: u64) {
        let mut state = self.state.write();
        if state.listeners.remove(&id).is_some() {
            tracing::trace!(
                listener = id,
                listeners = state.listeners.len(),
                "Listener removed"
            );
        }
    }
}

/// Single-value monitor with fan-out to many listeners
///
/// Cloning a `Broadcaster` is cheap and yields another handle to the same
/// shared value, like cloning a channel sender.
///
/// Listeners always receive a clone produced by the clone strategy, never a
/// reference into the live value, so reader code may run for as long as it
/// likes without holding the lock.
pub struct Broadcaster<E> {
    shared: Arc<Shared<E>>,
}

impl<E: Clone + 'static> Broadcaster<E> {
    /// Create a broadcaster that hands out `Clone::clone` copies of the value
    pub fn new(value: E) -> Self {
        Self::with_clone(value, E::clone)
    }
}

impl<E: 'static> Broadcaster<E> {
    /// Create a broadcaster with a custom clone strategy
    ///
    /// The strategy runs under the shared lock each time a listener picks up a
    /// value, so it should be cheap (`Bytes`, `Arc`, small structs).
    pub fn with_clone<F>(value: E, clone_fn: F) -> Self
    where
        F: Fn(&E) -> E + Send + Sync + 'static,
    {
        let state = State {
            value,
            version: 0,
            closed: false,
            listeners: HashMap::new(),
            next_listener_id: 1,
            max_listeners: 0,
        };

        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                notify: Notify::new(),
                clone_fn: Box::new(clone_fn),
            }),
        }
    }
}

impl<E> Broadcaster<E> {
    /// Mutate the current value under exclusive access
    ///
    /// Fails with [`BroadcastError::Closed`] without calling `f` once the
    /// broadcaster is closed. On success every waiting listener is woken. This
    /// never waits on listeners.
    pub fn update<R>(&self, f: impl FnOnce(&mut E) -> R) -> Result<R, BroadcastError> {
        let result = {
            let mut state = self.shared.state.write();
            if state.closed {
                return Err(BroadcastError::Closed);
            }

            let result = f(&mut state.value);
            state.version = state.version.wrapping_add(1);
            result
        };

        self.shared.notify.notify_waiters();
        Ok(result)
    }

    /// Replace the current value
    pub fn broadcast(&self, value: E) -> Result<(), BroadcastError> {
        self.update(move |current| *current = value)
    }

    /// Register a new listener
    ///
    /// The first [`Subscriber::recv`] returns the current value immediately.
    pub fn subscribe(&self) -> Result<Subscriber<E>, BroadcastError> {
        self.register(false)
    }

    /// Register a new listener that only sees values written after this call
    ///
    /// The first [`Subscriber::recv`] waits for the next update.
    pub fn subscribe_changes(&self) -> Result<Subscriber<E>, BroadcastError> {
        self.register(true)
    }

    fn register(&self, skip_current: bool) -> Result<Subscriber<E>, BroadcastError> {
        let handle = ListenerHandle::new();

        let (id, seen) = {
            let mut state = self.shared.state.write();
            if state.closed {
                return Err(BroadcastError::Closed);
            }

            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, handle.clone());
            state.max_listeners = state.max_listeners.max(state.listeners.len());

            tracing::trace!(
                listener = id,
                listeners = state.listeners.len(),
                "Listener registered"
            );
            (id, skip_current.then_some(state.version))
        };

        Ok(Subscriber::new(Arc::clone(&self.shared), id, handle, seen))
    }

    /// Run `on_value` for the current value and then for every later value
    /// this listener wakes up to
    ///
    /// Returns when the broadcaster is closed, when the listener is closed on
    /// its own, or with the first error `on_value` returns. The listener is
    /// deregistered on every exit path, including when this future is dropped.
    pub async fn listen<F, Fut, Err>(&self, on_value: F) -> Result<(), ListenError<Err>>
    where
        F: FnMut(E) -> Fut,
        Fut: Future<Output = Result<(), Err>>,
    {
        let subscriber = self.subscribe()?;
        subscriber.for_each(on_value).await
    }

    /// Clone of the current value
    pub fn current(&self) -> E {
        let state = self.shared.state.read();
        (self.shared.clone_fn)(&state.value)
    }

    /// Number of active listeners
    pub fn listener_count(&self) -> usize {
        self.shared.state.read().listeners.len()
    }

    /// Highest number of simultaneous listeners seen so far
    pub fn max_listeners(&self) -> usize {
        self.shared.state.read().max_listeners
    }

    /// Check whether the broadcaster has been closed
    pub fn is_closed(&self) -> bool {
        self.shared.state.read().closed
    }

    /// Close the broadcaster
    ///
    /// Further updates fail, every active listener is marked closed and woken.
    /// Calling this more than once is a no-op.
    pub fn close(&self) {
        {
            let mut state = self.shared.state.write();
            if state.closed {
                return;
            }
            state.closed = true;

            for handle in state.listeners.values() {
                handle.close();
            }

            tracing::debug!(listeners = state.listeners.len(), "Broadcaster closed");
        }

        self.shared.notify.notify_waiters();
    }
}

impl<E> Clone for Broadcaster<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Default + Clone + 'static> Default for Broadcaster<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E> fmt::Debug for Broadcaster<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.read();
        f.debug_struct("Broadcaster")
            .field("version", &state.version)
            .field("closed", &state.closed)
            .field("listeners", &state.listeners.len())
            .field("max_listeners", &state.max_listeners)
            .finish()
    }
}
