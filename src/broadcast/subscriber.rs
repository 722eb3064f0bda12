//! Subscriber side of a broadcaster

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::error::{ListenError, RecvError};
use super::handle::ListenerHandle;
use super::store::Shared;

/// One registered listener
///
/// Created by [`Broadcaster::subscribe`](super::Broadcaster::subscribe).
/// Dropping the subscriber removes it from the broadcaster's listener set.
pub struct Subscriber<E> {
    shared: Arc<Shared<E>>,
    id: u64,
    handle: ListenerHandle,
    /// Version of the last value handed out
    seen: Option<u64>,
}

impl<E> Subscriber<E> {
    pub(super) fn new(
        shared: Arc<Shared<E>>,
        id: u64,
        handle: ListenerHandle,
        seen: Option<u64>,
    ) -> Self {
        Self {
            shared,
            id,
            handle,
            seen,
        }
    }

    /// Registration id, unique per broadcaster
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Handle that can close this listener from another task
    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    /// Wait for a value this subscriber has not seen yet
    ///
    /// The first call returns the current value without waiting, unless the
    /// subscriber came from
    /// [`subscribe_changes`](super::Broadcaster::subscribe_changes). Later calls
    /// wait until the broadcaster is updated and return whatever value is
    /// current at wake-up time; values replaced in between are skipped.
    pub async fn recv(&mut self) -> Result<E, RecvError> {
        let shared = Arc::clone(&self.shared);

        loop {
            // Register for the wake-up before checking, so an update landing
            // between the check and the await is not lost.
            let changed = shared.notify.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if let Some(value) = self.take_current()? {
                return Ok(value);
            }

            tokio::select! {
                _ = &mut changed => {}
                _ = self.handle.closed() => {}
            }
        }
    }

    /// Clone the current value if it is new to this subscriber
    fn take_current(&mut self) -> Result<Option<E>, RecvError> {
        let state = self.shared.state.read();

        if state.closed {
            return Err(RecvError::BroadcasterClosed);
        }
        if self.handle.is_closed() {
            return Err(RecvError::SubscriberClosed);
        }
        if self.seen == Some(state.version) {
            return Ok(None);
        }

        self.seen = Some(state.version);
        Ok(Some((self.shared.clone_fn)(&state.value)))
    }

    /// Feed every received value to `on_value` until a terminal condition
    ///
    /// Consumes the subscriber, so it is deregistered when this returns.
    pub async fn for_each<F, Fut, Err>(mut self, mut on_value: F) -> Result<(), ListenError<Err>>
    where
        F: FnMut(E) -> Fut,
        Fut: Future<Output = Result<(), Err>>,
    {
        loop {
            let value = self.recv().await?;
            on_value(value).await.map_err(ListenError::Callback)?;
        }
    }
}

impl<E> Drop for Subscriber<E> {
    fn drop(&mut self) {
        self.shared.remove_listener(self.id);
    }
}

impl<E> fmt::Debug for Subscriber<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("closed", &self.handle.is_closed())
            .field("seen", &self.seen)
            .finish()
    }
}
