//! Per-listener cancellation handle

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Handle to one active observation
///
/// Cloning is cheap; all clones refer to the same listener. Closing the handle
/// ends that listener's loop with [`RecvError::SubscriberClosed`] while every
/// other listener keeps running.
///
/// [`RecvError::SubscriberClosed`]: super::RecvError::SubscriberClosed
#[derive(Clone, Default)]
pub struct ListenerHandle {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    closed: AtomicBool,
    notify: Notify,
}

impl ListenerHandle {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Stop this listener. Idempotent.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            // notify_one stores a permit when nobody is waiting yet
            self.inner.notify.notify_one();
        }
    }

    /// Check whether this listener has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Resolves once the handle is closed
    pub(super) async fn closed(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_close_is_shared_between_clones() {
        let handle = ListenerHandle::new();
        let other = handle.clone();

        assert!(!other.is_closed());
        handle.close();
        handle.close();
        assert!(other.is_closed());
    }

    #[tokio::test]
    async fn test_closed_resolves_after_close() {
        let handle = ListenerHandle::new();
        let waiter = handle.clone();

        let task = tokio::spawn(async move { waiter.closed().await });
        tokio::task::yield_now().await;
        handle.close();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("closed() did not resolve")
            .unwrap();
    }
}
