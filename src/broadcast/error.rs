//! Broadcast error types

use thiserror::Error;

/// Error returned by producer-side operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The broadcaster was closed; nothing was mutated
    #[error("broadcaster is closed")]
    Closed,
}

/// Terminal condition of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    /// The broadcaster itself was closed
    #[error("broadcaster is closed")]
    BroadcasterClosed,
    /// Only this subscriber was closed, the broadcaster is still open
    #[error("subscriber is closed")]
    SubscriberClosed,
}

/// Reason a [`listen`](super::Broadcaster::listen) loop ended
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenError<T> {
    /// The broadcaster was closed
    #[error("broadcaster is closed")]
    BroadcasterClosed,
    /// This listener was closed individually
    #[error("subscriber is closed")]
    SubscriberClosed,
    /// The per-value callback failed; the error is passed through untouched
    #[error("{0}")]
    Callback(T),
}

impl<T> ListenError<T> {
    /// Returns the callback error, if that is what ended the loop
    pub fn into_callback(self) -> Option<T> {
        match self {
            ListenError::Callback(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the loop ended because of a close rather than a callback failure
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            ListenError::BroadcasterClosed | ListenError::SubscriberClosed
        )
    }
}

impl<T> From<RecvError> for ListenError<T> {
    fn from(err: RecvError) -> Self {
        match err {
            RecvError::BroadcasterClosed => ListenError::BroadcasterClosed,
            RecvError::SubscriberClosed => ListenError::SubscriberClosed,
        }
    }
}

impl<T> From<BroadcastError> for ListenError<T> {
    fn from(_: BroadcastError) -> Self {
        ListenError::BroadcasterClosed
    }
}
