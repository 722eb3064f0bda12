//! Relay error types

use thiserror::Error;

use crate::broadcast::{BroadcastError, ListenError, RecvError};

/// Reason a [`serve`](super::Relay::serve) loop ended
#[derive(Debug, Error)]
pub enum ServeError {
    /// The relay was closed
    #[error("relay is closed")]
    Closed,
    /// This client was closed individually
    #[error("client was closed")]
    ClientClosed,
    /// Writing to or flushing the client's sink failed
    #[error("client write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ServeError {
    /// Whether the loop ended because the client went away
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ServeError::Io(_))
    }
}

impl From<RecvError> for ServeError {
    fn from(err: RecvError) -> Self {
        match err {
            RecvError::BroadcasterClosed => ServeError::Closed,
            RecvError::SubscriberClosed => ServeError::ClientClosed,
        }
    }
}

impl From<ListenError<std::io::Error>> for ServeError {
    fn from(err: ListenError<std::io::Error>) -> Self {
        match err {
            ListenError::BroadcasterClosed => ServeError::Closed,
            ListenError::SubscriberClosed => ServeError::ClientClosed,
            ListenError::Callback(e) => ServeError::Io(e),
        }
    }
}

impl From<BroadcastError> for ServeError {
    fn from(_: BroadcastError) -> Self {
        ServeError::Closed
    }
}
