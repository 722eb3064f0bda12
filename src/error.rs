//! Crate-level error type

use thiserror::Error;

use crate::broadcast::BroadcastError;
use crate::library::LibraryError;
use crate::media::MediaError;
use crate::relay::ServeError;

/// Any error produced by this crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error(transparent)]
    Serve(#[from] ServeError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
