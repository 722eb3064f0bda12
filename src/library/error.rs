//! Library error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::broadcast::BroadcastError;
use crate::media::MediaError;

/// Error returned by the library scanner
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(#[from] globset::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Media {
        path: PathBuf,
        #[source]
        source: MediaError,
    },

    /// The relay stopped accepting chunks
    #[error("relay is closed")]
    RelayClosed,

    /// A full pass over the library played nothing
    #[error("no playable files in library")]
    NothingPlayable,
}

impl LibraryError {
    pub(super) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LibraryError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the scanner should skip the file and carry on
    pub fn is_skippable(&self) -> bool {
        match self {
            LibraryError::Media { .. } => true,
            LibraryError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<BroadcastError> for LibraryError {
    fn from(_: BroadcastError) -> Self {
        LibraryError::RelayClosed
    }
}
