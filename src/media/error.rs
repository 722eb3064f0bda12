//! Media error types

use thiserror::Error;

/// Error returned while probing media files
#[derive(Debug, Error)]
pub enum MediaError {
    /// The four bytes are not a usable MPEG audio frame header
    #[error("invalid MPEG frame header: {0}")]
    InvalidFrameHeader(&'static str),
    /// Free-format streams carry no bitrate to pace by
    #[error("free-format bitrate is not supported")]
    FreeFormat,
    /// No frame header in the probed region
    #[error("no MPEG audio frame found")]
    NoFrameFound,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
