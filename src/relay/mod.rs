//! Byte-stream relay
//!
//! [`Relay`] specializes [`Broadcaster`](crate::broadcast::Broadcaster) for a
//! stream of byte chunks. The producer calls [`Relay::write`] at its own pace;
//! every connected client runs [`Relay::serve`], which pushes the chunk that is
//! current at each wake-up into the client's [`ChunkSink`].
//!
//! # Zero-Copy Design
//!
//! Each write publishes a fresh `bytes::Bytes` snapshot. Handing a chunk to a
//! listener only bumps a reference count, and the snapshot is immutable, so
//! the next write can never alter bytes a slow client is still sending.

pub mod error;
pub mod sink;
pub mod stream;

pub use error::ServeError;
pub use sink::{BodySink, ChunkSink, WriterSink};
pub use stream::Relay;
