//! Media helpers for the chunk producer
//!
//! This module provides:
//! - MPEG audio frame header parsing and bitrate probing
//! - Chunk pacing at a stream's byte rate

pub mod error;
pub mod mp3;
pub mod pacer;

pub use error::MediaError;
pub use mp3::{probe_file, ChannelMode, FrameHeader, Layer, MpegVersion};
pub use pacer::ChunkPacer;
