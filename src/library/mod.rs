//! Music library scanning
//!
//! The [`Scanner`] finds audio files under a directory and plays them into a
//! [`Relay`](crate::relay::Relay) one after another, forever, paced at each
//! file's own bitrate.

pub mod error;
pub mod scanner;

pub use error::LibraryError;
pub use scanner::Scanner;
