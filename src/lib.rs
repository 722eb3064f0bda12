//! # substream
//!
//! A synchronized-radio relay: one producer writes a byte stream, and every
//! connected client receives the chunk that is current when it gets to read.
//! Slow clients skip chunks instead of buffering, so all listeners stay close
//! to the live position.
//!
//! The building blocks, bottom up:
//!
//! - [`broadcast::Broadcaster`] holds one value and wakes every listener when
//!   it changes
//! - [`relay::Relay`] broadcasts byte chunks to [`relay::ChunkSink`]s
//! - [`library::Scanner`] plays a directory of MP3 files into a relay at
//!   their bitrate
//! - [`server::HttpServer`] serves the relay and the current track over HTTP
//!
//! ## Example
//!
//! ```no_run
//! use substream::{Broadcaster, HttpServer, Relay, Scanner, ServerConfig, TrackInfo};
//!
//! # async fn run() -> substream::Result<()> {
//! let relay = Relay::new();
//! let tracks = Broadcaster::new(TrackInfo::default());
//!
//! let producer = relay.clone();
//! let announcer = tracks.clone();
//! tokio::spawn(async move {
//!     Scanner::new("./music")
//!         .stream(&producer, |track| {
//!             let _ = announcer.broadcast(track.clone());
//!         })
//!         .await
//! });
//!
//! let server = HttpServer::new(ServerConfig::default(), relay, tracks);
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

pub mod broadcast;
pub mod error;
pub mod library;
pub mod media;
pub mod relay;
pub mod server;
pub mod stats;
pub mod views;

pub use broadcast::{Broadcaster, ListenerHandle, Subscriber};
pub use error::{Error, Result};
pub use library::Scanner;
pub use relay::{BodySink, ChunkSink, Relay, WriterSink};
pub use server::{HttpServer, ServerConfig};
pub use stats::RelayStats;
pub use views::TrackInfo;
