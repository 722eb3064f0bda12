//! HTTP server
//!
//! Serves the relay to HTTP clients with an axum router:
//!
//! - `GET /music` streams relay chunks with the configured content type
//! - `GET /music/track` renders the current track, `?next=true` waits for
//!   the next one
//! - `GET /` serves a player page

pub mod config;
pub mod listener;
pub mod routes;

pub use config::ServerConfig;
pub use listener::HttpServer;
pub use routes::{STREAM_PATH, TRACK_PATH};
