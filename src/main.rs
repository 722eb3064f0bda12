//! substream server
//!
//! Plays a directory of MP3 files as one shared radio stream.
//!
//! Run with: substream --dir ./music
//!
//! Listen with:
//!   mpv http://127.0.0.1:9080/music
//!   open http://127.0.0.1:9080/ in a browser

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use substream::{Broadcaster, HttpServer, Relay, Scanner, ServerConfig, TrackInfo};

#[derive(Parser, Debug)]
#[command(name = "substream")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Synchronized radio over HTTP", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:9080", env = "SUBSTREAM_ADDR")]
    addr: SocketAddr,

    /// Music directory, searched recursively
    #[arg(short, long, default_value = ".", env = "SUBSTREAM_DIR")]
    dir: PathBuf,

    /// File name pattern
    #[arg(short, long, default_value = "*.mp3", env = "SUBSTREAM_GLOB")]
    glob: String,

    /// Bytes per relay write
    #[arg(long, default_value_t = substream::library::scanner::DEFAULT_CHUNK_SIZE, env = "SUBSTREAM_CHUNK_SIZE")]
    chunk_size: usize,

    /// Reshuffle the play order on every pass
    #[arg(short, long, env = "SUBSTREAM_SHUFFLE")]
    shuffle: bool,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0, env = "SUBSTREAM_MAX_CONNECTIONS")]
    max_connections: usize,

    /// Content type of the stream endpoint
    #[arg(long, default_value = "audio/mpeg", env = "SUBSTREAM_CONTENT_TYPE")]
    content_type: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "substream=debug" } else { "substream=info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let relay = Relay::new();
    let tracks = Broadcaster::new(TrackInfo::default());

    let scanner = Scanner::new(&cli.dir)
        .glob(cli.glob.clone())
        .chunk_size(cli.chunk_size)
        .shuffle(cli.shuffle);

    let producer = {
        let relay = relay.clone();
        let tracks = tracks.clone();
        tokio::spawn(async move {
            let result = scanner
                .stream(&relay, |track| {
                    let _ = tracks.broadcast(track.clone());
                })
                .await;

            match result {
                Ok(()) => tracing::warn!("Library stream ended"),
                Err(e) if relay.is_closed() => tracing::debug!(error = %e, "Library stream stopped"),
                Err(e) => tracing::error!(error = %e, "Library stream failed"),
            }
        })
    };

    let config = ServerConfig::with_addr(cli.addr)
        .max_connections(cli.max_connections)
        .content_type(cli.content_type);
    let server = HttpServer::new(config, relay.clone(), tracks.clone());

    let result = server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    tracing::info!("Shutting down");
    relay.close();
    tracks.close();
    producer.abort();

    result.with_context(|| format!("server on {} failed", cli.addr))
}
