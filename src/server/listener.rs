//! HTTP server listener
//!
//! Binds the listener, serves the router and runs the stats logger until
//! shutdown.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::broadcast::Broadcaster;
use crate::error::Result;
use crate::relay::Relay;
use crate::server::config::ServerConfig;
use crate::server::routes::{router, AppState};
use crate::views::TrackInfo;

/// HTTP front end of a relay
pub struct HttpServer {
    config: Arc<ServerConfig>,
    relay: Relay,
    tracks: Broadcaster<TrackInfo>,
    next_client_id: Arc<AtomicU64>,
    stream_slots: Option<Arc<Semaphore>>,
}

impl HttpServer {
    /// Create a server streaming `relay` and announcing `tracks`
    pub fn new(config: ServerConfig, relay: Relay, tracks: Broadcaster<TrackInfo>) -> Self {
        let stream_slots = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            relay,
            tracks,
            next_client_id: Arc::new(AtomicU64::new(1)),
            stream_slots,
        }
    }

    /// The relay served on the stream endpoint
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// The track broadcaster served on the track endpoint
    pub fn tracks(&self) -> &Broadcaster<TrackInfo> {
        &self.tracks
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Router with all endpoints, sharing this server's state
    pub fn router(&self) -> Router {
        router(AppState {
            config: Arc::clone(&self.config),
            relay: self.relay.clone(),
            tracks: self.tracks.clone(),
            stream_slots: self.stream_slots.clone(),
            next_client_id: Arc::clone(&self.next_client_id),
        })
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        Ok(TcpListener::bind(self.config.bind_addr).await?)
    }

    /// Run the server until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    ///
    /// Open streams are not drained: they end when the relay is closed.
    pub async fn serve_listener<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "HTTP server listening");

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let stats_handle =
            (!self.config.stats_interval.is_zero()).then(|| self.spawn_stats_task());

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = axum::serve(listener, app).into_future() => result.map_err(Into::into),
        };

        if let Some(handle) = stats_handle {
            handle.abort();
        }

        result
    }

    fn spawn_stats_task(&self) -> JoinHandle<()> {
        let relay = self.relay.clone();
        let tracks = self.tracks.clone();
        let period = self.config.stats_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                let stats = relay.stats();
                tracing::info!(
                    clients = stats.clients,
                    max_clients = stats.max_clients,
                    track_waiters = tracks.listener_count(),
                    bitrate = stats.bitrate(),
                    "Relay stats"
                );
            }
        })
    }
}
