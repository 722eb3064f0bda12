//! Request handlers
//!
//! | Path | Description |
//! |------|-------------|
//! | `/music` | Live relay stream with the configured content type |
//! | `/music/track` | Current track fragment; `?next=true` waits for the next one |
//! | `/`, `/index.html` | Player page |

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::timeout::TimeoutLayer;

use crate::broadcast::Broadcaster;
use crate::relay::{BodySink, Relay, ServeError};
use crate::server::config::ServerConfig;
use crate::views::{index_page, TrackInfo};

/// Stream endpoint
pub const STREAM_PATH: &str = "/music";

/// Current-track endpoint
pub const TRACK_PATH: &str = "/music/track";

/// Chunks buffered between a client's serve loop and its response body
const BODY_DEPTH: usize = 2;

/// Shared state passed to all request handlers
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) relay: Relay,
    pub(crate) tracks: Broadcaster<TrackInfo>,
    /// Permits for concurrent stream clients, `None` when unlimited
    pub(crate) stream_slots: Option<Arc<Semaphore>>,
    pub(crate) next_client_id: Arc<AtomicU64>,
}

/// Build the router for `state`
pub(crate) fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .layer(TimeoutLayer::new(state.config.request_timeout));

    // Stream and long-poll responses are open-ended, so only pages get the timeout
    Router::new()
        .route(STREAM_PATH, get(stream_music))
        .route(TRACK_PATH, get(current_track))
        .merge(pages)
        .fallback(not_found)
        .with_state(state)
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "503 Service Unavailable\n").into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found\n").into_response()
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(index_page(&state.config.page_title, STREAM_PATH, TRACK_PATH))
}

/// Handles requests to `/music`.
///
/// A spawned task runs the relay's serve loop into a [`BodySink`] whose
/// receiver backs the response body. When the client goes away the body is
/// dropped, the next chunk write fails and only that loop ends.
async fn stream_music(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    if state.relay.is_closed() {
        return unavailable();
    }

    let permit = match state.stream_slots {
        Some(ref slots) => match Arc::clone(slots).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer, "Stream rejected: limit reached");
                return unavailable();
            }
        },
        None => None,
    };

    let client_id = state.next_client_id.fetch_add(1, Ordering::Relaxed);
    let (sink, rx) = BodySink::channel(BODY_DEPTH);
    let relay = state.relay.clone();

    tokio::spawn(async move {
        let _permit = permit;
        let started = Instant::now();
        tracing::info!(client_id = client_id, peer = %peer, "Client connected");

        let result = relay.serve(sink).await;

        let reason = match result {
            Err(ServeError::Io(_)) => "client left",
            Err(ServeError::Closed) => "relay closed",
            Err(ServeError::ClientClosed) => "client closed",
            Ok(()) => "finished",
        };
        tracing::info!(
            client_id = client_id,
            peer = %peer,
            duration_secs = started.elapsed().as_secs_f64(),
            reason = reason,
            clients = relay.client_count(),
            "Client disconnected"
        );
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, io::Error>));
    (
        [
            (header::CONTENT_TYPE, state.config.content_type.clone()),
            (header::CACHE_CONTROL, "no-cache, no-store".to_string()),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct TrackQuery {
    #[serde(default)]
    next: bool,
}

/// Handles requests to `/music/track`.
///
/// With `?next=true` the response is held until the track changes. If the
/// client hangs up first the handler future is dropped, which deregisters
/// its subscriber.
async fn current_track(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> Response {
    if !query.next {
        return Html(state.tracks.current().render()).into_response();
    }

    let mut subscriber = match state.tracks.subscribe_changes() {
        Ok(subscriber) => subscriber,
        Err(_) => return unavailable(),
    };

    match subscriber.recv().await {
        Ok(track) => Html(track.render()).into_response(),
        Err(_) => unavailable(),
    }
}
