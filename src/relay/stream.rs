//! Relay implementation

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::broadcast::{BroadcastError, Broadcaster, ListenerHandle, Subscriber};
use crate::stats::RelayStats;

use super::error::ServeError;
use super::sink::ChunkSink;

#[derive(Debug)]
struct Counters {
    chunks_written: AtomicU64,
    bytes_written: AtomicU64,
    bytes_sent: AtomicU64,
    created_at: Instant,
}

/// Fan-out of one byte stream to many clients
///
/// Cheap to clone; clones share the same stream.
#[derive(Clone)]
pub struct Relay {
    broadcaster: Broadcaster<Bytes>,
    counters: Arc<Counters>,
}

impl Relay {
    /// Create a relay whose current chunk is empty
    pub fn new() -> Self {
        Self {
            broadcaster: Broadcaster::new(Bytes::new()),
            counters: Arc::new(Counters {
                chunks_written: AtomicU64::new(0),
                bytes_written: AtomicU64::new(0),
                bytes_sent: AtomicU64::new(0),
                created_at: Instant::now(),
            }),
        }
    }

    /// Replace the current chunk with a copy of `chunk`
    ///
    /// Returns the number of bytes accepted. Never waits for clients.
    pub fn write(&self, chunk: &[u8]) -> Result<usize, BroadcastError> {
        self.write_bytes(Bytes::copy_from_slice(chunk))
    }

    /// Replace the current chunk without copying
    pub fn write_bytes(&self, chunk: Bytes) -> Result<usize, BroadcastError> {
        let n = chunk.len();
        self.broadcaster.update(move |current| *current = chunk)?;

        self.counters.chunks_written.fetch_add(1, Ordering::Relaxed);
        self.counters
            .bytes_written
            .fetch_add(n as u64, Ordering::Relaxed);

        Ok(n)
    }

    /// Push chunks into `sink` until the relay or the sink gives up
    ///
    /// Each chunk is written and then flushed. A write or flush failure ends
    /// only this client's loop with [`ServeError::Io`]; other clients and the
    /// producer are unaffected.
    pub async fn serve<S: ChunkSink>(&self, sink: S) -> Result<(), ServeError> {
        let subscriber = self.broadcaster.subscribe()?;
        self.serve_subscriber(subscriber, sink).await
    }

    /// Like [`serve`](Self::serve), also returning a handle that stops this
    /// client alone
    pub fn serve_with_handle<'a, S: ChunkSink + 'a>(
        &'a self,
        sink: S,
    ) -> Result<
        (
            ListenerHandle,
            impl Future<Output = Result<(), ServeError>> + Send + 'a,
        ),
        ServeError,
    > {
        let subscriber = self.broadcaster.subscribe()?;
        let handle = subscriber.handle();
        Ok((handle, self.serve_subscriber(subscriber, sink)))
    }

    async fn serve_subscriber<S: ChunkSink>(
        &self,
        subscriber: Subscriber<Bytes>,
        sink: S,
    ) -> Result<(), ServeError> {
        // `for_each` takes a fresh future per chunk, so the sink cannot be
        // borrowed across calls; each future takes the (uncontended) lock.
        let sink = Arc::new(Mutex::new(sink));
        let counters = Arc::clone(&self.counters);

        subscriber
            .for_each(move |chunk: Bytes| {
                let sink = Arc::clone(&sink);
                let counters = Arc::clone(&counters);
                async move {
                    if chunk.is_empty() {
                        return Ok(());
                    }

                    let n = chunk.len() as u64;
                    let mut sink = sink.lock().await;
                    sink.write_bytes(chunk).await?;
                    sink.flush().await?;

                    counters.bytes_sent.fetch_add(n, Ordering::Relaxed);
                    Ok::<(), io::Error>(())
                }
            })
            .await
            .map_err(ServeError::from)
    }

    /// The chunk clients would receive right now
    pub fn current_chunk(&self) -> Bytes {
        self.broadcaster.current()
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.broadcaster.listener_count()
    }

    /// Highest number of simultaneous clients
    pub fn max_clients(&self) -> usize {
        self.broadcaster.max_listeners()
    }

    /// Check whether the relay has been closed
    pub fn is_closed(&self) -> bool {
        self.broadcaster.is_closed()
    }

    /// Stop every client loop and reject further writes. Idempotent.
    pub fn close(&self) {
        self.broadcaster.close();
    }

    /// Snapshot of the relay counters
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            clients: self.client_count(),
            max_clients: self.max_clients(),
            chunks_written: self.counters.chunks_written.load(Ordering::Relaxed),
            bytes_written: self.counters.bytes_written.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
            uptime: self.counters.created_at.elapsed(),
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("broadcaster", &self.broadcaster)
            .field("counters", &self.counters)
            .finish()
    }
}
