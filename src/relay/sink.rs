//! Client-side sinks for relayed chunks

use std::future::Future;
use std::io;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Destination of relayed chunks for one client
///
/// Flushing is optional: sinks without a flush capability keep the default
/// no-op implementation.
pub trait ChunkSink: Send {
    /// Write the whole chunk
    fn write_chunk(&mut self, chunk: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Write a chunk the sink may keep without copying
    fn write_bytes(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_chunk(&chunk).await }
    }

    /// Push buffered bytes to the peer now
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        async { Ok(()) }
    }
}

/// [`ChunkSink`] over a tokio writer: a socket, a file, stdout
#[derive(Debug)]
pub struct WriterSink<W> {
    inner: W,
    bytes_sent: u64,
}

impl<W> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_sent: 0,
        }
    }

    /// Bytes written so far
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> ChunkSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.inner.write_all(chunk).await?;
        self.bytes_sent += chunk.len() as u64;
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }
}

/// [`ChunkSink`] feeding a channel, typically the body stream of an HTTP
/// response
///
/// The channel is bounded, so a client that stops reading parks its serve
/// loop and later wakes to the newest chunk. Once the receiving side is
/// dropped every write fails with [`io::ErrorKind::BrokenPipe`].
#[derive(Debug)]
pub struct BodySink {
    tx: mpsc::Sender<Bytes>,
}

impl BodySink {
    /// Create a sink and the receiver that drains it
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }
}

impl ChunkSink for BodySink {
    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.write_bytes(Bytes::copy_from_slice(chunk)).await
    }

    async fn write_bytes(&mut self, chunk: Bytes) -> io::Result<()> {
        self.tx
            .send(chunk)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client body dropped"))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    struct Unflushable(Vec<u8>);

    impl ChunkSink for Unflushable {
        async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
            self.0.extend_from_slice(chunk);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_writer_sink_writes_and_counts() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut sink = WriterSink::new(client);

        sink.write_chunk(b"abc").await.unwrap();
        sink.write_bytes(Bytes::from_static(b"de")).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.bytes_sent(), 5);
        drop(sink);

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"abcde");
    }

    #[tokio::test]
    async fn test_writer_sink_reports_write_failure() {
        let mock = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
            .build();
        let mut sink = WriterSink::new(mock);

        let err = sink.write_chunk(b"abc").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.bytes_sent(), 0);
    }

    #[tokio::test]
    async fn test_flush_is_optional() {
        let mut sink = Unflushable(Vec::new());
        sink.write_chunk(b"xyz").await.unwrap();
        sink.write_bytes(Bytes::from_static(b"!")).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.0, b"xyz!");
    }

    #[tokio::test]
    async fn test_body_sink_passes_chunks_through() {
        let (mut sink, mut rx) = BodySink::channel(4);
        let chunk = Bytes::from_static(b"shared");

        sink.write_bytes(chunk.clone()).await.unwrap();
        sink.write_chunk(b"copied").await.unwrap();
        sink.flush().await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first, chunk);
        assert_eq!(first.as_ptr(), chunk.as_ptr());
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"copied"));
    }

    #[tokio::test]
    async fn test_body_sink_fails_once_receiver_is_gone() {
        let (mut sink, rx) = BodySink::channel(1);
        drop(rx);

        let err = sink.write_chunk(b"lost").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
